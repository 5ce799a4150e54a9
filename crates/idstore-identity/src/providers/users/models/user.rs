//! User record stored in the users table.
//!
//! ## Stored attributes
//!
//! | Attribute            | Notes                                                    |
//! |----------------------|----------------------------------------------------------|
//! | `Id`                 | primary key, UUID v4, immutable                           |
//! | `NormalizedUserName` | hash key of `NormalizedUserName-DeletedOn-index`          |
//! | `NormalizedEmail`    | hash key of `NormalizedEmail-DeletedOn-index`, omitted without email |
//! | `DeletedOn`          | range key of both indexes, zero timestamp while live      |
//! | `VersionNumber`      | optimistic-concurrency counter, absent before first save  |

use chrono::{DateTime, Utc};
use idstore_commons::constants::ID_ATTRIBUTE;
use idstore_commons::{normalize_key, timestamp, UserId};
use idstore_store::{string_key, Item, TableEntity};
use serde::{Deserialize, Serialize};

use super::contact::{UserEmail, UserPhoneNumber};
use super::user_login::UserLogin;
use crate::error::{IdentityError, Result};
use crate::models::Claim;

/// Identity user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    id: UserId,
    pub user_name: String,
    pub normalized_user_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<UserEmail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<UserPhoneNumber>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security_stamp: Option<String>,
    #[serde(default)]
    pub is_two_factor_enabled: bool,
    #[serde(default)]
    claims: Vec<Claim>,
    #[serde(default)]
    logins: Vec<UserLogin>,
    #[serde(default)]
    pub access_failed_count: i32,
    #[serde(default)]
    pub is_lockout_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lockout_end_date: Option<DateTime<Utc>>,
    created_on: DateTime<Utc>,
    #[serde(default, with = "timestamp::soft_delete")]
    deleted_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version_number: Option<i64>,
}

impl User {
    /// Creates a live user with a fresh id.
    pub fn new(user_name: impl Into<String>) -> Self {
        let user_name = user_name.into();
        Self {
            id: UserId::generate(),
            normalized_user_name: normalize_key(&user_name),
            user_name,
            email: None,
            normalized_email: None,
            phone_number: None,
            password_hash: None,
            security_stamp: None,
            is_two_factor_enabled: false,
            claims: Vec::new(),
            logins: Vec::new(),
            access_failed_count: 0,
            is_lockout_enabled: false,
            lockout_end_date: None,
            created_on: Utc::now(),
            deleted_on: None,
            version_number: None,
        }
    }

    pub fn with_email(user_name: impl Into<String>, email: &str) -> Self {
        let mut user = Self::new(user_name);
        user.set_email(email);
        user
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn created_on(&self) -> DateTime<Utc> {
        self.created_on
    }

    pub fn deleted_on(&self) -> Option<DateTime<Utc>> {
        self.deleted_on
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_on.is_some()
    }

    pub fn version_number(&self) -> Option<i64> {
        self.version_number
    }

    /// Replaces the email and its normalized lookup key. Confirmation starts over.
    pub fn set_email(&mut self, email: &str) {
        let email = UserEmail::new(email);
        self.normalized_email = Some(email.normalized_value.clone());
        self.email = Some(email);
    }

    pub fn set_phone_number(&mut self, phone_number: &str) {
        self.phone_number = Some(UserPhoneNumber::new(phone_number));
    }

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    pub fn add_claim(&mut self, claim: Claim) {
        self.claims.push(claim);
    }

    /// Removes every claim equal to `claim`; returns how many were removed.
    pub fn remove_claim(&mut self, claim: &Claim) -> usize {
        let before = self.claims.len();
        self.claims.retain(|c| c != claim);
        before - self.claims.len()
    }

    pub fn logins(&self) -> &[UserLogin] {
        &self.logins
    }

    /// Attaches a login. A `(provider, key)` pair may appear once per user.
    pub fn add_login(&mut self, login: UserLogin) -> Result<()> {
        if self.has_login(&login.login_provider, &login.provider_key) {
            return Err(IdentityError::InvalidState("Login already exists.".to_string()));
        }
        self.logins.push(login);
        Ok(())
    }

    /// Detaches a login; a missing pair is ignored.
    pub fn remove_login(&mut self, login_provider: &str, provider_key: &str) {
        self.logins.retain(|l| !l.matches(login_provider, provider_key));
    }

    pub fn has_login(&self, login_provider: &str, provider_key: &str) -> bool {
        self.logins.iter().any(|l| l.matches(login_provider, provider_key))
    }

    pub fn lock_until(&mut self, lockout_end: DateTime<Utc>) {
        self.lockout_end_date = Some(lockout_end);
    }

    /// Marks the user deleted. A user can be deleted once.
    pub fn delete(&mut self) -> Result<()> {
        if self.deleted_on.is_some() {
            return Err(IdentityError::InvalidState(format!(
                "User '{}' has already been deleted.",
                self.id
            )));
        }
        self.deleted_on = Some(Utc::now());
        Ok(())
    }
}

impl TableEntity for User {
    fn primary_key(&self) -> Item {
        string_key(ID_ATTRIBUTE, self.id.as_str())
    }

    fn version(&self) -> Option<i64> {
        self.version_number
    }

    fn set_version(&mut self, version: Option<i64>) {
        self.version_number = version;
    }
}

/// A user type the stores can persist.
///
/// Applications extend the user record by embedding [`User`] with
/// `#[serde(flatten)]` next to their own fields and invoking
/// [`impl_identity_user!`](crate::impl_identity_user) for the new type.
pub trait IdentityUser: TableEntity + Clone + Send + Sync + 'static {
    fn as_user(&self) -> &User;
    fn as_user_mut(&mut self) -> &mut User;
}

impl IdentityUser for User {
    fn as_user(&self) -> &User {
        self
    }

    fn as_user_mut(&mut self) -> &mut User {
        self
    }
}

/// Implements `IdentityUser` and `TableEntity` for a type embedding a [`User`].
///
/// ```rust
/// use idstore_identity::{impl_identity_user, User};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// #[serde(rename_all = "PascalCase")]
/// struct AppUser {
///     #[serde(flatten)]
///     base: User,
///     favourite_colour: Option<String>,
/// }
///
/// impl_identity_user!(AppUser, base);
/// ```
#[macro_export]
macro_rules! impl_identity_user {
    ($ty:ty, $field:ident) => {
        impl $crate::IdentityUser for $ty {
            fn as_user(&self) -> &$crate::User {
                &self.$field
            }

            fn as_user_mut(&mut self) -> &mut $crate::User {
                &mut self.$field
            }
        }

        impl $crate::store::TableEntity for $ty {
            fn primary_key(&self) -> $crate::store::Item {
                <$crate::User as $crate::store::TableEntity>::primary_key(&self.$field)
            }

            fn version(&self) -> Option<i64> {
                <$crate::User as $crate::store::TableEntity>::version(&self.$field)
            }

            fn set_version(&mut self, version: Option<i64>) {
                <$crate::User as $crate::store::TableEntity>::set_version(&mut self.$field, version)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use idstore_commons::ZERO_TIMESTAMP;
    use idstore_store::codec::{from_item, to_item};
    use idstore_store::AttributeValue;

    #[test]
    fn test_new_user_normalizes_name() {
        let user = User::with_email("Alice", "Alice@Example.com");
        assert_eq!(user.normalized_user_name, "ALICE");
        assert_eq!(user.normalized_email.as_deref(), Some("ALICE@EXAMPLE.COM"));
        assert!(!user.is_deleted());
        assert!(user.version_number().is_none());
    }

    #[test]
    fn test_item_layout() {
        let user = User::new("bob");
        let item = to_item(&user).unwrap();

        assert_eq!(item.get("Id"), Some(&AttributeValue::S(user.id().to_string())));
        assert_eq!(item.get("NormalizedUserName"), Some(&AttributeValue::from("BOB")));
        assert_eq!(item.get("DeletedOn"), Some(&AttributeValue::from(ZERO_TIMESTAMP)));
        assert!(!item.contains_key("NormalizedEmail"));
        assert!(!item.contains_key("VersionNumber"));

        let back: User = from_item(&item).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_delete_once() {
        let mut user = User::new("carol");
        user.delete().unwrap();
        assert!(user.is_deleted());
        let err = user.delete().unwrap_err();
        assert!(err.to_string().contains("has already been deleted"));
    }

    #[test]
    fn test_duplicate_login_rejected() {
        let mut user = User::new("dave");
        user.add_login(UserLogin::new("github", "1", None)).unwrap();
        assert!(matches!(
            user.add_login(UserLogin::new("github", "1", Some("GitHub".into()))),
            Err(IdentityError::InvalidState(_))
        ));
        user.add_login(UserLogin::new("github", "2", None)).unwrap();
        assert_eq!(user.logins().len(), 2);
        assert_eq!(user.logins()[0].provider_display_name, "github");

        user.remove_login("github", "1");
        user.remove_login("github", "missing");
        assert_eq!(user.logins().len(), 1);
    }
}
