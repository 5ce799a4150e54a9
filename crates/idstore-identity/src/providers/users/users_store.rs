//! Users store.
//!
//! Lookups by user name and email are index queries pinned to the zero
//! `DeletedOn`, so soft-deleted users never match. Lookups by login and by
//! claim have no index and scan the whole table (O(n) in the number of users).
//!
//! Record accessors in the capability traits only touch the in-memory user;
//! callers persist those changes with `update`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::try_join_all;
use idstore_commons::constants::{DELETED_ON_ATTRIBUTE, ID_ATTRIBUTE};
use idstore_commons::{UserId, ZERO_TIMESTAMP};
use idstore_store::{string_key, EntityTable, KeyCondition, ScanFilter, TableBackend};
use tokio_util::sync::CancellationToken;

use super::models::{IdentityUser, User, UserLogin};
use super::users_schema::{USERS_BY_EMAIL_INDEX, USERS_BY_NAME_INDEX};
use crate::error::{ensure_not_cancelled, require_non_empty, IdentityError, Result};
use crate::models::Claim;
use crate::providers::role_memberships::RoleMembershipsStore;
use crate::traits::{
    UserClaimStore, UserEmailStore, UserLockoutStore, UserLoginStore, UserPasswordStore,
    UserPhoneNumberStore, UserRoleStore, UserSecurityStampStore, UserStore, UserTwoFactorStore,
};

/// Persists users of type `U` and answers user-centric role questions
/// through the membership store.
pub struct UsersStore<U: IdentityUser = User> {
    table: EntityTable<U>,
    memberships: RoleMembershipsStore,
}

impl<U: IdentityUser> Clone for UsersStore<U> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
            memberships: self.memberships.clone(),
        }
    }
}

impl<U: IdentityUser> std::fmt::Debug for UsersStore<U> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsersStore")
            .field("table", &self.table.table_name())
            .field("memberships", &self.memberships.table_name())
            .finish()
    }
}

impl<U: IdentityUser> UsersStore<U> {
    pub fn new(
        backend: Arc<dyn TableBackend>,
        table_name: impl Into<String>,
        memberships: RoleMembershipsStore,
    ) -> Self {
        Self {
            table: EntityTable::new(backend, table_name),
            memberships,
        }
    }

    pub fn table_name(&self) -> &str {
        self.table.table_name()
    }

    pub fn memberships(&self) -> &RoleMembershipsStore {
        &self.memberships
    }

    async fn save(&self, user: &mut U, cancel: &CancellationToken) -> Result<()> {
        ensure_not_cancelled(cancel)?;
        self.table.save(user).await?;
        Ok(())
    }

    /// Live user whose `attribute` equals `value` on a `*-DeletedOn-index`.
    async fn find_live_by_index(
        &self,
        index: &str,
        attribute: &str,
        value: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<U>> {
        ensure_not_cancelled(cancel)?;
        let condition = KeyCondition::hash(attribute, value).and_range(DELETED_ON_ATTRIBUTE, ZERO_TIMESTAMP);
        Ok(self.table.query_first(index, condition).await?)
    }

    /// Live users passing `filter`, via a full scan.
    async fn scan_live(&self, filter: ScanFilter, cancel: &CancellationToken) -> Result<Vec<U>> {
        ensure_not_cancelled(cancel)?;
        let users = self.table.scan_all(vec![filter]).await?;
        Ok(users
            .into_iter()
            .filter(|u| !u.as_user().is_deleted())
            .collect())
    }
}

#[async_trait]
impl<U: IdentityUser> UserStore for UsersStore<U> {
    type User = U;

    async fn create(&self, user: &mut U, cancel: &CancellationToken) -> Result<()> {
        require_non_empty("user_name", &user.as_user().user_name)?;
        require_non_empty("normalized_user_name", &user.as_user().normalized_user_name)?;
        self.save(user, cancel).await?;
        log::debug!("Created user {} in '{}'", user.as_user().id(), self.table_name());
        Ok(())
    }

    async fn update(&self, user: &mut U, cancel: &CancellationToken) -> Result<()> {
        self.save(user, cancel).await
    }

    async fn delete(&self, user: &mut U, cancel: &CancellationToken) -> Result<()> {
        ensure_not_cancelled(cancel)?;
        user.as_user_mut().delete()?;
        self.save(user, cancel).await?;
        log::debug!("Soft-deleted user {}", user.as_user().id());
        Ok(())
    }

    async fn find_by_id(&self, user_id: &str, cancel: &CancellationToken) -> Result<Option<U>> {
        require_non_empty("user_id", user_id)?;
        ensure_not_cancelled(cancel)?;
        let user = self.table.load(&string_key(ID_ATTRIBUTE, user_id)).await?;
        Ok(user.filter(|u| !u.as_user().is_deleted()))
    }

    async fn find_by_normalized_user_name(
        &self,
        normalized_user_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<U>> {
        require_non_empty("normalized_user_name", normalized_user_name)?;
        self.find_live_by_index(USERS_BY_NAME_INDEX, "NormalizedUserName", normalized_user_name, cancel)
            .await
    }

    fn get_user_id(&self, user: &U) -> UserId {
        user.as_user().id().clone()
    }

    fn get_user_name(&self, user: &U) -> String {
        user.as_user().user_name.clone()
    }

    fn set_user_name(&self, _user: &mut U, _user_name: &str) -> Result<()> {
        Err(IdentityError::Unsupported(
            "Changing the username is not supported.".to_string(),
        ))
    }

    fn get_normalized_user_name(&self, user: &U) -> String {
        user.as_user().normalized_user_name.clone()
    }

    fn set_normalized_user_name(&self, user: &mut U, normalized_name: &str) -> Result<()> {
        require_non_empty("normalized_name", normalized_name)?;
        user.as_user_mut().normalized_user_name = normalized_name.to_string();
        Ok(())
    }
}

#[async_trait]
impl<U: IdentityUser> UserClaimStore for UsersStore<U> {
    fn get_claims(&self, user: &U) -> Vec<Claim> {
        user.as_user().claims().to_vec()
    }

    fn add_claims(&self, user: &mut U, claims: &[Claim]) -> Result<()> {
        for claim in claims {
            require_non_empty("claim type", &claim.claim_type)?;
        }
        for claim in claims {
            user.as_user_mut().add_claim(claim.clone());
        }
        Ok(())
    }

    fn replace_claim(&self, user: &mut U, claim: &Claim, new_claim: &Claim) -> Result<()> {
        require_non_empty("claim type", &new_claim.claim_type)?;
        let record = user.as_user_mut();
        let removed = record.remove_claim(claim);
        for _ in 0..removed {
            record.add_claim(new_claim.clone());
        }
        Ok(())
    }

    fn remove_claims(&self, user: &mut U, claims: &[Claim]) -> Result<()> {
        for claim in claims {
            user.as_user_mut().remove_claim(claim);
        }
        Ok(())
    }

    async fn get_users_for_claim(&self, claim: &Claim, cancel: &CancellationToken) -> Result<Vec<U>> {
        require_non_empty("claim type", &claim.claim_type)?;
        let filter = ScanFilter::list_contains_match(
            "Claims",
            [("Type", claim.claim_type.as_str()), ("Value", claim.value.as_str())],
        );
        self.scan_live(filter, cancel).await
    }
}

#[async_trait]
impl<U: IdentityUser> UserLoginStore for UsersStore<U> {
    fn add_login(&self, user: &mut U, login: UserLogin) -> Result<()> {
        require_non_empty("login_provider", &login.login_provider)?;
        require_non_empty("provider_key", &login.provider_key)?;
        user.as_user_mut().add_login(login)
    }

    fn remove_login(&self, user: &mut U, login_provider: &str, provider_key: &str) -> Result<()> {
        require_non_empty("login_provider", login_provider)?;
        require_non_empty("provider_key", provider_key)?;
        user.as_user_mut().remove_login(login_provider, provider_key);
        Ok(())
    }

    fn get_logins(&self, user: &U) -> Vec<UserLogin> {
        user.as_user().logins().to_vec()
    }

    async fn find_by_login(
        &self,
        login_provider: &str,
        provider_key: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<U>> {
        require_non_empty("login_provider", login_provider)?;
        require_non_empty("provider_key", provider_key)?;
        let filter = ScanFilter::list_contains_match(
            "Logins",
            [("LoginProvider", login_provider), ("ProviderKey", provider_key)],
        );
        Ok(self.scan_live(filter, cancel).await?.into_iter().next())
    }
}

impl<U: IdentityUser> UserPasswordStore for UsersStore<U> {
    fn set_password_hash(&self, user: &mut U, password_hash: Option<&str>) {
        user.as_user_mut().password_hash = password_hash.map(String::from);
    }

    fn get_password_hash(&self, user: &U) -> Option<String> {
        user.as_user().password_hash.clone()
    }

    fn has_password(&self, user: &U) -> bool {
        user.as_user().password_hash.is_some()
    }
}

impl<U: IdentityUser> UserSecurityStampStore for UsersStore<U> {
    fn set_security_stamp(&self, user: &mut U, stamp: &str) -> Result<()> {
        require_non_empty("stamp", stamp)?;
        user.as_user_mut().security_stamp = Some(stamp.to_string());
        Ok(())
    }

    fn get_security_stamp(&self, user: &U) -> Option<String> {
        user.as_user().security_stamp.clone()
    }
}

impl<U: IdentityUser> UserTwoFactorStore for UsersStore<U> {
    fn set_two_factor_enabled(&self, user: &mut U, enabled: bool) {
        user.as_user_mut().is_two_factor_enabled = enabled;
    }

    fn get_two_factor_enabled(&self, user: &U) -> bool {
        user.as_user().is_two_factor_enabled
    }
}

#[async_trait]
impl<U: IdentityUser> UserEmailStore for UsersStore<U> {
    fn set_email(&self, user: &mut U, email: &str) -> Result<()> {
        require_non_empty("email", email)?;
        user.as_user_mut().set_email(email);
        Ok(())
    }

    fn get_email(&self, user: &U) -> Option<String> {
        user.as_user().email.as_ref().map(|e| e.value.clone())
    }

    fn get_email_confirmed(&self, user: &U) -> Result<bool> {
        match &user.as_user().email {
            Some(email) => Ok(email.is_confirmed()),
            None => Err(IdentityError::InvalidState(
                "Cannot get the confirmation status of the e-mail since the user doesn't have an e-mail."
                    .to_string(),
            )),
        }
    }

    fn set_email_confirmed(&self, user: &mut U, confirmed: bool) -> Result<()> {
        let email = user.as_user_mut().email.as_mut().ok_or_else(|| {
            IdentityError::InvalidState(
                "Cannot set the confirmation status of the e-mail because user doesn't have an e-mail."
                    .to_string(),
            )
        })?;
        if confirmed {
            email.set_confirmed(Utc::now());
        } else {
            email.set_unconfirmed();
        }
        Ok(())
    }

    async fn find_by_normalized_email(
        &self,
        normalized_email: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<U>> {
        require_non_empty("normalized_email", normalized_email)?;
        self.find_live_by_index(USERS_BY_EMAIL_INDEX, "NormalizedEmail", normalized_email, cancel)
            .await
    }

    fn get_normalized_email(&self, user: &U) -> Option<String> {
        user.as_user().normalized_email.clone()
    }

    fn set_normalized_email(&self, user: &mut U, normalized_email: Option<&str>) {
        // Called even for users without an email; nothing to record then.
        if let Some(normalized) = normalized_email {
            let record = user.as_user_mut();
            record.normalized_email = Some(normalized.to_string());
            if let Some(email) = record.email.as_mut() {
                email.normalized_value = normalized.to_string();
            }
        }
    }
}

impl<U: IdentityUser> UserPhoneNumberStore for UsersStore<U> {
    fn set_phone_number(&self, user: &mut U, phone_number: &str) -> Result<()> {
        require_non_empty("phone_number", phone_number)?;
        user.as_user_mut().set_phone_number(phone_number);
        Ok(())
    }

    fn get_phone_number(&self, user: &U) -> Option<String> {
        user.as_user().phone_number.as_ref().map(|p| p.value.clone())
    }

    fn get_phone_number_confirmed(&self, user: &U) -> Result<bool> {
        match &user.as_user().phone_number {
            Some(phone) => Ok(phone.is_confirmed()),
            None => Err(IdentityError::InvalidState(
                "Cannot get the confirmation status of the phone number since the user doesn't have a phone number."
                    .to_string(),
            )),
        }
    }

    fn set_phone_number_confirmed(&self, user: &mut U, confirmed: bool) -> Result<()> {
        let phone = user.as_user_mut().phone_number.as_mut().ok_or_else(|| {
            IdentityError::InvalidState(
                "Cannot set the confirmation status of the phone number since the user doesn't have a phone number."
                    .to_string(),
            )
        })?;
        if confirmed {
            phone.set_confirmed(Utc::now());
        } else {
            phone.set_unconfirmed();
        }
        Ok(())
    }
}

#[async_trait]
impl<U: IdentityUser> UserLockoutStore for UsersStore<U> {
    fn get_lockout_end_date(&self, user: &U) -> Option<DateTime<Utc>> {
        user.as_user().lockout_end_date
    }

    fn set_lockout_end_date(&self, user: &mut U, lockout_end: Option<DateTime<Utc>>) {
        if let Some(end) = lockout_end {
            user.as_user_mut().lock_until(end);
        }
    }

    async fn increment_access_failed_count(
        &self,
        user: &mut U,
        cancel: &CancellationToken,
    ) -> Result<i32> {
        ensure_not_cancelled(cancel)?;
        let previous = user.as_user().access_failed_count;
        user.as_user_mut().access_failed_count = previous + 1;
        if let Err(err) = self.save(user, cancel).await {
            user.as_user_mut().access_failed_count = previous;
            return Err(err);
        }
        Ok(previous + 1)
    }

    fn reset_access_failed_count(&self, user: &mut U) {
        user.as_user_mut().access_failed_count = 0;
    }

    fn get_access_failed_count(&self, user: &U) -> i32 {
        user.as_user().access_failed_count
    }

    fn get_lockout_enabled(&self, user: &U) -> bool {
        user.as_user().is_lockout_enabled
    }

    fn set_lockout_enabled(&self, user: &mut U, enabled: bool) {
        user.as_user_mut().is_lockout_enabled = enabled;
    }
}

#[async_trait]
impl<U: IdentityUser> UserRoleStore for UsersStore<U> {
    async fn add_to_role(
        &self,
        user: &U,
        normalized_role_name: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.memberships
            .add_to_role(user.as_user().id(), normalized_role_name, cancel)
            .await
    }

    async fn remove_from_role(
        &self,
        user: &U,
        normalized_role_name: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.memberships
            .remove_from_role(user.as_user().id(), normalized_role_name, cancel)
            .await
    }

    async fn get_roles(&self, user: &U, cancel: &CancellationToken) -> Result<Vec<String>> {
        self.memberships.get_roles(user.as_user().id(), cancel).await
    }

    async fn is_in_role(
        &self,
        user: &U,
        normalized_role_name: &str,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        self.memberships
            .is_in_role(user.as_user().id(), normalized_role_name, cancel)
            .await
    }

    async fn get_users_in_role(
        &self,
        normalized_role_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<U>> {
        let user_ids = self
            .memberships
            .get_user_ids_in_role(normalized_role_name, cancel)
            .await?;
        let users = try_join_all(
            user_ids
                .iter()
                .map(|user_id| self.find_by_id(user_id.as_str(), cancel)),
        )
        .await?;
        Ok(users.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::role_memberships::role_memberships_table_schema;
    use crate::providers::users::users_table_schema;
    use idstore_store::{InMemoryTableBackend, ProvisionedThroughput};

    async fn create_test_store() -> (Arc<InMemoryTableBackend>, UsersStore) {
        let backend = Arc::new(InMemoryTableBackend::new());
        backend
            .create_table(&users_table_schema("users", ProvisionedThroughput::default()))
            .await
            .unwrap();
        backend
            .create_table(&role_memberships_table_schema(
                "roleUsers",
                ProvisionedThroughput::default(),
            ))
            .await
            .unwrap();
        let memberships = RoleMembershipsStore::new(backend.clone(), "roleUsers");
        let store = UsersStore::new(backend.clone(), "users", memberships);
        (backend, store)
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let (_backend, store) = create_test_store().await;
        let cancel = CancellationToken::new();
        let mut user = User::with_email("alice", "Alice@Example.com");
        store.create(&mut user, &cancel).await.unwrap();
        assert_eq!(user.version_number(), Some(0));

        let by_id = store.find_by_id(user.id().as_str(), &cancel).await.unwrap();
        assert_eq!(by_id.as_ref(), Some(&user));

        let by_name = store
            .find_by_normalized_user_name("ALICE", &cancel)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_name.id(), user.id());

        let by_email = store
            .find_by_normalized_email("ALICE@EXAMPLE.COM", &cancel)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id(), user.id());

        assert!(store.find_by_id("missing", &cancel).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deleted_user_is_hidden() {
        let (backend, store) = create_test_store().await;
        let cancel = CancellationToken::new();
        let mut user = User::with_email("bob", "bob@example.com");
        store.add_login(&mut user, UserLogin::new("github", "42", None)).unwrap();
        store.create(&mut user, &cancel).await.unwrap();

        store.delete(&mut user, &cancel).await.unwrap();
        assert!(user.is_deleted());
        assert_eq!(backend.item_count("users"), 1);

        assert!(store.find_by_id(user.id().as_str(), &cancel).await.unwrap().is_none());
        assert!(store.find_by_normalized_user_name("BOB", &cancel).await.unwrap().is_none());
        assert!(store
            .find_by_normalized_email("BOB@EXAMPLE.COM", &cancel)
            .await
            .unwrap()
            .is_none());
        assert!(store.find_by_login("github", "42", &cancel).await.unwrap().is_none());

        let err = store.delete(&mut user, &cancel).await.unwrap_err();
        assert!(matches!(err, IdentityError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_user_name_is_immutable() {
        let (_backend, store) = create_test_store().await;
        let mut user = User::new("carol");
        let err = store.set_user_name(&mut user, "caroline").unwrap_err();
        assert!(matches!(err, IdentityError::Unsupported(_)));
        assert_eq!(store.get_user_name(&user), "carol");
    }

    #[tokio::test]
    async fn test_claims_and_lookup() {
        let (_backend, store) = create_test_store().await;
        let cancel = CancellationToken::new();
        let admin = Claim::new("role", "admin");
        let reader = Claim::new("role", "reader");

        let mut dave = User::new("dave");
        store.add_claims(&mut dave, &[admin.clone(), admin.clone()]).unwrap();
        store.create(&mut dave, &cancel).await.unwrap();

        let mut erin = User::new("erin");
        store.add_claims(&mut erin, &[reader.clone()]).unwrap();
        store.create(&mut erin, &cancel).await.unwrap();

        let holders = store.get_users_for_claim(&admin, &cancel).await.unwrap();
        assert_eq!(holders.len(), 1);
        assert_eq!(holders[0].id(), dave.id());

        store.replace_claim(&mut dave, &admin, &reader).unwrap();
        assert_eq!(store.get_claims(&dave), vec![reader.clone(), reader.clone()]);
        store.remove_claims(&mut dave, &[reader.clone()]).unwrap();
        assert!(store.get_claims(&dave).is_empty());
    }

    #[tokio::test]
    async fn test_email_confirmation_requires_email() {
        let (_backend, store) = create_test_store().await;
        let mut user = User::new("frank");
        assert!(matches!(
            store.get_email_confirmed(&user),
            Err(IdentityError::InvalidState(_))
        ));
        assert!(store.set_email_confirmed(&mut user, true).is_err());

        store.set_email(&mut user, "frank@example.com").unwrap();
        assert!(!store.get_email_confirmed(&user).unwrap());
        store.set_email_confirmed(&mut user, true).unwrap();
        assert!(store.get_email_confirmed(&user).unwrap());
        store.set_email_confirmed(&mut user, false).unwrap();
        assert!(!store.get_email_confirmed(&user).unwrap());
    }

    #[tokio::test]
    async fn test_phone_confirmation_can_be_revoked() {
        let (_backend, store) = create_test_store().await;
        let mut user = User::new("gina");
        assert!(store.get_phone_number_confirmed(&user).is_err());

        store.set_phone_number(&mut user, "+15550100").unwrap();
        store.set_phone_number_confirmed(&mut user, true).unwrap();
        assert!(store.get_phone_number_confirmed(&user).unwrap());
        store.set_phone_number_confirmed(&mut user, false).unwrap();
        assert!(!store.get_phone_number_confirmed(&user).unwrap());
    }

    #[tokio::test]
    async fn test_increment_access_failed_count_persists() {
        let (_backend, store) = create_test_store().await;
        let cancel = CancellationToken::new();
        let mut user = User::new("hank");
        store.create(&mut user, &cancel).await.unwrap();

        assert_eq!(store.increment_access_failed_count(&mut user, &cancel).await.unwrap(), 1);
        assert_eq!(store.increment_access_failed_count(&mut user, &cancel).await.unwrap(), 2);

        let stored = store.find_by_id(user.id().as_str(), &cancel).await.unwrap().unwrap();
        assert_eq!(store.get_access_failed_count(&stored), 2);
        assert_eq!(stored.version_number(), Some(2));
    }

    #[tokio::test]
    async fn test_stale_update_is_rejected() {
        let (_backend, store) = create_test_store().await;
        let cancel = CancellationToken::new();
        let mut user = User::new("ivy");
        store.create(&mut user, &cancel).await.unwrap();

        let mut stale = user.clone();
        store.set_two_factor_enabled(&mut user, true);
        store.update(&mut user, &cancel).await.unwrap();

        let err = store.update(&mut stale, &cancel).await.unwrap_err();
        assert!(matches!(
            err,
            IdentityError::Storage(ref e) if e.is_conditional_check_failed()
        ));
    }

    #[tokio::test]
    async fn test_users_in_role_skip_deleted() {
        let (_backend, store) = create_test_store().await;
        let cancel = CancellationToken::new();
        let mut jack = User::new("jack");
        let mut kate = User::new("kate");
        store.create(&mut jack, &cancel).await.unwrap();
        store.create(&mut kate, &cancel).await.unwrap();
        store.add_to_role(&jack, "ADMIN", &cancel).await.unwrap();
        store.add_to_role(&kate, "ADMIN", &cancel).await.unwrap();

        store.delete(&mut kate, &cancel).await.unwrap();

        let members = store.get_users_in_role("ADMIN", &cancel).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id(), jack.id());
        assert!(store.is_in_role(&jack, "ADMIN", &cancel).await.unwrap());
        assert_eq!(store.get_roles(&jack, &cancel).await.unwrap(), vec!["ADMIN"]);
    }

    #[tokio::test]
    async fn test_cancelled_create_writes_nothing() {
        let (backend, store) = create_test_store().await;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut user = User::new("liam");
        assert!(matches!(
            store.create(&mut user, &cancel).await,
            Err(IdentityError::Cancelled)
        ));
        assert_eq!(backend.item_count("users"), 0);
        assert_eq!(user.version_number(), None);
    }
}
