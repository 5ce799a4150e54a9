//! Capability interfaces consumed by an authentication framework.
//!
//! Each trait covers one concern so a caller can ask for exactly what it
//! uses. [`UsersStore`](crate::UsersStore) and [`RolesStore`](crate::RolesStore)
//! implement all of them.
//!
//! Methods that reach the table backend are `async` and take a
//! [`CancellationToken`], which is checked before the request is issued.
//! Methods that only read or change the in-memory record are synchronous;
//! their changes are persisted by a later `update`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use idstore_commons::{RoleId, UserId};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::models::Claim;
use crate::providers::roles::models::IdentityRole;
use crate::providers::users::models::{IdentityUser, UserLogin};

#[async_trait]
pub trait UserStore: Send + Sync {
    type User: IdentityUser;

    async fn create(&self, user: &mut Self::User, cancel: &CancellationToken) -> Result<()>;

    async fn update(&self, user: &mut Self::User, cancel: &CancellationToken) -> Result<()>;

    /// Soft delete: stamps `DeletedOn` and saves. Deleting twice is an error.
    async fn delete(&self, user: &mut Self::User, cancel: &CancellationToken) -> Result<()>;

    /// `None` when the id is unknown or the user is deleted.
    async fn find_by_id(&self, user_id: &str, cancel: &CancellationToken)
        -> Result<Option<Self::User>>;

    async fn find_by_normalized_user_name(
        &self,
        normalized_user_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Self::User>>;

    fn get_user_id(&self, user: &Self::User) -> UserId;

    fn get_user_name(&self, user: &Self::User) -> String;

    /// Always fails: user names are immutable.
    fn set_user_name(&self, user: &mut Self::User, user_name: &str) -> Result<()>;

    fn get_normalized_user_name(&self, user: &Self::User) -> String;

    fn set_normalized_user_name(&self, user: &mut Self::User, normalized_name: &str) -> Result<()>;
}

#[async_trait]
pub trait UserClaimStore: UserStore {
    fn get_claims(&self, user: &Self::User) -> Vec<Claim>;

    fn add_claims(&self, user: &mut Self::User, claims: &[Claim]) -> Result<()>;

    /// Replaces every claim equal to `claim` with `new_claim`.
    fn replace_claim(&self, user: &mut Self::User, claim: &Claim, new_claim: &Claim) -> Result<()>;

    fn remove_claims(&self, user: &mut Self::User, claims: &[Claim]) -> Result<()>;

    /// Live users holding the claim. Full table scan.
    async fn get_users_for_claim(
        &self,
        claim: &Claim,
        cancel: &CancellationToken,
    ) -> Result<Vec<Self::User>>;
}

#[async_trait]
pub trait UserLoginStore: UserStore {
    fn add_login(&self, user: &mut Self::User, login: UserLogin) -> Result<()>;

    fn remove_login(&self, user: &mut Self::User, login_provider: &str, provider_key: &str)
        -> Result<()>;

    fn get_logins(&self, user: &Self::User) -> Vec<UserLogin>;

    /// First live user holding the login. Full table scan.
    async fn find_by_login(
        &self,
        login_provider: &str,
        provider_key: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Self::User>>;
}

pub trait UserPasswordStore: UserStore {
    fn set_password_hash(&self, user: &mut Self::User, password_hash: Option<&str>);

    fn get_password_hash(&self, user: &Self::User) -> Option<String>;

    fn has_password(&self, user: &Self::User) -> bool;
}

pub trait UserSecurityStampStore: UserStore {
    fn set_security_stamp(&self, user: &mut Self::User, stamp: &str) -> Result<()>;

    fn get_security_stamp(&self, user: &Self::User) -> Option<String>;
}

pub trait UserTwoFactorStore: UserStore {
    fn set_two_factor_enabled(&self, user: &mut Self::User, enabled: bool);

    fn get_two_factor_enabled(&self, user: &Self::User) -> bool;
}

#[async_trait]
pub trait UserEmailStore: UserStore {
    fn set_email(&self, user: &mut Self::User, email: &str) -> Result<()>;

    fn get_email(&self, user: &Self::User) -> Option<String>;

    /// Fails when the user has no email.
    fn get_email_confirmed(&self, user: &Self::User) -> Result<bool>;

    /// Fails when the user has no email.
    fn set_email_confirmed(&self, user: &mut Self::User, confirmed: bool) -> Result<()>;

    async fn find_by_normalized_email(
        &self,
        normalized_email: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Self::User>>;

    fn get_normalized_email(&self, user: &Self::User) -> Option<String>;

    /// `None` leaves the record untouched.
    fn set_normalized_email(&self, user: &mut Self::User, normalized_email: Option<&str>);
}

pub trait UserPhoneNumberStore: UserStore {
    fn set_phone_number(&self, user: &mut Self::User, phone_number: &str) -> Result<()>;

    fn get_phone_number(&self, user: &Self::User) -> Option<String>;

    /// Fails when the user has no phone number.
    fn get_phone_number_confirmed(&self, user: &Self::User) -> Result<bool>;

    /// Fails when the user has no phone number.
    fn set_phone_number_confirmed(&self, user: &mut Self::User, confirmed: bool) -> Result<()>;
}

#[async_trait]
pub trait UserLockoutStore: UserStore {
    fn get_lockout_end_date(&self, user: &Self::User) -> Option<DateTime<Utc>>;

    /// `None` leaves the record untouched.
    fn set_lockout_end_date(&self, user: &mut Self::User, lockout_end: Option<DateTime<Utc>>);

    /// Bumps the counter and saves the user right away. Returns the new count.
    async fn increment_access_failed_count(
        &self,
        user: &mut Self::User,
        cancel: &CancellationToken,
    ) -> Result<i32>;

    fn reset_access_failed_count(&self, user: &mut Self::User);

    fn get_access_failed_count(&self, user: &Self::User) -> i32;

    fn get_lockout_enabled(&self, user: &Self::User) -> bool;

    fn set_lockout_enabled(&self, user: &mut Self::User, enabled: bool);
}

#[async_trait]
pub trait UserRoleStore: UserStore {
    async fn add_to_role(
        &self,
        user: &Self::User,
        normalized_role_name: &str,
        cancel: &CancellationToken,
    ) -> Result<()>;

    async fn remove_from_role(
        &self,
        user: &Self::User,
        normalized_role_name: &str,
        cancel: &CancellationToken,
    ) -> Result<()>;

    async fn get_roles(&self, user: &Self::User, cancel: &CancellationToken) -> Result<Vec<String>>;

    async fn is_in_role(
        &self,
        user: &Self::User,
        normalized_role_name: &str,
        cancel: &CancellationToken,
    ) -> Result<bool>;

    /// Live members of the role; ids that no longer resolve are skipped.
    async fn get_users_in_role(
        &self,
        normalized_role_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Self::User>>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    type Role: IdentityRole;

    async fn create(&self, role: &mut Self::Role, cancel: &CancellationToken) -> Result<()>;

    async fn update(&self, role: &mut Self::Role, cancel: &CancellationToken) -> Result<()>;

    /// Soft delete. Deleting twice is an error.
    async fn delete(&self, role: &mut Self::Role, cancel: &CancellationToken) -> Result<()>;

    async fn find_by_id(&self, role_id: &str, cancel: &CancellationToken)
        -> Result<Option<Self::Role>>;

    async fn find_by_normalized_name(
        &self,
        normalized_role_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<Self::Role>>;

    fn get_role_id(&self, role: &Self::Role) -> RoleId;

    fn get_role_name(&self, role: &Self::Role) -> String;

    /// Always fails: role names are immutable.
    fn set_role_name(&self, role: &mut Self::Role, role_name: &str) -> Result<()>;

    fn get_normalized_role_name(&self, role: &Self::Role) -> String;

    /// Always fails: role names are immutable.
    fn set_normalized_role_name(&self, role: &mut Self::Role, normalized_name: &str) -> Result<()>;
}

pub trait RoleClaimStore: RoleStore {
    fn get_claims(&self, role: &Self::Role) -> Vec<Claim>;

    fn add_claim(&self, role: &mut Self::Role, claim: &Claim) -> Result<()>;

    fn remove_claim(&self, role: &mut Self::Role, claim: &Claim) -> Result<()>;
}
