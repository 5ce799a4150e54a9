//! Role-membership edges.
//!
//! Every read goes through one of the two membership indexes; nothing here
//! scans. `query_memberships` is the single primitive the other operations
//! are expressed in.

use std::sync::Arc;

use idstore_commons::UserId;
use idstore_store::{EntityTable, KeyCondition, TableBackend};
use tokio_util::sync::CancellationToken;

use super::models::RoleMembership;
use super::role_memberships_schema::{
    MEMBERSHIPS_BY_ROLE_INDEX, MEMBERSHIPS_BY_USER_INDEX, ROLE_ATTRIBUTE, USER_ATTRIBUTE,
};
use crate::error::{ensure_not_cancelled, require_non_empty, IdentityError, Result};

/// Store for (role, user) membership edges.
#[derive(Clone, Debug)]
pub struct RoleMembershipsStore {
    table: EntityTable<RoleMembership>,
}

impl RoleMembershipsStore {
    pub fn new(backend: Arc<dyn TableBackend>, table_name: impl Into<String>) -> Self {
        Self {
            table: EntityTable::new(backend, table_name),
        }
    }

    pub fn table_name(&self) -> &str {
        self.table.table_name()
    }

    /// Adds the user to the role unless already a member.
    ///
    /// The membership check and the insert are separate requests, so two
    /// concurrent calls for the same pair can both insert.
    pub async fn add_to_role(
        &self,
        user_id: &UserId,
        normalized_role_name: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if self.is_in_role(user_id, normalized_role_name, cancel).await? {
            log::debug!("user {} already in role {}", user_id, normalized_role_name);
            return Ok(());
        }

        ensure_not_cancelled(cancel)?;
        let mut membership = RoleMembership::new(normalized_role_name, user_id.clone());
        self.table.save(&mut membership).await?;
        Ok(())
    }

    /// Deletes every membership row for the pair. Not atomic across rows.
    pub async fn remove_from_role(
        &self,
        user_id: &UserId,
        normalized_role_name: &str,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let memberships = self
            .query_memberships(Some(normalized_role_name), Some(user_id), cancel)
            .await?;
        for membership in &memberships {
            ensure_not_cancelled(cancel)?;
            self.table.delete(membership).await?;
        }
        Ok(())
    }

    /// Distinct role names of the user, in index order.
    pub async fn get_roles(&self, user_id: &UserId, cancel: &CancellationToken) -> Result<Vec<String>> {
        let memberships = self.query_memberships(None, Some(user_id), cancel).await?;
        let mut roles: Vec<String> = Vec::with_capacity(memberships.len());
        for membership in memberships {
            if !roles.contains(&membership.normalized_role_name) {
                roles.push(membership.normalized_role_name);
            }
        }
        Ok(roles)
    }

    pub async fn is_in_role(
        &self,
        user_id: &UserId,
        normalized_role_name: &str,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let memberships = self
            .query_memberships(Some(normalized_role_name), Some(user_id), cancel)
            .await?;
        Ok(!memberships.is_empty())
    }

    /// Distinct ids of the role's members, in index order.
    pub async fn get_user_ids_in_role(
        &self,
        normalized_role_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<UserId>> {
        let memberships = self
            .query_memberships(Some(normalized_role_name), None, cancel)
            .await?;
        let mut user_ids: Vec<UserId> = Vec::with_capacity(memberships.len());
        for membership in memberships {
            if !user_ids.contains(&membership.user_id) {
                user_ids.push(membership.user_id);
            }
        }
        Ok(user_ids)
    }

    /// Memberships filtered by role, user, or both.
    ///
    /// With a role the role-keyed index is used (the user, if given, becomes
    /// the range condition); otherwise the user-keyed index. At least one of
    /// the two must be given.
    pub async fn query_memberships(
        &self,
        normalized_role_name: Option<&str>,
        user_id: Option<&UserId>,
        cancel: &CancellationToken,
    ) -> Result<Vec<RoleMembership>> {
        let (index, condition) = match (normalized_role_name, user_id) {
            (Some(role), user) => {
                require_non_empty("normalized_role_name", role)?;
                let mut condition = KeyCondition::hash(ROLE_ATTRIBUTE, role);
                if let Some(user) = user {
                    require_non_empty("user_id", user.as_str())?;
                    condition = condition.and_range(USER_ATTRIBUTE, user.as_str());
                }
                (MEMBERSHIPS_BY_ROLE_INDEX, condition)
            }
            (None, Some(user)) => {
                require_non_empty("user_id", user.as_str())?;
                (MEMBERSHIPS_BY_USER_INDEX, KeyCondition::hash(USER_ATTRIBUTE, user.as_str()))
            }
            (None, None) => {
                return Err(IdentityError::InvalidArgument(
                    "either a role name or a user id is required".to_string(),
                ));
            }
        };

        ensure_not_cancelled(cancel)?;
        Ok(self.table.query_all(index, condition).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::role_memberships::role_memberships_table_schema;
    use idstore_store::{InMemoryTableBackend, ProvisionedThroughput};

    async fn create_test_store() -> (Arc<InMemoryTableBackend>, RoleMembershipsStore) {
        let backend = Arc::new(InMemoryTableBackend::new());
        backend
            .create_table(&role_memberships_table_schema(
                "roleUsers",
                ProvisionedThroughput::default(),
            ))
            .await
            .unwrap();
        let store = RoleMembershipsStore::new(backend.clone(), "roleUsers");
        (backend, store)
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let (backend, store) = create_test_store().await;
        let cancel = CancellationToken::new();
        let user = UserId::new("u1");

        store.add_to_role(&user, "ADMIN", &cancel).await.unwrap();
        store.add_to_role(&user, "ADMIN", &cancel).await.unwrap();

        assert_eq!(backend.item_count("roleUsers"), 1);
        assert_eq!(store.get_roles(&user, &cancel).await.unwrap(), vec!["ADMIN"]);
    }

    #[tokio::test]
    async fn test_remove_and_membership_checks() {
        let (_backend, store) = create_test_store().await;
        let cancel = CancellationToken::new();
        let u1 = UserId::new("u1");
        let u2 = UserId::new("u2");

        store.add_to_role(&u1, "ADMIN", &cancel).await.unwrap();
        store.add_to_role(&u1, "EDITOR", &cancel).await.unwrap();
        store.add_to_role(&u2, "ADMIN", &cancel).await.unwrap();

        assert!(store.is_in_role(&u1, "EDITOR", &cancel).await.unwrap());
        assert!(!store.is_in_role(&u2, "EDITOR", &cancel).await.unwrap());

        let mut admins = store.get_user_ids_in_role("ADMIN", &cancel).await.unwrap();
        admins.sort();
        assert_eq!(admins, vec![u1.clone(), u2.clone()]);

        store.remove_from_role(&u1, "ADMIN", &cancel).await.unwrap();
        assert_eq!(store.get_user_ids_in_role("ADMIN", &cancel).await.unwrap(), vec![u2]);
        assert_eq!(store.get_roles(&u1, &cancel).await.unwrap(), vec!["EDITOR"]);

        // Removing a membership that does not exist is a no-op.
        store.remove_from_role(&u1, "ADMIN", &cancel).await.unwrap();
    }

    #[tokio::test]
    async fn test_query_requires_role_or_user() {
        let (_backend, store) = create_test_store().await;
        let err = store
            .query_memberships(None, None, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_cancelled_before_io() {
        let (backend, store) = create_test_store().await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = store
            .add_to_role(&UserId::new("u1"), "ADMIN", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, IdentityError::Cancelled));
        assert_eq!(backend.item_count("roleUsers"), 0);
    }
}
