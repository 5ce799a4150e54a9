use std::sync::Arc;

use async_trait::async_trait;
use idstore_commons::constants::{DELETED_ON_ATTRIBUTE, ID_ATTRIBUTE};
use idstore_commons::{RoleId, ZERO_TIMESTAMP};
use idstore_store::{string_key, EntityTable, KeyCondition, TableBackend};
use tokio_util::sync::CancellationToken;

use super::models::{IdentityRole, Role};
use super::roles_schema::ROLES_BY_NAME_INDEX;
use crate::error::{ensure_not_cancelled, require_non_empty, IdentityError, Result};
use crate::models::Claim;
use crate::traits::{RoleClaimStore, RoleStore};

/// Persists roles of type `R`. Role names are fixed once created.
pub struct RolesStore<R: IdentityRole = Role> {
    table: EntityTable<R>,
}

impl<R: IdentityRole> Clone for RolesStore<R> {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

impl<R: IdentityRole> std::fmt::Debug for RolesStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RolesStore")
            .field("table", &self.table.table_name())
            .finish()
    }
}

impl<R: IdentityRole> RolesStore<R> {
    pub fn new(backend: Arc<dyn TableBackend>, table_name: impl Into<String>) -> Self {
        Self {
            table: EntityTable::new(backend, table_name),
        }
    }

    pub fn table_name(&self) -> &str {
        self.table.table_name()
    }

    async fn save(&self, role: &mut R, cancel: &CancellationToken) -> Result<()> {
        ensure_not_cancelled(cancel)?;
        self.table.save(role).await?;
        Ok(())
    }
}

#[async_trait]
impl<R: IdentityRole> RoleStore for RolesStore<R> {
    type Role = R;

    async fn create(&self, role: &mut R, cancel: &CancellationToken) -> Result<()> {
        require_non_empty("name", &role.as_role().name)?;
        require_non_empty("normalized_name", &role.as_role().normalized_name)?;
        self.save(role, cancel).await?;
        log::debug!("Created role '{}' ({})", role.as_role().name, role.as_role().id());
        Ok(())
    }

    async fn update(&self, role: &mut R, cancel: &CancellationToken) -> Result<()> {
        self.save(role, cancel).await
    }

    async fn delete(&self, role: &mut R, cancel: &CancellationToken) -> Result<()> {
        ensure_not_cancelled(cancel)?;
        role.as_role_mut().delete()?;
        self.save(role, cancel).await
    }

    async fn find_by_id(&self, role_id: &str, cancel: &CancellationToken) -> Result<Option<R>> {
        require_non_empty("role_id", role_id)?;
        ensure_not_cancelled(cancel)?;
        let role = self.table.load(&string_key(ID_ATTRIBUTE, role_id)).await?;
        Ok(role.filter(|r| !r.as_role().is_deleted()))
    }

    async fn find_by_normalized_name(
        &self,
        normalized_role_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<R>> {
        require_non_empty("normalized_role_name", normalized_role_name)?;
        ensure_not_cancelled(cancel)?;
        let condition = KeyCondition::hash("NormalizedName", normalized_role_name)
            .and_range(DELETED_ON_ATTRIBUTE, ZERO_TIMESTAMP);
        Ok(self.table.query_first(ROLES_BY_NAME_INDEX, condition).await?)
    }

    fn get_role_id(&self, role: &R) -> RoleId {
        role.as_role().id().clone()
    }

    fn get_role_name(&self, role: &R) -> String {
        role.as_role().name.clone()
    }

    fn set_role_name(&self, _role: &mut R, _role_name: &str) -> Result<()> {
        Err(IdentityError::Unsupported(
            "Changing the role name is not supported.".to_string(),
        ))
    }

    fn get_normalized_role_name(&self, role: &R) -> String {
        role.as_role().normalized_name.clone()
    }

    fn set_normalized_role_name(&self, _role: &mut R, _normalized_name: &str) -> Result<()> {
        Err(IdentityError::Unsupported(
            "Changing the role normalized name is not supported.".to_string(),
        ))
    }
}

impl<R: IdentityRole> RoleClaimStore for RolesStore<R> {
    fn get_claims(&self, role: &R) -> Vec<Claim> {
        role.as_role().claims().to_vec()
    }

    fn add_claim(&self, role: &mut R, claim: &Claim) -> Result<()> {
        require_non_empty("claim type", &claim.claim_type)?;
        role.as_role_mut().add_claim(claim.clone());
        Ok(())
    }

    fn remove_claim(&self, role: &mut R, claim: &Claim) -> Result<()> {
        role.as_role_mut().remove_claim(claim);
        Ok(())
    }
}
