use chrono::{DateTime, Utc};
use idstore_commons::constants::ID_ATTRIBUTE;
use idstore_commons::{normalize_key, timestamp, RoleId};
use idstore_store::{string_key, Item, TableEntity};
use serde::{Deserialize, Serialize};

use crate::error::{IdentityError, Result};
use crate::models::Claim;

/// Identity role. Soft-deleted like users; looked up by `NormalizedName`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Role {
    id: RoleId,
    pub name: String,
    pub normalized_name: String,
    #[serde(default)]
    claims: Vec<Claim>,
    created_on: DateTime<Utc>,
    #[serde(default, with = "timestamp::soft_delete")]
    deleted_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version_number: Option<i64>,
}

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: RoleId::generate(),
            normalized_name: normalize_key(&name),
            name,
            claims: Vec::new(),
            created_on: Utc::now(),
            deleted_on: None,
            version_number: None,
        }
    }

    pub fn id(&self) -> &RoleId {
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

    pub fn claims(&self) -> &[Claim] {
        &self.claims
    }

    pub fn add_claim(&mut self, claim: Claim) {
        self.claims.push(claim);
    }

    /// Removes every claim equal to `claim`.
    pub fn remove_claim(&mut self, claim: &Claim) {
        self.claims.retain(|c| c != claim);
    }

    pub fn delete(&mut self) -> Result<()> {
        if self.deleted_on.is_some() {
            return Err(IdentityError::InvalidState(format!(
                "Role '{}' has already been deleted.",
                self.id
            )));
        }
        self.deleted_on = Some(Utc::now());
        Ok(())
    }
}

impl TableEntity for Role {
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

/// A role type the role store can persist. See [`impl_identity_role!`](crate::impl_identity_role).
pub trait IdentityRole: TableEntity + Clone + Send + Sync + 'static {
    fn as_role(&self) -> &Role;
    fn as_role_mut(&mut self) -> &mut Role;
}

impl IdentityRole for Role {
    fn as_role(&self) -> &Role {
        self
    }

    fn as_role_mut(&mut self) -> &mut Role {
        self
    }
}

/// Implements `IdentityRole` and `TableEntity` for a type embedding a [`Role`].
#[macro_export]
macro_rules! impl_identity_role {
    ($ty:ty, $field:ident) => {
        impl $crate::IdentityRole for $ty {
            fn as_role(&self) -> &$crate::Role {
                &self.$field
            }

            fn as_role_mut(&mut self) -> &mut $crate::Role {
                &mut self.$field
            }
        }

        impl $crate::store::TableEntity for $ty {
            fn primary_key(&self) -> $crate::store::Item {
                <$crate::Role as $crate::store::TableEntity>::primary_key(&self.$field)
            }

            fn version(&self) -> Option<i64> {
                <$crate::Role as $crate::store::TableEntity>::version(&self.$field)
            }

            fn set_version(&mut self, version: Option<i64>) {
                <$crate::Role as $crate::store::TableEntity>::set_version(&mut self.$field, version)
            }
        }
    };
}
