use chrono::{DateTime, Utc};
use idstore_commons::constants::ID_ATTRIBUTE;
use idstore_commons::{MembershipId, UserId};
use idstore_store::{string_key, Item, TableEntity};
use serde::{Deserialize, Serialize};

/// One (role, user) edge. Memberships are removed physically, not soft-deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RoleMembership {
    id: MembershipId,
    pub normalized_role_name: String,
    pub user_id: UserId,
    created_on: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version_number: Option<i64>,
}

impl RoleMembership {
    pub fn new(normalized_role_name: impl Into<String>, user_id: UserId) -> Self {
        Self {
            id: MembershipId::generate(),
            normalized_role_name: normalized_role_name.into(),
            user_id,
            created_on: Utc::now(),
            version_number: None,
        }
    }

    pub fn id(&self) -> &MembershipId {
        &self.id
    }

    pub fn created_on(&self) -> DateTime<Utc> {
        self.created_on
    }
}

impl TableEntity for RoleMembership {
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
