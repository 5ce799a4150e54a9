use serde::{Deserialize, Serialize};

/// A typed statement about a user or role, e.g. `("department", "billing")`.
///
/// Two claims are the same claim when both type and value match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    #[serde(rename = "Type")]
    pub claim_type: String,
    #[serde(rename = "Value")]
    pub value: String,
}

impl Claim {
    pub fn new(claim_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            claim_type: claim_type.into(),
            value: value.into(),
        }
    }
}
