use serde::{Deserialize, Serialize};

/// An external login (provider + provider-scoped key) attached to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserLogin {
    pub login_provider: String,
    pub provider_key: String,
    pub provider_display_name: String,
}

impl UserLogin {
    /// A missing display name falls back to the provider name.
    pub fn new(
        login_provider: impl Into<String>,
        provider_key: impl Into<String>,
        provider_display_name: Option<String>,
    ) -> Self {
        let login_provider = login_provider.into();
        Self {
            provider_display_name: provider_display_name.unwrap_or_else(|| login_provider.clone()),
            login_provider,
            provider_key: provider_key.into(),
        }
    }

    pub fn matches(&self, login_provider: &str, provider_key: &str) -> bool {
        self.login_provider == login_provider && self.provider_key == provider_key
    }
}
