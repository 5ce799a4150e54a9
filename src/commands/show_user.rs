use std::fmt::Write;

use anyhow::{Context, Result};
use idstore_commons::normalize_key;
use idstore_identity::prelude::*;
use idstore_identity::IdentityStores;
use tokio_util::sync::CancellationToken;

/// Renders the live user with that name, including role memberships.
pub async fn show_user(
    stores: &IdentityStores,
    user_name: &str,
    cancel: &CancellationToken,
) -> Result<String> {
    let users = &stores.users;
    let user = users
        .find_by_normalized_user_name(&normalize_key(user_name), cancel)
        .await?
        .with_context(|| format!("User '{}' not found", user_name))?;
    let roles = users.get_roles(&user, cancel).await?;

    let mut out = String::new();
    writeln!(out, "Id:              {}", user.id())?;
    writeln!(out, "User name:       {}", user.user_name)?;
    writeln!(out, "Email:           {}", users.get_email(&user).unwrap_or_else(|| "-".into()))?;
    if users.get_email(&user).is_some() {
        writeln!(out, "Email confirmed: {}", users.get_email_confirmed(&user)?)?;
    }
    writeln!(out, "Phone:           {}", users.get_phone_number(&user).unwrap_or_else(|| "-".into()))?;
    writeln!(out, "Two-factor:      {}", users.get_two_factor_enabled(&user))?;
    writeln!(out, "Lockout enabled: {}", users.get_lockout_enabled(&user))?;
    if let Some(end) = users.get_lockout_end_date(&user) {
        writeln!(out, "Locked until:    {}", end.to_rfc3339())?;
    }
    writeln!(out, "Failed logins:   {}", users.get_access_failed_count(&user))?;
    writeln!(out, "Created:         {}", user.created_on().to_rfc3339())?;
    writeln!(out, "Version:         {}", user.version_number().unwrap_or_default())?;
    writeln!(out, "Roles:           {}", if roles.is_empty() { "-".to_string() } else { roles.join(", ") })?;
    for claim in users.get_claims(&user) {
        writeln!(out, "Claim:           {} = {}", claim.claim_type, claim.value)?;
    }
    for login in users.get_logins(&user) {
        writeln!(out, "Login:           {} ({})", login.provider_display_name, login.provider_key)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::add_to_role::add_to_role;
    use crate::commands::create_user::create_user;
    use crate::commands::test_support::memory_app;

    #[tokio::test]
    async fn test_show_user_lists_roles() {
        let app = memory_app().await;
        create_user(&app.stores, "carol", Some("carol@x.com"), &app.cancel)
            .await
            .unwrap();
        add_to_role(&app.stores, "carol", "Editor", &app.cancel).await.unwrap();

        let report = show_user(&app.stores, "carol", &app.cancel).await.unwrap();
        assert!(report.contains("carol@x.com"));
        assert!(report.contains("Email confirmed: false"));
        assert!(report.contains("Roles:           EDITOR"));
    }
}
