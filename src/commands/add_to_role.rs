use anyhow::{Context, Result};
use idstore_commons::normalize_key;
use idstore_identity::prelude::*;
use idstore_identity::IdentityStores;
use log::info;
use tokio_util::sync::CancellationToken;

/// Adds the user to the role. The role record is created on first use.
pub async fn add_to_role(
    stores: &IdentityStores,
    user_name: &str,
    role_name: &str,
    cancel: &CancellationToken,
) -> Result<()> {
    let user = stores
        .users
        .find_by_normalized_user_name(&normalize_key(user_name), cancel)
        .await?
        .with_context(|| format!("User '{}' not found", user_name))?;

    let normalized_role = normalize_key(role_name);
    let role = stores
        .roles
        .find_by_normalized_name(&normalized_role, cancel)
        .await?;
    if role.is_none() {
        let mut role = Role::new(role_name);
        stores
            .roles
            .create(&mut role, cancel)
            .await
            .with_context(|| format!("Failed to create role '{}'", role_name))?;
        info!("Created role '{}' ({})", role_name, role.id());
    }

    stores
        .users
        .add_to_role(&user, &normalized_role, cancel)
        .await
        .with_context(|| format!("Failed to add '{}' to role '{}'", user_name, role_name))?;
    info!("User '{}' is in role '{}'", user_name, normalized_role);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::create_user::create_user;
    use crate::commands::test_support::memory_app;

    #[tokio::test]
    async fn test_add_creates_role_once() {
        let app = memory_app().await;
        let user = create_user(&app.stores, "bob", None, &app.cancel).await.unwrap();

        add_to_role(&app.stores, "bob", "Admin", &app.cancel).await.unwrap();
        add_to_role(&app.stores, "BOB", "admin", &app.cancel).await.unwrap();

        let role = app
            .stores
            .roles
            .find_by_normalized_name("ADMIN", &app.cancel)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(role.name, "Admin");
        assert_eq!(
            app.stores.users.get_roles(&user, &app.cancel).await.unwrap(),
            vec!["ADMIN"]
        );
    }

    #[tokio::test]
    async fn test_unknown_user_fails() {
        let app = memory_app().await;
        let err = add_to_role(&app.stores, "nobody", "Admin", &app.cancel)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
