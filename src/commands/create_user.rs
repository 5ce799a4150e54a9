//! Create user command
//!
//! Refuses duplicates by user name and by email among live users.

use anyhow::{Context, Result};
use idstore_commons::normalize_key;
use idstore_identity::prelude::*;
use idstore_identity::IdentityStores;
use log::info;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub async fn create_user(
    stores: &IdentityStores,
    user_name: &str,
    email: Option<&str>,
    cancel: &CancellationToken,
) -> Result<User> {
    let users = &stores.users;

    let normalized_name = normalize_key(user_name);
    if users
        .find_by_normalized_user_name(&normalized_name, cancel)
        .await
        .context("Failed to look up user name")?
        .is_some()
    {
        anyhow::bail!("User '{}' already exists", user_name);
    }

    let mut user = User::new(user_name);
    if let Some(email) = email {
        if users
            .find_by_normalized_email(&normalize_key(email), cancel)
            .await
            .context("Failed to look up email")?
            .is_some()
        {
            anyhow::bail!("Email '{}' is already in use", email);
        }
        users.set_email(&mut user, email)?;
    }
    users.set_security_stamp(&mut user, &Uuid::new_v4().simple().to_string().to_uppercase())?;

    users
        .create(&mut user, cancel)
        .await
        .with_context(|| format!("Failed to create user '{}'", user_name))?;

    info!("Created user '{}' ({})", user_name, user.id());
    Ok(user)
}
