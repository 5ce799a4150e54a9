// idstore operator entrypoint
//!
//! Loads configuration, installs logging, provisions the identity tables
//! and runs one command against them.

mod args;
mod commands;
mod lifecycle;
mod logging;

use anyhow::{Context, Result};
use args::{Cli, Command};
use clap::Parser;
use idstore_configs::IdentityConfig;
use log::info;
use std::path::Path;

/// File defaults, then `IDSTORE_*` environment overrides.
fn load_config(path: &Path) -> Result<IdentityConfig> {
    let mut config = if path.exists() {
        IdentityConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?
    } else {
        eprintln!("Config file {} not found, using defaults", path.display());
        IdentityConfig::default()
    };
    config.apply_env_overrides()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    logging::init_logging(&config.logging, "idstore.log")?;
    info!(
        "idstore v{} (backend: {}, tables: {}/{}/{})",
        env!("CARGO_PKG_VERSION"),
        config.backend.kind,
        config.tables.users,
        config.tables.roles,
        config.tables.role_memberships
    );

    let app = lifecycle::bootstrap(&config).await?;
    let cancel = &app.cancel;

    match cli.command {
        Command::Init => {
            println!("{}", commands::init::format_tables(&app.tables));
        }
        Command::CreateUser { user_name, email } => {
            let user =
                commands::create_user::create_user(&app.stores, &user_name, email.as_deref(), cancel)
                    .await?;
            println!("{}", user.id());
        }
        Command::AddToRole {
            user_name,
            role_name,
        } => {
            commands::add_to_role::add_to_role(&app.stores, &user_name, &role_name, cancel).await?;
        }
        Command::ShowUser { user_name } => {
            print!("{}", commands::show_user::show_user(&app.stores, &user_name, cancel).await?);
        }
    }

    app.cancel.cancel();
    Ok(())
}
