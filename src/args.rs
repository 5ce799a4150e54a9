use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// idstore - provision and inspect the identity tables
#[derive(Parser, Debug)]
#[command(name = "idstore")]
#[command(version)]
#[command(about = "Provision and inspect the users, roles and role-membership tables", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration (defaults apply when the file is missing)
    #[arg(short = 'c', long = "config", env = "IDSTORE_CONFIG", default_value = "idstore.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the identity tables and any missing indexes, then wait until active
    Init,

    /// Create a user
    CreateUser {
        user_name: String,

        #[arg(long)]
        email: Option<String>,
    },

    /// Add a user to a role, creating the role when it does not exist yet
    AddToRole { user_name: String, role_name: String },

    /// Print a user's record and roles
    ShowUser { user_name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_create_user() {
        let cli = Cli::parse_from(["idstore", "create-user", "alice", "--email", "alice@x.com"]);
        match cli.command {
            Command::CreateUser { user_name, email } => {
                assert_eq!(user_name, "alice");
                assert_eq!(email.as_deref(), Some("alice@x.com"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_flag() {
        let cli = Cli::parse_from(["idstore", "--config", "/etc/idstore.toml", "init"]);
        assert_eq!(cli.config, PathBuf::from("/etc/idstore.toml"));
        assert!(matches!(cli.command, Command::Init));
    }
}
