//! Operator commands. Each one works on the stores built during startup.

pub mod add_to_role;
pub mod create_user;
pub mod init;
pub mod show_user;

#[cfg(test)]
pub(crate) mod test_support {
    use idstore_configs::IdentityConfig;
    use idstore_store::InMemoryTableBackend;
    use std::sync::Arc;

    use crate::lifecycle::{bootstrap_with, Application};

    pub async fn memory_app() -> Application {
        bootstrap_with(&IdentityConfig::default(), Arc::new(InMemoryTableBackend::new()))
            .await
            .expect("in-memory bootstrap")
    }
}
