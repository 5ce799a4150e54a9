mod role;

pub use role::{IdentityRole, Role};
