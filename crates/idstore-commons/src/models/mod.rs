pub mod ids;

pub use ids::{MembershipId, RoleId, UserId};
