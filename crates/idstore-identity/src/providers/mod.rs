pub mod role_memberships;
pub mod roles;
pub mod users;
