mod role_membership;

pub use role_membership::RoleMembership;
