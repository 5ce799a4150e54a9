mod membership_id;
mod role_id;
mod user_id;

pub use membership_id::MembershipId;
pub use role_id::RoleId;
pub use user_id::UserId;
