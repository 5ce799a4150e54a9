mod contact;
mod user;
mod user_login;

pub use contact::{UserEmail, UserPhoneNumber};
pub use user::{IdentityUser, User};
pub use user_login::UserLogin;
