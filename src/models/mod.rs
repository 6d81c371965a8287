mod idp;
mod user;

pub use idp::Idp;
pub use user::{CreateUser, User};
