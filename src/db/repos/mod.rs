mod book_idps;
mod idps;
mod users;

pub use book_idps::*;
pub use idps::*;
pub use users::*;
