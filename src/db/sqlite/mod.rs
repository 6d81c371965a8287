mod book_idps;
mod idps;
mod users;

pub use book_idps::SqliteBookIdpRepo;
pub use idps::SqliteIdpRepo;
pub use users::SqliteUserRepo;
