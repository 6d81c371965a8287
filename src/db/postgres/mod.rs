mod book_idps;
mod idps;
mod users;

pub use book_idps::PostgresBookIdpRepo;
pub use idps::PostgresIdpRepo;
pub use users::PostgresUserRepo;
