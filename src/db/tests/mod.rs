//! Shared database repository test infrastructure
//!
//! Each repository has a test module containing shared test functions that
//! take `&dyn XxxRepo`, instantiated once against in-memory SQLite and once
//! against a testcontainers PostgreSQL instance (marked `#[ignore]`).
//!
//! ```bash
//! cargo test                       # SQLite only
//! cargo test -- --ignored          # PostgreSQL (requires Docker)
//! ```

mod book_idps;
mod users;
