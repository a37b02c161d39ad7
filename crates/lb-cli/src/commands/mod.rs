//! Command implementations.

pub mod local;
pub mod users;

pub use local::run_local;
pub use users::run_users;
