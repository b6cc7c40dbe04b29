pub mod pool;
pub mod repository;

pub use pool::{Db, DbError};
pub use repository::Repository;
