mod schema;
mod sqlite_pool;
mod sqlite_repository;

pub use schema::init_schema;
pub use sqlite_pool::create_pool;
pub use sqlite_repository::SqliteBenchmarkRepository;
