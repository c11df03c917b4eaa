pub mod error;
pub mod query;

pub use error::AppError;
pub use query::parse_query;
