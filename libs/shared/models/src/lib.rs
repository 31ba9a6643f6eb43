pub mod error;
pub mod pagination;

pub use error::AppError;
pub use pagination::{Page, PageRequest};
