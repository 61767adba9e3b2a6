pub mod cursor;
pub mod error;
pub mod list;
pub mod user;

// Re-export commonly used types for convenience
pub use cursor::{UserPage, END_CURSOR, START_CURSOR};
pub use error::{ErrorDetail, ErrorResponse};
pub use list::TwitterList;
pub use user::User;
