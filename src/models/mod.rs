//! Data models for Booklend

pub mod book;
pub mod rental;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookInput, BookQuery};
pub use rental::{Rental, RentalWithBook};
pub use user::{Role, User, UserClaims};
