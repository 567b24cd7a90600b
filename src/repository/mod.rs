//! Repository layer for database operations
//!
//! Services talk to the store through the traits below. [`Repository`]
//! bundles one implementation of each; PostgreSQL in production, the
//! in-memory store in tests and `database.url = "memory"` runs.

pub mod books;
pub mod health;
pub mod memory;
pub mod rentals;
pub mod users;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        book::{Book, BookInput},
        rental::{Rental, RentalWithBook},
        user::{NewUser, Role, User},
    },
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UsersStore: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Case-insensitive lookup
    async fn get_by_email(&self, email: &str) -> AppResult<Option<User>>;

    async fn email_exists(&self, email: &str) -> AppResult<bool>;

    async fn create(&self, user: NewUser) -> AppResult<User>;

    async fn set_role(&self, id: Uuid, role: Role) -> AppResult<User>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BooksStore: Send + Sync {
    async fn list(&self) -> AppResult<Vec<Book>>;

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Book>>;

    async fn create(&self, book: BookInput) -> AppResult<Book>;

    /// Books whose title or author contains `query`, ignoring case
    async fn search(&self, query: &str) -> AppResult<Vec<Book>>;

    /// Full replace; `NotFound` when absent
    async fn update(&self, id: Uuid, book: BookInput) -> AppResult<Book>;

    /// `NotFound` when absent, `Conflict` while copies are rented out
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

/// Rent and return are each applied as one atomic unit: the rental row and
/// the book stock change commit together or not at all.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RentalsStore: Send + Sync {
    /// Take one copy of `book_id` for `user_id`.
    ///
    /// `NotFound` when the book does not exist, `Unavailable` when its stock
    /// is zero.
    async fn rent(&self, user_id: Uuid, book_id: Uuid) -> AppResult<Rental>;

    /// Mark a rental returned and put the copy back in stock.
    ///
    /// `NotFound` when the rental does not exist, otherwise the result of
    /// [`Rental::ensure_returnable_by`].
    async fn return_rental(&self, rental_id: Uuid, user_id: Uuid) -> AppResult<Rental>;

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<RentalWithBook>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HealthStore: Send + Sync {
    async fn ping(&self) -> AppResult<()>;
}

/// Store handle shared by all services
#[derive(Clone)]
pub struct Repository {
    pub users: Arc<dyn UsersStore>,
    pub books: Arc<dyn BooksStore>,
    pub rentals: Arc<dyn RentalsStore>,
    pub health: Arc<dyn HealthStore>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            users: Arc::new(users::UsersRepository::new(pool.clone())),
            books: Arc::new(books::BooksRepository::new(pool.clone())),
            rentals: Arc::new(rentals::RentalsRepository::new(pool.clone())),
            health: Arc::new(health::HealthRepository::new(pool)),
        }
    }

    /// Create a repository backed by a fresh in-memory store
    pub fn in_memory() -> Self {
        let store = memory::MemoryStore::default();
        Self {
            users: Arc::new(store.clone()),
            books: Arc::new(store.clone()),
            rentals: Arc::new(store.clone()),
            health: Arc::new(store),
        }
    }
}
