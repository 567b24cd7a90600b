//! In-memory store
//!
//! Every table sits behind one mutex, so each rent or return observes and
//! mutates book stock and rental rows in a single critical section.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{BooksStore, HealthStore, RentalsStore, UsersStore};
use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookInput},
        rental::{Rental, RentalWithBook},
        user::{NewUser, Role, User},
    },
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    books: HashMap<Uuid, Book>,
    rentals: HashMap<Uuid, Rental>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

fn sorted_books<'a>(books: impl Iterator<Item = &'a Book>) -> Vec<Book> {
    let mut books: Vec<Book> = books.cloned().collect();
    books.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
    books
}

#[async_trait]
impl UsersStore for MemoryStore {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn email_exists(&self, email: &str) -> AppResult<bool> {
        Ok(self.get_by_email(email).await?.is_some())
    }

    async fn create(&self, user: NewUser) -> AppResult<User> {
        let mut tables = self.tables.lock().await;
        if tables
            .users
            .values()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let created = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        tables.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn set_role(&self, id: Uuid, role: Role) -> AppResult<User> {
        let mut tables = self.tables.lock().await;
        let user = tables
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        user.role = role;
        Ok(user.clone())
    }
}

#[async_trait]
impl BooksStore for MemoryStore {
    async fn list(&self) -> AppResult<Vec<Book>> {
        Ok(sorted_books(self.tables.lock().await.books.values()))
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Book>> {
        Ok(self.tables.lock().await.books.get(&id).cloned())
    }

    async fn create(&self, book: BookInput) -> AppResult<Book> {
        let now = Utc::now();
        let created = Book {
            id: Uuid::new_v4(),
            title: book.title,
            author: book.author,
            stock: book.stock,
            created_at: now,
            updated_at: now,
        };
        self.tables
            .lock()
            .await
            .books
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn search(&self, query: &str) -> AppResult<Vec<Book>> {
        let tables = self.tables.lock().await;
        Ok(sorted_books(
            tables.books.values().filter(|b| b.matches(query)),
        ))
    }

    async fn update(&self, id: Uuid, book: BookInput) -> AppResult<Book> {
        let mut tables = self.tables.lock().await;
        let existing = tables
            .books
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;
        existing.title = book.title;
        existing.author = book.author;
        existing.stock = book.stock;
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        let mut tables = self.tables.lock().await;
        if !tables.books.contains_key(&id) {
            return Err(AppError::NotFound("Book not found".to_string()));
        }
        if tables
            .rentals
            .values()
            .any(|r| r.book_id == id && !r.returned)
        {
            return Err(AppError::Conflict("Book has active rentals".to_string()));
        }
        tables.books.remove(&id);
        tables.rentals.retain(|_, r| r.book_id != id);
        Ok(())
    }
}

#[async_trait]
impl RentalsStore for MemoryStore {
    async fn rent(&self, user_id: Uuid, book_id: Uuid) -> AppResult<Rental> {
        let mut tables = self.tables.lock().await;
        let book = tables
            .books
            .get_mut(&book_id)
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;
        if !book.is_available() {
            return Err(AppError::Unavailable("Book unavailable".to_string()));
        }
        book.stock -= 1;
        book.updated_at = Utc::now();

        let rental = Rental::new(user_id, book_id);
        tables.rentals.insert(rental.id, rental.clone());
        Ok(rental)
    }

    async fn return_rental(&self, rental_id: Uuid, user_id: Uuid) -> AppResult<Rental> {
        let mut guard = self.tables.lock().await;
        let Tables { books, rentals, .. } = &mut *guard;

        let rental = rentals
            .get_mut(&rental_id)
            .ok_or_else(|| AppError::NotFound("Rental not found".to_string()))?;
        rental.ensure_returnable_by(user_id)?;

        // Nothing changes unless the copy can go back on the shelf
        let restocked = books
            .get(&rental.book_id)
            .map(|book| {
                book.stock
                    .checked_add(1)
                    .ok_or_else(|| AppError::Conflict("Book stock out of range".to_string()))
            })
            .transpose()?;

        let now = Utc::now();
        rental.returned = true;
        rental.returned_at = Some(now);
        if let (Some(book), Some(stock)) = (books.get_mut(&rental.book_id), restocked) {
            book.stock = stock;
            book.updated_at = now;
        }
        Ok(rental.clone())
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<RentalWithBook>> {
        let tables = self.tables.lock().await;
        let mut rentals: Vec<RentalWithBook> = tables
            .rentals
            .values()
            .filter(|r| r.user_id == user_id)
            .filter_map(|r| {
                tables.books.get(&r.book_id).map(|book| RentalWithBook {
                    rental: r.clone(),
                    book: book.clone(),
                })
            })
            .collect();
        rentals.sort_by(|a, b| {
            b.rental
                .rented_at
                .cmp(&a.rental.rented_at)
                .then(a.rental.id.cmp(&b.rental.id))
        });
        Ok(rentals)
    }
}

#[async_trait]
impl HealthStore for MemoryStore {
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}
