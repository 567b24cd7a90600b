//! Catalog management service

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::book::{Book, BookInput},
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list_books(&self) -> AppResult<Vec<Book>> {
        self.repository.books.list().await
    }

    pub async fn get_book(&self, id: Uuid) -> AppResult<Book> {
        self.repository
            .books
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
    }

    pub async fn add_book(&self, book: BookInput) -> AppResult<Book> {
        let book = self.repository.books.create(book).await?;
        tracing::info!(book_id = %book.id, stock = book.stock, "Book added");
        Ok(book)
    }

    /// Case-insensitive substring search over title and author
    pub async fn search_books(&self, query: &str) -> AppResult<Vec<Book>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::Validation(
                "Query parameter \"q\" is required".to_string(),
            ));
        }
        self.repository.books.search(query).await
    }

    pub async fn update_book(&self, id: Uuid, book: BookInput) -> AppResult<Book> {
        let book = self.repository.books.update(id, book).await?;
        tracing::info!(book_id = %book.id, stock = book.stock, "Book updated");
        Ok(book)
    }

    pub async fn delete_book(&self, id: Uuid) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!(book_id = %id, "Book deleted");
        Ok(())
    }
}
