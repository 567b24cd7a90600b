//! Rentals repository for database operations

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use super::RentalsStore;
use crate::{
    error::{AppError, AppResult},
    models::{
        book::Book,
        rental::{Rental, RentalWithBook},
    },
};

#[derive(Clone)]
pub struct RentalsRepository {
    pool: Pool<Postgres>,
}

impl RentalsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RentalsStore for RentalsRepository {
    async fn rent(&self, user_id: Uuid, book_id: Uuid) -> AppResult<Rental> {
        let mut tx = self.pool.begin().await?;

        // Take a copy only if one is left; the row count decides availability
        let taken = sqlx::query(
            "UPDATE books SET stock = stock - 1, updated_at = $2 WHERE id = $1 AND stock >= 1",
        )
        .bind(book_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if taken.rows_affected() == 0 {
            let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM books WHERE id = $1)")
                .bind(book_id)
                .fetch_one(&mut *tx)
                .await?;
            return Err(if exists {
                AppError::Unavailable("Book unavailable".to_string())
            } else {
                AppError::NotFound("Book not found".to_string())
            });
        }

        let rental = Rental::new(user_id, book_id);
        let rental = sqlx::query_as::<_, Rental>(
            r#"
            INSERT INTO rentals (id, user_id, book_id, rented_at, returned)
            VALUES ($1, $2, $3, $4, FALSE)
            RETURNING *
            "#,
        )
        .bind(rental.id)
        .bind(rental.user_id)
        .bind(rental.book_id)
        .bind(rental.rented_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(rental)
    }

    async fn return_rental(&self, rental_id: Uuid, user_id: Uuid) -> AppResult<Rental> {
        let mut tx = self.pool.begin().await?;

        let rental = sqlx::query_as::<_, Rental>("SELECT * FROM rentals WHERE id = $1 FOR UPDATE")
            .bind(rental_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Rental not found".to_string()))?;

        rental.ensure_returnable_by(user_id)?;

        let now = Utc::now();
        let restocked = sqlx::query(
            "UPDATE books SET stock = stock + 1, updated_at = $2 WHERE id = $1 AND stock < $3",
        )
        .bind(rental.book_id)
        .bind(now)
        .bind(i32::MAX)
        .execute(&mut *tx)
        .await?;

        // Dropping the transaction rolls back; the rental stays open
        if restocked.rows_affected() == 0 {
            return Err(AppError::Conflict("Book stock out of range".to_string()));
        }

        let rental = sqlx::query_as::<_, Rental>(
            "UPDATE rentals SET returned = TRUE, returned_at = $2 WHERE id = $1 RETURNING *",
        )
        .bind(rental_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(rental)
    }

    async fn list_for_user(&self, user_id: Uuid) -> AppResult<Vec<RentalWithBook>> {
        let rows = sqlx::query(
            r#"
            SELECT r.id, r.user_id, r.book_id, r.rented_at, r.returned, r.returned_at,
                   b.title, b.author, b.stock,
                   b.created_at AS book_created_at, b.updated_at AS book_updated_at
            FROM rentals r
            JOIN books b ON b.id = r.book_id
            WHERE r.user_id = $1
            ORDER BY r.rented_at DESC, r.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let rentals = rows
            .into_iter()
            .map(|row| {
                let book_id: Uuid = row.try_get("book_id")?;
                Ok(RentalWithBook {
                    rental: Rental {
                        id: row.try_get("id")?,
                        user_id: row.try_get("user_id")?,
                        book_id,
                        rented_at: row.try_get("rented_at")?,
                        returned: row.try_get("returned")?,
                        returned_at: row.try_get("returned_at")?,
                    },
                    book: Book {
                        id: book_id,
                        title: row.try_get("title")?,
                        author: row.try_get("author")?,
                        stock: row.try_get("stock")?,
                        created_at: row.try_get("book_created_at")?,
                        updated_at: row.try_get("book_updated_at")?,
                    },
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(rentals)
    }
}
