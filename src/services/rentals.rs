//! Rental workflow service
//!
//! Renting takes one copy out of stock and opens a rental; returning closes
//! the rental and puts the copy back. The store applies each step pair
//! atomically, so for every book `initial stock - current stock` equals the
//! number of open rentals.

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::rental::{Rental, RentalWithBook},
    repository::Repository,
};

#[derive(Clone)]
pub struct RentalsService {
    repository: Repository,
}

impl RentalsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn rent_book(&self, user_id: Uuid, book_id: Uuid) -> AppResult<Rental> {
        match self.repository.rentals.rent(user_id, book_id).await {
            Ok(rental) => {
                tracing::info!(rental_id = %rental.id, %user_id, %book_id, "Book rented");
                Ok(rental)
            }
            Err(e @ (AppError::NotFound(_) | AppError::Unavailable(_))) => {
                tracing::warn!(%user_id, %book_id, "Rent rejected: {}", e);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn return_book(&self, rental_id: Uuid, user_id: Uuid) -> AppResult<Rental> {
        match self.repository.rentals.return_rental(rental_id, user_id).await {
            Ok(rental) => {
                tracing::info!(%rental_id, %user_id, book_id = %rental.book_id, "Book returned");
                Ok(rental)
            }
            Err(e @ (AppError::NotFound(_) | AppError::Authentication(_) | AppError::Conflict(_))) => {
                tracing::warn!(%rental_id, %user_id, "Return rejected: {}", e);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn list_user_rentals(&self, user_id: Uuid) -> AppResult<Vec<RentalWithBook>> {
        self.repository.rentals.list_for_user(user_id).await
    }
}
