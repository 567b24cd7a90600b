//! Rental model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::book::Book;
use crate::error::{AppError, AppResult};

/// Rental model from database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Rental {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub rented_at: DateTime<Utc>,
    pub returned: bool,
    pub returned_at: Option<DateTime<Utc>>,
}

impl Rental {
    pub fn new(user_id: Uuid, book_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            book_id,
            rented_at: Utc::now(),
            returned: false,
            returned_at: None,
        }
    }

    /// Check that `user_id` may return this rental now.
    ///
    /// Ownership is checked before the returned flag.
    pub fn ensure_returnable_by(&self, user_id: Uuid) -> AppResult<()> {
        if self.user_id != user_id {
            return Err(AppError::Authentication("Unauthorized".to_string()));
        }
        if self.returned {
            return Err(AppError::Conflict("Rental already returned".to_string()));
        }
        Ok(())
    }
}

/// Rental joined with its book
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RentalWithBook {
    #[serde(flatten)]
    pub rental: Rental,
    pub book: Book,
}

/// Rent request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RentRequest {
    pub book_id: Uuid,
}

/// Return request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    pub rental_id: Uuid,
}
