//! Rental endpoints
//!
//! Missing books and rentals are reported as 400 on these routes.

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::{AppError, AppResult},
    models::rental::{Rental, RentRequest, RentalWithBook, ReturnRequest},
};

use super::{AuthenticatedUser, ValidatedJson};

/// Rent a book for the current user
#[utoipa::path(
    post,
    path = "/rentals/rent",
    tag = "rentals",
    security(("bearer_auth" = [])),
    request_body = RentRequest,
    responses(
        (status = 201, description = "Book rented", body = Rental),
        (status = 400, description = "Book not found or unavailable", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing token")
    )
)]
pub async fn rent_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<RentRequest>,
) -> AppResult<(StatusCode, Json<Rental>)> {
    let rental = state
        .services
        .rentals
        .rent_book(claims.id, request.book_id)
        .await
        .map_err(|e| e.map_not_found(AppError::Validation))?;

    Ok((StatusCode::CREATED, Json(rental)))
}

/// Return one of the current user's rentals
#[utoipa::path(
    post,
    path = "/rentals/return",
    tag = "rentals",
    security(("bearer_auth" = [])),
    request_body = ReturnRequest,
    responses(
        (status = 200, description = "Book returned", body = Rental),
        (status = 400, description = "Rental not found or already returned", body = crate::error::ErrorResponse),
        (status = 401, description = "Missing token or rental owned by another user", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    ValidatedJson(request): ValidatedJson<ReturnRequest>,
) -> AppResult<Json<Rental>> {
    let rental = state
        .services
        .rentals
        .return_book(request.rental_id, claims.id)
        .await
        .map_err(|e| e.map_not_found(AppError::Validation))?;

    Ok(Json(rental))
}

/// List the current user's rentals with their books
#[utoipa::path(
    get,
    path = "/rentals/my",
    tag = "rentals",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Rentals of the current user", body = Vec<RentalWithBook>),
        (status = 401, description = "Missing token")
    )
)]
pub async fn my_rentals(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<RentalWithBook>>> {
    let rentals = state.services.rentals.list_user_rentals(claims.id).await?;
    Ok(Json(rentals))
}
