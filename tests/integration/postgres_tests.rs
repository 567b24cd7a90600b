//! PostgreSQL store tests
//!
//! Need a reachable server: `DATABASE_URL=postgres://... cargo test -- --ignored`

use sqlx::PgPool;
use uuid::Uuid;

use booklend_server::{
    error::AppError,
    models::{
        book::BookInput,
        user::{NewUser, Role},
    },
    repository::Repository,
};

async fn seed_user(repository: &Repository, email: &str) -> Uuid {
    repository
        .users
        .create(NewUser {
            name: "Reader".to_string(),
            email: email.to_string(),
            password_hash: "not-a-real-hash".to_string(),
            role: Role::User,
        })
        .await
        .unwrap()
        .id
}

async fn seed_book(repository: &Repository, stock: i32) -> Uuid {
    repository
        .books
        .create(BookInput {
            title: "Clean Code".to_string(),
            author: "Robert Martin".to_string(),
            stock,
        })
        .await
        .unwrap()
        .id
}

async fn stock(repository: &Repository, book_id: Uuid) -> i32 {
    repository
        .books
        .get_by_id(book_id)
        .await
        .unwrap()
        .unwrap()
        .stock
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn rent_and_return_keep_stock_consistent(pool: PgPool) {
    let repository = Repository::new(pool);
    let user = seed_user(&repository, "reader@test.com").await;
    let book = seed_book(&repository, 1).await;

    let rental = repository.rentals.rent(user, book).await.unwrap();
    assert_eq!(stock(&repository, book).await, 0);

    let err = repository.rentals.rent(user, book).await.unwrap_err();
    assert!(matches!(err, AppError::Unavailable(_)));
    assert_eq!(stock(&repository, book).await, 0);

    let returned = repository
        .rentals
        .return_rental(rental.id, user)
        .await
        .unwrap();
    assert!(returned.returned);
    assert!(returned.returned_at.is_some());
    assert_eq!(stock(&repository, book).await, 1);

    let err = repository
        .rentals
        .return_rental(rental.id, user)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(stock(&repository, book).await, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn only_owner_can_return(pool: PgPool) {
    let repository = Repository::new(pool);
    let owner = seed_user(&repository, "owner@test.com").await;
    let other = seed_user(&repository, "other@test.com").await;
    let book = seed_book(&repository, 1).await;

    let rental = repository.rentals.rent(owner, book).await.unwrap();

    let err = repository
        .rentals
        .return_rental(rental.id, other)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Authentication(_)));
    assert_eq!(stock(&repository, book).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn concurrent_rents_take_last_copy_once(pool: PgPool) {
    let repository = Repository::new(pool);
    let book = seed_book(&repository, 1).await;

    let mut users = Vec::new();
    for i in 0..8 {
        users.push(seed_user(&repository, &format!("reader{}@test.com", i)).await);
    }

    let handles: Vec<_> = users
        .into_iter()
        .map(|user| {
            let repository = repository.clone();
            tokio::spawn(async move { repository.rentals.rent(user, book).await })
        })
        .collect();

    let mut successes = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(AppError::Unavailable(_)) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(stock(&repository, book).await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn search_is_case_insensitive_and_escapes_wildcards(pool: PgPool) {
    let repository = Repository::new(pool);
    seed_book(&repository, 1).await;

    let found = repository.books.search("CLEAN").await.unwrap();
    assert_eq!(found.len(), 1);

    let found = repository.books.search("%").await.unwrap();
    assert!(found.is_empty());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn duplicate_email_differs_only_in_case(pool: PgPool) {
    let repository = Repository::new(pool);
    seed_user(&repository, "reader@test.com").await;

    let err = repository
        .users
        .create(NewUser {
            name: "Copy".to_string(),
            email: "READER@test.com".to_string(),
            password_hash: "hash".to_string(),
            role: Role::User,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn return_at_max_stock_leaves_rental_open(pool: PgPool) {
    let repository = Repository::new(pool);
    let user = seed_user(&repository, "reader@test.com").await;
    let book = seed_book(&repository, 1).await;
    let rental = repository.rentals.rent(user, book).await.unwrap();

    repository
        .books
        .update(
            book,
            BookInput {
                title: "Clean Code".to_string(),
                author: "Robert Martin".to_string(),
                stock: i32::MAX,
            },
        )
        .await
        .unwrap();

    let err = repository
        .rentals
        .return_rental(rental.id, user)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(stock(&repository, book).await, i32::MAX);

    let rentals = repository.rentals.list_for_user(user).await.unwrap();
    assert!(!rentals[0].rental.returned);
}
