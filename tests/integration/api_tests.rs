//! API integration tests
//!
//! Drive the full router against the in-memory store.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use booklend_server::{
    config::AppConfig,
    create_router,
    models::user::{Role, UserClaims},
    repository::Repository,
    AppState,
};

struct TestApp {
    app: Router,
    state: AppState,
}

impl TestApp {
    fn new() -> Self {
        let state = AppState::new(AppConfig::default(), Repository::in_memory());
        Self {
            app: create_router(state.clone()),
            state,
        }
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    /// Create an account directly and log in through the API
    async fn token_for(&self, name: &str, email: &str, role: Role) -> String {
        self.state
            .services
            .auth
            .register(name, email, "123456", role)
            .await
            .unwrap();

        let (status, body) = self
            .send(
                Method::POST,
                "/auth/login",
                None,
                Some(json!({ "email": email, "password": "123456" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    async fn create_book(&self, admin: &str, title: &str, author: &str, stock: i32) -> Value {
        let (status, body) = self
            .send(
                Method::POST,
                "/books",
                Some(admin),
                Some(json!({ "title": title, "author": author, "stock": stock })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body
    }

    async fn stock_of(&self, token: &str, book_id: &str) -> i64 {
        let (status, body) = self
            .send(Method::GET, &format!("/books/{}", book_id), Some(token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        body["stock"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.send(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_register() {
    let app = TestApp::new();

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "name": "User Test", "email": "user@test.com", "password": "123456" })),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].is_string());
    assert_eq!(body["email"], "user@test.com");
    assert_eq!(body["name"], "User Test");
    assert_eq!(body["role"], "USER");
    assert!(body.get("password").is_none());
}

#[tokio::test]
async fn test_register_invalid_input() {
    let app = TestApp::new();

    let required = "Name, email and password are required";
    for (payload, message) in [
        (
            json!({ "name": "Test User", "email": "test@example.com", "password": "123" }),
            "Password must be at least 6 characters long",
        ),
        (
            json!({ "name": "Test User", "email": "not-an-email", "password": "123456" }),
            "Invalid email",
        ),
        (
            json!({ "name": "", "email": "invalid-email", "password": "123" }),
            required,
        ),
        (json!({ "name": "A", "email": "a@b.c" }), required),
        (json!({ "name": "A", "email": "", "password": "123456" }), required),
        (
            json!({ "name": "   ", "email": "a@b.c", "password": "123456" }),
            required,
        ),
        (json!({ "email": "test@example.com", "password": "123456" }), required),
        (json!({}), required),
    ] {
        let (status, body) = app
            .send(Method::POST, "/auth/register", None, Some(payload.clone()))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {}", payload);
        assert_eq!(body["message"], message, "payload {}", payload);
    }
}

#[tokio::test]
async fn test_register_duplicate_email() {
    let app = TestApp::new();
    let payload = json!({ "name": "Dup", "email": "duplicate@test.com", "password": "123456" });

    let (status, _) = app
        .send(Method::POST, "/auth/register", None, Some(payload.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .send(Method::POST, "/auth/register", None, Some(payload))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Email already registered");
}

#[tokio::test]
async fn test_login_token_carries_role() {
    let app = TestApp::new();
    let token = app.token_for("Admin Test", "admin@test.com", Role::Admin).await;

    let claims = UserClaims::from_token(&token, &AppConfig::default().auth.jwt_secret).unwrap();
    assert_eq!(claims.role, Role::Admin);

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "admin@test.com", "password": "123456" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["email"], "admin@test.com");
    assert_eq!(body["user"]["id"], json!(claims.id));
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let app = TestApp::new();
    app.token_for("User Test", "user@test.com", Role::User).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "user@test.com", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid password");

    let (status, body) = app
        .send(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": "nobody@test.com", "password": "123456" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "User not found");

    let (status, _) = app
        .send(Method::POST, "/auth/login", None, Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_access_control() {
    let app = TestApp::new();
    let user = app.token_for("User Test", "user@test.com", Role::User).await;

    let (status, body) = app.send(Method::GET, "/books", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Missing token");

    let (status, body) = app
        .send(Method::GET, "/books", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Invalid token");

    let (status, body) = app
        .send(
            Method::POST,
            "/books",
            Some(&user),
            Some(json!({ "title": "Clean Code", "author": "Robert Martin", "stock": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access denied: should be an admin");

    // Role is checked before the body is read
    let (status, _) = app
        .send(Method::POST, "/books", Some(&user), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.send(Method::GET, "/books", Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_create_book_requires_stock() {
    let app = TestApp::new();
    let admin = app.token_for("Admin", "admin@test.com", Role::Admin).await;

    let (status, _) = app
        .send(
            Method::POST,
            "/books",
            Some(&admin),
            Some(json!({ "title": "Clean Code", "author": "Robert Martin" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(
            Method::POST,
            "/books",
            Some(&admin),
            Some(json!({ "title": "Clean Code", "author": "Robert Martin", "stock": -1 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Stock must be an integer between 0 and 1000000");

    let (status, _) = app
        .send(
            Method::POST,
            "/books",
            Some(&admin),
            Some(json!({ "title": "Clean Code", "author": "Robert Martin", "stock": i32::MAX })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let book = app.create_book(&admin, "Clean Code", "Robert Martin", 1).await;
    assert_eq!(book["title"], "Clean Code");
    assert_eq!(book["stock"], 1);
}

#[tokio::test]
async fn test_search_books() {
    let app = TestApp::new();
    let admin = app.token_for("Admin", "admin@test.com", Role::Admin).await;
    app.create_book(&admin, "Clean Code", "Robert Martin", 1).await;
    app.create_book(&admin, "The Pragmatic Programmer", "Andrew Hunt", 2)
        .await;

    let (status, body) = app
        .send(Method::GET, "/books/search?q=clean", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["title"], "Clean Code");

    let (status, body) = app
        .send(Method::GET, "/books/search?q=ROBERT", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["author"], "Robert Martin");

    let (status, body) = app
        .send(Method::GET, "/books/search", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Query parameter \"q\" is required");
}

#[tokio::test]
async fn test_update_and_delete_book() {
    let app = TestApp::new();
    let admin = app.token_for("Admin", "admin@test.com", Role::Admin).await;
    let book = app.create_book(&admin, "Clean Code", "Robert Martin", 1).await;
    let id = book["id"].as_str().unwrap();

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/books/{}", id),
            Some(&admin),
            Some(json!({ "title": "Clean Code Updated", "author": "Robert Martin", "stock": 3 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Clean Code Updated");
    assert_eq!(body["stock"], 3);

    let (status, _) = app
        .send(Method::DELETE, &format!("/books/{}", id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app
        .send(Method::GET, &format!("/books/{}", id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Book not found");

    let (status, _) = app
        .send(Method::DELETE, &format!("/books/{}", id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/books/{}", id),
            Some(&admin),
            Some(json!({ "title": "Ghost", "author": "Nobody", "stock": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .send(Method::GET, "/books/not-a-uuid", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_rent_and_return_scenario() {
    let app = TestApp::new();
    let admin = app.token_for("Admin", "admin@test.com", Role::Admin).await;
    let alice = app.token_for("Alice", "alice@test.com", Role::User).await;
    let bob = app.token_for("Bob", "bob@test.com", Role::User).await;

    let book = app.create_book(&admin, "Clean Code", "Robert Martin", 1).await;
    let book_id = book["id"].as_str().unwrap();

    let (status, rental) = app
        .send(
            Method::POST,
            "/rentals/rent",
            Some(&alice),
            Some(json!({ "bookId": book_id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(rental["bookId"], book_id);
    assert_eq!(rental["returned"], false);
    assert_eq!(app.stock_of(&alice, book_id).await, 0);

    let (status, body) = app
        .send(
            Method::POST,
            "/rentals/rent",
            Some(&bob),
            Some(json!({ "bookId": book_id })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Book unavailable");
    assert_eq!(app.stock_of(&bob, book_id).await, 0);

    let rental_id = rental["id"].as_str().unwrap();

    let (status, body) = app
        .send(
            Method::POST,
            "/rentals/return",
            Some(&bob),
            Some(json!({ "rentalId": rental_id })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Unauthorized");

    let (status, body) = app
        .send(
            Method::POST,
            "/rentals/return",
            Some(&alice),
            Some(json!({ "rentalId": rental_id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["returned"], true);
    assert_eq!(app.stock_of(&alice, book_id).await, 1);

    let (status, body) = app
        .send(
            Method::POST,
            "/rentals/return",
            Some(&alice),
            Some(json!({ "rentalId": rental_id })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Rental already returned");
    assert_eq!(app.stock_of(&alice, book_id).await, 1);
}

#[tokio::test]
async fn test_rent_unknown_book() {
    let app = TestApp::new();
    let user = app.token_for("User", "user@test.com", Role::User).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/rentals/rent",
            Some(&user),
            Some(json!({ "bookId": uuid::Uuid::new_v4() })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Book not found");

    let (status, body) = app
        .send(
            Method::POST,
            "/rentals/return",
            Some(&user),
            Some(json!({ "rentalId": uuid::Uuid::new_v4() })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Rental not found");

    let (status, _) = app
        .send(Method::POST, "/rentals/rent", Some(&user), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_my_rentals() {
    let app = TestApp::new();
    let admin = app.token_for("Admin", "admin@test.com", Role::Admin).await;
    let user = app.token_for("User", "user@test.com", Role::User).await;
    let clean = app.create_book(&admin, "Clean Code", "Robert Martin", 2).await;
    let pragmatic = app
        .create_book(&admin, "The Pragmatic Programmer", "Andrew Hunt", 2)
        .await;

    for book in [&clean, &pragmatic] {
        let (status, _) = app
            .send(
                Method::POST,
                "/rentals/rent",
                Some(&user),
                Some(json!({ "bookId": book["id"] })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    // Someone else's rental stays out of the list
    app.send(
        Method::POST,
        "/rentals/rent",
        Some(&admin),
        Some(json!({ "bookId": clean["id"] })),
    )
    .await;

    let (status, body) = app.send(Method::GET, "/rentals/my", Some(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    let rentals = body.as_array().unwrap();
    assert_eq!(rentals.len(), 2);

    let mut titles: Vec<&str> = rentals
        .iter()
        .map(|r| r["book"]["title"].as_str().unwrap())
        .collect();
    titles.sort();
    assert_eq!(titles, ["Clean Code", "The Pragmatic Programmer"]);
    assert!(rentals.iter().all(|r| r["returned"] == false));
}

#[tokio::test]
async fn test_delete_book_with_open_rental() {
    let app = TestApp::new();
    let admin = app.token_for("Admin", "admin@test.com", Role::Admin).await;
    let book = app.create_book(&admin, "Clean Code", "Robert Martin", 1).await;
    let id = book["id"].as_str().unwrap();

    app.send(
        Method::POST,
        "/rentals/rent",
        Some(&admin),
        Some(json!({ "bookId": id })),
    )
    .await;

    let (status, body) = app
        .send(Method::DELETE, &format!("/books/{}", id), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Book has active rentals");
}

#[tokio::test]
async fn test_openapi_document_served() {
    let app = TestApp::new();
    let (status, body) = app
        .send(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/rentals/rent"].is_object());
}
