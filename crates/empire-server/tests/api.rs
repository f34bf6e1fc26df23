#![allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use empire_core::StoreConfig;
use empire_core::comments::MAX_REPLY_DEPTH;
use empire_core::db::unix_timestamp;
use empire_server::auth::JwtManager;
use empire_server::server::{AppState, build_router};
use empire_server::storage::{Role, StoreDatabase};

const ADMIN_EMAIL: &str = "admin@empiretech.vn";

struct TestApp {
    router: axum::Router,
    db: StoreDatabase,
    jwt: JwtManager,
}

impl TestApp {
    async fn new() -> Self {
        let db = StoreDatabase::open_in_memory().await.unwrap();
        let jwt = JwtManager::new(b"integration-test-secret", 3600);
        let state = AppState::new(db.clone(), jwt.clone(), StoreConfig::default())
            .with_admin_email(Some(ADMIN_EMAIL.to_string()));
        Self {
            router: build_router(state),
            db,
            jwt,
        }
    }

    /// Create a user directly in storage and return an access token for it.
    /// Skips password hashing, which is covered by the register/login tests.
    async fn user(&self, id: &str, role: Role) -> String {
        let email = format!("{id}@example.com");
        self.db
            .create_user(id, &email, "unused-hash", &format!("User {id}"), role)
            .await
            .unwrap();
        self.jwt.issue_access_token(id, &email).unwrap().0
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
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let resp = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    async fn create_account(&self, admin: &str, name: &str, prices: &[f64]) -> String {
        let variants: Vec<Value> = prices
            .iter()
            .enumerate()
            .map(|(i, p)| json!({ "name": format!("plan {i}"), "price_usd": p, "price_vnd": p * 25_000.0 }))
            .collect();
        let (status, body) = self
            .post(
                "/api/accounts",
                Some(admin),
                json!({ "name": name, "variants": variants }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["account"]["id"].as_str().unwrap().to_string()
    }

    async fn comment(
        &self,
        token: &str,
        item_id: &str,
        parent_id: Option<&str>,
        content: &str,
    ) -> (StatusCode, Value) {
        self.post(
            "/api/comments",
            Some(token),
            json!({
                "item_id": item_id,
                "item_type": "account",
                "parent_id": parent_id,
                "content": content,
            }),
        )
        .await
    }
}

fn id_of(body: &Value, key: &str) -> String {
    body[key]["id"].as_str().unwrap().to_string()
}

// =========================================================================
// Health and auth
// =========================================================================

#[tokio::test]
async fn health_is_ok() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn register_then_login() {
    let app = TestApp::new().await;
    let (status, body) = app
        .post(
            "/api/auth/register",
            None,
            json!({ "email": "Linh@Example.com", "password": "hunter2-hunter2", "full_name": "Linh" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["profile"]["email"], "linh@example.com");
    assert_eq!(body["profile"]["role"], "user");

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "linh@example.com", "password": "hunter2-hunter2" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["access_token"].as_str().unwrap();

    let (status, body) = app.get("/api/profile", Some(token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["profile"]["full_name"], "Linh");

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "linh@example.com", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn duplicate_registration_conflicts_and_admin_email_is_admin() {
    let app = TestApp::new().await;
    let register = json!({ "email": ADMIN_EMAIL, "password": "correct-horse", "full_name": "Boss" });

    let (status, body) = app.post("/api/auth/register", None, register.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["profile"]["role"], "admin");

    let (status, body) = app.post("/api/auth/register", None, register).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email already registered");
}

#[tokio::test]
async fn banned_user_is_forbidden() {
    let app = TestApp::new().await;
    let admin = app.user("admin", Role::Admin).await;
    let user = app.user("u1", Role::User).await;

    let (status, _) = app
        .send(
            Method::PATCH,
            "/api/admin/users/u1",
            Some(&admin),
            Some(json!({ "status": "banned" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api/cart", Some(&user)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Account is banned");
}

#[tokio::test]
async fn admin_cannot_demote_themselves() {
    let app = TestApp::new().await;
    let admin = app.user("admin", Role::Admin).await;
    let (status, _) = app
        .send(
            Method::PATCH,
            "/api/admin/users/admin",
            Some(&admin),
            Some(json!({ "role": "user" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn profile_update_validates_fields() {
    let app = TestApp::new().await;
    let user = app.user("u1", Role::User).await;

    let (status, body) = app
        .send(
            Method::PATCH,
            "/api/profile",
            Some(&user),
            Some(json!({ "full_name": " Trần <Minh> ", "avatar_url": "https://cdn.example.com/a.png" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["profile"]["full_name"], "Trần Minh");
    assert_eq!(body["profile"]["avatar_url"], "https://cdn.example.com/a.png");

    let (status, _) = app
        .send(
            Method::PATCH,
            "/api/profile",
            Some(&user),
            Some(json!({ "avatar_url": "ftp://example.com/a.png" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// =========================================================================
// Access policy
// =========================================================================

#[tokio::test]
async fn missing_session_is_401_before_anything_else() {
    let app = TestApp::new().await;

    // Invalid body and unknown id: authentication still fails first.
    let (status, body) = app.post("/api/categories", None, json!({ "bogus": true })).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing authorization header");

    let (status, _) = app
        .send(Method::DELETE, "/api/comments/does-not-exist", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/cart", Some("garbage-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn user_role_gets_403_on_admin_operations() {
    let app = TestApp::new().await;
    let user = app.user("u1", Role::User).await;

    let cases = [
        (Method::GET, "/api/admin/users", None),
        (Method::PATCH, "/api/admin/users/u1", Some(json!({ "role": "admin" }))),
        (Method::POST, "/api/categories", Some(json!({ "name": "X", "slug": "x" }))),
        (Method::DELETE, "/api/categories/c1", None),
        (Method::POST, "/api/accounts", Some(json!({ "name": "X" }))),
        (Method::DELETE, "/api/courses/k1", None),
        (Method::GET, "/api/promotions", None),
        (Method::DELETE, "/api/promotions/p1", None),
        (Method::DELETE, "/api/comments/c1", None),
    ];
    for (method, uri, body) in cases {
        let (status, _) = app.send(method.clone(), uri, Some(&user), body).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{method} {uri}");
    }

    // The forbidden attempt to self-promote changed nothing.
    let (_, body) = app.get("/api/profile", Some(&user)).await;
    assert_eq!(body["profile"]["role"], "user");
}

// =========================================================================
// Comments
// =========================================================================

#[tokio::test]
async fn comments_come_back_as_a_forest() {
    let app = TestApp::new().await;
    let admin = app.user("admin", Role::Admin).await;
    let user = app.user("u1", Role::User).await;
    let account = app.create_account(&admin, "Netflix", &[5.0]).await;

    let (_, first) = app.comment(&user, &account, None, "First!").await;
    let first = id_of(&first, "comment");
    let (_, reply) = app.comment(&admin, &account, Some(&first), "Thanks").await;
    let reply = id_of(&reply, "comment");
    let (status, _) = app.comment(&user, &account, Some(&reply), "You're welcome").await;
    assert_eq!(status, StatusCode::CREATED);
    app.comment(&user, &account, None, "Second root").await;

    let (status, body) = app
        .get(&format!("/api/comments?item_id={account}&item_type=account"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 4);

    let roots = body["comments"].as_array().unwrap();
    assert_eq!(roots.len(), 2);
    assert_eq!(roots[0]["content"], "First!");
    assert_eq!(roots[1]["content"], "Second root");
    assert_eq!(roots[0]["replies"][0]["content"], "Thanks");
    assert_eq!(roots[0]["replies"][0]["author"]["role"], "admin");
    assert_eq!(
        roots[0]["replies"][0]["replies"][0]["content"],
        "You're welcome"
    );
    assert_eq!(roots[1]["replies"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn comment_list_requires_subject() {
    let app = TestApp::new().await;
    let (status, _) = app.get("/api/comments?item_id=a1", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get("/api/comments?item_id=a1&item_type=book", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn comment_length_boundaries() {
    let app = TestApp::new().await;
    let admin = app.user("admin", Role::Admin).await;
    let user = app.user("u1", Role::User).await;
    let account = app.create_account(&admin, "Spotify", &[3.0]).await;

    let (status, body) = app.comment(&user, &account, None, &"a".repeat(1000)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, _) = app.comment(&user, &account, None, &"a".repeat(1001)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.comment(&user, &account, None, "   \n\t ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.comment(&user, &account, None, "  padded  ").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["comment"]["content"], "padded");
}

#[tokio::test]
async fn comment_parent_must_exist_on_same_subject() {
    let app = TestApp::new().await;
    let admin = app.user("admin", Role::Admin).await;
    let user = app.user("u1", Role::User).await;
    let a1 = app.create_account(&admin, "Netflix", &[5.0]).await;
    let a2 = app.create_account(&admin, "Disney+", &[4.0]).await;

    let (status, _) = app.comment(&user, &a1, Some("no-such-comment"), "hi").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, root) = app.comment(&user, &a1, None, "on netflix").await;
    let root = id_of(&root, "comment");
    let (status, _) = app.comment(&user, &a2, Some(&root), "wrong thread").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.comment(&user, "no-such-account", None, "hello").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn replies_stop_at_max_depth() {
    let app = TestApp::new().await;
    let admin = app.user("admin", Role::Admin).await;
    let user = app.user("u1", Role::User).await;
    let account = app.create_account(&admin, "Netflix", &[5.0]).await;

    let (_, root) = app.comment(&user, &account, None, "depth 0").await;
    let mut parent = id_of(&root, "comment");
    for depth in 1..=MAX_REPLY_DEPTH {
        let (status, body) = app
            .comment(&user, &account, Some(&parent), &format!("depth {depth}"))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["comment"]["depth"], depth);
        parent = id_of(&body, "comment");
    }

    let (status, body) = app.comment(&user, &account, Some(&parent), "too deep").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("nested"));

    let (status, body) = app
        .get(&format!("/api/comments?item_id={account}&item_type=account"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], MAX_REPLY_DEPTH + 1);
}

#[tokio::test]
async fn deleting_comment_removes_its_replies() {
    let app = TestApp::new().await;
    let admin = app.user("admin", Role::Admin).await;
    let user = app.user("u1", Role::User).await;
    let account = app.create_account(&admin, "Netflix", &[5.0]).await;

    let (_, root) = app.comment(&user, &account, None, "root").await;
    let root = id_of(&root, "comment");
    let (_, reply) = app.comment(&user, &account, Some(&root), "reply").await;
    let reply = id_of(&reply, "comment");
    app.comment(&user, &account, Some(&reply), "nested").await;
    app.comment(&user, &account, None, "survivor").await;

    let (status, body) = app
        .send(Method::DELETE, &format!("/api/comments/{root}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, body) = app
        .get(&format!("/api/comments?item_id={account}&item_type=account"), None)
        .await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["comments"][0]["content"], "survivor");

    let (status, _) = app
        .send(Method::DELETE, &format!("/api/comments/{root}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =========================================================================
// Catalog
// =========================================================================

#[tokio::test]
async fn account_min_price_is_cheapest_variant() {
    let app = TestApp::new().await;
    let admin = app.user("admin", Role::Admin).await;
    let id = app.create_account(&admin, "Netflix", &[19.99, 9.99, 14.99]).await;

    let (status, body) = app.get(&format!("/api/accounts/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["account"]["min_price"], 9.99);
    assert_eq!(body["account"]["currency"], "usd");
    assert_eq!(body["account"]["variants"].as_array().unwrap().len(), 3);

    let (_, body) = app.get(&format!("/api/accounts/{id}?currency=vnd"), None).await;
    assert_eq!(body["account"]["currency"], "vnd");
    assert_eq!(body["account"]["min_price"], 9.99 * 25_000.0);
}

#[tokio::test]
async fn account_list_filters_and_sorts() {
    let app = TestApp::new().await;
    let admin = app.user("admin", Role::Admin).await;
    app.create_account(&admin, "Cheap", &[5.0]).await;
    app.create_account(&admin, "Mid", &[10.0, 30.0]).await;
    app.create_account(&admin, "Pricey", &[25.0]).await;
    app.create_account(&admin, "Empty", &[]).await;

    let names = |body: &Value| -> Vec<String> {
        body["accounts"]
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["name"].as_str().unwrap().to_string())
            .collect()
    };

    let (_, body) = app.get("/api/accounts?min_price=10&max_price=", None).await;
    let mut got = names(&body);
    got.sort();
    assert_eq!(got, ["Mid", "Pricey"]);

    let (_, body) = app.get("/api/accounts?min_price=&max_price=", None).await;
    assert_eq!(names(&body).len(), 4);

    let (_, body) = app.get("/api/accounts?sort=price-asc", None).await;
    assert_eq!(names(&body), ["Cheap", "Mid", "Pricey", "Empty"]);

    let (_, body) = app.get("/api/accounts?sort=price-desc", None).await;
    assert_eq!(names(&body), ["Pricey", "Mid", "Cheap", "Empty"]);

    let (status, _) = app.get("/api/accounts?min_price=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn category_filter_and_inactive_listings() {
    let app = TestApp::new().await;
    let admin = app.user("admin", Role::Admin).await;
    let user = app.user("u1", Role::User).await;

    let (status, body) = app
        .post(
            "/api/categories",
            Some(&admin),
            json!({ "name": "Programming", "slug": "Programming" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["category"]["slug"], "programming");
    let category = id_of(&body, "category");

    let course = |title: &str, category: Option<&str>, active: bool| {
        json!({
            "title": title,
            "category_id": category,
            "price_usd": 20.0,
            "price_vnd": 500_000.0,
            "is_active": active,
        })
    };
    let (status, _) = app
        .post("/api/courses", Some(&admin), course("Rust", Some(category.as_str()), true))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    app.post("/api/courses", Some(&admin), course("Design", None, true)).await;
    let (_, hidden) = app
        .post("/api/courses", Some(&admin), course("Draft", Some(category.as_str()), false))
        .await;
    let hidden = id_of(&hidden, "course");

    let (status, _) = app
        .post("/api/courses", Some(&admin), course("Ghost", Some("missing"), true))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = app.get(&format!("/api/courses?category={category}"), None).await;
    assert_eq!(body["courses"].as_array().unwrap().len(), 1);
    assert_eq!(body["courses"][0]["title"], "Rust");

    let (_, body) = app.get("/api/courses?category=all", None).await;
    assert_eq!(body["courses"].as_array().unwrap().len(), 2);

    let (status, _) = app.get(&format!("/api/courses/{hidden}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&format!("/api/courses/{hidden}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/courses?include_inactive=true", Some(&user)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (_, body) = app.get("/api/courses?include_inactive=true", Some(&admin)).await;
    assert_eq!(body["courses"].as_array().unwrap().len(), 3);
}

// =========================================================================
// Cart
// =========================================================================

#[tokio::test]
async fn adding_same_line_twice_sums_quantity() {
    let app = TestApp::new().await;
    let admin = app.user("admin", Role::Admin).await;
    let user = app.user("u1", Role::User).await;
    let account = app.create_account(&admin, "Netflix", &[19.99, 9.99]).await;

    let (_, body) = app.get(&format!("/api/accounts/{account}"), None).await;
    let variant = body["account"]["variants"][1]["id"].as_str().unwrap().to_string();

    let line = json!({ "item_id": account, "item_type": "account", "variant_id": variant, "quantity": 2 });
    let (status, first) = app.post("/api/cart/items", Some(&user), line.clone()).await;
    assert_eq!(status, StatusCode::CREATED, "{first}");
    let (_, second) = app.post("/api/cart/items", Some(&user), line).await;
    assert_eq!(first["item"]["id"], second["item"]["id"]);

    let (status, body) = app.get("/api/cart", Some(&user)).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["cart"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["quantity"], 4);
    assert_eq!(items[0]["variant_id"], variant.as_str());
}

#[tokio::test]
async fn cart_line_validation() {
    let app = TestApp::new().await;
    let admin = app.user("admin", Role::Admin).await;
    let user = app.user("u1", Role::User).await;
    let account = app.create_account(&admin, "Netflix", &[19.99]).await;

    let cases = [
        json!({ "item_id": account, "item_type": "account" }),
        json!({ "item_id": account, "item_type": "account", "variant_id": "other" }),
        json!({ "item_id": account, "item_type": "bundle" }),
        json!({ "item_id": account, "item_type": "account", "quantity": 0 }),
    ];
    for case in cases {
        let (status, _) = app.post("/api/cart/items", Some(&user), case.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{case}");
    }

    let (status, _) = app
        .post("/api/cart/items", Some(&user), json!({ "item_id": "nope", "item_type": "course" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cart_items_are_owner_only() {
    let app = TestApp::new().await;
    let admin = app.user("admin", Role::Admin).await;
    let owner = app.user("u1", Role::User).await;
    let other = app.user("u2", Role::User).await;

    let (_, course) = app
        .post(
            "/api/courses",
            Some(&admin),
            json!({ "title": "Rust", "price_usd": 20.0, "price_vnd": 500_000.0 }),
        )
        .await;
    let course = id_of(&course, "course");

    let (_, body) = app
        .post("/api/cart/items", Some(&owner), json!({ "item_id": course, "item_type": "course" }))
        .await;
    let item = id_of(&body, "item");
    assert_eq!(body["item"]["variant_id"], Value::Null);

    let uri = format!("/api/cart/items/{item}");
    let (status, _) = app
        .send(Method::PATCH, &uri, Some(&other), Some(json!({ "quantity": 5 })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.send(Method::DELETE, &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(Method::PATCH, &uri, Some(&owner), Some(json!({ "quantity": 5 })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["item"]["quantity"], 5);

    let (status, _) = app.send(Method::DELETE, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.send(Method::DELETE, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =========================================================================
// Promotions
// =========================================================================

fn promotion(code: &str, start: i64, end: i64, limit: Option<i64>) -> Value {
    json!({
        "code": code,
        "name_vi": "Khuyến mãi",
        "name_en": "Sale",
        "discount_percent": 20,
        "max_discount_amount": 15.0,
        "min_order_amount": 10.0,
        "start_date": start,
        "end_date": end,
        "usage_limit": limit,
    })
}

#[tokio::test]
async fn promotion_status_is_derived_from_dates() {
    let app = TestApp::new().await;
    let admin = app.user("admin", Role::Admin).await;
    let now = unix_timestamp();
    let day = 86_400;

    for (code, start, end) in [
        ("LIVE", now - day, now + day),
        ("SOON", now + day, now + 2 * day),
        ("OVER", now - 2 * day, now - day),
    ] {
        let (status, body) = app
            .post("/api/promotions", Some(&admin), promotion(code, start, end, None))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (status, body) = app.get("/api/promotions", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    let status_of = |code: &str| {
        body["promotions"]
            .as_array()
            .unwrap()
            .iter()
            .find(|p| p["code"] == code)
            .unwrap()["status"]
            .clone()
    };
    assert_eq!(status_of("LIVE"), "active");
    assert_eq!(status_of("SOON"), "scheduled");
    assert_eq!(status_of("OVER"), "expired");

    let (status, _) = app
        .post("/api/promotions", Some(&admin), promotion("live", now, now + day, None))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post("/api/promotions", Some(&admin), promotion("BACKWARDS", now, now - day, None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn validate_and_redeem_promotion() {
    let app = TestApp::new().await;
    let admin = app.user("admin", Role::Admin).await;
    let user = app.user("u1", Role::User).await;
    let now = unix_timestamp();

    app.post("/api/promotions", Some(&admin), promotion("SAVE20", now - 60, now + 3600, Some(1)))
        .await;

    let (status, body) = app
        .post(
            "/api/promotions/validate",
            Some(&user),
            json!({ "code": "save20", "order_amount": 50.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["discount_amount"], 10.0);
    assert_eq!(body["final_amount"], 40.0);
    assert_eq!(body["promotion"]["status"], "active");

    // Capped at max_discount_amount.
    let (_, body) = app
        .post(
            "/api/promotions/validate",
            Some(&user),
            json!({ "code": "SAVE20", "order_amount": 200.0 }),
        )
        .await;
    assert_eq!(body["discount_amount"], 15.0);

    let (status, _) = app
        .post(
            "/api/promotions/validate",
            Some(&user),
            json!({ "code": "SAVE20", "order_amount": 5.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/promotions/validate",
            Some(&user),
            json!({ "code": "NOPE", "order_amount": 50.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .send(Method::POST, "/api/promotions/redeem/SAVE20", Some(&user), None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["promotion"]["used_count"], 1);

    let (status, body) = app
        .send(Method::POST, "/api/promotions/redeem/SAVE20", Some(&user), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Promotion usage limit reached");
}
