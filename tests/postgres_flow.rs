// tests/postgres_flow.rs
//
// Needs a running Postgres: DATABASE_URL=postgres://... cargo test -- --ignored

use olympiad_backend::{
    config::Config, models::user::Role, routes, state::AppState, utils::hash::hash_password,
};
use serde_json::{Value, json};
use sqlx::{PgPool, postgres::PgPoolOptions};

struct TestApp {
    address: String,
    pool: PgPool,
    client: reqwest::Client,
}

impl TestApp {
    async fn spawn() -> Self {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(&database_url)
            .await
            .expect("Failed to connect to Postgres for testing. Make sure DATABASE_URL is set.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to migrate database");

        let config = Config {
            database_url,
            jwt_secret: "test_secret_for_integration_tests".to_string(),
            jwt_expiration: 600,
            rust_log: "error".to_string(),
            admin_username: None,
            admin_password: None,
            bind_addr: "127.0.0.1:0".to_string(),
        };
        let app = routes::create_router(AppState {
            pool: pool.clone(),
            config,
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            address,
            pool,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let body: Value = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        body["token"].as_str().expect("token").to_string()
    }

    async fn register(&self, role: &str) -> (i64, String) {
        let username = format!("{}_{}", &role[..1], &uuid::Uuid::new_v4().to_string()[..8]);
        let response = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&json!({ "username": username, "password": "password123", "role": role }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);
        let user: Value = response.json().await.unwrap();
        let token = self.login(&username, "password123").await;
        (user["id"].as_i64().unwrap(), token)
    }

    async fn admin(&self) -> String {
        let username = format!("a_{}", &uuid::Uuid::new_v4().to_string()[..8]);
        sqlx::query("INSERT INTO users (username, password, role, is_verified) VALUES ($1, $2, $3, TRUE)")
            .bind(&username)
            .bind(hash_password("password123").unwrap())
            .bind(Role::Admin.as_str())
            .execute(&self.pool)
            .await
            .unwrap();
        self.login(&username, "password123").await
    }
}

#[tokio::test]
#[ignore]
async fn author_review_answer_and_grade() {
    let app = TestApp::spawn().await;
    let admin = app.admin().await;
    let (teacher_id, teacher) = app.register("teacher").await;
    let (_, student) = app.register("student").await;

    let question = json!({
        "text": "Pair each country with its capital",
        "type": "MATCHING",
        "points": 4,
        "subjectId": "geography",
        "grade": 9,
        "round": 1,
        "isAutoScored": true,
        "pairs": [
            { "left": "France", "right": "Paris" },
            { "left": "Spain", "right": "Madrid" }
        ]
    });

    // Unverified teachers cannot author.
    let response = app
        .client
        .post(app.url("/api/questions"))
        .bearer_auth(&teacher)
        .json(&question)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = app
        .client
        .put(app.url(&format!("/api/admin/teachers/{}/verification", teacher_id)))
        .bearer_auth(&admin)
        .json(&json!({ "verified": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let created: Value = app
        .client
        .post(app.url("/api/questions"))
        .bearer_auth(&teacher)
        .json(&question)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let matching_id = created["id"].as_i64().unwrap();
    assert_eq!(created["status"], "PENDING");
    assert_eq!(created["body"]["correctAnswer"], json!({ "A": 1, "B": 2 }));

    // Students cannot see it until approved.
    let response = app
        .client
        .get(app.url(&format!("/api/questions/{}", matching_id)))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = app
        .client
        .put(app.url(&format!("/api/admin/questions/{}/review", matching_id)))
        .bearer_auth(&admin)
        .json(&json!({ "status": "ACTIVE" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let public: Value = app
        .client
        .get(app.url(&format!("/api/questions/{}", matching_id)))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(public["body"].get("correctAnswer").is_none());
    assert_eq!(public["body"]["right"][0], json!({ "ordinal": 2, "text": "Madrid" }));

    let open: Value = app
        .client
        .post(app.url("/api/questions"))
        .bearer_auth(&admin)
        .json(&json!({
            "text": "Why do rivers meander?",
            "type": "OPEN_ENDED",
            "points": 5,
            "subjectId": "geography",
            "grade": 9,
            "round": 1
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let open_id = open["id"].as_i64().unwrap();
    assert_eq!(open["status"], "ACTIVE");

    let mut answers = serde_json::Map::new();
    answers.insert(matching_id.to_string(), json!({ "A": "Paris", "B": "Madrid" }));
    answers.insert(open_id.to_string(), json!("Erosion on the outer bank."));

    let summary: Value = app
        .client
        .post(app.url("/api/answers"))
        .bearer_auth(&student)
        .json(&json!({ "answers": answers }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["totalPoints"], 4);
    assert_eq!(summary["pendingReview"], 1);

    // Answered questions are frozen, even for admins.
    let mut edited = question.clone();
    edited["pairs"] = json!([
        { "left": "France", "right": "Madrid" },
        { "left": "Spain", "right": "Paris" }
    ]);
    let response = app
        .client
        .put(app.url(&format!("/api/questions/{}", matching_id)))
        .bearer_auth(&admin)
        .json(&edited)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    let open_answer = summary["results"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["questionId"] == open_id)
        .unwrap()["answerId"]
        .as_i64()
        .unwrap();

    let response = app
        .client
        .put(app.url(&format!("/api/answers/{}/grade", open_answer)))
        .bearer_auth(&teacher)
        .json(&json!({ "points": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let response = app
        .client
        .put(app.url(&format!("/api/answers/{}/grade", open_answer)))
        .bearer_auth(&teacher)
        .json(&json!({ "points": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    // Answered questions cannot be deleted.
    let response = app
        .client
        .delete(app.url(&format!("/api/questions/{}", open_id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
}
