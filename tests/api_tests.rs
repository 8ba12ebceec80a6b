// tests/api_tests.rs
//
// End-to-end tests against a live Postgres. Each test skips itself when
// DATABASE_URL is not set, so the unit suite stays runnable without a server.

use std::collections::HashMap;

use quizhub::{config::Config, routes, state::AppState, utils::hash::hash_password, utils::jwt::sign_jwt};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

const TEST_JWT_SECRET: &str = "test_secret_for_integration_tests";

fn database_url() -> Option<String> {
    std::env::var("DATABASE_URL").ok()
}

fn test_config(database_url: &str, quiz_time_limit_secs: i64) -> Config {
    Config {
        database_url: database_url.to_string(),
        jwt_secret: TEST_JWT_SECRET.to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        port: 0,
        quiz_question_count: 10,
        quiz_time_limit_secs,
        super_admin_name: None,
        super_admin_email: None,
        super_admin_username: None,
        super_admin_password: None,
    }
}

/// Spawns the app on a random port and returns its base URL plus a pool for
/// direct seeding/assertions.
async fn spawn_app_with(database_url: &str, quiz_time_limit_secs: i64) -> (String, PgPool) {
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url)
        .await
        .expect("Failed to connect to Postgres for testing");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let state = AppState::new(pool.clone(), test_config(database_url, quiz_time_limit_secs));
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (address, pool)
}

async fn spawn_app(database_url: &str) -> (String, PgPool) {
    spawn_app_with(database_url, 300).await
}

fn unique(prefix: &str) -> String {
    format!("{}_{}", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

/// Inserts a user with the given role directly and signs a token for them.
async fn seed_user(pool: &PgPool, role: &str) -> (i64, String, String) {
    let username = unique("u");
    let email = format!("{}@example.com", username);
    let hashed = hash_password("password123").unwrap();

    let (user_id,): (i64,) = sqlx::query_as(
        "INSERT INTO users (name, email, role) VALUES ($1, $2, $3) RETURNING user_id",
    )
    .bind(&username)
    .bind(&email)
    .bind(role)
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query(
        "INSERT INTO credentials (user_id, username, password, is_password_changed)
         VALUES ($1, $2, $3, TRUE)",
    )
    .bind(user_id)
    .bind(&username)
    .bind(&hashed)
    .execute(pool)
    .await
    .unwrap();

    let token = sign_jwt(user_id, &username, role, TEST_JWT_SECRET, 600).unwrap();
    (user_id, username, token)
}

async fn create_category(
    client: &reqwest::Client,
    address: &str,
    admin_token: &str,
    name: &str,
) -> i64 {
    let resp = client
        .post(format!("{address}/categories"))
        .bearer_auth(admin_token)
        .json(&serde_json::json!({ "name": name }))
        .send()
        .await
        .expect("create category failed");
    assert_eq!(resp.status().as_u16(), 201);
    resp.json::<serde_json::Value>().await.unwrap()["category_id"]
        .as_i64()
        .unwrap()
}

/// Seeds `n` one-word questions whose correct answer equals the question text.
async fn seed_one_word_questions(
    client: &reqwest::Client,
    address: &str,
    admin_token: &str,
    category_id: i64,
    n: usize,
) {
    let payload: Vec<serde_json::Value> = (0..n)
        .map(|i| {
            serde_json::json!({
                "text": format!("word {i}"),
                "question_type": "one_word",
                "correct_answer": format!("word {i}"),
            })
        })
        .collect();

    let resp = client
        .post(format!("{address}/categories/{category_id}/questions/bulk"))
        .bearer_auth(admin_token)
        .json(&payload)
        .send()
        .await
        .expect("bulk load failed");
    assert_eq!(resp.status().as_u16(), 201);
}

#[tokio::test]
async fn unknown_path_is_404() {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let (address, _pool) = spawn_app(&url).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{address}/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn register_then_login_works() {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let (address, _pool) = spawn_app(&url).await;
    let client = reqwest::Client::new();
    let username = unique("player");

    let response = client
        .post(format!("{address}/register"))
        .json(&serde_json::json!({
            "name": "Test Player",
            "email": format!("{username}@example.com"),
            "username": username,
            "password": "password123",
        }))
        .send()
        .await
        .expect("register failed");
    assert_eq!(response.status().as_u16(), 201);

    let login = client
        .post(format!("{address}/login"))
        .json(&serde_json::json!({ "username": username, "password": "password123" }))
        .send()
        .await
        .expect("login failed")
        .json::<serde_json::Value>()
        .await
        .unwrap();

    assert!(login["token"].as_str().is_some());
    assert_eq!(login["role"], "player");
    assert_eq!(login["must_change_password"], false);
}

#[tokio::test]
async fn login_with_wrong_password_is_401() {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let (address, pool) = spawn_app(&url).await;
    let client = reqwest::Client::new();
    let (_, username, _) = seed_user(&pool, "player").await;

    let response = client
        .post(format!("{address}/login"))
        .json(&serde_json::json!({ "username": username, "password": "not-the-password" }))
        .send()
        .await
        .expect("login failed");

    assert_eq!(response.status().as_u16(), 401);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn category_names_collide_case_insensitively() {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let (address, pool) = spawn_app(&url).await;
    let client = reqwest::Client::new();
    let (_, _, admin_token) = seed_user(&pool, "admin").await;

    let base = unique("science");
    create_category(&client, &address, &admin_token, &base.to_lowercase()).await;

    // Same name, different casing: normalization collapses both onto one row.
    let response = client
        .post(format!("{address}/categories"))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({ "name": base.to_uppercase() }))
        .send()
        .await
        .expect("create category failed");

    assert_eq!(response.status().as_u16(), 409);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "DUPLICATE_ENTRY");
}

#[tokio::test]
async fn player_cannot_mutate_catalog() {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let (address, pool) = spawn_app(&url).await;
    let client = reqwest::Client::new();
    let (_, _, player_token) = seed_user(&pool, "player").await;

    let response = client
        .post(format!("{address}/categories"))
        .bearer_auth(&player_token)
        .json(&serde_json::json!({ "name": unique("cat") }))
        .send()
        .await
        .expect("request failed");

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn mcq_creation_persists_four_options_one_correct() {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let (address, pool) = spawn_app(&url).await;
    let client = reqwest::Client::new();
    let (_, _, admin_token) = seed_user(&pool, "admin").await;
    let category_id = create_category(&client, &address, &admin_token, &unique("geo")).await;

    let response = client
        .post(format!("{address}/categories/{category_id}/questions"))
        .bearer_auth(&admin_token)
        .json(&serde_json::json!({
            "text": "Capital of France?",
            "question_type": "mcq",
            "correct_answer": "Paris",
            "other_options": ["London", "Berlin", "Madrid"],
        }))
        .send()
        .await
        .expect("create question failed");
    assert_eq!(response.status().as_u16(), 201);
    let question_id = response.json::<serde_json::Value>().await.unwrap()["question_id"]
        .as_i64()
        .unwrap();

    let options: Vec<(String, bool)> =
        sqlx::query_as("SELECT option_text, is_correct FROM options WHERE question_id = $1")
            .bind(question_id)
            .fetch_all(&pool)
            .await
            .unwrap();

    assert_eq!(options.len(), 4);
    assert_eq!(options.iter().filter(|(_, correct)| *correct).count(), 1);
    assert!(options.contains(&("Paris".to_string(), true)));
}

#[tokio::test]
async fn nine_questions_are_insufficient_and_record_no_score() {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let (address, pool) = spawn_app(&url).await;
    let client = reqwest::Client::new();
    let (_, _, admin_token) = seed_user(&pool, "admin").await;
    let (_, _, player_token) = seed_user(&pool, "player").await;

    let category_id = create_category(&client, &address, &admin_token, &unique("small")).await;
    seed_one_word_questions(&client, &address, &admin_token, category_id, 9).await;

    let response = client
        .get(format!("{address}/quiz?category_id={category_id}"))
        .bearer_auth(&player_token)
        .send()
        .await
        .expect("start quiz failed");
    assert_eq!(response.status().as_u16(), 422);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "INSUFFICIENT_QUESTIONS");

    // No session started, so no score record was written either.
    let history = client
        .get(format!("{address}/scores/me"))
        .bearer_auth(&player_token)
        .send()
        .await
        .expect("history failed");
    assert_eq!(history.status().as_u16(), 404);
}

#[tokio::test]
async fn full_quiz_flow_scores_exactly() {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let (address, pool) = spawn_app(&url).await;
    let client = reqwest::Client::new();
    let (_, _, admin_token) = seed_user(&pool, "admin").await;
    let (_, _, player_token) = seed_user(&pool, "player").await;

    let category_id = create_category(&client, &address, &admin_token, &unique("flow")).await;
    seed_one_word_questions(&client, &address, &admin_token, category_id, 10).await;

    let quiz: serde_json::Value = client
        .get(format!("{address}/quiz?category_id={category_id}"))
        .bearer_auth(&player_token)
        .send()
        .await
        .expect("start quiz failed")
        .json()
        .await
        .unwrap();

    let session_id = quiz["session_id"].as_str().unwrap();
    let questions = quiz["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 10);
    // Question views never leak the correct answer.
    assert!(questions.iter().all(|q| q.get("correct_answer").is_none()));

    // Answer 7 questions correctly (the answer equals the question text,
    // submitted in upper case to exercise case-insensitive grading) and 3
    // incorrectly.
    let mut answers = HashMap::new();
    for (i, q) in questions.iter().enumerate() {
        let id = q["question_id"].as_i64().unwrap();
        let text = q["question_text"].as_str().unwrap();
        if i < 7 {
            answers.insert(id, serde_json::json!(text.to_uppercase()));
        } else {
            answers.insert(id, serde_json::json!("wrong"));
        }
    }

    let result: serde_json::Value = client
        .post(format!("{address}/quiz/answers"))
        .bearer_auth(&player_token)
        .json(&serde_json::json!({ "session_id": session_id, "answers": answers }))
        .send()
        .await
        .expect("submit failed")
        .json()
        .await
        .unwrap();

    assert_eq!(result["state"], "completed");
    assert_eq!(result["score"], 70.0);
    assert_eq!(result["correct_count"], 7);
    assert_eq!(result["total_questions"], 10);
    assert_eq!(result["responses"].as_array().unwrap().len(), 10);

    // The session is destroyed after finalization.
    let replay = client
        .post(format!("{address}/quiz/answers"))
        .bearer_auth(&player_token)
        .json(&serde_json::json!({ "session_id": session_id, "answers": {} }))
        .send()
        .await
        .expect("replay failed");
    assert_eq!(replay.status().as_u16(), 404);

    let history: serde_json::Value = client
        .get(format!("{address}/scores/me"))
        .bearer_auth(&player_token)
        .send()
        .await
        .expect("history failed")
        .json()
        .await
        .unwrap();
    assert_eq!(history["best_score"], 70.0);
}

#[tokio::test]
async fn rejected_answer_keeps_session_and_resubmission_scores_exactly() {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let (address, pool) = spawn_app(&url).await;
    let client = reqwest::Client::new();
    let (_, _, admin_token) = seed_user(&pool, "admin").await;
    let (_, _, player_token) = seed_user(&pool, "player").await;

    let category_id = create_category(&client, &address, &admin_token, &unique("retry")).await;
    seed_one_word_questions(&client, &address, &admin_token, category_id, 10).await;

    let quiz: serde_json::Value = client
        .get(format!("{address}/quiz?category_id={category_id}"))
        .bearer_auth(&player_token)
        .send()
        .await
        .expect("start quiz failed")
        .json()
        .await
        .unwrap();
    let session_id = quiz["session_id"].as_str().unwrap();
    let questions = quiz["questions"].as_array().unwrap();

    // Correct answers for all ten, except a numeric pick for the last
    // free-text question, which the engine must reject.
    let mut answers = HashMap::new();
    for q in questions {
        let id = q["question_id"].as_i64().unwrap();
        answers.insert(id, serde_json::json!(q["question_text"].as_str().unwrap()));
    }
    let last_id = questions.last().unwrap()["question_id"].as_i64().unwrap();
    answers.insert(last_id, serde_json::json!(3));

    let rejected = client
        .post(format!("{address}/quiz/answers"))
        .bearer_auth(&player_token)
        .json(&serde_json::json!({ "session_id": session_id, "answers": answers }))
        .send()
        .await
        .expect("submit failed");
    assert_eq!(rejected.status().as_u16(), 400);

    // The session survived; the corrected full map replays the questions the
    // first request already graded without counting any of them twice.
    answers.insert(
        last_id,
        serde_json::json!(
            questions.last().unwrap()["question_text"].as_str().unwrap()
        ),
    );

    let result: serde_json::Value = client
        .post(format!("{address}/quiz/answers"))
        .bearer_auth(&player_token)
        .json(&serde_json::json!({ "session_id": session_id, "answers": answers }))
        .send()
        .await
        .expect("resubmit failed")
        .json()
        .await
        .unwrap();

    assert_eq!(result["state"], "completed");
    assert_eq!(result["score"], 100.0);
    assert_eq!(result["correct_count"], 10);
    assert_eq!(result["responses"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn admin_deletes_a_player_once() {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let (address, pool) = spawn_app(&url).await;
    let client = reqwest::Client::new();
    let (_, _, admin_token) = seed_user(&pool, "admin").await;
    let (player_id, _, _) = seed_user(&pool, "player").await;

    let deleted = client
        .delete(format!("{address}/players/{player_id}"))
        .bearer_auth(&admin_token)
        .send()
        .await
        .expect("delete failed");
    assert_eq!(deleted.status().as_u16(), 204);

    let again = client
        .delete(format!("{address}/players/{player_id}"))
        .bearer_auth(&admin_token)
        .send()
        .await
        .expect("delete failed");
    assert_eq!(again.status().as_u16(), 404);
}

#[tokio::test]
async fn expired_budget_abandons_with_zero_score() {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    // Zero-second budget: the session is already expired at the first check.
    let (address, pool) = spawn_app_with(&url, 0).await;
    let client = reqwest::Client::new();
    let (_, _, admin_token) = seed_user(&pool, "admin").await;
    let (_, _, player_token) = seed_user(&pool, "player").await;

    let category_id = create_category(&client, &address, &admin_token, &unique("timed")).await;
    seed_one_word_questions(&client, &address, &admin_token, category_id, 10).await;

    let quiz: serde_json::Value = client
        .get(format!("{address}/quiz?category_id={category_id}"))
        .bearer_auth(&player_token)
        .send()
        .await
        .expect("start quiz failed")
        .json()
        .await
        .unwrap();
    let session_id = quiz["session_id"].as_str().unwrap();

    let mut answers = HashMap::new();
    for q in quiz["questions"].as_array().unwrap() {
        let id = q["question_id"].as_i64().unwrap();
        answers.insert(id, serde_json::json!("word 0"));
    }

    let result: serde_json::Value = client
        .post(format!("{address}/quiz/answers"))
        .bearer_auth(&player_token)
        .json(&serde_json::json!({ "session_id": session_id, "answers": answers }))
        .send()
        .await
        .expect("submit failed")
        .json()
        .await
        .unwrap();

    assert_eq!(result["state"], "abandoned");
    assert_eq!(result["score"], 0.0);
    assert_eq!(result["responses"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn leaderboard_ranks_by_best_score() {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let (address, pool) = spawn_app(&url).await;
    let client = reqwest::Client::new();
    let (p1, p1_name, token) = seed_user(&pool, "player").await;
    let (p2, p2_name, _) = seed_user(&pool, "player").await;

    for (player_id, score, ts) in [
        (p1, 80.0, "2024-01-01 10:00:00"),
        (p2, 90.0, "2024-01-01 11:00:00"),
        (p1, 95.0, "2024-01-01 12:00:00"),
    ] {
        sqlx::query(r#"INSERT INTO scores (player_id, score, "timestamp") VALUES ($1, $2, $3)"#)
            .bind(player_id)
            .bind(score)
            .bind(ts)
            .execute(&pool)
            .await
            .unwrap();
    }

    let leaderboard: Vec<serde_json::Value> = client
        .get(format!("{address}/leaderboard"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("leaderboard failed")
        .json()
        .await
        .unwrap();

    let pos1 = leaderboard.iter().position(|e| e["username"] == *p1_name);
    let pos2 = leaderboard.iter().position(|e| e["username"] == *p2_name);
    let (pos1, pos2) = (pos1.expect("p1 on board"), pos2.expect("p2 on board"));

    // P1's best (95) outranks P2's best (90); P1's 80 does not appear.
    assert!(pos1 < pos2);
    assert_eq!(leaderboard[pos1]["best_score"], 95.0);
    assert_eq!(leaderboard[pos2]["best_score"], 90.0);
}

#[tokio::test]
async fn deleting_a_category_cascades_to_its_questions() {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let (address, pool) = spawn_app(&url).await;
    let client = reqwest::Client::new();
    let (_, _, admin_token) = seed_user(&pool, "admin").await;

    let category_id = create_category(&client, &address, &admin_token, &unique("gone")).await;
    seed_one_word_questions(&client, &address, &admin_token, category_id, 2).await;

    let delete = client
        .delete(format!("{address}/categories/{category_id}"))
        .bearer_auth(&admin_token)
        .send()
        .await
        .expect("delete failed");
    assert_eq!(delete.status().as_u16(), 204);

    let listing = client
        .get(format!("{address}/categories/questions?category_id={category_id}"))
        .bearer_auth(&admin_token)
        .send()
        .await
        .expect("listing failed");
    assert_eq!(listing.status().as_u16(), 404);
    let body: serde_json::Value = listing.json().await.unwrap();
    assert_eq!(body["status"], "DATA_NOT_FOUND");
}

#[tokio::test]
async fn logout_revokes_the_token() {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL not set; skipping");
        return;
    };
    let (address, pool) = spawn_app(&url).await;
    let client = reqwest::Client::new();
    let (_, _, token) = seed_user(&pool, "player").await;

    let logout = client
        .post(format!("{address}/logout"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("logout failed");
    assert_eq!(logout.status().as_u16(), 200);

    let after = client
        .get(format!("{address}/scores/me"))
        .bearer_auth(&token)
        .send()
        .await
        .expect("request failed");
    assert_eq!(after.status().as_u16(), 401);
}
