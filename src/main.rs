// src/main.rs

use dotenvy::dotenv;
use quizhub::config::Config;
use quizhub::routes;
use quizhub::state::AppState;
use quizhub::utils::hash::hash_password;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::time::Duration;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // Initialize Database Pool with Retry
    let mut retry_count = 0;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    panic!("Failed to connect to database after 5 retries: {}", e);
                }
                tracing::warn!("Database not ready, retrying in 2s... (Attempt {})", retry_count);
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    };

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    // Seed the Super Admin Account
    if let Err(e) = seed_super_admin(&pool, &config).await {
        tracing::error!("Failed to seed super admin: {:?}", e);
    }

    let port = config.port;
    let state = AppState::new(pool, config);

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("quizhub listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    // Start the server
    axum::serve(listener, app).await.unwrap();
}

/// Creates the super admin account from SUPER_ADMIN_* environment variables
/// on first boot. Does nothing if the username is already taken or the
/// variables are absent.
async fn seed_super_admin(
    pool: &PgPool,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let (Some(name), Some(email), Some(username), Some(password)) = (
        &config.super_admin_name,
        &config.super_admin_email,
        &config.super_admin_username,
        &config.super_admin_password,
    ) else {
        return Ok(());
    };

    let existing: Option<(i64,)> =
        sqlx::query_as("SELECT user_id FROM credentials WHERE username = $1")
            .bind(username)
            .fetch_optional(pool)
            .await?;

    if existing.is_none() {
        tracing::info!("Seeding super admin: {}", username);
        let hashed_password = hash_password(password)?;

        let mut tx = pool.begin().await?;

        let (user_id,): (i64,) = sqlx::query_as(
            "INSERT INTO users (name, email, role) VALUES ($1, $2, 'super_admin') RETURNING user_id",
        )
        .bind(name)
        .bind(email)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO credentials (user_id, username, password, is_password_changed)
             VALUES ($1, $2, $3, TRUE)",
        )
        .bind(user_id)
        .bind(username)
        .bind(&hashed_password)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!("Super admin created successfully.");
    }

    Ok(())
}
