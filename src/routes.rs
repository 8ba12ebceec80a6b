// src/routes.rs

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{delete, get, patch, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{admin, auth, catalog, leaderboard, quiz},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware, player_middleware, super_admin_middleware},
};

/// Assembles the main application router.
///
/// * Public routes: register/login. Everything else sits behind the auth
///   middleware, with role guards layered per sub-router (auth runs first,
///   then the role check reads the injected claims).
/// * Applies global middleware (Trace, CORS) and injects the shared state.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/logout", post(auth::logout))
                .route("/refresh", post(auth::refresh))
                .route("/change-password", post(auth::change_password))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                )),
        );

    let admin_only = middleware::from_fn(admin_middleware);

    // Category listing is readable by any authenticated user (players pick a
    // category before starting a quiz); every catalog mutation and the
    // answer-revealing question listing require an admin.
    let catalog_routes = Router::new()
        .route("/categories", get(catalog::list_categories))
        .route(
            "/categories",
            post(catalog::create_category).layer(admin_only.clone()),
        )
        .route(
            "/categories/{id}",
            patch(catalog::update_category)
                .delete(catalog::delete_category)
                .layer(admin_only.clone()),
        )
        .route(
            "/categories/questions",
            get(catalog::list_questions).layer(admin_only.clone()),
        )
        .route(
            "/categories/questions/{id}",
            patch(catalog::update_question)
                .delete(catalog::delete_question)
                .layer(admin_only.clone()),
        )
        .route(
            "/categories/{id}/questions",
            post(catalog::create_question).layer(admin_only.clone()),
        )
        .route(
            "/categories/{id}/questions/bulk",
            post(catalog::bulk_create_questions).layer(admin_only),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let quiz_routes = Router::new()
        .route("/quiz", get(quiz::start_quiz))
        .route("/quiz/answers", post(quiz::submit_answers))
        .route("/scores/me", get(leaderboard::my_scores))
        .layer(middleware::from_fn(player_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let leaderboard_routes = Router::new()
        .route("/leaderboard", get(leaderboard::get_leaderboard))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let management_routes = Router::new()
        .route("/admins", get(admin::list_admins).post(admin::create_admin))
        .route("/admins/{id}", delete(admin::delete_admin))
        .layer(middleware::from_fn(super_admin_middleware))
        .merge(
            Router::new()
                .route("/players", get(admin::list_players))
                .route("/players/{id}", delete(admin::delete_player))
                .layer(middleware::from_fn(admin_middleware)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(auth_routes)
        .merge(catalog_routes)
        .merge(quiz_routes)
        .merge(leaderboard_routes)
        .merge(management_routes)
        // Global middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
