//! Router configuration for the HTTP API.
//!
//! Every operation is a `POST` with a JSON body; `/health` is the only `GET`.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::error::expose_error_details;
use super::handlers;
use super::state::AppState;

/// Create the main application router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    // Browser clients call from arbitrary origins.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let auth = Router::new()
        .route("/register", post(handlers::register))
        .route("/login", post(handlers::login))
        .route("/profile", post(handlers::profile))
        .route("/update", post(handlers::update_profile))
        .route("/all", post(handlers::list_users))
        .route("/delete", post(handlers::delete_user));

    let races = Router::new()
        .route("/create", post(handlers::create_race))
        .route("/all", post(handlers::list_races))
        .route("/get-race", post(handlers::get_race))
        .route("/update", post(handlers::update_race))
        .route("/delete", post(handlers::delete_race))
        .route("/add-racer", post(handlers::add_racer))
        .route("/remove-racer", post(handlers::remove_racer))
        .route("/start-racer", post(handlers::start_racer))
        .route("/end-racer", post(handlers::end_racer))
        .route("/leaderboard", post(handlers::leaderboard))
        .route("/getRacerRaces", post(handlers::racer_races))
        .route("/getRacerRacesByName", post(handlers::racer_races_by_name));

    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/auth", auth)
        .nest("/raceManagement", races)
        .layer(middleware::map_response_with_state(
            state.clone(),
            expose_error_details,
        ))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
