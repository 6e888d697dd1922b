//! HTTP handlers for the REST API.
//!
//! Handlers decode the body, call one service operation and shape the reply.
//! Authorization beyond "has a valid token" is decided by the services, except
//! where a request body must be parsed first: there the role is checked up
//! front so non-admins see 403 rather than a validation error.

use axum::{extract::State, http::StatusCode, Json};

use super::dto::{
    CreateRaceRequest, CreateRaceResponse, DeleteUserRequest, EndRacerRequest, EndRacerResponse,
    HealthResponse, LoginRequest, LoginResponse, MessageResponse, RaceKeyRequest, RaceResponse,
    RacerRacesByNameRequest, RacerRacesRequest, RacerRequest, RacesResponse, RegisterRequest,
    RegisterResponse, StartRacerRequest, StartRacerResponse, UpdateProfileRequest,
    UpdateProfileResponse, UpdateRaceRequest,
};
use super::error::AppError;
use super::extract::{ApiJson, AuthUser};
use super::state::AppState;
use crate::api::{Leaderboard, RaceView, Role, UserProfile};
use crate::services::require_role;

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// Result type for handlers answering 201 Created.
pub type CreatedResult<T> = Result<(StatusCode, Json<T>), AppError>;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let database = match state.repository.health_check().await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database,
    }))
}

// =============================================================================
// Auth
// =============================================================================

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> CreatedResult<RegisterResponse> {
    let user_id = state.auth.register(req.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User created successfully".to_string(),
            user_id,
        }),
    ))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> HandlerResult<LoginResponse> {
    let outcome = state.auth.login(&req.username, &req.password).await?;
    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token: outcome.token,
        user: outcome.user,
    }))
}

/// POST /auth/profile
pub async fn profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> HandlerResult<UserProfile> {
    Ok(Json(state.auth.get_profile(claims.id).await?))
}

/// POST /auth/update
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> HandlerResult<UpdateProfileResponse> {
    let user = state.auth.update_profile(claims.id, req.into()).await?;
    Ok(Json(UpdateProfileResponse {
        message: "User updated successfully".to_string(),
        user,
    }))
}

/// POST /auth/all
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> HandlerResult<Vec<UserProfile>> {
    Ok(Json(state.auth.list_users(&claims).await?))
}

/// POST /auth/delete
pub async fn delete_user(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ApiJson(req): ApiJson<DeleteUserRequest>,
) -> HandlerResult<MessageResponse> {
    state.auth.delete_user(&claims, &req.user_id).await?;
    Ok(Json(MessageResponse::new("User deleted successfully")))
}

// =============================================================================
// Race CRUD
// =============================================================================

/// POST /raceManagement/create
pub async fn create_race(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ApiJson(req): ApiJson<CreateRaceRequest>,
) -> CreatedResult<CreateRaceResponse> {
    require_role(&claims, Role::Admin)?;
    let race_id = state
        .races
        .create_race(&claims, req.into_new_race()?)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateRaceResponse {
            message: "Race created successfully".to_string(),
            race_id,
        }),
    ))
}

/// POST /raceManagement/all
pub async fn list_races(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
) -> HandlerResult<Vec<RaceView>> {
    Ok(Json(state.races.list_races().await?))
}

/// POST /raceManagement/get-race
pub async fn get_race(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiJson(req): ApiJson<RaceKeyRequest>,
) -> HandlerResult<RaceView> {
    Ok(Json(state.races.get_race(&req.id).await?))
}

/// POST /raceManagement/update
pub async fn update_race(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ApiJson(req): ApiJson<UpdateRaceRequest>,
) -> HandlerResult<RaceResponse> {
    require_role(&claims, Role::Admin)?;
    let (id, update) = req.into_update()?;
    let race = state.races.update_race(&claims, &id, update).await?;
    Ok(Json(RaceResponse {
        message: "Race updated successfully".to_string(),
        race,
    }))
}

/// POST /raceManagement/delete
pub async fn delete_race(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    ApiJson(req): ApiJson<RaceKeyRequest>,
) -> HandlerResult<MessageResponse> {
    state.races.delete_race(&claims, &req.id).await?;
    Ok(Json(MessageResponse::new("Race deleted successfully")))
}

// =============================================================================
// Roster and timing
// =============================================================================

/// POST /raceManagement/add-racer
pub async fn add_racer(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiJson(req): ApiJson<RacerRequest>,
) -> HandlerResult<RaceResponse> {
    let race = state.races.add_racer(&req.id, &req.racer_id).await?;
    Ok(Json(RaceResponse {
        message: "Racer added successfully".to_string(),
        race,
    }))
}

/// POST /raceManagement/remove-racer
pub async fn remove_racer(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiJson(req): ApiJson<RacerRequest>,
) -> HandlerResult<RaceResponse> {
    let race = state.races.remove_racer(&req.id, &req.racer_id).await?;
    Ok(Json(RaceResponse {
        message: "Racer removed successfully".to_string(),
        race,
    }))
}

/// POST /raceManagement/start-racer
pub async fn start_racer(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiJson(req): ApiJson<StartRacerRequest>,
) -> HandlerResult<StartRacerResponse> {
    let start_time = state
        .races
        .start_racer(&req.id, &req.racer_id, req.start_time.as_ref())
        .await?;
    Ok(Json(StartRacerResponse {
        message: "Racer start time recorded".to_string(),
        start_time,
    }))
}

/// POST /raceManagement/end-racer
pub async fn end_racer(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiJson(req): ApiJson<EndRacerRequest>,
) -> HandlerResult<EndRacerResponse> {
    let end_time = state
        .races
        .end_racer(&req.id, &req.racer_id, req.end_time.as_ref())
        .await?;
    Ok(Json(EndRacerResponse {
        message: "Racer end time recorded".to_string(),
        end_time,
    }))
}

/// POST /raceManagement/leaderboard
pub async fn leaderboard(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiJson(req): ApiJson<RaceKeyRequest>,
) -> HandlerResult<Leaderboard> {
    Ok(Json(state.races.leaderboard(&req.id).await?))
}

// =============================================================================
// Racer queries
// =============================================================================

/// POST /raceManagement/getRacerRaces
pub async fn racer_races(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiJson(req): ApiJson<RacerRacesRequest>,
) -> HandlerResult<RacesResponse> {
    let races = state.races.races_for_racer(&req.racer_id).await?;
    Ok(Json(RacesResponse {
        races,
        message: None,
    }))
}

/// POST /raceManagement/getRacerRacesByName
pub async fn racer_races_by_name(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    ApiJson(req): ApiJson<RacerRacesByNameRequest>,
) -> HandlerResult<RacesResponse> {
    let races = state
        .races
        .races_for_racer_by_name(&req.racer_name, &req.race_name)
        .await?;
    Ok(Json(RacesResponse {
        races,
        message: Some("success".to_string()),
    }))
}
