//! Request and response bodies of the HTTP API.
//!
//! Field names are camelCase on the wire. Race-scoped requests name the race
//! `id` and the user `racerId`; `raceId` and `userId` are accepted as aliases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::api::{
    GeoPoint, NewRace, RaceId, RaceUpdate, RaceView, Role, TimeInput, UserId, UserProfile,
    UserSummary, UserUpdate,
};
use crate::models::parse_instant;
use crate::services::{Registration, ServiceResult};

/// Keeps an explicit `null` distinct from an absent field.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Blank input counts as "not supplied".
fn optional_instant(input: Option<&TimeInput>) -> ServiceResult<Option<DateTime<Utc>>> {
    match input {
        Some(value) if !value.is_blank() => Ok(Some(parse_instant(value)?)),
        _ => Ok(None),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, alias = "type")]
    pub role: Option<Role>,
}

impl From<RegisterRequest> for Registration {
    fn from(req: RegisterRequest) -> Self {
        Registration {
            username: req.username,
            password: req.password,
            role: req.role.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,
    pub user_id: UserId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default, alias = "type")]
    pub role: Option<Role>,
}

impl From<UpdateProfileRequest> for UserUpdate {
    fn from(req: UpdateProfileRequest) -> Self {
        UserUpdate {
            username: non_empty(req.username),
            role: req.role,
            password: req.password.filter(|p| !p.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateProfileResponse {
    pub message: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserRequest {
    #[serde(default, alias = "id")]
    pub user_id: String,
}

// =============================================================================
// Races
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRaceRequest {
    #[serde(default)]
    pub name: String,
    pub start_time: Option<TimeInput>,
    pub end_time: Option<TimeInput>,
    pub description: Option<String>,
    pub starting_point: Option<GeoPoint>,
    pub ending_point: Option<GeoPoint>,
}

impl CreateRaceRequest {
    pub fn into_new_race(self) -> ServiceResult<NewRace> {
        Ok(NewRace {
            name: self.name,
            start_time: optional_instant(self.start_time.as_ref())?,
            end_time: optional_instant(self.end_time.as_ref())?,
            description: self.description,
            starting_point: self.starting_point,
            ending_point: self.ending_point,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRaceResponse {
    pub message: String,
    pub race_id: RaceId,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRaceRequest {
    #[serde(default, alias = "raceId")]
    pub id: String,
    pub name: Option<String>,
    pub start_time: Option<TimeInput>,
    #[serde(default, deserialize_with = "nullable")]
    pub end_time: Option<Option<TimeInput>>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub starting_point: Option<Option<GeoPoint>>,
    #[serde(default, deserialize_with = "nullable")]
    pub ending_point: Option<Option<GeoPoint>>,
}

impl UpdateRaceRequest {
    /// Empty `name`, `startTime` and `description` are ignored; `endTime` and
    /// the points are cleared when sent as `null`.
    pub fn into_update(self) -> ServiceResult<(String, RaceUpdate)> {
        let end_time = match self.end_time {
            None => None,
            Some(value) => Some(optional_instant(value.as_ref())?),
        };
        let update = RaceUpdate {
            name: non_empty(self.name),
            start_time: optional_instant(self.start_time.as_ref())?,
            end_time,
            description: non_empty(self.description),
            starting_point: self.starting_point,
            ending_point: self.ending_point,
        };
        Ok((self.id, update))
    }
}

/// Body naming a single race.
#[derive(Debug, Clone, Deserialize)]
pub struct RaceKeyRequest {
    #[serde(default, alias = "raceId")]
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RacerRequest {
    #[serde(default, alias = "raceId")]
    pub id: String,
    #[serde(default, alias = "userId")]
    pub racer_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRacerRequest {
    #[serde(default, alias = "raceId")]
    pub id: String,
    #[serde(default, alias = "userId")]
    pub racer_id: String,
    pub start_time: Option<TimeInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndRacerRequest {
    #[serde(default, alias = "raceId")]
    pub id: String,
    #[serde(default, alias = "userId")]
    pub racer_id: String,
    pub end_time: Option<TimeInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RacerRacesRequest {
    #[serde(default, alias = "userId")]
    pub racer_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RacerRacesByNameRequest {
    #[serde(default, alias = "username")]
    pub racer_name: String,
    #[serde(default)]
    pub race_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RaceResponse {
    pub message: String,
    pub race: RaceView,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRacerResponse {
    pub message: String,
    pub start_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndRacerResponse {
    pub message: String,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RacesResponse {
    pub races: Vec<RaceView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// =============================================================================
// Shared
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub database: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_update_request_separates_null_from_absent() {
        let req: UpdateRaceRequest = serde_json::from_value(json!({
            "id": "r",
            "endTime": null,
            "startingPoint": { "latitude": 1.0, "longitude": 2.0 }
        }))
        .unwrap();
        assert_eq!(req.end_time, Some(None));
        assert!(req.ending_point.is_none());

        let (id, update) = req.into_update().unwrap();
        assert_eq!(id, "r");
        assert_eq!(update.end_time, Some(None));
        assert_eq!(update.starting_point, Some(Some(GeoPoint::new(1.0, 2.0).unwrap())));
        assert_eq!(update.ending_point, None);
    }

    #[test]
    fn test_update_request_ignores_empty_strings() {
        let req: UpdateRaceRequest = serde_json::from_value(json!({
            "raceId": "r",
            "name": "",
            "description": "",
            "startTime": ""
        }))
        .unwrap();
        let (_, update) = req.into_update().unwrap();
        assert!(update.name.is_none());
        assert!(update.description.is_none());
        assert!(update.start_time.is_none());
    }

    #[test]
    fn test_racer_request_aliases() {
        let a: RacerRequest = serde_json::from_value(json!({"id": "r", "racerId": "u"})).unwrap();
        let b: RacerRequest =
            serde_json::from_value(json!({"raceId": "r", "userId": "u"})).unwrap();
        assert_eq!((a.id, a.racer_id), (b.id, b.racer_id));
    }

    #[test]
    fn test_register_accepts_type_alias() {
        let req: RegisterRequest =
            serde_json::from_value(json!({"username": "a", "password": "p", "type": "admin"}))
                .unwrap();
        assert_eq!(Registration::from(req).role, Role::Admin);

        let req: RegisterRequest =
            serde_json::from_value(json!({"username": "a", "password": "p"})).unwrap();
        assert_eq!(Registration::from(req).role, Role::User);
    }

    #[test]
    fn test_create_request_rejects_bad_dates() {
        let req: CreateRaceRequest =
            serde_json::from_value(json!({"name": "5k", "startTime": "soon"})).unwrap();
        assert!(req.into_new_race().is_err());
    }
}
