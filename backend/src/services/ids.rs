use crate::api::{RaceId, UserId};

use super::error::{ServiceError, ServiceResult};

pub fn parse_user_id(raw: &str) -> ServiceResult<UserId> {
    UserId::parse(raw).ok_or_else(ServiceError::invalid_id)
}

pub fn parse_race_id(raw: &str) -> ServiceResult<RaceId> {
    RaceId::parse(raw).ok_or_else(ServiceError::invalid_id)
}
