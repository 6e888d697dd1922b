use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

use super::schema::{races, users};

#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = races)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RaceRow {
    pub id: String,
    pub name: String,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub document: Value,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = races)]
pub struct NewRaceRow {
    pub id: String,
    pub name: String,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub document: Value,
}
