//! Database models for PostgreSQL.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::FromRow;

use crate::role::Role;
use crate::user::{User, UserExtend};

/// User record joined with its extend record and roles.
#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub extend_id: i32,
    pub registered_ip: Option<String>,
    #[sqlx(json)]
    pub roles: Vec<RoleRecord>,
}

/// Role record as stored in the database.
#[derive(Debug, Clone, FromRow, Deserialize)]
pub struct RoleRecord {
    pub id: i32,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// User extend record as stored in the database.
#[derive(Debug, Clone, FromRow)]
pub struct UserExtendRecord {
    pub id: i32,
    pub user_id: i32,
    pub registered_ip: Option<String>,
}

impl From<RoleRecord> for Role {
    fn from(record: RoleRecord) -> Self {
        Role {
            id: record.id,
            name: record.name,
            created_at: record.created_at,
        }
    }
}

impl From<UserExtendRecord> for UserExtend {
    fn from(record: UserExtendRecord) -> Self {
        UserExtend {
            id: record.id,
            user_id: record.user_id,
            registered_ip: record.registered_ip,
        }
    }
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        User {
            id: record.id,
            name: record.name,
            created_at: record.created_at,
            roles: record.roles.into_iter().map(Role::from).collect(),
            extend: UserExtend {
                id: record.extend_id,
                user_id: record.id,
                registered_ip: record.registered_ip,
            },
        }
    }
}
