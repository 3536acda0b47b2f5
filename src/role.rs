//! Roles granted to users.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::repository::{Entity, Filter, Key};

/// Role as saved on database.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: Key,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// External representation of a [`Role`].
#[derive(Clone, Debug, Default, PartialEq, Validate, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDto {
    #[serde(default)]
    pub id: Key,
    #[validate(length(
        min = 1,
        max = 64,
        message = "Name must be 1 to 64 characters long."
    ))]
    pub name: String,
}

impl RoleDto {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
        }
    }

    /// Update `id` field on [`RoleDto`].
    pub fn id(mut self, id: Key) -> Self {
        self.id = id;
        self
    }
}

impl From<RoleDto> for Role {
    fn from(dto: RoleDto) -> Self {
        Role {
            id: dto.id,
            name: dto.name,
            created_at: Utc::now(),
        }
    }
}

/// Predicates over roles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoleFilter {
    Name(String),
}

impl Filter<Role> for RoleFilter {
    fn matches(&self, role: &Role) -> bool {
        match self {
            RoleFilter::Name(name) => &role.name == name,
        }
    }
}

impl Entity for Role {
    const NAME: &'static str = "role";

    type Filter = RoleFilter;

    fn key(&self) -> Key {
        self.id
    }

    fn set_key(&mut self, key: Key) {
        self.id = key;
    }
}
