mod dto;

pub use dto::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::repository::{Entity, Filter, Key};
use crate::role::Role;

/// User as saved on database.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Key,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub roles: Vec<Role>,
    /// Owned record, created and deleted along with the user.
    pub extend: UserExtend,
}

/// One-to-one extension of a [`User`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserExtend {
    pub id: Key,
    /// Owner of this record.
    pub user_id: Key,
    pub registered_ip: Option<String>,
}

/// Predicates over users.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserFilter {
    Name(String),
    RegisteredIp(String),
    HasRole(Key),
}

impl Filter<User> for UserFilter {
    fn matches(&self, user: &User) -> bool {
        match self {
            UserFilter::Name(name) => &user.name == name,
            UserFilter::RegisteredIp(ip) => {
                user.extend.registered_ip.as_ref() == Some(ip)
            },
            UserFilter::HasRole(id) => user.roles.iter().any(|r| r.id == *id),
        }
    }
}

/// Predicates over user extends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserExtendFilter {
    RegisteredIp(String),
}

impl Filter<UserExtend> for UserExtendFilter {
    fn matches(&self, extend: &UserExtend) -> bool {
        match self {
            UserExtendFilter::RegisteredIp(ip) => {
                extend.registered_ip.as_ref() == Some(ip)
            },
        }
    }
}

impl Entity for User {
    const NAME: &'static str = "user";

    type Filter = UserFilter;

    fn key(&self) -> Key {
        self.id
    }

    fn set_key(&mut self, key: Key) {
        self.id = key;
        self.extend.user_id = key;
    }
}

impl Entity for UserExtend {
    const NAME: &'static str = "user extend";

    type Filter = UserExtendFilter;

    fn key(&self) -> Key {
        self.id
    }

    fn set_key(&mut self, key: Key) {
        self.id = key;
    }
}
