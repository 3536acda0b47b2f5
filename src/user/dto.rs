//! Data transfer objects for users.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::repository::Key;
use crate::user::{User, UserExtend};

/// External representation of a [`User`], used to add or edit one.
#[derive(Clone, Debug, Default, PartialEq, Validate, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    /// Ignored when adding.
    #[serde(default)]
    pub id: Key,
    #[validate(length(
        min = 1,
        max = 64,
        message = "Name must be 1 to 64 characters long."
    ))]
    pub name: String,
    #[validate(ip(message = "Registered IP must be an IPv4 or IPv6 address."))]
    pub registered_ip: Option<String>,
}

impl UserDto {
    /// Create a new [`UserDto`].
    pub fn new(name: impl Into<String>, registered_ip: Option<&str>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            registered_ip: registered_ip.map(str::to_owned),
        }
    }

    /// Update `id` field on [`UserDto`].
    pub fn id(mut self, id: Key) -> Self {
        self.id = id;
        self
    }
}

impl From<UserDto> for User {
    /// Map a new user along with its extend record.
    fn from(dto: UserDto) -> Self {
        User {
            id: 0,
            name: dto.name,
            created_at: chrono::Utc::now(),
            roles: Vec::new(),
            extend: UserExtend {
                id: 0,
                user_id: 0,
                registered_ip: dto.registered_ip,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation() {
        assert!(UserDto::new("admin", Some("10.0.0.1")).validate().is_ok());
        assert!(UserDto::new("admin", Some("::1")).validate().is_ok());
        assert!(UserDto::new("admin", None).validate().is_ok());

        let errors = UserDto::new("", Some("localhost"))
            .validate()
            .unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("name"));
        assert!(fields.contains_key("registered_ip"));
    }

    #[test]
    fn test_deserialize_camel_case() {
        let dto: UserDto = serde_json::from_str(
            r#"{"name": "admin", "registeredIp": "192.168.1.1"}"#,
        )
        .unwrap();

        assert_eq!(dto, UserDto::new("admin", Some("192.168.1.1")));
    }
}
