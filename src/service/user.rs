//! User operations of [`IdentityService`].

use validator::Validate;

use super::{IdentityService, OperationResult, distinct, excluded};
use crate::error::{Result, ServerError};
use crate::repository::{Entity, Key};
use crate::role::Role;
use crate::user::{User, UserDto, UserFilter};

impl IdentityService {
    /// Every user, with roles and extend record.
    pub async fn users(&self) -> Result<Vec<User>> {
        let uow = self.store.begin().await?;
        let users = uow.users().entities().await?;

        Ok(users)
    }

    /// Find a user using its key.
    pub async fn user(&self, id: Key) -> Result<User> {
        let uow = self.store.begin().await?;
        let user = uow.users().get_by_key(id).await?;

        user.ok_or(ServerError::NotFound {
            entity: User::NAME,
            id,
        })
    }

    /// Whether a user other than `exclude` matches `filter`.
    pub async fn check_user_exists(
        &self,
        filter: &UserFilter,
        exclude: Option<Key>,
    ) -> Result<bool> {
        let uow = self.store.begin().await?;
        let exists = uow.users().check_exists(filter, excluded(exclude)).await?;

        Ok(exists)
    }

    /// Add users, each one with its extend record.
    ///
    /// Fails if a user with the same name already exists.
    pub async fn add_users(&self, dtos: Vec<UserDto>) -> Result<OperationResult> {
        if dtos.is_empty() {
            return Ok(OperationResult::no_changed());
        }

        let uow = self.store.begin().await?;
        let mut ids = Vec::with_capacity(dtos.len());

        for dto in dtos {
            dto.validate()?;

            let filter = UserFilter::Name(dto.name.clone());
            if uow.users().check_exists(&filter, None).await? {
                tracing::warn!(name = %dto.name, "user already exists");
                return Err(ServerError::AlreadyExists {
                    entity: User::NAME,
                    name: dto.name,
                });
            }

            let user = uow.users().insert(User::from(dto)).await?;
            ids.push(user.id);
        }

        uow.commit().await?;

        tracing::info!(?ids, "users added");
        metrics::counter!("identity_users_added_total")
            .increment(ids.len() as u64);

        Ok(OperationResult::success(
            ids.len(),
            format!("{} user(s) added.", ids.len()),
        ))
    }

    /// Update the registration IP of users.
    ///
    /// Fails if no user has the name carried by a DTO, if its key is
    /// unknown, or if the keyed user has another name.
    pub async fn edit_users(
        &self,
        dtos: Vec<UserDto>,
    ) -> Result<OperationResult> {
        if dtos.is_empty() {
            return Ok(OperationResult::no_changed());
        }

        let uow = self.store.begin().await?;
        let mut ids = Vec::with_capacity(dtos.len());

        for dto in dtos {
            dto.validate()?;

            let filter = UserFilter::Name(dto.name.clone());
            if !uow.users().check_exists(&filter, None).await? {
                tracing::warn!(name = %dto.name, "user does not exist");
                return Err(ServerError::UserNameNotFound { name: dto.name });
            }

            let user = uow.users().get_by_key(dto.id).await?.ok_or(
                ServerError::NotFound {
                    entity: User::NAME,
                    id: dto.id,
                },
            )?;

            if user.name != dto.name {
                tracing::warn!(id = %user.id, name = %dto.name, "user name does not match");
                return Err(ServerError::UserNameMismatch {
                    id: user.id,
                    name: dto.name,
                });
            }

            let mut extend = user.extend;
            extend.registered_ip = dto.registered_ip;
            uow.user_extends().update(&extend).await?;

            ids.push(user.id);
        }

        uow.commit().await?;

        let ids = distinct(ids);
        tracing::info!(?ids, "users updated");
        metrics::counter!("identity_users_updated_total")
            .increment(ids.len() as u64);

        Ok(OperationResult::success(
            ids.len(),
            format!("{} user(s) updated.", ids.len()),
        ))
    }

    /// Delete users along with their extend records.
    pub async fn delete_users(&self, ids: Vec<Key>) -> Result<OperationResult> {
        if ids.is_empty() {
            return Err(ServerError::MissingArgument("ids"));
        }

        let ids = distinct(ids);
        let uow = self.store.begin().await?;

        for id in &ids {
            let Some(user) = uow.users().get_by_key(*id).await? else {
                tracing::warn!(%id, "user does not exist");
                return Err(ServerError::NotFound {
                    entity: User::NAME,
                    id: *id,
                });
            };

            uow.user_extends().delete(user.extend.id).await?;
            uow.users().delete(user.id).await?;
        }

        uow.commit().await?;

        tracing::info!(?ids, "users deleted");
        metrics::counter!("identity_users_deleted_total")
            .increment(ids.len() as u64);

        Ok(OperationResult::success(
            ids.len(),
            format!("{} user(s) deleted.", ids.len()),
        ))
    }

    /// Replace the role set of a user.
    ///
    /// Fails if the user or any of the roles does not exist.
    pub async fn set_user_roles(
        &self,
        id: Key,
        role_ids: Vec<Key>,
    ) -> Result<OperationResult> {
        let uow = self.store.begin().await?;

        let mut user =
            uow.users()
                .get_by_key(id)
                .await?
                .ok_or(ServerError::NotFound {
                    entity: User::NAME,
                    id,
                })?;

        let mut roles = Vec::new();
        for role_id in distinct(role_ids) {
            let role = uow.roles().get_by_key(role_id).await?.ok_or(
                ServerError::NotFound {
                    entity: Role::NAME,
                    id: role_id,
                },
            )?;
            roles.push(role);
        }

        user.roles = roles;
        uow.users().update(&user).await?;
        uow.commit().await?;

        tracing::info!(%id, roles = user.roles.len(), "user roles replaced");

        Ok(OperationResult::success(
            1,
            format!(
                "user `{}` now has {} role(s).",
                user.name,
                user.roles.len()
            ),
        ))
    }
}
