//! Role operations of [`IdentityService`].

use validator::Validate;

use super::{IdentityService, OperationResult, distinct, excluded};
use crate::error::{Result, ServerError};
use crate::repository::{Entity, Filter, Key};
use crate::role::{Role, RoleDto, RoleFilter};
use crate::user::UserFilter;

impl IdentityService {
    /// Every role.
    pub async fn roles(&self) -> Result<Vec<Role>> {
        let uow = self.store.begin().await?;
        let roles = uow.roles().entities().await?;

        Ok(roles)
    }

    /// Whether a role other than `exclude` matches `filter`.
    pub async fn check_role_exists(
        &self,
        filter: &RoleFilter,
        exclude: Option<Key>,
    ) -> Result<bool> {
        let uow = self.store.begin().await?;
        let exists = uow.roles().check_exists(filter, excluded(exclude)).await?;

        Ok(exists)
    }

    /// Add roles. Fails if a role with the same name already exists.
    pub async fn add_roles(&self, dtos: Vec<RoleDto>) -> Result<OperationResult> {
        if dtos.is_empty() {
            return Ok(OperationResult::no_changed());
        }

        let uow = self.store.begin().await?;
        let mut ids = Vec::with_capacity(dtos.len());

        for dto in dtos {
            dto.validate()?;

            let filter = RoleFilter::Name(dto.name.clone());
            if uow.roles().check_exists(&filter, None).await? {
                return Err(ServerError::AlreadyExists {
                    entity: Role::NAME,
                    name: dto.name,
                });
            }

            let role = uow.roles().insert(Role::from(dto)).await?;
            ids.push(role.id);
        }

        uow.commit().await?;
        tracing::info!(?ids, "roles added");

        Ok(OperationResult::success(
            ids.len(),
            format!("{} role(s) added.", ids.len()),
        ))
    }

    /// Rename roles. The new name must not be used by another role.
    pub async fn edit_roles(
        &self,
        dtos: Vec<RoleDto>,
    ) -> Result<OperationResult> {
        if dtos.is_empty() {
            return Ok(OperationResult::no_changed());
        }

        let uow = self.store.begin().await?;
        let mut ids = Vec::with_capacity(dtos.len());

        for dto in dtos {
            dto.validate()?;

            let Some(mut role) = uow.roles().get_by_key(dto.id).await? else {
                return Err(ServerError::NotFound {
                    entity: Role::NAME,
                    id: dto.id,
                });
            };

            let filter = RoleFilter::Name(dto.name.clone());
            if uow.roles().check_exists(&filter, Some(role.id)).await? {
                return Err(ServerError::AlreadyExists {
                    entity: Role::NAME,
                    name: dto.name,
                });
            }

            role.name = dto.name;
            uow.roles().update(&role).await?;
            ids.push(role.id);
        }

        uow.commit().await?;

        let ids = distinct(ids);
        tracing::info!(?ids, "roles updated");

        Ok(OperationResult::success(
            ids.len(),
            format!("{} role(s) updated.", ids.len()),
        ))
    }

    /// Delete roles and withdraw them from every user.
    pub async fn delete_roles(&self, ids: Vec<Key>) -> Result<OperationResult> {
        if ids.is_empty() {
            return Err(ServerError::MissingArgument("ids"));
        }

        let ids = distinct(ids);
        let uow = self.store.begin().await?;

        for id in &ids {
            if uow.roles().get_by_key(*id).await?.is_none() {
                return Err(ServerError::NotFound {
                    entity: Role::NAME,
                    id: *id,
                });
            }

            let holder = UserFilter::HasRole(*id);
            let holders = uow
                .users()
                .entities()
                .await?
                .into_iter()
                .filter(|user| holder.matches(user));
            for mut user in holders {
                user.roles.retain(|role| role.id != *id);
                uow.users().update(&user).await?;
            }

            uow.roles().delete(*id).await?;
        }

        uow.commit().await?;
        tracing::info!(?ids, "roles deleted");

        Ok(OperationResult::success(
            ids.len(),
            format!("{} role(s) deleted.", ids.len()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::repository::MemoryStore;
    use crate::user::UserDto;

    fn service() -> IdentityService {
        IdentityService::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_add_roles() {
        let service = service();

        service
            .add_roles(vec![RoleDto::new("administrator"), RoleDto::new("editor")])
            .await
            .unwrap();
        let roles = service.roles().await.unwrap();
        assert_eq!(roles.len(), 2);
        assert_eq!(roles[1].name, "editor");

        let result = service.add_roles(vec![RoleDto::new("editor")]).await;
        assert!(matches!(result, Err(ServerError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_edit_roles() {
        let service = service();
        service
            .add_roles(vec![RoleDto::new("administrator"), RoleDto::new("editor")])
            .await
            .unwrap();

        // Keeping its own name is allowed.
        service
            .edit_roles(vec![RoleDto::new("editor").id(2)])
            .await
            .unwrap();

        let result = service
            .edit_roles(vec![RoleDto::new("administrator").id(2)])
            .await;
        assert!(matches!(result, Err(ServerError::AlreadyExists { .. })));

        service
            .edit_roles(vec![RoleDto::new("writer").id(2)])
            .await
            .unwrap();
        assert!(
            service
                .check_role_exists(&RoleFilter::Name("writer".into()), None)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_edit_same_role_twice() {
        let service = service();
        service
            .add_roles(vec![RoleDto::new("editor")])
            .await
            .unwrap();

        let result = service
            .edit_roles(vec![
                RoleDto::new("writer").id(1),
                RoleDto::new("author").id(1),
            ])
            .await
            .unwrap();
        assert_eq!(result.affected, 1);
        assert_eq!(service.roles().await.unwrap()[0].name, "author");
    }

    #[tokio::test]
    async fn test_delete_roles_withdraws_them() {
        let service = service();
        service
            .add_users(vec![UserDto::new("admin", None)])
            .await
            .unwrap();
        service
            .add_roles(vec![RoleDto::new("administrator"), RoleDto::new("editor")])
            .await
            .unwrap();
        service.set_user_roles(1, vec![1, 2]).await.unwrap();

        service.delete_roles(vec![1]).await.unwrap();

        let user = service.user(1).await.unwrap();
        assert_eq!(user.roles.len(), 1);
        assert_eq!(user.roles[0].name, "editor");
        assert_eq!(service.roles().await.unwrap().len(), 1);

        let result = service.delete_roles(vec![1]).await;
        assert!(matches!(result, Err(ServerError::NotFound { id: 1, .. })));
    }
}
