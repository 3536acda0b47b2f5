//! PostgreSQL implementation for user repository.

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::models::UserRecord;
use super::{PushFilter, SharedTransaction};
use crate::error::{Result, ServerError};
use crate::repository::{Entity, Key, Repository};
use crate::user::{User, UserFilter};

const SELECT_USERS: &str = r#"
    SELECT
        u.id,
        u.name,
        u.created_at,
        e.id AS extend_id,
        e.registered_ip,
        COALESCE(
            JSONB_AGG(
                jsonb_build_object(
                    'id', r.id,
                    'name', r.name,
                    'created_at', r.created_at
                )
                ORDER BY r.id
            ) FILTER (WHERE r.id IS NOT NULL),
            '[]'::jsonb
        ) AS roles
    FROM users u
    JOIN user_extends e ON e.user_id = u.id
    LEFT JOIN user_roles ur ON ur.user_id = u.id
    LEFT JOIN roles r ON r.id = ur.role_id
"#;

const GROUP_USERS: &str = r#"
    GROUP BY u.id, u.name, u.created_at, e.id, e.registered_ip
    ORDER BY u.id
"#;

impl PushFilter for UserFilter {
    fn push_filter(&self, query: &mut QueryBuilder<'_, Postgres>) {
        match self {
            UserFilter::Name(name) => {
                query.push("u.name = ").push_bind(name.clone());
            },
            UserFilter::RegisteredIp(ip) => {
                query
                    .push("EXISTS (SELECT 1 FROM user_extends fe WHERE fe.user_id = u.id AND fe.registered_ip = ")
                    .push_bind(ip.clone())
                    .push(")");
            },
            UserFilter::HasRole(role_id) => {
                query
                    .push("EXISTS (SELECT 1 FROM user_roles fr WHERE fr.user_id = u.id AND fr.role_id = ")
                    .push_bind(*role_id)
                    .push(")");
            },
        }
    }
}

/// PostgreSQL user repository.
///
/// Stores the user row together with its extend record and role links.
pub struct PgUserRepository {
    tx: SharedTransaction,
}

impl PgUserRepository {
    /// Create a new [`PgUserRepository`].
    pub(super) fn new(tx: SharedTransaction) -> Self {
        Self { tx }
    }

    /// Replace every role link of a user.
    async fn link_roles(&self, user: &User) -> Result<()> {
        let mut tx = self.tx.lock().await;
        let role_ids: Vec<i32> = user.roles.iter().map(|role| role.id).collect();

        sqlx::query(r#"DELETE FROM user_roles WHERE user_id = $1"#)
            .bind(user.id)
            .execute(&mut **tx)
            .await?;

        sqlx::query(
            r#"INSERT INTO user_roles (user_id, role_id)
                SELECT $1, UNNEST($2::INT4[])
                ON CONFLICT DO NOTHING"#,
        )
        .bind(user.id)
        .bind(role_ids)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl Repository<User> for PgUserRepository {
    async fn entities(&self) -> Result<Vec<User>> {
        let mut tx = self.tx.lock().await;
        let mut query = QueryBuilder::<Postgres>::new(SELECT_USERS);
        query.push(GROUP_USERS);

        let records = query
            .build_query_as::<UserRecord>()
            .fetch_all(&mut **tx)
            .await?;

        Ok(records.into_iter().map(User::from).collect())
    }

    async fn get_by_key(&self, key: Key) -> Result<Option<User>> {
        let mut tx = self.tx.lock().await;
        let mut query = QueryBuilder::<Postgres>::new(SELECT_USERS);
        query.push(" WHERE u.id = ").push_bind(key).push(GROUP_USERS);

        let record = query
            .build_query_as::<UserRecord>()
            .fetch_optional(&mut **tx)
            .await?;

        Ok(record.map(User::from))
    }

    async fn check_exists(
        &self,
        filter: &UserFilter,
        exclude: Option<Key>,
    ) -> Result<bool> {
        let mut tx = self.tx.lock().await;
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT EXISTS (SELECT 1 FROM users u WHERE ",
        );
        filter.push_filter(&mut query);
        if let Some(id) = exclude {
            query.push(" AND u.id <> ").push_bind(id);
        }
        query.push(")");

        let exists = query
            .build_query_scalar::<bool>()
            .fetch_one(&mut **tx)
            .await?;

        Ok(exists)
    }

    async fn insert(&self, mut user: User) -> Result<User> {
        {
            let mut tx = self.tx.lock().await;

            let id: i32 = sqlx::query_scalar(
                r#"INSERT INTO users (name, created_at) VALUES ($1, $2) RETURNING id"#,
            )
            .bind(&user.name)
            .bind(user.created_at)
            .fetch_one(&mut **tx)
            .await?;
            user.set_key(id);

            user.extend.id = sqlx::query_scalar(
                r#"INSERT INTO user_extends (user_id, registered_ip) VALUES ($1, $2) RETURNING id"#,
            )
            .bind(id)
            .bind(&user.extend.registered_ip)
            .fetch_one(&mut **tx)
            .await?;
        }

        if !user.roles.is_empty() {
            self.link_roles(&user).await?;
        }

        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<()> {
        {
            let mut tx = self.tx.lock().await;

            let result =
                sqlx::query(r#"UPDATE users SET name = $2 WHERE id = $1"#)
                    .bind(user.id)
                    .bind(&user.name)
                    .execute(&mut **tx)
                    .await?;

            if result.rows_affected() == 0 {
                return Err(ServerError::NotFound {
                    entity: User::NAME,
                    id: user.id,
                });
            }
        }

        self.link_roles(user).await
    }

    async fn delete(&self, key: Key) -> Result<()> {
        let mut tx = self.tx.lock().await;

        let result = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(key)
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ServerError::NotFound {
                entity: User::NAME,
                id: key,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sqlx::{Pool, Postgres};

    use crate::error::ServerError;
    use crate::repository::{Key, PgStore, Store};
    use crate::service::IdentityService;
    use crate::user::{UserDto, UserFilter};

    #[sqlx::test(fixtures("../../../fixtures/identity.sql"))]
    async fn test_user_repository(pool: Pool<Postgres>) {
        let store = PgStore::new(pool);
        let uow = store.begin().await.unwrap();

        let admin = uow.users().get_by_key(1).await.unwrap().unwrap();
        assert_eq!(admin.name, "admin");
        assert_eq!(admin.extend.registered_ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(admin.roles.len(), 1);

        assert!(
            uow.users()
                .check_exists(&UserFilter::Name("admin".into()), None)
                .await
                .unwrap()
        );
        assert!(
            !uow.users()
                .check_exists(&UserFilter::Name("admin".into()), Some(1))
                .await
                .unwrap()
        );

        let user = uow
            .users()
            .insert(UserDto::new("guest", Some("10.0.0.2")).into())
            .await
            .unwrap();
        assert_eq!(user.extend.user_id, user.id);
        uow.commit().await.unwrap();

        let uow = store.begin().await.unwrap();
        assert_eq!(uow.users().entities().await.unwrap().len(), 2);
    }

    #[sqlx::test(fixtures("../../../fixtures/identity.sql"))]
    async fn test_set_user_roles(pool: Pool<Postgres>) {
        let service = IdentityService::new(Arc::new(PgStore::new(pool)));

        service.set_user_roles(1, vec![2]).await.unwrap();
        let admin = service.user(1).await.unwrap();
        assert_eq!(admin.roles.len(), 1);
        assert_eq!(admin.roles[0].name, "editor");

        service.set_user_roles(1, vec![2, 1, 2]).await.unwrap();
        let admin = service.user(1).await.unwrap();
        let ids: Vec<Key> = admin.roles.iter().map(|role| role.id).collect();
        assert_eq!(ids, vec![1, 2]);

        // Unknown role rolls back.
        let result = service.set_user_roles(1, vec![9]).await;
        assert!(matches!(
            result,
            Err(ServerError::NotFound { entity: "role", id: 9 })
        ));
        assert_eq!(service.user(1).await.unwrap().roles.len(), 2);

        service.set_user_roles(1, Vec::new()).await.unwrap();
        assert!(service.user(1).await.unwrap().roles.is_empty());
    }

    #[sqlx::test(fixtures("../../../fixtures/identity.sql"))]
    async fn test_delete_users(pool: Pool<Postgres>) {
        let service =
            IdentityService::new(Arc::new(PgStore::new(pool.clone())));
        service
            .add_users(vec![UserDto::new("guest", Some("10.0.0.2"))])
            .await
            .unwrap();

        let result = service.delete_users(vec![1, 42]).await;
        assert!(matches!(result, Err(ServerError::NotFound { id: 42, .. })));
        assert_eq!(service.users().await.unwrap().len(), 2);

        service.delete_users(vec![1]).await.unwrap();

        let users = service.users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].name, "guest");

        let extends: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM user_extends")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(extends, 1);
        let links: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_roles")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(links, 0);
    }

    #[sqlx::test(fixtures("../../../fixtures/identity.sql"))]
    async fn test_edit_users(pool: Pool<Postgres>) {
        let service = IdentityService::new(Arc::new(PgStore::new(pool)));
        service
            .add_users(vec![UserDto::new("guest", Some("10.0.0.2"))])
            .await
            .unwrap();

        let result = service
            .edit_users(vec![UserDto::new("admin", Some("10.9.9.9")).id(2)])
            .await;
        assert!(matches!(result, Err(ServerError::UserNameMismatch { .. })));

        service
            .edit_users(vec![UserDto::new("admin", Some("10.9.9.9")).id(1)])
            .await
            .unwrap();
        let admin = service.user(1).await.unwrap();
        assert_eq!(admin.extend.registered_ip.as_deref(), Some("10.9.9.9"));
        assert_eq!(
            service.user(2).await.unwrap().extend.registered_ip.as_deref(),
            Some("10.0.0.2")
        );
    }
}
