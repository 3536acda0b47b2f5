//! PostgreSQL implementation for role repository.

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::models::RoleRecord;
use super::{PushFilter, SharedTransaction};
use crate::error::{Result, ServerError};
use crate::repository::{Entity, Key, Repository};
use crate::role::{Role, RoleFilter};

impl PushFilter for RoleFilter {
    fn push_filter(&self, query: &mut QueryBuilder<'_, Postgres>) {
        match self {
            RoleFilter::Name(name) => {
                query.push("name = ").push_bind(name.clone());
            },
        }
    }
}

/// PostgreSQL role repository.
pub struct PgRoleRepository {
    tx: SharedTransaction,
}

impl PgRoleRepository {
    /// Create a new [`PgRoleRepository`].
    pub(super) fn new(tx: SharedTransaction) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl Repository<Role> for PgRoleRepository {
    async fn entities(&self) -> Result<Vec<Role>> {
        let mut tx = self.tx.lock().await;

        let records = sqlx::query_as::<_, RoleRecord>(
            r#"SELECT id, name, created_at FROM roles ORDER BY id"#,
        )
        .fetch_all(&mut **tx)
        .await?;

        Ok(records.into_iter().map(Role::from).collect())
    }

    async fn get_by_key(&self, key: Key) -> Result<Option<Role>> {
        let mut tx = self.tx.lock().await;

        let record = sqlx::query_as::<_, RoleRecord>(
            r#"SELECT id, name, created_at FROM roles WHERE id = $1"#,
        )
        .bind(key)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(record.map(Role::from))
    }

    async fn check_exists(
        &self,
        filter: &RoleFilter,
        exclude: Option<Key>,
    ) -> Result<bool> {
        let mut tx = self.tx.lock().await;
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT EXISTS (SELECT 1 FROM roles WHERE ",
        );
        filter.push_filter(&mut query);
        if let Some(id) = exclude {
            query.push(" AND id <> ").push_bind(id);
        }
        query.push(")");

        let exists = query
            .build_query_scalar::<bool>()
            .fetch_one(&mut **tx)
            .await?;

        Ok(exists)
    }

    async fn insert(&self, mut role: Role) -> Result<Role> {
        let mut tx = self.tx.lock().await;

        let id: i32 = sqlx::query_scalar(
            r#"INSERT INTO roles (name, created_at) VALUES ($1, $2) RETURNING id"#,
        )
        .bind(&role.name)
        .bind(role.created_at)
        .fetch_one(&mut **tx)
        .await?;
        role.set_key(id);

        Ok(role)
    }

    async fn update(&self, role: &Role) -> Result<()> {
        let mut tx = self.tx.lock().await;

        let result =
            sqlx::query(r#"UPDATE roles SET name = $2 WHERE id = $1"#)
                .bind(role.id)
                .bind(&role.name)
                .execute(&mut **tx)
                .await?;

        if result.rows_affected() == 0 {
            return Err(ServerError::NotFound {
                entity: Role::NAME,
                id: role.id,
            });
        }

        Ok(())
    }

    async fn delete(&self, key: Key) -> Result<()> {
        let mut tx = self.tx.lock().await;

        let result = sqlx::query(r#"DELETE FROM roles WHERE id = $1"#)
            .bind(key)
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ServerError::NotFound {
                entity: Role::NAME,
                id: key,
            });
        }

        Ok(())
    }
}
