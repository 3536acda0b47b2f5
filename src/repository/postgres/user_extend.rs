//! PostgreSQL implementation for user extend repository.

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use super::models::UserExtendRecord;
use super::{PushFilter, SharedTransaction};
use crate::error::{Result, ServerError};
use crate::repository::{Entity, Key, Repository};
use crate::user::{UserExtend, UserExtendFilter};

impl PushFilter for UserExtendFilter {
    fn push_filter(&self, query: &mut QueryBuilder<'_, Postgres>) {
        match self {
            UserExtendFilter::RegisteredIp(ip) => {
                query.push("registered_ip = ").push_bind(ip.clone());
            },
        }
    }
}

/// PostgreSQL user extend repository.
pub struct PgUserExtendRepository {
    tx: SharedTransaction,
}

impl PgUserExtendRepository {
    /// Create a new [`PgUserExtendRepository`].
    pub(super) fn new(tx: SharedTransaction) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl Repository<UserExtend> for PgUserExtendRepository {
    async fn entities(&self) -> Result<Vec<UserExtend>> {
        let mut tx = self.tx.lock().await;

        let records = sqlx::query_as::<_, UserExtendRecord>(
            r#"SELECT id, user_id, registered_ip FROM user_extends ORDER BY id"#,
        )
        .fetch_all(&mut **tx)
        .await?;

        Ok(records.into_iter().map(UserExtend::from).collect())
    }

    async fn get_by_key(&self, key: Key) -> Result<Option<UserExtend>> {
        let mut tx = self.tx.lock().await;

        let record = sqlx::query_as::<_, UserExtendRecord>(
            r#"SELECT id, user_id, registered_ip FROM user_extends WHERE id = $1"#,
        )
        .bind(key)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(record.map(UserExtend::from))
    }

    async fn check_exists(
        &self,
        filter: &UserExtendFilter,
        exclude: Option<Key>,
    ) -> Result<bool> {
        let mut tx = self.tx.lock().await;
        let mut query = QueryBuilder::<Postgres>::new(
            "SELECT EXISTS (SELECT 1 FROM user_extends WHERE ",
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

    async fn insert(&self, mut extend: UserExtend) -> Result<UserExtend> {
        let mut tx = self.tx.lock().await;

        let id: i32 = sqlx::query_scalar(
            r#"INSERT INTO user_extends (user_id, registered_ip) VALUES ($1, $2) RETURNING id"#,
        )
        .bind(extend.user_id)
        .bind(&extend.registered_ip)
        .fetch_one(&mut **tx)
        .await?;
        extend.set_key(id);

        Ok(extend)
    }

    async fn update(&self, extend: &UserExtend) -> Result<()> {
        let mut tx = self.tx.lock().await;

        let result = sqlx::query(
            r#"UPDATE user_extends SET registered_ip = $2 WHERE id = $1"#,
        )
        .bind(extend.id)
        .bind(&extend.registered_ip)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ServerError::NotFound {
                entity: UserExtend::NAME,
                id: extend.id,
            });
        }

        Ok(())
    }

    async fn delete(&self, key: Key) -> Result<()> {
        let mut tx = self.tx.lock().await;

        let result = sqlx::query(r#"DELETE FROM user_extends WHERE id = $1"#)
            .bind(key)
            .execute(&mut **tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ServerError::NotFound {
                entity: UserExtend::NAME,
                id: key,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sqlx::{Pool, Postgres};

    use crate::error::ServerError;
    use crate::repository::{PgStore, Store};
    use crate::user::UserExtendFilter;

    #[sqlx::test(fixtures("../../../fixtures/identity.sql"))]
    async fn test_user_extend_repository(pool: Pool<Postgres>) {
        let store = PgStore::new(pool);
        let uow = store.begin().await.unwrap();

        let mut extend = uow.user_extends().get_by_key(1).await.unwrap().unwrap();
        assert_eq!(extend.user_id, 1);

        let local = UserExtendFilter::RegisteredIp("127.0.0.1".into());
        assert!(uow.user_extends().check_exists(&local, None).await.unwrap());
        assert!(!uow.user_extends().check_exists(&local, Some(1)).await.unwrap());

        extend.registered_ip = None;
        uow.user_extends().update(&extend).await.unwrap();
        assert!(!uow.user_extends().check_exists(&local, None).await.unwrap());

        extend.id = 9;
        assert!(matches!(
            uow.user_extends().update(&extend).await,
            Err(ServerError::NotFound { id: 9, .. })
        ));
    }
}
