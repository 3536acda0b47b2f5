//! PostgreSQL implementation of the repositories.

mod models;
mod role;
mod user;
mod user_extend;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use tokio::sync::Mutex;

pub use role::PgRoleRepository;
pub use user::PgUserRepository;
pub use user_extend::PgUserExtendRepository;

use crate::error::{Result, ServerError};
use crate::repository::{Repository, Store, UnitOfWork};
use crate::role::Role;
use crate::user::{User, UserExtend};

/// Transaction shared by the repositories of one [`PgUnitOfWork`].
type SharedTransaction = Arc<Mutex<Transaction<'static, Postgres>>>;

/// Translate a filter into a SQL condition.
trait PushFilter {
    fn push_filter(&self, query: &mut QueryBuilder<'_, Postgres>);
}

/// PostgreSQL [`Store`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new [`PgStore`].
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let tx: SharedTransaction = Arc::new(Mutex::new(self.pool.begin().await?));

        Ok(Box::new(PgUnitOfWork {
            users: PgUserRepository::new(Arc::clone(&tx)),
            user_extends: PgUserExtendRepository::new(Arc::clone(&tx)),
            roles: PgRoleRepository::new(Arc::clone(&tx)),
            tx,
        }))
    }
}

/// Unit of work over one PostgreSQL transaction.
pub struct PgUnitOfWork {
    tx: SharedTransaction,
    users: PgUserRepository,
    user_extends: PgUserExtendRepository,
    roles: PgRoleRepository,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    fn users(&self) -> &dyn Repository<User> {
        &self.users
    }

    fn user_extends(&self) -> &dyn Repository<UserExtend> {
        &self.user_extends
    }

    fn roles(&self) -> &dyn Repository<Role> {
        &self.roles
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let PgUnitOfWork {
            tx,
            users,
            user_extends,
            roles,
        } = *self;
        drop((users, user_extends, roles));

        let tx = Arc::try_unwrap(tx).map_err(|_| {
            ServerError::internal("transaction is still used by a repository")
        })?;
        tx.into_inner().commit().await?;

        Ok(())
    }
}
