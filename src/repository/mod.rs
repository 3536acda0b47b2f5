//! Generic repository port between the identity service and its storage.
//!
//! Every entity set is reached through [`Repository`], and the three
//! repositories of one request are grouped by a [`UnitOfWork`]: either all of
//! their changes are committed, or none.

pub mod memory;
pub mod postgres;

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::Result;
use crate::role::Role;
use crate::user::{User, UserExtend};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Primary key type shared by every entity.
pub type Key = i32;

/// Stored entity reachable through a [`Repository`].
pub trait Entity: Clone + Debug + Send + Sync + 'static {
    /// Human name, used on error messages.
    const NAME: &'static str;

    /// Typed predicate of [`Repository::check_exists`].
    type Filter: Filter<Self>;

    /// Primary key of the entity.
    fn key(&self) -> Key;

    /// Set primary key once storage assigned it.
    fn set_key(&mut self, key: Key);
}

/// Predicate over an entity set.
///
/// In-memory storage evaluates it with [`Filter::matches`], SQL storage
/// translates it into a `WHERE` clause.
pub trait Filter<E>: Debug + Send + Sync {
    fn matches(&self, entity: &E) -> bool;
}

/// Data access over one entity set.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Every entity of the set, ordered by key.
    async fn entities(&self) -> Result<Vec<E>>;

    /// Find an entity using its key.
    async fn get_by_key(&self, key: Key) -> Result<Option<E>>;

    /// Whether any entity but `exclude` matches `filter`.
    async fn check_exists(
        &self,
        filter: &E::Filter,
        exclude: Option<Key>,
    ) -> Result<bool>;

    /// Insert an entity and return it with its assigned key.
    async fn insert(&self, entity: E) -> Result<E>;

    /// Update an existing entity.
    async fn update(&self, entity: &E) -> Result<()>;

    /// Delete an entity using its key.
    async fn delete(&self, key: Key) -> Result<()>;
}

/// Repositories sharing a single transaction.
///
/// Dropping a unit of work without calling [`UnitOfWork::commit`] discards
/// every change made through it.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn users(&self) -> &dyn Repository<User>;

    fn user_extends(&self) -> &dyn Repository<UserExtend>;

    fn roles(&self) -> &dyn Repository<Role>;

    /// Persist every change.
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Storage backend able to open units of work.
#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;
}
