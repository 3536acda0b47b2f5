//! In-process storage, used when no PostgreSQL instance is configured.
//!
//! A unit of work holds the store lock and edits a copy of the tables.
//! Commit writes the copy back, so units of work are serialised.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::{Result, ServerError};
use crate::repository::{Entity, Filter, Key, Repository, Store, UnitOfWork};
use crate::role::Role;
use crate::user::{User, UserExtend};

/// Rows of one entity set.
#[derive(Debug, Clone)]
pub struct Table<E> {
    rows: BTreeMap<Key, E>,
    sequence: Key,
}

impl<E> Default for Table<E> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            sequence: 0,
        }
    }
}

impl<E> Table<E> {
    fn next_key(&mut self) -> Key {
        self.sequence += 1;
        self.sequence
    }
}

/// User without its relations, as kept in memory.
#[derive(Debug, Clone)]
struct UserRow {
    id: Key,
    name: String,
    created_at: DateTime<Utc>,
    role_ids: BTreeSet<Key>,
}

#[derive(Debug, Clone, Default)]
pub struct Tables {
    users: Table<UserRow>,
    user_extends: Table<UserExtend>,
    roles: Table<Role>,
}

impl Tables {
    fn user_extends(&mut self) -> &mut Table<UserExtend> {
        &mut self.user_extends
    }

    fn roles(&mut self) -> &mut Table<Role> {
        &mut self.roles
    }

    /// Load [`User`] with its roles and extend record.
    fn load_user(&self, row: &UserRow) -> Result<User> {
        let extend = self
            .user_extends
            .rows
            .values()
            .find(|extend| extend.user_id == row.id)
            .cloned()
            .ok_or_else(|| {
                ServerError::internal(format!(
                    "user {} has no extend record",
                    row.id
                ))
            })?;

        Ok(User {
            id: row.id,
            name: row.name.clone(),
            created_at: row.created_at,
            roles: row
                .role_ids
                .iter()
                .filter_map(|id| self.roles.rows.get(id).cloned())
                .collect(),
            extend,
        })
    }

    fn name_taken(&self, name: &str, exclude: Key) -> bool {
        self.users
            .rows
            .values()
            .any(|row| row.id != exclude && row.name == name)
    }
}

type SharedTables = Arc<Mutex<Tables>>;

fn lock(tables: &SharedTables) -> Result<MutexGuard<'_, Tables>> {
    tables
        .lock()
        .map_err(|_| ServerError::internal("memory store lock is poisoned"))
}

/// In-memory [`Store`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<AsyncMutex<Tables>>,
}

impl MemoryStore {
    /// Create an empty [`MemoryStore`].
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let working: SharedTables = Arc::new(Mutex::new(Tables::clone(&guard)));

        Ok(Box::new(MemoryUnitOfWork {
            guard,
            users: MemoryUserRepository {
                tables: Arc::clone(&working),
            },
            user_extends: MemoryRepository {
                tables: Arc::clone(&working),
                table: Tables::user_extends,
            },
            roles: MemoryRepository {
                tables: Arc::clone(&working),
                table: Tables::roles,
            },
            working,
        }))
    }
}

struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<Tables>,
    working: SharedTables,
    users: MemoryUserRepository,
    user_extends: MemoryRepository<UserExtend>,
    roles: MemoryRepository<Role>,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
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
        let mut this = *self;
        let tables = lock(&this.working)?.clone();
        *this.guard = tables;

        Ok(())
    }
}

/// Generic in-memory repository over one [`Table`].
pub struct MemoryRepository<E> {
    tables: SharedTables,
    table: fn(&mut Tables) -> &mut Table<E>,
}

#[async_trait]
impl<E: Entity> Repository<E> for MemoryRepository<E> {
    async fn entities(&self) -> Result<Vec<E>> {
        let mut tables = lock(&self.tables)?;
        Ok((self.table)(&mut tables).rows.values().cloned().collect())
    }

    async fn get_by_key(&self, key: Key) -> Result<Option<E>> {
        let mut tables = lock(&self.tables)?;
        Ok((self.table)(&mut tables).rows.get(&key).cloned())
    }

    async fn check_exists(
        &self,
        filter: &E::Filter,
        exclude: Option<Key>,
    ) -> Result<bool> {
        let mut tables = lock(&self.tables)?;
        Ok((self.table)(&mut tables).rows.values().any(|entity| {
            Some(entity.key()) != exclude && filter.matches(entity)
        }))
    }

    async fn insert(&self, mut entity: E) -> Result<E> {
        let mut tables = lock(&self.tables)?;
        let table = (self.table)(&mut tables);

        entity.set_key(table.next_key());
        table.rows.insert(entity.key(), entity.clone());

        Ok(entity)
    }

    async fn update(&self, entity: &E) -> Result<()> {
        let mut tables = lock(&self.tables)?;
        match (self.table)(&mut tables).rows.get_mut(&entity.key()) {
            Some(row) => {
                *row = entity.clone();
                Ok(())
            },
            None => Err(ServerError::NotFound {
                entity: E::NAME,
                id: entity.key(),
            }),
        }
    }

    async fn delete(&self, key: Key) -> Result<()> {
        let mut tables = lock(&self.tables)?;
        match (self.table)(&mut tables).rows.remove(&key) {
            Some(_) => Ok(()),
            None => Err(ServerError::NotFound {
                entity: E::NAME,
                id: key,
            }),
        }
    }
}

/// In-memory repository of [`User`] aggregates.
///
/// Inserting a user also stores its extend record; deleting a user removes
/// the extend record left behind.
pub struct MemoryUserRepository {
    tables: SharedTables,
}

#[async_trait]
impl Repository<User> for MemoryUserRepository {
    async fn entities(&self) -> Result<Vec<User>> {
        let tables = lock(&self.tables)?;
        tables
            .users
            .rows
            .values()
            .map(|row| tables.load_user(row))
            .collect()
    }

    async fn get_by_key(&self, key: Key) -> Result<Option<User>> {
        let tables = lock(&self.tables)?;
        tables
            .users
            .rows
            .get(&key)
            .map(|row| tables.load_user(row))
            .transpose()
    }

    async fn check_exists(
        &self,
        filter: &<User as Entity>::Filter,
        exclude: Option<Key>,
    ) -> Result<bool> {
        let tables = lock(&self.tables)?;
        for row in tables.users.rows.values() {
            if Some(row.id) != exclude && filter.matches(&tables.load_user(row)?)
            {
                return Ok(true);
            }
        }

        Ok(false)
    }

    async fn insert(&self, mut user: User) -> Result<User> {
        let mut tables = lock(&self.tables)?;
        if tables.name_taken(&user.name, 0) {
            return Err(ServerError::AlreadyExists {
                entity: User::NAME,
                name: user.name,
            });
        }

        let key = tables.users.next_key();
        user.set_key(key);
        user.extend.id = tables.user_extends.next_key();

        tables.users.rows.insert(key, UserRow {
            id: key,
            name: user.name.clone(),
            created_at: user.created_at,
            role_ids: user.roles.iter().map(|role| role.id).collect(),
        });
        tables
            .user_extends
            .rows
            .insert(user.extend.id, user.extend.clone());

        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<()> {
        let mut tables = lock(&self.tables)?;
        if tables.name_taken(&user.name, user.id) {
            return Err(ServerError::AlreadyExists {
                entity: User::NAME,
                name: user.name.clone(),
            });
        }

        let row = tables.users.rows.get_mut(&user.id).ok_or(
            ServerError::NotFound {
                entity: User::NAME,
                id: user.id,
            },
        )?;
        row.name = user.name.clone();
        row.role_ids = user.roles.iter().map(|role| role.id).collect();

        Ok(())
    }

    async fn delete(&self, key: Key) -> Result<()> {
        let mut tables = lock(&self.tables)?;
        if tables.users.rows.remove(&key).is_none() {
            return Err(ServerError::NotFound {
                entity: User::NAME,
                id: key,
            });
        }
        tables.user_extends.rows.retain(|_, extend| extend.user_id != key);

        Ok(())
    }
}
