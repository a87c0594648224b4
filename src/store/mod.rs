//! Persistence for student records and user accounts.
//!
//! Handlers only ever see [`Store`]; the Postgres implementation is used in
//! production and the in-memory one for tests and `memory://` development runs.
//! Both enforce uniqueness of `nisn`, `nik` and `username` themselves, so a
//! write that loses a race against a concurrent submission fails with
//! [`StoreError::Conflict`] or [`StoreError::DuplicateUser`] instead of
//! creating a duplicate.

pub mod memory;
pub mod pg;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::models::{NewSiswa, Siswa, UserAccount};

pub use memory::MemoryStore;
pub use pg::PgStore;

pub type DynStore = Arc<dyn Store>;

/// Columns that identify a single student record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Nisn,
    Nik,
}

impl UniqueField {
    pub fn column(self) -> &'static str {
        match self {
            UniqueField::Nisn => "nisn",
            UniqueField::Nik => "nik",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint on a student record rejected the write.
    Conflict(UniqueField),
    /// An account with the same username already exists.
    DuplicateUser,
    /// The backing database could not serve the request.
    Unavailable(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Conflict(field) => write!(f, "duplicate value for `{}`", field.column()),
            StoreError::DuplicateUser => f.write_str("duplicate value for `username`"),
            StoreError::Unavailable(message) => write!(f, "store unavailable: {}", message),
        }
    }
}

impl std::error::Error for StoreError {}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    /// All records in insertion order.
    async fn list_siswa(&self) -> StoreResult<Vec<Siswa>>;

    /// Point lookup of a record by `nisn` or `nik`.
    async fn find_siswa(&self, field: UniqueField, value: &str) -> StoreResult<Option<Siswa>>;

    async fn insert_siswa(&self, siswa: NewSiswa) -> StoreResult<Siswa>;

    /// Replaces every field of the record currently keyed by `old_nisn`.
    /// Returns `false` when no such record exists.
    async fn update_siswa(&self, old_nisn: &str, siswa: NewSiswa) -> StoreResult<bool>;

    /// Returns `false` when no record matched.
    async fn delete_siswa(&self, nisn: &str) -> StoreResult<bool>;

    async fn find_user(&self, username: &str) -> StoreResult<Option<UserAccount>>;

    async fn count_users(&self) -> StoreResult<i64>;

    async fn insert_user(&self, user: UserAccount) -> StoreResult<()>;
}
