use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Store, StoreError, StoreResult, UniqueField};
use crate::models::{NewSiswa, Siswa, UserAccount};

/// Process-local store with the same uniqueness rules as the Postgres schema.
#[derive(Default)]
pub struct MemoryStore {
    siswa: RwLock<Vec<Siswa>>,
    users: RwLock<Vec<UserAccount>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Finds the first unique column of `candidate` already taken by a record
/// other than the one at `skip`.
fn conflict(records: &[Siswa], candidate: &NewSiswa, skip: Option<usize>) -> Option<UniqueField> {
    records
        .iter()
        .enumerate()
        .filter(|(idx, _)| Some(*idx) != skip)
        .find_map(|(_, record)| {
            if record.nisn == candidate.nisn {
                Some(UniqueField::Nisn)
            } else if record.nik == candidate.nik {
                Some(UniqueField::Nik)
            } else {
                None
            }
        })
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_siswa(&self) -> StoreResult<Vec<Siswa>> {
        Ok(self.siswa.read().await.clone())
    }

    async fn find_siswa(&self, field: UniqueField, value: &str) -> StoreResult<Option<Siswa>> {
        let records = self.siswa.read().await;
        let found = records.iter().find(|record| match field {
            UniqueField::Nisn => record.nisn == value,
            UniqueField::Nik => record.nik == value,
        });
        Ok(found.cloned())
    }

    async fn insert_siswa(&self, siswa: NewSiswa) -> StoreResult<Siswa> {
        let mut records = self.siswa.write().await;
        if let Some(field) = conflict(&records, &siswa, None) {
            return Err(StoreError::Conflict(field));
        }
        let record = siswa.into_record();
        records.push(record.clone());
        Ok(record)
    }

    async fn update_siswa(&self, old_nisn: &str, siswa: NewSiswa) -> StoreResult<bool> {
        let mut records = self.siswa.write().await;
        let idx = match records.iter().position(|record| record.nisn == old_nisn) {
            Some(idx) => idx,
            None => return Ok(false),
        };
        if let Some(field) = conflict(&records, &siswa, Some(idx)) {
            return Err(StoreError::Conflict(field));
        }

        let record = &mut records[idx];
        record.nama = siswa.nama;
        record.jk = siswa.jk;
        record.nisn = siswa.nisn;
        record.nik = siswa.nik;
        record.nokk = siswa.nokk;
        record.tingkat = siswa.tingkat;
        record.rombel = siswa.rombel;
        record.terdaftar = siswa.terdaftar;
        record.ttl = siswa.ttl;
        record.tgl_masuk = siswa.tgl_masuk;
        Ok(true)
    }

    async fn delete_siswa(&self, nisn: &str) -> StoreResult<bool> {
        let mut records = self.siswa.write().await;
        let before = records.len();
        records.retain(|record| record.nisn != nisn);
        Ok(records.len() < before)
    }

    async fn find_user(&self, username: &str) -> StoreResult<Option<UserAccount>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|user| user.username == username).cloned())
    }

    async fn count_users(&self) -> StoreResult<i64> {
        Ok(self.users.read().await.len() as i64)
    }

    async fn insert_user(&self, user: UserAccount) -> StoreResult<()> {
        let mut users = self.users.write().await;
        if users.iter().any(|existing| existing.username == user.username) {
            return Err(StoreError::DuplicateUser);
        }
        users.push(user);
        Ok(())
    }
}
