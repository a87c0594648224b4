use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// A student record as persisted in the `siswa` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Siswa {
    pub uuid: Uuid,
    pub nama: String,
    pub jk: String,
    pub nisn: String,
    pub nik: String,
    pub nokk: String,
    pub tingkat: String,
    pub rombel: String,
    pub terdaftar: String,
    pub ttl: String,
    pub tgl_masuk: NaiveDate,
    pub created_at: DateTime<Utc>,
}

/// Field values of a student record that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSiswa {
    pub nama: String,
    pub jk: String,
    pub nisn: String,
    pub nik: String,
    pub nokk: String,
    pub tingkat: String,
    pub rombel: String,
    pub terdaftar: String,
    pub ttl: String,
    pub tgl_masuk: NaiveDate,
}

impl NewSiswa {
    pub fn into_record(self) -> Siswa {
        Siswa {
            uuid: Uuid::new_v4(),
            nama: self.nama,
            jk: self.jk,
            nisn: self.nisn,
            nik: self.nik,
            nokk: self.nokk,
            tingkat: self.tingkat,
            rombel: self.rombel,
            terdaftar: self.terdaftar,
            ttl: self.ttl,
            tgl_masuk: self.tgl_masuk,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserAccount {
    pub uuid: Uuid,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// The authenticated user carried by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub uuid: Uuid,
    pub username: String,
}

impl From<&UserAccount> for Principal {
    fn from(user: &UserAccount) -> Self {
        Self {
            uuid: user.uuid,
            username: user.username.clone(),
        }
    }
}
