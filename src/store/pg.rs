use async_trait::async_trait;
use sqlx::postgres::{PgDatabaseError, PgPoolOptions};
use sqlx::PgPool;

use super::{Store, StoreError, StoreResult, UniqueField};
use crate::models::{NewSiswa, Siswa, UserAccount};

const UNIQUE_VIOLATION: &str = "23505";

const SCHEMA: [&str; 2] = [
    "CREATE TABLE IF NOT EXISTS users (
        uuid UUID PRIMARY KEY,
        username TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        CONSTRAINT users_username_key UNIQUE (username)
    )",
    "CREATE TABLE IF NOT EXISTS siswa (
        uuid UUID PRIMARY KEY,
        nama TEXT NOT NULL,
        jk TEXT NOT NULL,
        nisn TEXT NOT NULL,
        nik TEXT NOT NULL,
        nokk TEXT NOT NULL,
        tingkat TEXT NOT NULL,
        rombel TEXT NOT NULL,
        terdaftar TEXT NOT NULL,
        ttl TEXT NOT NULL,
        tgl_masuk DATE NOT NULL,
        created_at TIMESTAMPTZ NOT NULL,
        CONSTRAINT siswa_nisn_key UNIQUE (nisn),
        CONSTRAINT siswa_nik_key UNIQUE (nik)
    )",
];

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new().max_connections(8).connect(url).await?;
        Ok(Self { pool })
    }

    /// Creates the tables and unique constraints if they are missing.
    pub async fn prepare(&self) -> anyhow::Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if let Some(pg) = db.try_downcast_ref::<PgDatabaseError>() {
                if pg.code() == UNIQUE_VIOLATION {
                    match pg.constraint() {
                        Some("siswa_nisn_key") => return StoreError::Conflict(UniqueField::Nisn),
                        Some("siswa_nik_key") => return StoreError::Conflict(UniqueField::Nik),
                        Some("users_username_key") => return StoreError::DuplicateUser,
                        _ => {}
                    }
                }
            }
        }
        StoreError::Unavailable(err.to_string())
    }
}

#[async_trait]
impl Store for PgStore {
    async fn list_siswa(&self) -> StoreResult<Vec<Siswa>> {
        let rows = sqlx::query_as::<_, Siswa>("SELECT * FROM siswa ORDER BY created_at, uuid")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn find_siswa(&self, field: UniqueField, value: &str) -> StoreResult<Option<Siswa>> {
        let sql = match field {
            UniqueField::Nisn => "SELECT * FROM siswa WHERE nisn = $1 LIMIT 1",
            UniqueField::Nik => "SELECT * FROM siswa WHERE nik = $1 LIMIT 1",
        };
        let row = sqlx::query_as::<_, Siswa>(sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn insert_siswa(&self, siswa: NewSiswa) -> StoreResult<Siswa> {
        let record = siswa.into_record();
        sqlx::query("INSERT INTO siswa VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)")
            .bind(record.uuid)
            .bind(&record.nama)
            .bind(&record.jk)
            .bind(&record.nisn)
            .bind(&record.nik)
            .bind(&record.nokk)
            .bind(&record.tingkat)
            .bind(&record.rombel)
            .bind(&record.terdaftar)
            .bind(&record.ttl)
            .bind(record.tgl_masuk)
            .bind(record.created_at)
            .execute(&self.pool)
            .await?;
        Ok(record)
    }

    async fn update_siswa(&self, old_nisn: &str, siswa: NewSiswa) -> StoreResult<bool> {
        let res = sqlx::query(
            "UPDATE siswa SET nama = $1, jk = $2, nisn = $3, nik = $4, nokk = $5, tingkat = $6, \
             rombel = $7, terdaftar = $8, ttl = $9, tgl_masuk = $10 WHERE nisn = $11",
        )
        .bind(siswa.nama)
        .bind(siswa.jk)
        .bind(siswa.nisn)
        .bind(siswa.nik)
        .bind(siswa.nokk)
        .bind(siswa.tingkat)
        .bind(siswa.rombel)
        .bind(siswa.terdaftar)
        .bind(siswa.ttl)
        .bind(siswa.tgl_masuk)
        .bind(old_nisn)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() >= 1)
    }

    async fn delete_siswa(&self, nisn: &str) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM siswa WHERE nisn = $1")
            .bind(nisn)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() >= 1)
    }

    async fn find_user(&self, username: &str) -> StoreResult<Option<UserAccount>> {
        let user = sqlx::query_as::<_, UserAccount>("SELECT * FROM users WHERE username = $1 LIMIT 1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn count_users(&self) -> StoreResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_user(&self, user: UserAccount) -> StoreResult<()> {
        sqlx::query("INSERT INTO users VALUES ($1, $2, $3, $4)")
            .bind(user.uuid)
            .bind(user.username)
            .bind(user.password_hash)
            .bind(user.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
