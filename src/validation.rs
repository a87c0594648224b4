//! Field rules checked before a student record is created or updated.
//!
//! Rules are plain data ([`Rule`]) grouped per [`Mode`]. Every rule of the mode
//! runs, so a rejected submission reports all of its problems at once. The
//! uniqueness rules hit the store with one point query each.
//!
//! Creating a record only checks the length of `nisn` and `nik`; only the
//! update path requires a numeric `nokk`.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::models::{NewSiswa, Siswa};
use crate::store::{Store, StoreResult, UniqueField};

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Raw student form as submitted by the browser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SiswaForm {
    pub nama: String,
    pub jk: String,
    pub nisn: String,
    pub nik: String,
    pub nokk: String,
    pub tingkat: String,
    pub rombel: String,
    pub terdaftar: String,
    pub ttl: String,
    pub tgl_masuk: String,
    /// Key of the record being edited; empty on create.
    #[serde(rename = "oldNisn")]
    pub old_nisn: String,
}

impl From<&Siswa> for SiswaForm {
    fn from(siswa: &Siswa) -> Self {
        Self {
            nama: siswa.nama.clone(),
            jk: siswa.jk.clone(),
            nisn: siswa.nisn.clone(),
            nik: siswa.nik.clone(),
            nokk: siswa.nokk.clone(),
            tingkat: siswa.tingkat.clone(),
            rombel: siswa.rombel.clone(),
            terdaftar: siswa.terdaftar.clone(),
            ttl: siswa.ttl.clone(),
            tgl_masuk: siswa.tgl_masuk.format(DATE_FORMAT).to_string(),
            old_nisn: siswa.nisn.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Nama,
    Jk,
    Nisn,
    Nik,
    Nokk,
    Tingkat,
    Rombel,
    Terdaftar,
    Ttl,
    TglMasuk,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::Nama,
        Field::Jk,
        Field::Nisn,
        Field::Nik,
        Field::Nokk,
        Field::Tingkat,
        Field::Rombel,
        Field::Terdaftar,
        Field::Ttl,
        Field::TglMasuk,
    ];

    /// Form parameter name.
    pub fn name(self) -> &'static str {
        match self {
            Field::Nama => "nama",
            Field::Jk => "jk",
            Field::Nisn => "nisn",
            Field::Nik => "nik",
            Field::Nokk => "nokk",
            Field::Tingkat => "tingkat",
            Field::Rombel => "rombel",
            Field::Terdaftar => "terdaftar",
            Field::Ttl => "ttl",
            Field::TglMasuk => "tgl_masuk",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::Nama => "Nama",
            Field::Jk => "Jenis Kelamin",
            Field::Nisn => "NISN",
            Field::Nik => "NIK",
            Field::Nokk => "No. KK",
            Field::Tingkat => "Tingkat",
            Field::Rombel => "Rombel",
            Field::Terdaftar => "Terdaftar",
            Field::Ttl => "Tempat, Tanggal Lahir",
            Field::TglMasuk => "Tanggal Masuk",
        }
    }

    pub fn value(self, form: &SiswaForm) -> &str {
        match self {
            Field::Nama => &form.nama,
            Field::Jk => &form.jk,
            Field::Nisn => &form.nisn,
            Field::Nik => &form.nik,
            Field::Nokk => &form.nokk,
            Field::Tingkat => &form.tingkat,
            Field::Rombel => &form.rombel,
            Field::Terdaftar => &form.terdaftar,
            Field::Ttl => &form.ttl,
            Field::TglMasuk => &form.tgl_masuk,
        }
    }
}

impl From<UniqueField> for Field {
    fn from(field: UniqueField) -> Self {
        match field {
            UniqueField::Nik => Field::Nik,
            UniqueField::Nisn => Field::Nisn,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// Not blank after trimming.
    Required,
    /// Exactly this many characters.
    Length(usize),
    /// Non-empty and ASCII digits only.
    Digits,
    /// A `YYYY-MM-DD` calendar date.
    Date,
    /// No stored record holds this value.
    Unique(UniqueField),
    /// No stored record holds this value, unless the value is the edited
    /// record's previous NISN.
    UniqueExceptPrevious(UniqueField),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    pub field: Field,
    pub check: Check,
    pub message: &'static str,
}

const fn rule(field: Field, check: Check, message: &'static str) -> Rule {
    Rule {
        field,
        check,
        message,
    }
}

pub const CREATE_RULES: &[Rule] = &[
    rule(Field::Nisn, Check::Length(8), "NISN wajib 8 digit angka!"),
    rule(Field::Nisn, Check::Unique(UniqueField::Nisn), "NISN sudah terdaftar!"),
    rule(Field::Nik, Check::Length(16), "NIK wajib 16 digit angka!"),
    rule(Field::Nik, Check::Unique(UniqueField::Nik), "NIK sudah terdaftar!"),
    rule(Field::Nokk, Check::Length(16), "No. KK harus 16 digit angka!"),
];

pub const UPDATE_RULES: &[Rule] = &[
    rule(
        Field::Nisn,
        Check::UniqueExceptPrevious(UniqueField::Nisn),
        "NISN sudah digunakan!",
    ),
    rule(Field::Nokk, Check::Length(16), "No. KK harus 16 digit angka!"),
    rule(Field::Nokk, Check::Digits, "No. KK harus angka!"),
];

/// Rules shared by both modes; every column is mandatory in the schema.
pub const REQUIRED_RULES: &[Rule] = &[
    rule(Field::Nama, Check::Required, "Nama wajib diisi!"),
    rule(Field::Jk, Check::Required, "Jenis kelamin wajib diisi!"),
    rule(Field::Tingkat, Check::Required, "Tingkat wajib diisi!"),
    rule(Field::Rombel, Check::Required, "Rombel wajib diisi!"),
    rule(Field::Terdaftar, Check::Required, "Status terdaftar wajib diisi!"),
    rule(Field::Ttl, Check::Required, "Tempat, tanggal lahir wajib diisi!"),
    rule(Field::TglMasuk, Check::Date, "Tanggal masuk tidak valid!"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update,
}

impl Mode {
    pub fn rules(self) -> impl Iterator<Item = &'static Rule> {
        let specific = match self {
            Mode::Create => CREATE_RULES,
            Mode::Update => UPDATE_RULES,
        };
        specific.iter().chain(REQUIRED_RULES.iter())
    }

    /// Message for a write the store rejected on a unique constraint.
    pub fn conflict_message(self, field: UniqueField) -> &'static str {
        match (self, field) {
            (Mode::Create, UniqueField::Nik) => "NIK sudah terdaftar!",
            (Mode::Create, UniqueField::Nisn) => "NISN sudah terdaftar!",
            (Mode::Update, UniqueField::Nik) => "NIK sudah digunakan!",
            (Mode::Update, UniqueField::Nisn) => "NISN sudah digunakan!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: &'static str,
}

/// A rejected form: the submitted values plus every failed rule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Submission {
    pub form: SiswaForm,
    pub errors: Vec<FieldError>,
}

impl Submission {
    pub fn new(form: SiswaForm) -> Self {
        Self {
            form,
            errors: Vec::new(),
        }
    }

    /// Rebuilds a submission for a write that lost a uniqueness race.
    pub fn conflict(form: SiswaForm, mode: Mode, field: UniqueField) -> Self {
        Self {
            form,
            errors: vec![FieldError {
                field: field.into(),
                message: mode.conflict_message(field),
            }],
        }
    }

    pub fn messages(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.errors.iter().map(|err| err.message)
    }

    pub fn has_error(&self, field: Field) -> bool {
        self.errors.iter().any(|err| err.field == field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Valid(NewSiswa),
    Invalid(Submission),
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

async fn passes(store: &dyn Store, check: Check, value: &str, form: &SiswaForm) -> StoreResult<bool> {
    let ok = match check {
        Check::Required => !value.trim().is_empty(),
        Check::Length(len) => value.chars().count() == len,
        Check::Digits => !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()),
        Check::Date => parse_date(value).is_some(),
        Check::Unique(field) => store.find_siswa(field, value).await?.is_none(),
        Check::UniqueExceptPrevious(field) => {
            value == form.old_nisn || store.find_siswa(field, value).await?.is_none()
        }
    };
    Ok(ok)
}

/// Runs every rule of `mode` against `form`.
pub async fn validate(store: &dyn Store, mode: Mode, form: SiswaForm) -> StoreResult<Outcome> {
    let mut submission = Submission::new(form);
    for rule in mode.rules() {
        let value = rule.field.value(&submission.form);
        if !passes(store, rule.check, value, &submission.form).await? {
            submission.errors.push(FieldError {
                field: rule.field,
                message: rule.message,
            });
        }
    }

    let tgl_masuk = match parse_date(&submission.form.tgl_masuk) {
        Some(date) if submission.errors.is_empty() => date,
        _ => return Ok(Outcome::Invalid(submission)),
    };
    let form = submission.form;
    Ok(Outcome::Valid(NewSiswa {
        nama: form.nama,
        jk: form.jk,
        nisn: form.nisn,
        nik: form.nik,
        nokk: form.nokk,
        tingkat: form.tingkat,
        rombel: form.rombel,
        terdaftar: form.terdaftar,
        ttl: form.ttl,
        tgl_masuk,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn form(nisn: &str, nik: &str, nokk: &str) -> SiswaForm {
        SiswaForm {
            nama: "Siti Aminah".to_string(),
            jk: "P".to_string(),
            nisn: nisn.to_string(),
            nik: nik.to_string(),
            nokk: nokk.to_string(),
            tingkat: "8".to_string(),
            rombel: "8B".to_string(),
            terdaftar: "Siswa Baru".to_string(),
            ttl: "Depok, 2 Maret 2011".to_string(),
            tgl_masuk: "2023-07-17".to_string(),
            old_nisn: String::new(),
        }
    }

    async fn seeded(forms: &[SiswaForm]) -> MemoryStore {
        let store = MemoryStore::new();
        for f in forms {
            match validate(&store, Mode::Create, f.clone()).await.unwrap() {
                Outcome::Valid(siswa) => {
                    store.insert_siswa(siswa).await.unwrap();
                }
                Outcome::Invalid(sub) => panic!("seed rejected: {:?}", sub.errors),
            }
        }
        store
    }

    fn messages(outcome: Outcome) -> Vec<&'static str> {
        match outcome {
            Outcome::Invalid(sub) => sub.messages().collect(),
            Outcome::Valid(siswa) => panic!("expected rejection, got {:?}", siswa),
        }
    }

    #[tokio::test]
    async fn create_accepts_well_formed_record() {
        let store = MemoryStore::new();
        let outcome = validate(&store, Mode::Create, form("12345678", "1234567890123456", "1234567890123456"))
            .await
            .unwrap();
        match outcome {
            Outcome::Valid(siswa) => {
                assert_eq!(siswa.nisn, "12345678");
                assert_eq!(siswa.tgl_masuk, NaiveDate::from_ymd_opt(2023, 7, 17).unwrap());
            }
            Outcome::Invalid(sub) => panic!("unexpected errors {:?}", sub.errors),
        }
    }

    #[tokio::test]
    async fn create_rejects_wrong_nisn_length() {
        let store = MemoryStore::new();
        for nisn in ["", "1234567", "123456789"] {
            let outcome = validate(&store, Mode::Create, form(nisn, "1234567890123456", "1234567890123456"))
                .await
                .unwrap();
            assert_eq!(messages(outcome), vec!["NISN wajib 8 digit angka!"]);
        }
    }

    #[tokio::test]
    async fn create_reports_duplicates() {
        let store = seeded(&[form("12345678", "1234567890123456", "1234567890123456")]).await;
        let outcome = validate(&store, Mode::Create, form("12345678", "1234567890123456", "1234567890123456"))
            .await
            .unwrap();
        assert_eq!(messages(outcome), vec!["NISN sudah terdaftar!", "NIK sudah terdaftar!"]);
    }

    #[tokio::test]
    async fn create_collects_every_failure() {
        let store = MemoryStore::new();
        let mut bad = form("123", "456", "789");
        bad.nama = "   ".to_string();
        bad.tgl_masuk = "17/07/2023".to_string();
        let outcome = validate(&store, Mode::Create, bad.clone()).await.unwrap();
        let sub = match outcome {
            Outcome::Invalid(sub) => sub,
            Outcome::Valid(_) => panic!("expected rejection"),
        };
        assert_eq!(
            sub.messages().collect::<Vec<_>>(),
            vec![
                "NISN wajib 8 digit angka!",
                "NIK wajib 16 digit angka!",
                "No. KK harus 16 digit angka!",
                "Nama wajib diisi!",
                "Tanggal masuk tidak valid!",
            ]
        );
        assert_eq!(sub.form, bad);
        assert!(sub.has_error(Field::Nokk));
        assert!(!sub.has_error(Field::Rombel));
    }

    #[tokio::test]
    async fn create_does_not_require_numeric_nisn_or_nik() {
        let store = MemoryStore::new();
        let outcome = validate(&store, Mode::Create, form("abcdefgh", "abcdefghijklmnop", "abcdefghijklmnop"))
            .await
            .unwrap();
        assert!(matches!(outcome, Outcome::Valid(_)));
    }

    #[tokio::test]
    async fn update_exempts_the_edited_record() {
        let store = seeded(&[form("12345678", "1234567890123456", "1234567890123456")]).await;
        let mut edit = form("12345678", "1234567890123456", "1234567890123456");
        edit.old_nisn = "12345678".to_string();
        let outcome = validate(&store, Mode::Update, edit).await.unwrap();
        assert!(matches!(outcome, Outcome::Valid(_)));
    }

    #[tokio::test]
    async fn update_rejects_nisn_of_another_record() {
        let store = seeded(&[
            form("11111111", "1111111111111111", "1111111111111111"),
            form("22222222", "2222222222222222", "2222222222222222"),
        ])
        .await;
        let mut edit = form("22222222", "1111111111111111", "1111111111111111");
        edit.old_nisn = "11111111".to_string();
        let outcome = validate(&store, Mode::Update, edit).await.unwrap();
        assert_eq!(messages(outcome), vec!["NISN sudah digunakan!"]);
    }

    #[tokio::test]
    async fn update_checks_nokk_length_and_digits() {
        let store = seeded(&[form("12345678", "1234567890123456", "1234567890123456")]).await;

        let mut letters = form("12345678", "1234567890123456", "12345678901234AB");
        letters.old_nisn = "12345678".to_string();
        let outcome = validate(&store, Mode::Update, letters).await.unwrap();
        assert_eq!(messages(outcome), vec!["No. KK harus angka!"]);

        let mut short = form("12345678", "1234567890123456", "123456");
        short.old_nisn = "12345678".to_string();
        let outcome = validate(&store, Mode::Update, short).await.unwrap();
        assert_eq!(messages(outcome), vec!["No. KK harus 16 digit angka!"]);

        let mut both = form("12345678", "1234567890123456", "12-34");
        both.old_nisn = "12345678".to_string();
        let outcome = validate(&store, Mode::Update, both).await.unwrap();
        assert_eq!(
            messages(outcome),
            vec!["No. KK harus 16 digit angka!", "No. KK harus angka!"]
        );
    }

    #[test]
    fn conflicts_use_the_mode_wording() {
        let sub = Submission::conflict(SiswaForm::default(), Mode::Update, UniqueField::Nik);
        assert_eq!(sub.messages().collect::<Vec<_>>(), vec!["NIK sudah digunakan!"]);
        assert!(sub.has_error(Field::Nik));
        assert_eq!(Mode::Create.conflict_message(UniqueField::Nisn), "NISN sudah terdaftar!");
    }

    #[test]
    fn form_echoes_stored_record() {
        let siswa = NewSiswa {
            nama: "Budi".to_string(),
            jk: "L".to_string(),
            nisn: "12345678".to_string(),
            nik: "1234567890123456".to_string(),
            nokk: "1234567890123456".to_string(),
            tingkat: "7".to_string(),
            rombel: "7A".to_string(),
            terdaftar: "Pindahan".to_string(),
            ttl: "Bogor".to_string(),
            tgl_masuk: NaiveDate::from_ymd_opt(2022, 1, 3).unwrap(),
        }
        .into_record();
        let form = SiswaForm::from(&siswa);
        assert_eq!(form.tgl_masuk, "2022-01-03");
        assert_eq!(form.old_nisn, "12345678");
    }
}
