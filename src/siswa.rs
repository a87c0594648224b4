use axum::extract::{Form, Path};
use axum::Extension;
use serde::Deserialize;

use crate::auth::Authenticated;
use crate::store::{StoreError, UniqueField};
use crate::validation::{self, Mode, Outcome, SiswaForm, Submission};
use crate::{redirects, renders, views, Error, Page, SharedState};

pub const CREATED: &str = "Data siswa berhasil ditambahkan!";
pub const UPDATED: &str = "Data siswa berhasil diubah!";
pub const DELETED: &str = "Data siswa berhasil dihapus!";

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteSiswa {
    #[serde(default)]
    pub nisn: String,
}

pub async fn list_siswa(
    Extension(state): Extension<SharedState>,
    auth: Authenticated,
) -> Page {
    let records = state.store.list_siswa().await?;
    let flash = state.sessions.take_flash(&auth.ssid).await;
    renders(views::siswa_list(&auth.user.username, &records, &flash))
}

pub async fn add_form(auth: Authenticated) -> Page {
    renders(views::add_form(&auth.user.username, &Submission::default()))
}

pub async fn create_siswa(
    Extension(state): Extension<SharedState>,
    auth: Authenticated,
    Form(form): Form<SiswaForm>,
) -> Page {
    let siswa = match validation::validate(state.store.as_ref(), Mode::Create, form.clone()).await? {
        Outcome::Valid(siswa) => siswa,
        Outcome::Invalid(submission) => {
            return renders(views::add_form(&auth.user.username, &submission));
        }
    };

    match state.store.insert_siswa(siswa).await {
        Ok(created) => {
            log::info!("`{}` added siswa {}", auth.user.username, created.nisn);
            state.sessions.push_flash(&auth.ssid, CREATED).await;
            redirects("/siswa")
        }
        Err(StoreError::Conflict(field)) => {
            let submission = Submission::conflict(form, Mode::Create, field);
            renders(views::add_form(&auth.user.username, &submission))
        }
        Err(err) => Err(err.into()),
    }
}

pub async fn edit_form(
    Extension(state): Extension<SharedState>,
    auth: Authenticated,
    Path(nisn): Path<String>,
) -> Page {
    let siswa = state
        .store
        .find_siswa(UniqueField::Nisn, &nisn)
        .await?
        .ok_or_else(|| Error::not_found(format!("Siswa dengan NISN {} tidak ditemukan", nisn)))?;

    let submission = Submission::new(SiswaForm::from(&siswa));
    renders(views::edit_form(&auth.user.username, &submission))
}

pub async fn update_siswa(
    Extension(state): Extension<SharedState>,
    auth: Authenticated,
    Form(form): Form<SiswaForm>,
) -> Page {
    let siswa = match validation::validate(state.store.as_ref(), Mode::Update, form.clone()).await? {
        Outcome::Valid(siswa) => siswa,
        Outcome::Invalid(submission) => {
            return renders(views::edit_form(&auth.user.username, &submission));
        }
    };

    match state.store.update_siswa(&form.old_nisn, siswa).await {
        Ok(true) => {
            log::info!("`{}` updated siswa {} -> {}", auth.user.username, form.old_nisn, form.nisn);
            state.sessions.push_flash(&auth.ssid, UPDATED).await;
            redirects("/siswa")
        }
        Ok(false) => Err(Error::not_found(format!(
            "Siswa dengan NISN {} tidak ditemukan",
            form.old_nisn
        ))),
        Err(StoreError::Conflict(field)) => {
            let submission = Submission::conflict(form, Mode::Update, field);
            renders(views::edit_form(&auth.user.username, &submission))
        }
        Err(err) => Err(err.into()),
    }
}

/// Deleting an unknown NISN is not an error.
pub async fn delete_siswa(
    Extension(state): Extension<SharedState>,
    auth: Authenticated,
    Form(DeleteSiswa { nisn }): Form<DeleteSiswa>,
) -> Page {
    if state.store.delete_siswa(&nisn).await? {
        log::info!("`{}` deleted siswa {}", auth.user.username, nisn);
    }
    state.sessions.push_flash(&auth.ssid, DELETED).await;
    redirects("/siswa")
}
