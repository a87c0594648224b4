use async_trait::async_trait;
use axum::extract::{Form, FromRequest, RequestParts};
use axum::headers::{Cookie, HeaderMapExt};
use axum::http::header::SET_COOKIE;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Extension;
use chrono::Utc;
use pbkdf2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use pbkdf2::Pbkdf2;
use rand_core::OsRng;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::{Principal, UserAccount};
use crate::session::{AuthResult, SessionStore, SESSION_COOKIE};
use crate::store::{Store, StoreError};
use crate::{renders, views, Error, Page, SharedState};

pub const INVALID_CREDENTIALS: &str = "Username atau password salah!";

#[derive(Debug, Clone, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .typed_get::<Cookie>()
        .and_then(|cookie| cookie.get(SESSION_COOKIE).map(str::to_string))
        .filter(|ssid| !ssid.is_empty())
}

fn shared_state<B: Send>(req: &RequestParts<B>) -> Result<SharedState, Error> {
    req.extensions()
        .get::<SharedState>()
        .cloned()
        .ok_or(Error::InternalError {
            kind: "StateError",
            message: "application state is not installed".to_string(),
        })
}

/// The session cookie of the request, whether or not it names a live session.
pub struct SessionCookie(pub Option<String>);

#[async_trait]
impl<B: Send> FromRequest<B> for SessionCookie {
    type Rejection = std::convert::Infallible;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        Ok(SessionCookie(session_id(req.headers())))
    }
}

/// Gate for every page behind the login. Rejects with
/// [`Error::Unauthenticated`], which redirects to `/login`.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub ssid: String,
    pub user: Principal,
}

#[async_trait]
impl<B: Send> FromRequest<B> for Authenticated {
    type Rejection = Error;

    async fn from_request(req: &mut RequestParts<B>) -> Result<Self, Self::Rejection> {
        let state = shared_state(req)?;
        let ssid = session_id(req.headers()).ok_or(Error::Unauthenticated)?;

        match state.sessions.authenticate(&ssid).await {
            (AuthResult::Success, Some(user)) => Ok(Authenticated { ssid, user }),
            (result, _) => {
                log::debug!("Rejected request to {}: {:?}", req.uri().path(), result);
                Err(Error::Unauthenticated)
            }
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, Error> {
    Ok(Pbkdf2
        .hash_password(password.as_bytes(), &SaltString::generate(&mut OsRng))?
        .to_string())
}

/// Looks up `username` and checks `password` against its stored hash.
pub async fn verify_credentials(
    store: &dyn Store,
    username: &str,
    password: &str,
) -> Result<UserAccount, Error> {
    if username.is_empty() || password.is_empty() {
        return Err(Error::InvalidCredentials);
    }

    let user = store
        .find_user(username)
        .await?
        .ok_or(Error::InvalidCredentials)?;
    let hash = PasswordHash::new(&user.password_hash)?;
    let matches = Pbkdf2.verify_password(password.as_bytes(), &hash).is_ok();
    if !matches {
        return Err(Error::InvalidCredentials);
    }
    Ok(user)
}

/// Seeds the administrator account unless an account already exists.
/// Returns `true` when an account was created.
pub async fn bootstrap(store: &dyn Store, username: &str, password: &str) -> Result<bool, Error> {
    if store.count_users().await? > 0 {
        log::info!("User accounts present, skipping administrator bootstrap");
        return Ok(false);
    }

    let admin = UserAccount {
        uuid: Uuid::new_v4(),
        username: username.to_string(),
        password_hash: hash_password(password)?,
        created_at: Utc::now(),
    };
    match store.insert_user(admin).await {
        Ok(()) => {
            log::info!("Created administrator account `{}`", username);
            Ok(true)
        }
        // another instance seeded it first
        Err(StoreError::DuplicateUser) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

pub async fn login_form(
    Extension(state): Extension<SharedState>,
    SessionCookie(ssid): SessionCookie,
) -> Page {
    let flash = match ssid {
        Some(ssid) => state.sessions.take_flash(&ssid).await,
        None => Vec::new(),
    };
    renders(views::login_page(&flash))
}

pub async fn login(
    Extension(state): Extension<SharedState>,
    SessionCookie(ssid): SessionCookie,
    Form(login): Form<LoginForm>,
) -> Page {
    match verify_credentials(state.store.as_ref(), &login.username, &login.password).await {
        Ok(user) => {
            if let Some(old) = ssid {
                state.sessions.destroy(&old).await;
            }
            let fresh = state.sessions.open(Some(Principal::from(&user))).await;
            log::info!("User `{}` logged in", user.username);
            Ok(([(SET_COOKIE, state.sessions.cookie(&fresh))], Redirect::to("/")).into_response())
        }
        Err(Error::InvalidCredentials) => {
            log::warn!("Failed login attempt for `{}`", login.username);
            let live = match &ssid {
                Some(ssid) => state.sessions.is_live(ssid).await,
                None => false,
            };
            match ssid {
                Some(ssid) if live => {
                    state.sessions.push_flash(&ssid, INVALID_CREDENTIALS).await;
                    Ok(Redirect::to("/login").into_response())
                }
                _ => {
                    let anon = state.sessions.open(None).await;
                    state.sessions.push_flash(&anon, INVALID_CREDENTIALS).await;
                    let cookie = state.sessions.cookie(&anon);
                    Ok(([(SET_COOKIE, cookie)], Redirect::to("/login")).into_response())
                }
            }
        }
        Err(err) => Err(err),
    }
}

pub async fn logout(
    Extension(state): Extension<SharedState>,
    SessionCookie(ssid): SessionCookie,
) -> Response {
    if let Some(ssid) = ssid {
        state.sessions.destroy(&ssid).await;
    }
    ([(SET_COOKIE, SessionStore::clear_cookie())], Redirect::to("/login")).into_response()
}
