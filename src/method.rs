//! HTML forms can only `GET` or `POST`. A `POST` whose query string carries
//! `_method=PUT` or `_method=DELETE` is rewritten to that method before it
//! reaches the router.

use axum::http::{Method, Request};
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct MethodOverride {
    #[serde(rename = "_method")]
    method: Option<String>,
}

/// Decodes the query the same way `Form` decodes bodies, so percent-escapes
/// and `+` are honoured.
fn requested_method(query: &str) -> Option<Method> {
    let parsed: MethodOverride = serde_urlencoded::from_str(query).ok()?;
    match parsed.method?.to_ascii_uppercase().as_str() {
        "PUT" => Some(Method::PUT),
        "DELETE" => Some(Method::DELETE),
        _ => None,
    }
}

pub fn override_method<B>(mut req: Request<B>) -> Request<B> {
    if req.method() != Method::POST {
        return req;
    }
    if let Some(method) = req.uri().query().and_then(requested_method) {
        log::trace!("Overriding POST {} as {}", req.uri().path(), method);
        *req.method_mut() = method;
    }
    req
}
