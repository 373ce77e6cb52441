//! Page context handler.
//!
//! Renderers are external; the gateway hands them everything a page needs
//! to draw itself in the resolved locale: the bundle, the locale-free path,
//! and links to the same page in every other locale.

use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use super::{GatewayState, json_error};
use crate::locale::Locale;

#[derive(Debug, Serialize)]
struct PageContext<'a> {
    locale: &'a Locale,
    default_locale: &'a Locale,
    /// Path with the locale segment removed; always starts with `/`.
    path: &'a str,
    messages: &'a Value,
    alternates: Vec<Alternate<'a>>,
}

/// Language switcher entry.
#[derive(Debug, Serialize)]
struct Alternate<'a> {
    locale: &'a Locale,
    href: String,
    is_default: bool,
}

/// GET /{locale} and /{locale}/{*rest}
///
/// The locale comes from the gate. Excluded paths skip the gate and land
/// here without one; those are not pages.
pub(super) async fn page(State(state): State<GatewayState>, req: Request) -> Response {
    let Some(locale) = req.extensions().get::<Locale>().cloned() else {
        return super::not_found().await;
    };
    let uri = req.uri();

    let messages = match state.catalog.messages(&locale) {
        Ok(messages) => messages,
        Err(e) => {
            error!(%locale, "{e}");
            return (StatusCode::INTERNAL_SERVER_ERROR, json_error("config", e)).into_response();
        }
    };

    let resolver = &state.resolver;
    let locales = resolver.locales();
    let (_, rest) = resolver.strip_locale(uri.path());

    let alternates = locales
        .landing_order()
        .into_iter()
        .map(|alt| Alternate {
            locale: alt,
            href: resolver.switch_locale(uri.path(), alt),
            is_default: locales.is_default(alt),
        })
        .collect();

    let ctx = PageContext {
        locale: &locale,
        default_locale: locales.default_locale(),
        path: rest,
        messages: messages.raw(),
        alternates,
    };
    (StatusCode::OK, Json(ctx)).into_response()
}
