//! HTTP gateway: every page request passes the locale gate before a handler
//! sees it.
//!
//! ## URL layout
//!
//! ```text
//! GET  /favicon.ico            → 204
//! ANY  /api/{*path}            → auth backend (pass-through)
//! GET  /{locale}               → page context
//! GET  /{locale}/              → page context (same as /{locale})
//! GET  /{locale}/{*rest}       → page context
//! GET  /anything-else          → 307 to /{hint-or-default}/anything-else
//! GET  /fr/...                 → 404 (unsupported explicit locale)
//! ```

mod pages;
mod proxy;

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::{any, get},
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::AppError;
use crate::locale::hint::{HintSources, cookie_value};
use crate::locale::messages::Catalog;
use crate::locale::resolve::{LocaleResolver, RouteOutcome};

pub use proxy::Upstream;

// ── Shared request state ──────────────────────────────────────────────────────

/// Cheap to clone: all fields are reference-counted.
#[derive(Clone)]
pub struct GatewayState {
    pub resolver: Arc<LocaleResolver>,
    pub catalog: Arc<Catalog>,
    pub hints: Arc<HintSources>,
    pub upstream: Upstream,
}

impl GatewayState {
    /// Build from resolved config. The catalog must already be loaded so a
    /// missing bundle fails startup rather than a request.
    pub fn from_config(config: &Config, catalog: Catalog) -> Result<Self, AppError> {
        Ok(Self {
            resolver: Arc::new(LocaleResolver::new(
                config.locales.set.clone(),
                &config.excluded,
            )),
            catalog: Arc::new(catalog),
            hints: Arc::new(HintSources {
                cookie: config.locales.cookie.clone(),
                header: config.locales.header.clone(),
            }),
            upstream: Upstream::new(&config.auth.api_base_url, config.auth.timeout_seconds)?,
        })
    }
}

// ── Server loop ───────────────────────────────────────────────────────────────

pub async fn serve(
    bind_addr: &str,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let router = build_router(state);

    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| AppError::Server(format!("bind failed on {bind_addr}: {e}")))?;

    info!(%bind_addr, "gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Server(format!("server error: {e}")))?;

    info!("gateway shut down");
    Ok(())
}

// ── Router ────────────────────────────────────────────────────────────────────

pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .route("/favicon.ico",        get(|| async { StatusCode::NO_CONTENT }))
        .route("/api/{*path}",        any(proxy::forward))
        .route("/{locale}",           get(pages::page))
        .route("/{locale}/",          get(pages::page))
        .route("/{locale}/{*rest}",   get(pages::page))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), locale_gate))
        .with_state(state)
}

/// Canonicalise the path before routing.
///
/// Excluded paths pass through untouched. Everything else either carries a
/// supported locale (tagged on the request, remembered in the cookie), gets
/// redirected to one, or is a 404.
async fn locale_gate(State(state): State<GatewayState>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();
    let hint = state.hints.hint(req.headers(), state.resolver.locales());

    match state.resolver.resolve(&path, hint.map(|l| l.as_str())) {
        RouteOutcome::Excluded => next.run(req).await,
        RouteOutcome::NotFound { segment } => {
            debug!(%path, %segment, "unsupported locale segment");
            (
                StatusCode::NOT_FOUND,
                json_error("not_found", format!("unsupported locale '{segment}'")),
            )
                .into_response()
        }
        RouteOutcome::Localized(resolution) if resolution.redirect => {
            let target = match req.uri().query() {
                Some(query) => format!("{}?{query}", resolution.canonical_path),
                None => resolution.canonical_path,
            };
            debug!(%path, %target, locale = %resolution.locale, "redirecting to canonical path");
            Redirect::temporary(&target).into_response()
        }
        RouteOutcome::Localized(resolution) => {
            let locale = resolution.locale;
            let remembered = cookie_value(req.headers(), &state.hints.cookie)
                .is_some_and(|v| v == locale.as_str());
            req.extensions_mut().insert(locale.clone());

            let mut response = next.run(req).await;
            if !remembered {
                let cookie = format!("{}={locale}; Path=/; SameSite=Lax", state.hints.cookie);
                if let Ok(value) = HeaderValue::from_str(&cookie) {
                    response.headers_mut().append(header::SET_COOKIE, value);
                }
            }
            response
        }
    }
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, json_error("not_found", "no such page")).into_response()
}

/// Build a JSON error response body.
pub(crate) fn json_error(code: &str, msg: impl std::fmt::Display) -> Json<serde_json::Value> {
    Json(json!({ "error": code, "message": format!("{msg}") }))
}
