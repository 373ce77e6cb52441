//! Preferred-language hint extraction from request headers.
//!
//! Priority:
//! 1. locale cookie (the client's last explicit choice)
//! 2. explicit locale header set by an upstream proxy
//! 3. `Accept-Language`, highest quality first, matching the primary subtag
//!
//! The first candidate that names a supported locale wins. Unsupported values
//! are skipped, never guessed at.

use axum::http::{HeaderMap, header};

use super::{Locale, LocaleSet};

/// Names of the cookie and header that carry an explicit locale choice.
#[derive(Debug, Clone)]
pub struct HintSources {
    pub cookie: String,
    pub header: String,
}

impl HintSources {
    pub fn hint<'a>(&self, headers: &HeaderMap, locales: &'a LocaleSet) -> Option<&'a Locale> {
        if let Some(locale) = cookie_value(headers, &self.cookie).and_then(|v| locales.get(v)) {
            return Some(locale);
        }

        if let Some(locale) = headers
            .get(self.header.as_str())
            .and_then(|v| v.to_str().ok())
            .and_then(|v| locales.get(v.trim()))
        {
            return Some(locale);
        }

        headers
            .get_all(header::ACCEPT_LANGUAGE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| from_accept_language(v, locales))
    }
}

/// Value of cookie `name` across all `Cookie` headers.
pub fn cookie_value<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (k, v) = pair.trim().split_once('=')?;
            (k.trim() == name).then(|| v.trim())
        })
}

/// Best supported locale named by an `Accept-Language` value.
///
/// Entries are ranked by `q` (missing = 1.0, stable for ties); `q=0` entries
/// are ignored. `zh-CN` matches a supported `zh`.
pub fn from_accept_language<'a>(value: &str, locales: &'a LocaleSet) -> Option<&'a Locale> {
    let mut ranked: Vec<(&str, f32)> = value
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.split(';');
            let tag = parts.next()?.trim();
            if tag.is_empty() || tag == "*" {
                return None;
            }
            let q = parts
                .filter_map(|p| p.trim().strip_prefix("q="))
                .find_map(|q| q.parse::<f32>().ok())
                .unwrap_or(1.0);
            (q > 0.0).then_some((tag, q))
        })
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    ranked.into_iter().find_map(|(tag, _)| {
        locales.get(tag).or_else(|| {
            let primary = tag.split(['-', '_']).next()?.to_ascii_lowercase();
            locales.get(&primary)
        })
    })
}
