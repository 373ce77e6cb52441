//! Translation bundles.
//!
//! One JSON file per declared locale (`{messages_dir}/{locale}.json`), nested
//! objects of strings:
//!
//! ```json
//! { "home": { "title": "Welcome", "welcomeUser": "Hello, {username}" } }
//! ```
//!
//! Keys are addressed with dot notation (`home.welcomeUser`). Every declared
//! locale must have a bundle; a missing or malformed bundle is a fatal config
//! error raised at [`Catalog::load`], never a per-request fallback.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use super::{Locale, LocaleSet};
use crate::error::AppError;

// ── Messages ──────────────────────────────────────────────────────────────────

/// Messages for one locale.
#[derive(Debug, Clone)]
pub struct Messages {
    /// Nested form, shipped as-is to page renderers.
    raw: Value,
    /// Dot-keyed leaves for lookups.
    flat: HashMap<String, String>,
}

impl Messages {
    pub fn from_json(raw: Value) -> Result<Self, String> {
        if !raw.is_object() {
            return Err("bundle root must be a JSON object".into());
        }
        let mut flat = HashMap::new();
        flatten("", &raw, &mut flat)?;
        Ok(Self { raw, flat })
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.flat.get(key).map(String::as_str)
    }

    /// Translated string, or the key itself when absent.
    pub fn t(&self, key: &str) -> String {
        self.get(key).unwrap_or(key).to_string()
    }

    /// Translated string with `{name}` placeholders replaced.
    pub fn t_fmt(&self, key: &str, args: &[(&str, &str)]) -> String {
        let mut text = self.t(key);
        for (name, value) in args {
            text = text.replace(&format!("{{{name}}}"), value);
        }
        text
    }

    pub fn len(&self) -> usize {
        self.flat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flat.is_empty()
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut HashMap<String, String>) -> Result<(), String> {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                let key = if prefix.is_empty() { k.clone() } else { format!("{prefix}.{k}") };
                flatten(&key, v, out)?;
            }
            Ok(())
        }
        Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
            Ok(())
        }
        other => Err(format!("unsupported value at '{prefix}': expected string or object, got {other}")),
    }
}

// ── Catalog ───────────────────────────────────────────────────────────────────

/// All bundles, keyed by locale. Built once at startup.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    bundles: HashMap<Locale, Arc<Messages>>,
}

impl Catalog {
    /// Load `{dir}/{locale}.json` for every locale in `locales`.
    pub fn load(dir: &Path, locales: &LocaleSet) -> Result<Self, AppError> {
        let mut bundles = HashMap::new();
        for locale in locales.iter() {
            let path = dir.join(format!("{locale}.json"));
            let text = fs::read_to_string(&path).map_err(|e| {
                AppError::Config(format!(
                    "missing translation bundle for '{locale}' at {}: {e}",
                    path.display()
                ))
            })?;
            let raw: Value = serde_json::from_str(&text)
                .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;
            let messages = Messages::from_json(raw)
                .map_err(|e| AppError::Config(format!("invalid bundle {}: {e}", path.display())))?;
            debug!(%locale, keys = messages.len(), "translation bundle loaded");
            bundles.insert(locale.clone(), Arc::new(messages));
        }
        info!(dir = %dir.display(), locales = bundles.len(), "translation catalog ready");
        Ok(Self { bundles })
    }

    /// Build from in-memory bundles.
    pub fn from_bundles(bundles: impl IntoIterator<Item = (Locale, Messages)>) -> Self {
        Self {
            bundles: bundles.into_iter().map(|(l, m)| (l, Arc::new(m))).collect(),
        }
    }

    /// Bundle for `locale`. A miss means the catalog was built for a
    /// different locale set, which is a configuration error.
    pub fn messages(&self, locale: &Locale) -> Result<Arc<Messages>, AppError> {
        self.bundles
            .get(locale)
            .cloned()
            .ok_or_else(|| AppError::Config(format!("no translation bundle for locale '{locale}'")))
    }
}
