//! Supported locales: the fixed ordered set of language tags the gateway
//! serves, with exactly one default.
//!
//! The set is built once from config at startup and never mutated.
//! [`resolve`] decides which locale applies to a request path, [`hint`]
//! extracts the client's preferred language and [`messages`] holds the
//! translation bundles keyed by locale.

pub mod hint;
pub mod messages;
pub mod resolve;

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::error::AppError;

// ── Locale ────────────────────────────────────────────────────────────────────

/// A supported language tag such as `"en"` or `"zh"`.
///
/// Only [`LocaleSet`] hands these out, so holding a `Locale` means the tag
/// was declared in config. Cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locale(Arc<str>);

impl Locale {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Locale {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

// ── LocaleSet ─────────────────────────────────────────────────────────────────

/// Ordered set of supported locales with one designated default.
#[derive(Debug, Clone)]
pub struct LocaleSet {
    locales: Vec<Locale>,
    default_index: usize,
}

impl LocaleSet {
    /// Build the set from declared tags (in order) and the default tag.
    ///
    /// Fails when the list is empty, a tag is blank or contains `/`, a tag is
    /// declared twice, or the default is not one of the declared tags.
    pub fn new<I, T>(tags: I, default: &str) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut locales: Vec<Locale> = Vec::new();
        for tag in tags {
            let tag = tag.as_ref().trim();
            if tag.is_empty() || tag.contains('/') {
                return Err(AppError::Config(format!("invalid locale tag '{tag}'")));
            }
            if locales.iter().any(|l| l.as_str() == tag) {
                return Err(AppError::Config(format!("locale '{tag}' declared twice")));
            }
            locales.push(Locale(Arc::from(tag)));
        }

        if locales.is_empty() {
            return Err(AppError::Config("no supported locales declared".into()));
        }

        let default_index = locales
            .iter()
            .position(|l| l.as_str() == default)
            .ok_or_else(|| {
                AppError::Config(format!(
                    "default locale '{default}' is not among supported locales"
                ))
            })?;

        Ok(Self { locales, default_index })
    }

    /// Exact, case-sensitive lookup.
    pub fn get(&self, tag: &str) -> Option<&Locale> {
        self.locales.iter().find(|l| l.as_str() == tag)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.get(tag).is_some()
    }

    pub fn default_locale(&self) -> &Locale {
        &self.locales[self.default_index]
    }

    pub fn is_default(&self, locale: &Locale) -> bool {
        locale == self.default_locale()
    }

    /// Declared order.
    pub fn iter(&self) -> impl Iterator<Item = &Locale> {
        self.locales.iter()
    }

    /// Order used for language pickers: default first, then the rest in
    /// declared order.
    pub fn landing_order(&self) -> Vec<&Locale> {
        let default = self.default_locale();
        std::iter::once(default)
            .chain(self.locales.iter().filter(|l| *l != default))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.locales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locales.is_empty()
    }
}
