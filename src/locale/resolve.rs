//! Locale resolution for request paths.
//!
//! Every page path must carry a supported locale as its first segment.
//! [`LocaleResolver::resolve`] decides, in order:
//!
//! 1. leading segment is a supported locale → serve as-is;
//! 2. leading segment *looks like* a language tag but is not supported → not found;
//! 3. otherwise → redirect to the same path prefixed with the hint locale when
//!    it is supported, else the default locale.
//!
//! Paths under an excluded prefix (API routes, framework assets, favicon) are
//! never rewritten. Resolution is pure: no shared state is touched.

use super::{Locale, LocaleSet};

// ── Outcome types ─────────────────────────────────────────────────────────────

/// Result of resolving a path that belongs to the localized page space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub locale: Locale,
    /// Path guaranteed to start with `/{locale}`.
    pub canonical_path: String,
    /// `true` when the request must be redirected to `canonical_path`.
    pub redirect: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Localized(Resolution),
    /// Infrastructure path that bypasses locale handling.
    Excluded,
    /// The path names an unsupported locale explicitly.
    NotFound { segment: String },
}

// ── Resolver ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LocaleResolver {
    locales: LocaleSet,
    /// Excluded prefixes, stored without leading/trailing slashes.
    excluded: Vec<String>,
}

impl LocaleResolver {
    pub fn new<I, T>(locales: LocaleSet, excluded: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let excluded = excluded
            .into_iter()
            .map(|p| p.as_ref().trim_matches('/').to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Self { locales, excluded }
    }

    pub fn locales(&self) -> &LocaleSet {
        &self.locales
    }

    /// `true` if `path` is, or lies under, one of the excluded prefixes.
    ///
    /// Matching is segment-aware: `api` excludes `/api` and `/api/auth/login`
    /// but not `/apiary`.
    pub fn is_excluded(&self, path: &str) -> bool {
        let trimmed = path.trim_start_matches('/');
        self.excluded.iter().any(|prefix| {
            trimmed
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }

    pub fn resolve(&self, path: &str, hint: Option<&str>) -> RouteOutcome {
        let path = normalize(path);

        if self.is_excluded(&path) {
            return RouteOutcome::Excluded;
        }

        let first = leading_segment(&path);
        if let Some(locale) = self.locales.get(first) {
            return RouteOutcome::Localized(Resolution {
                locale: locale.clone(),
                canonical_path: path,
                redirect: false,
            });
        }

        if looks_like_language_tag(first) {
            return RouteOutcome::NotFound { segment: first.to_string() };
        }

        let locale = hint
            .and_then(|h| self.locales.get(h))
            .unwrap_or_else(|| self.locales.default_locale())
            .clone();
        let canonical_path = prefixed(&locale, &path);

        RouteOutcome::Localized(Resolution { locale, canonical_path, redirect: true })
    }

    /// Split a path into its supported leading locale (if any) and the rest.
    ///
    /// The rest always starts with `/`.
    pub fn strip_locale<'a>(&self, path: &'a str) -> (Option<&Locale>, &'a str) {
        let trimmed = path.trim_start_matches('/');
        let (first, rest) = match trimmed.split_once('/') {
            Some((first, _)) => (first, &trimmed[first.len()..]),
            None => (trimmed, "/"),
        };
        match self.locales.get(first) {
            Some(locale) => (Some(locale), rest),
            None => (None, if path.is_empty() { "/" } else { path }),
        }
    }

    /// Path for the same page in `target`'s locale.
    ///
    /// Replaces the leading locale segment when present, otherwise prefixes
    /// one. Only the locale segment changes; the rest of the path is kept.
    pub fn switch_locale(&self, path: &str, target: &Locale) -> String {
        let (_, rest) = self.strip_locale(path);
        prefixed(target, rest)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn normalize(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}

fn leading_segment(path: &str) -> &str {
    let trimmed = path.trim_start_matches('/');
    trimmed.split_once('/').map_or(trimmed, |(first, _)| first)
}

fn prefixed(locale: &Locale, path: &str) -> String {
    if path == "/" || path.is_empty() {
        format!("/{locale}")
    } else if path.starts_with('/') {
        format!("/{locale}{path}")
    } else {
        format!("/{locale}/{path}")
    }
}

/// Two-letter primary subtag, optionally followed by one region/script
/// subtag: `fr`, `de`, `zh-TW`, `pt_BR`, `zh-Hant`.
fn looks_like_language_tag(segment: &str) -> bool {
    let (primary, sub) = match segment.split_once(['-', '_']) {
        Some((p, s)) => (p, Some(s)),
        None => (segment, None),
    };
    let primary_ok = primary.len() == 2 && primary.bytes().all(|b| b.is_ascii_alphabetic());
    let sub_ok = sub.is_none_or(|s| {
        (2..=4).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_alphanumeric())
    });
    primary_ok && sub_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXCLUDED: [&str; 4] = ["api", "_next/static", "_next/image", "favicon.ico"];

    fn resolver() -> LocaleResolver {
        LocaleResolver::new(LocaleSet::new(["zh", "en"], "en").unwrap(), EXCLUDED)
    }

    fn localized(outcome: RouteOutcome) -> Resolution {
        match outcome {
            RouteOutcome::Localized(r) => r,
            other => panic!("expected localized outcome, got {other:?}"),
        }
    }

    #[test]
    fn prefixed_path_is_canonical() {
        let r = localized(resolver().resolve("/zh/login", Some("en")));
        assert_eq!(r.locale.as_str(), "zh");
        assert_eq!(r.canonical_path, "/zh/login");
        assert!(!r.redirect);
    }

    #[test]
    fn bare_locale_is_canonical() {
        let r = localized(resolver().resolve("/en", None));
        assert!(!r.redirect);
        assert_eq!(r.canonical_path, "/en");
    }

    #[test]
    fn root_with_hint_redirects_to_hint() {
        let r = localized(resolver().resolve("/", Some("zh")));
        assert!(r.redirect);
        assert_eq!(r.canonical_path, "/zh");
    }

    #[test]
    fn root_without_hint_redirects_to_default() {
        let r = localized(resolver().resolve("/", None));
        assert_eq!(r.locale.as_str(), "en");
        assert_eq!(r.canonical_path, "/en");
    }

    #[test]
    fn unsupported_hint_falls_back_to_default() {
        let r = localized(resolver().resolve("/login", Some("de")));
        assert_eq!(r.canonical_path, "/en/login");
    }

    #[test]
    fn hint_must_match_exactly() {
        let r = localized(resolver().resolve("/register", Some("ZH")));
        assert_eq!(r.locale.as_str(), "en");
    }

    #[test]
    fn subpath_keeps_rest() {
        let r = localized(resolver().resolve("/login/reset/", Some("zh")));
        assert_eq!(r.canonical_path, "/zh/login/reset/");
    }

    #[test]
    fn relative_path_is_normalized() {
        let r = localized(resolver().resolve("register", None));
        assert_eq!(r.canonical_path, "/en/register");
    }

    #[test]
    fn unsupported_explicit_locale_is_not_found() {
        for hint in [None, Some("zh"), Some("en"), Some("fr")] {
            assert_eq!(
                resolver().resolve("/fr/anything", hint),
                RouteOutcome::NotFound { segment: "fr".into() }
            );
        }
        assert!(matches!(resolver().resolve("/zh-TW", None), RouteOutcome::NotFound { .. }));
        assert!(matches!(resolver().resolve("/EN/login", None), RouteOutcome::NotFound { .. }));
    }

    #[test]
    fn excluded_paths_bypass() {
        let r = resolver();
        for p in ["/api", "/api/auth/login", "/_next/static/chunk.js", "/_next/image", "/favicon.ico"] {
            assert_eq!(r.resolve(p, Some("zh")), RouteOutcome::Excluded, "{p}");
        }
    }

    #[test]
    fn exclusion_is_segment_aware() {
        let r = resolver();
        assert!(!r.is_excluded("/apiary"));
        assert!(!r.is_excluded("/_next/other"));
        assert!(r.is_excluded("api/games"));
    }

    #[test]
    fn canonical_path_resolves_without_redirect() {
        let r = resolver();
        for p in ["/", "/login", "/register", "/a/b/c"] {
            let first = localized(r.resolve(p, Some("zh")));
            let second = localized(r.resolve(&first.canonical_path, None));
            assert!(!second.redirect, "{p}");
            assert_eq!(second.locale, first.locale);
        }
    }

    #[test]
    fn switch_replaces_leading_locale() {
        let r = resolver();
        let zh = r.locales().get("zh").unwrap().clone();
        let en = r.locales().get("en").unwrap().clone();
        assert_eq!(r.switch_locale("/en/login", &zh), "/zh/login");
        assert_eq!(r.switch_locale("/zh", &en), "/en");
        assert_eq!(r.switch_locale("/zh/", &en), "/en");
    }

    #[test]
    fn switch_only_touches_leading_segment() {
        let r = resolver();
        let zh = r.locales().get("zh").unwrap().clone();
        assert_eq!(r.switch_locale("/en/docs/en/intro", &zh), "/zh/docs/en/intro");
        assert_eq!(r.switch_locale("/login", &zh), "/zh/login");
        assert_eq!(r.switch_locale("/", &zh), "/zh");
    }

    #[test]
    fn strip_locale_splits_prefix() {
        let r = resolver();
        let (locale, rest) = r.strip_locale("/zh/register");
        assert_eq!(locale.map(Locale::as_str), Some("zh"));
        assert_eq!(rest, "/register");
        let (locale, rest) = r.strip_locale("/about");
        assert!(locale.is_none());
        assert_eq!(rest, "/about");
    }

    #[test]
    fn language_tag_shape() {
        for tag in ["fr", "de", "zh-TW", "pt_BR", "zh-Hant"] {
            assert!(looks_like_language_tag(tag), "{tag}");
        }
        for seg in ["", "login", "a", "abc", "12", "fr-", "zh-TWXYZ"] {
            assert!(!looks_like_language_tag(seg), "{seg}");
        }
    }
}
