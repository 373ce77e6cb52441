//! Locale routing properties over a spread of paths and hints.

use mainpage_gateway::locale::LocaleSet;
use mainpage_gateway::locale::resolve::{LocaleResolver, RouteOutcome};

const PATHS: [&str; 8] = [
    "/",
    "/login",
    "/register",
    "/games/fogchess",
    "/login/",
    "/a/b/c",
    "/english",
    "/apiary",
];

const HINTS: [Option<&str>; 5] = [None, Some("zh"), Some("en"), Some("fr"), Some("")];

fn resolver() -> LocaleResolver {
    LocaleResolver::new(
        LocaleSet::new(["zh", "en"], "en").unwrap(),
        ["api", "_next/static", "_next/image", "favicon.ico"],
    )
}

#[test]
fn unprefixed_paths_redirect_to_hint_or_default() {
    let r = resolver();
    for path in PATHS {
        for hint in HINTS {
            let RouteOutcome::Localized(res) = r.resolve(path, hint) else {
                panic!("{path} with {hint:?} was not localized");
            };
            assert!(res.redirect, "{path}");
            let expected = match hint {
                Some("zh") => "zh",
                _ => "en",
            };
            assert_eq!(res.locale.as_str(), expected, "{path} {hint:?}");
            assert!(res.canonical_path.starts_with(&format!("/{expected}")));
        }
    }
}

#[test]
fn canonical_paths_are_fixed_points() {
    let r = resolver();
    for path in PATHS {
        for hint in HINTS {
            let RouteOutcome::Localized(first) = r.resolve(path, hint) else { panic!() };
            let RouteOutcome::Localized(second) = r.resolve(&first.canonical_path, hint) else {
                panic!("{} did not resolve", first.canonical_path);
            };
            assert!(!second.redirect, "{}", first.canonical_path);
            assert_eq!(second.locale, first.locale);
            assert_eq!(second.canonical_path, first.canonical_path);
        }
    }
}

#[test]
fn prefixed_paths_keep_their_locale_whatever_the_hint() {
    let r = resolver();
    for path in ["/zh", "/zh/login", "/en/register", "/en/"] {
        for hint in HINTS {
            let RouteOutcome::Localized(res) = r.resolve(path, hint) else { panic!() };
            assert!(!res.redirect);
            assert_eq!(res.locale.as_str(), &path[1..3]);
        }
    }
}

#[test]
fn unsupported_explicit_locale_is_not_found() {
    let r = resolver();
    for path in ["/fr/anything", "/fr", "/de-DE/login", "/pt_BR/"] {
        for hint in HINTS {
            assert!(
                matches!(r.resolve(path, hint), RouteOutcome::NotFound { .. }),
                "{path} {hint:?}"
            );
        }
    }
}

#[test]
fn infrastructure_paths_are_left_alone() {
    let r = resolver();
    for path in ["/api/auth/login", "/api", "/_next/static/x.js", "/_next/image", "/favicon.ico"] {
        assert_eq!(r.resolve(path, Some("zh")), RouteOutcome::Excluded, "{path}");
    }
}

#[test]
fn root_with_zh_hint() {
    let RouteOutcome::Localized(res) = resolver().resolve("/", Some("zh")) else { panic!() };
    assert_eq!(res.canonical_path, "/zh");
    assert!(res.redirect);
}

#[test]
fn switching_only_touches_the_locale_segment() {
    let r = resolver();
    let zh = r.locales().get("zh").unwrap().clone();
    assert_eq!(r.switch_locale("/en/login?registered=true", &zh), "/zh/login?registered=true");
    assert_eq!(r.switch_locale("/en", &zh), "/zh");
}
