use std::sync::Arc;
use std::thread;

use keel_core::config::MatcherKind;
use keel_resolver::matcher::{compile, MatchExpression, PatternMatcher, ANY_EXPRESSION};

const KINDS: [MatcherKind; 5] = [
    MatcherKind::Exact,
    MatcherKind::Regexp,
    MatcherKind::Glob,
    MatcherKind::ExactOrRegexp,
    MatcherKind::Any,
];

const CANDIDATES: &[&str] = &["", "org.acme", "org.acme.tools", "1.0", "a*b", "legacy-io", "x/y"];

#[test]
fn exact_matchers_accept_only_their_expression() {
    let expressions = ["org.acme", "1.0", "legacy-io", "a*b", "org.*", "1.[0-9]"];
    for kind in KINDS {
        for expression in expressions {
            let Ok(matcher) = compile(kind, expression) else {
                continue;
            };
            if !matcher.is_exact() {
                continue;
            }
            for candidate in CANDIDATES {
                assert_eq!(
                    matcher.matches(candidate),
                    *candidate == expression,
                    "{kind:?} {expression} vs {candidate}"
                );
            }
        }
    }
}

#[test]
fn star_short_circuits_for_every_kind() {
    for kind in KINDS {
        let matcher = PatternMatcher::builtin(kind);
        let any = matcher.get_matcher(ANY_EXPRESSION).unwrap();
        assert!(CANDIDATES.iter().all(|c| any.matches(c)));
        assert!(!any.is_exact());
        assert_eq!(matcher.cached(), 0);
    }
}

#[test]
fn kinds_disagree_where_expected() {
    let cases = [
        (MatcherKind::Exact, "org.*", "org.acme", false),
        (MatcherKind::Regexp, "org.*", "org.acme", true),
        (MatcherKind::Regexp, "acme", "org.acme", false),
        (MatcherKind::Glob, "org.*", "org.acme.tools", true),
        (MatcherKind::Glob, "org.?cme", "org.acme", true),
        (MatcherKind::Glob, "*/y", "x/y", true),
        (MatcherKind::ExactOrRegexp, "a*b", "a*b", true),
        (MatcherKind::ExactOrRegexp, "a*b", "aab", true),
        (MatcherKind::Any, "whatever", "1.0", true),
    ];
    for (kind, expression, candidate, expected) in cases {
        let matcher = compile(kind, expression).unwrap();
        assert_eq!(matcher.matches(candidate), expected, "{kind:?} {expression} {candidate}");
    }
}

#[test]
fn shared_matcher_across_threads() {
    let matcher = Arc::new(PatternMatcher::new("shared", MatcherKind::Glob));
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let matcher = Arc::clone(&matcher);
            thread::spawn(move || {
                let pattern = format!("lib-{}*", i % 2);
                let compiled = matcher.get_matcher(&pattern).unwrap();
                compiled.matches(&format!("lib-{}-core", i % 2))
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(matcher.cached(), 2);
}

#[test]
fn match_expression_reports_bad_pattern_on_use() {
    let bad = MatchExpression::new(MatcherKind::Regexp, "(");
    assert!(bad.matches("anything").is_err());
    let good = MatchExpression::new(MatcherKind::Glob, "1.*");
    assert_eq!(good.to_string(), "1.* (glob)");
    assert!(good.clone().matches("1.4").unwrap());
}
