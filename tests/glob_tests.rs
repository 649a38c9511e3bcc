//! Tests for the restricted glob matcher.
//!
//! Validates the wildcard translation, the specificity ranking and the
//! best-match selection used for scoped overrides.

use modrun::glob::{PathPattern, best_matches};

// =============================================================================
// Translation Tests
// =============================================================================

#[test]
fn test_question_mark_matches_single_character() {
    let pattern = PathPattern::new("a-?.jar").unwrap();
    assert!(pattern.matches("a-b.jar"));
    assert!(!pattern.matches("a-.jar"));
    assert!(!pattern.matches("a-bb.jar"));
}

#[test]
fn test_question_mark_does_not_cross_separator() {
    let pattern = PathPattern::new("a?b").unwrap();
    assert!(pattern.matches("axb"));
    assert!(!pattern.matches("a/b"));
}

#[test]
fn test_star_does_not_cross_separator() {
    let pattern = PathPattern::new("*.jar").unwrap();
    assert!(pattern.matches("foo.jar"));
    assert!(!pattern.matches("subdir/bar.jar"));
}

#[test]
fn test_double_star_crosses_separator() {
    let pattern = PathPattern::new("**.jar").unwrap();
    assert!(pattern.matches("foo.jar"));
    assert!(pattern.matches("subdir/bar.jar"));
    assert!(pattern.matches("a/b/c/d.jar"));
}

#[test]
fn test_metacharacters_are_literal() {
    let pattern = PathPattern::new("a(b)+c.jar").unwrap();
    assert!(pattern.matches("a(b)+c.jar"));
    assert!(!pattern.matches("a(b)+cXjar"));
    assert!(!pattern.matches("abbc.jar"));
}

#[test]
fn test_match_covers_whole_path() {
    let pattern = PathPattern::new("core.jar").unwrap();
    assert!(!pattern.matches("core.jarx"));
    assert!(!pattern.matches("xcore.jar"));
}

#[test]
fn test_matches_full_locations() {
    // The same compiler serves the uninstall surface, which matches
    // URI-shaped location strings
    let pattern = PathPattern::new("file:///store/**.jar").unwrap();
    assert!(pattern.matches("file:///store/sub/lib.jar"));
    assert!(!pattern.matches("file:///other/lib.jar"));
}

// =============================================================================
// Ranking Tests
// =============================================================================

#[test]
fn test_ranking_ignores_wildcards() {
    assert_eq!(PathPattern::new("abc").unwrap().ranking(), 3);
    assert_eq!(PathPattern::new("a*c").unwrap().ranking(), 2);
    assert_eq!(PathPattern::new("a**c?").unwrap().ranking(), 2);
}

#[test]
fn test_ordering_is_deterministic() {
    let mut matchers = vec![
        PathPattern::new("b-?.jar").unwrap(),
        PathPattern::new("a-?.jar").unwrap(),
        PathPattern::new("org.osgi.util.*.jar").unwrap(),
        PathPattern::new("*.jar").unwrap(),
    ];
    matchers.sort();

    let order: Vec<&str> = matchers.iter().map(PathPattern::glob).collect();
    assert_eq!(order, ["org.osgi.util.*.jar", "a-?.jar", "b-?.jar", "*.jar"]);
}

// =============================================================================
// Best Match Tests
// =============================================================================

#[test]
fn test_more_literals_win() {
    let mut matchers = vec![
        PathPattern::new("*.jar").unwrap(),
        PathPattern::new("org.osgi.util.*.jar").unwrap(),
    ];
    matchers.sort();

    let best = best_matches(&matchers, "org.osgi.util.tracker.jar");
    assert_eq!(best.len(), 1);
    assert_eq!(best[0].glob(), "org.osgi.util.*.jar");

    let best = best_matches(&matchers, "foo.jar");
    assert_eq!(best.len(), 1);
    assert_eq!(best[0].glob(), "*.jar");
}

#[test]
fn test_no_match_across_separator() {
    let mut matchers = vec![
        PathPattern::new("*.jar").unwrap(),
        PathPattern::new("org.osgi.util.*.jar").unwrap(),
    ];
    matchers.sort();

    assert!(best_matches(&matchers, "subdir/bar.jar").is_empty());
}

#[test]
fn test_equal_rankings_are_ambiguous() {
    let mut matchers = vec![
        PathPattern::new("a-?.jar").unwrap(),
        PathPattern::new("a-b.?ar").unwrap(),
    ];
    matchers.sort();

    let best = best_matches(&matchers, "a-b.jar");
    assert_eq!(best.len(), 2, "equal literal counts must tie");
}
