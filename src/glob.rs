//! Restricted glob matching for bundle paths.
//!
//! Bundle paths use the platform independent form with `/` as the component
//! separator. A restricted glob may use only the `?`, `*` and `**`
//! wildcards; every other character matches literally. The compiled matcher
//! carries a ranking (the count of its literal characters), so a set of
//! matchers can be ordered by specificity.

use crate::error::{Error, Result};
use regex::Regex;
use std::cmp::Ordering;

/// Regex metacharacters that must be escaped when a glob is translated.
/// Wildcard characters are handled separately.
const REGEX_META_CHARACTERS: &str = ".+$^[](){}\\|";

/// A compiled restricted glob expression.
///
/// Matchers compare by descending ranking and then by the original glob
/// expression, which makes the ordering deterministic and consistent with
/// equality.
#[derive(Debug, Clone)]
pub struct PathPattern {
    regex: Regex,
    ranking: usize,
    glob: String,
}

impl PathPattern {
    /// Compiles the given restricted glob expression.
    ///
    /// `?` matches a single character except `/`, `*` matches any run of
    /// characters except `/`, and `**` matches any run of characters
    /// including `/`. All other characters are literal.
    pub fn new(glob: &str) -> Result<Self> {
        let mut pattern = String::with_capacity(glob.len() + 8);
        pattern.push('^');

        let mut literals = 0;
        let mut chars = glob.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '?' => pattern.push_str("[^/]"),
                '*' => {
                    if chars.peek() == Some(&'*') {
                        // Traverse the path component boundaries
                        chars.next();
                        pattern.push_str(".*");
                    } else {
                        pattern.push_str("[^/]*");
                    }
                }
                _ => {
                    if REGEX_META_CHARACTERS.contains(c) {
                        pattern.push('\\');
                        pattern.push(c);
                    } else {
                        pattern.push(c);
                        literals += 1;
                    }
                }
            }
        }

        pattern.push('$');

        let regex = Regex::new(&pattern)
            .map_err(|e| Error::Config(format!("invalid bundle path pattern '{glob}': {e}")))?;

        Ok(Self {
            regex,
            ranking: literals,
            glob: glob.to_string(),
        })
    }

    /// Tests whether the path matches this pattern.
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Returns the specificity of this matcher, i.e., how many literal
    /// characters the glob contains.
    pub fn ranking(&self) -> usize {
        self.ranking
    }

    /// Returns the original glob expression.
    pub fn glob(&self) -> &str {
        &self.glob
    }
}

impl PartialEq for PathPattern {
    fn eq(&self, other: &Self) -> bool {
        self.glob == other.glob
    }
}

impl Eq for PathPattern {}

impl Ord for PathPattern {
    fn cmp(&self, other: &Self) -> Ordering {
        // More specific matchers sort first; ties break on the expression
        // to keep the order deterministic and consistent with equality.
        other
            .ranking
            .cmp(&self.ranking)
            .then_with(|| self.glob.cmp(&other.glob))
    }
}

impl PartialOrd for PathPattern {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.glob)
    }
}

/// Finds all best-ranking matchers that match the path.
///
/// The matchers must be sorted by their natural ordering. The result keeps
/// only the matchers sharing the highest ranking among those that match;
/// thanks to the sorting the scan can stop at the first ranking change.
pub fn best_matches<'a>(matchers: &'a [PathPattern], path: &str) -> Vec<&'a PathPattern> {
    let mut result: Vec<&PathPattern> = Vec::new();
    let mut ranking = 0;

    for matcher in matchers {
        if matcher.matches(path) {
            if result.is_empty() {
                ranking = matcher.ranking();
                result.push(matcher);
                continue;
            }

            if matcher.ranking() == ranking {
                result.push(matcher);
                continue;
            }

            break;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcards() {
        let single = PathPattern::new("a-?.jar").unwrap();
        assert!(single.matches("a-b.jar"));
        assert!(!single.matches("a-bc.jar"));
        assert!(!single.matches("a-/.jar"));

        let star = PathPattern::new("*.jar").unwrap();
        assert!(star.matches("foo.jar"));
        assert!(!star.matches("subdir/bar.jar"));

        let double = PathPattern::new("**.jar").unwrap();
        assert!(double.matches("subdir/bar.jar"));
    }

    #[test]
    fn test_literals_are_escaped() {
        let pattern = PathPattern::new("lib+core.jar").unwrap();
        assert!(pattern.matches("lib+core.jar"));
        assert!(!pattern.matches("libXcore.jar"));
        assert!(!pattern.matches("lib+coreXjar"));
    }

    #[test]
    fn test_ranking_counts_literals_only() {
        assert_eq!(PathPattern::new("*.jar").unwrap().ranking(), 3);
        assert_eq!(PathPattern::new("a-?.jar").unwrap().ranking(), 5);
        assert_eq!(PathPattern::new("a-b.?ar").unwrap().ranking(), 5);
    }

    #[test]
    fn test_ordering_prefers_specific() {
        let mut matchers = vec![
            PathPattern::new("*.jar").unwrap(),
            PathPattern::new("org.osgi.util.*.jar").unwrap(),
        ];
        matchers.sort();
        assert_eq!(matchers[0].glob(), "org.osgi.util.*.jar");
    }

    #[test]
    fn test_best_matches_singleton() {
        let mut matchers = vec![
            PathPattern::new("*.jar").unwrap(),
            PathPattern::new("org.osgi.util.*.jar").unwrap(),
        ];
        matchers.sort();

        let best = best_matches(&matchers, "org.osgi.util.tracker.jar");
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].glob(), "org.osgi.util.*.jar");
    }

    #[test]
    fn test_best_matches_ambiguous() {
        let mut matchers = vec![
            PathPattern::new("a-?.jar").unwrap(),
            PathPattern::new("a-b.?ar").unwrap(),
        ];
        matchers.sort();

        let best = best_matches(&matchers, "a-b.jar");
        assert_eq!(best.len(), 2);
    }
}
