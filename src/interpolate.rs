//! Simple placeholder interpolation.

use regex::Regex;
use std::sync::OnceLock;

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]*)\}").expect("placeholder pattern"))
}

/// Replaces `${name}` placeholders found in the given template.
///
/// Each placeholder name is resolved with the lookup function; when the
/// lookup returns `None`, the placeholder stays in the output verbatim.
/// Substitution is single pass, so replacement values are never themselves
/// interpolated.
pub fn interpolate<F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let pattern = placeholder_pattern();

    let mut result = String::new();
    let mut copy_from = 0;
    let mut touched = false;

    for found in pattern.captures_iter(template) {
        let occurrence = found.get(0).expect("whole match");
        let name = found.get(1).expect("placeholder name").as_str();

        if let Some(value) = lookup(name) {
            result.push_str(&template[copy_from..occurrence.start()]);
            result.push_str(&value);
            copy_from = occurrence.end();
            touched = true;
        }
    }

    if !touched {
        return template.to_string();
    }

    result.push_str(&template[copy_from..]);
    result
}
