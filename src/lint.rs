use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

// printf-style specifiers as they appear in catalog strings: %@, %d, %lld,
// %1$@, %10.2f, ... The leading %% alternative swallows escaped percents.
static FORMAT_SPECIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"%%|%(?:\d+\$)?[-#0+ ']*\d*(?:\.\d+)?(?:hh|h|ll|l|q|z|t|L)?[@dDiuUxXoOfFeEgGaAcCsSp]")
        .unwrap()
});

static BRACE_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{[^{}]*\}").unwrap());

/// Rejects translations that obviously broke the source string: dropped or
/// mangled format specifiers, lost `{placeholder}` braces, or leading/trailing
/// newline and emptiness drift. Returns true when the translation is usable.
pub fn lint(source: &str, source_language: &str, translation: &str, target_language: &str) -> bool {
    if source.is_empty() != translation.is_empty() {
        debug!(%source_language, %target_language, "lint: emptiness mismatch");
        return false;
    }
    if source.starts_with('\n') != translation.starts_with('\n')
        || source.ends_with('\n') != translation.ends_with('\n')
    {
        debug!(%source_language, %target_language, "lint: newline parity mismatch");
        return false;
    }
    if specifier_multiset(source) != specifier_multiset(translation) {
        debug!(
            %source_language,
            %target_language,
            source,
            translation,
            "lint: format specifier mismatch"
        );
        return false;
    }
    let source_braces = BRACE_PLACEHOLDER.find_iter(source).count();
    if source_braces > 0 && source_braces != BRACE_PLACEHOLDER.find_iter(translation).count() {
        debug!(%source_language, %target_language, "lint: brace placeholder count mismatch");
        return false;
    }
    true
}

// Positional prefixes are stripped so "%2$@ %1$d" matches "%d %@".
fn specifier_multiset(text: &str) -> HashMap<String, usize> {
    let mut set = HashMap::new();
    for m in FORMAT_SPECIFIER.find_iter(text) {
        let spec = m.as_str();
        if spec == "%%" {
            continue;
        }
        let normalized = match spec.find('$') {
            Some(idx) => format!("%{}", &spec[idx + 1..]),
            None => spec.to_string(),
        };
        *set.entry(normalized).or_insert(0) += 1;
    }
    set
}
