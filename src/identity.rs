//! Fuzzy character-name matching for avatar lookup.
//!
//! Archive file names are often a truncation or a superset of a character's
//! display name, and punctuation and spacing drift between backups. Names
//! are reduced to a key of lowercase ASCII letters, digits and Hangul, and
//! two keys match when equal or when one contains the other.
//!
//! Only avatar lookup uses this. Character and chat identity stay keyed on
//! the exact folder name.

/// Minimum length (in characters) of the shorter key for a containment match.
pub const MIN_CONTAINMENT_LEN: usize = 2;

/// Reduces a name to its comparison key.
///
/// Lowercases, then keeps only ASCII letters, ASCII digits and Hangul code
/// points. Quotes, whitespace, underscores, hyphens, periods and every other
/// symbol disappear.
pub fn normalize(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || is_hangul(*c))
        .collect()
}

/// Compares two already-normalized keys.
pub fn matches(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    let (shorter, longer) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    shorter.chars().count() >= MIN_CONTAINMENT_LEN && longer.contains(shorter)
}

/// Normalizes both sides and compares them.
pub fn names_match(a: &str, b: &str) -> bool {
    let (a, b) = (normalize(a), normalize(b));
    !a.is_empty() && !b.is_empty() && matches(&a, &b)
}

fn is_hangul(c: char) -> bool {
    matches!(c,
        '\u{AC00}'..='\u{D7A3}'   // syllables
        | '\u{1100}'..='\u{11FF}' // jamo
        | '\u{3130}'..='\u{318F}' // compatibility jamo
        | '\u{A960}'..='\u{A97F}' // jamo extended-A
        | '\u{D7B0}'..='\u{D7FF}' // jamo extended-B
    )
}
