//! Donor identities: `ID(NICKNAME)` parsing and category rules.
//!
//! This module is the only place where a donation category is decided. Both
//! the per-donor aggregation and the summary rollup go through [classify],
//! always on a donor key returned by [normalize].

use crate::config::{Category, Cell};

/// Splits an identity field into `(donor_key, nickname)`.
///
/// `"id(nick)"` gives `("id", "nick")`. Anything else (no parenthesis,
/// unbalanced or not at the end) is kept whole as the donor key, with an
/// empty nickname. Both parts are trimmed.
pub fn normalize(field: &str) -> (String, String) {
    let s = field.trim();
    if s.ends_with(')') {
        if let Some((key, rest)) = s.split_once('(') {
            let nickname = rest.trim_end_matches(')').trim();
            return (key.trim().to_string(), nickname.to_string());
        }
    }
    (s.to_string(), String::new())
}

/// Same as [normalize], for a raw cell. An empty cell is an empty donor key.
pub fn normalize_cell(cell: &Cell) -> (String, String) {
    match cell.as_text() {
        Some(s) => normalize(&s),
        None => (String::new(), String::new()),
    }
}

/// The category of a normalized donor key.
///
/// Keys from partner platforms carry an `@` domain, except `@ka` ones which
/// are settled as standard hearts.
pub fn classify(donor_key: &str) -> Category {
    if donor_key.contains("@ka") {
        Category::Standard
    } else if donor_key.contains('@') {
        Category::Partner
    } else {
        Category::Standard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(a: &str, b: &str) -> (String, String) {
        (a.to_string(), b.to_string())
    }

    #[test]
    fn with_nickname() {
        assert_eq!(normalize("u1(Alice)"), pair("u1", "Alice"));
        assert_eq!(normalize("  u1 ( Alice ) "), pair("u1", "Alice"));
        assert_eq!(normalize("a@ka(김철수)"), pair("a@ka", "김철수"));
        // Only the first parenthesis splits.
        assert_eq!(normalize("u1(Al(ice))"), pair("u1", "Al(ice"));
        assert_eq!(normalize("(nick)"), pair("", "nick"));
        assert_eq!(normalize("u1()"), pair("u1", ""));
    }

    #[test]
    fn without_nickname() {
        assert_eq!(normalize("justanid"), pair("justanid", ""));
        assert_eq!(normalize(""), pair("", ""));
        assert_eq!(normalize("   "), pair("", ""));
        assert_eq!(normalize("u1(Alice"), pair("u1(Alice", ""));
        assert_eq!(normalize("u1)Alice("), pair("u1)Alice(", ""));
        assert_eq!(normalize("u1(Alice) tail"), pair("u1(Alice) tail", ""));
    }

    #[test]
    fn cells() {
        assert_eq!(normalize_cell(&Cell::Empty), pair("", ""));
        assert_eq!(normalize_cell(&Cell::Int(1234)), pair("1234", ""));
        assert_eq!(
            normalize_cell(&Cell::String("b@x(Lee)".to_string())),
            pair("b@x", "Lee")
        );
    }

    #[test]
    fn categories() {
        assert_eq!(classify("justanid"), Category::Standard);
        assert_eq!(classify("a@ka"), Category::Standard);
        assert_eq!(classify("a@kakao"), Category::Standard);
        assert_eq!(classify("b@x"), Category::Partner);
        assert_eq!(classify("@"), Category::Partner);
        assert_eq!(classify(""), Category::Standard);
    }

    #[test]
    fn classify_runs_on_the_key_not_the_field() {
        // The nickname may contain an '@': only the key decides.
        let (key, nick) = normalize("plain(me@home)");
        assert_eq!(nick, "me@home");
        assert_eq!(classify(&key), Category::Standard);
    }
}
