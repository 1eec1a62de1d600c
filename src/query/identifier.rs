//! SQL identifier checks.
//!
//! Table and column names cannot be bound as parameters, so every name that
//! ends up in a statement must pass [`is_identifier`] first.

use regex::Regex;
use std::sync::LazyLock;

/// Plain identifier, optionally qualified once (`books.stock`).
static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .unwrap_or_else(|_| unreachable!("identifier pattern is valid"))
});

/// Returns true if `name` can be spliced into SQL as a table or column name.
#[must_use]
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("books" ; "table")]
    #[test_case("author_id" ; "snake case")]
    #[test_case("_rowid" ; "leading underscore")]
    #[test_case("v_books.stock" ; "qualified")]
    #[test_case("Stock2" ; "mixed case with digit")]
    fn test_accepts(name: &str) {
        assert!(is_identifier(name));
    }

    #[test_case("" ; "empty")]
    #[test_case("2books" ; "leading digit")]
    #[test_case("books; DROP TABLE books" ; "injection")]
    #[test_case("title LIKE 'x'" ; "expression")]
    #[test_case("a.b.c" ; "double qualified")]
    #[test_case("stock-1" ; "dash")]
    fn test_rejects(name: &str) {
        assert!(!is_identifier(name));
    }
}
