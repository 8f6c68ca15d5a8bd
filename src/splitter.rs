//! # Balanced Splitting
//!
//! Column lists and template argument lists are declared as comma separated
//! strings, but a single entry may itself contain commas inside a function
//! call (`CONCAT(first, ' ', last) as full_name`). [`split_balanced`] splits on
//! the delimiter only when every opened bracket has been closed again.
//!
//! ```rust
//! use gridcrate::splitter::split;
//!
//! assert_eq!(split(",", "f(a,b),c"), vec!["f(a,b)", "c"]);
//! ```

/// Net bracket balance of a fragment (opens minus closes).
fn balance_of(fragment: &str, open: char, close: char) -> i64 {
    fragment.chars().fold(0, |balance, c| {
        if c == open {
            balance + 1
        } else if c == close {
            balance - 1
        } else {
            balance
        }
    })
}

/// Split `text` on `delimiter`, ignoring delimiters enclosed by `open`/`close`.
///
/// Fragments are joined back together while the running balance is positive.
/// Unbalanced input never errors: whatever is still pending at the end of the
/// text is emitted as the last segment.
#[must_use]
pub fn split_balanced(delimiter: &str, text: &str, open: char, close: char) -> Vec<String> {
    if delimiter.is_empty() {
        return vec![text.to_string()];
    }

    let mut segments = Vec::new();
    let mut pending: Vec<&str> = Vec::new();
    let mut balance = 0;

    for fragment in text.split(delimiter) {
        pending.push(fragment);
        balance += balance_of(fragment, open, close);

        if balance < 1 {
            segments.push(pending.join(delimiter));
            pending.clear();
            balance = 0;
        }
    }

    if !pending.is_empty() {
        segments.push(pending.join(delimiter));
    }

    segments
}

/// [`split_balanced`] with parentheses as the bracket pair.
#[must_use]
pub fn split(delimiter: &str, text: &str) -> Vec<String> {
    split_balanced(delimiter, text, '(', ')')
}

/// Byte offset of the last top-level ` as ` keyword (case-insensitive).
fn find_as_keyword(expression: &str) -> Option<usize> {
    let lowered = expression.to_ascii_lowercase();
    let bytes = lowered.as_bytes();
    let mut depth = 0i64;
    let mut found = None;

    for (index, byte) in bytes.iter().enumerate() {
        match byte {
            b'(' => depth += 1,
            b')' => depth -= 1,
            b if b.is_ascii_whitespace() && depth <= 0 => {
                let rest = &bytes[index + 1..];
                if rest.len() > 3
                    && rest.starts_with(b"as")
                    && rest[2].is_ascii_whitespace()
                {
                    found = Some(index);
                }
            }
            _ => {}
        }
    }

    found
}

/// Remove a trailing `AS name` clause, returning the trimmed expression.
///
/// `CONCAT(a, b) as full` becomes `CONCAT(a, b)`. Text without a top-level
/// `AS` keyword is only trimmed.
#[must_use]
pub fn strip_as_clause(expression: &str) -> String {
    let trimmed = expression.trim();
    find_as_keyword(trimmed).map_or_else(
        || trimmed.to_string(),
        |index| trimmed[..index].trim().to_string(),
    )
}

/// The name after a trailing `AS` clause, or the trimmed expression itself.
#[must_use]
pub fn as_target(expression: &str) -> String {
    let trimmed = expression.trim();
    find_as_keyword(trimmed).map_or_else(
        || trimmed.to_string(),
        |index| {
            let target = trimmed[index..].trim_start();
            target[2..].trim().to_string()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain_list() {
        assert_eq!(split(",", "a,b"), vec!["a", "b"]);
    }

    #[test]
    fn test_split_keeps_function_arguments_together() {
        assert_eq!(split(",", "f(a,b),c"), vec!["f(a,b)", "c"]);
        assert_eq!(split(",", "f(a,b,c)"), vec!["f(a,b,c)"]);
    }

    #[test]
    fn test_split_nested_calls() {
        assert_eq!(
            split(",", "id, CONCAT(UPPER(a), ',', b) as c, d"),
            vec!["id", " CONCAT(UPPER(a), ',', b) as c", " d"]
        );
    }

    #[test]
    fn test_split_unbalanced_returns_remainder() {
        // Missing close paren: no error, the remainder is one segment
        assert_eq!(split(",", "f(a,b"), vec!["f(a,b"]);
        assert_eq!(split(",", "x,f(a,b"), vec!["x", "f(a,b"]);
    }

    #[test]
    fn test_split_extra_close_resets_balance() {
        assert_eq!(split(",", "a),b"), vec!["a)", "b"]);
    }

    #[test]
    fn test_split_custom_brackets() {
        assert_eq!(split_balanced(";", "[a;b];c", '[', ']'), vec!["[a;b]", "c"]);
    }

    #[test]
    fn test_split_empty_input() {
        assert_eq!(split(",", ""), vec![""]);
    }

    #[test]
    fn test_strip_as_clause() {
        assert_eq!(strip_as_clause("  users.name  "), "users.name");
        assert_eq!(strip_as_clause("CONCAT(a, b) as full"), "CONCAT(a, b)");
        assert_eq!(strip_as_clause("price AS cost"), "price");
        // "as" inside a call is not the alias keyword
        assert_eq!(strip_as_clause("CAST(x as TEXT)"), "CAST(x as TEXT)");
        assert_eq!(strip_as_clause("basket"), "basket");
    }

    #[test]
    fn test_as_target() {
        assert_eq!(as_target("CONCAT(a, b) as full"), "full");
        assert_eq!(as_target("users.id AS user_id"), "user_id");
        assert_eq!(as_target("name"), "name");
    }
}
