//! Textual SQL rendering of the selector algebra.
//!
//! Query-capable backends translate a [`Selector`] into a `WHERE` clause
//! with [`translate_selector`] instead of filtering rows in memory. The
//! rendered form must select exactly the rows [`Selector::matches`] accepts
//! for the same data; that equivalence is the correctness invariant the
//! dual evaluation design rests on.

use gridstore_core::{Condition, Selector};

/// Renders a selector as a parenthesized SQL boolean expression.
///
/// `identifier_quote` wraps key names (`` ` `` for MySQL, `"` for standard
/// SQL); `value_quote` wraps literals (normally `'`). Quote characters
/// occurring inside identifiers or literals are escaped by doubling.
/// Substring conditions render as `LIKE` patterns with `%`, `_`, and `\`
/// in the literal escaped by a backslash.
#[must_use]
pub fn translate_selector(
    selector: &Selector,
    identifier_quote: &str,
    value_quote: &str,
) -> String {
    match selector {
        Selector::Constant(true) => "(1 = 1)".to_string(),
        Selector::Constant(false) => "(1 = 0)".to_string(),
        Selector::Condition { key, op, value } => {
            let identifier = quote(key, identifier_quote);
            match op {
                Condition::Equals => {
                    format!("({identifier} = {})", quote(value, value_quote))
                }
                Condition::StartsWith => {
                    let pattern = format!("{}%", escape_like(value));
                    format!("({identifier} LIKE {})", quote(&pattern, value_quote))
                }
                Condition::EndsWith => {
                    let pattern = format!("%{}", escape_like(value));
                    format!("({identifier} LIKE {})", quote(&pattern, value_quote))
                }
                Condition::Contains => {
                    let pattern = format!("%{}%", escape_like(value));
                    format!("({identifier} LIKE {})", quote(&pattern, value_quote))
                }
            }
        }
        Selector::Not(inner) => {
            format!(
                "(NOT {})",
                translate_selector(inner, identifier_quote, value_quote)
            )
        }
        Selector::And(a, b) => {
            format!(
                "({} AND {})",
                translate_selector(a, identifier_quote, value_quote),
                translate_selector(b, identifier_quote, value_quote)
            )
        }
        Selector::Or(a, b) => {
            format!(
                "({} OR {})",
                translate_selector(a, identifier_quote, value_quote),
                translate_selector(b, identifier_quote, value_quote)
            )
        }
    }
}

/// Wraps `text` in `quote`, doubling embedded quote characters.
fn quote(text: &str, quote: &str) -> String {
    let doubled = format!("{quote}{quote}");
    format!("{quote}{}{quote}", text.replace(quote, &doubled))
}

/// Escapes LIKE pattern metacharacters with a backslash.
fn escape_like(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for ch in literal.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
