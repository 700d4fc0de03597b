//! Query rendering for diagnostics.
//!
//! [`format_query`] substitutes named argument values into a query so it can
//! be attached to a log line. The output is never executed.

use crate::db::named::{self, BindStyle, NamedArgs};
use crate::models::QueryParam;

/// Render `query` with `args` substituted, tidied onto one line.
///
/// A binding failure is returned as its error text.
pub fn format_query<A: NamedArgs + ?Sized>(query: &str, args: &A) -> String {
    match named::bind(query, args, BindStyle::Question) {
        Ok((sql, params)) => tidy(&interpolate(&sql, &params)),
        Err(e) => e.to_string(),
    }
}

/// Replace each `?` left to right with the next parameter.
///
/// String-like values are single-quoted, NULL renders as `NULL`. Surplus
/// placeholders are left as they are, surplus values are ignored.
pub fn interpolate(query: &str, params: &[QueryParam]) -> String {
    let mut out = String::with_capacity(query.len());
    let mut params = params.iter().peekable();
    for c in query.chars() {
        match (c, params.next_if(|_| c == '?')) {
            (_, Some(param)) => out.push_str(&format_value(param)),
            (c, None) => out.push(c),
        }
    }
    out
}

/// Render one parameter as it would appear in SQL text.
pub fn format_value(param: &QueryParam) -> String {
    if param.is_string_like() {
        format!("'{param}'")
    } else {
        param.to_string()
    }
}

/// Drop tabs, fold newlines into spaces and trim.
fn tidy(query: &str) -> String {
    query
        .replace('\t', "")
        .replace("\r\n", " ")
        .replace('\n', " ")
        .trim()
        .to_string()
}
