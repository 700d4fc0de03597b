//! Named query parameters.
//!
//! Queries use `:name` placeholders (`:user.id` walks into nested records).
//! [`compile`] rewrites them into positional bind variables and [`bind`]
//! resolves their values from a [`NamedArgs`] record, in placeholder order.
//!
//! `::type` casts and anything inside single-quoted literals are left alone.

use crate::error::{DbError, DbResult};
use crate::models::QueryParam;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};

/// Positional bind variable syntax produced by [`compile`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindStyle {
    /// `$1, $2, ...` as understood by PostgreSQL.
    Dollar,
    /// `?` for diagnostic rendering.
    Question,
}

/// A query with named placeholders rewritten to positional ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    pub sql: String,
    /// Placeholder names in order of appearance; repeats are kept.
    pub names: Vec<String>,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.'
}

/// Rewrite `:name` placeholders into positional bind variables.
pub fn compile(query: &str, style: BindStyle) -> CompiledQuery {
    let mut sql = String::with_capacity(query.len());
    let mut names = Vec::new();
    let mut chars = query.chars().peekable();
    let mut in_literal = false;

    while let Some(c) = chars.next() {
        if in_literal {
            sql.push(c);
            if c == '\'' {
                in_literal = false;
            }
            continue;
        }

        match c {
            '\'' => {
                in_literal = true;
                sql.push(c);
            }
            ':' if chars.peek() == Some(&':') => {
                // type cast
                chars.next();
                sql.push_str("::");
            }
            ':' if chars.peek().is_some_and(|n| is_name_char(*n) && *n != '.') => {
                let mut name = String::new();
                while let Some(&n) = chars.peek() {
                    if !is_name_char(n) {
                        break;
                    }
                    name.push(n);
                    chars.next();
                }
                // a trailing dot ends the sentence, not the name
                let trailing = name.len() - name.trim_end_matches('.').len();
                name.truncate(name.len() - trailing);

                names.push(name);
                match style {
                    BindStyle::Dollar => sql.push_str(&format!("${}", names.len())),
                    BindStyle::Question => sql.push('?'),
                }
                sql.extend(std::iter::repeat_n('.', trailing));
            }
            _ => sql.push(c),
        }
    }

    CompiledQuery { sql, names }
}

/// Compile `query` and resolve every placeholder from `args`.
pub fn bind<A>(query: &str, args: &A, style: BindStyle) -> DbResult<(String, Vec<QueryParam>)>
where
    A: NamedArgs + ?Sized,
{
    let compiled = compile(query, style);
    let params = compiled
        .names
        .iter()
        .map(|name| {
            args.lookup(name)
                .ok_or_else(|| DbError::missing_argument(name))
        })
        .collect::<DbResult<Vec<_>>>()?;
    Ok((compiled.sql, params))
}

/// A record whose fields bind to named placeholders.
pub trait NamedArgs {
    fn lookup(&self, name: &str) -> Option<QueryParam>;
}

/// No arguments: for self-contained queries.
impl NamedArgs for () {
    fn lookup(&self, _name: &str) -> Option<QueryParam> {
        None
    }
}

impl<T: NamedArgs + ?Sized> NamedArgs for &T {
    fn lookup(&self, name: &str) -> Option<QueryParam> {
        (**self).lookup(name)
    }
}

impl NamedArgs for HashMap<String, QueryParam> {
    fn lookup(&self, name: &str) -> Option<QueryParam> {
        self.get(name).cloned()
    }
}

impl NamedArgs for BTreeMap<String, QueryParam> {
    fn lookup(&self, name: &str) -> Option<QueryParam> {
        self.get(name).cloned()
    }
}

/// Serialized records. Dotted names walk into nested objects.
impl NamedArgs for JsonValue {
    fn lookup(&self, name: &str) -> Option<QueryParam> {
        name.split('.')
            .try_fold(self, |value, key| value.as_object()?.get(key))
            .map(QueryParam::from_json)
    }
}

/// Serialize a record so its fields can bind to named placeholders.
///
/// Field names follow serde, so `#[serde(rename = "...")]` acts as the
/// placeholder tag. Values keep their JSON type: strings bind as text, so
/// typed columns need a cast in SQL (`:id::uuid`). Use [`Args`] for exact
/// parameter types.
pub fn args_from<T: Serialize + ?Sized>(record: &T) -> DbResult<JsonValue> {
    serde_json::to_value(record).map_err(|e| DbError::other("serialize query arguments", e))
}

/// Ordered name/value arguments.
///
/// ```
/// use dbsql::db::Args;
///
/// let args = Args::new().with("name", "ada").with("age", 36);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    values: Vec<(String, QueryParam)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named value. A later value for the same name wins.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<QueryParam>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<QueryParam>) {
        let name = name.into();
        let value = value.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.values.push((name, value)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

impl NamedArgs for Args {
    fn lookup(&self, name: &str) -> Option<QueryParam> {
        self.values
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    }
}

impl<K: Into<String>, V: Into<QueryParam>> FromIterator<(K, V)> for Args {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = Args::new();
        for (name, value) in iter {
            args.insert(name, value);
        }
        args
    }
}
