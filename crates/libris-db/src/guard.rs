//! Whitelist-based construction of dynamic SQL fragments.
//!
//! Placeholders only cover values, never identifiers or operators, so every
//! column and operator that ends up in a fragment must come from the static
//! tables below. Anything else is rejected before any text is produced.

use std::fmt;

use thiserror::Error;

use crate::record::Params;

pub const AUTHOR_COLUMNS: &[&str] = &[
    "id",
    "email",
    "password",
    "name",
    "biography",
    "birth_year",
    "nationality",
    "created_at",
    "updated_at",
];

pub const BOOK_COLUMNS: &[&str] = &[
    "id",
    "title",
    "genre",
    "language",
    "published_year",
    "author_id",
    "created_at",
    "updated_at",
];

pub const REFRESH_TOKEN_COLUMNS: &[&str] = &[
    "id",
    "author_id",
    "refresh_token",
    "expires_in",
    "created_at",
];

/// Registered tables and their filterable/updatable columns.
/// Must stay in lockstep with `migrations.rs`.
const ALLOWED_COLUMNS: &[(&str, &[&str])] = &[
    ("authors", AUTHOR_COLUMNS),
    ("books", BOOK_COLUMNS),
    ("refresh_tokens", REFRESH_TOKEN_COLUMNS),
];

pub const ALLOWED_OPERATORS: &[&str] = &["=", "!=", "<", ">", "<=", ">=", "LIKE", "IN", "NOT IN"];

/// Prefix of the bound parameter that carries a SET value.
pub const SET_PARAM_PREFIX: &str = "set_";

/// Substrings that never appear in a legitimate raw filter.
const DENYLIST: &[&str] = &[
    ";", "--", "/*", "*/", "'", "\"", "\\", "`", "(", ")", " or ", " union ", "select ",
    "drop ", "delete ", "insert ", "update ", "alter ", "create ", "attach ", "detach ",
    "pragma", "exec", "sleep",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError {
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Column '{column}' not allowed for table '{table}'")]
    ColumnNotAllowed { column: String, table: String },

    #[error("Operator '{0}' not allowed")]
    OperatorNotAllowed(String),

    #[error("Parameter '{0}' not found in params")]
    ParameterNotFound(String),

    #[error("No fields provided for update")]
    NoFieldsForUpdate,

    #[error("Unsafe filter detected: {0}")]
    UnsafeFilter(String),
}

/// A piece of SQL text produced only by [`QueryGuard`].
///
/// The constructor is private to this crate so stores can accept fragments
/// without re-validating them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment(String);

impl Fragment {
    pub(crate) fn new(text: String) -> Self {
        Self(text)
    }

    /// The documented "no filter" fragment.
    pub fn always_true() -> Self {
        Self("TRUE".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Fragment {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Fragment {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// One `column operator :param` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Condition<'a> {
    pub column: &'a str,
    pub operator: &'a str,
    pub param: &'a str,
}

impl<'a> Condition<'a> {
    pub fn new(column: &'a str, operator: &'a str, param: &'a str) -> Self {
        Self {
            column,
            operator,
            param,
        }
    }
}

impl<'a> From<(&'a str, &'a str, &'a str)> for Condition<'a> {
    fn from((column, operator, param): (&'a str, &'a str, &'a str)) -> Self {
        Self::new(column, operator, param)
    }
}

/// Stateless validator and clause builder. All methods are pure.
pub struct QueryGuard;

impl QueryGuard {
    /// Whitelisted columns of a registered table.
    pub fn columns(table: &str) -> Result<&'static [&'static str], GuardError> {
        ALLOWED_COLUMNS
            .iter()
            .find(|(name, _)| *name == table)
            .map(|(_, columns)| *columns)
            .ok_or_else(|| GuardError::UnknownTable(table.to_string()))
    }

    pub fn validate_column(table: &str, column: &str) -> Result<&'static str, GuardError> {
        Self::columns(table)?
            .iter()
            .find(|allowed| **allowed == column)
            .copied()
            .ok_or_else(|| GuardError::ColumnNotAllowed {
                column: column.to_string(),
                table: table.to_string(),
            })
    }

    /// Case-insensitive; returns the upper-case canonical operator.
    pub fn validate_operator(operator: &str) -> Result<&'static str, GuardError> {
        let upper = operator.to_uppercase();
        ALLOWED_OPERATORS
            .iter()
            .find(|allowed| **allowed == upper)
            .copied()
            .ok_or_else(|| GuardError::OperatorNotAllowed(operator.to_string()))
    }

    /// AND-joins the conditions in input order. An empty list yields `TRUE`.
    /// `params` is handed back untouched.
    pub fn build_where_clause(
        table: &str,
        conditions: &[Condition<'_>],
        params: Params,
    ) -> Result<(Fragment, Params), GuardError> {
        let fragment = Self::where_fragment(table, conditions, &params)?;
        Ok((fragment, params))
    }

    /// Single validated condition.
    pub fn condition(
        table: &str,
        column: &str,
        operator: &str,
        param: &str,
        params: &Params,
    ) -> Result<Fragment, GuardError> {
        Self::where_fragment(table, &[Condition::new(column, operator, param)], params)
    }

    /// Builds `col = :set_col, ...` and returns only the consumed parameters.
    pub fn build_set_clause(
        table: &str,
        update_fields: &[&str],
        params: &Params,
    ) -> Result<(Fragment, Params), GuardError> {
        if update_fields.is_empty() {
            return Err(GuardError::NoFieldsForUpdate);
        }

        let mut assignments = Vec::with_capacity(update_fields.len());
        let mut consumed = Params::new();

        for field in update_fields {
            let column = Self::validate_column(table, field)?;
            let param_name = format!("{SET_PARAM_PREFIX}{field}");
            let value = params
                .get(&param_name)
                .ok_or_else(|| GuardError::ParameterNotFound(param_name.clone()))?;

            assignments.push(format!("{column} = :{param_name}"));
            consumed.insert(param_name, value.clone());
        }

        Ok((Fragment::new(assignments.join(", ")), consumed))
    }

    /// Accepts a hand-written filter only if it is exactly
    /// `<column> <operator> :<param>` over whitelisted parts and contains
    /// nothing from the denylist.
    pub fn check_raw_filter(table: &str, raw: &str) -> Result<Fragment, GuardError> {
        let unsafe_filter = || GuardError::UnsafeFilter(raw.to_string());

        let padded = format!(" {} ", raw.to_lowercase());
        if DENYLIST.iter().any(|bad| padded.contains(bad)) {
            return Err(unsafe_filter());
        }

        let tokens: Vec<&str> = raw.split_whitespace().collect();
        let (column, operator, placeholder) = match tokens.as_slice() {
            [column, operator, placeholder] => (*column, operator.to_string(), *placeholder),
            [column, not, inn, placeholder] => (*column, format!("{not} {inn}"), *placeholder),
            _ => return Err(unsafe_filter()),
        };

        let param = placeholder
            .strip_prefix(':')
            .filter(|name| is_param_name(name))
            .ok_or_else(unsafe_filter)?;

        let column = Self::validate_column(table, column)?;
        let operator = Self::validate_operator(&operator)?;

        Ok(Fragment::new(render(column, operator, param)))
    }

    fn where_fragment(
        table: &str,
        conditions: &[Condition<'_>],
        params: &Params,
    ) -> Result<Fragment, GuardError> {
        if conditions.is_empty() {
            return Ok(Fragment::always_true());
        }

        let mut parts = Vec::with_capacity(conditions.len());
        for condition in conditions {
            let column = Self::validate_column(table, condition.column)?;
            let operator = Self::validate_operator(condition.operator)?;

            if !params.contains_key(condition.param) {
                return Err(GuardError::ParameterNotFound(condition.param.to_string()));
            }

            parts.push(render(column, operator, condition.param));
        }

        Ok(Fragment::new(parts.join(" AND ")))
    }
}

fn render(column: &str, operator: &str, param: &str) -> String {
    match operator {
        // SQLite needs the set in parentheses
        "IN" | "NOT IN" => format!("{column} {operator} (:{param})"),
        _ => format!("{column} {operator} :{param}"),
    }
}

fn is_param_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
