//! Comparison operators and sort directions accepted by the builder.

use std::fmt;
use std::str::FromStr;

use miniorm_core::Error;

/// The fixed set of predicate operators.
///
/// Only these tokens are ever written into SQL text; anything else is
/// rejected before a statement is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`
    Eq,
    /// `<>`
    NotEqAnsi,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
    /// `LIKE`
    Like,
    /// `NOT LIKE`
    NotLike,
    /// `IN`
    In,
    /// `NOT IN`
    NotIn,
    /// `BETWEEN`
    Between,
    /// `IS`
    Is,
    /// `IS NOT`
    IsNot,
}

impl Operator {
    /// Every accepted operator.
    pub const ALL: [Operator; 14] = [
        Operator::Eq,
        Operator::NotEqAnsi,
        Operator::NotEq,
        Operator::Lt,
        Operator::Gt,
        Operator::Le,
        Operator::Ge,
        Operator::Like,
        Operator::NotLike,
        Operator::In,
        Operator::NotIn,
        Operator::Between,
        Operator::Is,
        Operator::IsNot,
    ];

    /// The SQL token.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEqAnsi => "<>",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Le => "<=",
            Operator::Ge => ">=",
            Operator::Like => "LIKE",
            Operator::NotLike => "NOT LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Between => "BETWEEN",
            Operator::Is => "IS",
            Operator::IsNot => "IS NOT",
        }
    }

    /// `IN` and `NOT IN`.
    #[must_use]
    pub const fn is_membership(self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }

    /// `IS` and `IS NOT`.
    #[must_use]
    pub const fn is_null_test(self) -> bool {
        matches!(self, Operator::Is | Operator::IsNot)
    }

    /// Parse an operator token. Case-insensitive; surrounding whitespace is
    /// ignored and inner runs of whitespace collapse (`"not   like"`).
    pub fn parse(token: &str) -> Result<Self, Error> {
        let normalized = token
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();
        Operator::ALL
            .into_iter()
            .find(|op| op.as_sql() == normalized)
            .ok_or_else(|| Error::invalid_argument(format!("Invalid SQL operator: {}", token.trim())))
    }
}

impl FromStr for Operator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::parse(s)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Sort direction for `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl Order {
    /// The SQL keyword.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }

    /// Parse `ASC`/`DESC`, case-insensitive.
    pub fn parse(direction: &str) -> Result<Self, Error> {
        match direction.trim().to_uppercase().as_str() {
            "ASC" => Ok(Order::Asc),
            "DESC" => Ok(Order::Desc),
            _ => Err(Error::invalid_argument(format!(
                "Invalid sort direction: {}",
                direction.trim()
            ))),
        }
    }
}

impl FromStr for Order {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Order::parse(s)
    }
}
