//! Find-list query construction.
//!
//! The remote repository exposes one generic listing endpoint per entity
//! (`PUT /crud/dto/list/{entity}`). A query is a pagination window, an
//! ordered list of column projections (order defines both the projection and
//! the multi-key sort), and a set of attribute filters combined with implicit
//! AND semantics on the server side. Primary-key columns are always returned
//! and never need to be projected explicitly — a remote-side convention, not
//! something this layer enforces.
//!
//! This module is pure data assembly: invalid property names or
//! operator/operand mismatches are only detected by the remote service.

use serde_json::{json, Value};

/// Default (and server-side maximum) number of rows per find-list call.
/// Callers wanting more results must page manually by advancing `start`.
pub const DEFAULT_BATCH_SIZE: u32 = 500;

/// Sort direction for a projected column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Ascending,
    Descending,
    #[default]
    Unspecified,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASCENDING",
            SortDirection::Descending => "DESCENDING",
            SortDirection::Unspecified => "UNSPECIFIED",
        }
    }
}

/// Relational/set operators accepted by operator filters.
///
/// Wire names are part of the remote contract and must match exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlOperator {
    Between,
    Contains,
    CurrentUser,
    CurrentUserEmployee,
    CurrentUserShop,
    Empty,
    EndsWith,
    Equal,
    EqualColumn,
    EqualOrNull,
    Exists,
    GreaterThan,
    GreaterThanColumn,
    GreaterThanOrEqual,
    GreaterThanOrEqualColumn,
    GreaterThanPercentColumn,
    In,
    InLast,
    InNext,
    LessThan,
    LessThanColumn,
    LessThanOrEqual,
    LessThanOrEqualColumn,
    LessThanPercentColumn,
    Like,
    MatchAll,
    MatchAny,
    NewerThan,
    NotContains,
    NotEmpty,
    NotExists,
    NotExpired,
    NotIn,
    NotLike,
    NotNull,
    NotEqual,
    Null,
    OlderThan,
    ReallyEqual,
    ReallyGreaterThanOrEqual,
    ReallyLessThanOrEqual,
    StartsWith,
    Within,
}

impl SqlOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            SqlOperator::Between => "BETWEEN",
            SqlOperator::Contains => "CONTAINS",
            SqlOperator::CurrentUser => "CURRENT_USER",
            SqlOperator::CurrentUserEmployee => "CURRENT_USER_EMPLOYEE",
            SqlOperator::CurrentUserShop => "CURRENT_USER_SHOP",
            SqlOperator::Empty => "EMPTY",
            SqlOperator::EndsWith => "ENDS_WITH",
            SqlOperator::Equal => "EQUAL",
            SqlOperator::EqualColumn => "EQUAL_COLUMN",
            SqlOperator::EqualOrNull => "EQUAL_OR_NULL",
            SqlOperator::Exists => "EXISTS",
            SqlOperator::GreaterThan => "GREATERTHAN",
            SqlOperator::GreaterThanColumn => "GREATERTHAN_COLUMN",
            SqlOperator::GreaterThanOrEqual => "GREATERTHANOREQUAL",
            SqlOperator::GreaterThanOrEqualColumn => "GREATERTHANOREQUAL_COLUMN",
            SqlOperator::GreaterThanPercentColumn => "GREATERTHANPERCENT_COLUMN",
            SqlOperator::In => "IN",
            SqlOperator::InLast => "INLAST",
            SqlOperator::InNext => "INNEXT",
            SqlOperator::LessThan => "LESSTHAN",
            SqlOperator::LessThanColumn => "LESSTHAN_COLUMN",
            SqlOperator::LessThanOrEqual => "LESSTHANOREQUAL",
            SqlOperator::LessThanOrEqualColumn => "LESSTHANOREQUAL_COLUMN",
            SqlOperator::LessThanPercentColumn => "LESSTHANPERCENT_COLUMN",
            SqlOperator::Like => "LIKE",
            SqlOperator::MatchAll => "MATCH_ALL",
            SqlOperator::MatchAny => "MATCH_ANY",
            SqlOperator::NewerThan => "NEWERTHAN",
            SqlOperator::NotContains => "NOT_CONTAINS",
            SqlOperator::NotEmpty => "NOT_EMPTY",
            SqlOperator::NotExists => "NOT_EXISTS",
            SqlOperator::NotExpired => "NOT_EXPIRED",
            SqlOperator::NotIn => "NOT_IN",
            SqlOperator::NotLike => "NOT_LIKE",
            SqlOperator::NotNull => "NOT_NULL",
            SqlOperator::NotEqual => "NOTEQUAL",
            SqlOperator::Null => "NULL",
            SqlOperator::OlderThan => "OLDERTHAN",
            SqlOperator::ReallyEqual => "REALLY_EQUAL",
            SqlOperator::ReallyGreaterThanOrEqual => "REALLY_GREATERTHANOREQUAL",
            SqlOperator::ReallyLessThanOrEqual => "REALLY_LESSTHANOREQUAL",
            SqlOperator::StartsWith => "STARTS_WITH",
            SqlOperator::Within => "WITHIN",
        }
    }
}

/// A projected column with an optional sort direction.
///
/// Property names must be the camelCase form of the table column name.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub property: String,
    pub direction: SortDirection,
}

impl ColumnSpec {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            direction: SortDirection::Unspecified,
        }
    }

    pub fn sorted(property: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            property: property.into(),
            direction,
        }
    }

    fn to_value(&self) -> Value {
        json!({
            "property": self.property,
            "direction": self.direction.as_str(),
        })
    }
}

/// An attribute filter: either a bare equality or a named operator over a
/// list of operand values.
#[derive(Debug, Clone)]
pub enum Attribute {
    Equals {
        column: String,
        value: Value,
    },
    Operator {
        column: String,
        values: Vec<Value>,
        operator: SqlOperator,
    },
}

impl Attribute {
    pub fn equals(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Attribute::Equals {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn operator(
        column: impl Into<String>,
        values: Vec<Value>,
        operator: SqlOperator,
    ) -> Self {
        Attribute::Operator {
            column: column.into(),
            values,
            operator,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Attribute::Equals { column, value } => json!({ (column.as_str()): value }),
            Attribute::Operator {
                column,
                values,
                operator,
            } => json!({
                (column.as_str()): {
                    "values": values,
                    "sqlOperator": operator.as_str(),
                }
            }),
        }
    }
}

/// An immutable find-list request body.
///
/// ```
/// use git_doc_mapper::query::{Attribute, ColumnSpec, FindListQuery, SortDirection, SqlOperator};
/// use serde_json::json;
///
/// let mut query = FindListQuery::new(0, 500);
/// query.add_column(ColumnSpec::sorted("statusCode", SortDirection::Ascending));
/// query.add_column(ColumnSpec::new("utilityType"));
/// query.add_attribute(Attribute::operator(
///     "statusCode",
///     vec![json!("OPEN"), json!("OPEN-VER-SUCCESS")],
///     SqlOperator::In,
/// ));
/// query.add_attribute(Attribute::equals("billingPeriod", "FY25-05-NOV"));
/// let body = query.body();
/// ```
#[derive(Debug, Clone)]
pub struct FindListQuery {
    start: u32,
    batch_size: u32,
    columns: Vec<ColumnSpec>,
    attributes: Vec<Attribute>,
}

impl FindListQuery {
    pub fn new(start: u32, batch_size: u32) -> Self {
        Self {
            start,
            batch_size,
            columns: Vec::new(),
            attributes: Vec::new(),
        }
    }

    pub fn add_column(&mut self, column: ColumnSpec) {
        self.columns.push(column);
    }

    pub fn add_attribute(&mut self, attribute: Attribute) {
        self.attributes.push(attribute);
    }

    /// Serialize to the three-section request body the list endpoint expects.
    pub fn body(&self) -> Value {
        json!({
            "start": self.start,
            "batchSize": self.batch_size,
            "columnSpecifications": self.columns.iter().map(ColumnSpec::to_value).collect::<Vec<_>>(),
            "query": {
                "attributes": self.attributes.iter().map(Attribute::to_value).collect::<Vec<_>>(),
            },
        })
    }
}

impl Default for FindListQuery {
    fn default() -> Self {
        Self::new(0, DEFAULT_BATCH_SIZE)
    }
}
