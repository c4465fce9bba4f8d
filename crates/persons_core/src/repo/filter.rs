//! Predicates, ordering and paging for generic repository queries.
//!
//! # Invariants
//! - Column names are checked against entity metadata before any SQL is built;
//!   values are always bound, never interpolated.
//! - An empty `Filter` matches every row.

use crate::model::Entity;
use crate::repo::error::{RepoError, RepoResult};
use rusqlite::types::Value;

pub const PAGE_SIZE_DEFAULT: u32 = 10;
pub const PAGE_SIZE_MAX: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Comparison {
    fn operator(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Compare {
        column: String,
        comparison: Comparison,
        value: Value,
    },
    Contains {
        column: String,
        needle: String,
    },
    In {
        column: String,
        values: Vec<Value>,
    },
}

impl Condition {
    fn column(&self) -> &str {
        match self {
            Self::Compare { column, .. }
            | Self::Contains { column, .. }
            | Self::In { column, .. } => column.as_str(),
        }
    }
}

/// Conjunction of column conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.compare(column, Comparison::Eq, value)
    }

    pub fn ne(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.compare(column, Comparison::Ne, value)
    }

    pub fn lt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.compare(column, Comparison::Lt, value)
    }

    pub fn le(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.compare(column, Comparison::Le, value)
    }

    pub fn gt(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.compare(column, Comparison::Gt, value)
    }

    pub fn ge(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.compare(column, Comparison::Ge, value)
    }

    /// Case-insensitive (ASCII) substring match.
    pub fn contains(mut self, column: impl Into<String>, needle: impl Into<String>) -> Self {
        self.conditions.push(Condition::Contains {
            column: column.into(),
            needle: needle.into(),
        });
        self
    }

    /// Membership test. An empty value list matches nothing.
    pub fn is_in<V: Into<Value>>(
        mut self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.conditions.push(Condition::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    fn compare(
        mut self,
        column: impl Into<String>,
        comparison: Comparison,
        value: impl Into<Value>,
    ) -> Self {
        self.conditions.push(Condition::Compare {
            column: column.into(),
            comparison,
            value: value.into(),
        });
        self
    }

    /// Compiles to a `WHERE` fragment (empty when unfiltered) plus bound values.
    pub(crate) fn to_sql<T: Entity>(&self) -> RepoResult<(String, Vec<Value>)> {
        if self.conditions.is_empty() {
            return Ok((String::new(), Vec::new()));
        }

        let mut clauses = Vec::with_capacity(self.conditions.len());
        let mut bind_values = Vec::new();
        for condition in &self.conditions {
            let column = checked_column::<T>(condition.column())?;
            match condition {
                Condition::Compare {
                    comparison, value, ..
                } => {
                    clauses.push(format!("{column} {} ?", comparison.operator()));
                    bind_values.push(value.clone());
                }
                Condition::Contains { needle, .. } => {
                    clauses.push(format!("{column} LIKE ? ESCAPE '\\'"));
                    bind_values.push(Value::Text(format!("%{}%", escape_like(needle))));
                }
                Condition::In { values, .. } if values.is_empty() => {
                    clauses.push("0 = 1".to_string());
                }
                Condition::In { values, .. } => {
                    let placeholders = vec!["?"; values.len()].join(", ");
                    clauses.push(format!("{column} IN ({placeholders})"));
                    bind_values.extend(values.iter().cloned());
                }
            }
        }

        Ok((format!(" WHERE {}", clauses.join(" AND ")), bind_values))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// Result ordering. Ties are always broken by ascending id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Ascending,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Descending,
        }
    }

    pub(crate) fn to_sql<T: Entity>(order: Option<&OrderBy>) -> RepoResult<String> {
        let Some(order) = order else {
            return Ok(" ORDER BY id ASC".to_string());
        };
        let column = checked_column::<T>(&order.column)?;
        let direction = match order.direction {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        };
        if column == "id" {
            return Ok(format!(" ORDER BY id {direction}"));
        }
        Ok(format!(" ORDER BY {column} {direction}, id ASC"))
    }
}

/// One-based page selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    number: u32,
    size: u32,
}

impl Page {
    /// Page number `0` is treated as `1`; size is clamped to `1..=100`,
    /// with `0` meaning the default of 10.
    pub fn new(number: u32, size: u32) -> Self {
        let size = match size {
            0 => PAGE_SIZE_DEFAULT,
            value => value.min(PAGE_SIZE_MAX),
        };
        Self {
            number: number.max(1),
            size,
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new(1, PAGE_SIZE_DEFAULT)
    }
}

/// Query options for list reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filter: Filter,
    pub order_by: Option<OrderBy>,
    pub page: Option<Page>,
}

impl ListQuery {
    pub fn filtered(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }

    pub fn ordered_by(mut self, order_by: OrderBy) -> Self {
        self.order_by = Some(order_by);
        self
    }

    pub fn paged(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }
}

fn checked_column<T: Entity>(column: &str) -> RepoResult<&str> {
    if T::has_column(column) {
        Ok(column)
    } else {
        Err(RepoError::UnknownColumn {
            kind: T::KIND,
            name: column.to_string(),
        })
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
