//! # Query Plan
//!
//! A [`QueryPlan`] accumulates declarative query fragments (select list, table,
//! joins, predicates, grouping, ordering, paging) without executing anything.
//! Every declaration consumes the plan and returns it, so a plan reads like the
//! query it describes:
//!
//! ```rust
//! use gridcrate::plan::{JoinKind, QueryPlan};
//!
//! let plan = QueryPlan::from_table("users")
//!     .select("users.id, users.name, CONCAT(first, ' ', last) as full_name")
//!     .join("roles", "roles.id = users.role_id", JoinKind::Left)
//!     .and_where("users.active", 1);
//!
//! assert_eq!(plan.aliases(), vec!["users.id", "users.name", "concat(first, ' ', last)"]);
//! ```
//!
//! Plans are compiled by [`compile`] and executed through a
//! [`DataSource`](crate::core::DataSource). Each request works on its own
//! clone; a plan is never shared between requests.

pub mod compile;
pub mod predicate;

use sea_orm::{Value, sea_query::Order};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::splitter::{split, strip_as_clause};
pub use predicate::{Connector, Fragment, LikeSide, PredicateEntry};

/// One selected column: the backend expression and its normalized alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectColumn {
    /// Backend expression with any `AS` clause removed.
    pub expression: String,
    /// Lower-cased expression, the key used for row values and lookups.
    pub alias: String,
}

impl SelectColumn {
    /// Parse one entry of a select list.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let expression = strip_as_clause(raw);
        let alias = expression.to_lowercase();
        Self { expression, alias }
    }

    /// `*` and `table.*` entries expand on the backend and carry no alias.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.expression.ends_with('*')
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Parse a client direction. Anything other than `desc` sorts ascending.
    #[must_use]
    pub fn parse(direction: &str) -> Self {
        if direction.trim().eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }
}

impl From<SortDirection> for Order {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Asc => Self::Asc,
            SortDirection::Desc => Self::Desc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    pub expression: String,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    /// Parse `"left"`, `"left outer"`, `"right"`, ...; unknown kinds join inner.
    #[must_use]
    pub fn parse(kind: &str) -> Self {
        let kind = kind.trim().to_ascii_lowercase();
        match kind.split_whitespace().next() {
            Some("left") => Self::Left,
            Some("right") => Self::Right,
            Some("full") => Self::Full,
            _ => Self::Inner,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub table: String,
    pub condition: String,
    pub kind: JoinKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupBy {
    pub expression: String,
    pub plan_only: bool,
}

/// Declarative, backend-agnostic description of a select query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPlan {
    table: Option<String>,
    columns: Vec<SelectColumn>,
    joins: Vec<Join>,
    distinct: bool,
    group_by: Vec<GroupBy>,
    order_by: Vec<OrderClause>,
    predicates: Vec<PredicateEntry>,
    having: Vec<String>,
    limit: Option<u64>,
    offset: u64,
    include_plan_only: bool,
}

impl QueryPlan {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_table(table: impl Into<String>) -> Self {
        Self::new().from(table)
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    #[must_use]
    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into().trim().to_string());
        self
    }

    /// Add a comma separated select list. Commas inside calls do not split.
    #[must_use]
    pub fn select(mut self, columns: &str) -> Self {
        self.columns.extend(
            split(",", columns)
                .iter()
                .filter(|raw| !raw.trim().is_empty())
                .map(|raw| SelectColumn::parse(raw)),
        );
        self
    }

    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    #[must_use]
    pub fn join(mut self, table: impl Into<String>, condition: impl Into<String>, kind: JoinKind) -> Self {
        self.joins.push(Join {
            table: table.into(),
            condition: condition.into(),
            kind,
        });
        self
    }

    #[must_use]
    pub fn group_by(mut self, expression: impl Into<String>) -> Self {
        self.group_by.push(GroupBy {
            expression: expression.into(),
            plan_only: false,
        });
        self
    }

    /// Grouping that only applies when deriving the total count.
    #[must_use]
    pub fn plan_only_group_by(mut self, expression: impl Into<String>) -> Self {
        self.group_by.push(GroupBy {
            expression: expression.into(),
            plan_only: true,
        });
        self
    }

    #[must_use]
    pub fn order_by(mut self, expression: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by.push(OrderClause {
            expression: expression.into(),
            direction,
        });
        self
    }

    #[must_use]
    pub fn having(mut self, condition: impl Into<String>) -> Self {
        self.having.push(condition.into());
        self
    }

    /// `LIMIT length OFFSET offset`.
    #[must_use]
    pub fn limit(mut self, length: u64, offset: u64) -> Self {
        self.limit = Some(length);
        self.offset = offset;
        self
    }

    fn clause(mut self, connector: Connector, fragment: Fragment, plan_only: bool) -> Self {
        self.predicates.push(PredicateEntry::Clause {
            connector,
            fragment,
            plan_only,
        });
        self
    }

    /// `AND key = value`; the key may carry its own operator (`"price >="`).
    #[must_use]
    pub fn and_where(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let fragment = Fragment::Compare {
            key: key.into(),
            value: value.into(),
        };
        self.clause(Connector::And, fragment, false)
    }

    #[must_use]
    pub fn or_where(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let fragment = Fragment::Compare {
            key: key.into(),
            value: value.into(),
        };
        self.clause(Connector::Or, fragment, false)
    }

    /// `AND (<sql>)` with the SQL passed through as written.
    #[must_use]
    pub fn where_raw(self, sql: impl Into<String>) -> Self {
        self.clause(Connector::And, Fragment::Raw(sql.into()), false)
    }

    #[must_use]
    pub fn or_where_raw(self, sql: impl Into<String>) -> Self {
        self.clause(Connector::Or, Fragment::Raw(sql.into()), false)
    }

    /// A predicate that is recorded on the plan but only takes part in the
    /// total-count query, never in the page fetch.
    #[must_use]
    pub fn plan_only_where(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let fragment = Fragment::Compare {
            key: key.into(),
            value: value.into(),
        };
        self.clause(Connector::And, fragment, true)
    }

    #[must_use]
    pub fn plan_only_where_raw(self, sql: impl Into<String>) -> Self {
        self.clause(Connector::And, Fragment::Raw(sql.into()), true)
    }

    #[must_use]
    pub fn where_in<V, I>(self, key: impl Into<String>, values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        let fragment = Fragment::In {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
        };
        self.clause(Connector::And, fragment, false)
    }

    #[must_use]
    pub fn like(self, key: impl Into<String>, value: impl Into<String>, side: LikeSide) -> Self {
        let fragment = Fragment::Like {
            key: key.into(),
            value: value.into(),
            side,
        };
        self.clause(Connector::And, fragment, false)
    }

    #[must_use]
    pub fn or_like(self, key: impl Into<String>, value: impl Into<String>, side: LikeSide) -> Self {
        let fragment = Fragment::Like {
            key: key.into(),
            value: value.into(),
            side,
        };
        self.clause(Connector::Or, fragment, false)
    }

    /// LIKE on the first column of a comma separated list, OR LIKE on the rest.
    ///
    /// No bracket is opened; wrap the call in [`group_start`](Self::group_start)
    /// and [`group_end`](Self::group_end) when combining with other predicates.
    #[must_use]
    pub fn like_any(self, columns: &str, value: &str) -> Self {
        split(",", columns)
            .iter()
            .map(|column| column.trim())
            .filter(|column| !column.is_empty())
            .enumerate()
            .fold(self, |plan, (index, column)| {
                if index == 0 {
                    plan.like(column, value, LikeSide::Both)
                } else {
                    plan.or_like(column, value, LikeSide::Both)
                }
            })
    }

    #[must_use]
    pub fn group_start(mut self) -> Self {
        self.predicates.push(PredicateEntry::GroupStart {
            connector: Connector::And,
        });
        self
    }

    #[must_use]
    pub fn or_group_start(mut self) -> Self {
        self.predicates.push(PredicateEntry::GroupStart {
            connector: Connector::Or,
        });
        self
    }

    #[must_use]
    pub fn group_end(mut self) -> Self {
        self.predicates.push(PredicateEntry::GroupEnd);
        self
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    #[must_use]
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Selected columns in client column order.
    #[must_use]
    pub fn columns(&self) -> &[SelectColumn] {
        &self.columns
    }

    #[must_use]
    pub fn aliases(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|column| !column.is_wildcard())
            .map(|column| column.alias.as_str())
            .collect()
    }

    #[must_use]
    pub fn position_of(&self, alias: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.alias == alias)
    }

    #[must_use]
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    #[must_use]
    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    #[must_use]
    pub fn group_by_clauses(&self) -> &[GroupBy] {
        &self.group_by
    }

    #[must_use]
    pub fn order_clauses(&self) -> &[OrderClause] {
        &self.order_by
    }

    #[must_use]
    pub fn predicates(&self) -> &[PredicateEntry] {
        &self.predicates
    }

    #[must_use]
    pub fn having_clauses(&self) -> &[String] {
        &self.having
    }

    #[must_use]
    pub fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    #[must_use]
    pub fn offset_value(&self) -> u64 {
        self.offset
    }

    /// Whether plan-only fragments are compiled into this plan.
    #[must_use]
    pub fn includes_plan_only(&self) -> bool {
        self.include_plan_only
    }

    // ========================================================================
    // Derived plans
    // ========================================================================

    /// Copy of this plan for the unfiltered total: plan-only fragments are
    /// included, ordering and paging are dropped.
    #[must_use]
    pub fn for_total_count(&self) -> Self {
        let mut plan = self.without_paging();
        plan.include_plan_only = true;
        plan
    }

    /// Split off the declared order clauses, leaving the plan unordered.
    #[must_use]
    pub fn without_order(mut self) -> (Self, Vec<OrderClause>) {
        let clauses = std::mem::take(&mut self.order_by);
        (self, clauses)
    }

    /// Copy of this plan without ordering, limit or offset.
    #[must_use]
    pub fn without_paging(&self) -> Self {
        let mut plan = self.clone();
        plan.order_by.clear();
        plan.limit = None;
        plan.offset = 0;
        plan
    }
}
