//! WHERE fragments and bracketed grouping.
//!
//! Predicates are recorded as a flat sequence, the same way they are declared:
//! each entry carries the connector joining it to whatever came before it, and
//! `GroupStart`/`GroupEnd` entries open and close a bracketed sub-expression.
//! [`build_condition`] turns that sequence into a nested [`Condition`] that
//! respects SQL precedence, so `a AND b OR c` becomes `(a AND b) OR c`.

use sea_orm::{
    Value,
    sea_query::{
        BinOper, Cond, Condition, ConditionExpression, Expr, LikeExpr, SimpleExpr,
    },
};

/// Escape character used for every generated LIKE pattern.
pub const LIKE_ESCAPE: char = '!';

/// Escape LIKE wildcards (and the escape character itself) with [`LIKE_ESCAPE`].
#[must_use]
pub fn escape_like_wildcards(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if c == LIKE_ESCAPE || c == '%' || c == '_' {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped
}

/// How an entry is joined to the entry before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

/// Which side(s) of a LIKE value receive the `%` wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LikeSide {
    #[default]
    Both,
    /// `%value`
    Before,
    /// `value%`
    After,
    /// Exact match through LIKE, no wildcards added.
    None,
}

impl LikeSide {
    #[must_use]
    pub fn pattern(self, value: &str) -> String {
        let escaped = escape_like_wildcards(value);
        match self {
            Self::Both => format!("%{escaped}%"),
            Self::Before => format!("%{escaped}"),
            Self::After => format!("{escaped}%"),
            Self::None => escaped,
        }
    }
}

/// A single comparison fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// `key` may end in an operator (`"age >="`); plain keys compare with `=`.
    Compare { key: String, value: Value },
    /// Raw SQL, passed through uninterpreted.
    Raw(String),
    In { key: String, values: Vec<Value> },
    Like { key: String, value: String, side: LikeSide },
}

const SYMBOL_OPERATORS: [&str; 7] = ["<>", "!=", "<=", ">=", "=", "<", ">"];
const WORD_OPERATORS: [&str; 2] = [" not like", " like"];

/// Split a key such as `"price >="` into (`"price"`, `">="`).
fn split_operator(key: &str) -> (&str, &str) {
    let trimmed = key.trim();
    for operator in SYMBOL_OPERATORS {
        if let Some(column) = trimmed.strip_suffix(operator) {
            return (column.trim_end(), operator);
        }
    }
    let lowered = trimmed.to_ascii_lowercase();
    for operator in WORD_OPERATORS {
        if lowered.ends_with(operator) {
            let column = &trimmed[..trimmed.len() - operator.len()];
            return (column.trim_end(), operator.trim());
        }
    }
    (trimmed, "=")
}

impl Fragment {
    /// Render into a sea-query expression with bound values.
    #[must_use]
    pub fn to_expr(&self) -> SimpleExpr {
        match self {
            Self::Compare { key, value } => {
                let (column, operator) = split_operator(key);
                let operator = match operator {
                    "<>" | "!=" => BinOper::NotEqual,
                    "<=" => BinOper::SmallerThanOrEqual,
                    ">=" => BinOper::GreaterThanOrEqual,
                    "<" => BinOper::SmallerThan,
                    ">" => BinOper::GreaterThan,
                    "like" => BinOper::Like,
                    "not like" => BinOper::NotLike,
                    _ => BinOper::Equal,
                };
                Expr::expr(Expr::cust(column)).binary(operator, value.clone())
            }
            Self::Raw(sql) => Expr::cust(sql.clone()),
            Self::In { key, values } => {
                if values.is_empty() {
                    // Empty IN list matches nothing
                    return Expr::cust("1 = 0");
                }
                Expr::expr(Expr::cust(key.trim())).is_in(values.clone())
            }
            Self::Like { key, value, side } => Expr::expr(Expr::cust(key.trim()))
                .like(LikeExpr::new(side.pattern(value)).escape(LIKE_ESCAPE)),
        }
    }
}

/// One entry in a plan's predicate sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum PredicateEntry {
    Clause {
        connector: Connector,
        fragment: Fragment,
        /// Recorded on the plan but only compiled into the total-count query.
        plan_only: bool,
    },
    GroupStart {
        connector: Connector,
    },
    GroupEnd,
}

/// One bracket level while folding entries: OR-separated runs of AND terms.
struct Frame {
    connector: Connector,
    runs: Condition,
    run: Condition,
}

impl Frame {
    fn new(connector: Connector) -> Self {
        Self {
            connector,
            runs: Cond::any(),
            run: Cond::all(),
        }
    }

    fn push<C: Into<ConditionExpression>>(&mut self, connector: Connector, node: C) {
        if connector == Connector::Or && !self.run.is_empty() {
            let run = std::mem::replace(&mut self.run, Cond::all());
            self.runs = std::mem::replace(&mut self.runs, Cond::any()).add(run);
        }
        self.run = std::mem::replace(&mut self.run, Cond::all()).add(node);
    }

    fn finish(self) -> Condition {
        if self.runs.is_empty() {
            return self.run;
        }
        if self.run.is_empty() {
            self.runs
        } else {
            self.runs.add(self.run)
        }
    }
}

/// Fold a predicate sequence into a nested condition.
///
/// Unclosed groups are closed at the end and stray `GroupEnd` entries are
/// ignored. Empty groups disappear instead of producing `()`.
#[must_use]
pub fn build_condition(entries: &[PredicateEntry], include_plan_only: bool) -> Condition {
    let mut stack = vec![Frame::new(Connector::And)];

    for entry in entries {
        match entry {
            PredicateEntry::Clause {
                connector,
                fragment,
                plan_only,
            } => {
                if *plan_only && !include_plan_only {
                    continue;
                }
                if let Some(frame) = stack.last_mut() {
                    frame.push(*connector, fragment.to_expr());
                }
            }
            PredicateEntry::GroupStart { connector } => stack.push(Frame::new(*connector)),
            PredicateEntry::GroupEnd => close_group(&mut stack),
        }
    }

    if stack.len() > 1 {
        tracing::warn!(open_groups = stack.len() - 1, "Closing unbalanced predicate groups");
        while stack.len() > 1 {
            close_group(&mut stack);
        }
    }

    stack.pop().map_or_else(Cond::all, Frame::finish)
}

fn close_group(stack: &mut Vec<Frame>) {
    if stack.len() < 2 {
        tracing::warn!("Ignoring group end without a matching group start");
        return;
    }
    let Some(frame) = stack.pop() else { return };
    let connector = frame.connector;
    let condition = frame.finish();
    if condition.is_empty() {
        return;
    }
    if let Some(parent) = stack.last_mut() {
        parent.push(connector, condition);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::sea_query::{Query, SqliteQueryBuilder};

    fn render(entries: &[PredicateEntry]) -> String {
        Query::select()
            .expr(Expr::cust("1"))
            .cond_where(build_condition(entries, false))
            .to_string(SqliteQueryBuilder)
    }

    /// Custom expressions pick up defensive parentheses; compare without them
    fn squash(sql: &str) -> String {
        sql.replace(['(', ')'], "")
    }

    fn clause(connector: Connector, sql: &str) -> PredicateEntry {
        PredicateEntry::Clause {
            connector,
            fragment: Fragment::Raw(sql.to_string()),
            plan_only: false,
        }
    }

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like_wildcards("abc"), "abc");
        assert_eq!(escape_like_wildcards("100%"), "100!%");
        assert_eq!(escape_like_wildcards("a_b"), "a!_b");
        assert_eq!(escape_like_wildcards("wow!"), "wow!!");
    }

    #[test]
    fn test_like_side_patterns() {
        assert_eq!(LikeSide::Both.pattern("jo"), "%jo%");
        assert_eq!(LikeSide::Before.pattern("jo"), "%jo");
        assert_eq!(LikeSide::After.pattern("jo"), "jo%");
        assert_eq!(LikeSide::None.pattern("jo"), "jo");
    }

    #[test]
    fn test_split_operator() {
        assert_eq!(split_operator("price >="), ("price", ">="));
        assert_eq!(split_operator("price>"), ("price", ">"));
        assert_eq!(split_operator("status !="), ("status", "!="));
        assert_eq!(split_operator("name like"), ("name", "like"));
        assert_eq!(split_operator("name NOT LIKE"), ("name", "not like"));
        assert_eq!(split_operator(" id "), ("id", "="));
    }

    #[test]
    fn test_compare_binds_value() {
        let sql = render(&[PredicateEntry::Clause {
            connector: Connector::And,
            fragment: Fragment::Compare {
                key: "age >=".to_string(),
                value: 18.into(),
            },
            plan_only: false,
        }]);
        assert!(squash(&sql).ends_with("WHERE age >= 18"), "got: {sql}");
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let sql = render(&[
            clause(Connector::And, "a = 1"),
            clause(Connector::And, "b = 2"),
            clause(Connector::Or, "c = 3"),
        ]);
        assert!(squash(&sql).contains("a = 1 AND b = 2 OR c = 3"), "got: {sql}");
    }

    #[test]
    fn test_group_is_parenthesized() {
        let sql = render(&[
            clause(Connector::And, "active = 1"),
            PredicateEntry::GroupStart {
                connector: Connector::And,
            },
            clause(Connector::And, "name LIKE 'x'"),
            clause(Connector::Or, "email LIKE 'x'"),
            PredicateEntry::GroupEnd,
        ]);
        assert!(
            squash(&sql).contains("active = 1 AND name LIKE 'x' OR email LIKE 'x'"),
            "got: {sql}"
        );
        // The OR group must be bracketed against the AND
        let group_open = sql.rfind('(').unwrap_or(0);
        assert!(group_open < sql.find("email").unwrap_or(0), "got: {sql}");
        assert!(sql.trim_end().ends_with(')'), "got: {sql}");
    }

    #[test]
    fn test_empty_group_disappears() {
        let entries = [
            PredicateEntry::GroupStart {
                connector: Connector::And,
            },
            PredicateEntry::GroupEnd,
        ];
        assert!(build_condition(&entries, false).is_empty());
    }

    #[test]
    fn test_unbalanced_groups_are_tolerated() {
        let open = render(&[
            PredicateEntry::GroupStart {
                connector: Connector::And,
            },
            clause(Connector::And, "a = 1"),
        ]);
        assert!(squash(&open).contains("a = 1"), "got: {open}");

        let stray = render(&[PredicateEntry::GroupEnd, clause(Connector::And, "b = 2")]);
        assert!(squash(&stray).contains("b = 2"), "got: {stray}");
    }

    #[test]
    fn test_plan_only_entries_skipped_unless_requested() {
        let entries = [PredicateEntry::Clause {
            connector: Connector::And,
            fragment: Fragment::Raw("deleted = 0".to_string()),
            plan_only: true,
        }];
        assert!(build_condition(&entries, false).is_empty());
        assert!(!build_condition(&entries, true).is_empty());
    }

    #[test]
    fn test_empty_in_list_matches_nothing() {
        let fragment = Fragment::In {
            key: "id".to_string(),
            values: vec![],
        };
        let sql = render(&[PredicateEntry::Clause {
            connector: Connector::And,
            fragment,
            plan_only: false,
        }]);
        assert!(squash(&sql).contains("1 = 0"), "got: {sql}");
    }

    #[test]
    fn test_like_value_is_escaped() {
        let fragment = Fragment::Like {
            key: "title".to_string(),
            value: "50%".to_string(),
            side: LikeSide::Both,
        };
        let sql = render(&[PredicateEntry::Clause {
            connector: Connector::And,
            fragment,
            plan_only: false,
        }]);
        assert!(squash(&sql).contains("title LIKE '%50!%%' ESCAPE '!'"), "got: {sql}");
    }
}
