//! Compile a [`QueryPlan`] into sea-query statements.
//!
//! Expressions are emitted with `Expr::cust` and pass through to the backend
//! uninterpreted; values are bound. Selected columns are emitted as
//! `<expression> AS "<alias>"` so rows come back keyed by their alias.

use sea_orm::{
    DatabaseBackend,
    sea_query::{
        Alias, Asterisk, Cond, Expr, IntoIden, JoinType, MysqlQueryBuilder, PostgresQueryBuilder,
        Query, SelectStatement, SqliteQueryBuilder, TableRef,
    },
};

use super::{JoinKind, QueryPlan, predicate::build_condition};

/// Alias of the single column produced by count statements.
pub const COUNT_ALIAS: &str = "num_rows";

/// A parsed table reference: `schema.table [AS] alias`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    pub schema: Option<String>,
    pub name: String,
    pub alias: Option<String>,
}

impl TableName {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let tokens: Vec<&str> = raw
            .split_whitespace()
            .filter(|token| !token.eq_ignore_ascii_case("as"))
            .collect();
        let qualified = tokens.first().copied().unwrap_or_default();
        let alias = tokens.get(1).map(|alias| (*alias).to_string());
        let (schema, name) = match qualified.split_once('.') {
            Some((schema, name)) => (Some(schema.to_string()), name.to_string()),
            None => (None, qualified.to_string()),
        };
        Self { schema, name, alias }
    }

    /// Name used to qualify columns: the alias when present, else the table.
    #[must_use]
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    fn to_table_ref(&self) -> TableRef {
        let name = Alias::new(self.name.as_str()).into_iden();
        match (&self.schema, &self.alias) {
            (None, None) => TableRef::Table(name),
            (Some(schema), None) => TableRef::SchemaTable(Alias::new(schema.as_str()).into_iden(), name),
            (None, Some(alias)) => TableRef::TableAlias(name, Alias::new(alias.as_str()).into_iden()),
            (Some(schema), Some(alias)) => TableRef::SchemaTableAlias(
                Alias::new(schema.as_str()).into_iden(),
                name,
                Alias::new(alias.as_str()).into_iden(),
            ),
        }
    }
}

impl From<JoinKind> for JoinType {
    fn from(kind: JoinKind) -> Self {
        match kind {
            JoinKind::Inner => Self::InnerJoin,
            JoinKind::Left => Self::LeftJoin,
            JoinKind::Right => Self::RightJoin,
            JoinKind::Full => Self::FullOuterJoin,
        }
    }
}

impl QueryPlan {
    fn build_select(&self, with_ordering: bool) -> SelectStatement {
        let mut query = Query::select();

        if self.columns.is_empty() {
            query.column(Asterisk);
        }
        for column in &self.columns {
            if column.is_wildcard() {
                query.expr(Expr::cust(column.expression.as_str()));
            } else {
                query.expr_as(
                    Expr::cust(column.expression.as_str()),
                    Alias::new(column.alias.as_str()),
                );
            }
        }

        if self.distinct {
            query.distinct();
        }

        if let Some(table) = &self.table {
            query.from(TableName::parse(table).to_table_ref());
        }

        for join in &self.joins {
            query.join(
                join.kind.into(),
                TableName::parse(&join.table).to_table_ref(),
                Expr::cust(join.condition.as_str()),
            );
        }

        let condition = build_condition(&self.predicates, self.include_plan_only);
        if !condition.is_empty() {
            query.cond_where(condition);
        }

        let groups: Vec<_> = self
            .group_by
            .iter()
            .filter(|group| self.include_plan_only || !group.plan_only)
            .map(|group| Expr::cust(group.expression.as_str()))
            .collect();
        if !groups.is_empty() {
            query.add_group_by(groups);
        }

        if !self.having.is_empty() {
            let having = self
                .having
                .iter()
                .fold(Cond::all(), |cond, sql| cond.add(Expr::cust(sql.as_str())));
            query.cond_having(having);
        }

        if with_ordering {
            for clause in &self.order_by {
                query.order_by_expr(Expr::cust(clause.expression.as_str()), clause.direction.into());
            }
            if let Some(limit) = self.limit {
                query.limit(limit);
                if self.offset > 0 {
                    query.offset(self.offset);
                }
            }
        }

        query
    }

    /// The full select statement: columns, filters, ordering and paging.
    #[must_use]
    pub fn to_statement(&self) -> SelectStatement {
        self.build_select(true)
    }

    /// `SELECT COUNT(*) AS num_rows FROM (<plan without ordering>) AS counted`.
    ///
    /// Counting over a subquery keeps `DISTINCT` and `GROUP BY` semantics intact.
    #[must_use]
    pub fn to_count_statement(&self) -> SelectStatement {
        Query::select()
            .expr_as(Expr::cust("COUNT(*)"), Alias::new(COUNT_ALIAS))
            .from_subquery(self.build_select(false), Alias::new("counted"))
            .to_owned()
    }

    /// Render the select statement with inlined values, for diagnostics.
    #[must_use]
    pub fn to_sql(&self, backend: DatabaseBackend) -> String {
        render(&self.to_statement(), backend)
    }
}

/// Escape `value` for the body of a single-quoted SQL string literal.
///
/// `MySQL` reads backslashes as escapes inside literals, so they are doubled
/// there. `PostgreSQL` (standard conforming strings) and `SQLite` only need
/// quotes doubled.
#[must_use]
pub fn escape_string_literal(value: &str, backend: DatabaseBackend) -> String {
    match backend {
        DatabaseBackend::MySql => value.replace('\\', "\\\\").replace('\'', "''"),
        DatabaseBackend::Postgres | DatabaseBackend::Sqlite => value.replace('\'', "''"),
    }
}

/// Render any select statement for the given backend with inlined values.
#[must_use]
pub fn render(statement: &SelectStatement, backend: DatabaseBackend) -> String {
    match backend {
        DatabaseBackend::MySql => statement.to_string(MysqlQueryBuilder),
        DatabaseBackend::Postgres => statement.to_string(PostgresQueryBuilder),
        DatabaseBackend::Sqlite => statement.to_string(SqliteQueryBuilder),
    }
}
