use crate::{
    config::{GridConfig, SearchColumns},
    core::DataSource,
    errors::GridError,
    models::DrawRequest,
    plan::{QueryPlan, compile::TableName, predicate::LIKE_ESCAPE},
};

use super::resolve_column_expression;

// Basic safety limits
pub const MAX_SEARCH_QUERY_LENGTH: usize = 10_000;

/// Trim a search term and cap it at [`MAX_SEARCH_QUERY_LENGTH`] characters.
#[must_use]
pub fn sanitize_search_term(term: &str) -> String {
    term.trim()
        .chars()
        .take(MAX_SEARCH_QUERY_LENGTH)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Resolve the configured searchable column set to backend expressions.
///
/// `All` asks the data source for the base table's physical fields. When the
/// plan joins other tables, those fields are qualified with the base table's
/// alias so they stay unambiguous.
///
/// # Errors
///
/// Propagates data source failures from schema introspection.
pub async fn resolve_search_columns(
    columns: &SearchColumns,
    plan: &QueryPlan,
    source: &dyn DataSource,
) -> Result<Vec<String>, GridError> {
    match columns {
        SearchColumns::Listed(columns) => Ok(columns.clone()),
        SearchColumns::All => {
            let Some(table) = plan.table().map(TableName::parse) else {
                tracing::warn!("Searching all fields requires a table, skipping search");
                return Ok(Vec::new());
            };
            let fields = source.list_fields(&table.name).await?;
            if plan.joins().is_empty() {
                return Ok(fields);
            }
            let qualifier = table.qualifier();
            Ok(fields
                .into_iter()
                .map(|field| format!("{qualifier}.{field}"))
                .collect())
        }
    }
}

/// `(col1 LIKE %term% OR col2 LIKE %term% ...)` as one bracketed group.
#[must_use]
pub fn apply_configured_search(plan: QueryPlan, columns: &[String], term: &str) -> QueryPlan {
    if term.is_empty() || columns.is_empty() {
        return plan;
    }
    plan.group_start()
        .like_any(&columns.join(","), term)
        .group_end()
}

/// Disjunction over the columns the client marked searchable, skipping added
/// columns. `escaped` must already be escaped by the data source.
#[must_use]
pub fn apply_client_search(
    plan: QueryPlan,
    config: &GridConfig,
    request: &DrawRequest,
    escaped: &str,
) -> QueryPlan {
    if escaped.is_empty() {
        return plan;
    }

    let clauses: Vec<String> = request
        .columns
        .iter()
        .enumerate()
        .filter(|(_, column)| column.searchable)
        .filter_map(|(index, column)| resolve_column_expression(&plan, config, index, column))
        .map(|expression| format!("{expression} LIKE '%{escaped}%' ESCAPE '{LIKE_ESCAPE}'"))
        .collect();

    if clauses.is_empty() {
        return plan;
    }
    plan.where_raw(format!("({})", clauses.join(" OR ")))
}

/// Apply the global search term in whichever mode the grid is configured for.
///
/// # Errors
///
/// Propagates data source failures while resolving `SearchColumns::All`.
pub async fn apply_search(
    plan: QueryPlan,
    config: &GridConfig,
    request: &DrawRequest,
    source: &dyn DataSource,
) -> Result<QueryPlan, GridError> {
    let term = sanitize_search_term(&request.search.value);
    if term.is_empty() {
        return Ok(plan);
    }

    match config.search_columns() {
        Some(columns) => {
            let columns = resolve_search_columns(columns, &plan, source).await?;
            tracing::debug!(columns = columns.len(), "Applying configured search");
            Ok(apply_configured_search(plan, &columns, &term))
        }
        None => {
            let escaped = source.escape_like_literal(&term);
            Ok(apply_client_search(plan, config, request, &escaped))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::GridBuilder,
        models::{ColumnIdentifier, ColumnRequest},
        plan::{
            JoinKind,
            compile::{escape_string_literal, render},
            predicate::escape_like_wildcards,
        },
    };
    use sea_orm::DatabaseBackend;

    fn sql(plan: &QueryPlan) -> String {
        render(&plan.to_statement(), DatabaseBackend::Sqlite)
    }

    fn squash(sql: &str) -> String {
        sql.replace(['(', ')'], "")
    }

    fn column(data: ColumnIdentifier, searchable: bool) -> ColumnRequest {
        ColumnRequest {
            data,
            searchable,
            ..ColumnRequest::default()
        }
    }

    #[test]
    fn test_sanitize_search_term() {
        assert_eq!(sanitize_search_term("  jo  "), "jo");
        assert_eq!(sanitize_search_term("   "), "");
        let long = "é".repeat(MAX_SEARCH_QUERY_LENGTH + 50);
        assert_eq!(
            sanitize_search_term(&long).chars().count(),
            MAX_SEARCH_QUERY_LENGTH
        );
    }

    #[test]
    fn test_configured_search_is_one_or_group() {
        let plan = QueryPlan::from_table("users")
            .select("id, name, email")
            .and_where("active", 1);
        let columns = vec!["name".to_string(), "email".to_string()];
        let sql = sql(&apply_configured_search(plan, &columns, "abc"));
        assert!(
            squash(&sql).contains(
                "active = 1 AND name LIKE '%abc%' ESCAPE '!' OR email LIKE '%abc%' ESCAPE '!'"
            ),
            "got: {sql}"
        );
        // The disjunction is closed by a single bracket at the end
        assert!(sql.trim_end().ends_with(')'), "got: {sql}");
    }

    #[test]
    fn test_configured_search_short_circuits() {
        let plan = QueryPlan::from_table("users");
        let columns = vec!["name".to_string()];
        assert!(apply_configured_search(plan.clone(), &columns, "").predicates().is_empty());
        assert!(apply_configured_search(plan, &[], "abc").predicates().is_empty());
    }

    #[test]
    fn test_client_search_over_searchable_columns() {
        let plan = QueryPlan::from_table("users").select("id, name, email");
        let config = GridBuilder::new(plan.clone())
            .add_column("actions", "<a>$1</a>", "id")
            .build()
            .unwrap();
        let request = DrawRequest {
            columns: vec![
                column(ColumnIdentifier::ByIndex(0), false),
                column(ColumnIdentifier::ByIndex(1), true),
                column(ColumnIdentifier::ByAlias("email".to_string()), true),
                column(ColumnIdentifier::ByAlias("actions".to_string()), true),
            ],
            ..DrawRequest::default()
        };

        let plan = apply_client_search(plan, &config, &request, "jo");
        assert_eq!(plan.predicates().len(), 1);
        let sql = sql(&plan);
        assert!(
            sql.contains("(name LIKE '%jo%' ESCAPE '!' OR email LIKE '%jo%' ESCAPE '!')"),
            "got: {sql}"
        );
        assert!(!sql.contains("actions"), "got: {sql}");
        assert!(!sql.contains("id LIKE"), "got: {sql}");
    }

    #[test]
    fn test_client_search_keeps_backslash_quotes_inside_literal_on_mysql() {
        let plan = QueryPlan::from_table("users").select("name");
        let config = GridBuilder::new(plan.clone()).build().unwrap();
        let request = DrawRequest {
            columns: vec![column(ColumnIdentifier::ByIndex(0), true)],
            ..DrawRequest::default()
        };
        let escaped = escape_string_literal(
            &escape_like_wildcards(r"\' OR 1=1 -- "),
            DatabaseBackend::MySql,
        );

        let plan = apply_client_search(plan, &config, &request, &escaped);
        let sql = render(&plan.to_statement(), DatabaseBackend::MySql);
        assert!(
            sql.contains(r"name LIKE '%\\'' OR 1=1 -- %' ESCAPE '!'"),
            "got: {sql}"
        );
    }

    #[test]
    fn test_client_search_without_searchable_columns_adds_nothing() {
        let plan = QueryPlan::from_table("users").select("id");
        let config = GridBuilder::new(plan.clone()).build().unwrap();
        let request = DrawRequest {
            columns: vec![column(ColumnIdentifier::ByIndex(0), false)],
            ..DrawRequest::default()
        };
        assert!(apply_client_search(plan, &config, &request, "jo").predicates().is_empty());
    }

    #[test]
    fn test_joined_fields_are_qualified() {
        struct Fields;

        #[async_trait::async_trait]
        impl DataSource for Fields {
            async fn count(&self, _plan: &QueryPlan) -> Result<u64, GridError> {
                Ok(0)
            }
            async fn fetch(
                &self,
                _plan: &QueryPlan,
            ) -> Result<Vec<crate::models::RowRecord>, GridError> {
                Ok(Vec::new())
            }
            async fn list_fields(&self, table: &str) -> Result<Vec<String>, GridError> {
                assert_eq!(table, "users");
                Ok(vec!["id".to_string(), "name".to_string()])
            }
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let joined = QueryPlan::from_table("users u").join("roles r", "r.id = u.role_id", JoinKind::Left);
        let fields = runtime
            .block_on(resolve_search_columns(&SearchColumns::All, &joined, &Fields))
            .unwrap();
        assert_eq!(fields, vec!["u.id", "u.name"]);

        let plain = QueryPlan::from_table("users");
        let fields = runtime
            .block_on(resolve_search_columns(&SearchColumns::All, &plain, &Fields))
            .unwrap();
        assert_eq!(fields, vec!["id", "name"]);
    }
}
