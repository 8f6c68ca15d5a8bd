//! # Filtering, Sorting & Paging
//!
//! Turns one [`DrawRequest`] into predicate, ordering and paging additions on
//! a [`QueryPlan`].
//!
//! ## Global search
//!
//! Two mutually exclusive modes, picked by the grid configuration:
//!
//! - **Configured**: the grid declares its searchable columns (a list, or every
//!   field of the base table). A non-empty term becomes one bracketed group:
//!   `(name LIKE '%jo%' OR email LIKE '%jo%')`.
//! - **Unconfigured**: the columns the client flags `searchable`, minus added
//!   columns, are OR-ed together as one raw predicate with the term escaped by
//!   the [`DataSource`].
//!
//! An empty term (or an empty column set) adds nothing.
//!
//! ## Declared filters and column search
//!
//! Filters declared on the grid are AND-ed on every request after the search.
//! Per-column search values from the client follow, as LIKE or, with a range
//! separator configured, as inclusive ranges.
//!
//! ## Sorting
//!
//! Client directives resolve through the order-capable column list and keep
//! their order; declared default orderings are appended after them.

pub mod conditions;
pub mod pagination;
pub mod search;
pub mod sort;

pub use conditions::{ColumnFilter, apply_column_search, apply_declared_filters};
pub use pagination::Paging;
pub use search::{MAX_SEARCH_QUERY_LENGTH, apply_search, sanitize_search_term};
pub use sort::apply_sorting;

use crate::{
    config::GridConfig,
    core::DataSource,
    errors::GridError,
    models::{ColumnIdentifier, ColumnRequest, DrawRequest},
    plan::QueryPlan,
};

/// Backend expression for the client column at `index`.
///
/// Alias identifiers are looked up by alias, numeric ones by position, and a
/// blank identifier falls back to the column's own index. Added columns and
/// wildcards have no searchable expression.
pub(crate) fn resolve_column_expression(
    plan: &QueryPlan,
    config: &GridConfig,
    index: usize,
    column: &ColumnRequest,
) -> Option<String> {
    let selected = match &column.data {
        ColumnIdentifier::ByAlias(alias) if alias.is_empty() => plan.columns().get(index),
        ColumnIdentifier::ByAlias(alias) => {
            if config.is_added_column(alias) {
                return None;
            }
            plan.columns().iter().find(|selected| selected.alias == *alias)
        }
        ColumnIdentifier::ByIndex(position) => plan.columns().get(*position),
    }?;

    (!selected.is_wildcard()).then(|| selected.expression.clone())
}

/// Global search, then declared filters, then client column search.
///
/// # Errors
///
/// Propagates data source failures from search column resolution.
pub async fn apply_filtering(
    plan: QueryPlan,
    config: &GridConfig,
    request: &DrawRequest,
    source: &dyn DataSource,
) -> Result<QueryPlan, GridError> {
    let plan = apply_search(plan, config, request, source).await?;
    let plan = apply_declared_filters(plan, config.filters());
    Ok(apply_column_search(plan, config, request))
}
