use async_trait::async_trait;

use crate::{
    errors::GridError,
    models::RowRecord,
    plan::{QueryPlan, predicate::escape_like_wildcards},
};

/// The storage collaborator a grid executes against.
///
/// Implementations compile and run plans; they never mutate them. Errors are
/// returned to the caller as-is, the grid does not retry.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Number of rows `plan` matches. Ordering and paging are already removed.
    async fn count(&self, plan: &QueryPlan) -> Result<u64, GridError>;

    /// Rows for `plan`, keyed by the plan's aliases in select order.
    async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<RowRecord>, GridError>;

    /// Physical field names of `table`, in schema order.
    async fn list_fields(&self, table: &str) -> Result<Vec<String>, GridError>;

    /// Escape `value` for embedding inside a quoted `LIKE '%...%' ESCAPE '!'`
    /// literal.
    ///
    /// The default doubles quotes only, which is enough for backends that read
    /// backslashes literally. Backends with backslash escapes must override it.
    fn escape_like_literal(&self, value: &str) -> String {
        escape_like_wildcards(value).replace('\'', "''")
    }

    /// SQL text of `plan` for diagnostics, if the source can produce it.
    fn render(&self, _plan: &QueryPlan) -> Option<String> {
        None
    }
}
