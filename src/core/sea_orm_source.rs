use async_trait::async_trait;
use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, FromQueryResult, JsonValue, Statement,
};

use super::source::DataSource;
use crate::{
    errors::GridError,
    models::RowRecord,
    plan::{
        QueryPlan,
        compile::{COUNT_ALIAS, escape_string_literal},
        predicate::escape_like_wildcards,
    },
};

/// [`DataSource`] over a sea-orm connection (`SQLite`, `PostgreSQL` or `MySQL`).
#[derive(Debug, Clone)]
pub struct SeaOrmSource {
    db: DatabaseConnection,
}

impl SeaOrmSource {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    fn backend(&self) -> DatabaseBackend {
        self.db.get_database_backend()
    }

    /// Schema introspection statement returning one `column_name` per field.
    fn fields_statement(backend: DatabaseBackend, table: &str) -> Statement {
        match backend {
            DatabaseBackend::Sqlite => Statement::from_string(
                backend,
                format!(
                    "SELECT name AS column_name FROM pragma_table_info('{}') ORDER BY cid",
                    table.replace('\'', "''")
                ),
            ),
            DatabaseBackend::Postgres => Statement::from_sql_and_values(
                backend,
                "SELECT column_name::text AS column_name FROM information_schema.columns \
                 WHERE table_name = $1 AND table_schema = current_schema() \
                 ORDER BY ordinal_position",
                [table.into()],
            ),
            DatabaseBackend::MySql => Statement::from_sql_and_values(
                backend,
                "SELECT column_name AS column_name FROM information_schema.columns \
                 WHERE table_name = ? AND table_schema = DATABASE() \
                 ORDER BY ordinal_position",
                [table.into()],
            ),
        }
    }
}

#[async_trait]
impl DataSource for SeaOrmSource {
    async fn count(&self, plan: &QueryPlan) -> Result<u64, GridError> {
        let statement = self.backend().build(&plan.to_count_statement());
        tracing::debug!(sql = %statement, "Counting grid rows");

        let Some(row) = self.db.query_one(statement).await? else {
            return Ok(0);
        };
        let count: i64 = row.try_get("", COUNT_ALIAS)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn fetch(&self, plan: &QueryPlan) -> Result<Vec<RowRecord>, GridError> {
        let statement = self.backend().build(&plan.to_statement());
        tracing::debug!(sql = %statement, "Fetching grid page");

        let rows = JsonValue::find_by_statement(statement).all(&self.db).await?;
        let aliases = plan.aliases();
        Ok(rows
            .into_iter()
            .map(|row| RowRecord::from_json(row, &aliases))
            .collect())
    }

    async fn list_fields(&self, table: &str) -> Result<Vec<String>, GridError> {
        let statement = Self::fields_statement(self.backend(), table);
        let rows = self.db.query_all(statement).await?;
        let fields = rows
            .iter()
            .map(|row| row.try_get::<String>("", "column_name"))
            .collect::<Result<Vec<_>, _>>()?;

        if fields.is_empty() {
            tracing::warn!(table, "No fields found for table");
        }
        Ok(fields)
    }

    fn escape_like_literal(&self, value: &str) -> String {
        escape_string_literal(&escape_like_wildcards(value), self.backend())
    }

    fn render(&self, plan: &QueryPlan) -> Option<String> {
        Some(plan.to_sql(self.backend()))
    }
}
