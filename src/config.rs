//! # Grid Configuration
//!
//! A [`GridConfig`] is everything about a grid that does not change between
//! requests: the base query, searchable columns, declared filters, default
//! ordering, display templates and a few switches. It is assembled once with a
//! [`GridBuilder`], validated by [`GridBuilder::build`], and then shared
//! read-only (typically behind an `Arc`) by every request.
//!
//! ```rust
//! use gridcrate::{
//!     config::{GridBuilder, IdentifierMode},
//!     filtering::ColumnFilter,
//!     plan::{QueryPlan, SortDirection},
//! };
//!
//! let config = GridBuilder::new(QueryPlan::from_table("users").select("id, name, email"))
//!     .searchable("name, email")
//!     .filter("active", ColumnFilter::equals(1))
//!     .default_order("id", SortDirection::Asc)
//!     .edit_column("email", "<a href=\"mailto:$1\">$1</a>", "email")
//!     .identifiers(IdentifierMode::ByAlias)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.edited_columns().len(), 1);
//! ```

use sea_orm::Value;

use crate::{
    errors::GridError,
    filtering::ColumnFilter,
    plan::{OrderClause, QueryPlan, SelectColumn, SortDirection},
    splitter::{as_target, split, strip_as_clause},
    templating::{ColumnTemplate, FunctionRegistry, TemplateContext},
};

/// How rows are keyed, and how template column references are resolved.
///
/// `ByAlias` sends rows as objects keyed by alias; `ByIndex` sends positional
/// arrays, for clients whose `columns[i][data]` are numeric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentifierMode {
    #[default]
    ByAlias,
    ByIndex,
}

/// Columns eligible for the global search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchColumns {
    /// Every physical field of the base table, resolved through the data source.
    All,
    /// Backend expressions, AS-stripped and lower-cased.
    Listed(Vec<String>),
}

impl SearchColumns {
    /// Parse a comma separated list; commas inside calls do not split.
    /// A lone `*` selects every field of the base table.
    #[must_use]
    pub fn parse(columns: &str) -> Self {
        if columns.trim() == "*" {
            return Self::All;
        }
        Self::Listed(
            split(",", columns)
                .iter()
                .map(|column| strip_as_clause(column).to_lowercase())
                .filter(|column| !column.is_empty())
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclaredFilter {
    pub column: String,
    pub filter: ColumnFilter,
}

fn normalize_alias(alias: &str) -> String {
    alias.trim().to_lowercase()
}

/// Immutable grid configuration. Build with [`GridBuilder`].
#[derive(Debug, Clone)]
pub struct GridConfig {
    plan: QueryPlan,
    search_columns: Option<SearchColumns>,
    filters: Vec<DeclaredFilter>,
    default_order: Vec<OrderClause>,
    order_columns: Vec<String>,
    added: Vec<ColumnTemplate>,
    edits: Vec<ColumnTemplate>,
    unset: Vec<String>,
    functions: FunctionRegistry,
    identifiers: IdentifierMode,
    range_separator: Option<String>,
    strict: bool,
    debug_query: bool,
}

impl GridConfig {
    #[must_use]
    pub fn builder(plan: QueryPlan) -> GridBuilder {
        GridBuilder::new(plan)
    }

    /// A fresh copy of the base plan for one request.
    #[must_use]
    pub fn plan(&self) -> QueryPlan {
        self.plan.clone()
    }

    #[must_use]
    pub fn base_plan(&self) -> &QueryPlan {
        &self.plan
    }

    /// `None` selects the client-flagged search mode.
    #[must_use]
    pub fn search_columns(&self) -> Option<&SearchColumns> {
        self.search_columns.as_ref()
    }

    #[must_use]
    pub fn filters(&self) -> &[DeclaredFilter] {
        &self.filters
    }

    #[must_use]
    pub fn default_order(&self) -> &[OrderClause] {
        &self.default_order
    }

    #[must_use]
    pub fn order_columns(&self) -> &[String] {
        &self.order_columns
    }

    #[must_use]
    pub fn added_columns(&self) -> &[ColumnTemplate] {
        &self.added
    }

    #[must_use]
    pub fn edited_columns(&self) -> &[ColumnTemplate] {
        &self.edits
    }

    #[must_use]
    pub fn unset_columns(&self) -> &[String] {
        &self.unset
    }

    #[must_use]
    pub fn is_added_column(&self, alias: &str) -> bool {
        self.added.iter().any(|template| template.alias == alias)
    }

    #[must_use]
    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    #[must_use]
    pub fn identifiers(&self) -> IdentifierMode {
        self.identifiers
    }

    #[must_use]
    pub fn range_separator(&self) -> Option<&str> {
        self.range_separator.as_deref()
    }

    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    #[must_use]
    pub fn debug_query(&self) -> bool {
        self.debug_query
    }
}

struct RawTemplate {
    alias: String,
    template: String,
    replacements: String,
}

/// Fluent builder for [`GridConfig`].
pub struct GridBuilder {
    plan: QueryPlan,
    search_columns: Option<SearchColumns>,
    filters: Vec<DeclaredFilter>,
    default_order: Vec<OrderClause>,
    order_columns: Vec<String>,
    added: Vec<RawTemplate>,
    edits: Vec<RawTemplate>,
    unset: Vec<String>,
    functions: FunctionRegistry,
    identifiers: IdentifierMode,
    range_separator: Option<String>,
    strict: bool,
    debug_query: bool,
}

impl GridBuilder {
    /// Start from a base plan. Built-in template functions are registered.
    #[must_use]
    pub fn new(plan: QueryPlan) -> Self {
        Self {
            plan,
            search_columns: None,
            filters: Vec::new(),
            default_order: Vec::new(),
            order_columns: Vec::new(),
            added: Vec::new(),
            edits: Vec::new(),
            unset: Vec::new(),
            functions: FunctionRegistry::with_builtins(),
            identifiers: IdentifierMode::default(),
            range_separator: None,
            strict: false,
            debug_query: false,
        }
    }

    #[must_use]
    pub fn search_columns(mut self, columns: SearchColumns) -> Self {
        self.search_columns = Some(columns);
        self
    }

    /// Search the listed expressions, e.g. `"name, email"`, or `"*"` for every field.
    #[must_use]
    pub fn searchable(self, columns: &str) -> Self {
        self.search_columns(SearchColumns::parse(columns))
    }

    /// Search every physical field of the base table.
    #[must_use]
    pub fn search_all_fields(self) -> Self {
        self.search_columns(SearchColumns::All)
    }

    #[must_use]
    pub fn filter(mut self, column: impl Into<String>, filter: ColumnFilter) -> Self {
        self.filters.push(DeclaredFilter {
            column: column.into(),
            filter,
        });
        self
    }

    /// Shorthand for an equality filter.
    #[must_use]
    pub fn filter_eq(self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(column, ColumnFilter::equals(value))
    }

    /// Ordering appended after every client sort directive.
    #[must_use]
    pub fn default_order(mut self, expression: impl Into<String>, direction: SortDirection) -> Self {
        self.default_order.push(OrderClause {
            expression: expression.into(),
            direction,
        });
        self
    }

    /// Expressions to sort by, one per client column.
    ///
    /// Entries with an `AS` clause sort by its target, so a formatted column can
    /// sort by its raw value: `"DATE_FORMAT(created, '%d') as created"`.
    #[must_use]
    pub fn order_columns(mut self, columns: &str) -> Self {
        self.order_columns = split(",", columns).iter().map(|column| as_target(column)).collect();
        self
    }

    /// Append a computed column to every row.
    #[must_use]
    pub fn add_column(mut self, alias: &str, template: &str, replacements: &str) -> Self {
        self.added.push(RawTemplate {
            alias: normalize_alias(alias),
            template: template.to_string(),
            replacements: replacements.to_string(),
        });
        self
    }

    /// Rewrite a column. Several edits of one column run in declaration order.
    #[must_use]
    pub fn edit_column(mut self, alias: &str, template: &str, replacements: &str) -> Self {
        self.edits.push(RawTemplate {
            alias: normalize_alias(alias),
            template: template.to_string(),
            replacements: replacements.to_string(),
        });
        self
    }

    /// Drop a column from the response after templating.
    #[must_use]
    pub fn unset_column(mut self, alias: &str) -> Self {
        self.unset.push(normalize_alias(alias));
        self
    }

    /// Make a function callable from templates.
    #[must_use]
    pub fn register_function<F>(mut self, name: &str, function: F) -> Self
    where
        F: Fn(&[String]) -> String + Send + Sync + 'static,
    {
        self.functions.register(name, function);
        self
    }

    /// Replace the whole function table, built-ins included.
    #[must_use]
    pub fn functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    #[must_use]
    pub fn identifiers(mut self, identifiers: IdentifierMode) -> Self {
        self.identifiers = identifiers;
        self
    }

    /// Separator turning a column search value into a range, e.g. `"~"`.
    #[must_use]
    pub fn range_separator(mut self, separator: &str) -> Self {
        self.range_separator = Some(separator.to_string());
        self
    }

    /// Fail on unknown template functions and unresolvable sort columns
    /// instead of degrading.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Include the executed statement in every response.
    #[must_use]
    pub fn debug_query(mut self, debug_query: bool) -> Self {
        self.debug_query = debug_query;
        self
    }

    fn check_known(&self, columns: &[String], alias: &str, what: &str) -> Result<(), GridError> {
        if columns.iter().any(|column| column == alias) {
            return Ok(());
        }
        if self.strict {
            return Err(GridError::configuration(format!(
                "{what} references unknown column `{alias}`"
            )));
        }
        tracing::warn!(column = alias, "{what} references a column that is not selected");
        Ok(())
    }

    /// Validate and parse everything into an immutable [`GridConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`GridError::Configuration`] for an empty range separator and, in
    /// strict mode, for templates calling unknown functions, edits and unsets
    /// naming columns that are neither selected nor added, or positional
    /// identifiers over a wildcard select.
    pub fn build(self) -> Result<GridConfig, GridError> {
        if self.range_separator.as_deref().is_some_and(str::is_empty) {
            return Err(GridError::configuration("range separator must not be empty"));
        }

        if self.identifiers == IdentifierMode::ByIndex
            && self.plan.columns().iter().any(SelectColumn::is_wildcard)
        {
            if self.strict {
                return Err(GridError::configuration(
                    "positional identifiers cannot be combined with a wildcard select",
                ));
            }
            tracing::warn!(
                "Wildcard select with positional identifiers: added column positions \
                 follow the expanded fields"
            );
        }

        let mut columns: Vec<String> = self.plan.aliases().into_iter().map(String::from).collect();
        for raw in &self.added {
            if !columns.contains(&raw.alias) {
                columns.push(raw.alias.clone());
            }
        }

        for raw in &self.edits {
            self.check_known(&columns, &raw.alias, "Column edit")?;
        }
        for alias in &self.unset {
            self.check_known(&columns, alias, "Unset column")?;
        }

        let context = TemplateContext {
            columns: &columns,
            identifiers: self.identifiers,
            registry: &self.functions,
            strict: self.strict,
        };
        let parse = |raw: &RawTemplate| {
            ColumnTemplate::parse(&raw.alias, &raw.template, &raw.replacements, &context)
        };
        let added = self.added.iter().map(&parse).collect::<Result<Vec<_>, _>>()?;
        let edits = self.edits.iter().map(&parse).collect::<Result<Vec<_>, _>>()?;

        if !self.order_columns.is_empty() && self.order_columns.len() != self.plan.columns().len() {
            tracing::warn!(
                order_columns = self.order_columns.len(),
                selected = self.plan.columns().len(),
                "Order-capable columns do not line up with the selected columns"
            );
        }

        tracing::debug!(
            columns = columns.len(),
            added = added.len(),
            edits = edits.len(),
            filters = self.filters.len(),
            "Grid configuration built"
        );

        Ok(GridConfig {
            plan: self.plan,
            search_columns: self.search_columns,
            filters: self.filters,
            default_order: self.default_order,
            order_columns: self.order_columns,
            added,
            edits,
            unset: self.unset,
            functions: self.functions,
            identifiers: self.identifiers,
            range_separator: self.range_separator,
            strict: self.strict,
            debug_query: self.debug_query,
        })
    }
}
