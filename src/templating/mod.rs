//! # Row Templating
//!
//! Display templates rewrite cells after rows come back from the backend.
//! A template is a string with `$1`, `$2`, ... placeholders and a comma
//! separated list of replacement tokens, one per placeholder:
//!
//! ```rust,ignore
//! GridBuilder::new(plan)
//!     // <a href="/users/7">John</a>
//!     .edit_column("name", "<a href=\"/users/$2\">$1</a>", "name, id")
//!     // JOHN (john@x.org)
//!     .add_column("label", "$1 ($2)", "upper(name), email")
//!     .unset_column("email")
//!     .build()?;
//! ```
//!
//! Tokens are parsed once, when the [`GridConfig`] is built, into a small
//! closed AST: a quoted literal, a column reference, or a call to a function
//! registered in the [`FunctionRegistry`]. Anything else is used literally.
//!
//! Placeholders are substituted from the last token to the first, so the value
//! of `$1` can never land inside `$10`.

pub mod functions;

use serde_json::Value as JsonValue;

pub use functions::{FunctionRegistry, TemplateFn};

use crate::{
    config::{GridConfig, IdentifierMode},
    errors::GridError,
    models::{ColumnIdentifier, RowData, RowRecord},
    splitter::split,
};

/// Argument of a template function call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateArg {
    Literal(String),
    Column(ColumnIdentifier),
}

/// One parsed replacement token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateToken {
    Literal(String),
    Column(ColumnIdentifier),
    Call { name: String, args: Vec<TemplateArg> },
}

/// What token parsing needs to know about the grid.
pub struct TemplateContext<'a> {
    /// Row aliases in row order: selected columns, then added columns.
    pub columns: &'a [String],
    pub identifiers: IdentifierMode,
    pub registry: &'a FunctionRegistry,
    pub strict: bool,
}

impl TemplateContext<'_> {
    fn resolve(&self, name: &str) -> Option<ColumnIdentifier> {
        let position = self.columns.iter().position(|alias| alias == name)?;
        Some(match self.identifiers {
            IdentifierMode::ByAlias => ColumnIdentifier::ByAlias(name.to_string()),
            IdentifierMode::ByIndex => ColumnIdentifier::ByIndex(position),
        })
    }

    fn argument(&self, raw: &str) -> TemplateArg {
        let value = unquote(raw.trim());
        self.resolve(value)
            .map_or_else(|| TemplateArg::Literal(value.to_string()), TemplateArg::Column)
    }
}

/// The inner text of a fully single- or double-quoted token.
fn strip_quotes(token: &str) -> Option<&str> {
    let mut chars = token.chars();
    let open = chars.next()?;
    let close = chars.next_back()?;
    ((open == '\'' || open == '"') && open == close).then(|| &token[1..token.len() - 1])
}

fn unquote(token: &str) -> &str {
    strip_quotes(token).unwrap_or(token)
}

/// `name` or `namespace::name`, word characters only.
fn is_function_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split("::").collect();
    parts.len() <= 2
        && parts.iter().all(|part| {
            !part.is_empty() && part.chars().all(|c| c.is_alphanumeric() || c == '_')
        })
}

/// Split `name(args)` into its name and raw argument text.
fn parse_call(token: &str) -> Option<(&str, &str)> {
    let open = token.find('(')?;
    let inner = token.strip_suffix(')')?.get(open + 1..)?;
    let name = &token[..open];
    is_function_name(name).then_some((name, inner))
}

impl TemplateToken {
    /// Parse one raw replacement token.
    ///
    /// # Errors
    ///
    /// In strict mode a call to an unregistered function is a
    /// [`GridError::Configuration`]; otherwise the token is kept literally.
    pub fn parse(raw: &str, context: &TemplateContext<'_>) -> Result<Self, GridError> {
        let token = raw.trim();

        if let Some(literal) = strip_quotes(token) {
            return Ok(Self::Literal(literal.to_string()));
        }

        if let Some((name, inner)) = parse_call(token) {
            if context.registry.contains(name) {
                let args = if inner.trim().is_empty() {
                    Vec::new()
                } else {
                    split(",", inner)
                        .iter()
                        .map(|arg| context.argument(arg))
                        .collect()
                };
                return Ok(Self::Call {
                    name: name.to_lowercase(),
                    args,
                });
            }
            if context.strict {
                return Err(GridError::configuration(format!(
                    "template token `{token}` calls unknown function `{name}`"
                )));
            }
            tracing::warn!(function = name, "Unknown template function, using token literally");
        }

        Ok(context
            .resolve(token)
            .map_or_else(|| Self::Literal(token.to_string()), Self::Column))
    }

    fn evaluate(&self, row: &RowRecord, registry: &FunctionRegistry) -> String {
        match self {
            Self::Literal(text) => text.clone(),
            Self::Column(column) => cell_text(lookup(row, column)),
            Self::Call { name, args } => {
                let args: Vec<String> = args
                    .iter()
                    .map(|arg| match arg {
                        TemplateArg::Literal(text) => text.clone(),
                        TemplateArg::Column(column) => cell_text(lookup(row, column)),
                    })
                    .collect();
                registry.call(name, &args).unwrap_or_default()
            }
        }
    }
}

fn lookup<'a>(row: &'a RowRecord, column: &ColumnIdentifier) -> Option<&'a JsonValue> {
    match column {
        ColumnIdentifier::ByAlias(alias) => row.get(alias),
        ColumnIdentifier::ByIndex(index) => row.get_index(*index),
    }
}

/// Text of a cell as templates see it. `null` renders as an empty string.
#[must_use]
pub fn cell_text(value: Option<&JsonValue>) -> String {
    match value {
        None | Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

/// A display template bound to one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnTemplate {
    pub alias: String,
    pub template: String,
    pub tokens: Vec<TemplateToken>,
}

impl ColumnTemplate {
    /// Parse the comma separated `replacements` list against `context`.
    ///
    /// # Errors
    ///
    /// Propagates token errors from [`TemplateToken::parse`].
    pub fn parse(
        alias: &str,
        template: &str,
        replacements: &str,
        context: &TemplateContext<'_>,
    ) -> Result<Self, GridError> {
        let tokens = if replacements.trim().is_empty() {
            Vec::new()
        } else {
            split(",", replacements)
                .iter()
                .map(|raw| TemplateToken::parse(raw, context))
                .collect::<Result<_, _>>()?
        };
        Ok(Self {
            alias: alias.to_string(),
            template: template.to_string(),
            tokens,
        })
    }

    /// Substitute every `$n` placeholder, last token first.
    #[must_use]
    pub fn render(&self, row: &RowRecord, registry: &FunctionRegistry) -> String {
        self.tokens
            .iter()
            .enumerate()
            .rev()
            .fold(self.template.clone(), |output, (index, token)| {
                let placeholder = format!("${}", index + 1);
                if output.contains(&placeholder) {
                    output.replace(&placeholder, &token.evaluate(row, registry))
                } else {
                    output
                }
            })
    }
}

/// Apply added columns, then edits in declaration order, then drop unset
/// columns, and shape the row for the configured identifier mode.
#[must_use]
pub fn render_row(config: &GridConfig, mut row: RowRecord) -> RowData {
    for template in config.added_columns().iter().chain(config.edited_columns()) {
        let value = template.render(&row, config.functions());
        row.insert(template.alias.clone(), JsonValue::String(value));
    }
    for alias in config.unset_columns() {
        row.remove(alias);
    }
    match config.identifiers() {
        IdentifierMode::ByAlias => RowData::Object(row),
        IdentifierMode::ByIndex => RowData::Array(row.into_values()),
    }
}

#[must_use]
pub fn render_rows(config: &GridConfig, rows: Vec<RowRecord>) -> Vec<RowData> {
    rows.into_iter().map(|row| render_row(config, row)).collect()
}
