use crate::{config::GridConfig, errors::GridError, models::DrawRequest, plan::QueryPlan};

/// Resolve the client's sort directives and append the declared defaults.
///
/// Directives resolve through the grid's order-capable column list, or through
/// the selected expressions when none is declared. Client order is kept, so
/// later directives are secondary keys. Defaults always sort last: ordering
/// declared on the base plan, then the grid's default order.
///
/// # Errors
///
/// In strict mode an index outside the order-capable list is a
/// [`GridError::Resolution`]; otherwise the directive is skipped.
pub fn apply_sorting(
    plan: QueryPlan,
    config: &GridConfig,
    request: &DrawRequest,
) -> Result<QueryPlan, GridError> {
    let order_capable: Vec<String> = if config.order_columns().is_empty() {
        plan.columns()
            .iter()
            .map(|column| {
                if column.is_wildcard() {
                    String::new()
                } else {
                    column.expression.clone()
                }
            })
            .collect()
    } else {
        config.order_columns().to_vec()
    };

    let (mut plan, declared) = plan.without_order();
    for directive in &request.order {
        if request
            .columns
            .get(directive.column)
            .is_some_and(|column| !column.orderable)
        {
            tracing::debug!(column = directive.column, "Skipping sort on non-orderable column");
            continue;
        }

        match order_capable.get(directive.column) {
            Some(expression) if !expression.is_empty() => {
                plan = plan.order_by(expression.clone(), directive.direction());
            }
            _ if config.is_strict() => {
                return Err(GridError::resolution(format!(
                    "Sort column {} is out of range",
                    directive.column
                )));
            }
            _ => {
                tracing::warn!(
                    column = directive.column,
                    available = order_capable.len(),
                    "Ignoring sort directive for unknown column"
                );
            }
        }
    }

    Ok(declared
        .iter()
        .chain(config.default_order())
        .fold(plan, |plan, clause| {
            plan.order_by(clause.expression.clone(), clause.direction)
        }))
}
