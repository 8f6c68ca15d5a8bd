use super::source::DataSource;
use crate::{
    config::GridConfig,
    errors::GridError,
    filtering::{Paging, apply_filtering, apply_sorting},
    models::{DrawRequest, ResultPage},
    plan::QueryPlan,
    templating::render_rows,
};

/// Answer one draw request with the grid's base plan.
///
/// # Errors
///
/// See [`execute_plan`].
pub async fn execute(
    config: &GridConfig,
    request: &DrawRequest,
    source: &dyn DataSource,
) -> Result<ResultPage, GridError> {
    execute_plan(config, config.plan(), request, source).await
}

/// Answer one draw request starting from `plan`.
///
/// 1. count the unfiltered total on the base plan
/// 2. apply sorting, then search and filters
/// 3. count the filtered rows
/// 4. apply paging and fetch the page
/// 5. template every row and drop unset columns
///
/// # Errors
///
/// Data source failures are returned unchanged. In strict mode an unresolvable
/// sort directive is a [`GridError::Resolution`].
pub async fn execute_plan(
    config: &GridConfig,
    plan: QueryPlan,
    request: &DrawRequest,
    source: &dyn DataSource,
) -> Result<ResultPage, GridError> {
    let records_total = source.count(&plan.for_total_count()).await?;

    let plan = apply_sorting(plan, config, request)?;
    let plan = apply_filtering(plan, config, request, source).await?;

    let records_filtered = source.count(&plan.without_paging()).await?;

    let plan = Paging::from_request(request).apply(plan);
    let rows = source.fetch(&plan).await?;

    tracing::debug!(
        draw = request.draw,
        records_total,
        records_filtered,
        rows = rows.len(),
        "Assembled grid page"
    );

    Ok(ResultPage {
        draw: request.draw,
        records_total,
        records_filtered,
        data: render_rows(config, rows),
        query: config.debug_query().then(|| source.render(&plan)).flatten(),
    })
}
