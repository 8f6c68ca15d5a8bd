use std::sync::Arc;

use axum::{
    Form, Json, Router,
    extract::State,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;

use crate::{
    config::GridConfig,
    core::{SeaOrmSource, execute},
    errors::GridError,
    models::{DrawRequest, ResultPage},
};

/// Shared state of a grid endpoint: its configuration and a connection pool.
#[derive(Clone)]
pub struct GridState {
    pub config: Arc<GridConfig>,
    pub db: DatabaseConnection,
}

impl GridState {
    #[must_use]
    pub fn new(config: GridConfig, db: DatabaseConnection) -> Self {
        Self {
            config: Arc::new(config),
            db,
        }
    }
}

/// Draw request in the widget's bracketed form encoding.
///
/// `Form` reads the query string for `GET` and the body for `POST`, so one
/// handler serves both.
pub async fn draw_handler(
    State(state): State<GridState>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Json<ResultPage>, GridError> {
    let request = DrawRequest::from_pairs(pairs)?;
    let source = SeaOrmSource::new(state.db.clone());
    let page = execute(&state.config, &request, &source).await?;
    Ok(Json(page))
}

/// Draw request as a JSON body.
pub async fn draw_json_handler(
    State(state): State<GridState>,
    Json(request): Json<DrawRequest>,
) -> Result<Json<ResultPage>, GridError> {
    let source = SeaOrmSource::new(state.db.clone());
    let page = execute(&state.config, &request, &source).await?;
    Ok(Json(page))
}

/// `GET|POST /` for form requests and `POST /json` for JSON bodies.
pub fn grid_router(state: GridState) -> Router {
    Router::new()
        .route("/", get(draw_handler).post(draw_handler))
        .route("/json", post(draw_json_handler))
        .with_state(state)
}
