//! # gridcrate
//!
//! Server-side processing for interactive grid widgets: a client sends paging
//! offsets, sort directives and a search term, the server answers with one page
//! of rows plus total and filtered row counts.
//!
//! ```rust,ignore
//! use gridcrate::{GridBuilder, GridState, QueryPlan, routes::grid_router};
//!
//! let config = GridBuilder::new(QueryPlan::from_table("users").select("id, name, email"))
//!     .searchable("name, email")
//!     .edit_column("email", "<a href=\"mailto:$1\">$1</a>", "email")
//!     .build()?;
//!
//! let app = axum::Router::new().nest("/users/grid", grid_router(GridState::new(config, db)));
//! ```
//!
//! ## Modules
//!
//! - [`splitter`]: bracket-aware splitting of column and argument lists
//! - [`plan`]: the declarative [`QueryPlan`] and its sea-query compiler
//! - [`filtering`]: global search, declared filters, sorting and paging
//! - [`templating`]: per-cell display templates and whitelisted functions
//! - [`config`]: immutable [`GridConfig`] and its [`GridBuilder`]
//! - [`core`](crate::core): the [`DataSource`] seam and the page assembler
//! - [`routes`]: axum handlers
//! - [`errors`]: [`GridError`]

pub mod config;
pub mod core;
pub mod errors;
pub mod filtering;
pub mod models;
pub mod plan;
pub mod routes;
pub mod splitter;
pub mod templating;

pub use self::core::{DataSource, SeaOrmSource, execute, execute_plan};
pub use config::{GridBuilder, GridConfig, IdentifierMode, SearchColumns};
pub use errors::GridError;
pub use models::{DrawRequest, ResultPage, RowData, RowRecord};
pub use plan::QueryPlan;
pub use routes::GridState;
pub use serde_with;
