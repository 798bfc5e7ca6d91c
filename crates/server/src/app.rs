// SPDX-License-Identifier: MIT

//! Route registration, grounded on `original_source/handler/route.go`'s
//! `RegisterRoutes` (CORS + logging middleware, swagger, static client,
//! `/api/v1` task and SSE groups).

use std::path::Path;

use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::routes::{logs, sse, tasks};
use crate::state::AppState;

/// Build the full router. `swagger_file_path`, when it names an existing
/// file, is served raw at `/api/v1/docs` (`RegisterSwagger`'s existence
/// check, ported directly — no Swagger-UI crate is pulled in).
pub fn build(state: AppState, swagger_file_path: Option<&Path>) -> Router {
    let api = Router::new()
        .route("/tasks", post(tasks::create_task).get(tasks::list_tasks))
        .route("/tasks/{id}", get(tasks::get_task))
        .route("/tasks/{id}/cancel", delete(tasks::cancel_task))
        .route("/tasks/{id}/logs", get(logs::get_logs))
        .route("/tasks/{id}/logs/download", get(logs::download_logs))
        .route("/events", get(sse::events));

    let api = match swagger_file_path {
        Some(path) if path.is_file() => {
            let path = path.to_path_buf();
            api.route(
                "/docs",
                get(move || {
                    let path = path.clone();
                    async move {
                        tokio::fs::read_to_string(&path)
                            .await
                            .unwrap_or_else(|_| "{}".to_string())
                    }
                }),
            )
        }
        _ => api,
    };

    Router::new()
        .nest("/api/v1", api)
        .fallback_service(ServeDir::new("./web"))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
