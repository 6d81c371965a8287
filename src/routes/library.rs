use axum::{
    Extension, Json,
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::{AppState, auth::SessionProfile};

/// The signed-in reader's profile, as the frontend consumes it.
pub async fn usersetup(Extension(profile): Extension<SessionProfile>) -> Json<SessionProfile> {
    Json(profile)
}

/// Reader frontend from `server.static_dir`.
pub async fn static_files(State(state): State<AppState>, req: Request) -> Response {
    let Some(dir) = state.config.server.static_dir.as_ref() else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let serve_dir = ServeDir::new(dir).append_index_html_on_directories(true);
    match serve_dir.oneshot(req).await {
        Ok(response) => response.into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to serve static file");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
