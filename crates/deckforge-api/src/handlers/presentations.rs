use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use deckforge_core::{GenerateRequest, SlideDeck};

use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

/// Generate a presentation from a source document, image, or video.
///
/// The `.pptx` is saved in the server's results directory; the response carries
/// the generated deck.
#[utoipa::path(
    post,
    path = "/generate-ppt",
    tag = "presentations",
    request_body = GenerateRequest,
    responses(
        (status = 200, description = "Presentation generated", body = SlideDeck),
        (status = 400, description = "Invalid request parameters", body = ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = ErrorResponse),
        (status = 422, description = "Source could not be read", body = ErrorResponse),
        (status = 429, description = "Too many failed authentication attempts"),
        (status = 502, description = "Image or model provider failure", body = ErrorResponse),
        (status = 500, description = "Rendering or internal failure", body = ErrorResponse)
    ),
    security(("api_key" = []), ("bearer" = []))
)]
pub async fn generate_presentation(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<GenerateRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    tracing::info!(
        file_type = %request.file_type,
        n_slides = request.request_args.n_slides,
        "Presentation requested"
    );

    let output = state.workflow.run(request).await?;

    tracing::info!(
        title = %output.deck.title,
        path = %output.output_path.display(),
        "Presentation request completed"
    );
    Ok(Json(output.deck))
}
