//! OpenAPI documentation, served at `/api/openapi.json` and browsable at `/docs`.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use deckforge_core::models;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_key",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-API-Key"))),
        );
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Deckforge API",
        version = "0.1.0",
        description = "Generates slide presentations from documents, spreadsheets, web pages, images, and YouTube videos. A hosted language model summarizes the source and writes the slides; the deck is saved as a .pptx file."
    ),
    paths(
        handlers::root::root,
        handlers::root::health_check,
        handlers::presentations::generate_presentation,
    ),
    components(
        schemas(
            models::RequestSchema,
            models::GenerateRequest,
            models::Language,
            models::Slide,
            models::SlideDeck,
            error::ErrorResponse,
            handlers::root::Greeting,
            handlers::root::HealthResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "meta", description = "Service probes"),
        (name = "presentations", description = "Presentation generation")
    )
)]
pub struct ApiDoc;
