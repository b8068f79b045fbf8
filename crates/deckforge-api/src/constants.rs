//! API constants

/// Path of the served OpenAPI document
pub const OPENAPI_PATH: &str = "/api/openapi.json";

/// Mount point of the RapiDoc viewer
pub const DOCS_PATH: &str = "/docs";

/// Largest accepted request body. Sources are fetched by URL, so bodies stay small.
pub const MAX_REQUEST_BODY_BYTES: usize = 1024 * 1024;

/// Minimum length of `MASTER_API_KEY`
pub const MIN_MASTER_API_KEY_LEN: usize = 32;

/// Failed authentication attempts allowed per client within the window
pub const AUTH_MAX_FAILURES: u32 = 10;

/// Window of the authentication failure limiter, in seconds
pub const AUTH_FAILURE_WINDOW_SECS: u64 = 300;

/// Header carrying the API key (alternative to `Authorization: Bearer`)
pub const API_KEY_HEADER: &str = "x-api-key";
