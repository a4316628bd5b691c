//! Configuration display endpoint handler.
//!
//! Shows the effective configuration (file values merged with CLI overrides)
//! rendered as TOML.

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use tracing::{debug, error, instrument};

use crate::handlers::health::FOOTER_TEXT;
use crate::state::SharedState;

/// Handler for the /config endpoint.
#[instrument(skip(state))]
pub async fn config_handler(State(state): State<SharedState>) -> impl IntoResponse {
    debug!("Processing /config request");

    match toml::to_string_pretty(state.config.as_ref()) {
        Ok(rendered) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; charset=utf-8")],
            format!(
                "HERAKLES PLUGIN AGENT - CONFIGURATION\n=====================================\n\n{rendered}\n{FOOTER_TEXT}"
            ),
        ),
        Err(e) => {
            error!("Failed to render configuration: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("Content-Type", "text/plain; charset=utf-8")],
                "Failed to render configuration".to_string(),
            )
        }
    }
}
