//! Plugin data endpoint handler.
//!
//! `GET /plugins` returns the latest record of every plugin as a JSON array,
//! either from the snapshot cache or from a live collection depending on
//! `query_from_memory`. Other methods are rejected with 405 by the router.

use axum::{extract::State, Json};
use tracing::{debug, instrument};

use herakles_plugin_agent::Record;

use crate::state::SharedState;

/// Handler for the /plugins endpoint.
#[instrument(skip(state))]
pub async fn plugins_handler(State(state): State<SharedState>) -> Json<Vec<Record>> {
    debug!(
        from_memory = state.manager.query_from_memory(),
        "Processing /plugins request"
    );
    let data = state.manager.get_plugins_data().await;
    debug!("Returning {} plugin records", data.len());
    Json(data)
}
