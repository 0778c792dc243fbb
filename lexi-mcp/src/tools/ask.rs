use crate::orchestrator::AskService;
use crate::response::{AskRequest, AskResponse};
use tracing::info;

/// Runs one request and renders the outcome as JSON.
///
/// `Ok` carries the response payload. `Err` carries `{status, detail}` with a
/// message safe to show the caller.
pub async fn ask(service: &AskService, request: AskRequest) -> Result<String, String> {
    info!(
        "Processing ask: {} chars, mode={:?}",
        request.question.chars().count(),
        request.mode
    );

    match service.ask(&request).await {
        Ok(response) => render(&response),
        Err(e) => {
            let body = e.body();
            info!("Ask rejected with status {}", body.status);
            Err(serde_json::to_string(&body).unwrap_or_else(|_| body.detail.clone()))
        }
    }
}

fn render(response: &AskResponse) -> Result<String, String> {
    serde_json::to_string_pretty(response).map_err(|e| format!("failed to encode response: {e}"))
}
