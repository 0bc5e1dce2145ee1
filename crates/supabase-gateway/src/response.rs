//! Shared handling of backend error bodies.

use crate::error::GatewayError;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Fingerprint of a body we could not interpret, safe to log.
pub(crate) fn summarize_response_body(body: &str) -> String {
    let mut hasher = DefaultHasher::new();
    body.hash(&mut hasher);
    format!("len={},digest={:016x}", body.len(), hasher.finish())
}

/// Pull the human-readable message out of a GoTrue or PostgREST error body.
pub(crate) fn error_message_from_body(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["error_description", "msg", "message", "error"]
        .iter()
        .filter_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::trim)
        .find(|message| !message.is_empty())
        .map(str::to_string)
}

/// Consume a non-success response into [`GatewayError::Rejected`].
pub(crate) async fn rejection(response: reqwest::Response, context: &str) -> GatewayError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = error_message_from_body(&body).unwrap_or_else(|| {
        format!(
            "{} failed: {}",
            context,
            summarize_response_body(&body)
        )
    });

    tracing::warn!(
        status = %status,
        body_summary = %summarize_response_body(&body),
        context,
        "Backend rejected request"
    );

    GatewayError::Rejected {
        status: status.as_u16(),
        message,
    }
}
