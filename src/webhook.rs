use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

use crate::api_models::{LineMessage, WebhookEvent, WebhookPayload};
use crate::errors::{LineError, WebhookError};
use crate::line::LineClient;
use crate::messages::{self, outcome_message};
use crate::recognition::{Pipeline, PipelineOutcome, Recognizer};

pub const SIGNATURE_HEADER: &str = "x-line-signature";

type HmacSha256 = Hmac<Sha256>;

/// Read-only handles shared by every request.
pub struct AppState {
    pub pipeline: Pipeline<Box<dyn Recognizer>>,
    pub line: LineClient,
    pub channel_secret: String,
}

/// Checks `signature` against base64(HMAC-SHA256(secret, body)) in constant time.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = base64::engine::general_purpose::STANDARD.decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

pub fn parse_webhook(
    secret: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<WebhookPayload, WebhookError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingSignature)?;

    if !verify_signature(secret, body, signature) {
        return Err(WebhookError::BadSignature);
    }

    serde_json::from_slice(body).map_err(|e| WebhookError::InvalidBody {
        message: e.to_string(),
    })
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
}

pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Webhook server listening on {}", addr);
    axum::serve(listener, router(state)).await
}

async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<&'static str, (StatusCode, String)> {
    let payload = parse_webhook(&state.channel_secret, &headers, &body).map_err(|e| {
        log::warn!("Rejected webhook call: {}", e);
        (StatusCode::BAD_REQUEST, e.to_string())
    })?;

    log::debug!(
        "Webhook for {} with {} event(s)",
        payload.destination,
        payload.events.len()
    );

    for event in payload.events {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            handle_event(&state, event).await;
        });
    }

    Ok("OK")
}

async fn handle_event(state: &AppState, event: WebhookEvent) {
    let message_kind = event.message.as_ref().map(|m| m.kind.as_str());
    match (event.kind.as_str(), message_kind) {
        ("message", Some("image")) => handle_image(state, &event).await,
        ("message", Some("text")) => {
            if let Some(token) = event.reply_token.as_deref() {
                let reply = [messages::text(messages::SEND_SCREENSHOT_TEXT)];
                if let Err(e) = state.line.reply(token, &reply).await {
                    log::warn!("Could not answer text message: {}", e);
                }
            }
        }
        (kind, message) => log::debug!("Ignoring {} event ({:?})", kind, message),
    }
}

async fn handle_image(state: &AppState, event: &WebhookEvent) {
    let request_id = Uuid::new_v4().simple().to_string()[..8].to_string();
    let Some(message) = event.message.as_ref() else {
        return;
    };

    if let Some(token) = event.reply_token.as_deref() {
        let ack = [messages::text(messages::RECOGNIZING_TEXT)];
        if let Err(e) = state.line.reply(token, &ack).await {
            log::warn!("[{}] Could not send progress reply: {}", request_id, e);
        }
    }

    let Some(target) = event.source.as_ref().and_then(|s| s.push_target()) else {
        log::warn!("[{}] Image event has no push target; dropping", request_id);
        return;
    };

    let content = state.line.message_content(&message.id).await;
    let (outcome, reply) = image_reply(&state.pipeline, content).await;
    match &outcome {
        PipelineOutcome::Found(matches) => {
            log::info!("[{}] Found {} venue(s)", request_id, matches.len())
        }
        PipelineOutcome::NotFound(reason) => {
            log::info!("[{}] No venue found ({})", request_id, reason.as_str())
        }
    }

    if let Err(e) = state.line.push(target, &[reply]).await {
        log::error!("[{}] Could not push result: {}", request_id, e);
    }
}

/// Runs the pipeline on downloaded content and renders the push message.
pub async fn image_reply<R: Recognizer>(
    pipeline: &Pipeline<R>,
    content: Result<Vec<u8>, LineError>,
) -> (PipelineOutcome, LineMessage) {
    let outcome = match content {
        Ok(image) => pipeline.run(&image).await,
        Err(e) => {
            log::warn!("Image download failed: {}", e);
            pipeline.process_text(None)
        }
    };
    let reply = outcome_message(&outcome);
    (outcome, reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RecognitionError;
    use crate::recognition::NotFoundReason;
    use async_trait::async_trait;
    use axum::http::HeaderValue;

    const SECRET: &str = "channel-secret";

    fn sign(body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(body);
        base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    }

    fn headers_with(signature: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(SIGNATURE_HEADER, HeaderValue::from_str(signature).unwrap());
        headers
    }

    struct FixedRecognizer(&'static str);

    #[async_trait]
    impl Recognizer for FixedRecognizer {
        async fn recognize(&self, _image: &[u8]) -> Result<String, RecognitionError> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn valid_signature_passes() {
        let body = br#"{"destination":"U0","events":[]}"#;
        assert!(verify_signature(SECRET, body, &sign(body)));
        let payload = parse_webhook(SECRET, &headers_with(&sign(body)), body).unwrap();
        assert!(payload.events.is_empty());
    }

    #[test]
    fn tampered_body_or_garbage_signature_fails() {
        let body = br#"{"events":[]}"#;
        let signature = sign(body);
        assert!(!verify_signature(SECRET, br#"{"events":[1]}"#, &signature));
        assert!(!verify_signature("other-secret", body, &signature));
        assert!(!verify_signature(SECRET, body, "%%%not-base64"));
        assert_eq!(
            parse_webhook(SECRET, &headers_with("AAAA"), body).unwrap_err(),
            WebhookError::BadSignature
        );
    }

    #[test]
    fn missing_signature_is_rejected() {
        let body = br#"{"events":[]}"#;
        assert_eq!(
            parse_webhook(SECRET, &HeaderMap::new(), body).unwrap_err(),
            WebhookError::MissingSignature
        );
    }

    #[test]
    fn signed_garbage_body_is_invalid() {
        let body = b"not json";
        assert!(matches!(
            parse_webhook(SECRET, &headers_with(&sign(body)), body),
            Err(WebhookError::InvalidBody { .. })
        ));
    }

    #[test]
    fn image_reply_renders_found_venue() {
        let pipeline = Pipeline::new(FixedRecognizer(r#"{"name":"秋甜","address":"中壢"}"#));
        let (outcome, reply) = tokio_test::block_on(image_reply(&pipeline, Ok(vec![1, 2, 3])));
        assert!(outcome.is_found());
        assert!(matches!(reply, LineMessage::Flex { .. }));
    }

    #[test]
    fn download_failure_renders_not_found() {
        let pipeline = Pipeline::new(FixedRecognizer(r#"{"name":"秋甜"}"#));
        let failure = Err(LineError::Api {
            endpoint: "content".into(),
            status: 404,
            body: String::new(),
        });
        let (outcome, reply) = tokio_test::block_on(image_reply(&pipeline, failure));
        assert_eq!(outcome, PipelineOutcome::NotFound(NotFoundReason::RecognitionFailed));
        assert_eq!(reply, messages::text(messages::NOT_FOUND_TEXT));
    }

    #[test]
    fn boxed_recognizer_runs_through_pipeline() {
        let boxed: Box<dyn Recognizer> = Box::new(FixedRecognizer("not valid json"));
        let pipeline = Pipeline::new(boxed);
        let outcome = tokio_test::block_on(pipeline.run(b"img"));
        assert_eq!(outcome, PipelineOutcome::NotFound(NotFoundReason::MalformedResponse));
    }
}
