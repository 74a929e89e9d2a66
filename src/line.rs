use futures::StreamExt;
use reqwest::{Client, Response};

use crate::api_models::{LineMessage, PushRequest, ReplyRequest};
use crate::errors::LineError;

pub const LINE_API_BASE: &str = "https://api.line.me";
pub const LINE_DATA_API_BASE: &str = "https://api-data.line.me";

/// LINE caps every reply or push at five message objects.
const MAX_MESSAGES_PER_CALL: usize = 5;

pub struct LineClient {
    http: Client,
    access_token: String,
    api_base: String,
    data_api_base: String,
}

impl LineClient {
    pub fn new(access_token: &str) -> Self {
        Self::with_bases(access_token, LINE_API_BASE, LINE_DATA_API_BASE)
    }

    pub fn with_bases(access_token: &str, api_base: &str, data_api_base: &str) -> Self {
        Self {
            http: Client::new(),
            access_token: access_token.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            data_api_base: data_api_base.trim_end_matches('/').to_string(),
        }
    }

    pub async fn reply(&self, reply_token: &str, messages: &[LineMessage]) -> Result<(), LineError> {
        let endpoint = format!("{}/v2/bot/message/reply", self.api_base);
        let body = ReplyRequest {
            reply_token,
            messages: &messages[..messages.len().min(MAX_MESSAGES_PER_CALL)],
        };
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| LineError::network(&endpoint, e))?;
        check_status(&endpoint, response).await.map(|_| ())
    }

    pub async fn push(&self, to: &str, messages: &[LineMessage]) -> Result<(), LineError> {
        let endpoint = format!("{}/v2/bot/message/push", self.api_base);
        let body = PushRequest {
            to,
            messages: &messages[..messages.len().min(MAX_MESSAGES_PER_CALL)],
        };
        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| LineError::network(&endpoint, e))?;
        check_status(&endpoint, response).await.map(|_| ())
    }

    /// Downloads the binary content of an image message.
    pub async fn message_content(&self, message_id: &str) -> Result<Vec<u8>, LineError> {
        let endpoint = format!(
            "{}/v2/bot/message/{}/content",
            self.data_api_base,
            urlencoding::encode(message_id)
        );
        let response = self
            .http
            .get(&endpoint)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| LineError::network(&endpoint, e))?;
        let response = check_status(&endpoint, response).await?;

        let mut stream = response.bytes_stream();
        let mut image = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| LineError::network(&endpoint, e))?;
            image.extend_from_slice(&chunk);
        }
        Ok(image)
    }
}

async fn check_status(endpoint: &str, response: Response) -> Result<Response, LineError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(LineError::Api {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        body,
    })
}
