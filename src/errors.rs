use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required setting: {key}")]
    Missing { key: String },

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    pub fn missing(key: &str) -> Self {
        Self::Missing {
            key: key.to_string(),
        }
    }

    pub fn invalid(key: &str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    #[error("Recognition request failed: {message}")]
    Network { message: String },

    #[error("Recognition service returned status {status}")]
    Status { status: u16 },

    #[error("Recognition service response could not be decoded: {message}")]
    Decode { message: String },

    #[error("Recognition service returned no text")]
    EmptyOutput,
}

impl RecognitionError {
    pub fn network(source: reqwest::Error) -> Self {
        Self::Network {
            message: source.to_string(),
        }
    }

    pub fn decode(source: impl std::fmt::Display) -> Self {
        Self::Decode {
            message: source.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("LINE request to {endpoint} failed: {message}")]
    Network { endpoint: String, message: String },

    #[error("LINE API {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
}

impl LineError {
    pub fn network(endpoint: &str, source: reqwest::Error) -> Self {
        Self::Network {
            endpoint: endpoint.to_string(),
            message: source.to_string(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WebhookError {
    #[error("Missing X-Line-Signature header")]
    MissingSignature,

    #[error("Webhook signature does not match body")]
    BadSignature,

    #[error("Webhook body is not a valid event payload: {message}")]
    InvalidBody { message: String },
}
