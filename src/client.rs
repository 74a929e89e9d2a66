use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;

use crate::api_models::{
    GeminiRequest, GeminiResponse, GenerationConfig, RequestContent, RequestPart,
};
use crate::config::GeminiConfig;
use crate::errors::RecognitionError;
use crate::recognition::Recognizer;

const RECOGNITION_PROMPT: &str = r#"
你是圖片內容分析專家，專門從社群貼文、限時動態或地圖截圖中找出店家資訊。

【任務】找出圖片中所有店家的「名稱」與「地址」

【判斷邏輯】
店家名稱：最大、最顯眼的文字，可能是 Logo、招牌或貼文標題
如果只看得到社群帳號（例如 @no5ca_fe），把帳號原樣填入 original_handle，name 填你對店名的最佳判讀
地址：包含「市、區、路、街、巷、號」的文字；只有地區名稱也可以
food_keywords：描述食物類型的詞，用空白分隔，例如 "拉麵 丼飯"

【重要規則】
1. 找不到就填 "unknown"，不要瞎猜
2. 必須回傳有效的 JSON，不要加任何說明文字

【回傳格式】
{
  "restaurants": [
    {"name": "店家名稱或unknown", "address": "地址或unknown", "original_handle": "社群帳號或空字串"}
  ],
  "food_keywords": "食物關鍵字",
  "count": 1
}
"#;

/// Guesses the image MIME type from its magic bytes; LINE mostly sends JPEG.
pub fn sniff_mime_type(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        "image/jpeg"
    }
}

/// Gemini vision client, built once per process and shared by every request.
pub struct GeminiClient {
    http: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Result<Self, RecognitionError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(RecognitionError::network)?;
        Ok(Self { http, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{base}/v1beta/models/{model}:generateContent",
            base = self.config.base_url.trim_end_matches('/'),
            model = self.config.model
        )
    }

    fn build_request(image: &[u8]) -> GeminiRequest {
        let data = base64::engine::general_purpose::STANDARD.encode(image);
        GeminiRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::text(RECOGNITION_PROMPT),
                    RequestPart::inline(sniff_mime_type(image), data),
                ],
            }],
            generation_config: Some(GenerationConfig {
                temperature: Some(0.0),
                max_output_tokens: Some(1024),
            }),
        }
    }
}

#[async_trait]
impl Recognizer for GeminiClient {
    async fn recognize(&self, image: &[u8]) -> Result<String, RecognitionError> {
        log::debug!(
            "Sending {} byte image to {} for recognition",
            image.len(),
            self.config.model
        );

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&Self::build_request(image))
            .send()
            .await
            .map_err(|e| RecognitionError::network(e.without_url()))?;

        if !response.status().is_success() {
            return Err(RecognitionError::Status {
                status: response.status().as_u16(),
            });
        }

        let body: GeminiResponse = response
            .json()
            .await
            .map_err(|e| RecognitionError::decode(e.without_url()))?;

        let text = body.first_text();
        if text.trim().is_empty() {
            return Err(RecognitionError::EmptyOutput);
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(sniff_mime_type(&[0x89, b'P', b'N', b'G', 0x0d]), "image/png");
        assert_eq!(sniff_mime_type(b"GIF89a"), "image/gif");
        assert_eq!(sniff_mime_type(b"RIFF\x00\x00\x00\x00WEBPVP8 "), "image/webp");
        assert_eq!(sniff_mime_type(&[0xff, 0xd8, 0xff]), "image/jpeg");
        assert_eq!(sniff_mime_type(&[]), "image/jpeg");
    }

    #[test]
    fn endpoint_trims_trailing_slash() {
        let client = GeminiClient::new(GeminiConfig {
            api_key: "k".into(),
            base_url: "http://localhost:9/".into(),
            ..GeminiConfig::default()
        })
        .unwrap();
        assert_eq!(
            client.endpoint(),
            "http://localhost:9/v1beta/models/gemini-1.5-flash:generateContent"
        );
    }

    #[test]
    fn request_carries_prompt_and_image() {
        let request = GeminiClient::build_request(b"GIF89a");
        let json = serde_json::to_value(&request).unwrap();
        let parts = &json["contents"][0]["parts"];
        assert!(parts[0]["text"].as_str().unwrap().contains("restaurants"));
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/gif");
        assert_eq!(parts[1]["inline_data"]["data"], "R0lGODlh");
    }

    #[test]
    fn unreachable_service_is_a_recognition_error() {
        let client = GeminiClient::new(GeminiConfig {
            api_key: "k".into(),
            base_url: "http://127.0.0.1:1".into(),
            timeout_ms: 1_000,
            ..GeminiConfig::default()
        })
        .unwrap();
        let result = tokio_test::block_on(client.recognize(b"img"));
        assert!(matches!(result, Err(RecognitionError::Network { .. })));
    }
}
