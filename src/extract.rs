//! Receipt image to structured transaction data, via a hosted vision
//! model with an OpenAI-compatible chat-completions API.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use service::{ServiceError, ServiceResult};
use std::time::Duration;
use tracing::{debug, instrument};
use utoipa::ToSchema;

const EXTRACTION_PROMPT: &str = "Extract the receipt in this image as JSON with keys: \
merchant (string or null), total (decimal string), currency_code (ISO 4217 string or null), \
occurred_on (YYYY-MM-DD string or null), line_items (array of {name, quantity, amount}). \
Reply with the JSON object only.";

/// One extracted receipt line.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReceiptLineItem {
    pub name: String,
    pub quantity: Option<Decimal>,
    pub amount: Decimal,
}

/// Structured data extracted from a receipt image.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReceiptData {
    pub merchant: Option<String>,
    pub total: Decimal,
    pub currency_code: Option<String>,
    pub occurred_on: Option<NaiveDate>,
    #[serde(default)]
    pub line_items: Vec<ReceiptLineItem>,
}

/// Client for the extraction model API. Built once at startup and
/// shared through [`crate::schemas::AppState`].
#[derive(Clone, Debug)]
pub struct ReceiptExtractor {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl ReceiptExtractor {
    pub fn new(api_url: &str, api_key: &str, model: &str) -> Self {
        // reqwest's builder only fails on TLS backend misconfiguration
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    /// Sends the image to the model and parses its reply.
    #[instrument(skip(self, image))]
    pub async fn extract(&self, image: &[u8], mime: &str) -> ServiceResult<ReceiptData> {
        let encoded = STANDARD.encode(image);
        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": EXTRACTION_PROMPT },
                    {
                        "type": "image_url",
                        "image_url": { "url": format!("data:{mime};base64,{encoded}") }
                    }
                ]
            }],
            "response_format": { "type": "json_object" }
        });

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| ServiceError::Extraction(format!("request failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Extraction(format!(
                "model API returned {status}"
            )));
        }

        let reply: serde_json::Value = response
            .json()
            .await
            .map_err(|err| ServiceError::Extraction(format!("unreadable reply: {err}")))?;
        let content = reply["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ServiceError::Extraction("reply carries no content".to_string()))?;

        debug!(bytes = image.len(), "receipt extracted");
        parse_model_reply(content)
    }
}

/// Parses the model's textual reply into [`ReceiptData`]. Tolerates a
/// markdown code fence around the JSON object.
pub fn parse_model_reply(content: &str) -> ServiceResult<ReceiptData> {
    let trimmed = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    serde_json::from_str(trimmed)
        .map_err(|err| ServiceError::Extraction(format!("malformed extraction reply: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn parses_plain_json_reply() {
        let data = parse_model_reply(
            r#"{"merchant":"Cafe","total":"42.50","currency_code":"BRL",
                "occurred_on":"2024-03-01",
                "line_items":[{"name":"Espresso","quantity":"2","amount":"9.00"}]}"#,
        )
        .unwrap();
        assert_eq!(data.merchant.as_deref(), Some("Cafe"));
        assert_eq!(data.total, dec!(42.50));
        assert_eq!(data.line_items.len(), 1);
        assert_eq!(data.line_items[0].amount, dec!(9.00));
    }

    #[test]
    fn parses_fenced_reply() {
        let data =
            parse_model_reply("```json\n{\"merchant\":null,\"total\":\"10.00\"}\n```").unwrap();
        assert_eq!(data.total, dec!(10.00));
        assert!(data.line_items.is_empty());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_model_reply("sorry, I cannot read this").is_err());
    }
}
