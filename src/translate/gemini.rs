use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{Result, SasayakiError};
use super::session::{Candidate, ChatBackend, FinishReason, ModelResponse, Role, Turn};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";

const HARM_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<GeminiContent>,
    pub safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

/// A content part. Only text parts are produced by this crate; anything else
/// the API returns is kept as raw JSON so it can still be rendered as text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

impl GeminiPart {
    fn text<S: Into<String>>(text: S) -> Self {
        Self {
            text: Some(text.into()),
            other: serde_json::Map::new(),
        }
    }

    fn as_text(&self) -> String {
        match &self.text {
            Some(text) => text.clone(),
            None => serde_json::Value::Object(self.other.clone()).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

impl From<GenerateContentResponse> for ModelResponse {
    fn from(response: GenerateContentResponse) -> Self {
        let candidates = response
            .candidates
            .into_iter()
            .map(|candidate| Candidate {
                finish_reason: candidate
                    .finish_reason
                    .as_deref()
                    .map(FinishReason::from)
                    .unwrap_or_else(|| FinishReason::Other("UNSPECIFIED".to_string())),
                parts: candidate
                    .content
                    .map(|content| content.parts.iter().map(GeminiPart::as_text).collect())
                    .unwrap_or_default(),
            })
            .collect();

        ModelResponse { candidates }
    }
}

/// Google Gemini `generateContent` client.
pub struct GeminiBackend {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl GeminiBackend {
    pub fn new<S1: Into<String>, S2: Into<String>>(api_key: S1, model: S2) -> Result<Self> {
        Self::with_endpoint(api_key, model, DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint<S1, S2, S3>(api_key: S1, model: S2, endpoint: S3) -> Result<Self>
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()?;

        Ok(Self::with_client(client, api_key, model, endpoint))
    }

    fn with_client<S1, S2, S3>(client: Client, api_key: S1, model: S2, endpoint: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self {
            client,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: model.into(),
        }
    }

    /// Build the request body: prior turns, the new user turn, safety filters off.
    pub fn build_request(history: &[Turn], message: &str) -> GenerateContentRequest {
        let mut contents: Vec<GeminiContent> = history
            .iter()
            .map(|turn| GeminiContent {
                role: Some(turn.role),
                parts: vec![GeminiPart::text(turn.text.clone())],
            })
            .collect();
        contents.push(GeminiContent {
            role: Some(Role::User),
            parts: vec![GeminiPart::text(message)],
        });

        let safety_settings = HARM_CATEGORIES
            .iter()
            .map(|category| SafetySetting {
                category: category.to_string(),
                threshold: "BLOCK_NONE".to_string(),
            })
            .collect();

        GenerateContentRequest {
            contents,
            safety_settings,
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    async fn send(&self, history: &[Turn], message: &str) -> Result<ModelResponse> {
        let request = Self::build_request(history, message);
        let url = self.url();

        debug!("Sending Gemini request to {} ({} prior turns)", url, history.len());

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| SasayakiError::Translation(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error ({}): {}", status, error_text);
            return Err(SasayakiError::Translation(format!(
                "Gemini API error {}: {}",
                status, error_text
            )));
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| SasayakiError::Translation(format!("Failed to parse response: {}", e)))?;

        if body.candidates.is_empty() {
            let reason = body
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(SasayakiError::Translation(format!("Gemini blocked the prompt: {}", reason)));
        }

        Ok(body.into())
    }
}
