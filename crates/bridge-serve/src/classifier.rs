use bridge_core::safety::{Classifier, ClassifierError, Verdict};
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const REQUEST_TIMEOUT_SECS: u64 = 20;

const PROMPT: &str = r#"You are a scam detection expert helping elderly users in India identify fraudulent messages.

Analyze the following text for scam or phishing indicators:
- Urgency tactics ("act now", "limited time", "account will be blocked")
- Requests for OTP, PIN, passwords or bank details
- Suspicious links or phone numbers
- Too-good-to-be-true offers (lottery wins, free money)
- Impersonation of banks, government or companies
- Threats or fear tactics

Respond ONLY with JSON in exactly this shape:
{"is_danger": true or false, "reason_english": "two or three simple sentences", "reason_tamil": "the same explanation in Tamil"}

TEXT TO ANALYZE:
"#;

/// Gemini `generateContent` backed scam classifier.
pub struct GeminiClassifier {
    client: Client,
    api_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ModelVerdict {
    is_danger: bool,
    reason_english: String,
    #[serde(alias = "reason_local")]
    reason_tamil: String,
}

impl GeminiClassifier {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Result<Self, ClassifierError> {
        Self::with_api_url(DEFAULT_API_URL, api_key, model)
    }

    pub fn with_api_url(
        api_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
    ) -> Result<Self, ClassifierError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|err| ClassifierError::Unavailable {
                reason: err.to_string(),
            })?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: model.into(),
        })
    }
}

impl Classifier for GeminiClassifier {
    fn analyze(&self, text: &str) -> Result<Verdict, ClassifierError> {
        let key = self.api_key.as_deref().ok_or(ClassifierError::NotConfigured)?;
        let body = json!({
            "contents": [{ "parts": [{ "text": format!("{PROMPT}\"{text}\"") }] }]
        });
        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.api_url, self.model
            ))
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .map_err(|err| ClassifierError::Unavailable {
                reason: err.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "gemini request rejected");
            return Err(ClassifierError::Unavailable {
                reason: format!("status {status}"),
            });
        }
        let value: Value = response.json().map_err(|err| ClassifierError::Malformed {
            reason: err.to_string(),
        })?;
        let output = candidate_text(&value).ok_or_else(|| ClassifierError::Malformed {
            reason: "response has no candidate text".to_string(),
        })?;
        debug!(len = output.len(), "gemini verdict received");
        parse_verdict(output)
    }
}

fn candidate_text(value: &Value) -> Option<&str> {
    value
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
}

/// Models often wrap JSON in a markdown fence despite being told not to.
fn parse_verdict(output: &str) -> Result<Verdict, ClassifierError> {
    let trimmed = output.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end().trim_end_matches("```"))
        .unwrap_or(trimmed)
        .trim();
    let verdict: ModelVerdict =
        serde_json::from_str(unfenced).map_err(|err| ClassifierError::Malformed {
            reason: err.to_string(),
        })?;
    Ok(Verdict {
        is_danger: verdict.is_danger,
        reason_english: verdict.reason_english,
        reason_local: verdict.reason_tamil,
        analyzed: true,
    })
}
