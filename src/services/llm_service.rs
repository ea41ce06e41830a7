use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;

/// Single entry point for every model call in the service. No other module
/// talks to the completion API directly; all four generation/evaluation
/// steps share this retry and parse policy.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// One user prompt, JSON-object response format, caller-chosen
    /// temperature. Returns the model's reply parsed as a JSON object.
    async fn complete_json(&self, prompt: &str, temperature: f32) -> Result<JsonValue>;
}

/// OpenAI-compatible chat-completions backend.
#[derive(Clone)]
pub struct OpenAiBackend {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiBackend {
    pub fn new(api_key: String, base_url: String, model: String, client: Client) -> Self {
        Self {
            client,
            api_key,
            base_url,
            model,
        }
    }
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    async fn complete_json(&self, prompt: &str, temperature: f32) -> Result<JsonValue> {
        let payload = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "user", "content": prompt}
            ],
            "response_format": { "type": "json_object" },
            "temperature": temperature,
        });

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let mut last_error: Option<crate::error::Error> = None;

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let delay = Duration::from_millis(500 * (1 << (attempt - 1)));
                tracing::warn!(
                    "completion attempt {} failed, retrying after {}ms",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&payload)
                .timeout(Duration::from_secs(120))
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(e.into());
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 || status.is_server_error() {
                let text = response.text().await.unwrap_or_default();
                last_error =
                    Some(anyhow::anyhow!("Completion API error {}: {}", status, text).into());
                continue;
            }
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                return Err(anyhow::anyhow!("Completion API error {}: {}", status, text).into());
            }

            let body: JsonValue = response.json().await?;
            let content = body
                .get("choices")
                .and_then(|c| c.get(0))
                .and_then(|c| c.get("message"))
                .and_then(|m| m.get("content"))
                .and_then(|c| c.as_str())
                .ok_or_else(|| anyhow::anyhow!("Invalid completion response format"))?;

            return parse_json_content(content)
                .ok_or_else(|| anyhow::anyhow!("Completion content is not valid JSON").into());
        }

        Err(last_error
            .unwrap_or_else(|| anyhow::anyhow!("Completion API unavailable after retries").into()))
    }
}

/// Best-effort extraction of a JSON object from model output. Models wrap
/// JSON in markdown fences or surround it with prose often enough that both
/// are handled before giving up.
pub fn parse_json_content(raw: &str) -> Option<JsonValue> {
    let stripped = strip_code_fences(raw);
    if let Ok(value) = serde_json::from_str::<JsonValue>(stripped) {
        if value.is_object() {
            return Some(value);
        }
    }
    let candidate = extract_json_object(stripped)?;
    serde_json::from_str(candidate).ok()
}

fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix("```json") {
        rest.trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or_else(|| rest.trim())
    } else if let Some(rest) = text.strip_prefix("```") {
        rest.trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or_else(|| rest.trim())
    } else {
        text
    }
}

/// Slice from the first '{' to the last '}', the shape prose-wrapped replies
/// take.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

/// Coerces `value[key]` into a list of non-empty strings, dropping anything
/// that is not a string.
pub fn string_list(value: &JsonValue, key: &str) -> Vec<String> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Reads `value[key]` as an integer score clamped into `[lo, hi]`. Accepts
/// numeric strings as well since models return both.
pub fn clamped_score(value: &JsonValue, key: &str, lo: u8, hi: u8) -> Option<u8> {
    let raw = value.get(key)?;
    let n = raw
        .as_i64()
        .or_else(|| raw.as_f64().map(|f| f.round() as i64))
        .or_else(|| raw.as_str().and_then(|s| s.trim().parse::<i64>().ok()))?;
    Some(n.clamp(lo as i64, hi as i64) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_plain_json() {
        let value = parse_json_content("{\"score\": 7}").unwrap();
        assert_eq!(value["score"], 7);
    }

    #[test]
    fn strips_json_fences() {
        let value = parse_json_content("```json\n{\"score\": 7}\n```").unwrap();
        assert_eq!(value["score"], 7);
    }

    #[test]
    fn strips_bare_fences() {
        let value = parse_json_content("```\n{\"ok\": true}\n```").unwrap();
        assert_eq!(value["ok"], true);
    }

    #[test]
    fn extracts_object_from_prose() {
        let raw = "Here is the evaluation you asked for: {\"score\": 4, \"feedback\": \"ok\"} Hope it helps!";
        let value = parse_json_content(raw).unwrap();
        assert_eq!(value["score"], 4);
    }

    #[test]
    fn rejects_non_json() {
        assert!(parse_json_content("no json here").is_none());
        assert!(parse_json_content("} backwards {").is_none());
    }

    #[test]
    fn string_list_drops_non_strings_and_blanks() {
        let value = json!({"skills": ["Go", 3, "", "  Rust  "]});
        assert_eq!(string_list(&value, "skills"), vec!["Go", "Rust"]);
        assert!(string_list(&value, "missing").is_empty());
        assert!(string_list(&json!({"skills": "Go"}), "skills").is_empty());
    }

    #[test]
    fn clamped_score_accepts_numbers_and_strings() {
        assert_eq!(clamped_score(&json!({"score": 8}), "score", 1, 10), Some(8));
        assert_eq!(
            clamped_score(&json!({"score": "9"}), "score", 1, 10),
            Some(9)
        );
        assert_eq!(
            clamped_score(&json!({"score": 42}), "score", 1, 10),
            Some(10)
        );
        assert_eq!(clamped_score(&json!({"score": 0}), "score", 1, 10), Some(1));
        assert_eq!(clamped_score(&json!({}), "score", 1, 10), None);
        assert_eq!(
            clamped_score(&json!({"score": "n/a"}), "score", 1, 10),
            None
        );
    }
}
