use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::OcrConfig;
use crate::error::{PipelineError, Result};

const EXTRACTION_PROMPT: &str = "Extract all text from this image. Return only the extracted text without any explanations or formatting.";
const MAX_RETRIES: u32 = 3;

/// Client for any OpenAI-compatible `/chat/completions` endpoint that accepts
/// image content parts (OpenAI, OpenRouter, Ollama).
#[derive(Clone, Debug)]
pub struct OpenAiVisionClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

fn default_base_url(provider: &str) -> Option<&'static str> {
    match provider {
        "openai" => Some("https://api.openai.com/v1"),
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "ollama" => Some("http://localhost:11434/v1"),
        _ => None,
    }
}

impl OpenAiVisionClient {
    /// `provider` is the `OCR_MODEL` prefix and `model` the remainder.
    ///
    /// Hosted providers need `OCR_API_KEY`; a local Ollama does not.
    pub fn new(config: &OcrConfig, provider: &str, model: &str) -> Result<Self> {
        let provider = provider.to_lowercase();

        if config.api_key.is_none() && provider != "ollama" {
            return Err(PipelineError::OcrUnavailable(format!(
                "API key required for {provider} vision OCR"
            )));
        }

        let base_url = config
            .base_url
            .clone()
            .or_else(|| default_base_url(&provider).map(String::from))
            .ok_or_else(|| {
                PipelineError::OcrUnavailable(format!("No base URL known for provider {provider}"))
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PipelineError::Ocr(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send a PNG and return the model's transcription verbatim.
    pub async fn ocr(&self, png_bytes: &[u8]) -> Result<String> {
        let data_url = format!("data:image/png;base64,{}", STANDARD.encode(png_bytes));

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: EXTRACTION_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ],
            }],
            max_tokens: 4096,
        };

        self.make_request(&request).await
    }

    async fn make_request(&self, request: &ChatRequest) -> Result<String> {
        let mut retries = 0;

        loop {
            let mut builder = self
                .client
                .post(format!("{}/chat/completions", self.base_url))
                .json(request);
            if let Some(key) = &self.api_key {
                builder = builder.bearer_auth(key);
            }

            match builder.send().await {
                Ok(resp) if resp.status().is_success() => {
                    let chat_response: ChatResponse = resp.json().await.map_err(|e| {
                        PipelineError::Ocr(format!("Failed to parse response: {e}"))
                    })?;

                    return chat_response
                        .choices
                        .into_iter()
                        .next()
                        .map(|c| c.message.content.unwrap_or_default())
                        .ok_or_else(|| PipelineError::Ocr("No response from API".to_string()));
                }
                Ok(resp) if resp.status().as_u16() == 429 || resp.status().is_server_error() => {
                    retries += 1;
                    if retries >= MAX_RETRIES {
                        return Err(PipelineError::Ocr(format!(
                            "API request failed after {MAX_RETRIES} retries: {}",
                            resp.status()
                        )));
                    }
                    tracing::debug!(status = %resp.status(), retries, "Vision OCR request will be retried");
                }
                Ok(resp) => {
                    let status = resp.status();
                    let body = resp.text().await.unwrap_or_default();
                    return Err(PipelineError::Ocr(format!(
                        "API request failed: {status} - {body}"
                    )));
                }
                Err(e) => {
                    retries += 1;
                    if retries >= MAX_RETRIES {
                        return Err(PipelineError::Ocr(format!(
                            "API request failed after {MAX_RETRIES} retries: {e}"
                        )));
                    }
                }
            }

            tokio::time::sleep(Duration::from_millis(100 * 2_u64.pow(retries))).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(api_key: Option<&str>, base_url: Option<String>) -> OcrConfig {
        OcrConfig {
            model: "openai/gpt-4o".to_string(),
            api_key: api_key.map(String::from),
            base_url,
            languages: "eng".to_string(),
            timeout_secs: 5,
        }
    }

    fn completion(text: &str) -> serde_json::Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": text } }] })
    }

    #[test]
    fn test_hosted_provider_requires_api_key() {
        let err = OpenAiVisionClient::new(&config(None, None), "openai", "gpt-4o").unwrap_err();
        assert!(err.to_string().contains("API key required"));
    }

    #[test]
    fn test_ollama_needs_no_api_key() {
        let client = OpenAiVisionClient::new(&config(None, None), "ollama", "llava").unwrap();
        assert_eq!(client.base_url, "http://localhost:11434/v1");
        assert_eq!(client.model(), "llava");
    }

    #[test]
    fn test_custom_base_url_trailing_slash_trimmed() {
        let cfg = config(Some("k"), Some("https://custom.api.com/v1/".to_string()));
        let client = OpenAiVisionClient::new(&cfg, "openai", "gpt-4o").unwrap();
        assert_eq!(client.base_url, "https://custom.api.com/v1");
    }

    #[tokio::test]
    async fn test_ocr_returns_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("HELLO\nWORLD")))
            .expect(1)
            .mount(&server)
            .await;

        let cfg = config(Some("test-key"), Some(server.uri()));
        let client = OpenAiVisionClient::new(&cfg, "openai", "gpt-4o").unwrap();
        let text = client.ocr(&[0x89, 0x50, 0x4E, 0x47]).await.unwrap();
        assert_eq!(text, "HELLO\nWORLD");
    }

    #[tokio::test]
    async fn test_ocr_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
            .mount(&server)
            .await;

        let cfg = config(Some("k"), Some(server.uri()));
        let client = OpenAiVisionClient::new(&cfg, "openai", "gpt-4o").unwrap();
        assert_eq!(client.ocr(&[1, 2, 3]).await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_ocr_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .expect(1)
            .mount(&server)
            .await;

        let cfg = config(Some("k"), Some(server.uri()));
        let client = OpenAiVisionClient::new(&cfg, "openai", "gpt-4o").unwrap();
        let err = client.ocr(&[1]).await.unwrap_err();
        assert!(matches!(err, PipelineError::Ocr(_)));
        assert!(err.to_string().contains("bad key"));
    }
}
