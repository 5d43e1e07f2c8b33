use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::config::GeminiConfig;
use crate::error::AppError;
use crate::recognizer::FoodRecognizer;

const PROMPT: &str = "List each food in this image and its calories per 100g. \
Return a JSON array like [{\"name\": \"Apple\", \"calories\": 52}].";

// ---- request body ----

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: &'static str,
    data: String,
}

// ---- response envelope ----
//
// Every level is optional so a missing field is reported by name instead of
// surfacing as an opaque deserialization error.

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<TextPart>>,
}

#[derive(Debug, Deserialize)]
struct TextPart {
    text: Option<String>,
}

fn extract_text(response: GenerateResponse) -> Result<String, AppError> {
    let candidate = response
        .candidates
        .and_then(|mut c| (!c.is_empty()).then(|| c.remove(0)))
        .ok_or(AppError::MissingField("candidates"))?;
    let content = candidate.content.ok_or(AppError::MissingField("content"))?;
    let part = content
        .parts
        .and_then(|mut p| (!p.is_empty()).then(|| p.remove(0)))
        .ok_or(AppError::MissingField("parts"))?;
    part.text.ok_or(AppError::MissingField("text"))
}

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiRecognizer {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl GeminiRecognizer {
    pub fn new(config: &GeminiConfig) -> Self {
        Self {
            http: Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }

    fn build_request(&self, image: &[u8]) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: PROMPT.to_string(),
                    },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: "image/jpeg",
                            data: BASE64.encode(image),
                        },
                    },
                ],
            }],
        }
    }
}

#[async_trait]
impl FoodRecognizer for GeminiRecognizer {
    async fn recognize(&self, image: &[u8]) -> Result<String, AppError> {
        if image.is_empty() {
            return Err(AppError::EmptyImage("<in-memory>".into()));
        }
        debug!(bytes = image.len(), "sending image to recognizer");

        let url = format!("{}?key={}", self.endpoint, self.api_key);
        let response = self
            .http
            .post(&url)
            .json(&self.build_request(image))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!(%status, "recognizer rejected request");
            return Err(AppError::ApiStatus(status.as_u16()));
        }

        let body = response.text().await?;
        if body.is_empty() {
            return Err(AppError::EmptyResponse);
        }

        let envelope: GenerateResponse = serde_json::from_str(&body)?;
        let text = extract_text(envelope)?;
        debug!(chars = text.len(), "recognizer answered");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_matches_wire_shape() {
        let config = GeminiConfig {
            api_key: "k".into(),
            endpoint: "https://example.invalid/generate".into(),
        };
        let recognizer = GeminiRecognizer::new(&config);
        let body = serde_json::to_value(recognizer.build_request(b"abc")).unwrap();

        let parts = &body["contents"][0]["parts"];
        assert_eq!(
            parts[0]["text"].as_str().unwrap(),
            PROMPT,
        );
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(parts[1]["inline_data"]["data"], BASE64.encode(b"abc"));
    }

    #[test]
    fn extract_text_happy_path() {
        let envelope: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Apple - 52"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(envelope).unwrap(), "Apple - 52");
    }

    #[test]
    fn extract_text_reports_missing_field_by_name() {
        let no_candidates: GenerateResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(matches!(
            extract_text(no_candidates),
            Err(AppError::MissingField("candidates"))
        ));

        let no_parts: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"content":{}}]}"#).unwrap();
        assert!(matches!(
            extract_text(no_parts),
            Err(AppError::MissingField("parts"))
        ));

        let no_text: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"content":{"parts":[{}]}}]}"#).unwrap();
        assert!(matches!(
            extract_text(no_text),
            Err(AppError::MissingField("text"))
        ));
    }

    #[tokio::test]
    async fn empty_image_is_rejected_before_any_io() {
        let config = GeminiConfig {
            api_key: "k".into(),
            endpoint: "https://example.invalid/generate".into(),
        };
        let recognizer = GeminiRecognizer::new(&config);
        assert!(matches!(
            recognizer.recognize(&[]).await,
            Err(AppError::EmptyImage(_))
        ));
    }

    /// Serves exactly one canned HTTP response on an ephemeral local port and
    /// returns an endpoint URL pointing at it.
    async fn canned_http_endpoint(status_line: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();

            // Drain the whole request before answering so the client never
            // sees a reset while still writing.
            let mut buf = vec![0u8; 64 * 1024];
            let mut total = 0;
            loop {
                let n = socket.read(&mut buf[total..]).await.unwrap();
                if n == 0 {
                    break;
                }
                total += n;
                if let Some(end) = buf[..total].windows(4).position(|w| w == b"\r\n\r\n") {
                    let headers = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                    let content_length = headers
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|v| v.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if total >= end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}/v1/models/test:generateContent")
    }

    async fn recognize_against(
        status_line: &'static str,
        body: &'static str,
    ) -> Result<String, AppError> {
        let endpoint = canned_http_endpoint(status_line, body).await;
        let recognizer = GeminiRecognizer::new(&GeminiConfig {
            api_key: "k".into(),
            endpoint,
        });
        recognizer.recognize(b"jpeg bytes").await
    }

    #[tokio::test]
    async fn full_round_trip_extracts_the_answer_text() {
        let answer = recognize_against(
            "200 OK",
            r#"{"candidates":[{"content":{"parts":[{"text":"Apple - 52"}]}}]}"#,
        )
        .await
        .unwrap();
        assert_eq!(answer, "Apple - 52");
    }

    #[tokio::test]
    async fn non_success_status_maps_to_api_status() {
        let err = recognize_against("500 Internal Server Error", "")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ApiStatus(500)));
    }

    #[tokio::test]
    async fn empty_success_body_is_a_distinct_error() {
        let err = recognize_against("200 OK", "").await.unwrap_err();
        assert!(matches!(err, AppError::EmptyResponse));
    }

    #[tokio::test]
    async fn non_json_success_body_is_a_malformed_envelope() {
        let err = recognize_against("200 OK", "<html>gateway timeout</html>")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::MalformedEnvelope(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        // Port 1 on loopback refuses immediately; no listener is ever bound.
        let recognizer = GeminiRecognizer::new(&GeminiConfig {
            api_key: "k".into(),
            endpoint: "http://127.0.0.1:1/generate".into(),
        });
        let err = recognizer.recognize(b"jpeg bytes").await.unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
    }
}
