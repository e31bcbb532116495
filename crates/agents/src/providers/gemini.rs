use {
    async_trait::async_trait,
    base64::{Engine, engine::general_purpose::STANDARD as BASE64},
    serde_json::{Value, json},
    tracing::{debug, trace, warn},
    umbra_common::{ContentPart, Turn},
};

use crate::{
    key_pool::Credential,
    model::{CompletionClient, CompletionError, CompletionRequest},
};

/// Google Generative Language `generateContent` client.
///
/// Holds no credential: each call is made with the key the caller passes, so
/// a rotated key takes effect on the next request.
pub struct GeminiClient {
    model: String,
    base_url: String,
    max_output_tokens: u32,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_output_tokens: 8192,
            client: reqwest::Client::new(),
        }
    }

    #[must_use]
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_body(&self, request: &CompletionRequest<'_>) -> Value {
        let contents: Vec<Value> = request
            .history
            .iter()
            .chain(std::iter::once(request.turn))
            .filter(|turn| !turn.parts.is_empty())
            .map(to_gemini_content)
            .collect();

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "maxOutputTokens": self.max_output_tokens,
            },
        });
        if !request.system.trim().is_empty() {
            body["systemInstruction"] = json!({
                "parts": [{ "text": request.system }]
            });
        }
        body
    }
}

/// Convert a turn to a Gemini `Content` object.
fn to_gemini_content(turn: &Turn) -> Value {
    let parts: Vec<Value> = turn
        .parts
        .iter()
        .map(|part| match part {
            ContentPart::Text(text) => json!({ "text": text }),
            ContentPart::Image { media_type, data } => json!({
                "inlineData": {
                    "mimeType": media_type,
                    "data": BASE64.encode(data),
                }
            }),
        })
        .collect();
    json!({ "role": turn.role.as_str(), "parts": parts })
}

/// Extract text content from Gemini response parts.
fn extract_text(parts: &[Value]) -> Option<String> {
    let texts: Vec<&str> = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect();

    if texts.is_empty() {
        None
    } else {
        Some(texts.join(""))
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(
        &self,
        credential: &Credential,
        request: &CompletionRequest<'_>,
    ) -> Result<String, CompletionError> {
        let body = self.build_body(request);
        debug!(
            model = %self.model,
            history_len = request.history.len(),
            has_image = request.turn.has_image(),
            "gemini complete request"
        );

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let http_resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", credential.expose())
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = http_resp.status();
        if !status.is_success() {
            let body_text = http_resp.text().await.unwrap_or_default();
            warn!(status = %status, body = %body_text, "gemini API error");
            return Err(CompletionError::Http {
                status: status.as_u16(),
                body: body_text,
            });
        }

        let resp = http_resp.json::<Value>().await?;
        trace!(response = %resp, "gemini raw response");

        let parts = resp["candidates"][0]["content"]["parts"]
            .as_array()
            .cloned()
            .unwrap_or_default();
        match extract_text(&parts) {
            Some(text) => Ok(text),
            None => {
                if let Some(reason) = resp["promptFeedback"]["blockReason"].as_str() {
                    return Err(CompletionError::message(format!(
                        "prompt blocked: {reason}"
                    )));
                }
                Err(CompletionError::EmptyResponse)
            },
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, mockito::Matcher, umbra_common::Role};

    fn reply(text: &str) -> String {
        json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": text }] } }]
        })
        .to_string()
    }

    #[test]
    fn body_maps_roles_and_images() {
        let client = GeminiClient::new("gemini-2.5-flash", "http://unused");
        let history = vec![Turn::user_text("hi"), Turn::assistant("hello")];
        let turn = Turn::user(vec![
            ContentPart::image("image/jpeg", vec![1, 2, 3]),
            ContentPart::text("what is it?"),
        ]);
        let body = client.build_body(&CompletionRequest {
            system: "be brief",
            history: &history,
            turn: &turn,
        });

        assert_eq!(body["contents"].as_array().unwrap().len(), 3);
        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(body["contents"][2]["parts"][0]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(body["contents"][2]["parts"][0]["inlineData"]["data"], "AQID");
        assert_eq!(body["contents"][2]["parts"][1]["text"], "what is it?");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be brief");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 8192);
    }

    #[test]
    fn empty_turns_and_blank_system_are_omitted() {
        let client = GeminiClient::new("m", "http://unused");
        let history = vec![Turn::new(Role::User, vec![])];
        let body = client.build_body(&CompletionRequest {
            system: "  ",
            history: &history,
            turn: &Turn::user_text("x"),
        });
        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
        assert!(body.get("systemInstruction").is_none());
    }

    #[test]
    fn extract_text_combines_text_parts() {
        let parts = vec![json!({"text": "a"}), json!({"other": 1}), json!({"text": "b"})];
        assert_eq!(extract_text(&parts).as_deref(), Some("ab"));
        assert!(extract_text(&[]).is_none());
    }

    #[tokio::test]
    async fn sends_key_header_and_returns_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-2.5-flash:generateContent")
            .match_header("x-goog-api-key", "key-1")
            .match_body(Matcher::PartialJson(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "ping" }] }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(reply("pong"))
            .create_async()
            .await;

        let client = GeminiClient::new("gemini-2.5-flash", server.url());
        let text = client
            .complete(&Credential::new("key-1"), &CompletionRequest {
                system: "",
                history: &[],
                turn: &Turn::user_text("ping"),
            })
            .await
            .unwrap();

        assert_eq!(text, "pong");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_error_keeps_status_and_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1beta/models/m:generateContent")
            .with_status(429)
            .with_body(r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#)
            .create_async()
            .await;

        let client = GeminiClient::new("m", server.url());
        let err = client
            .complete(&Credential::new("k"), &CompletionRequest {
                system: "",
                history: &[],
                turn: &Turn::user_text("x"),
            })
            .await
            .unwrap_err();

        match err {
            CompletionError::Http { status, body } => {
                assert_eq!(status, 429);
                assert!(body.contains("RESOURCE_EXHAUSTED"));
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn blocked_prompt_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1beta/models/m:generateContent")
            .with_status(200)
            .with_body(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)
            .create_async()
            .await;

        let client = GeminiClient::new("m", server.url());
        let err = client
            .complete(&Credential::new("k"), &CompletionRequest {
                system: "",
                history: &[],
                turn: &Turn::user_text("x"),
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }
}
