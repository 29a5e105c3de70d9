use crate::{
    config::GeminiConfig,
    error::{Result, StyleError},
    models::{assign_missing_ids, ImageRef, Preferences, SuggestionList},
    upstream::{read_json, truncate, RecommendationService},
};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

const RECOMMENDATION_COUNT: usize = 6;
const ID_PREFIX: &str = "gemini-";

/// Recommendations from the generative vision API.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    api_base: String,
    model: String,
}

impl GeminiClient {
    pub fn new(http: Client, config: GeminiConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| StyleError::ConfigError("GEMINI_API_KEY is not set".into()))?;

        Ok(Self {
            http,
            api_key,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            model: config.model,
        })
    }

    fn endpoint(&self) -> String {
        let model = self.model.trim();
        let model_path = if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        };
        format!("{}/{}:generateContent", self.api_base, model_path)
    }

    fn build_prompt(preferences: Option<&Preferences>) -> String {
        let preferences = preferences
            .map(Preferences::describe)
            .unwrap_or_else(|| "No specific preferences".to_string());

        format!(
            r#"You are a professional hairstyle consultant. Analyze the user's face from the provided photo and recommend {count} suitable hairstyles.

User's preferences:
{preferences}

Please provide your response in the following JSON format:
{{
  "recommendations": [
    {{
      "name": "Hairstyle name",
      "description": "Brief description of the hairstyle",
      "reason": "Why this hairstyle suits the user",
      "faceShapeMatch": "Which face shape it matches best"
    }}
  ]
}}

Analyze the photo and provide {count} personalized hairstyle recommendations."#,
            count = RECOMMENDATION_COUNT,
            preferences = preferences
        )
    }

    fn image_part(image: &ImageRef) -> Value {
        match image.base64_payload() {
            Some(data) => json!({
                "inline_data": {
                    "mime_type": image.mime_type(),
                    "data": data,
                }
            }),
            None => json!({
                "file_data": {
                    "mime_type": image.mime_type(),
                    "file_uri": image.as_str(),
                }
            }),
        }
    }

    fn build_payload(image: &ImageRef, preferences: Option<&Preferences>) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": Self::build_prompt(preferences) },
                    Self::image_part(image),
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": 0.7,
                "maxOutputTokens": 2048
            }
        })
    }
}

/// Concatenate the text parts of the first candidate.
fn response_text(payload: &Value) -> Result<String> {
    let parts = payload["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or_else(|| {
            StyleError::ParseFailure(format!(
                "Gemini response has no candidate text: {}",
                truncate(&payload.to_string(), 256)
            ))
        })?;

    Ok(parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect::<Vec<_>>()
        .join(""))
}

/// Parse a JSON object out of model text, falling back to the outermost
/// `{...}` fragment when the model wrapped it in prose or code fences.
pub fn extract_json_document(text: &str) -> Result<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        return Ok(value);
    }

    let fragment = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => {
            return Err(StyleError::ParseFailure(format!(
                "No JSON object in model output: {}",
                truncate(text, 256)
            )))
        }
    };

    serde_json::from_str(fragment).map_err(|e| {
        StyleError::ParseFailure(format!("Failed to parse model output as JSON: {}", e))
    })
}

#[async_trait]
impl RecommendationService for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn recommend(
        &self,
        image: &ImageRef,
        preferences: Option<&Preferences>,
    ) -> Result<SuggestionList> {
        let _timer = crate::logger::timer("gemini recommendations");
        log::info!("Requesting recommendations from model: {}", self.model);

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::build_payload(image, preferences))
            .send()
            .await?;

        let payload: Value = read_json("Gemini", response).await?;
        let text = response_text(&payload)?;
        log::debug!("Gemini raw answer: {}", truncate(&text, 512));

        let document = extract_json_document(&text)?;
        // Some answers are a bare array instead of the requested object.
        let document = match document {
            Value::Array(items) => json!({ "recommendations": items }),
            other => other,
        };

        let mut list: SuggestionList = serde_json::from_value(document).map_err(|e| {
            StyleError::ParseFailure(format!("Unexpected recommendation shape: {}", e))
        })?;
        list.recommendations = assign_missing_ids(list.recommendations)
            .into_iter()
            .map(|mut style| {
                if !style.id.starts_with(ID_PREFIX) {
                    style.id = format!("{}{}", ID_PREFIX, style.id);
                }
                style
            })
            .collect();
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PreferenceField;
    use mockito::Matcher;

    fn client(base: &str) -> GeminiClient {
        GeminiClient::new(
            Client::new(),
            GeminiConfig::new().with_credentials("test-key").with_base(base),
        )
        .unwrap()
    }

    #[test]
    fn test_requires_key() {
        assert!(GeminiClient::new(Client::new(), GeminiConfig::new()).is_err());
    }

    #[test]
    fn test_extract_plain_json() {
        let value = extract_json_document(r#"{"recommendations":[]}"#).unwrap();
        assert!(value["recommendations"].is_array());
    }

    #[test]
    fn test_extract_fenced_json() {
        let text = "Sure! Here you go:\n```json\n{\"recommendations\":[{\"name\":\"Bob\"}]}\n```\nEnjoy.";
        let value = extract_json_document(text).unwrap();
        assert_eq!(value["recommendations"][0]["name"], "Bob");
    }

    #[test]
    fn test_extract_gives_up() {
        assert!(matches!(
            extract_json_document("I cannot help with that."),
            Err(StyleError::ParseFailure(_))
        ));
        assert!(matches!(
            extract_json_document("} backwards {"),
            Err(StyleError::ParseFailure(_))
        ));
    }

    #[test]
    fn test_image_parts() {
        let inline = GeminiClient::image_part(&ImageRef::new("data:image/png;base64,Zm9v"));
        assert_eq!(inline["inline_data"]["mime_type"], "image/png");
        assert_eq!(inline["inline_data"]["data"], "Zm9v");

        let remote = GeminiClient::image_part(&ImageRef::new("https://x/face.jpg"));
        assert_eq!(remote["file_data"]["file_uri"], "https://x/face.jpg");
    }

    #[test]
    fn test_prompt_mentions_preferences() {
        let prefs = Preferences::new().with(PreferenceField::Occasion, "wedding");
        let prompt = GeminiClient::build_prompt(Some(&prefs));
        assert!(prompt.contains("- occasion: wedding"));
        assert!(GeminiClient::build_prompt(None).contains("No specific preferences"));
    }

    #[tokio::test]
    async fn test_recommend_parses_wrapped_answer() {
        let mut server = mockito::Server::new_async().await;
        let answer = "Here are my picks: {\"recommendations\":[{\"name\":\"Pixie\",\"description\":\"d\",\"reason\":\"r\",\"faceShapeMatch\":\"oval\"},{\"name\":\"Lob\"}]}";
        let _mock = server
            .mock("POST", "/models/gemini-2.0-flash:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .match_body(Matcher::PartialJson(json!({
                "generationConfig": {"responseMimeType": "application/json"}
            })))
            .with_status(200)
            .with_body(
                json!({
                    "candidates": [{"content": {"parts": [{"text": answer}]}}]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let list = client(&server.url())
            .recommend(&ImageRef::new("Zm9v"), None)
            .await
            .unwrap();

        assert_eq!(list.recommendations.len(), 2);
        assert_eq!(list.recommendations[0].id, "gemini-1");
        assert_eq!(list.recommendations[1].id, "gemini-2");
        assert_eq!(
            list.recommendations[0].face_shape_match.as_deref(),
            Some("oval")
        );
    }

    #[tokio::test]
    async fn test_recommend_upstream_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/models/gemini-2.0-flash:generateContent")
            .with_status(429)
            .with_body(r#"{"error":{"code":429,"message":"quota"}}"#)
            .create_async()
            .await;

        let err = client(&server.url())
            .recommend(&ImageRef::new("Zm9v"), None)
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), 429);
    }
}
