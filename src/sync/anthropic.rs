use futures::future::BoxFuture;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::core::assistant::{
    Assistant, FaceLoginRequest, FaceLoginResponse, RemindersRequest, RemindersResponse,
    SuggestTasksRequest, SuggestTasksResponse,
};

const KEYRING_SERVER: &str = "anthropic-api";
const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-haiku-4-5-20251001";

/// Split a `data:<mime>;base64,<payload>` URI into media type and payload.
pub fn parse_data_uri(uri: &str) -> Result<(String, String), String> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| "Image is not a data URI".to_string())?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| "Data URI has no payload".to_string())?;
    let media_type = meta
        .strip_suffix(";base64")
        .ok_or_else(|| "Data URI is not base64 encoded".to_string())?;
    if media_type.is_empty() || payload.is_empty() {
        return Err("Data URI is empty".to_string());
    }
    Ok((media_type.to_string(), payload.to_string()))
}

/// Strip markdown code fences the model sometimes wraps JSON in.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn parse_reply<T: DeserializeOwned>(text: &str, what: &str) -> Result<T, String> {
    serde_json::from_str::<T>(strip_code_fences(text))
        .map_err(|e| format!("Failed to parse {}: {} (raw: {})", what, e, text))
}

fn image_block(uri: &str) -> Result<serde_json::Value, String> {
    let (media_type, data) = parse_data_uri(uri)?;
    Ok(serde_json::json!({
        "type": "image",
        "source": { "type": "base64", "media_type": media_type, "data": data }
    }))
}

#[derive(Debug, Deserialize)]
struct FaceVerdict {
    success: bool,
}

fn suggest_system_prompt(req: &SuggestTasksRequest) -> String {
    let mut prompt = String::from(
        "You suggest small, concrete tasks. Return ONLY a JSON object of the form \
         {\"suggestions\": [\"...\"]} with 3 to 5 short imperative items. No explanation.\n\n",
    );
    match req.exam {
        Some(ref exam) => {
            prompt.push_str(&format!(
                "The user is on day {} of a {}-day study plan for the \"{}\" exam.\n\
                 Plan today's tasks as a step in that progression:\n\
                 - first quarter of the plan: fundamentals, exam format, study setup\n\
                 - middle half: core topics and targeted practice problems\n\
                 - last quarter: full mock exams, weak-area review, timing practice\n",
                exam.current_day, exam.exam_duration, exam.exam_name
            ));
        }
        None => {
            prompt.push_str(
                "Be warm and encouraging. Suggestions should be doable in under an hour, \
                 e.g. for \"feeling sad\": \"Go for a short walk outside\"; for \
                 \"feeling bored\": \"Organize a bookshelf or drawer\".\n",
            );
        }
    }
    prompt
}

fn reminders_system_prompt() -> &'static str {
    "You help a user stay on top of deadlines. Given the current time and their open tasks, \
     pick the tasks whose due date is close enough to need a nudge and write one short \
     friendly reminder for each. Return ONLY a JSON object of the form \
     {\"reminders\": [{\"taskName\": \"...\", \"dueDate\": \"...\", \"message\": \"...\"}]}. \
     Return an empty list when nothing needs a reminder. No explanation."
}

fn reminders_user_message(req: &RemindersRequest) -> String {
    let mut msg = format!("Current time: {}\n\nTasks:\n", req.current_time.to_rfc3339());
    for t in &req.tasks {
        msg.push_str(&format!(
            "- {} (due {}, completed: {})\n",
            t.task_name,
            t.due_date.to_rfc3339(),
            t.completed
        ));
    }
    msg
}

/// Anthropic Messages API client implementing the assistant features.
#[derive(Clone)]
pub struct AnthropicAssistant {
    api_key: String,
    model: String,
    http: reqwest::Client,
}

impl AnthropicAssistant {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Send one message and return the text of the first content block.
    async fn complete(
        &self,
        system: &str,
        content: serde_json::Value,
        max_tokens: u32,
    ) -> Result<String, String> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": max_tokens,
            "system": system,
            "messages": [
                { "role": "user", "content": content }
            ]
        });

        let resp = self
            .http
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("API request failed: {}", e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(format!("API error {}: {}", status, text));
        }

        let api_resp: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| format!("Failed to parse API response: {}", e))?;

        api_resp["content"]
            .as_array()
            .and_then(|arr| arr.first())
            .and_then(|block| block["text"].as_str())
            .map(str::to_string)
            .ok_or_else(|| "No text in API response".to_string())
    }
}

impl Assistant for AnthropicAssistant {
    fn face_login(&self, req: FaceLoginRequest) -> BoxFuture<'static, Result<FaceLoginResponse, String>> {
        let this = self.clone();
        Box::pin(async move {
            let content = serde_json::json!([
                { "type": "text", "text": "Registered face:" },
                image_block(&req.reference_photo)?,
                { "type": "text", "text": "Login attempt:" },
                image_block(&req.photo)?,
            ]);
            let system = "You verify face logins. Compare the login attempt with the registered \
                          face. Return ONLY {\"success\": true} if a clearly visible face in the \
                          attempt belongs to the same person, otherwise {\"success\": false}.";
            let text = this.complete(system, content, 20).await?;
            let verdict: FaceVerdict = parse_reply(&text, "face verdict")?;
            log::info!("Face login for {}: {}", req.expected_user_id, verdict.success);
            Ok(FaceLoginResponse {
                user_id: if verdict.success {
                    req.expected_user_id
                } else {
                    String::new()
                },
                success: verdict.success,
            })
        })
    }

    fn suggest_tasks(
        &self,
        req: SuggestTasksRequest,
    ) -> BoxFuture<'static, Result<SuggestTasksResponse, String>> {
        let this = self.clone();
        Box::pin(async move {
            let system = suggest_system_prompt(&req);
            let user_msg = format!("Current state: {}", req.prompt);
            let text = this
                .complete(&system, serde_json::Value::String(user_msg), 400)
                .await?;
            parse_reply(&text, "suggestions")
        })
    }

    fn task_reminders(
        &self,
        req: RemindersRequest,
    ) -> BoxFuture<'static, Result<RemindersResponse, String>> {
        let this = self.clone();
        Box::pin(async move {
            if req.tasks.is_empty() {
                return Ok(RemindersResponse { reminders: Vec::new() });
            }
            let user_msg = reminders_user_message(&req);
            let max_tokens = std::cmp::min(120 * req.tasks.len() as u32 + 100, 2048);
            let text = this
                .complete(
                    reminders_system_prompt(),
                    serde_json::Value::String(user_msg),
                    max_tokens,
                )
                .await?;
            parse_reply(&text, "reminders")
        })
    }
}

/// Verify the API key with a minimal request.
pub async fn test_api_key(api_key: &str, model: &str) -> Result<String, String> {
    let body = serde_json::json!({
        "model": model,
        "max_tokens": 4,
        "messages": [
            { "role": "user", "content": "Reply with OK" }
        ]
    });

    let client = reqwest::Client::new();
    let resp = client
        .post(MESSAGES_URL)
        .header("x-api-key", api_key)
        .header("anthropic-version", "2023-06-01")
        .header("content-type", "application/json")
        .json(&body)
        .send()
        .await
        .map_err(|e| format!("Request failed: {}", e))?;

    if resp.status().is_success() {
        Ok("API key valid".to_string())
    } else if resp.status().as_u16() == 401 {
        Err("Invalid API key".to_string())
    } else {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        Err(format!("API error {}: {}", status, text))
    }
}

/// Store the Anthropic API key in the system keyring.
pub async fn store_api_key(key: &str) -> Result<(), String> {
    super::keyring::store_secret(KEYRING_SERVER, "FaceTask Anthropic API Key", key).await
}

/// Load the Anthropic API key from the system keyring.
pub async fn load_api_key() -> Result<Option<String>, String> {
    let key = super::keyring::load_secret(KEYRING_SERVER).await?;
    Ok(key.filter(|k| !k.is_empty()))
}

/// Forget the stored Anthropic API key.
pub async fn clear_api_key() -> Result<(), String> {
    super::keyring::delete_secret(KEYRING_SERVER).await
}
