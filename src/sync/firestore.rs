use std::time::Duration;

use futures::channel::mpsc;
use futures::future::BoxFuture;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde_json::{Map, Value};

use super::group::{GroupError, GroupEvent, GroupService, GroupSubscription, Unsubscribe};
use crate::core::group::{CollabGroup, Member};
use crate::core::purpose::Purpose;

const COLLECTION: &str = "collabGroups";
const PURPOSE_FIELDS: [&str; 3] = ["purpose", "examName", "examDuration"];

/// Convert plain JSON into a Firestore typed value.
pub fn to_firestore_value(json: &Value) -> Value {
    match json {
        Value::Null => serde_json::json!({ "nullValue": null }),
        Value::Bool(b) => serde_json::json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                serde_json::json!({ "integerValue": i.to_string() })
            } else if let Some(u) = n.as_u64() {
                serde_json::json!({ "integerValue": u.to_string() })
            } else {
                serde_json::json!({ "doubleValue": n.as_f64().unwrap_or_default() })
            }
        }
        Value::String(s) => serde_json::json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(to_firestore_value).collect();
            serde_json::json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => serde_json::json!({ "mapValue": { "fields": to_firestore_fields(map) } }),
    }
}

fn to_firestore_fields(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(k, v)| (k.clone(), to_firestore_value(v)))
        .collect()
}

/// Convert a Firestore typed value back into plain JSON.
pub fn from_firestore_value(value: &Value) -> Result<Value, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| format!("expected typed value object, got {}", value))?;
    let (kind, inner) = obj
        .iter()
        .next()
        .ok_or_else(|| "empty typed value".to_string())?;

    match kind.as_str() {
        "nullValue" => Ok(Value::Null),
        "booleanValue" => Ok(Value::Bool(inner.as_bool().unwrap_or_default())),
        "integerValue" => {
            // Integers travel as decimal strings.
            let n: i64 = match inner {
                Value::String(s) => s
                    .parse()
                    .map_err(|e| format!("bad integerValue {}: {}", s, e))?,
                other => other
                    .as_i64()
                    .ok_or_else(|| format!("bad integerValue {}", other))?,
            };
            Ok(Value::from(n))
        }
        "doubleValue" => Ok(inner.as_f64().map(Value::from).unwrap_or(Value::Null)),
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => {
            Ok(Value::String(inner.as_str().unwrap_or_default().to_string()))
        }
        "arrayValue" => {
            let values = inner
                .get("values")
                .and_then(Value::as_array)
                .map(|vs| vs.iter().map(from_firestore_value).collect::<Result<Vec<_>, _>>())
                .transpose()?
                .unwrap_or_default();
            Ok(Value::Array(values))
        }
        "mapValue" => {
            let fields = inner.get("fields").and_then(Value::as_object);
            match fields {
                Some(fields) => from_firestore_fields(fields).map(Value::Object),
                None => Ok(Value::Object(Map::new())),
            }
        }
        other => Err(format!("unsupported Firestore value type: {}", other)),
    }
}

fn from_firestore_fields(fields: &Map<String, Value>) -> Result<Map<String, Value>, String> {
    fields
        .iter()
        .map(|(k, v)| from_firestore_value(v).map(|plain| (k.clone(), plain)))
        .collect()
}

/// Encode a group as a Firestore document body.
pub fn encode_group(group: &CollabGroup) -> Result<Value, String> {
    let json = serde_json::to_value(group).map_err(|e| format!("encode group: {}", e))?;
    let map = json
        .as_object()
        .ok_or_else(|| "group did not serialize to an object".to_string())?;
    Ok(serde_json::json!({ "fields": to_firestore_fields(map) }))
}

/// Decode a Firestore document. The passkey is taken from the document
/// name when the stored fields lack an `id`.
pub fn decode_group(doc: &Value) -> Result<CollabGroup, String> {
    let mut plain = match doc.get("fields").and_then(Value::as_object) {
        Some(fields) => from_firestore_fields(fields)?,
        None => Map::new(),
    };
    if !plain.contains_key("id") {
        let name = doc.get("name").and_then(Value::as_str).unwrap_or_default();
        let id = name.rsplit('/').next().unwrap_or_default();
        plain.insert("id".to_string(), Value::String(id.to_string()));
    }
    serde_json::from_value(Value::Object(plain)).map_err(|e| format!("decode group: {}", e))
}

/// Minimal Firestore REST client scoped to the group collection.
#[derive(Clone)]
pub struct FirestoreClient {
    http: Client,
    documents_url: String,
    api_key: Option<String>,
}

impl FirestoreClient {
    pub fn new(project_id: &str, api_key: Option<&str>) -> Result<Self, String> {
        if project_id.trim().is_empty() {
            return Err("Firestore project id is empty".to_string());
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
        Ok(Self {
            http,
            documents_url: format!(
                "https://firestore.googleapis.com/v1/projects/{}/databases/(default)/documents",
                project_id.trim()
            ),
            api_key: api_key.filter(|k| !k.is_empty()).map(str::to_string),
        })
    }

    fn doc_url(&self, group_id: &str) -> String {
        format!("{}/{}/{}", self.documents_url, COLLECTION, group_id)
    }

    fn with_key(&self, mut query: Vec<(String, String)>) -> Vec<(String, String)> {
        if let Some(ref key) = self.api_key {
            query.push(("key".to_string(), key.clone()));
        }
        query
    }

    pub async fn fetch(&self, group_id: &str) -> Result<Option<CollabGroup>, GroupError> {
        let resp = self
            .http
            .get(self.doc_url(group_id))
            .query(&self.with_key(Vec::new()))
            .send()
            .await
            .map_err(|e| GroupError::Transport(format!("GET failed: {}", e)))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            s if s.is_success() => {
                let doc: Value = resp
                    .json()
                    .await
                    .map_err(|e| GroupError::Decode(e.to_string()))?;
                decode_group(&doc).map(Some).map_err(GroupError::Decode)
            }
            s => {
                let text = resp.text().await.unwrap_or_default();
                Err(GroupError::Transport(format!("GET {} returned {}: {}", group_id, s, text)))
            }
        }
    }

    pub async fn create(&self, group: &CollabGroup) -> Result<(), GroupError> {
        let body = encode_group(group).map_err(GroupError::Decode)?;
        let url = format!("{}/{}", self.documents_url, COLLECTION);
        let query = self.with_key(vec![("documentId".to_string(), group.id.clone())]);
        let resp = self
            .http
            .post(url)
            .query(&query)
            .json(&body)
            .send()
            .await
            .map_err(|e| GroupError::Transport(format!("POST failed: {}", e)))?;

        match resp.status() {
            StatusCode::CONFLICT => Err(GroupError::AlreadyExists(group.id.clone())),
            s if s.is_success() => Ok(()),
            s => {
                let text = resp.text().await.unwrap_or_default();
                Err(GroupError::Transport(format!("POST returned {}: {}", s, text)))
            }
        }
    }

    /// PATCH the document. Without a mask the whole document is replaced;
    /// with one, only the listed fields are (fields absent from the body
    /// are deleted).
    pub async fn patch(
        &self,
        group: &CollabGroup,
        mask: &[&str],
        must_exist: bool,
    ) -> Result<(), GroupError> {
        let mut body = encode_group(group).map_err(GroupError::Decode)?;
        if !mask.is_empty() {
            if let Some(fields) = body.get_mut("fields").and_then(Value::as_object_mut) {
                fields.retain(|k, _| mask.contains(&k.as_str()));
            }
        }

        let mut query: Vec<(String, String)> = mask
            .iter()
            .map(|f| ("updateMask.fieldPaths".to_string(), f.to_string()))
            .collect();
        if must_exist {
            query.push(("currentDocument.exists".to_string(), "true".to_string()));
        }
        let query = self.with_key(query);

        let resp = self
            .http
            .patch(self.doc_url(&group.id))
            .query(&query)
            .json(&body)
            .send()
            .await
            .map_err(|e| GroupError::Transport(format!("PATCH failed: {}", e)))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Err(GroupError::NotFound(group.id.clone())),
            s if s.is_success() => Ok(()),
            s => {
                let text = resp.text().await.unwrap_or_default();
                Err(GroupError::Transport(format!("PATCH {} returned {}: {}", group.id, s, text)))
            }
        }
    }
}

/// What a polling subscription has seen so far.
#[derive(Debug, Default)]
struct PollState {
    last: Option<CollabGroup>,
    /// At least one fetch succeeded.
    answered: bool,
}

impl PollState {
    /// Turn one fetch into the event to deliver, if any. A document missing
    /// on the first successful fetch, or gone after being seen, is
    /// `Removed`. Failed fetches deliver nothing.
    fn observe(
        &mut self,
        group_id: &str,
        fetched: Result<Option<CollabGroup>, GroupError>,
    ) -> Option<GroupEvent> {
        let group = match fetched {
            Ok(group) => group,
            Err(e) => {
                log::warn!("Polling group {} failed: {}", group_id, e);
                return None;
            }
        };
        let first = !self.answered;
        self.answered = true;
        match group {
            Some(group) if self.last.as_ref() != Some(&group) => {
                self.last = Some(group.clone());
                Some(GroupEvent::Changed(group))
            }
            Some(_) => None,
            None if first || self.last.is_some() => {
                self.last = None;
                Some(GroupEvent::Removed(group_id.to_string()))
            }
            None => None,
        }
    }
}

/// Group documents in Cloud Firestore. Change notifications are produced
/// by polling the document.
#[derive(Clone)]
pub struct FirestoreGroupService {
    client: FirestoreClient,
    poll_interval: Duration,
}

impl FirestoreGroupService {
    pub fn new(client: FirestoreClient, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }
}

impl GroupService for FirestoreGroupService {
    fn create(&self, group: CollabGroup) -> BoxFuture<'static, Result<CollabGroup, GroupError>> {
        let client = self.client.clone();
        Box::pin(async move {
            client.create(&group).await?;
            log::info!("Created group {}", group.id);
            Ok(group)
        })
    }

    fn get(&self, group_id: &str) -> BoxFuture<'static, Result<Option<CollabGroup>, GroupError>> {
        let client = self.client.clone();
        let group_id = group_id.to_string();
        Box::pin(async move { client.fetch(&group_id).await })
    }

    fn put(&self, group: CollabGroup) -> BoxFuture<'static, Result<(), GroupError>> {
        let client = self.client.clone();
        Box::pin(async move { client.patch(&group, &[], false).await })
    }

    fn join(
        &self,
        group_id: &str,
        member: Member,
    ) -> BoxFuture<'static, Result<Option<CollabGroup>, GroupError>> {
        let client = self.client.clone();
        let group_id = group_id.to_string();
        Box::pin(async move {
            let Some(mut group) = client.fetch(&group_id).await? else {
                return Ok(None);
            };
            if group.add_member(member) {
                client.patch(&group, &["members"], true).await?;
            }
            Ok(Some(group))
        })
    }

    fn remove_member(&self, group_id: &str, member: &Member) -> BoxFuture<'static, Result<(), GroupError>> {
        let client = self.client.clone();
        let group_id = group_id.to_string();
        let member_id = member.id.clone();
        Box::pin(async move {
            let mut group = client
                .fetch(&group_id)
                .await?
                .ok_or_else(|| GroupError::NotFound(group_id.clone()))?;
            if group.remove_member(&member_id).is_some() {
                client.patch(&group, &["members"], true).await?;
            }
            Ok(())
        })
    }

    fn set_purpose(&self, group_id: &str, purpose: &Purpose) -> BoxFuture<'static, Result<(), GroupError>> {
        let client = self.client.clone();
        // Only the purpose fields survive the mask, members are untouched.
        let mut stub = CollabGroup {
            id: group_id.to_string(),
            members: Vec::new(),
            purpose: None,
            exam_name: None,
            exam_duration: None,
        };
        stub.set_purpose(purpose);
        Box::pin(async move { client.patch(&stub, &PURPOSE_FIELDS, true).await })
    }

    fn subscribe(&self, group_id: &str) -> GroupSubscription {
        let (tx, rx) = mpsc::unbounded();
        let client = self.client.clone();
        let group_id = group_id.to_string();
        let poll_interval = self.poll_interval;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(poll_interval);
            let mut state = PollState::default();
            loop {
                ticker.tick().await;
                let fetched = client.fetch(&group_id).await;
                if let Some(event) = state.observe(&group_id, fetched) {
                    if tx.unbounded_send(event).is_err() {
                        break;
                    }
                }
            }
        });

        GroupSubscription::new(rx.boxed(), Unsubscribe::new(move || handle.abort()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::purpose::ExamDuration;
    use crate::core::task::Task;
    use chrono::{TimeZone, Utc};

    fn sample_group() -> CollabGroup {
        let due = Utc.with_ymd_and_hms(2026, 10, 22, 12, 0, 0).unwrap();
        let mut task = Task::new("u1", "Pay rent", due);
        task.completed = true;
        let mut group = CollabGroup::new(
            "abcd1234",
            Member {
                id: "u1".to_string(),
                name: "Ava".to_string(),
                tasks: vec![task],
            },
        );
        group.set_purpose(&Purpose::exams("SAT", ExamDuration::Days60).unwrap());
        group
    }

    #[test]
    fn typed_values_for_scalars() {
        assert_eq!(
            to_firestore_value(&serde_json::json!(60)),
            serde_json::json!({ "integerValue": "60" })
        );
        assert_eq!(
            to_firestore_value(&serde_json::json!("x")),
            serde_json::json!({ "stringValue": "x" })
        );
        assert_eq!(
            to_firestore_value(&serde_json::json!(true)),
            serde_json::json!({ "booleanValue": true })
        );
    }

    #[test]
    fn group_document_decodes_back() {
        let group = sample_group();
        let mut doc = encode_group(&group).unwrap();
        doc["name"] = Value::String(
            "projects/p/databases/(default)/documents/collabGroups/abcd1234".to_string(),
        );
        let members = &doc["fields"]["members"]["arrayValue"]["values"][0]["mapValue"]["fields"];
        assert_eq!(members["name"]["stringValue"], "Ava");
        assert_eq!(doc["fields"]["examDuration"]["integerValue"], "60");

        assert_eq!(decode_group(&doc).unwrap(), group);
    }

    #[test]
    fn document_without_id_field_uses_name() {
        let doc = serde_json::json!({
            "name": "projects/p/databases/(default)/documents/collabGroups/zzzz9999",
            "fields": {
                "members": { "arrayValue": {} }
            }
        });
        let group = decode_group(&doc).unwrap();
        assert_eq!(group.id, "zzzz9999");
        assert!(group.members.is_empty());
        assert!(group.purpose.is_none());
    }

    #[test]
    fn unknown_value_type_is_an_error() {
        let err = from_firestore_value(&serde_json::json!({ "geoPointValue": {} })).unwrap_err();
        assert!(err.contains("geoPointValue"));
    }

    fn transport() -> Result<Option<CollabGroup>, GroupError> {
        Err(GroupError::Transport("timed out".to_string()))
    }

    #[test]
    fn poll_delivers_document_once_until_it_changes() {
        let mut state = PollState::default();
        let group = sample_group();
        assert_eq!(
            state.observe("abcd1234", Ok(Some(group.clone()))),
            Some(GroupEvent::Changed(group.clone()))
        );
        assert_eq!(state.observe("abcd1234", Ok(Some(group.clone()))), None);

        let mut changed = group;
        changed.members[0].tasks.clear();
        assert_eq!(
            state.observe("abcd1234", Ok(Some(changed.clone()))),
            Some(GroupEvent::Changed(changed))
        );
    }

    #[test]
    fn poll_reports_group_missing_on_first_fetch() {
        let mut state = PollState::default();
        assert_eq!(
            state.observe("abcd1234", Ok(None)),
            Some(GroupEvent::Removed("abcd1234".to_string()))
        );
        assert_eq!(state.observe("abcd1234", Ok(None)), None);
    }

    #[test]
    fn poll_failure_before_first_answer_still_reports_missing_group() {
        let mut state = PollState::default();
        assert_eq!(state.observe("abcd1234", transport()), None);
        assert_eq!(state.observe("abcd1234", transport()), None);
        assert_eq!(
            state.observe("abcd1234", Ok(None)),
            Some(GroupEvent::Removed("abcd1234".to_string()))
        );
    }

    #[test]
    fn poll_reports_group_deleted_later() {
        let mut state = PollState::default();
        assert!(matches!(
            state.observe("abcd1234", Ok(Some(sample_group()))),
            Some(GroupEvent::Changed(_))
        ));
        assert_eq!(state.observe("abcd1234", transport()), None);
        assert_eq!(
            state.observe("abcd1234", Ok(None)),
            Some(GroupEvent::Removed("abcd1234".to_string()))
        );
        assert_eq!(state.observe("abcd1234", Ok(None)), None);
    }

    #[test]
    fn client_requires_project_id() {
        assert!(FirestoreClient::new(" ", None).is_err());
        let client = FirestoreClient::new("demo", Some("k")).unwrap();
        assert!(client.doc_url("abcd1234").ends_with("/demo/databases/(default)/documents/collabGroups/abcd1234"));
    }
}
