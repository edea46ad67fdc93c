use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parse a JSON array column, treating NULL-ish or malformed text as empty.
pub fn json_array(raw: &str) -> Vec<Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

/// Parse a JSON array-of-strings column.
pub fn string_array(raw: &str) -> Vec<String> {
    json_array(raw)
        .into_iter()
        .filter_map(|v| v.as_str().map(|s| s.to_string()))
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatHistory {
    #[sqlx(try_from = "String")]
    pub id: uuid::Uuid,
    pub user_id: String,
    pub session_id: String,
    pub model_id: Option<String>,
    pub model_name: String,
    pub messages_json: String,
    pub title: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl ChatHistory {
    pub fn messages(&self) -> Vec<Value> {
        json_array(&self.messages_json)
    }

    pub fn to_response(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "user_id": self.user_id,
            "session_id": self.session_id,
            "model_id": self.model_id,
            "model_name": self.model_name,
            "messages": self.messages(),
            "title": self.title,
            "created_at": self.created_at,
            "updated_at": self.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ApiKey {
    #[sqlx(try_from = "String")]
    pub id: uuid::Uuid,
    pub user_id: String,
    pub provider: String,
    #[serde(skip_serializing)]
    pub encrypted_key: String,
    pub is_active: bool,
    pub created_at: Option<String>,
    pub last_used: Option<String>,
    pub usage_count: i64,
}

/// Registry entry type for models backed by a vendor API.
pub const MODEL_TYPE_API: &str = "api";
/// Registry entry type for uploaded models answered locally.
pub const MODEL_TYPE_CUSTOM: &str = "custom";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ModelEntry {
    #[sqlx(try_from = "String")]
    pub id: uuid::Uuid,
    pub user_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub model_type: String,
    pub provider: Option<String>,
    pub model_identifier: Option<String>,
    pub file_path: Option<String>,
    pub config_json: Option<String>,
    pub status: String,
    pub is_public: bool,
    pub description: Option<String>,
    pub tags_json: String,
    /// Outcome of the last health check; `None` until checked.
    pub available: Option<bool>,
    pub last_checked_at: Option<String>,
    pub avg_response_time: f64,
    pub total_requests: i64,
    pub success_rate: f64,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl ModelEntry {
    pub fn tags(&self) -> Vec<String> {
        string_array(&self.tags_json)
    }

    pub fn config(&self) -> Option<Value> {
        self.config_json
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }

    /// API shape: JSON columns expanded, raw `*_json` text dropped.
    pub fn to_response(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "type": self.model_type,
            "status": self.status,
            "user_id": self.user_id,
            "provider": self.provider,
            "model_identifier": self.model_identifier,
            "file_path": self.file_path,
            "config": self.config(),
            "description": self.description,
            "tags": self.tags(),
            "is_public": self.is_public,
            "available": self.available,
            "last_checked_at": self.last_checked_at,
            "avg_response_time": self.avg_response_time,
            "total_requests": self.total_requests,
            "success_rate": self.success_rate,
            "created_at": self.created_at,
            "updated_at": self.updated_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CollaborationSession {
    #[sqlx(try_from = "String")]
    pub id: uuid::Uuid,
    pub name: String,
    pub session_id: String,
    pub created_by: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub participants_json: String,
    pub shared_models_json: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl CollaborationSession {
    pub fn participants(&self) -> Vec<String> {
        string_array(&self.participants_json)
    }

    pub fn shared_models(&self) -> Vec<String> {
        string_array(&self.shared_models_json)
    }

    pub fn to_response(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "session_id": self.session_id,
            "created_by": self.created_by,
            "description": self.description,
            "is_active": self.is_active,
            "participants": self.participants(),
            "shared_models": self.shared_models(),
            "created_at": self.created_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CodeSession {
    #[sqlx(try_from = "String")]
    pub id: uuid::Uuid,
    pub user_id: String,
    pub name: String,
    pub code: String,
    pub language: String,
    pub test_code: Option<String>,
    pub analysis_json: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl CodeSession {
    pub fn to_response(&self) -> Value {
        let analysis = self
            .analysis_json
            .as_deref()
            .and_then(|raw| serde_json::from_str::<Value>(raw).ok());
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "code": self.code,
            "language": self.language,
            "test_code": self.test_code,
            "analysis_results": analysis,
            "created_at": self.created_at,
            "updated_at": self.updated_at,
        })
    }
}
