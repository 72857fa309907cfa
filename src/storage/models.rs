use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KvEntryRow {
    pub key: String,
    pub value: serde_json::Value,
    pub updated_at_ms: i64,
}
