use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Passages and citations returned by the retrieval endpoint.
///
/// Fetched once per qualifying message; never cached across messages.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RetrievalResult {
    /// Retrieved passage text. The backend may reply with a plain string
    /// or a (possibly nested) list of passages; lists are flattened and
    /// newline-joined.
    #[serde(deserialize_with = "deserialize_passages")]
    pub documents: String,
    /// Source page numbers, in backend order.
    #[serde(default)]
    pub page_numbers: Vec<u32>,
}

fn deserialize_passages<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(flatten_passages(&value))
}

fn flatten_passages(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .map(flatten_passages)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
