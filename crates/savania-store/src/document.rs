//! # Documents
//!
//! A document is a JSON object stored under an id inside a named
//! collection. Typed access goes through [`Document::decode`].

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::StoreError;

/// One stored document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    pub collection: String,
    pub id: String,
    pub data: Value,
}

impl Document {
    pub fn new(collection: impl Into<String>, id: impl Into<String>, data: Value) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            data,
        }
    }

    /// Top-level field value, if present.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.get(name)
    }

    /// Deserialize the body into `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        T::deserialize(&self.data).map_err(|source| StoreError::Decode {
            collection: self.collection.clone(),
            id: self.id.clone(),
            source,
        })
    }
}

/// Serialize `value` into a document body, which must be a JSON object.
pub fn to_body<T: Serialize>(value: &T) -> Result<Value, StoreError> {
    let body = serde_json::to_value(value).map_err(StoreError::Serialize)?;
    if body.is_object() {
        Ok(body)
    } else {
        Err(StoreError::NotAnObject(json_kind(&body)))
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
