//! Wire messages exchanged with the page runtime.

use std::collections::HashMap;

use serde_json::value::RawValue;
use serde_json::{json, Value};

use crate::codec::{self, DecodeError, Position};
use crate::engine::Edge;

/// A page-to-native invocation.
#[derive(Debug)]
pub struct Call {
    pub id: u64,
    pub name: String,
    /// Still-encoded argument array, decoded against the bound function.
    pub params: Box<RawValue>,
}

/// The page's answer to a native-to-page call.
#[derive(Debug)]
pub struct Reply {
    pub id: u64,
    /// `Ok` with the encoded result or `Err` with the encoded error.
    pub outcome: Result<Box<RawValue>, Box<RawValue>>,
}

#[derive(Debug)]
pub enum Message {
    Call(Call),
    Reply(Reply),
    Resize(Edge),
    Drag,
}

impl Message {
    pub fn parse(text: &str) -> Result<Message, DecodeError> {
        let mut fields: HashMap<String, Box<RawValue>> =
            serde_json::from_str(text).map_err(|e| DecodeError::parse(&e))?;

        if let Some(edge) = fields.remove("resize") {
            let bits: u8 = field(&edge, "resize")?;
            return Edge::from_bits(bits)
                .filter(|edge| !edge.is_empty())
                .map(Message::Resize)
                .ok_or_else(|| mismatch(".resize", "edge bits", format!("{bits} is not a set of edges")));
        }

        if let Some(drag) = fields.remove("drag") {
            return match field::<bool>(&drag, "drag")? {
                true => Ok(Message::Drag),
                false => Err(mismatch(".drag", "true", "drag must be true".to_string())),
            };
        }

        let id: u64 = match fields.get("id") {
            Some(raw) => field(raw, "id")?,
            None => return Err(mismatch("", "bridge message", "no id".to_string())),
        };

        if let Some(name) = fields.get("name") {
            let name: String = field(name, "name")?;
            let params = fields
                .remove("params")
                .ok_or_else(|| mismatch(".params", "argument list", "missing".to_string()))?;
            return Ok(Message::Call(Call { id, name, params }));
        }

        if let Some(error) = fields.remove("error") {
            return Ok(Message::Reply(Reply {
                id,
                outcome: Err(error),
            }));
        }
        if let Some(result) = fields.remove("result") {
            return Ok(Message::Reply(Reply {
                id,
                outcome: Ok(result),
            }));
        }

        Err(mismatch("", "bridge message", "neither a call nor a result".to_string()))
    }
}

fn field<T: serde::de::DeserializeOwned>(raw: &RawValue, name: &str) -> Result<T, DecodeError> {
    codec::decode::<T>(raw.get()).map_err(|err| match err {
        DecodeError::ShapeMismatch {
            position,
            expected,
            detail,
        } => DecodeError::ShapeMismatch {
            position: Position {
                parameter: None,
                path: format!(".{name}{}", position.path),
            },
            expected,
            detail,
        },
        parse => parse,
    })
}

fn mismatch(path: &str, expected: &str, detail: String) -> DecodeError {
    DecodeError::ShapeMismatch {
        position: Position {
            parameter: None,
            path: path.to_string(),
        },
        expected: expected.to_string(),
        detail,
    }
}

// =============================================================================
// OUTBOUND
// =============================================================================

pub(crate) fn call_text(id: u64, name: &str, params: Value) -> String {
    codec::encode(&json!({ "id": id, "name": name, "params": params }))
}

pub(crate) fn result_text(id: u64, result: Value) -> String {
    codec::encode(&json!({ "id": id, "result": result }))
}

pub(crate) fn error_text(id: u64, error: Value) -> String {
    codec::encode(&json!({ "id": id, "error": error }))
}

/// Serialize a value, falling back to `null` like [`codec::encode`].
pub(crate) fn to_value<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to encode value, sending null");
        Value::Null
    })
}
