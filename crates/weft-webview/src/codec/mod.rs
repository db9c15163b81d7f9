//! JSON wire codec shared by the bridge and the scheme layer.
//!
//! `encode` produces canonical JSON for anything `Serialize`. `decode`
//! first tries a direct parse into the requested type; only when that
//! fails is the text reparsed generically and walked against the
//! expected shape, so that the error names the first disagreeing
//! position instead of serde's input-order guess.

mod args;
mod probe;


use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::error::Category;

pub use args::{Arguments, ParamList, Parameters};

/// Location of a shape mismatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    /// Index into an argument list, when decoding one.
    pub parameter: Option<usize>,
    /// Nested path below the parameter or root value, e.g. `.user.tags[2]`.
    pub path: String,
}

impl Position {
    pub fn root() -> Self {
        Self {
            parameter: None,
            path: String::new(),
        }
    }

    pub fn parameter(index: usize) -> Self {
        Self {
            parameter: Some(index),
            path: String::new(),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parameter {
            Some(index) => write!(f, "parameter {index}{}", self.path),
            None => write!(f, "value{}", self.path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The text is not well-formed JSON.
    #[error("malformed message ({category}): {message}")]
    Parse {
        category: &'static str,
        message: String,
    },

    /// Well-formed JSON with the wrong arity or type somewhere.
    #[error("Expected {position} to be '{expected}'")]
    ShapeMismatch {
        position: Position,
        expected: String,
        /// The underlying serde message.
        detail: String,
    },
}

impl DecodeError {
    pub(crate) fn parse(err: &serde_json::Error) -> Self {
        DecodeError::Parse {
            category: category_name(err.classify()),
            message: err.to_string(),
        }
    }
}

fn category_name(category: Category) -> &'static str {
    match category {
        Category::Io => "io",
        Category::Syntax => "syntax",
        Category::Data => "data",
        Category::Eof => "eof",
    }
}

/// Encode a value as JSON text.
///
/// Types that cannot be serialized at all are rejected at compile time by
/// the `Serialize` bound. The rare runtime failure (a map with non-string
/// keys, a failing custom impl) encodes as `null`.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to encode value, sending null");
        "null".to_string()
    })
}

/// Decode JSON text into `T`, locating the first mismatch on failure.
///
/// `()` decodes from anything, including empty text.
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, DecodeError> {
    if let Some(void) = probe::void::<T>() {
        return Ok(void);
    }

    match serde_json::from_str::<T>(text) {
        Ok(value) => Ok(value),
        Err(direct) => {
            let value: serde_json::Value =
                serde_json::from_str(text).map_err(|e| DecodeError::parse(&e))?;
            Err(locate::<T>(&value, None).unwrap_or_else(|| DecodeError::ShapeMismatch {
                position: Position::root(),
                expected: type_label::<T>(),
                detail: direct.to_string(),
            }))
        }
    }
}

/// Decode an argument list (a JSON array) parameter by parameter.
pub fn decode_args<A: Arguments>(text: &str) -> Result<A, DecodeError> {
    A::decode_args(text)
}

/// Decode an already parsed value into `T`.
pub(crate) fn decode_value<T: DeserializeOwned>(
    value: &serde_json::Value,
    parameter: Option<usize>,
) -> Result<T, DecodeError> {
    if let Ok(direct) = T::deserialize(value) {
        return Ok(direct);
    }
    probe::walk::<T>(value).map_err(|located| mismatch::<T>(parameter, located))
}

fn locate<T: DeserializeOwned>(value: &serde_json::Value, parameter: Option<usize>) -> Option<DecodeError> {
    decode_value::<T>(value, parameter).err()
}

fn mismatch<T>(parameter: Option<usize>, located: probe::Located) -> DecodeError {
    let detail = located.error.to_string();
    let path = located.path;
    let expected = match located.expected {
        Some(expected) => expected,
        None if path.is_empty() => type_label::<T>(),
        None => expectation(&detail).unwrap_or_else(type_label::<T>),
    };

    DecodeError::ShapeMismatch {
        position: Position {
            parameter,
            path: probe::render(&path),
        },
        expected,
        detail,
    }
}

/// Rust type name of `T` with module paths stripped, e.g. `Vec<String>`.
pub(crate) fn type_label<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();

    for ch in full.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == ':' {
            segment.push(ch);
        } else {
            out.push_str(last_segment(&segment));
            segment.clear();
            out.push(ch);
        }
    }
    out.push_str(last_segment(&segment));
    out
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Pull the `expected ...` part out of a serde message.
fn expectation(detail: &str) -> Option<String> {
    detail
        .split_once(", expected ")
        .map(|(_, rest)| rest.trim().to_string())
        .filter(|rest| !rest.is_empty())
}
