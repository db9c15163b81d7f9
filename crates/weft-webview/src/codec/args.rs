use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{decode_value, type_label, DecodeError, Position};

/// An ordered list of call parameters, decoded from a JSON array.
///
/// Implemented for `()` and tuples of up to eight elements. Missing
/// trailing parameters decode as `null`, so `Option` parameters may be
/// omitted by the caller.
pub trait Arguments: Sized {
    const ARITY: usize;

    fn decode_args(text: &str) -> Result<Self, DecodeError>;
}

impl Arguments for () {
    const ARITY: usize = 0;

    fn decode_args(_text: &str) -> Result<Self, DecodeError> {
        Ok(())
    }
}

/// An ordered list of call parameters, encoded as a JSON array with one
/// element per tuple field.
///
/// A lone argument is still written as a one-element tuple, so
/// `(vec![1, 2],)` sends `[[1, 2]]` and `(None::<u8>,)` sends `[null]`.
pub trait Parameters {
    fn to_params(&self) -> Value;
}

impl Parameters for () {
    fn to_params(&self) -> Value {
        Value::Array(Vec::new())
    }
}

/// A parameter list assembled at runtime, sent as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamList(pub Vec<Value>);

impl Parameters for ParamList {
    fn to_params(&self) -> Value {
        Value::Array(self.0.clone())
    }
}

fn param<T: Serialize>(value: &T, index: usize) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        tracing::warn!(index, error = %e, "failed to encode call parameter, sending null");
        Value::Null
    })
}

fn parse_list(text: &str) -> Result<Vec<Value>, DecodeError> {
    match serde_json::from_str::<Value>(text).map_err(|e| DecodeError::parse(&e))? {
        Value::Array(items) => Ok(items),
        other => Err(DecodeError::ShapeMismatch {
            position: Position::root(),
            expected: "argument list".to_string(),
            detail: format!("got {}", kind_of(&other)),
        }),
    }
}

fn decode_param<T: DeserializeOwned>(list: &[Value], index: usize) -> Result<T, DecodeError> {
    match list.get(index) {
        Some(value) => decode_value::<T>(value, Some(index)),
        None => decode_value::<T>(&Value::Null, Some(index)).map_err(|_| DecodeError::ShapeMismatch {
            position: Position::parameter(index),
            expected: type_label::<T>(),
            detail: "missing argument".to_string(),
        }),
    }
}

fn check_extra(list: &[Value], arity: usize) -> Result<(), DecodeError> {
    if list.len() <= arity {
        return Ok(());
    }
    Err(DecodeError::ShapeMismatch {
        position: Position::parameter(arity),
        expected: "end of argument list".to_string(),
        detail: format!("{} arguments given, {arity} accepted", list.len()),
    })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

macro_rules! impl_arguments {
    ($arity:expr => $($name:ident $index:tt),+) => {
        impl<$($name: DeserializeOwned),+> Arguments for ($($name,)+) {
            const ARITY: usize = $arity;

            fn decode_args(text: &str) -> Result<Self, DecodeError> {
                if let Ok(direct) = serde_json::from_str::<Self>(text) {
                    return Ok(direct);
                }

                let list = parse_list(text)?;
                let args = ($(decode_param::<$name>(&list, $index)?,)+);
                check_extra(&list, Self::ARITY)?;
                Ok(args)
            }
        }
    };
}

macro_rules! impl_parameters {
    ($($name:ident $index:tt),+) => {
        impl<$($name: Serialize),+> Parameters for ($($name,)+) {
            fn to_params(&self) -> Value {
                Value::Array(vec![$(param(&self.$index, $index)),+])
            }
        }
    };
}

impl_arguments!(1 => A 0);
impl_arguments!(2 => A 0, B 1);
impl_arguments!(3 => A 0, B 1, C 2);
impl_arguments!(4 => A 0, B 1, C 2, D 3);
impl_arguments!(5 => A 0, B 1, C 2, D 3, E 4);
impl_arguments!(6 => A 0, B 1, C 2, D 3, E 4, F 5);
impl_arguments!(7 => A 0, B 1, C 2, D 3, E 4, F 5, G 6);
impl_arguments!(8 => A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);

impl_parameters!(A 0);
impl_parameters!(A 0, B 1);
impl_parameters!(A 0, B 1, C 2);
impl_parameters!(A 0, B 1, C 2, D 3);
impl_parameters!(A 0, B 1, C 2, D 3, E 4);
impl_parameters!(A 0, B 1, C 2, D 3, E 4, F 5);
impl_parameters!(A 0, B 1, C 2, D 3, E 4, F 5, G 6);
impl_parameters!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);
