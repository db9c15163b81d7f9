//! Path-tracking deserializer over a parsed `serde_json::Value`.
//!
//! Structs are walked in field declaration order (the order serde's
//! derive hands us in `fields`), sequences in index order. The path of
//! the element being decoded stays on the stack when an error unwinds,
//! which is how the failing position is recovered.
//!
//! Declared fields missing from the input are visited in their place as
//! well. A missing field that cannot be decoded from nothing may still be
//! one the type defaults, so the struct is replayed up to that field to
//! let serde's derive decide.

use std::cell::RefCell;
use std::collections::HashSet;

use serde::de::value::BorrowedStrDeserializer;
use serde::de::{self, DeserializeOwned, DeserializeSeed, MapAccess, SeqAccess, Visitor};
use serde::forward_to_deserialize_any;
use serde_json::{Error, Value};

use super::type_label;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Field(String),
    Index(usize),
}

pub(crate) fn render(path: &[Segment]) -> String {
    let mut out = String::new();
    for segment in path {
        match segment {
            Segment::Field(name) => {
                out.push('.');
                out.push_str(name);
            }
            Segment::Index(index) => out.push_str(&format!("[{index}]")),
        }
    }
    out
}

/// A failed walk: where it stopped and why.
#[derive(Debug)]
pub(crate) struct Located {
    pub(crate) path: Vec<Segment>,
    pub(crate) error: Error,
    /// Type of a required field that was missing from the input.
    pub(crate) expected: Option<String>,
}

/// A declared field of the struct at a rendered path.
type FieldKey = (String, &'static str);

struct Walk {
    path: RefCell<Vec<Segment>>,
    /// Missing fields known to be defaulted by the type.
    defaulted: HashSet<FieldKey>,
    /// Stop the struct at this path right before this field.
    truncate: Option<FieldKey>,
    /// Set when a missing field failed to decode from nothing.
    missing: RefCell<Option<(FieldKey, String)>>,
}

impl Walk {
    fn new(defaulted: HashSet<FieldKey>, truncate: Option<FieldKey>) -> Self {
        Self {
            path: RefCell::new(Vec::new()),
            defaulted,
            truncate,
            missing: RefCell::new(None),
        }
    }

    fn here(&self) -> String {
        render(&self.path.borrow())
    }
}

/// Deserialize `T` from `value`, returning the failing path on error.
pub(crate) fn walk<T: DeserializeOwned>(value: &Value) -> Result<T, Located> {
    let mut defaulted = HashSet::new();
    loop {
        let run = Walk::new(defaulted.clone(), None);
        let error = match T::deserialize(Probe { value, walk: &run }) {
            Ok(decoded) => return Ok(decoded),
            Err(error) => error,
        };

        let missing = run.missing.borrow_mut().take();
        let Some((field, expected)) = missing else {
            return Err(Located {
                path: run.path.into_inner(),
                error,
                expected: None,
            });
        };

        if is_required::<T>(value, &defaulted, &field) {
            return Err(Located {
                path: run.path.into_inner(),
                error,
                expected: Some(expected),
            });
        }
        defaulted.insert(field);
    }
}

/// Replay `value` with the struct at `field.0` cut off before `field.1`.
/// serde's derive reports missing fields in declaration order, so the
/// field is required exactly when it is the one reported.
fn is_required<T: DeserializeOwned>(
    value: &Value,
    defaulted: &HashSet<FieldKey>,
    field: &FieldKey,
) -> bool {
    let replay = Walk::new(defaulted.clone(), Some(field.clone()));
    match T::deserialize(Probe {
        value,
        walk: &replay,
    }) {
        Ok(_) => false,
        Err(error) => {
            replay.here() == field.0
                && error.to_string() == format!("missing field `{}`", field.1)
        }
    }
}

/// `Some` only for shapes that carry no data at all (`()`).
pub(crate) fn void<T: DeserializeOwned>() -> Option<T> {
    T::deserialize(VoidProbe).ok()
}

struct Probe<'a> {
    value: &'a Value,
    walk: &'a Walk,
}

macro_rules! forward_to_value {
    ($($method:ident)*) => {
        $(
            fn $method<V: Visitor<'a>>(self, visitor: V) -> Result<V::Value, Error> {
                de::Deserializer::$method(self.value, visitor)
            }
        )*
    };
}

impl<'a> de::Deserializer<'a> for Probe<'a> {
    type Error = Error;

    forward_to_value! {
        deserialize_any deserialize_bool
        deserialize_i8 deserialize_i16 deserialize_i32 deserialize_i64 deserialize_i128
        deserialize_u8 deserialize_u16 deserialize_u32 deserialize_u64 deserialize_u128
        deserialize_f32 deserialize_f64 deserialize_char deserialize_str deserialize_string
        deserialize_bytes deserialize_byte_buf deserialize_unit deserialize_map
        deserialize_identifier deserialize_ignored_any
    }

    fn deserialize_option<V: Visitor<'a>>(self, visitor: V) -> Result<V::Value, Error> {
        match self.value {
            Value::Null => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'a>>(
        self,
        name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        de::Deserializer::deserialize_unit_struct(self.value, name, visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'a>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'a>>(self, visitor: V) -> Result<V::Value, Error> {
        let Value::Array(items) = self.value else {
            return de::Deserializer::deserialize_seq(self.value, visitor);
        };

        let len = items.len();
        let mut access = SeqProbe {
            items: items.iter().enumerate(),
            walk: self.walk,
        };
        let value = visitor.visit_seq(&mut access)?;

        if access.items.len() == 0 {
            Ok(value)
        } else {
            Err(de::Error::invalid_length(len, &"fewer elements in array"))
        }
    }

    fn deserialize_tuple<V: Visitor<'a>>(self, _len: usize, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'a>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_struct<V: Visitor<'a>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        let Value::Object(map) = self.value else {
            return de::Deserializer::deserialize_struct(self.value, name, fields, visitor);
        };

        let here = self.walk.here();
        let stop = self
            .walk
            .truncate
            .as_ref()
            .filter(|(at, _)| *at == here)
            .map(|(_, field)| *field);

        let mut entries = Vec::with_capacity(fields.len());
        for field in fields {
            if stop == Some(*field) {
                break;
            }
            match map.get_key_value(*field) {
                Some((key, value)) => entries.push(Entry::Present(key.as_str(), value)),
                None if self.walk.defaulted.contains(&(here.clone(), *field)) => {}
                None => entries.push(Entry::Missing(*field)),
            }
        }
        // Unknown keys last so `deny_unknown_fields` still sees them.
        if stop.is_none() {
            entries.extend(
                map.iter()
                    .filter(|(key, _)| !fields.contains(&key.as_str()))
                    .map(|(key, value)| Entry::Present(key.as_str(), value)),
            );
        }

        visitor.visit_map(MapProbe {
            entries: entries.into_iter(),
            pending: None,
            here,
            walk: self.walk,
        })
    }

    fn deserialize_enum<V: Visitor<'a>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        de::Deserializer::deserialize_enum(self.value, name, variants, visitor)
    }
}

struct SeqProbe<'a> {
    items: std::iter::Enumerate<std::slice::Iter<'a, Value>>,
    walk: &'a Walk,
}

impl<'a> SeqAccess<'a> for SeqProbe<'a> {
    type Error = Error;

    fn next_element_seed<S: DeserializeSeed<'a>>(&mut self, seed: S) -> Result<Option<S::Value>, Error> {
        let Some((index, value)) = self.items.next() else {
            return Ok(None);
        };

        self.walk.path.borrow_mut().push(Segment::Index(index));
        let element = seed.deserialize(Probe {
            value,
            walk: self.walk,
        })?;
        self.walk.path.borrow_mut().pop();

        Ok(Some(element))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

#[derive(Clone, Copy)]
enum Entry<'a> {
    Present(&'a str, &'a Value),
    Missing(&'static str),
}

impl<'a> Entry<'a> {
    fn key(self) -> &'a str {
        match self {
            Entry::Present(key, _) => key,
            Entry::Missing(key) => key,
        }
    }
}

struct MapProbe<'a> {
    entries: std::vec::IntoIter<Entry<'a>>,
    pending: Option<Entry<'a>>,
    here: String,
    walk: &'a Walk,
}

impl<'a> MapAccess<'a> for MapProbe<'a> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'a>>(&mut self, seed: K) -> Result<Option<K::Value>, Error> {
        let Some(entry) = self.entries.next() else {
            return Ok(None);
        };

        self.pending = Some(entry);
        seed.deserialize(BorrowedStrDeserializer::<Error>::new(entry.key()))
            .map(Some)
    }

    fn next_value_seed<S: DeserializeSeed<'a>>(&mut self, seed: S) -> Result<S::Value, Error> {
        let entry = self
            .pending
            .take()
            .ok_or_else(|| <Error as de::Error>::custom("value requested before key"))?;

        self.walk
            .path
            .borrow_mut()
            .push(Segment::Field(entry.key().to_string()));
        let field = match entry {
            Entry::Present(_, value) => seed.deserialize(Probe {
                value,
                walk: self.walk,
            })?,
            Entry::Missing(name) => seed.deserialize(Nothing(name)).inspect_err(|_| {
                *self.walk.missing.borrow_mut() =
                    Some(((self.here.clone(), name), type_label::<S::Value>()));
            })?,
        };
        self.walk.path.borrow_mut().pop();

        Ok(field)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

/// Stands in for a field missing from the input. Only `Option`-like
/// shapes accept it.
struct Nothing(&'static str);

impl<'de> de::Deserializer<'de> for Nothing {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Error> {
        Err(de::Error::missing_field(self.0))
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_none()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct newtype_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }
}

/// Accepts only the unit shape.
struct VoidProbe;

impl<'de> de::Deserializer<'de> for VoidProbe {
    type Error = de::value::Error;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(de::Error::custom("shape carries data"))
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit_struct newtype_struct seq tuple
        tuple_struct map struct enum identifier ignored_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Inner {
        tags: Vec<u32>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Outer {
        name: String,
        inner: Inner,
    }

    #[test]
    fn render_paths() {
        let path = vec![
            Segment::Field("user".into()),
            Segment::Field("tags".into()),
            Segment::Index(2),
        ];
        assert_eq!(render(&path), ".user.tags[2]");
        assert_eq!(render(&[]), "");
    }

    #[test]
    fn walk_succeeds_on_matching_shape() {
        let value = serde_json::json!({"name": "a", "inner": {"tags": [1, 2]}});
        let outer: Outer = walk(&value).unwrap();
        assert_eq!(outer.inner.tags, vec![1, 2]);
    }

    #[test]
    fn walk_reports_nested_index() {
        let value = serde_json::json!({"name": "a", "inner": {"tags": [1, 2, "x"]}});
        let located = walk::<Outer>(&value).unwrap_err();
        assert_eq!(render(&located.path), ".inner.tags[2]");
    }

    #[test]
    fn walk_uses_declaration_order_not_input_order() {
        // Input lists `inner` first; both fields are wrong.
        let value = serde_json::json!({"inner": 5, "name": 7});
        let located = walk::<Outer>(&value).unwrap_err();
        assert_eq!(render(&located.path), ".name");
    }

    #[test]
    fn walk_tracks_through_options() {
        let value = serde_json::json!([null, {"tags": ["no"]}]);
        let located = walk::<Vec<Option<Inner>>>(&value).unwrap_err();
        assert_eq!(render(&located.path), "[1].tags[0]");
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Settings {
        #[serde(default)]
        retries: u32,
        title: String,
        size: u32,
    }

    #[test]
    fn walk_reports_missing_field_before_later_mismatch() {
        let value = serde_json::json!({"inner": {"tags": ["x"]}});
        let located = walk::<Outer>(&value).unwrap_err();
        assert_eq!(render(&located.path), ".name");
        assert_eq!(located.expected.as_deref(), Some("String"));
    }

    #[test]
    fn walk_skips_defaulted_fields() {
        let value = serde_json::json!({"title": "t", "size": "big"});
        let located = walk::<Settings>(&value).unwrap_err();
        assert_eq!(render(&located.path), ".size");
        assert_eq!(located.expected, None);

        let value = serde_json::json!({"title": "t", "size": 3});
        assert_eq!(
            walk::<Settings>(&value).unwrap(),
            Settings {
                retries: 0,
                title: "t".into(),
                size: 3
            }
        );
    }

    #[test]
    fn walk_reports_missing_field_inside_sequence() {
        let value = serde_json::json!([{"name": "a"}]);
        let located = walk::<Vec<Outer>>(&value).unwrap_err();
        assert_eq!(render(&located.path), "[0].inner");
    }

    #[test]
    fn void_only_for_unit() {
        assert_eq!(void::<()>(), Some(()));
        assert!(void::<u32>().is_none());
        assert!(void::<Option<u32>>().is_none());
        assert!(void::<serde_json::Value>().is_none());
        assert!(void::<Vec<u8>>().is_none());
    }
}
