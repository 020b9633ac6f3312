//! Maps result rows onto any `Deserialize` type by label.
//!
//! Struct fields match labels after normalisation: case is ignored and
//! `_`, `-`, `.` and spaces are dropped, so `firstName`, `first_name` and
//! `FIRST NAME` are the same field. Labels without a field are ignored;
//! fields without a label are left to serde (`#[serde(default)]` or a
//! missing-field error). Nested rows map onto nested structs and multisets
//! onto sequences.

use std::fmt;

use joinery_core::row::{ResultRow, Value};
use joinery_core::{Error, SqlValue};
use serde::de::{
    self, DeserializeOwned, DeserializeSeed, Deserializer, IntoDeserializer, MapAccess, SeqAccess,
    Visitor,
};

/// Deserialization failure.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct DeError(String);

impl de::Error for DeError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self(msg.to_string())
    }
}

impl From<DeError> for Error {
    fn from(err: DeError) -> Self {
        Self::mapping(err.0)
    }
}

/// Deserializes one result row into `T`.
///
/// # Errors
///
/// Returns [`Error::Mapping`] when the row does not fit `T`.
pub fn from_row<T: DeserializeOwned>(row: ResultRow) -> joinery_core::Result<T> {
    Ok(T::deserialize(RowDeserializer(row))?)
}

fn normalize(label: &str) -> String {
    label
        .chars()
        .filter(|c| !matches!(c, '_' | '-' | '.' | ' '))
        .flat_map(char::to_lowercase)
        .collect()
}

struct RowDeserializer(ResultRow);

impl RowDeserializer {
    fn entries(self) -> Vec<(String, Value)> {
        let names: Vec<String> = self.0.labels().iter().map(|l| l.name.clone()).collect();
        names.into_iter().zip(self.0.into_values()).collect()
    }
}

impl<'de> Deserializer<'de> for RowDeserializer {
    type Error = DeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        self.deserialize_map(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_map(Entries::new(self.entries()))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DeError> {
        let mut entries = self.entries();
        let mut matched = Vec::with_capacity(fields.len());
        for field in fields {
            let wanted = normalize(field);
            if let Some(position) = entries.iter().position(|(name, _)| normalize(name) == wanted) {
                let (_, value) = entries.remove(position);
                matched.push(((*field).to_owned(), value));
            }
        }
        visitor.visit_map(Entries::new(matched))
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        visitor.visit_seq(Values(self.0.into_values().into_iter()))
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        self.deserialize_seq(visitor)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct enum identifier
        ignored_any
    }
}

struct Entries {
    entries: std::vec::IntoIter<(String, Value)>,
    pending: Option<Value>,
}

impl Entries {
    fn new(entries: Vec<(String, Value)>) -> Self {
        Self {
            entries: entries.into_iter(),
            pending: None,
        }
    }
}

impl<'de> MapAccess<'de> for Entries {
    type Error = DeError;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, DeError> {
        match self.entries.next() {
            Some((name, value)) => {
                self.pending = Some(value);
                seed.deserialize(name.into_deserializer()).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, DeError> {
        let value = self
            .pending
            .take()
            .ok_or_else(|| <DeError as de::Error>::custom("value requested before key"))?;
        seed.deserialize(ValueDeserializer(value))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

struct Values(std::vec::IntoIter<Value>);

impl<'de> SeqAccess<'de> for Values {
    type Error = DeError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, DeError> {
        self.0
            .next()
            .map(|value| seed.deserialize(ValueDeserializer(value)))
            .transpose()
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.0.len())
    }
}

struct Rows(std::vec::IntoIter<ResultRow>);

impl<'de> SeqAccess<'de> for Rows {
    type Error = DeError;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, DeError> {
        self.0
            .next()
            .map(|row| seed.deserialize(RowDeserializer(row)))
            .transpose()
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.0.len())
    }
}

struct ValueDeserializer(Value);

impl<'de> Deserializer<'de> for ValueDeserializer {
    type Error = DeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match self.0 {
            Value::Sql(value) => match value {
                SqlValue::Null => visitor.visit_none(),
                SqlValue::Bool(b) => visitor.visit_bool(b),
                SqlValue::Int(i) => visitor.visit_i64(i),
                SqlValue::Float(f) => visitor.visit_f64(f),
                SqlValue::Text(s) => visitor.visit_string(s),
                SqlValue::Blob(b) => visitor.visit_byte_buf(b),
                SqlValue::Date(d) => visitor.visit_string(d.to_string()),
                SqlValue::Timestamp(t) => {
                    visitor.visit_string(t.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
                }
            },
            Value::Row(row) => RowDeserializer(row).deserialize_map(visitor),
            Value::Rows(rows) => visitor.visit_seq(Rows(rows.into_iter())),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match self.0 {
            Value::Sql(SqlValue::Null) => visitor.visit_none(),
            other => visitor.visit_some(ValueDeserializer(other)),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, DeError> {
        match self.0 {
            Value::Sql(SqlValue::Int(i)) => visitor.visit_bool(i != 0),
            other => ValueDeserializer(other).deserialize_any(visitor),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, DeError> {
        match self.0 {
            Value::Row(row) => RowDeserializer(row).deserialize_struct(name, fields, visitor),
            other => ValueDeserializer(other).deserialize_any(visitor),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        len: usize,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        match self.0 {
            Value::Row(row) => RowDeserializer(row).deserialize_tuple(len, visitor),
            other => ValueDeserializer(other).deserialize_any(visitor),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, DeError> {
        visitor.visit_newtype_struct(self)
    }

    serde::forward_to_deserialize_any! {
        i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple_struct map enum identifier
        ignored_any
    }
}
