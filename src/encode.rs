//! Strict conversion of response data into JSON values.
//!
//! serde_json silently turns NaN and infinite floats into `null`, but the
//! host treats a response it cannot faithfully decode as a broken worker.
//! Before handing data to serde_json we therefore walk it once with a
//! probing serializer that only inspects floats and rejects non-finite
//! ones.

use std::fmt;

use serde::ser::{self, Serialize};
use serde_json::Value;

use crate::error::RuntimeError;

/// Converts `data` into a [`Value`], failing on values the wire format
/// cannot represent.
pub(crate) fn to_value<T: Serialize>(data: T) -> Result<Value, RuntimeError> {
    data.serialize(Probe)
        .map_err(|err| RuntimeError::UnsupportedValue(err.0))?;
    serde_json::to_value(data).map_err(RuntimeError::Encode)
}

#[derive(Debug)]
pub(crate) struct NonFinite(String);

impl fmt::Display for NonFinite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for NonFinite {}

impl ser::Error for NonFinite {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        NonFinite(msg.to_string())
    }
}

/// A serializer that accepts everything except non-finite floats.
#[derive(Clone, Copy)]
struct Probe;

impl ser::Serializer for Probe {
    type Ok = ();
    type Error = NonFinite;

    type SerializeSeq = Probe;
    type SerializeTuple = Probe;
    type SerializeTupleStruct = Probe;
    type SerializeTupleVariant = Probe;
    type SerializeMap = Probe;
    type SerializeStruct = Probe;
    type SerializeStructVariant = Probe;

    fn serialize_bool(self, _v: bool) -> Result<(), NonFinite> {
        Ok(())
    }

    fn serialize_i8(self, _v: i8) -> Result<(), NonFinite> {
        Ok(())
    }

    fn serialize_i16(self, _v: i16) -> Result<(), NonFinite> {
        Ok(())
    }

    fn serialize_i32(self, _v: i32) -> Result<(), NonFinite> {
        Ok(())
    }

    fn serialize_i64(self, _v: i64) -> Result<(), NonFinite> {
        Ok(())
    }

    fn serialize_u8(self, _v: u8) -> Result<(), NonFinite> {
        Ok(())
    }

    fn serialize_u16(self, _v: u16) -> Result<(), NonFinite> {
        Ok(())
    }

    fn serialize_u32(self, _v: u32) -> Result<(), NonFinite> {
        Ok(())
    }

    fn serialize_u64(self, _v: u64) -> Result<(), NonFinite> {
        Ok(())
    }

    fn serialize_f32(self, v: f32) -> Result<(), NonFinite> {
        if v.is_finite() {
            Ok(())
        } else {
            Err(NonFinite(format!("non-finite number {v}")))
        }
    }

    fn serialize_f64(self, v: f64) -> Result<(), NonFinite> {
        if v.is_finite() {
            Ok(())
        } else {
            Err(NonFinite(format!("non-finite number {v}")))
        }
    }

    fn serialize_char(self, _v: char) -> Result<(), NonFinite> {
        Ok(())
    }

    fn serialize_str(self, _v: &str) -> Result<(), NonFinite> {
        Ok(())
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<(), NonFinite> {
        Ok(())
    }

    fn serialize_none(self) -> Result<(), NonFinite> {
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<(), NonFinite> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<(), NonFinite> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<(), NonFinite> {
        Ok(())
    }

    fn serialize_unit_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
    ) -> Result<(), NonFinite> {
        Ok(())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<(), NonFinite> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        value: &T,
    ) -> Result<(), NonFinite> {
        value.serialize(self)
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Probe, NonFinite> {
        Ok(self)
    }

    fn serialize_tuple(self, _len: usize) -> Result<Probe, NonFinite> {
        Ok(self)
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Probe, NonFinite> {
        Ok(self)
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Probe, NonFinite> {
        Ok(self)
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Probe, NonFinite> {
        Ok(self)
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Probe, NonFinite> {
        Ok(self)
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Probe, NonFinite> {
        Ok(self)
    }
}

impl ser::SerializeSeq for Probe {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), NonFinite> {
        value.serialize(Probe)
    }

    fn end(self) -> Result<(), NonFinite> {
        Ok(())
    }
}

impl ser::SerializeTuple for Probe {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), NonFinite> {
        value.serialize(Probe)
    }

    fn end(self) -> Result<(), NonFinite> {
        Ok(())
    }
}

impl ser::SerializeTupleStruct for Probe {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), NonFinite> {
        value.serialize(Probe)
    }

    fn end(self) -> Result<(), NonFinite> {
        Ok(())
    }
}

impl ser::SerializeTupleVariant for Probe {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), NonFinite> {
        value.serialize(Probe)
    }

    fn end(self) -> Result<(), NonFinite> {
        Ok(())
    }
}

impl ser::SerializeMap for Probe {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), NonFinite> {
        key.serialize(Probe)
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), NonFinite> {
        value.serialize(Probe)
    }

    fn end(self) -> Result<(), NonFinite> {
        Ok(())
    }
}

impl ser::SerializeStruct for Probe {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), NonFinite> {
        value.serialize(Probe)
    }

    fn end(self) -> Result<(), NonFinite> {
        Ok(())
    }
}

impl ser::SerializeStructVariant for Probe {
    type Ok = ();
    type Error = NonFinite;

    fn serialize_field<T: ?Sized + Serialize>(
        &mut self,
        _key: &'static str,
        value: &T,
    ) -> Result<(), NonFinite> {
        value.serialize(Probe)
    }

    fn end(self) -> Result<(), NonFinite> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn finite_values_convert_losslessly() {
        #[derive(serde::Serialize)]
        struct Payload {
            count: u32,
            ratio: f64,
            tags: Vec<String>,
        }

        let value = to_value(Payload {
            count: 3,
            ratio: 0.5,
            tags: vec!["a".into(), "b".into()],
        })
        .unwrap();
        assert_eq!(value, json!({"count": 3, "ratio": 0.5, "tags": ["a", "b"]}));
    }

    #[test]
    fn infinity_is_rejected() {
        let err = to_value(f64::INFINITY).unwrap_err();
        assert!(matches!(err, RuntimeError::UnsupportedValue(_)));
        assert!(err.to_string().contains("unsupported value"));
    }

    #[test]
    fn nested_nan_is_rejected() {
        let mut inner = HashMap::new();
        inner.insert("ratio", vec![1.0, f64::NAN]);
        let err = to_value(&inner).unwrap_err();
        assert!(matches!(err, RuntimeError::UnsupportedValue(_)));
    }

    #[test]
    fn optional_non_finite_is_rejected() {
        let err = to_value(Some(f32::NEG_INFINITY)).unwrap_err();
        assert!(matches!(err, RuntimeError::UnsupportedValue(_)));
    }
}
