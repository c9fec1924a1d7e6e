//! Conversions between Rust types and [`Value`]

use std::sync::Arc;

use crate::error::{CloneError, CloneResult};
use crate::object::GcRef;
use crate::value::{Primitive, StructValue, Value};

/// A Rust type that can round-trip through a [`Value`]
pub trait Managed: Sized {
    /// Wrap as a value
    fn to_value(&self) -> Value;

    /// Unwrap from a value
    fn from_value(value: Value) -> CloneResult<Self>;
}

macro_rules! managed_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Managed for $ty {
                fn to_value(&self) -> Value {
                    Value::Primitive(Primitive::$variant(*self))
                }

                fn from_value(value: Value) -> CloneResult<Self> {
                    match value {
                        Value::Primitive(Primitive::$variant(v)) => Ok(v),
                        other => Err(CloneError::type_mismatch(stringify!($ty), other.kind_name())),
                    }
                }
            }
        )*
    };
}

managed_primitive! {
    bool => Bool,
    char => Char,
    i8 => I8,
    u8 => U8,
    i16 => I16,
    u16 => U16,
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    isize => ISize,
    usize => USize,
    f32 => F32,
    f64 => F64,
}

impl Managed for String {
    fn to_value(&self) -> Value {
        Value::string(self)
    }

    fn from_value(value: Value) -> CloneResult<Self> {
        match value {
            Value::String(s) => Ok(s.to_string()),
            other => Err(CloneError::type_mismatch("String", other.kind_name())),
        }
    }
}

impl Managed for Arc<str> {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_value(value: Value) -> CloneResult<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(CloneError::type_mismatch("String", other.kind_name())),
        }
    }
}

impl Managed for GcRef {
    fn to_value(&self) -> Value {
        Value::Ref(self.clone())
    }

    fn from_value(value: Value) -> CloneResult<Self> {
        match value {
            Value::Ref(obj) => Ok(obj),
            other => Err(CloneError::type_mismatch("object", other.kind_name())),
        }
    }
}

// Delegates clone to `None`
impl Managed for Option<GcRef> {
    fn to_value(&self) -> Value {
        match self {
            Some(obj) => Value::Ref(obj.clone()),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> CloneResult<Self> {
        match value {
            Value::Null => Ok(None),
            Value::Ref(obj) => Ok(Some(obj)),
            other => Err(CloneError::type_mismatch("object or null", other.kind_name())),
        }
    }
}

impl Managed for StructValue {
    fn to_value(&self) -> Value {
        Value::Struct(self.clone())
    }

    fn from_value(value: Value) -> CloneResult<Self> {
        match value {
            Value::Struct(s) => Ok(s),
            other => Err(CloneError::type_mismatch("struct", other.kind_name())),
        }
    }
}

impl Managed for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }

    fn from_value(value: Value) -> CloneResult<Self> {
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_round_trip() {
        assert_eq!(i64::from_value(42i64.to_value()), Ok(42));
        assert_eq!(char::from_value('x'.to_value()), Ok('x'));
        let err = i32::from_value(Value::from(1u32)).unwrap_err();
        assert_eq!(err, CloneError::type_mismatch("i32", "u32"));
    }

    #[test]
    fn test_strings() {
        let s = String::from("abc");
        assert_eq!(String::from_value(s.to_value()), Ok(s));
        assert!(String::from_value(Value::Null).is_err());
    }

    #[test]
    fn test_optional_ref() {
        assert_eq!(Option::<GcRef>::from_value(Value::Null).map(|o| o.is_none()), Ok(true));
        assert!(GcRef::from_value(Value::Null).is_err());
    }
}
