//! Values held by fields and array elements
//!
//! Primitives and strings are atomic: they are copied by value and never
//! traversed. Structs are inline value types whose fields may still hold
//! references. Everything with identity lives behind a [`GcRef`].

use std::sync::Arc;

use crate::object::GcRef;
use crate::types::{PrimitiveKind, TypeId};

/// A primitive scalar
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Primitive {
    /// Boolean
    Bool(bool),
    /// Unicode scalar
    Char(char),
    /// Signed 8-bit integer
    I8(i8),
    /// Unsigned 8-bit integer
    U8(u8),
    /// Signed 16-bit integer
    I16(i16),
    /// Unsigned 16-bit integer
    U16(u16),
    /// Signed 32-bit integer
    I32(i32),
    /// Unsigned 32-bit integer
    U32(u32),
    /// Signed 64-bit integer
    I64(i64),
    /// Unsigned 64-bit integer
    U64(u64),
    /// Pointer-sized signed integer
    ISize(isize),
    /// Pointer-sized unsigned integer
    USize(usize),
    /// 32-bit float
    F32(f32),
    /// 64-bit float
    F64(f64),
}

impl Primitive {
    /// Kind of this primitive
    pub const fn kind(&self) -> PrimitiveKind {
        match self {
            Primitive::Bool(_) => PrimitiveKind::Bool,
            Primitive::Char(_) => PrimitiveKind::Char,
            Primitive::I8(_) => PrimitiveKind::I8,
            Primitive::U8(_) => PrimitiveKind::U8,
            Primitive::I16(_) => PrimitiveKind::I16,
            Primitive::U16(_) => PrimitiveKind::U16,
            Primitive::I32(_) => PrimitiveKind::I32,
            Primitive::U32(_) => PrimitiveKind::U32,
            Primitive::I64(_) => PrimitiveKind::I64,
            Primitive::U64(_) => PrimitiveKind::U64,
            Primitive::ISize(_) => PrimitiveKind::ISize,
            Primitive::USize(_) => PrimitiveKind::USize,
            Primitive::F32(_) => PrimitiveKind::F32,
            Primitive::F64(_) => PrimitiveKind::F64,
        }
    }

    /// Zero value of a kind
    pub const fn zero(kind: PrimitiveKind) -> Self {
        match kind {
            PrimitiveKind::Bool => Primitive::Bool(false),
            PrimitiveKind::Char => Primitive::Char('\0'),
            PrimitiveKind::I8 => Primitive::I8(0),
            PrimitiveKind::U8 => Primitive::U8(0),
            PrimitiveKind::I16 => Primitive::I16(0),
            PrimitiveKind::U16 => Primitive::U16(0),
            PrimitiveKind::I32 => Primitive::I32(0),
            PrimitiveKind::U32 => Primitive::U32(0),
            PrimitiveKind::I64 => Primitive::I64(0),
            PrimitiveKind::U64 => Primitive::U64(0),
            PrimitiveKind::ISize => Primitive::ISize(0),
            PrimitiveKind::USize => Primitive::USize(0),
            PrimitiveKind::F32 => Primitive::F32(0.0),
            PrimitiveKind::F64 => Primitive::F64(0.0),
        }
    }

    /// Raw bit pattern, zero-extended to 64 bits
    pub fn to_bits(&self) -> u64 {
        match *self {
            Primitive::Bool(b) => b as u64,
            Primitive::Char(c) => c as u64,
            Primitive::I8(n) => n as u8 as u64,
            Primitive::U8(n) => n as u64,
            Primitive::I16(n) => n as u16 as u64,
            Primitive::U16(n) => n as u64,
            Primitive::I32(n) => n as u32 as u64,
            Primitive::U32(n) => n as u64,
            Primitive::I64(n) => n as u64,
            Primitive::U64(n) => n,
            Primitive::ISize(n) => n as u64,
            Primitive::USize(n) => n as u64,
            Primitive::F32(n) => n.to_bits() as u64,
            Primitive::F64(n) => n.to_bits(),
        }
    }

    /// Same kind and same bits (NaN payloads compare equal to themselves)
    pub fn bit_eq(&self, other: &Primitive) -> bool {
        self.kind() == other.kind() && self.to_bits() == other.to_bits()
    }
}

macro_rules! primitive_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Primitive {
                fn from(value: $ty) -> Self {
                    Primitive::$variant(value)
                }
            }

            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Primitive(Primitive::$variant(value))
                }
            }
        )*
    };
}

primitive_from! {
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

/// An inline value-type instance
#[derive(Clone, Debug)]
pub struct StructValue {
    type_id: TypeId,
    fields: Vec<Value>,
}

impl StructValue {
    /// Create a struct value from its field values in declaration order
    pub fn new(type_id: TypeId, fields: Vec<Value>) -> Self {
        Self { type_id, fields }
    }

    /// Struct type
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Field values in declaration order
    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    /// Consume the struct, returning its field values
    pub fn into_fields(self) -> Vec<Value> {
        self.fields
    }

    /// Field value at index
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.fields.get(index)
    }

    /// Replace the field value at index; false if out of range
    pub fn set(&mut self, index: usize, value: Value) -> bool {
        match self.fields.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

/// Any value a slot can hold
#[derive(Clone, Debug, Default)]
pub enum Value {
    /// Absent reference
    #[default]
    Null,
    /// Primitive scalar
    Primitive(Primitive),
    /// Immutable text, shared freely
    String(Arc<str>),
    /// Inline value type
    Struct(StructValue),
    /// Heap object with identity
    Ref(GcRef),
}

impl Value {
    /// Create a boolean value
    pub fn boolean(b: bool) -> Self {
        Self::Primitive(Primitive::Bool(b))
    }

    /// Create a 32-bit integer value
    pub fn int32(n: i32) -> Self {
        Self::Primitive(Primitive::I32(n))
    }

    /// Create a 64-bit float value
    pub fn float64(n: f64) -> Self {
        Self::Primitive(Primitive::F64(n))
    }

    /// Create a string value
    pub fn string(s: &str) -> Self {
        Self::String(Arc::from(s))
    }

    /// Create a heap object value
    pub fn object(obj: GcRef) -> Self {
        Self::Ref(obj)
    }

    /// Runtime type, `None` for null
    pub fn type_id(&self) -> Option<TypeId> {
        match self {
            Value::Null => None,
            Value::Primitive(p) => Some(TypeId::primitive(p.kind())),
            Value::String(_) => Some(TypeId::STRING),
            Value::Struct(s) => Some(s.type_id()),
            Value::Ref(obj) => Some(obj.type_id()),
        }
    }

    /// Short description for error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Primitive(p) => p.kind().name(),
            Value::String(_) => "string",
            Value::Struct(_) => "struct",
            Value::Ref(obj) if obj.as_array().is_some() => "array",
            Value::Ref(obj) if obj.is_delegate() => "delegate",
            Value::Ref(_) => "object",
        }
    }

    /// Check if null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get as primitive
    pub fn as_primitive(&self) -> Option<Primitive> {
        match self {
            Value::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// Get as 32-bit integer
    pub fn as_int32(&self) -> Option<i32> {
        match self {
            Value::Primitive(Primitive::I32(n)) => Some(*n),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as struct value
    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Get as heap object
    pub fn as_object(&self) -> Option<&GcRef> {
        match self {
            Value::Ref(obj) => Some(obj),
            _ => None,
        }
    }

    /// Reference identity; false unless both are the same heap object
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Ref(a), Value::Ref(b)) => GcRef::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<Primitive> for Value {
    fn from(p: Primitive) -> Self {
        Value::Primitive(p)
    }
}

impl From<GcRef> for Value {
    fn from(obj: GcRef) -> Self {
        Value::Ref(obj)
    }
}

impl From<StructValue> for Value {
    fn from(s: StructValue) -> Self {
        Value::Struct(s)
    }
}
