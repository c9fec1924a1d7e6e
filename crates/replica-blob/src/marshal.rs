//! Record marshalling
//!
//! A [`RecordLayout`] maps the fields of a class or struct onto a packed,
//! sequential, little-endian byte layout. Only primitive fields are allowed;
//! struct-typed fields are inlined in place. Class records include every
//! instance slot, private ancestor fields included, base fields first.
//!
//! `char` is stored as its 32-bit scalar value and pointer-sized integers as
//! 64 bits, so a layout does not depend on the host.

use replica_core::{
    CloneError, FieldInfo, GcRef, Primitive, PrimitiveKind, StructValue, TypeId, TypeKind,
    TypeRegistry, Value,
};

use crate::error::{BlobError, BlobResult};

#[derive(Debug, Clone)]
enum FieldCodec {
    Primitive(PrimitiveKind),
    Struct(RecordLayout),
}

#[derive(Debug, Clone)]
struct LayoutField {
    name: String,
    slot: usize,
    offset: usize,
    codec: FieldCodec,
}

/// Packed byte layout of a record type
#[derive(Debug, Clone)]
pub struct RecordLayout {
    type_id: TypeId,
    type_name: String,
    is_class: bool,
    size: usize,
    fields: Vec<LayoutField>,
}

impl RecordLayout {
    /// Compute the layout of a class or struct
    pub fn of(registry: &TypeRegistry, ty: TypeId) -> BlobResult<Self> {
        let info = registry.get(ty)?;
        let is_class = info.is_class();
        if !is_class && !info.is_struct() {
            return Err(BlobError::invalid_argument(
                "record type",
                format!("`{}` is neither a class nor a struct", info.name()),
            ));
        }
        if info.is_abstract() {
            return Err(BlobError::invalid_argument(
                "record type",
                format!("`{}` is abstract", info.name()),
            ));
        }

        let mut declared: Vec<&FieldInfo> = Vec::new();
        for level in registry.hierarchy(ty)?.into_iter().rev() {
            declared.extend(registry.declared_fields(level)?);
        }

        let mut size = 0usize;
        let mut fields = Vec::with_capacity(declared.len());
        for field in declared {
            let field_type = registry.get(field.field_type())?;
            let codec = match field_type.kind() {
                TypeKind::Primitive(kind) => FieldCodec::Primitive(kind),
                TypeKind::Struct => FieldCodec::Struct(Self::of(registry, field.field_type())?),
                _ => {
                    return Err(BlobError::unsupported_field(
                        info.name(),
                        field.name(),
                        format!("`{}` has no fixed byte layout", field_type.name()),
                    ));
                }
            };
            let width = match &codec {
                FieldCodec::Primitive(kind) => kind.byte_size(),
                FieldCodec::Struct(layout) => layout.size,
            };
            fields.push(LayoutField {
                name: field.name().to_string(),
                slot: field.slot(),
                offset: size,
                codec,
            });
            size += width;
        }

        Ok(Self {
            type_id: ty,
            type_name: info.name().to_string(),
            is_class,
            size,
            fields,
        })
    }

    /// Record type
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Packed size in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Byte offset of a top-level field
    pub fn field_offset(&self, name: &str) -> Option<usize> {
        self.fields.iter().find(|f| f.name == name).map(|f| f.offset)
    }

    /// Decode a record; `bytes` must be exactly [`RecordLayout::size`] long
    pub fn read_record(&self, registry: &TypeRegistry, bytes: &[u8]) -> BlobResult<Value> {
        if bytes.len() != self.size {
            return Err(BlobError::SizeMismatch {
                expected: self.size,
                found: bytes.len(),
            });
        }

        let values = self.decode_fields(registry, bytes)?;
        if self.is_class {
            let obj = registry.new_object(self.type_id)?;
            for (field, value) in self.fields.iter().zip(values) {
                if !obj.set_slot(field.slot, value) {
                    return Err(self.missing_slot(field).into());
                }
            }
            Ok(Value::object(obj))
        } else {
            let mut record = registry.new_struct(self.type_id)?;
            for (field, value) in self.fields.iter().zip(values) {
                if !record.set(field.slot, value) {
                    return Err(self.missing_slot(field).into());
                }
            }
            Ok(Value::Struct(record))
        }
    }

    /// Encode a record of this layout's type
    pub fn write_record(&self, value: &Value) -> BlobResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.size);
        self.encode_into(value, &mut out)?;
        Ok(out)
    }

    fn decode_fields(&self, registry: &TypeRegistry, bytes: &[u8]) -> BlobResult<Vec<Value>> {
        let mut values = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let value = match &field.codec {
                FieldCodec::Primitive(kind) => {
                    let raw = &bytes[field.offset..field.offset + kind.byte_size()];
                    Value::Primitive(decode_primitive(*kind, raw)?)
                }
                FieldCodec::Struct(layout) => {
                    let raw = &bytes[field.offset..field.offset + layout.size];
                    layout.read_record(registry, raw)?
                }
            };
            values.push(value);
        }
        Ok(values)
    }

    fn encode_into(&self, value: &Value, out: &mut Vec<u8>) -> BlobResult<()> {
        let slots = self.record_slots(value)?;
        for field in &self.fields {
            let slot = slots
                .get(field.slot)
                .ok_or_else(|| self.missing_slot(field))?;
            match (&field.codec, slot) {
                (FieldCodec::Primitive(kind), Value::Primitive(p)) if p.kind() == *kind => {
                    encode_primitive(p, out);
                }
                (FieldCodec::Struct(layout), nested @ Value::Struct(_)) => {
                    layout.encode_into(nested, out)?;
                }
                (FieldCodec::Primitive(kind), other) => {
                    return Err(CloneError::type_mismatch(kind.name(), other.kind_name()).into());
                }
                (FieldCodec::Struct(layout), other) => {
                    return Err(
                        CloneError::type_mismatch(&layout.type_name, other.kind_name()).into(),
                    );
                }
            }
        }
        Ok(())
    }

    fn record_slots(&self, value: &Value) -> BlobResult<Vec<Value>> {
        match value {
            Value::Ref(obj) if self.is_class && obj.type_id() == self.type_id => Ok(obj.slots()),
            Value::Struct(s) if !self.is_class && s.type_id() == self.type_id => {
                Ok(s.fields().to_vec())
            }
            other => Err(CloneError::type_mismatch(&self.type_name, other.kind_name()).into()),
        }
    }

    fn missing_slot(&self, field: &LayoutField) -> CloneError {
        CloneError::introspection(
            &self.type_name,
            format!("slot {} of field `{}` is missing", field.slot, field.name),
        )
    }
}

fn decode_primitive(kind: PrimitiveKind, raw: &[u8]) -> BlobResult<Primitive> {
    let mut wide = [0u8; 8];
    wide[..raw.len()].copy_from_slice(raw);
    let bits = u64::from_le_bytes(wide);

    Ok(match kind {
        PrimitiveKind::Bool => Primitive::Bool(bits != 0),
        PrimitiveKind::Char => {
            let code = bits as u32;
            Primitive::Char(char::from_u32(code).ok_or(BlobError::InvalidChar(code))?)
        }
        PrimitiveKind::I8 => Primitive::I8(bits as u8 as i8),
        PrimitiveKind::U8 => Primitive::U8(bits as u8),
        PrimitiveKind::I16 => Primitive::I16(bits as u16 as i16),
        PrimitiveKind::U16 => Primitive::U16(bits as u16),
        PrimitiveKind::I32 => Primitive::I32(bits as u32 as i32),
        PrimitiveKind::U32 => Primitive::U32(bits as u32),
        PrimitiveKind::I64 => Primitive::I64(bits as i64),
        PrimitiveKind::U64 => Primitive::U64(bits),
        PrimitiveKind::ISize => Primitive::ISize(
            isize::try_from(bits as i64)
                .map_err(|_| BlobError::invalid_argument("isize", "value does not fit the host"))?,
        ),
        PrimitiveKind::USize => Primitive::USize(
            usize::try_from(bits)
                .map_err(|_| BlobError::invalid_argument("usize", "value does not fit the host"))?,
        ),
        PrimitiveKind::F32 => Primitive::F32(f32::from_bits(bits as u32)),
        PrimitiveKind::F64 => Primitive::F64(f64::from_bits(bits)),
    })
}

fn encode_primitive(p: &Primitive, out: &mut Vec<u8>) {
    let width = p.kind().byte_size();
    out.extend_from_slice(&p.to_bits().to_le_bytes()[..width]);
}

/// Read a class record straight into a new object
pub fn read_object(
    registry: &TypeRegistry,
    layout: &RecordLayout,
    bytes: &[u8],
) -> BlobResult<GcRef> {
    match layout.read_record(registry, bytes)? {
        Value::Ref(obj) => Ok(obj),
        other => Err(CloneError::type_mismatch("object", other.kind_name()).into()),
    }
}

/// Read a struct record straight into a struct value
pub fn read_struct(
    registry: &TypeRegistry,
    layout: &RecordLayout,
    bytes: &[u8],
) -> BlobResult<StructValue> {
    match layout.read_record(registry, bytes)? {
        Value::Struct(s) => Ok(s),
        other => Err(CloneError::type_mismatch("struct", other.kind_name()).into()),
    }
}
