//! Heap objects with reference identity
//!
//! A [`GcRef`] is a shared handle; its allocation address is the object's
//! identity. Instance fields live in a slot vector laid out by the
//! [`TypeRegistry`], arrays keep their elements flattened in row-major order,
//! and delegates pair an optional target with a native callable.

use parking_lot::RwLock;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::error::{CloneError, CloneResult};
use crate::types::{FieldInfo, TypeId, TypeKind, TypeRegistry};
use crate::value::{Primitive, StructValue, Value};

/// Native callable behind a delegate
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// Storage of an array of any rank
pub struct ArrayData {
    element_type: TypeId,
    lengths: Box<[usize]>,
    elements: RwLock<Vec<Value>>,
}

impl ArrayData {
    pub(crate) fn new(element_type: TypeId, lengths: Box<[usize]>, elements: Vec<Value>) -> Self {
        Self {
            element_type,
            lengths,
            elements: RwLock::new(elements),
        }
    }

    /// Declared element type
    pub fn element_type(&self) -> TypeId {
        self.element_type
    }

    /// Number of axes
    pub fn rank(&self) -> usize {
        self.lengths.len()
    }

    /// Per-axis lengths
    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    /// Total element count
    pub fn len(&self) -> usize {
        self.elements.read().len()
    }

    /// Check if any axis has length zero
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row-major position of a coordinate, `None` if out of bounds
    pub fn linear_index(&self, coords: &[usize]) -> Option<usize> {
        if coords.len() != self.lengths.len() {
            return None;
        }
        let mut index = 0usize;
        for (&coord, &length) in coords.iter().zip(self.lengths.iter()) {
            if coord >= length {
                return None;
            }
            index = index * length + coord;
        }
        Some(index)
    }

    /// Read the element at a coordinate
    pub fn get(&self, coords: &[usize]) -> Option<Value> {
        let index = self.linear_index(coords)?;
        self.get_linear(index)
    }

    /// Write the element at a coordinate; false if out of bounds
    pub fn set(&self, coords: &[usize], value: Value) -> bool {
        match self.linear_index(coords) {
            Some(index) => self.set_linear(index, value),
            None => false,
        }
    }

    /// Read by row-major position
    pub fn get_linear(&self, index: usize) -> Option<Value> {
        self.elements.read().get(index).cloned()
    }

    /// Write by row-major position; false if out of bounds
    pub fn set_linear(&self, index: usize, value: Value) -> bool {
        match self.elements.write().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Snapshot of all elements in row-major order
    pub fn to_vec(&self) -> Vec<Value> {
        self.elements.read().clone()
    }
}

/// A function reference
pub struct DelegateData {
    target: Value,
    callable: NativeFn,
}

impl DelegateData {
    /// Bound target, `Null` for unbound delegates
    pub fn target(&self) -> &Value {
        &self.target
    }

    /// Underlying callable
    pub fn callable(&self) -> &NativeFn {
        &self.callable
    }

    /// Call the delegate
    pub fn invoke(&self, args: &[Value]) -> Value {
        (self.callable)(args)
    }
}

pub(crate) enum HeapData {
    Instance(RwLock<Vec<Value>>),
    Array(ArrayData),
    Delegate(DelegateData),
}

impl HeapData {
    fn take_values(&mut self) -> Vec<Value> {
        match self {
            HeapData::Instance(slots) => std::mem::take(slots.get_mut()),
            HeapData::Array(array) => std::mem::take(array.elements.get_mut()),
            HeapData::Delegate(delegate) => {
                vec![std::mem::replace(&mut delegate.target, Value::Null)]
            }
        }
    }
}

pub(crate) struct HeapObject {
    type_id: TypeId,
    data: HeapData,
}

impl Drop for HeapObject {
    // Children whose last handle lives here are emptied in a loop, so long
    // chains do not recurse one frame per link
    fn drop(&mut self) {
        let mut pending = self.data.take_values();
        while let Some(value) = pending.pop() {
            match value {
                Value::Ref(GcRef(child)) => {
                    if let Some(mut child) = Arc::into_inner(child) {
                        pending.extend(child.data.take_values());
                    }
                }
                Value::Struct(fields) => pending.extend(fields.into_fields()),
                _ => {}
            }
        }
    }
}

/// Non-owning handle used by the heap to track allocations
pub(crate) struct WeakRef(Weak<HeapObject>);

impl WeakRef {
    pub(crate) fn upgrade(&self) -> Option<GcRef> {
        self.0.upgrade().map(GcRef)
    }

    pub(crate) fn is_live(&self) -> bool {
        self.0.strong_count() > 0
    }
}

/// Handle to a heap object
///
/// Cloning the handle shares the object; [`GcRef::ptr_eq`] compares identity.
/// Objects are reference counted: a cycle outlives its last outside handle
/// until [`crate::Heap::collect`] runs on the allocating registry's heap.
#[derive(Clone)]
pub struct GcRef(Arc<HeapObject>);

impl GcRef {
    fn new(type_id: TypeId, data: HeapData) -> Self {
        Self(Arc::new(HeapObject { type_id, data }))
    }

    pub(crate) fn instance(type_id: TypeId, slots: Vec<Value>) -> Self {
        Self::new(type_id, HeapData::Instance(RwLock::new(slots)))
    }

    pub(crate) fn array(type_id: TypeId, data: ArrayData) -> Self {
        Self::new(type_id, HeapData::Array(data))
    }

    pub(crate) fn delegate(type_id: TypeId, target: Value, callable: NativeFn) -> Self {
        Self::new(type_id, HeapData::Delegate(DelegateData { target, callable }))
    }

    pub(crate) fn data(&self) -> &HeapData {
        &self.0.data
    }

    pub(crate) fn downgrade(&self) -> WeakRef {
        WeakRef(Arc::downgrade(&self.0))
    }

    /// Number of handles sharing this object
    pub(crate) fn handle_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    /// Objects referenced directly from slots, elements, nested structs or a
    /// delegate target
    pub(crate) fn children(&self) -> Vec<GcRef> {
        let mut out = Vec::new();
        match &self.0.data {
            HeapData::Instance(slots) => slots.read().iter().for_each(|v| push_refs(v, &mut out)),
            HeapData::Array(array) => array
                .elements
                .read()
                .iter()
                .for_each(|v| push_refs(v, &mut out)),
            HeapData::Delegate(delegate) => push_refs(&delegate.target, &mut out),
        }
        out
    }

    /// Reset every slot or element to `Null`, handing back the old values
    ///
    /// Delegate targets are immutable and stay in place.
    pub(crate) fn release(&self) -> Vec<Value> {
        match &self.0.data {
            HeapData::Instance(slots) => {
                let mut slots = slots.write();
                let count = slots.len();
                std::mem::replace(&mut *slots, vec![Value::Null; count])
            }
            HeapData::Array(array) => {
                let mut elements = array.elements.write();
                let count = elements.len();
                std::mem::replace(&mut *elements, vec![Value::Null; count])
            }
            HeapData::Delegate(_) => Vec::new(),
        }
    }

    /// Concrete runtime type
    pub fn type_id(&self) -> TypeId {
        self.0.type_id
    }

    /// Allocation address, the object's identity
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Check if both handles refer to the same object
    pub fn ptr_eq(a: &GcRef, b: &GcRef) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Array storage, for arrays
    pub fn as_array(&self) -> Option<&ArrayData> {
        match &self.0.data {
            HeapData::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Delegate data, for delegates
    pub fn as_delegate(&self) -> Option<&DelegateData> {
        match &self.0.data {
            HeapData::Delegate(delegate) => Some(delegate),
            _ => None,
        }
    }

    /// Check if this is a delegate
    pub fn is_delegate(&self) -> bool {
        matches!(self.0.data, HeapData::Delegate(_))
    }

    /// Number of instance slots (0 for arrays and delegates)
    pub fn slot_count(&self) -> usize {
        match &self.0.data {
            HeapData::Instance(slots) => slots.read().len(),
            _ => 0,
        }
    }

    /// Read an instance slot
    pub fn slot(&self, index: usize) -> Option<Value> {
        match &self.0.data {
            HeapData::Instance(slots) => slots.read().get(index).cloned(),
            _ => None,
        }
    }

    /// Write an instance slot without type checks; false if out of range
    pub fn set_slot(&self, index: usize, value: Value) -> bool {
        match &self.0.data {
            HeapData::Instance(slots) => match slots.write().get_mut(index) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    /// Snapshot of all instance slots
    pub fn slots(&self) -> Vec<Value> {
        match &self.0.data {
            HeapData::Instance(slots) => slots.read().clone(),
            _ => Vec::new(),
        }
    }
}

fn push_refs(value: &Value, out: &mut Vec<GcRef>) {
    match value {
        Value::Ref(obj) => out.push(obj.clone()),
        Value::Struct(fields) => fields.fields().iter().for_each(|v| push_refs(v, out)),
        _ => {}
    }
}

impl fmt::Debug for GcRef {
    // Never recurses into slots: graphs may be cyclic
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.0.data {
            HeapData::Instance(_) => "instance",
            HeapData::Array(_) => "array",
            HeapData::Delegate(_) => "delegate",
        };
        f.debug_struct("GcRef")
            .field("type", &self.type_id())
            .field("kind", &kind)
            .field("addr", &format_args!("{:#x}", self.addr()))
            .finish()
    }
}

impl TypeRegistry {
    /// Default value of a slot declared as `ty`
    pub fn default_value(&self, ty: TypeId) -> CloneResult<Value> {
        Ok(match self.get(ty)?.kind() {
            TypeKind::Primitive(kind) => Value::Primitive(Primitive::zero(kind)),
            TypeKind::Struct => Value::Struct(self.new_struct(ty)?),
            _ => Value::Null,
        })
    }

    /// Allocate a class instance with every slot at its default value
    pub fn new_object(&self, class: TypeId) -> CloneResult<GcRef> {
        let info = self.get(class)?;
        if !info.is_class() || info.is_abstract() {
            return Err(CloneError::invalid_definition(format!(
                "`{}` cannot be instantiated",
                info.name()
            )));
        }
        info.seal();

        let mut slots = Vec::with_capacity(info.instance_slots());
        for ty in self.hierarchy(class)?.into_iter().rev() {
            for field in self.get(ty)?.declared_fields() {
                slots.push(self.default_value(field.field_type())?);
            }
        }
        Ok(self.heap().track(GcRef::instance(class, slots)))
    }

    /// Create a struct value with every field at its default value
    pub fn new_struct(&self, ty: TypeId) -> CloneResult<StructValue> {
        let info = self.get(ty)?;
        if !info.is_struct() {
            return Err(CloneError::invalid_definition(format!(
                "`{}` is not a struct",
                info.name()
            )));
        }
        info.seal();

        let fields = info
            .declared_fields()
            .iter()
            .map(|field| self.default_value(field.field_type()))
            .collect::<CloneResult<Vec<_>>>()?;
        Ok(StructValue::new(ty, fields))
    }

    /// Allocate an array of `array_type` with the given per-axis lengths
    pub fn new_array(&self, array_type: TypeId, lengths: &[usize]) -> CloneResult<GcRef> {
        let info = self.get(array_type)?;
        let Some((element, rank)) = info.array_shape() else {
            return Err(CloneError::invalid_definition(format!(
                "`{}` is not an array type",
                info.name()
            )));
        };
        if lengths.len() != rank {
            return Err(CloneError::invalid_definition(format!(
                "`{}` needs {} lengths, got {}",
                info.name(),
                rank,
                lengths.len()
            )));
        }
        let count = lengths
            .iter()
            .try_fold(1usize, |acc, &len| acc.checked_mul(len))
            .ok_or_else(|| {
                CloneError::invalid_definition(format!("`{}` length overflows", info.name()))
            })?;

        let fill = self.default_value(element)?;
        let data = ArrayData::new(element, lengths.into(), vec![fill; count]);
        Ok(self.heap().track(GcRef::array(array_type, data)))
    }

    /// Allocate a delegate of `delegate_type`
    pub fn new_delegate<F>(&self, delegate_type: TypeId, target: Value, f: F) -> CloneResult<GcRef>
    where
        F: Fn(&[Value]) -> Value + Send + Sync + 'static,
    {
        let info = self.get(delegate_type)?;
        if !info.is_delegate() {
            return Err(CloneError::invalid_definition(format!(
                "`{}` is not a delegate type",
                info.name()
            )));
        }
        Ok(self
            .heap()
            .track(GcRef::delegate(delegate_type, target, Arc::new(f))))
    }

    /// Read a field by name, most specific declaration first
    pub fn get_field(&self, obj: &GcRef, name: &str) -> CloneResult<Value> {
        let field = self.find_field(obj.type_id(), name)?;
        self.read_slot(obj, field)
    }

    /// Write a field by name, most specific declaration first
    pub fn set_field(&self, obj: &GcRef, name: &str, value: Value) -> CloneResult<()> {
        let field = self.find_field(obj.type_id(), name)?;
        self.write_slot(obj, field, value)
    }

    /// Read a field declared on exactly `declaring`, which must be in the
    /// object's hierarchy
    pub fn get_declared_field(
        &self,
        obj: &GcRef,
        declaring: TypeId,
        name: &str,
    ) -> CloneResult<Value> {
        let field = self.declared_field_of(obj, declaring, name)?;
        self.read_slot(obj, field)
    }

    /// Write a field declared on exactly `declaring`
    pub fn set_declared_field(
        &self,
        obj: &GcRef,
        declaring: TypeId,
        name: &str,
        value: Value,
    ) -> CloneResult<()> {
        let field = self.declared_field_of(obj, declaring, name)?;
        self.write_slot(obj, field, value)
    }

    /// Read a struct field by name
    pub fn struct_field(&self, value: &StructValue, name: &str) -> CloneResult<Value> {
        let field = self.find_declared_field(value.type_id(), name)?;
        value.get(field.slot()).cloned().ok_or_else(|| {
            CloneError::introspection(
                self.name(value.type_id()),
                format!("field `{}` is missing", field.name()),
            )
        })
    }

    /// Write a struct field by name
    pub fn set_struct_field(
        &self,
        value: &mut StructValue,
        name: &str,
        field_value: Value,
    ) -> CloneResult<()> {
        let field = self.find_declared_field(value.type_id(), name)?;
        if !self.is_assignable(&field_value, field.field_type())? {
            return Err(CloneError::type_mismatch(
                self.name(field.field_type()),
                field_value.kind_name(),
            ));
        }
        if value.set(field.slot(), field_value) {
            Ok(())
        } else {
            Err(CloneError::introspection(
                self.name(value.type_id()),
                format!("field `{}` is missing", field.name()),
            ))
        }
    }

    fn declared_field_of(
        &self,
        obj: &GcRef,
        declaring: TypeId,
        name: &str,
    ) -> CloneResult<&FieldInfo> {
        if !self.is_subclass_of(obj.type_id(), declaring)? {
            return Err(CloneError::field_not_found(self.name(obj.type_id()), name));
        }
        self.find_declared_field(declaring, name)
    }

    fn read_slot(&self, obj: &GcRef, field: &FieldInfo) -> CloneResult<Value> {
        obj.slot(field.slot()).ok_or_else(|| {
            CloneError::introspection(
                self.name(obj.type_id()),
                format!("slot {} of field `{}` is missing", field.slot(), field.name()),
            )
        })
    }

    fn write_slot(&self, obj: &GcRef, field: &FieldInfo, value: Value) -> CloneResult<()> {
        if !self.is_assignable(&value, field.field_type())? {
            return Err(CloneError::type_mismatch(
                self.name(field.field_type()),
                value.kind_name(),
            ));
        }
        if obj.set_slot(field.slot(), value) {
            Ok(())
        } else {
            Err(CloneError::introspection(
                self.name(obj.type_id()),
                format!("slot {} of field `{}` is missing", field.slot(), field.name()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PrimitiveKind, Visibility};

    const I32: TypeId = TypeId::primitive(PrimitiveKind::I32);

    #[test]
    fn test_new_object_defaults() {
        let mut registry = TypeRegistry::new();
        let point = registry.declare_struct("Point").unwrap();
        registry.add_field(point, "x", I32, Visibility::Public).unwrap();
        let node = registry.declare_class("Node", None).unwrap();
        registry.add_field(node, "id", I32, Visibility::Public).unwrap();
        registry.add_field(node, "at", point, Visibility::Public).unwrap();
        registry.add_field(node, "next", node, Visibility::Public).unwrap();

        let obj = registry.new_object(node).unwrap();
        assert_eq!(obj.slot_count(), 3);
        assert_eq!(registry.get_field(&obj, "id").unwrap().as_int32(), Some(0));
        assert!(registry.get_field(&obj, "next").unwrap().is_null());
        let at = registry.get_field(&obj, "at").unwrap();
        assert_eq!(at.as_struct().unwrap().type_id(), point);
    }

    #[test]
    fn test_abstract_class_cannot_be_instantiated() {
        let mut registry = TypeRegistry::new();
        let shape = registry.declare_abstract_class("Shape", None).unwrap();
        assert!(registry.new_object(shape).is_err());
        assert!(registry.new_object(TypeId::STRING).is_err());
    }

    #[test]
    fn test_set_field_checks_type() {
        let mut registry = TypeRegistry::new();
        let node = registry.declare_class("Node", None).unwrap();
        registry.add_field(node, "id", I32, Visibility::Public).unwrap();
        let obj = registry.new_object(node).unwrap();

        registry.set_field(&obj, "id", Value::int32(9)).unwrap();
        let err = registry
            .set_field(&obj, "id", Value::string("nine"))
            .unwrap_err();
        assert!(matches!(err, CloneError::TypeMismatch { .. }));
        let err = registry.get_field(&obj, "nope").unwrap_err();
        assert!(matches!(err, CloneError::FieldNotFound { .. }));
    }

    #[test]
    fn test_shadowed_private_field_reached_by_declaring_type() {
        let mut registry = TypeRegistry::new();
        let base = registry.declare_class("Base", None).unwrap();
        registry
            .add_field(base, "tag", TypeId::STRING, Visibility::Private)
            .unwrap();
        let derived = registry.declare_class("Derived", Some(base)).unwrap();
        registry
            .add_field(derived, "tag", TypeId::STRING, Visibility::Private)
            .unwrap();

        let obj = registry.new_object(derived).unwrap();
        registry
            .set_declared_field(&obj, base, "tag", Value::string("base"))
            .unwrap();
        registry
            .set_field(&obj, "tag", Value::string("derived"))
            .unwrap();

        assert_eq!(
            registry
                .get_declared_field(&obj, base, "tag")
                .unwrap()
                .as_str(),
            Some("base")
        );
        assert_eq!(
            registry.get_field(&obj, "tag").unwrap().as_str(),
            Some("derived")
        );
    }

    #[test]
    fn test_array_coordinates_are_row_major() {
        let mut registry = TypeRegistry::new();
        let grid_type = registry.array_type(I32, 2).unwrap();
        let grid = registry.new_array(grid_type, &[2, 3]).unwrap();
        let array = grid.as_array().unwrap();

        assert_eq!(array.len(), 6);
        assert_eq!(array.linear_index(&[1, 0]), Some(3));
        assert_eq!(array.linear_index(&[0, 3]), None);
        assert_eq!(array.linear_index(&[0]), None);
        assert!(array.set(&[1, 2], Value::int32(7)));
        assert_eq!(array.get_linear(5).and_then(|v| v.as_int32()), Some(7));
        assert!(registry.new_array(grid_type, &[2]).is_err());
        assert!(registry.new_array(grid_type, &[usize::MAX, 2]).is_err());
    }

    #[test]
    fn test_delegate_invoke() {
        let registry = TypeRegistry::new();
        let delegate = registry
            .new_delegate(TypeId::DELEGATE, Value::Null, |args: &[Value]| {
                Value::int32(args.len() as i32)
            })
            .unwrap();
        let data = delegate.as_delegate().unwrap();
        assert_eq!(
            data.invoke(&[Value::Null, Value::Null]).as_int32(),
            Some(2)
        );
        assert!(delegate.is_delegate());
    }

    #[test]
    fn test_identity() {
        let registry = TypeRegistry::new();
        let a = registry.new_object(TypeId::OBJECT).unwrap();
        let b = registry.new_object(TypeId::OBJECT).unwrap();
        let a2 = a.clone();
        assert!(GcRef::ptr_eq(&a, &a2));
        assert!(!GcRef::ptr_eq(&a, &b));
        assert_eq!(a.addr(), a2.addr());
    }

    #[test]
    fn test_handles_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<GcRef>();
        assert_send_sync::<Value>();
    }
}
