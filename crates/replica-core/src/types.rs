//! Runtime type descriptors
//!
//! The registry is the clone engine's only window into a value's structure.
//! It knows each type's kind, the fields each type declares, where those
//! fields live in an instance's slot vector, and how types relate through
//! inheritance.
//!
//! ## Slot layout
//!
//! A derived class's slots start where its base class's slots end, so an
//! instance physically carries the fields of all its ancestors, private ones
//! included. Once a class has been derived from or instantiated its layout is
//! sealed and no further fields may be added.

use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{CloneError, CloneResult};
use crate::heap::Heap;
use crate::value::Value;

/// Handle to a type registered in a [`TypeRegistry`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    /// Root of the class hierarchy
    pub const OBJECT: TypeId = TypeId(0);
    /// Immutable text
    pub const STRING: TypeId = TypeId(1);
    /// Root delegate type
    pub const DELEGATE: TypeId = TypeId(2);

    const FIRST_PRIMITIVE: u32 = 3;

    /// Built-in id of a primitive kind
    pub const fn primitive(kind: PrimitiveKind) -> Self {
        Self(Self::FIRST_PRIMITIVE + kind as u32)
    }

    /// Index into the registry's type table
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Value types the host treats as primitive
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// `bool`
    Bool,
    /// `char`
    Char,
    /// `i8`
    I8,
    /// `u8`
    U8,
    /// `i16`
    I16,
    /// `u16`
    U16,
    /// `i32`
    I32,
    /// `u32`
    U32,
    /// `i64`
    I64,
    /// `u64`
    U64,
    /// `isize`
    ISize,
    /// `usize`
    USize,
    /// `f32`
    F32,
    /// `f64`
    F64,
}

impl PrimitiveKind {
    /// Every primitive kind, in id order
    pub const ALL: [PrimitiveKind; 14] = [
        PrimitiveKind::Bool,
        PrimitiveKind::Char,
        PrimitiveKind::I8,
        PrimitiveKind::U8,
        PrimitiveKind::I16,
        PrimitiveKind::U16,
        PrimitiveKind::I32,
        PrimitiveKind::U32,
        PrimitiveKind::I64,
        PrimitiveKind::U64,
        PrimitiveKind::ISize,
        PrimitiveKind::USize,
        PrimitiveKind::F32,
        PrimitiveKind::F64,
    ];

    /// Registered type name
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Char => "char",
            PrimitiveKind::I8 => "i8",
            PrimitiveKind::U8 => "u8",
            PrimitiveKind::I16 => "i16",
            PrimitiveKind::U16 => "u16",
            PrimitiveKind::I32 => "i32",
            PrimitiveKind::U32 => "u32",
            PrimitiveKind::I64 => "i64",
            PrimitiveKind::U64 => "u64",
            PrimitiveKind::ISize => "isize",
            PrimitiveKind::USize => "usize",
            PrimitiveKind::F32 => "f32",
            PrimitiveKind::F64 => "f64",
        }
    }

    /// Packed size in bytes; pointer-sized kinds are always 8
    pub const fn byte_size(self) -> usize {
        match self {
            PrimitiveKind::Bool | PrimitiveKind::I8 | PrimitiveKind::U8 => 1,
            PrimitiveKind::I16 | PrimitiveKind::U16 => 2,
            PrimitiveKind::Char | PrimitiveKind::I32 | PrimitiveKind::U32 | PrimitiveKind::F32 => 4,
            PrimitiveKind::I64
            | PrimitiveKind::U64
            | PrimitiveKind::ISize
            | PrimitiveKind::USize
            | PrimitiveKind::F64 => 8,
        }
    }
}

/// Field accessibility
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    /// Visible everywhere
    Public,
    /// Visible to derived types
    Protected,
    /// Visible inside the defining unit
    Internal,
    /// Visible only to the declaring type
    Private,
}

impl Visibility {
    /// Check if the field is hidden from derived types
    pub fn is_private(self) -> bool {
        matches!(self, Visibility::Private)
    }
}

/// Field descriptor
#[derive(Clone, Debug)]
pub struct FieldInfo {
    name: Arc<str>,
    declaring_type: TypeId,
    field_type: TypeId,
    visibility: Visibility,
    slot: usize,
}

impl FieldInfo {
    /// Field name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type that declares the field
    pub fn declaring_type(&self) -> TypeId {
        self.declaring_type
    }

    /// Declared type of the field
    pub fn field_type(&self) -> TypeId {
        self.field_type
    }

    /// Field accessibility
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    /// Storage slot in an instance (class) or field index (struct)
    pub fn slot(&self) -> usize {
        self.slot
    }
}

/// What kind of type a [`TypeInfo`] describes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeKind {
    /// Primitive value type
    Primitive(PrimitiveKind),
    /// Immutable text
    String,
    /// Reference type with single inheritance
    Class {
        /// Base class; `None` only for the root `Object`
        base: Option<TypeId>,
        /// Abstract classes cannot be instantiated
        is_abstract: bool,
    },
    /// Interface, usable as a field type only
    Interface,
    /// Non-primitive value type
    Struct,
    /// Array of any rank
    Array {
        /// Element type
        element: TypeId,
        /// Number of axes
        rank: usize,
    },
    /// Function reference
    Delegate,
}

/// A registered type
#[derive(Debug)]
pub struct TypeInfo {
    id: TypeId,
    name: Arc<str>,
    kind: TypeKind,
    fields: Vec<FieldInfo>,
    interfaces: Vec<TypeId>,
    first_slot: usize,
    sealed: AtomicBool,
}

impl TypeInfo {
    /// Type handle
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Type kind
    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Fields declared by this type itself, in slot order
    pub fn declared_fields(&self) -> &[FieldInfo] {
        &self.fields
    }

    /// Interfaces this type implements directly
    pub fn interfaces(&self) -> &[TypeId] {
        &self.interfaces
    }

    /// Base class, for classes other than `Object`
    pub fn base(&self) -> Option<TypeId> {
        match self.kind {
            TypeKind::Class { base, .. } => base,
            _ => None,
        }
    }

    /// Total slots of an instance, ancestors included
    pub fn instance_slots(&self) -> usize {
        self.first_slot + self.fields.len()
    }

    /// Element type and rank, for array types
    pub fn array_shape(&self) -> Option<(TypeId, usize)> {
        match self.kind {
            TypeKind::Array { element, rank } => Some((element, rank)),
            _ => None,
        }
    }

    /// Check if this is a class type
    pub fn is_class(&self) -> bool {
        matches!(self.kind, TypeKind::Class { .. })
    }

    /// Check if this is a struct type
    pub fn is_struct(&self) -> bool {
        matches!(self.kind, TypeKind::Struct)
    }

    /// Check if this is a delegate type
    pub fn is_delegate(&self) -> bool {
        matches!(self.kind, TypeKind::Delegate)
    }

    /// Check if this type can never be instantiated directly
    pub fn is_abstract(&self) -> bool {
        matches!(
            self.kind,
            TypeKind::Class {
                is_abstract: true,
                ..
            } | TypeKind::Interface
        )
    }

    /// Check if the layout is frozen
    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    pub(crate) fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
    }
}

/// Table of every type values may carry at runtime
#[derive(Debug)]
pub struct TypeRegistry {
    types: Vec<TypeInfo>,
    by_name: FxHashMap<Arc<str>, TypeId>,
    arrays: FxHashMap<(TypeId, usize), TypeId>,
    heap: Heap,
}

impl TypeRegistry {
    /// Create a registry holding the built-in types
    pub fn new() -> Self {
        let mut registry = Self {
            types: Vec::new(),
            by_name: FxHashMap::default(),
            arrays: FxHashMap::default(),
            heap: Heap::new(),
        };

        let builtins = [
            (
                "Object",
                TypeKind::Class {
                    base: None,
                    is_abstract: false,
                },
            ),
            ("String", TypeKind::String),
            ("Delegate", TypeKind::Delegate),
        ]
        .into_iter()
        .chain(
            PrimitiveKind::ALL
                .into_iter()
                .map(|kind| (kind.name(), TypeKind::Primitive(kind))),
        );

        for (name, kind) in builtins {
            let info = registry.make(name, kind, 0);
            info.seal();
            registry.insert(info);
        }

        registry
    }

    /// Heap tracking every object allocated through this registry
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    fn make(&self, name: &str, kind: TypeKind, first_slot: usize) -> TypeInfo {
        TypeInfo {
            id: TypeId(self.types.len() as u32),
            name: Arc::from(name),
            kind,
            fields: Vec::new(),
            interfaces: Vec::new(),
            first_slot,
            sealed: AtomicBool::new(false),
        }
    }

    fn insert(&mut self, info: TypeInfo) -> TypeId {
        let id = info.id;
        self.by_name.insert(info.name.clone(), id);
        self.types.push(info);
        id
    }

    fn push(&mut self, name: &str, kind: TypeKind, first_slot: usize) -> CloneResult<TypeId> {
        if self.by_name.contains_key(name) {
            return Err(CloneError::invalid_definition(format!(
                "type `{}` is already registered",
                name
            )));
        }
        let info = self.make(name, kind, first_slot);
        Ok(self.insert(info))
    }

    /// Declare a concrete class; `None` derives from `Object`
    pub fn declare_class(&mut self, name: &str, base: Option<TypeId>) -> CloneResult<TypeId> {
        self.declare_class_with(name, base, false)
    }

    /// Declare an abstract class; `None` derives from `Object`
    pub fn declare_abstract_class(
        &mut self,
        name: &str,
        base: Option<TypeId>,
    ) -> CloneResult<TypeId> {
        self.declare_class_with(name, base, true)
    }

    fn declare_class_with(
        &mut self,
        name: &str,
        base: Option<TypeId>,
        is_abstract: bool,
    ) -> CloneResult<TypeId> {
        let base = base.unwrap_or(TypeId::OBJECT);
        let base_info = self.get(base)?;
        if !base_info.is_class() {
            return Err(CloneError::invalid_definition(format!(
                "`{}` cannot derive from non-class type `{}`",
                name,
                base_info.name()
            )));
        }
        let first_slot = base_info.instance_slots();
        base_info.seal();
        self.push(
            name,
            TypeKind::Class {
                base: Some(base),
                is_abstract,
            },
            first_slot,
        )
    }

    /// Declare an interface
    pub fn declare_interface(&mut self, name: &str) -> CloneResult<TypeId> {
        self.push(name, TypeKind::Interface, 0)
    }

    /// Declare a non-primitive value type
    pub fn declare_struct(&mut self, name: &str) -> CloneResult<TypeId> {
        self.push(name, TypeKind::Struct, 0)
    }

    /// Declare a delegate type
    pub fn declare_delegate(&mut self, name: &str) -> CloneResult<TypeId> {
        self.push(name, TypeKind::Delegate, 0)
    }

    /// Get or create the array type with the given element type and rank
    pub fn array_type(&mut self, element: TypeId, rank: usize) -> CloneResult<TypeId> {
        if rank == 0 {
            return Err(CloneError::invalid_definition("array rank must be at least 1"));
        }
        if let Some(id) = self.arrays.get(&(element, rank)) {
            return Ok(*id);
        }

        let name = format!("{}[{}]", self.get(element)?.name(), ",".repeat(rank - 1));
        let id = self.push(&name, TypeKind::Array { element, rank }, 0)?;
        self.types[id.index()].seal();
        self.arrays.insert((element, rank), id);
        Ok(id)
    }

    /// Record that `class` implements `interface`
    pub fn implement(&mut self, class: TypeId, interface: TypeId) -> CloneResult<()> {
        if !matches!(self.get(interface)?.kind(), TypeKind::Interface) {
            return Err(CloneError::invalid_definition(format!(
                "`{}` is not an interface",
                self.name(interface)
            )));
        }
        let info = self.get(class)?;
        if !info.is_class() {
            return Err(CloneError::invalid_definition(format!(
                "only classes implement interfaces, `{}` is not a class",
                info.name()
            )));
        }
        let interfaces = &mut self.types[class.index()].interfaces;
        if !interfaces.contains(&interface) {
            interfaces.push(interface);
        }
        Ok(())
    }

    /// Declare an instance field on a class or struct, returning its slot
    pub fn add_field(
        &mut self,
        owner: TypeId,
        name: &str,
        field_type: TypeId,
        visibility: Visibility,
    ) -> CloneResult<usize> {
        let field_is_struct = self.get(field_type)?.is_struct();
        let owner_info = self.get(owner)?;
        if !owner_info.is_class() && !owner_info.is_struct() {
            return Err(CloneError::invalid_definition(format!(
                "type `{}` cannot declare fields",
                owner_info.name()
            )));
        }
        if owner_info.is_sealed() {
            return Err(CloneError::invalid_definition(format!(
                "layout of `{}` is sealed",
                owner_info.name()
            )));
        }
        if owner_info.fields.iter().any(|f| f.name() == name) {
            return Err(CloneError::invalid_definition(format!(
                "`{}` already declares field `{}`",
                owner_info.name(),
                name
            )));
        }
        if owner_info.is_struct() && field_is_struct && self.struct_embeds(field_type, owner)? {
            return Err(CloneError::invalid_definition(format!(
                "struct `{}` cannot contain itself by value",
                owner_info.name()
            )));
        }

        let slot = owner_info.instance_slots();
        self.types[owner.index()].fields.push(FieldInfo {
            name: Arc::from(name),
            declaring_type: owner,
            field_type,
            visibility,
            slot,
        });
        Ok(slot)
    }

    fn struct_embeds(&self, ty: TypeId, target: TypeId) -> CloneResult<bool> {
        if ty == target {
            return Ok(true);
        }
        for field in self.get(ty)?.declared_fields() {
            if self.get(field.field_type)?.is_struct()
                && self.struct_embeds(field.field_type, target)?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Get a type descriptor
    pub fn get(&self, id: TypeId) -> CloneResult<&TypeInfo> {
        self.types
            .get(id.index())
            .ok_or_else(|| CloneError::introspection(id.to_string(), "type id is not registered"))
    }

    /// Find a type by name
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// Type name for diagnostics; unknown ids render as `#n`
    pub fn name(&self, id: TypeId) -> String {
        match self.types.get(id.index()) {
            Some(info) => info.name().to_string(),
            None => id.to_string(),
        }
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if the registry is empty (never true; built-ins are always present)
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Inheritance chain from `id` up to the root ancestor
    pub fn hierarchy(&self, id: TypeId) -> CloneResult<Vec<TypeId>> {
        let mut chain = vec![id];
        let mut current = self.get(id)?.base();
        while let Some(base) = current {
            chain.push(base);
            current = self.get(base)?.base();
        }
        Ok(chain)
    }

    /// Fields declared by `id` itself
    pub fn declared_fields(&self, id: TypeId) -> CloneResult<&[FieldInfo]> {
        Ok(self.get(id)?.declared_fields())
    }

    /// Fields reachable through `id`'s own listing: everything it declares plus
    /// the non-private fields of its ancestors
    pub fn visible_fields(&self, id: TypeId) -> CloneResult<Vec<&FieldInfo>> {
        let mut fields = Vec::new();
        for (depth, ty) in self.hierarchy(id)?.into_iter().enumerate() {
            fields.extend(
                self.get(ty)?
                    .declared_fields()
                    .iter()
                    .filter(|field| depth == 0 || !field.visibility().is_private()),
            );
        }
        Ok(fields)
    }

    /// Resolve a field by name, most specific declaration first
    pub fn find_field(&self, id: TypeId, name: &str) -> CloneResult<&FieldInfo> {
        for ty in self.hierarchy(id)? {
            if let Some(field) = self.get(ty)?.declared_fields().iter().find(|f| f.name() == name) {
                return Ok(field);
            }
        }
        Err(CloneError::field_not_found(self.name(id), name))
    }

    /// Resolve a field declared on exactly `declaring`
    pub fn find_declared_field(&self, declaring: TypeId, name: &str) -> CloneResult<&FieldInfo> {
        self.get(declaring)?
            .declared_fields()
            .iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| CloneError::field_not_found(self.name(declaring), name))
    }

    /// Check if `ty` is `ancestor` or derives from it
    pub fn is_subclass_of(&self, ty: TypeId, ancestor: TypeId) -> CloneResult<bool> {
        Ok(self.hierarchy(ty)?.contains(&ancestor))
    }

    /// Check if `ty` or one of its ancestors implements `interface`
    pub fn implements(&self, ty: TypeId, interface: TypeId) -> CloneResult<bool> {
        for ancestor in self.hierarchy(ty)? {
            if self.get(ancestor)?.interfaces().contains(&interface) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Check if `value` may be stored in a slot declared as `target`
    pub fn is_assignable(&self, value: &Value, target: TypeId) -> CloneResult<bool> {
        let target_info = self.get(target)?;
        if target == TypeId::OBJECT {
            return Ok(true);
        }
        let Some(source) = value.type_id() else {
            return Ok(!matches!(
                target_info.kind(),
                TypeKind::Primitive(_) | TypeKind::Struct
            ));
        };
        if source == target {
            return Ok(true);
        }
        match target_info.kind() {
            TypeKind::Class { .. } => self.is_subclass_of(source, target),
            TypeKind::Interface => self.implements(source, target),
            TypeKind::Delegate => Ok(target == TypeId::DELEGATE && self.get(source)?.is_delegate()),
            _ => Ok(false),
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_types() {
        let registry = TypeRegistry::new();
        assert_eq!(registry.lookup("Object"), Some(TypeId::OBJECT));
        assert_eq!(registry.lookup("String"), Some(TypeId::STRING));
        assert_eq!(
            registry.lookup("i32"),
            Some(TypeId::primitive(PrimitiveKind::I32))
        );
        assert_eq!(registry.len(), 3 + PrimitiveKind::ALL.len());
        assert!(registry.get(TypeId::OBJECT).unwrap().is_sealed());
    }

    #[test]
    fn test_derived_slots_follow_base_slots() {
        let mut registry = TypeRegistry::new();
        let base = registry.declare_class("Base", None).unwrap();
        assert_eq!(
            registry
                .add_field(base, "secret", TypeId::STRING, Visibility::Private)
                .unwrap(),
            0
        );
        assert_eq!(
            registry
                .add_field(base, "shared", TypeId::OBJECT, Visibility::Protected)
                .unwrap(),
            1
        );

        let derived = registry.declare_class("Derived", Some(base)).unwrap();
        assert_eq!(
            registry
                .add_field(derived, "own", TypeId::OBJECT, Visibility::Public)
                .unwrap(),
            2
        );
        assert_eq!(registry.get(derived).unwrap().instance_slots(), 3);
        assert_eq!(
            registry.hierarchy(derived).unwrap(),
            vec![derived, base, TypeId::OBJECT]
        );
    }

    #[test]
    fn test_visible_fields_hide_ancestor_privates() {
        let mut registry = TypeRegistry::new();
        let base = registry.declare_class("Base", None).unwrap();
        registry
            .add_field(base, "secret", TypeId::STRING, Visibility::Private)
            .unwrap();
        registry
            .add_field(base, "shared", TypeId::STRING, Visibility::Protected)
            .unwrap();
        let derived = registry.declare_class("Derived", Some(base)).unwrap();

        let names: Vec<_> = registry
            .visible_fields(derived)
            .unwrap()
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        assert_eq!(names, vec!["shared"]);

        // Name lookup still reaches the private declaration
        let field = registry.find_field(derived, "secret").unwrap();
        assert_eq!(field.declaring_type(), base);
    }

    #[test]
    fn test_layout_sealed_after_derivation() {
        let mut registry = TypeRegistry::new();
        let base = registry.declare_class("Base", None).unwrap();
        registry.declare_class("Derived", Some(base)).unwrap();
        let err = registry
            .add_field(base, "late", TypeId::OBJECT, Visibility::Public)
            .unwrap_err();
        assert!(matches!(err, CloneError::InvalidDefinition(_)));
    }

    #[test]
    fn test_struct_cannot_embed_itself() {
        let mut registry = TypeRegistry::new();
        let outer = registry.declare_struct("Outer").unwrap();
        let inner = registry.declare_struct("Inner").unwrap();
        registry
            .add_field(inner, "outer", outer, Visibility::Public)
            .unwrap();
        assert!(
            registry
                .add_field(outer, "inner", inner, Visibility::Public)
                .is_err()
        );
        assert!(
            registry
                .add_field(outer, "me", outer, Visibility::Public)
                .is_err()
        );
    }

    #[test]
    fn test_array_types_are_interned() {
        let mut registry = TypeRegistry::new();
        let grid = registry.array_type(TypeId::OBJECT, 2).unwrap();
        assert_eq!(registry.array_type(TypeId::OBJECT, 2).unwrap(), grid);
        assert_eq!(registry.name(grid), "Object[,]");
        assert_eq!(
            registry.get(grid).unwrap().array_shape(),
            Some((TypeId::OBJECT, 2))
        );
        assert!(registry.array_type(TypeId::OBJECT, 0).is_err());
    }

    #[test]
    fn test_is_assignable() {
        let mut registry = TypeRegistry::new();
        let shape = registry.declare_interface("IShape").unwrap();
        let base = registry.declare_abstract_class("Base", None).unwrap();
        let circle = registry.declare_class("Circle", Some(base)).unwrap();
        registry.implement(base, shape).unwrap();
        let circle_obj = registry.new_object(circle).unwrap();
        let value = Value::object(circle_obj);

        assert!(registry.is_assignable(&value, shape).unwrap());
        assert!(registry.is_assignable(&value, base).unwrap());
        assert!(registry.is_assignable(&value, TypeId::OBJECT).unwrap());
        assert!(!registry.is_assignable(&value, TypeId::STRING).unwrap());
        assert!(registry.is_assignable(&Value::Null, shape).unwrap());
        assert!(
            !registry
                .is_assignable(&Value::Null, TypeId::primitive(PrimitiveKind::I32))
                .unwrap()
        );
        assert!(
            registry
                .is_assignable(&Value::int32(1), TypeId::OBJECT)
                .unwrap()
        );
    }

    #[test]
    fn test_unknown_type_is_introspection_failure() {
        let registry = TypeRegistry::new();
        let err = registry.get(TypeId(999)).unwrap_err();
        assert!(matches!(err, CloneError::IntrospectionFailure { .. }));
        assert_eq!(registry.name(TypeId(999)), "#999");
    }
}
