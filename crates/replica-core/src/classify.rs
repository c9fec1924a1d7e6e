//! Atomic/composite classification of runtime types

use crate::error::CloneResult;
use crate::types::{TypeId, TypeKind, TypeRegistry};

/// How the clone engine treats values of a type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    /// Copied by value, never traversed (strings and primitives)
    Atomic,
    /// Requires structural duplication
    Composite,
}

impl Classification {
    /// Check if atomic
    pub fn is_atomic(self) -> bool {
        matches!(self, Classification::Atomic)
    }

    /// Check if composite
    pub fn is_composite(self) -> bool {
        matches!(self, Classification::Composite)
    }
}

/// Classify a type by its kind
///
/// Interfaces, abstract classes and `Object` are composite: a slot declared
/// with one of them may hold any composite value at runtime.
pub fn classify(registry: &TypeRegistry, ty: TypeId) -> CloneResult<Classification> {
    Ok(match registry.get(ty)?.kind() {
        TypeKind::Primitive(_) | TypeKind::String => Classification::Atomic,
        TypeKind::Class { .. }
        | TypeKind::Interface
        | TypeKind::Struct
        | TypeKind::Array { .. }
        | TypeKind::Delegate => Classification::Composite,
    })
}
