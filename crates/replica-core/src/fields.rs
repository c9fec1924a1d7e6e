//! Instance field copying
//!
//! The copier walks the inheritance chain itself and asks each level for the
//! fields it declares. A per-type listing hides private fields declared on
//! ancestors, but those fields still occupy slots in the instance and must be
//! deep-copied too.

use crate::classify::classify;
use crate::error::{CloneError, CloneResult};
use crate::object::GcRef;
use crate::types::TypeRegistry;
use crate::value::{StructValue, Value};

/// Copy every composite-typed field of `original` into `clone` through
/// `clone_value`, returning the number of fields copied
///
/// Atomic-typed fields are skipped: the shallow duplicate already holds them.
pub fn copy_fields<F>(
    registry: &TypeRegistry,
    original: &GcRef,
    clone: &GcRef,
    mut clone_value: F,
) -> CloneResult<usize>
where
    F: FnMut(&Value) -> CloneResult<Value>,
{
    let mut copied = 0;
    for ty in registry.hierarchy(original.type_id())? {
        for field in registry.declared_fields(ty)? {
            if classify(registry, field.field_type())?.is_atomic() {
                continue;
            }
            let missing = || {
                CloneError::introspection(
                    registry.name(original.type_id()),
                    format!("slot {} of field `{}` is missing", field.slot(), field.name()),
                )
            };
            let value = original.slot(field.slot()).ok_or_else(missing)?;
            let cloned = clone_value(&value)?;
            if !clone.set_slot(field.slot(), cloned) {
                return Err(missing());
            }
            copied += 1;
        }
    }
    Ok(copied)
}

/// Copy every composite-typed field of a struct value in place
pub fn copy_struct_fields<F>(
    registry: &TypeRegistry,
    value: &mut StructValue,
    mut clone_value: F,
) -> CloneResult<usize>
where
    F: FnMut(&Value) -> CloneResult<Value>,
{
    let fields = registry.declared_fields(value.type_id())?;
    if fields.len() != value.fields().len() {
        return Err(CloneError::introspection(
            registry.name(value.type_id()),
            format!(
                "struct holds {} fields, layout declares {}",
                value.fields().len(),
                fields.len()
            ),
        ));
    }

    let mut copied = 0;
    for field in fields {
        if classify(registry, field.field_type())?.is_atomic() {
            continue;
        }
        let current = value.get(field.slot()).cloned().unwrap_or_default();
        let cloned = clone_value(&current)?;
        value.set(field.slot(), cloned);
        copied += 1;
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shallow::shallow_duplicate;
    use crate::types::{TypeId, Visibility};

    #[test]
    fn test_reaches_private_ancestor_fields() {
        let mut registry = TypeRegistry::new();
        let base = registry.declare_class("Base", None).unwrap();
        registry
            .add_field(base, "hidden", TypeId::OBJECT, Visibility::Private)
            .unwrap();
        registry
            .add_field(base, "label", TypeId::STRING, Visibility::Public)
            .unwrap();
        let derived = registry.declare_class("Derived", Some(base)).unwrap();
        registry
            .add_field(derived, "own", TypeId::OBJECT, Visibility::Public)
            .unwrap();

        let original = registry.new_object(derived).unwrap();
        let clone = shallow_duplicate(&registry, &original).unwrap();

        let mut seen = Vec::new();
        let copied = copy_fields(&registry, &original, &clone, |value| {
            seen.push(value.clone());
            Ok(Value::int32(seen.len() as i32))
        })
        .unwrap();

        // `label` is atomic; `own` then `hidden`, most derived level first
        assert_eq!(copied, 2);
        assert_eq!(registry.get_field(&clone, "own").unwrap().as_int32(), Some(1));
        assert_eq!(
            registry
                .get_declared_field(&clone, base, "hidden")
                .unwrap()
                .as_int32(),
            Some(2)
        );
    }

    #[test]
    fn test_struct_shape_mismatch() {
        let mut registry = TypeRegistry::new();
        let pair = registry.declare_struct("Pair").unwrap();
        registry
            .add_field(pair, "a", TypeId::OBJECT, Visibility::Public)
            .unwrap();
        let mut value = StructValue::new(pair, Vec::new());
        let err = copy_struct_fields(&registry, &mut value, |v| Ok(v.clone())).unwrap_err();
        assert!(matches!(err, CloneError::IntrospectionFailure { .. }));
    }
}
