//! Shallow duplication
//!
//! Produces a new object of the same concrete type whose slots (or elements)
//! hold the same values as the source. No initialization runs, and child
//! references still point at the source's children.

use crate::error::{CloneError, CloneResult};
use crate::object::{ArrayData, GcRef, HeapData};
use crate::types::TypeRegistry;

/// Duplicate `obj` one level deep
pub fn shallow_duplicate(registry: &TypeRegistry, obj: &GcRef) -> CloneResult<GcRef> {
    let ty = obj.type_id();
    let info = registry.get(ty)?;

    match obj.data() {
        HeapData::Instance(_) => {
            let slots = obj.slots();
            if slots.len() != info.instance_slots() {
                return Err(CloneError::introspection(
                    info.name(),
                    format!(
                        "slot count {} does not match layout {}",
                        slots.len(),
                        info.instance_slots()
                    ),
                ));
            }
            Ok(registry.heap().track(GcRef::instance(ty, slots)))
        }
        HeapData::Array(array) => {
            let Some((element, rank)) = info.array_shape() else {
                return Err(CloneError::introspection(info.name(), "not an array type"));
            };
            if array.element_type() != element || array.rank() != rank {
                return Err(CloneError::introspection(
                    info.name(),
                    format!(
                        "array storage is {}[rank {}]",
                        registry.name(array.element_type()),
                        array.rank()
                    ),
                ));
            }
            let elements = array.to_vec();
            let expected = array.lengths().iter().try_fold(1usize, |acc, &len| acc.checked_mul(len));
            if expected != Some(elements.len()) {
                return Err(CloneError::introspection(
                    info.name(),
                    format!(
                        "{} elements do not fill lengths {:?}",
                        elements.len(),
                        array.lengths()
                    ),
                ));
            }
            let data = ArrayData::new(element, array.lengths().into(), elements);
            Ok(registry.heap().track(GcRef::array(ty, data)))
        }
        HeapData::Delegate(delegate) => Ok(registry.heap().track(GcRef::delegate(
            ty,
            delegate.target().clone(),
            delegate.callable().clone(),
        ))),
    }
}
