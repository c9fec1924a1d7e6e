//! Deep clone engine
//!
//! Duplicates a value and everything reachable from it, using the
//! [`TypeRegistry`] to discover structure at runtime.
//!
//! Key properties:
//! - Every distinct source object is duplicated at most once per call
//! - Cycles and shared references keep their topology in the clone
//! - Strings and primitives are copied by value and never traversed
//! - Delegates are not copied; they become `Null` in the clone
//!
//! A clone is registered in the identity map before its fields or elements
//! are visited, which is what lets a cycle resolve back to it.

use crate::classify::classify;
use crate::config::{CloneConfig, Strategy};
use crate::error::{CloneError, CloneResult};
use crate::fields::{copy_fields, copy_struct_fields};
use crate::managed::Managed;
use crate::object::GcRef;
use crate::shallow::shallow_duplicate;
use crate::traverse::traverse_array;
use crate::types::TypeRegistry;
use crate::value::{StructValue, Value};
use crate::visited::VisitedRegistry;

/// Counters for a single clone call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CloneStats {
    /// Objects and arrays shallow-duplicated
    pub objects_duplicated: usize,
    /// Arrays whose elements were traversed
    pub arrays_traversed: usize,
    /// Array elements visited
    pub elements_visited: usize,
    /// Composite fields copied (instances and structs)
    pub fields_copied: usize,
    /// Struct values duplicated
    pub structs_copied: usize,
    /// Delegates replaced by `Null`
    pub delegates_cleared: usize,
    /// References resolved through the identity map
    pub registry_hits: usize,
}

enum Resolved {
    /// Final value, nothing left to do
    Done(Value),
    /// Freshly duplicated and registered, fields not yet copied
    Fresh(GcRef, GcRef),
}

/// Deep clone engine
pub struct DeepCloner<'r> {
    registry: &'r TypeRegistry,
    config: CloneConfig,
    visited: VisitedRegistry,
    pending: Vec<(GcRef, GcRef)>,
    stats: CloneStats,
}

impl<'r> DeepCloner<'r> {
    /// Create a cloner over `registry` with the default configuration
    pub fn new(registry: &'r TypeRegistry) -> Self {
        Self {
            registry,
            config: CloneConfig::default(),
            visited: VisitedRegistry::new(),
            pending: Vec::new(),
            stats: CloneStats::default(),
        }
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: CloneConfig) -> Self {
        self.config = config;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &CloneConfig {
        &self.config
    }

    /// Counters of the most recent call to [`DeepCloner::clone`]
    pub fn stats(&self) -> &CloneStats {
        &self.stats
    }

    /// Deep-clone `value`
    ///
    /// Each call starts from an empty identity map, so two calls never share
    /// clones.
    pub fn clone(&mut self, value: &Value) -> CloneResult<Value> {
        self.visited = VisitedRegistry::with_capacity(self.config.initial_capacity);
        self.pending.clear();
        self.stats = CloneStats::default();

        tracing::debug!(
            target: "replica::clone",
            root = value.kind_name(),
            strategy = ?self.config.strategy,
            "deep clone starting"
        );

        let result = match self.config.strategy {
            Strategy::Recursive => self.clone_value(value),
            Strategy::Worklist => self.clone_worklist(value),
        };

        // Drop the pins on the source graph
        self.visited.clear();
        self.pending.clear();

        match &result {
            Ok(_) => tracing::debug!(
                target: "replica::clone",
                duplicated = self.stats.objects_duplicated,
                arrays = self.stats.arrays_traversed,
                elements = self.stats.elements_visited,
                fields = self.stats.fields_copied,
                structs = self.stats.structs_copied,
                delegates_cleared = self.stats.delegates_cleared,
                registry_hits = self.stats.registry_hits,
                "deep clone complete"
            ),
            Err(err) => tracing::debug!(
                target: "replica::clone",
                error = %err,
                duplicated = self.stats.objects_duplicated,
                "deep clone failed"
            ),
        }

        result
    }

    fn clone_value(&mut self, value: &Value) -> CloneResult<Value> {
        match self.resolve(value, Self::clone_value)? {
            Resolved::Done(value) => Ok(value),
            Resolved::Fresh(original, clone) => {
                self.populate(&original, &clone, Self::clone_value)?;
                Ok(Value::Ref(clone))
            }
        }
    }

    fn enqueue_value(&mut self, value: &Value) -> CloneResult<Value> {
        match self.resolve(value, Self::enqueue_value)? {
            Resolved::Done(value) => Ok(value),
            Resolved::Fresh(original, clone) => {
                self.pending.push((original, clone.clone()));
                Ok(Value::Ref(clone))
            }
        }
    }

    fn clone_worklist(&mut self, root: &Value) -> CloneResult<Value> {
        let result = self.enqueue_value(root)?;
        while let Some((original, clone)) = self.pending.pop() {
            self.populate(&original, &clone, Self::enqueue_value)?;
        }
        Ok(result)
    }

    fn resolve(
        &mut self,
        value: &Value,
        recurse: fn(&mut Self, &Value) -> CloneResult<Value>,
    ) -> CloneResult<Resolved> {
        let Some(ty) = value.type_id() else {
            return Ok(Resolved::Done(Value::Null));
        };
        if classify(self.registry, ty)?.is_atomic() {
            return Ok(Resolved::Done(value.clone()));
        }

        match value {
            Value::Struct(original) => {
                let copy = self.clone_struct(original, recurse)?;
                Ok(Resolved::Done(Value::Struct(copy)))
            }
            Value::Ref(obj) => {
                if let Some(clone) = self.visited.lookup(obj) {
                    self.stats.registry_hits += 1;
                    return Ok(Resolved::Done(Value::Ref(clone)));
                }
                if obj.is_delegate() {
                    self.stats.delegates_cleared += 1;
                    return Ok(Resolved::Done(Value::Null));
                }
                let clone = self.duplicate(obj)?;
                Ok(Resolved::Fresh(obj.clone(), clone))
            }
            Value::Null | Value::Primitive(_) | Value::String(_) => {
                Ok(Resolved::Done(value.clone()))
            }
        }
    }

    fn duplicate(&mut self, obj: &GcRef) -> CloneResult<GcRef> {
        let clone = shallow_duplicate(self.registry, obj)?;
        self.visited.register(obj, &clone);
        self.stats.objects_duplicated += 1;

        tracing::trace!(
            target: "replica::clone",
            ty = %self.registry.name(obj.type_id()),
            source = format_args!("{:#x}", obj.addr()),
            "duplicated object"
        );

        Ok(clone)
    }

    fn populate(
        &mut self,
        original: &GcRef,
        clone: &GcRef,
        recurse: fn(&mut Self, &Value) -> CloneResult<Value>,
    ) -> CloneResult<()> {
        if let Some(array) = clone.as_array() {
            if classify(self.registry, array.element_type())?.is_atomic() {
                return Ok(());
            }
            let visited = traverse_array(array, |element| recurse(self, element))?;
            self.stats.arrays_traversed += 1;
            self.stats.elements_visited += visited;
        } else {
            let registry = self.registry;
            let copied = copy_fields(registry, original, clone, |value| recurse(self, value))?;
            self.stats.fields_copied += copied;
        }
        Ok(())
    }

    fn clone_struct(
        &mut self,
        original: &StructValue,
        recurse: fn(&mut Self, &Value) -> CloneResult<Value>,
    ) -> CloneResult<StructValue> {
        let mut copy = original.clone();
        let registry = self.registry;
        let copied = copy_struct_fields(registry, &mut copy, |value| recurse(self, value))?;
        self.stats.structs_copied += 1;
        self.stats.fields_copied += copied;
        Ok(copy)
    }
}

/// Deep-clone a value with the default configuration
pub fn deep_clone(registry: &TypeRegistry, value: &Value) -> CloneResult<Value> {
    DeepCloner::new(registry).clone(value)
}

/// Deep-clone a value with an explicit configuration
pub fn deep_clone_with(
    registry: &TypeRegistry,
    value: &Value,
    config: CloneConfig,
) -> CloneResult<Value> {
    DeepCloner::new(registry).with_config(config).clone(value)
}

/// Deep-clone a value that must not be null
pub fn deep_clone_required(registry: &TypeRegistry, value: &Value) -> CloneResult<Value> {
    if value.is_null() {
        return Err(CloneError::null_argument("value"));
    }
    deep_clone(registry, value)
}

/// Deep-clone a typed value
///
/// ```
/// use replica_core::{TypeRegistry, deep_clone_as};
///
/// let registry = TypeRegistry::new();
/// let copy = deep_clone_as(&registry, &String::from("hello")).unwrap();
/// assert_eq!(copy, "hello");
/// ```
pub fn deep_clone_as<T: Managed>(registry: &TypeRegistry, value: &T) -> CloneResult<T> {
    T::from_value(deep_clone(registry, &value.to_value())?)
}
