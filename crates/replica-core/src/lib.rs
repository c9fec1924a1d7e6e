//! # Replica Core
//!
//! Identity-preserving deep copy of object graphs whose structure is only
//! known at runtime.
//!
//! ## Design Principles
//!
//! - **Runtime types**: a [`TypeRegistry`] describes classes, structs, arrays
//!   and delegates; the clone engine discovers structure only through it
//! - **Identity**: heap objects are [`GcRef`] handles compared by address
//! - **Thread-safe**: values are `Send + Sync`
//! - **Topology-preserving**: cycles and shared references survive a clone
//! - **Collected**: objects are reference counted, and [`Heap::collect`]
//!   frees unreachable cycles

#![warn(clippy::all)]
#![warn(missing_docs)]

pub mod classify;
pub mod cloner;
pub mod compare;
pub mod config;
pub mod error;
pub mod fields;
pub mod heap;
pub mod managed;
pub mod object;
pub mod shallow;
pub mod traverse;
pub mod types;
pub mod value;
pub mod visited;

pub use classify::{Classification, classify};
pub use cloner::{
    CloneStats, DeepCloner, deep_clone, deep_clone_as, deep_clone_required, deep_clone_with,
};
pub use compare::structurally_equal;
pub use config::{CloneConfig, Strategy};
pub use error::{CloneError, CloneResult};
pub use heap::Heap;
pub use managed::Managed;
pub use object::{ArrayData, DelegateData, GcRef, NativeFn};
pub use types::{FieldInfo, PrimitiveKind, TypeId, TypeInfo, TypeKind, TypeRegistry, Visibility};
pub use value::{Primitive, StructValue, Value};
pub use visited::VisitedRegistry;
