//! Structural graph equivalence
//!
//! Two graphs are structurally equal when a one-to-one mapping between their
//! objects exists that preserves concrete types, atomic contents and every
//! edge. Identity never matters, only shape, so a graph is structurally equal
//! to its deep clone.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::object::GcRef;
use crate::value::Value;

#[derive(Default)]
struct Matcher {
    forward: FxHashMap<usize, usize>,
    reverse: FxHashMap<usize, usize>,
    pending: Vec<(GcRef, GcRef)>,
}

impl Matcher {
    fn values(&mut self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::Primitive(x), Value::Primitive(y)) => x.bit_eq(y),
            (Value::String(x), Value::String(y)) => x == y,
            (Value::Struct(x), Value::Struct(y)) => {
                x.type_id() == y.type_id()
                    && x.fields().len() == y.fields().len()
                    && x.fields()
                        .iter()
                        .zip(y.fields())
                        .all(|(fx, fy)| self.values(fx, fy))
            }
            (Value::Ref(x), Value::Ref(y)) => self.refs(x, y),
            _ => false,
        }
    }

    fn refs(&mut self, a: &GcRef, b: &GcRef) -> bool {
        let mapped = self.forward.get(&a.addr()).copied();
        match (mapped, self.reverse.contains_key(&b.addr())) {
            (Some(mapped), _) => mapped == b.addr(),
            (None, true) => false,
            (None, false) => {
                self.forward.insert(a.addr(), b.addr());
                self.reverse.insert(b.addr(), a.addr());
                self.pending.push((a.clone(), b.clone()));
                true
            }
        }
    }

    fn objects(&mut self, a: &GcRef, b: &GcRef) -> bool {
        if a.type_id() != b.type_id() {
            return false;
        }
        match (a.as_array(), b.as_array(), a.as_delegate(), b.as_delegate()) {
            (Some(x), Some(y), _, _) => {
                x.lengths() == y.lengths() && self.sequences(&x.to_vec(), &y.to_vec())
            }
            (None, None, Some(x), Some(y)) => {
                Arc::ptr_eq(x.callable(), y.callable()) && self.values(x.target(), y.target())
            }
            (None, None, None, None) => self.sequences(&a.slots(), &b.slots()),
            _ => false,
        }
    }

    fn sequences(&mut self, a: &[Value], b: &[Value]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| self.values(x, y))
    }
}

/// Check whether two graphs have the same shape and contents
pub fn structurally_equal(a: &Value, b: &Value) -> bool {
    let mut matcher = Matcher::default();
    if !matcher.values(a, b) {
        return false;
    }
    while let Some((x, y)) = matcher.pending.pop() {
        if !matcher.objects(&x, &y) {
            return false;
        }
    }
    true
}
