//! Randomized graph properties
//!
//! Random graphs of `Node { value, left, right }` with arbitrary sharing and
//! cycles are cloned under both strategies.

use proptest::prelude::*;
use replica_core::{
    CloneConfig, DeepCloner, GcRef, PrimitiveKind, TypeId, TypeRegistry, Value, Visibility,
    structurally_equal,
};
use rustc_hash::FxHashSet;

fn node_registry() -> (TypeRegistry, TypeId) {
    let mut registry = TypeRegistry::new();
    let node = registry.declare_class("Node", None).unwrap();
    registry
        .add_field(
            node,
            "value",
            TypeId::primitive(PrimitiveKind::I32),
            Visibility::Public,
        )
        .unwrap();
    registry
        .add_field(node, "left", node, Visibility::Public)
        .unwrap();
    registry
        .add_field(node, "right", node, Visibility::Private)
        .unwrap();
    (registry, node)
}

type Spec = Vec<(i32, Option<usize>, Option<usize>)>;

fn build(registry: &TypeRegistry, node: TypeId, spec: &Spec) -> Vec<GcRef> {
    let nodes: Vec<_> = spec
        .iter()
        .map(|_| registry.new_object(node).unwrap())
        .collect();
    let link = |target: Option<usize>| match target {
        Some(i) => Value::object(nodes[i % nodes.len()].clone()),
        None => Value::Null,
    };
    for (obj, &(value, left, right)) in nodes.iter().zip(spec) {
        registry.set_field(obj, "value", Value::int32(value)).unwrap();
        registry.set_field(obj, "left", link(left)).unwrap();
        registry.set_field(obj, "right", link(right)).unwrap();
    }
    nodes
}

/// Every object reachable from `root`
fn reachable(registry: &TypeRegistry, root: &GcRef) -> Vec<GcRef> {
    let mut seen = FxHashSet::default();
    let mut found = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(obj) = stack.pop() {
        if !seen.insert(obj.addr()) {
            continue;
        }
        for name in ["left", "right"] {
            if let Some(child) = registry.get_field(&obj, name).unwrap().as_object() {
                stack.push(child.clone());
            }
        }
        found.push(obj);
    }
    found
}

fn graph_spec() -> impl Strategy<Value = Spec> {
    prop::collection::vec(
        (
            any::<i32>(),
            prop::option::of(0..32usize),
            prop::option::of(0..32usize),
        ),
        1..24,
    )
}

proptest! {
    #[test]
    fn prop_clone_is_structurally_equal_and_disjoint(spec in graph_spec()) {
        let (registry, node) = node_registry();
        let nodes = build(&registry, node, &spec);
        let root = Value::object(nodes[0].clone());
        let originals = reachable(&registry, &nodes[0]);
        let original_addrs: FxHashSet<_> = originals.iter().map(GcRef::addr).collect();

        let mut results = Vec::new();
        for config in [CloneConfig::recursive(), CloneConfig::worklist()] {
            let mut cloner = DeepCloner::new(&registry).with_config(config);
            let cloned = cloner.clone(&root).unwrap();
            prop_assert!(structurally_equal(&root, &cloned));
            prop_assert_eq!(cloner.stats().objects_duplicated, originals.len());

            let copies = reachable(&registry, cloned.as_object().unwrap());
            prop_assert_eq!(copies.len(), originals.len());
            prop_assert!(copies.iter().all(|c| !original_addrs.contains(&c.addr())));
            results.push((cloned, copies));
        }

        prop_assert!(structurally_equal(&results[0].0, &results[1].0));

        // Cloning a clone reproduces the same shape
        let again = DeepCloner::new(&registry).clone(&results[0].0).unwrap();
        prop_assert!(structurally_equal(&root, &again));

        drop((nodes, root, originals, results, again));
        registry.heap().collect();
        prop_assert_eq!(registry.heap().allocation_count(), 0);
    }

    #[test]
    fn prop_mutating_clone_leaves_source_intact(spec in graph_spec(), marker in any::<i32>()) {
        let (registry, node) = node_registry();
        let nodes = build(&registry, node, &spec);
        let root = Value::object(nodes[0].clone());
        let before: Vec<_> = nodes
            .iter()
            .map(|obj| registry.get_field(obj, "value").unwrap().as_int32())
            .collect();

        let mut cloner = DeepCloner::new(&registry);
        let snapshot = cloner.clone(&root).unwrap();
        let cloned = cloner.clone(&root).unwrap();
        let copies = reachable(&registry, cloned.as_object().unwrap());
        for copy in &copies {
            registry.set_field(copy, "value", Value::int32(marker)).unwrap();
            registry.set_field(copy, "left", Value::Null).unwrap();
        }

        let after: Vec<_> = nodes
            .iter()
            .map(|obj| registry.get_field(obj, "value").unwrap().as_int32())
            .collect();
        prop_assert_eq!(before, after);
        prop_assert!(structurally_equal(&root, &snapshot));

        drop((nodes, root, snapshot, cloned, copies));
        registry.heap().collect();
        prop_assert_eq!(registry.heap().allocation_count(), 0);
    }
}
