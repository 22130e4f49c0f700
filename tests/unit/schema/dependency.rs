use super::*;
use crate::descriptor;

fn layered() -> DependencyGraph {
    let mut g = DependencyGraph::new();
    g.assign("field", "layer", vec![Value::from("slice")]);
    g
}

#[test]
fn dependent_unlocks_only_for_allowed_controller_values() {
    let g = layered();
    assert!(g.is_dependent("field"));
    assert!(!g.is_dependent("layer"));
    assert!(g.is_unlocked("field", &descriptor([("layer", "slice")])));
    assert!(!g.is_unlocked("field", &descriptor([("layer", "contour")])));
}

#[test]
fn missing_controller_keeps_dependent_locked() {
    let g = layered();
    assert!(!g.is_unlocked("field", &Descriptor::new()));
}

#[test]
fn multiple_controllers_combine_with_and() {
    let mut g = layered();
    g.assign("field", "time", vec![Value::Int(0), Value::Int(1)]);
    let both = descriptor([("layer", Value::from("slice")), ("time", Value::Int(1))]);
    let one = descriptor([("layer", Value::from("slice")), ("time", Value::Int(2))]);
    assert!(g.is_unlocked("field", &both));
    assert!(!g.is_unlocked("field", &one));
    assert_eq!(g.controllers("field").count(), 2);
}

#[test]
fn serializes_as_associations_object() {
    let g = layered();
    let json = serde_json::to_value(&g).unwrap();
    assert_eq!(json, serde_json::json!({"field": {"layer": ["slice"]}}));
    let back: DependencyGraph = serde_json::from_value(json).unwrap();
    assert_eq!(back, g);
}
