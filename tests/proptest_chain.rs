//! Property-based tests for position chains.
//!
//! Chains are generated as root-first lists of (method, bci, marker) frames
//! over a small fixed set of methods, so collisions between independently
//! built chains are common. No receivers are generated.

use std::sync::LazyLock;

use inline_provenance::bytecode::NoBytecode;
use inline_provenance::meta::{MethodRef, Signature, TypeRef};
use inline_provenance::{Marker, SourcePosition};
use proptest::prelude::*;

// ============================================================================
// Helpers
// ============================================================================

static METHODS: LazyLock<Vec<MethodRef>> = LazyLock::new(|| {
    let ty = TypeRef::new("Lprop/Chain;");
    ["a", "b", "c", "d"]
        .iter()
        .map(|name| MethodRef::new(ty.clone(), *name, Signature::new("()V")))
        .collect()
});

type FrameShape = (usize, i32, Marker);

fn marker() -> impl Strategy<Value = Marker> {
    prop_oneof![
        6 => Just(Marker::None),
        1 => Just(Marker::Placeholder),
        1 => Just(Marker::Substitution),
    ]
}

fn frame() -> impl Strategy<Value = FrameShape> {
    (0..METHODS.len(), -6i32..24, marker())
}

fn chain_shape() -> impl Strategy<Value = Vec<FrameShape>> {
    prop::collection::vec(frame(), 1..12)
}

fn unmarked_shape() -> impl Strategy<Value = Vec<FrameShape>> {
    prop::collection::vec((0..METHODS.len(), -6i32..24).prop_map(|(m, b)| (m, b, Marker::None)), 1..12)
}

/// Build a chain from root-first frame shapes; returns the head
fn build(shape: &[FrameShape]) -> SourcePosition {
    let mut caller: Option<SourcePosition> = None;
    for &(method, bci, marker) in shape {
        caller = Some(SourcePosition::with_marker(
            None,
            caller,
            METHODS[method].clone(),
            bci,
            marker,
        ));
    }
    caller.expect("non-empty shape")
}

// ============================================================================
// Equality and hashing
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_independent_builds_are_equal(shape in chain_shape()) {
        let x = build(&shape);
        let y = build(&shape);
        prop_assert_eq!(&x, &y);
        prop_assert_eq!(x.precomputed_hash(), y.precomputed_hash());
        prop_assert_eq!(x.depth(), shape.len());
    }

    #[test]
    fn prop_equal_implies_equal_hash(a in chain_shape(), b in chain_shape()) {
        let x = build(&a);
        let y = build(&b);
        if x == y {
            prop_assert_eq!(x.precomputed_hash(), y.precomputed_hash());
        }
    }

    #[test]
    fn prop_changing_one_bci_breaks_equality(shape in chain_shape(), index in any::<prop::sample::Index>()) {
        let mut changed = shape.clone();
        let i = index.index(changed.len());
        changed[i].1 += 100;
        prop_assert_ne!(build(&shape), build(&changed));
    }
}

// ============================================================================
// Trim
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_trim_removes_every_marker(shape in chain_shape()) {
        let x = build(&shape);
        match x.trim() {
            None => prop_assert_ne!(x.marker(), Marker::None),
            Some(t) => {
                prop_assert!(t.iter().all(|f| f.marker() == Marker::None));
                let expected = shape.iter().rev().take_while(|f| f.2 == Marker::None).count();
                prop_assert_eq!(t.depth(), expected);
            }
        }
    }

    #[test]
    fn prop_trim_is_idempotent(shape in chain_shape()) {
        if let Some(t) = build(&shape).trim() {
            let again = t.trim().expect("trimmed chain has an unmarked head");
            prop_assert!(SourcePosition::ptr_eq(&again, &t));
        }
    }

    #[test]
    fn prop_trim_without_markers_is_identity(shape in unmarked_shape()) {
        let x = build(&shape);
        let t = x.trim().expect("unmarked head");
        prop_assert!(SourcePosition::ptr_eq(&t, &x));
    }
}

// ============================================================================
// Extension
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_add_caller_depth_is_additive(callee in chain_shape(), link in chain_shape()) {
        let x = build(&callee);
        let l = build(&link);
        let extended = x.add_caller(Some(l.clone()), &NoBytecode);

        prop_assert_eq!(extended.depth(), x.depth() + l.depth());
        let shared = extended.iter().nth(x.depth()).expect("link frames follow the callee");
        prop_assert!(SourcePosition::ptr_eq(shared, &l));
        // the inputs are unchanged
        prop_assert_eq!(x.depth(), callee.len());
        prop_assert_eq!(build(&callee), x);
    }

    #[test]
    fn prop_add_caller_keeps_inner_frames(callee in chain_shape(), link in chain_shape()) {
        let x = build(&callee);
        let extended = x.add_caller(Some(build(&link)), &NoBytecode);

        let inner = x.depth() - 1;
        for (old, new) in x.iter().zip(extended.iter()).take(inner) {
            prop_assert_eq!(old.method(), new.method());
            prop_assert_eq!(old.bci(), new.bci());
            prop_assert_eq!(new.marker(), Marker::None);
        }
        prop_assert!(extended.trim().is_some());

        let old_root = x.root();
        let new_root = extended.iter().nth(inner).expect("rebuilt root");
        prop_assert_eq!(new_root.method(), old_root.method());
        prop_assert_eq!(new_root.marker(), Marker::None);
        let expected_bci = if old_root.is_placeholder() { 0 } else { old_root.bci() };
        prop_assert_eq!(new_root.bci(), expected_bci);
    }
}
