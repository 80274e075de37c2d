//! Method Registry
//!
//! Thread-safe map from resolved methods to their compiled bodies. This is
//! the in-memory [`BytecodeInfo`] implementation: the compiler registers a
//! chunk per method it parsed, and position verification and rendering look
//! instructions up through it.
//!
//! # Design
//!
//! - Lock-free via DashMap (concurrent HashMap)
//! - Chunks are shared as `Arc<BytecodeChunk>` and never mutated
//! - Negative (placeholder) bytecode indices never reach a chunk

use std::sync::Arc;

use dashmap::DashMap;
use tracing::trace;

use crate::meta::MethodRef;

use super::chunk::BytecodeChunk;
use super::opcodes::Opcode;
use super::BytecodeInfo;

/// Registry of method bodies
///
/// Uses DashMap for lock-free concurrent access.
pub struct MethodRegistry {
    bodies: DashMap<MethodRef, Arc<BytecodeChunk>>,
}

impl std::fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.bodies.iter().map(|e| e.key().to_string()).collect();
        f.debug_struct("MethodRegistry")
            .field("method_count", &self.bodies.len())
            .field("methods", &names)
            .finish()
    }
}

impl Default for MethodRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MethodRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            bodies: DashMap::new(),
        }
    }

    /// Register the body of `method`
    ///
    /// If the method already has a body, it is replaced.
    pub fn register(&self, method: MethodRef, body: Arc<BytecodeChunk>) {
        trace!(target: "inline_provenance::registry", method = %method, chunk = body.name(), len = body.len(), "Registering method body");
        self.bodies.insert(method, body);
    }

    /// Get the body of `method`
    pub fn get(&self, method: &MethodRef) -> Option<Arc<BytecodeChunk>> {
        self.bodies.get(method).map(|e| Arc::clone(e.value()))
    }

    /// Remove the body of `method`
    ///
    /// Returns true if the method was present and removed.
    pub fn remove(&self, method: &MethodRef) -> bool {
        self.bodies.remove(method).is_some()
    }

    /// Check if `method` has a registered body
    pub fn contains(&self, method: &MethodRef) -> bool {
        self.bodies.contains_key(method)
    }

    /// Get the number of registered methods
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Clear all bodies
    pub fn clear(&self) {
        self.bodies.clear();
    }

    fn with_body<R>(
        &self,
        method: &MethodRef,
        bci: i32,
        f: impl FnOnce(&BytecodeChunk, usize) -> Option<R>,
    ) -> Option<R> {
        let offset = usize::try_from(bci).ok()?;
        let body = self.bodies.get(method)?;
        f(&**body, offset)
    }
}

impl BytecodeInfo for MethodRegistry {
    fn opcode_at(&self, method: &MethodRef, bci: i32) -> Option<Opcode> {
        self.with_body(method, bci, |body, offset| body.opcode_at(offset))
    }

    fn invoked_method_at(&self, method: &MethodRef, bci: i32) -> Option<MethodRef> {
        self.with_body(method, bci, |body, offset| body.invoked_method_at(offset).cloned())
    }

    fn disassemble_one(&self, method: &MethodRef, bci: i32) -> Option<String> {
        self.with_body(method, bci, |body, offset| {
            body.is_instruction_start(offset)
                .then(|| body.disassemble_instruction(offset).0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::chunk::ChunkBuilder;
    use crate::meta::{Signature, TypeRef};

    fn method(name: &str) -> MethodRef {
        MethodRef::new(TypeRef::new("LTest;"), name, Signature::new("()V"))
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = MethodRegistry::new();
        let caller = method("caller");
        let callee = method("callee");

        let mut builder = ChunkBuilder::new("caller");
        builder.emit(Opcode::Nop);
        let bci = builder.emit_invoke(Opcode::InvokeStatic, callee.clone()).unwrap();
        builder.emit(Opcode::Return);
        registry.register(caller.clone(), builder.build_arc());

        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&caller));
        assert!(!registry.contains(&callee));

        let bci = bci as i32;
        assert_eq!(registry.opcode_at(&caller, bci), Some(Opcode::InvokeStatic));
        assert_eq!(registry.invoked_method_at(&caller, bci), Some(callee.clone()));
        assert_eq!(
            registry.disassemble_one(&caller, bci).as_deref(),
            Some("invoke_static #0 (Test.callee()V)")
        );
    }

    #[test]
    fn test_unknown_and_placeholder_lookups() {
        let registry = MethodRegistry::new();
        let m = method("m");
        let mut builder = ChunkBuilder::new("m");
        builder.emit(Opcode::Return);
        registry.register(m.clone(), builder.build_arc());

        assert_eq!(registry.opcode_at(&m, -1), None);
        assert_eq!(registry.opcode_at(&m, 5), None);
        assert_eq!(registry.disassemble_one(&m, 5), None);
        assert_eq!(registry.opcode_at(&method("other"), 0), None);
        assert_eq!(registry.opcode_at(&m, crate::bytecode::frame_state::AFTER_BCI), None);
        assert_eq!(registry.opcode_at(&m, 0), Some(Opcode::Return));
    }

    #[test]
    fn test_remove_and_clear() {
        let registry = MethodRegistry::new();
        let a = method("a");
        let b = method("b");
        registry.register(a.clone(), ChunkBuilder::new("a").build_arc());
        registry.register(b.clone(), ChunkBuilder::new("b").build_arc());

        assert!(registry.remove(&a));
        assert!(!registry.remove(&a));
        assert_eq!(registry.len(), 1);

        registry.clear();
        assert!(registry.is_empty());
    }
}
