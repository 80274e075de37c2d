/// Inline Provenance - call-chain source positions for compiler IR
///
/// This library records, for any IR node, the chain of bytecode locations
/// through which the node's originating operation was reached: the method and
/// bytecode index of the operation itself, then the call site in the method
/// that inlined it, and so on outward. The chain is an immutable, reference
/// counted linked list with cached hashes, so IR nodes can share positions
/// freely across threads.
///
/// # Architecture
///
/// 1. **Positions** (`position` module)
///    - `SourcePosition`: one frame plus a shared link to its caller
///    - Extension (`add_caller`) when a method is inlined into a call site
///    - Pruning (`trim`) of placeholder and substitution frames
///    - Verification of each link against the caller's bytecode
///    - Rendering with optional per-frame disassembly
///
/// 2. **Bytecode access** (`bytecode` module)
///    - `BytecodeInfo`: the capability positions use to read instructions
///    - `BytecodeChunk`/`ChunkBuilder`: in-memory method bodies
///    - `MethodRegistry`: concurrent method → body map
///
/// 3. **Metadata** (`meta` module)
///    - `TypeRef`, `MethodRef`, `Signature`, `Constant`
///
/// # Example
///
/// ```rust
/// use inline_provenance::bytecode::NoBytecode;
/// use inline_provenance::meta::{MethodRef, Signature, TypeRef};
/// use inline_provenance::SourcePosition;
///
/// let ty = TypeRef::new("Lapp/Main;");
/// let a = MethodRef::new(ty.clone(), "a", Signature::new("()V"));
/// let b = MethodRef::new(ty, "b", Signature::new("()V"));
///
/// let leaf = SourcePosition::new(None, None, a.clone(), 5);
/// let call_site = SourcePosition::new(None, None, b, 9);
/// let inlined = leaf.add_caller(Some(call_site.clone()), &NoBytecode);
///
/// assert_eq!(inlined.depth(), 2);
/// assert_eq!(inlined.caller(), Some(&call_site));
/// assert_eq!(inlined.method(), &a);
/// assert_eq!(inlined.bci(), 5);
/// ```
///
/// # Verification Mode
///
/// Construction, extension and `verify` checks are assertions: they run in
/// debug builds or with the `verify-positions` feature, can be forced with
/// `INLINE_PROVENANCE_VERIFY`, and panic on failure. `check` and
/// `verify_link` return the same findings as `Result`s in every build.

pub mod bytecode;
pub mod config;
pub mod error;
pub mod meta;
pub mod position;

pub use bytecode::{BytecodeInfo, MethodRegistry, NoBytecode};
pub use config::VerifyConfig;
pub use error::{BytecodeError, ConfigError, PositionError, PositionResult};
pub use meta::{Constant, MethodRef, Signature, TypeRef};
pub use position::{check_all, verify_link, Marker, SourcePosition, VerificationReport};
