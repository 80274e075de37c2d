//! Call-chain source positions
//!
//! A [`SourcePosition`] records where an IR node came from: the method and
//! bytecode index of the operation, and, when that method was inlined, the
//! position of the call site in its caller, and so on out to the outermost
//! compiled method. It is an inlined call stack frozen at compile time.
//!
//! # Structure
//!
//! ```text
//!   leaf (head)                                root
//!  ┌──────────────┐ caller ┌──────────────┐ caller ┌──────────────┐
//!  │ Vec.add @ 12 │ ─────▶ │ List.push @3 │ ─────▶ │ main @ 40    │
//!  └──────────────┘        └──────────────┘        └──────────────┘
//!                                 ▲
//!  ┌──────────────┐ caller        │
//!  │ Vec.grow @ 7 │ ──────────────┘   (shared suffix)
//!  └──────────────┘
//! ```
//!
//! Positions are persistent: frames are immutable and reference counted, so
//! chains that differ only near the leaf share their outer frames. Extension
//! ([`SourcePosition::add_caller`]) and pruning ([`SourcePosition::trim`])
//! allocate new frames only for the part of the chain that changes.
//!
//! # Markers
//!
//! Frames for compiler-internal code carry a [`Marker`]. Placeholder frames
//! stand in for a caller that is not known yet; substitution frames come from
//! intrinsic or snippet code rather than application bytecode. Neither is
//! verified against bytecode and `trim` removes both.
//!
//! # Hashing
//!
//! Every frame caches a 32-bit hash of its bci, method and caller hash,
//! computed once at construction. Equality uses it as a fast reject before
//! comparing the frames field by field.

mod format;
pub mod verify;

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{trace, warn};

use crate::bytecode::frame_state::{self, INVALID_FRAMESTATE_BCI};
use crate::bytecode::BytecodeInfo;
use crate::config::{self, VerifyConfig};
use crate::error::{PositionError, PositionResult};
use crate::meta::{Constant, MethodRef};

pub use format::{PositionDisplay, LINE_SEPARATOR};
pub use verify::{check_all, verify_link, VerificationReport};

/// Frames collected head to root; inlining depth rarely exceeds this
type FrameStack<'a> = SmallVec<[&'a SourcePosition; 8]>;

/// Tag for frames that do not correspond to verifiable application bytecode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Marker {
    /// An ordinary frame
    #[default]
    None,
    /// Stands in for a frame whose real position is supplied later
    Placeholder,
    /// Intrinsic or snippet code substituted for a real method
    Substitution,
}

struct Frame {
    method: MethodRef,
    bci: i32,
    receiver: Option<Constant>,
    caller: Option<SourcePosition>,
    marker: Marker,
    hash: i32,
}

// Unlinks uniquely owned callers in a loop so dropping a long chain does not
// recurse once per frame.
impl Drop for Frame {
    fn drop(&mut self) {
        let mut next = self.caller.take();
        while let Some(position) = next {
            match Arc::try_unwrap(position.frame) {
                Ok(mut frame) => next = frame.caller.take(),
                Err(_) => break,
            }
        }
    }
}

/// One frame of an inlined call chain, and through `caller` the whole chain
///
/// Cloning is cheap: it copies a reference to the shared immutable frame.
#[derive(Clone)]
pub struct SourcePosition {
    frame: Arc<Frame>,
}

/// Iterator over the frames of a chain, head first
#[derive(Clone)]
pub struct Frames<'a> {
    next: Option<&'a SourcePosition>,
}

impl<'a> Iterator for Frames<'a> {
    type Item = &'a SourcePosition;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.caller();
        Some(current)
    }
}

fn chain_hash(caller: Option<&SourcePosition>, method: &MethodRef, bci: i32) -> i32 {
    let own = bci.wrapping_mul(31).wrapping_add(method.identity_hash());
    match caller {
        Some(caller) => caller.frame.hash.wrapping_mul(7).wrapping_add(own),
        None => own,
    }
}

impl SourcePosition {
    /// Create an ordinary frame
    pub fn new(
        receiver: Option<Constant>,
        caller: Option<SourcePosition>,
        method: MethodRef,
        bci: i32,
    ) -> Self {
        Self::with_marker(receiver, caller, method, bci, Marker::None)
    }

    /// Create a frame with an explicit marker
    ///
    /// # Panics
    /// In verification mode, if `receiver` is not an instance of the method's
    /// declaring type on an unmarked frame at a real bci.
    pub fn with_marker(
        receiver: Option<Constant>,
        caller: Option<SourcePosition>,
        method: MethodRef,
        bci: i32,
        marker: Marker,
    ) -> Self {
        let hash = chain_hash(caller.as_ref(), &method, bci);
        let position = Self {
            frame: Arc::new(Frame {
                method,
                bci,
                receiver,
                caller,
                marker,
                hash,
            }),
        };
        if config::verification_enabled() {
            if let Err(e) = position.check_receiver() {
                panic!("{}: {}", e, position);
            }
        }
        position
    }

    /// A placeholder frame for `method` with no usable bci
    pub fn placeholder(method: MethodRef) -> Self {
        Self::placeholder_at(method, INVALID_FRAMESTATE_BCI)
    }

    /// A placeholder frame for `method` at `bci`
    pub fn placeholder_at(method: MethodRef, bci: i32) -> Self {
        Self::with_marker(None, None, method, bci, Marker::Placeholder)
    }

    /// A root substitution frame for `method`
    pub fn substitution(method: MethodRef) -> Self {
        Self::with_marker(None, None, method, INVALID_FRAMESTATE_BCI, Marker::Substitution)
    }

    /// A substitution frame for `method` at `bci`, called from `caller`
    pub fn substitution_at(caller: Option<SourcePosition>, method: MethodRef, bci: i32) -> Self {
        Self::with_marker(None, caller, method, bci, Marker::Substitution)
    }

    #[inline]
    pub fn method(&self) -> &MethodRef {
        &self.frame.method
    }

    /// Bytecode index within `method`; negative values are placeholders
    #[inline]
    pub fn bci(&self) -> i32 {
        self.frame.bci
    }

    /// The `this` value of this frame, if known
    #[inline]
    pub fn receiver(&self) -> Option<&Constant> {
        self.frame.receiver.as_ref()
    }

    /// The next-outer frame
    #[inline]
    pub fn caller(&self) -> Option<&SourcePosition> {
        self.frame.caller.as_ref()
    }

    #[inline]
    pub fn marker(&self) -> Marker {
        self.frame.marker
    }

    #[inline]
    pub fn is_placeholder(&self) -> bool {
        self.frame.marker == Marker::Placeholder
    }

    #[inline]
    pub fn is_substitution(&self) -> bool {
        self.frame.marker == Marker::Substitution
    }

    /// The hash cached at construction
    #[inline]
    pub fn precomputed_hash(&self) -> i32 {
        self.frame.hash
    }

    /// Whether both handles refer to the same frame object
    #[inline]
    pub fn ptr_eq(a: &SourcePosition, b: &SourcePosition) -> bool {
        Arc::ptr_eq(&a.frame, &b.frame)
    }

    /// Frames from this one out to the root
    pub fn iter(&self) -> Frames<'_> {
        Frames { next: Some(self) }
    }

    /// Number of frames in the chain, this one included
    pub fn depth(&self) -> usize {
        self.iter().count()
    }

    /// The outermost frame
    pub fn root(&self) -> &SourcePosition {
        let mut current = self;
        while let Some(caller) = current.caller() {
            current = caller;
        }
        current
    }

    /// Remove marker frames
    ///
    /// Returns None if this frame is marked. Otherwise the chain is cut just
    /// before its first marked frame. When there is nothing to cut the same
    /// instance is returned; only the frames in front of the cut are rebuilt.
    pub fn trim(&self) -> Option<SourcePosition> {
        let frames: FrameStack<'_> = self.iter().collect();
        let cut = match frames.iter().position(|f| f.marker() != Marker::None) {
            None => return Some(self.clone()),
            Some(0) => return None,
            Some(cut) => cut,
        };
        trace!(target: "inline_provenance::position", depth = frames.len(), kept = cut, "Trimming marker frames");
        let mut kept = frames[..cut].iter().rev();
        let outermost = kept.next()?.with_caller(None);
        Some(kept.fold(outermost, |caller, frame| frame.with_caller(Some(caller))))
    }

    /// Attach `link` as the caller of this chain's root
    ///
    /// Same as [`add_caller_edge`](Self::add_caller_edge) with no receiver
    /// and a regular (bytecode-checked) call edge.
    pub fn add_caller(
        &self,
        link: Option<SourcePosition>,
        bytecode: &dyn BytecodeInfo,
    ) -> SourcePosition {
        self.add_caller_edge(None, link, false, bytecode)
    }

    /// Attach `link` as the caller of this chain's root, recording `new_receiver` on the root
    pub fn add_caller_with_receiver(
        &self,
        new_receiver: Option<Constant>,
        link: Option<SourcePosition>,
        bytecode: &dyn BytecodeInfo,
    ) -> SourcePosition {
        self.add_caller_edge(new_receiver, link, false, bytecode)
    }

    /// Attach `link` as the caller of this chain's root
    ///
    /// Returns a new chain; `self` is unchanged and `link` is shared, not
    /// copied. A placeholder root becomes an ordinary frame at bci 0. Any
    /// other root keeps its method and bci and takes `new_receiver`. Inner
    /// frames are rebuilt on top of the new root with their method, bci and
    /// receiver; the rebuilt chain carries no markers in front of `link`.
    ///
    /// # Panics
    /// In verification mode, if the root already has a receiver and
    /// `new_receiver` is given, or if `is_substitution_edge` is false and the
    /// call site in `link` does not invoke the root's method.
    pub fn add_caller_edge(
        &self,
        new_receiver: Option<Constant>,
        link: Option<SourcePosition>,
        is_substitution_edge: bool,
        bytecode: &dyn BytecodeInfo,
    ) -> SourcePosition {
        let frames: FrameStack<'_> = self.iter().collect();
        let (root, inner) = match frames.split_last() {
            Some((root, inner)) => (*root, inner),
            None => (self, &[][..]),
        };

        let new_root = if root.is_placeholder() {
            SourcePosition::new(new_receiver, link, root.method().clone(), 0)
        } else {
            if config::verification_enabled() {
                root.check_attachment(
                    new_receiver.as_ref(),
                    link.as_ref(),
                    is_substitution_edge,
                    bytecode,
                );
            }
            SourcePosition::new(new_receiver, link, root.method().clone(), root.bci())
        };

        trace!(target: "inline_provenance::position", depth = frames.len(), is_substitution_edge, "Extending chain");
        inner
            .iter()
            .rev()
            .fold(new_root, |caller, frame| frame.rebased(caller))
    }

    /// Copy of this frame on top of `caller`, as an ordinary frame
    fn rebased(&self, caller: SourcePosition) -> SourcePosition {
        SourcePosition::new(
            self.frame.receiver.clone(),
            Some(caller),
            self.frame.method.clone(),
            self.frame.bci,
        )
    }

    fn with_caller(&self, caller: Option<SourcePosition>) -> SourcePosition {
        SourcePosition::with_marker(
            self.frame.receiver.clone(),
            caller,
            self.frame.method.clone(),
            self.frame.bci,
            self.frame.marker,
        )
    }

    fn check_attachment(
        &self,
        new_receiver: Option<&Constant>,
        link: Option<&SourcePosition>,
        is_substitution_edge: bool,
        bytecode: &dyn BytecodeInfo,
    ) {
        if let (Some(_), Some(existing)) = (new_receiver, self.receiver()) {
            let e = PositionError::ReceiverOverwrite {
                method: self.method().clone(),
                existing: existing.clone(),
            };
            warn!(target: "inline_provenance::position", error = %e, "Invalid chain extension");
            panic!("{}", e);
        }
        if let Some(link) = link.filter(|_| !is_substitution_edge) {
            if let Err(e) = verify_link(self, link, bytecode, VerifyConfig::global()) {
                panic!("{}\n{}", e, link.display(bytecode));
            }
        }
    }

    fn check_receiver(&self) -> PositionResult<()> {
        let Some(receiver) = self.receiver() else {
            return Ok(());
        };
        if self.marker() != Marker::None
            || frame_state::is_placeholder_bci(self.bci())
            || self.method().declaring_type().is_instance(receiver)
        {
            return Ok(());
        }
        Err(PositionError::ReceiverNotInstance {
            method: self.method().clone(),
            receiver: receiver.clone(),
        })
    }
}

impl PartialEq for SourcePosition {
    fn eq(&self, other: &Self) -> bool {
        let mut a = Some(self);
        let mut b = Some(other);
        loop {
            match (a, b) {
                (None, None) => return true,
                (Some(x), Some(y)) => {
                    if SourcePosition::ptr_eq(x, y) {
                        return true;
                    }
                    if x.frame.hash != y.frame.hash
                        || x.bci() != y.bci()
                        || x.method() != y.method()
                        || x.receiver() != y.receiver()
                    {
                        return false;
                    }
                    a = x.caller();
                    b = y.caller();
                }
                _ => return false,
            }
        }
    }
}

impl Eq for SourcePosition {}

impl Hash for SourcePosition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_i32(self.frame.hash);
    }
}

impl fmt::Debug for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourcePosition")
            .field("method", self.method())
            .field("bci", &self.bci())
            .field("receiver", &self.receiver())
            .field("marker", &self.marker())
            .field("caller", &self.caller())
            .finish()
    }
}

impl<'a> IntoIterator for &'a SourcePosition {
    type Item = &'a SourcePosition;
    type IntoIter = Frames<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
