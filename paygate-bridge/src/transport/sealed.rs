//! Sealed trait marker for [`Transport`](super::Transport) implementations.

pub(crate) mod private {
    /// Sealed trait marker.
    ///
    /// Keeps provider calls on the in-crate transport so trace and
    /// idempotency headers are always attached.
    pub trait Sealed {}
}
