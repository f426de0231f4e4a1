use thiserror::Error;

/// The error type for every contract violation this crate reports.
///
/// None of these are transient: they signal a programming error at the call site
/// and are surfaced synchronously to the caller that triggered them.
///
/// # Error Categories
///
/// - [`Error::IllegalState`] - transaction protocol or cursor positioning violated
/// - [`Error::ConcurrentModification`] - a stale iterator was used after a mutation
/// - [`Error::Incomparable`] - natural ordering met two elements with no defined order
/// - [`Error::UnsupportedOperation`] - mutation attempted through a read-only wrapper
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A protocol was used out of order.
    ///
    /// Raised for `next_*` calls outside an open transaction, a second `begin_change`,
    /// cursor accessors before `next()` or after exhaustion, and mode changes while
    /// a view is dispatching.
    #[error("illegal state: {0}")]
    IllegalState(&'static str),

    /// The sequence was structurally modified after an iterator was created.
    #[error("sequence was modified while being iterated")]
    ConcurrentModification,

    /// Two elements have no defined order under the natural ordering.
    #[error("elements are not mutually comparable")]
    Incomparable,

    /// A mutator was called on a sequence that does not allow it.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
