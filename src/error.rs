//! Return codes and errors surfaced by the public API.

use thiserror::Error;

/// Everything that can go wrong on a point-to-point call or a collective.
///
/// Variant names mirror the return codes named in the external interface:
/// `NoSuchRank`, `SelfOp`, `RemoteFinished`, `DeadlockDetected`. A
/// successful call is represented by `Ok(())`, not a `Success` variant.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// `dst`/`src` is outside `[0, world_size)`.
    #[error("rank {0} is outside the group")]
    NoSuchRank(i32),
    /// A rank tried to `send`/`recv` to/from itself.
    #[error("a rank cannot send to or receive from itself")]
    SelfOp,
    /// The peer has already called `finalize`; the message can never arrive.
    #[error("the remote peer has already finalized")]
    RemoteFinished,
    /// The local deadlock detector concluded a two-party receive/receive cycle.
    #[error("a receive/receive deadlock was detected")]
    DeadlockDetected,
    /// A user tag was negative, colliding with the reserved tag space.
    #[error("tag {0} is reserved for internal use")]
    ReservedTag(i32),
}

pub type Result<T = ()> = std::result::Result<T, Error>;
