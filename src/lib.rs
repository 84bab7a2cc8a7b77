/*! A small message-passing runtime for a fixed-size group of cooperating
processes launched together by a sibling launcher (the [`rankmeshrun`]
binary shipped alongside this library).

Each process is identified by a rank in `0..world_size()` (`world_size()
<= 16`) and can exchange point-to-point typed messages (tagged, FIFO per
sender/receiver channel) and run three collective operations — [`barrier`],
[`bcast`], and [`reduce`] — over the whole group.

```no_run
use rankmesh::Tag;

rankmesh::init(false).unwrap();
if rankmesh::world_rank() == 0 {
    rankmesh::send(&[0xAA, 0xBB], 1, Tag::new(7).unwrap()).unwrap();
} else {
    let mut buf = [0u8; 2];
    rankmesh::recv(&mut buf, 0, Tag::new(7).unwrap()).unwrap();
    assert_eq!(buf, [0xAA, 0xBB]);
}
rankmesh::finalize();
```

Processes are started together by [`rankmeshrun`], which wires up a full
mesh of unidirectional byte channels between every ordered pair of ranks
and forks one child per rank. This crate is only the rank-local half: it
assumes that mesh already exists in its file descriptor table by the
time [`init`] runs.

## What this crate does not do

- Messages larger than available memory, more than 16 ranks, or
  continuing a collective after a peer has died mid-way through it — a
  collective reports [`Error::RemoteFinished`] instead.
- Flow control beyond whatever the underlying pipe gives for free.
- Persisting messages across a process restart.
*/

mod buffer;
mod collectives;
pub mod config;
mod context;
mod deadlock;
mod error;
mod frame;
pub mod io;
mod topology;
mod worker;

pub use collectives::Op;
pub use error::{Error, Result};

use std::fmt;

/// A non-negative, non-reserved message tag. Constructing one validates
/// that it does not collide with the reserved tag space (`BARRIER`,
/// `BCAST`, `REDUCE`, `DEADLOCK_PROBE` are all negative and must not be
/// used by user code).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag(i32);

impl Tag {
    /// Matches any non-negative tag on the receive side.
    pub const ANY: Tag = Tag(frame::ANY_TAG);

    pub fn new(tag: i32) -> Result<Tag> {
        if frame::is_reserved(tag) {
            Err(Error::ReservedTag(tag))
        } else {
            Ok(Tag(tag))
        }
    }

    pub fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Initializes the mesh for this process: reads its rank and world size
/// from the environment the launcher set up, starts the background
/// receive worker, and — when `detection` is true — turns on the
/// best-effort two-party deadlock detector.
pub fn init(detection: bool) -> Result<()> {
    context::init(detection)
}

/// Closes every outgoing channel (cascading a clean hang-up to every
/// peer's worker), joins the receive worker, and tears down this
/// process's share of the mesh.
pub fn finalize() {
    context::finalize()
}

/// The number of ranks in the group, as supplied by the launcher.
pub fn world_size() -> usize {
    context::world_size()
}

/// This process's rank, in `0..world_size()`.
pub fn world_rank() -> usize {
    context::world_rank()
}

/// Sends `data` to `dst`, tagged `tag`. Returns
/// [`Error::RemoteFinished`] if `dst` has already finalized — this check
/// is advisory: a peer that finalizes immediately after the check still
/// accepts (and silently drops) the write.
pub fn send(data: &[u8], dst: usize, tag: Tag) -> Result<()> {
    context::send(data, dst as i32, tag.get())
}

/// Blocks until a message matching `(src, tag, dest.len())` is available,
/// then copies its payload into `dest`. `tag == Tag::ANY` matches any
/// non-negative tag of the right length. Returns
/// [`Error::RemoteFinished`] if `src` finalizes with no such message ever
/// arriving, or [`Error::DeadlockDetected`] if the detector (when armed)
/// concludes a receive/receive cycle with `src`.
pub fn recv(dest: &mut [u8], src: usize, tag: Tag) -> Result<()> {
    context::recv(dest, src as i32, tag.get())
}

/// Blocks until every rank has called `barrier()`.
pub fn barrier() -> Result<()> {
    collectives::barrier()
}

/// Broadcasts `data` from `root` to every rank, in place. On non-root
/// ranks `data` is overwritten with the root's value; its length is the
/// message's `count` on every rank.
pub fn bcast(data: &mut [u8], root: usize) -> Result<()> {
    collectives::bcast(data, root as i32)
}

/// Reduces `send` across every rank lane-wise with `op`, using wrapping
/// 8-bit arithmetic, writing the result into `recv` on `root`. `send`
/// and `recv` must have equal, matching lengths across every rank.
pub fn reduce(send: &[u8], recv: &mut [u8], op: Op, root: usize) -> Result<()> {
    collectives::reduce(send, recv, op, root as i32)
}
