//! The per-process singleton runtime: an opaque context created by
//! `init` and torn down by `finalize`, holding the one mutex/condvar
//! pair that guards every piece of shared state — buffers, the exited
//! bitmap, the rendezvous slot, and the deadlock log.

use crate::buffer::PendingBuffer;
use crate::config::WorldConfig;
use crate::deadlock::DeadlockLog;
use crate::error::{Error, Result};
use crate::frame::{FrameHeader, ProbeRecord, DEADLOCK_PROBE_TAG};
use crate::io::{self, full_write};
use crate::worker;
use std::os::unix::io::RawFd;
use std::sync::{Condvar, Mutex, OnceLock};
use std::thread::JoinHandle;

/// One waiting receiver's published request, and the worker's answer.
///
/// Invariant: at most one receiver parks on this slot at a time —
/// point-to-point calls are not re-entrant across multiple user threads
/// of the same rank.
pub(crate) struct Slot {
    pub source: usize,
    pub tag: i32,
    pub count: i32,
    pub matched_payload: Option<Vec<u8>>,
    pub deadlock: bool,
}

pub(crate) struct State {
    pub buffers: Vec<PendingBuffer>,
    pub exited: Vec<bool>,
    pub num_exited: usize,
    pub deadlock_log: DeadlockLog,
    pub slot: Option<Slot>,
}

pub(crate) struct Shared {
    pub mutex: Mutex<State>,
    pub condvar: Condvar,
}

pub(crate) struct Runtime {
    pub rank: usize,
    pub world_size: usize,
    pub detection: bool,
    pub shared: std::sync::Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

static RUNTIME: OnceLock<Mutex<Option<Runtime>>> = OnceLock::new();

fn slot_cell() -> &'static Mutex<Option<Runtime>> {
    RUNTIME.get_or_init(|| Mutex::new(None))
}

/// Runs `f` with the live runtime. Panics if called before `init` or
/// after `finalize` — this is a programming error, not one of the
/// ordinary error return codes.
fn with_runtime<T>(f: impl FnOnce(&Runtime) -> T) -> T {
    let guard = slot_cell().lock().unwrap();
    let rt = guard.as_ref().expect("rankmesh: init() has not been called (or finalize() already ran)");
    f(rt)
}

/// Initializes the mesh: reads `rank`/`world_size` from the environment,
/// closes every descriptor not involving this rank, allocates per-peer
/// state, and starts the background receive worker.
pub fn init(detection: bool) -> Result<()> {
    let cfg = WorldConfig::from_env().unwrap_or_else(|e| {
        log::error!("rankmesh: invalid launch environment: {e}");
        std::process::abort();
    });

    let mut guard = slot_cell().lock().unwrap();
    if guard.is_some() {
        log::error!("rankmesh: init() called twice in the same process");
        std::process::abort();
    }

    io::close_foreign_transfer_fds(cfg.rank, cfg.size);
    io::close_my_incoming_transfer_write_fds(cfg.rank, cfg.size);
    io::close_my_outgoing_transfer_read_fds(cfg.rank, cfg.size);

    let mut buffers = Vec::with_capacity(cfg.size);
    for _ in 0..cfg.size {
        buffers.push(PendingBuffer::new());
    }

    let shared = std::sync::Arc::new(Shared {
        mutex: Mutex::new(State {
            buffers,
            exited: vec![false; cfg.size],
            num_exited: 0,
            deadlock_log: DeadlockLog::new(),
            slot: None,
        }),
        condvar: Condvar::new(),
    });

    let incoming_fds: Vec<RawFd> = (0..cfg.size).map(|i| io::read_fd(i, cfg.rank)).collect();
    let worker_shared = shared.clone();
    let handle = worker::spawn(cfg.rank, cfg.size, detection, incoming_fds, worker_shared);

    *guard = Some(Runtime {
        rank: cfg.rank,
        world_size: cfg.size,
        detection,
        shared,
        worker: Some(handle),
    });
    log::debug!("rankmesh: rank {} of {} initialized (detection={detection})", cfg.rank, cfg.size);
    Ok(())
}

/// Closes every outgoing write end (including the loopback entry), joins
/// the worker, then closes the read ends it was polling.
pub fn finalize() {
    let mut guard = slot_cell().lock().unwrap();
    let mut rt = guard.take().expect("rankmesh: finalize() called without a matching init()");

    io::close_my_outgoing_transfer_write_fds(rt.rank, rt.world_size);

    if let Some(handle) = rt.worker.take() {
        drop(guard);
        handle.join().expect("rankmesh: receive worker panicked");
        guard = slot_cell().lock().unwrap();
    }

    io::close_my_incoming_transfer_read_fds(rt.rank, rt.world_size);
    drop(guard);
    log::debug!("rankmesh: rank {} finalized", rt.rank);
}

pub fn world_size() -> usize {
    with_runtime(|rt| rt.world_size)
}

pub fn world_rank() -> usize {
    with_runtime(|rt| rt.rank)
}

fn validate_peer(rank_param: i32, world_size: usize, self_rank: usize) -> Result<usize> {
    if rank_param == self_rank as i32 {
        return Err(Error::SelfOp);
    }
    if rank_param < 0 || rank_param as usize >= world_size {
        return Err(Error::NoSuchRank(rank_param));
    }
    Ok(rank_param as usize)
}

fn fatal_io(context: &str, e: nix::errno::Errno) -> ! {
    log::error!("rankmesh: fatal channel error during {context}: {e}");
    std::process::abort();
}

/// Writes a frame directly to the outgoing channel, bypassing rank/tag
/// validation. Used both by the public `send` and internally for deadlock
/// probes, which carry a reserved tag on purpose.
fn send_frame(rank: usize, dst: usize, tag: i32, payload: &[u8]) {
    let mut buf = Vec::with_capacity(8 + payload.len());
    FrameHeader { tag, count: payload.len() as i32 }
        .write_to(&mut buf)
        .expect("writing to a Vec cannot fail");
    buf.extend_from_slice(payload);
    if let Err(e) = full_write(io::write_fd(rank, dst), &buf) {
        fatal_io("full_write", e);
    }
}

/// Sends on the raw, untagged-validation path: `tag` may be a reserved
/// value, since collectives and the deadlock prober route through here
/// too. The public API validates tags at the `Tag`-typed boundary in
/// `lib.rs` before ever reaching this function.
pub fn send(data: &[u8], dst: i32, tag: i32) -> Result<()> {
    with_runtime(|rt| {
        let dst = validate_peer(dst, rt.world_size, rt.rank)?;
        {
            let state = rt.shared.mutex.lock().unwrap();
            if state.exited[dst] {
                return Err(Error::RemoteFinished);
            }
        }
        send_frame(rt.rank, dst, tag, data);
        if rt.detection && tag >= 0 {
            let mut state = rt.shared.mutex.lock().unwrap();
            state.deadlock_log.record_sent(dst as i32, tag, data.len() as i32);
        }
        Ok(())
    })
}

/// Same untagged-validation contract as `send`: callers that need to
/// reject reserved tags do so before reaching this function.
pub fn recv(dest: &mut [u8], src: i32, tag: i32) -> Result<()> {
    with_runtime(|rt| {
        let src = validate_peer(src, rt.world_size, rt.rank)?;
        let count = dest.len() as i32;

        let mut state = rt.shared.mutex.lock().unwrap();
        if let Some(payload) = state.buffers[src].take_first_match(tag, count) {
            dest.copy_from_slice(&payload);
            return Ok(());
        }

        let mut initial_deadlock = false;
        if rt.detection && !state.exited[src] {
            drop(state);
            let probe = ProbeRecord { from: rt.rank as i32, tag, count };
            let mut buf = Vec::with_capacity(ProbeRecord::WIRE_LEN);
            probe.write_to(&mut buf).expect("writing to a Vec cannot fail");
            send_frame(rt.rank, src, DEADLOCK_PROBE_TAG, &buf);
            state = rt.shared.mutex.lock().unwrap();
            initial_deadlock = state.deadlock_log.check(src as i32, tag, count);
        }

        state.slot = Some(Slot { source: src, tag, count, matched_payload: None, deadlock: initial_deadlock });
        loop {
            let ready = {
                let slot = state.slot.as_ref().unwrap();
                slot.matched_payload.is_some() || state.exited[src] || slot.deadlock
            };
            if ready {
                break;
            }
            state = rt.shared.condvar.wait(state).unwrap();
        }
        let slot = state.slot.take().unwrap();
        drop(state);

        if let Some(payload) = slot.matched_payload {
            dest.copy_from_slice(&payload);
            Ok(())
        } else if slot.deadlock {
            Err(Error::DeadlockDetected)
        } else {
            debug_assert!(rt.shared.mutex.lock().unwrap().exited[src]);
            Err(Error::RemoteFinished)
        }
    })
}

pub(crate) fn with_rank_and_size<T>(f: impl FnOnce(usize, usize) -> T) -> T {
    with_runtime(|rt| f(rt.rank, rt.world_size))
}

pub(crate) fn do_send(data: &[u8], dst: usize, tag: i32) -> Result<()> {
    send(data, dst as i32, tag)
}

pub(crate) fn do_recv(dest: &mut [u8], src: usize, tag: i32) -> Result<()> {
    recv(dest, src as i32, tag)
}
