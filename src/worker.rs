//! The background receive worker: one thread per process, multiplexing
//! every incoming channel, enqueuing messages or deadlock probes, and
//! waking a parked receiver on a match, a peer exit, or a fresh deadlock
//! verdict.

use crate::context::Shared;
use crate::frame::{FrameHeader, ProbeRecord, DEADLOCK_PROBE_TAG};
use crate::io::{self, full_read, ReadOutcome, Readiness};
use std::os::unix::io::RawFd;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

pub(crate) fn spawn(
    rank: usize,
    world_size: usize,
    detection: bool,
    incoming_fds: Vec<RawFd>,
    shared: Arc<Shared>,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name(format!("rankmesh-worker-{rank}"))
        .spawn(move || run(rank, world_size, detection, &incoming_fds, &shared))
        .expect("failed to spawn the receive worker thread")
}

fn run(rank: usize, world_size: usize, detection: bool, incoming_fds: &[RawFd], shared: &Shared) {
    loop {
        let states = match io::poll_readiness(incoming_fds) {
            Ok(s) => s,
            Err(e) => {
                log::error!("rankmesh[{rank}]: poll failed: {e}");
                std::process::abort();
            }
        };

        for (source, state) in states.into_iter().enumerate() {
            match state {
                Readiness::Readable => {
                    handle_incoming_message(rank, source, detection, incoming_fds[source], shared);
                    let mut guard = shared.mutex.lock().unwrap();
                    signal_if_waiting(&mut guard, detection, source);
                    drop(guard);
                    shared.condvar.notify_all();
                }
                Readiness::HungUp => {
                    let mut guard = shared.mutex.lock().unwrap();
                    if !guard.exited[source] {
                        guard.exited[source] = true;
                        signal_if_waiting(&mut guard, detection, source);
                        guard.num_exited += 1;
                        let done = guard.num_exited == world_size;
                        drop(guard);
                        shared.condvar.notify_all();
                        if done {
                            log::debug!("rankmesh[{rank}]: all {world_size} peers have exited, worker stopping");
                            return;
                        }
                    }
                }
                Readiness::Error => {
                    log::error!("rankmesh[{rank}]: channel {source}->{rank} reported a poll error");
                    std::process::abort();
                }
                Readiness::Quiet => {}
            }
        }
    }
}

fn handle_incoming_message(rank: usize, source: usize, detection: bool, fd: RawFd, shared: &Shared) {
    let header = match FrameHeader::read_from(&mut FdReader(fd)) {
        Ok(h) => h,
        Err(e) => {
            log::error!("rankmesh[{rank}]: failed reading frame header from {source}: {e}");
            std::process::abort();
        }
    };

    if detection && header.tag == DEADLOCK_PROBE_TAG {
        let probe = match ProbeRecord::read_from(&mut FdReader(fd)) {
            Ok(p) => p,
            Err(e) => {
                log::error!("rankmesh[{rank}]: failed reading deadlock probe from {source}: {e}");
                std::process::abort();
            }
        };
        let mut state = shared.mutex.lock().unwrap();
        state.deadlock_log.record_probe(source as i32, probe.tag, probe.count);
    } else {
        let mut payload = vec![0u8; header.count.max(0) as usize];
        if let Err(e) = full_read(fd, &mut payload).map(expect_filled) {
            log::error!("rankmesh[{rank}]: failed reading payload from {source}: {e}");
            std::process::abort();
        }
        let mut state = shared.mutex.lock().unwrap();
        state.buffers[source].append(header.tag, header.count, payload);
    }
}

fn expect_filled(outcome: ReadOutcome) {
    // A frame header already promised `count` more bytes; the peer hanging
    // up mid-payload is a channel-layer invariant violation, not a normal
    // end-of-stream (that is always signalled between frames, at the next
    // poll cycle).
    if matches!(outcome, ReadOutcome::EndOfStream) {
        log::error!("rankmesh: peer hung up mid-frame");
        std::process::abort();
    }
}

/// Re-evaluates whatever a parked receiver on `source` is waiting for.
/// In detection mode this *only* recomputes the deadlock verdict (it does
/// not also attempt a normal match) — a receiver parked with detection
/// enabled is woken exclusively by a deadlock verdict turning true or by
/// the predicate re-check already covering `exited`. Detection mode
/// trades away ordinary wakeups in exchange for the cycle check.
fn signal_if_waiting(state: &mut crate::context::State, detection: bool, source: usize) {
    let Some(slot) = state.slot.as_mut() else { return };
    if slot.source != source {
        return;
    }
    if detection {
        let verdict = state.deadlock_log.check(source as i32, slot.tag, slot.count);
        if verdict {
            slot.deadlock = true;
        }
    } else if slot.matched_payload.is_none() {
        if let Some(payload) = state.buffers[source].take_first_match(slot.tag, slot.count) {
            slot.matched_payload = Some(payload);
        }
        // `exited[source]` is re-read directly by the waiting thread's
        // predicate loop, so no extra bookkeeping is needed here for a
        // fresh peer-exit; this branch only needs to handle a fresh match.
    }
}

/// Adapts a raw fd to `std::io::Read` for `FrameHeader`/`ProbeRecord`
/// parsing, routing every read through `full_read` so EINTR and partial
/// reads are handled uniformly.
struct FdReader(RawFd);

impl std::io::Read for FdReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match full_read(self.0, buf) {
            Ok(ReadOutcome::Filled) => Ok(buf.len()),
            Ok(ReadOutcome::EndOfStream) => Ok(0),
            Err(e) => Err(std::io::Error::from_raw_os_error(e as i32)),
        }
    }
}
