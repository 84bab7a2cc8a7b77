//! The channel abstraction: a reliable unidirectional byte stream per
//! ordered pair `(i, j)`, `full_read`/`full_write` with EINTR retry, and
//! the fd-numbering formula the launcher and every rank agree on without
//! further coordination.

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags};
use nix::unistd;
use std::os::unix::io::{BorrowedFd, RawFd};

/// `R(i,j) = 20 + 2*(16*i + j)`; `W(i,j) = R(i,j) + 1`. Reserved, stable
/// descriptor numbers so every rank can compute the fd for any ordered
/// pair without asking the launcher.
pub fn read_fd(i: usize, j: usize) -> RawFd {
    (20 + 2 * (16 * i + j)) as RawFd
}

pub fn write_fd(i: usize, j: usize) -> RawFd {
    read_fd(i, j) + 1
}

/// The outcome of a single `full_read`: either every byte arrived, or the
/// writer closed the stream before (or exactly at) a message boundary.
#[derive(Debug)]
pub enum ReadOutcome {
    Filled,
    EndOfStream,
}

/// Blocks until `buf.len()` bytes have been read, retrying on `EINTR`.
/// Returns `EndOfStream` if the peer closed its write end with no more
/// buffered bytes; this is reported distinctly from an I/O error.
pub fn full_read(fd: RawFd, buf: &mut [u8]) -> nix::Result<ReadOutcome> {
    let mut total = 0usize;
    while total < buf.len() {
        match unistd::read(fd, &mut buf[total..]) {
            Ok(0) => {
                return if total == 0 {
                    Ok(ReadOutcome::EndOfStream)
                } else {
                    // Peer went away mid-frame; treat as an abrupt EOF.
                    Ok(ReadOutcome::EndOfStream)
                };
            }
            Ok(n) => total += n,
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(ReadOutcome::Filled)
}

/// Blocks until every byte in `buf` has been written, retrying on `EINTR`.
pub fn full_write(fd: RawFd, buf: &[u8]) -> nix::Result<()> {
    let mut total = 0usize;
    while total < buf.len() {
        match unistd::write(fd, &buf[total..]) {
            Ok(0) => continue,
            Ok(n) => total += n,
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Per-stream readiness state yielded by the multiplexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Readable,
    HungUp,
    Error,
    /// Neither ready nor hung-up nor errored this round.
    Quiet,
}

/// Blocks (no timeout) until at least one of `fds` is readable, hung-up,
/// or erroring, then reports the state of every fd.
pub fn poll_readiness(fds: &[RawFd]) -> nix::Result<Vec<Readiness>> {
    // SAFETY: every fd in `fds` is owned by the caller for at least the
    // duration of this call (either a fixed transfer descriptor kept open
    // for the process lifetime, or a test pipe end kept alive by its owner).
    let borrowed: Vec<BorrowedFd> = fds.iter().map(|&fd| unsafe { BorrowedFd::borrow_raw(fd) }).collect();
    let mut pollfds: Vec<PollFd> = borrowed.iter().map(|fd| PollFd::new(*fd, PollFlags::POLLIN)).collect();
    loop {
        match poll(&mut pollfds, -1) {
            Ok(_) => break,
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(pollfds
        .iter()
        .map(|pfd| {
            let revents = pfd.revents().unwrap_or_else(PollFlags::empty);
            if revents.contains(PollFlags::POLLERR) || revents.contains(PollFlags::POLLNVAL) {
                Readiness::Error
            } else if revents.contains(PollFlags::POLLIN) {
                Readiness::Readable
            } else if revents.contains(PollFlags::POLLHUP) {
                Readiness::HungUp
            } else {
                Readiness::Quiet
            }
        })
        .collect())
}

pub fn close_quiet(fd: RawFd) {
    // Closing an fd twice, or one already closed by a peer's exit, is a
    // logic error worth knowing about but not worth crashing a teardown
    // path over.
    if let Err(e) = unistd::close(fd) {
        log::warn!("close(fd={fd}) failed: {e}");
    }
}

/// Closes every `(i,j)` pair that does not involve `rank` at all. Run once
/// in `init`, before this process touches any channel.
pub fn close_foreign_transfer_fds(rank: usize, world_size: usize) {
    for i in 0..world_size {
        for j in 0..world_size {
            if i != rank && j != rank {
                close_quiet(read_fd(i, j));
                close_quiet(write_fd(i, j));
            }
        }
    }
}

/// Closes the write end of every other rank's channel *into* us — we only
/// ever read from those, never write.
pub fn close_my_incoming_transfer_write_fds(rank: usize, world_size: usize) {
    for i in 0..world_size {
        if i != rank {
            close_quiet(write_fd(i, rank));
        }
    }
}

/// Closes the read end of every channel we write *out* to — we never read
/// our own outgoing stream.
pub fn close_my_outgoing_transfer_read_fds(rank: usize, world_size: usize) {
    for i in 0..world_size {
        if i != rank {
            close_quiet(read_fd(rank, i));
        }
    }
}

/// Closes every outgoing write end from `rank`, including the loopback
/// entry `(rank, rank)` so every peer's worker — including our own —
/// observes a clean hang-up. Called from `finalize`.
pub fn close_my_outgoing_transfer_write_fds(rank: usize, world_size: usize) {
    for i in 0..world_size {
        close_quiet(write_fd(rank, i));
    }
}

/// Closes every incoming read end into `rank`, including the loopback
/// entry. Called at the very end of `finalize`, after the worker has
/// joined.
pub fn close_my_incoming_transfer_read_fds(rank: usize, world_size: usize) {
    for i in 0..world_size {
        close_quiet(read_fd(i, rank));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::unistd::{close, pipe, write};
    use std::os::unix::io::IntoRawFd;

    #[test]
    fn fd_numbering_matches_formula() {
        assert_eq!(read_fd(0, 0), 20);
        assert_eq!(write_fd(0, 0), 21);
        assert_eq!(read_fd(1, 0), 20 + 2 * 16);
        assert_eq!(read_fd(0, 1), 22);
    }

    #[test]
    fn full_read_write_round_trip_over_real_pipe() {
        let (r, w) = pipe().expect("pipe");
        let (r, w) = (r.into_raw_fd(), w.into_raw_fd());
        let payload = b"hello mesh";
        full_write(w, payload).unwrap();
        let mut buf = [0u8; 10];
        match full_read(r, &mut buf).unwrap() {
            ReadOutcome::Filled => {}
            ReadOutcome::EndOfStream => panic!("unexpected EOF"),
        }
        assert_eq!(&buf, payload);
        close(r).unwrap();
        close(w).unwrap();
    }

    #[test]
    fn full_read_reports_end_of_stream_on_early_close() {
        let (r, w) = pipe().expect("pipe");
        let (r, w) = (r.into_raw_fd(), w.into_raw_fd());
        close(w).unwrap();
        let mut buf = [0u8; 4];
        match full_read(r, &mut buf).unwrap() {
            ReadOutcome::EndOfStream => {}
            ReadOutcome::Filled => panic!("expected EOF on an immediately-closed writer"),
        }
        close(r).unwrap();
    }

    #[test]
    fn poll_readiness_reports_readable_then_hangup() {
        let (r, w) = pipe().expect("pipe");
        let (r, w) = (r.into_raw_fd(), w.into_raw_fd());
        write(w, b"x").unwrap();
        let states = poll_readiness(&[r]).unwrap();
        assert_eq!(states, vec![Readiness::Readable]);
        let mut buf = [0u8; 1];
        full_read(r, &mut buf).unwrap();
        close(w).unwrap();
        let states = poll_readiness(&[r]).unwrap();
        assert_eq!(states, vec![Readiness::HungUp]);
        close(r).unwrap();
    }
}
