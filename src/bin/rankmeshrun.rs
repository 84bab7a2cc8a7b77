//! The launcher: wires up a full mesh of unidirectional pipes between
//! every ordered pair of `N` ranks, forks one child per rank, execs the
//! target program in each with `RANKMESH_WORLD_RANK`/
//! `RANKMESH_WORLD_SIZE` set, and waits for all of them. Exit status is
//! the largest nonzero child exit code, or 0 if every child exited
//! cleanly.

use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{close, dup2, execvp, fork, pipe, ForkResult};
use rankmesh::config::{MAX_WORLD_SIZE, WorldConfig};
use rankmesh::io::{close_quiet, read_fd, write_fd};
use std::ffi::CString;
use std::os::unix::io::IntoRawFd;

fn usage(program: &str) -> ! {
    eprintln!("usage: {program} <n> <program> [args...]");
    std::process::exit(2);
}

fn main() {
    env_logger::init();
    let mut args = std::env::args();
    let launcher_name = args.next().unwrap_or_else(|| "rankmeshrun".to_string());
    let n_arg = args.next().unwrap_or_else(|| usage(&launcher_name));
    let target = args.next().unwrap_or_else(|| usage(&launcher_name));
    let target_args: Vec<String> = args.collect();

    let n: usize = match n_arg.parse() {
        Ok(n) if (1..=MAX_WORLD_SIZE).contains(&n) => n,
        _ => {
            log::error!("rankmeshrun: <n> must be an integer in 1..={MAX_WORLD_SIZE}, got {n_arg:?}");
            std::process::exit(2);
        }
    };

    // Build the full N*N mesh before forking: every child inherits the
    // whole table and then closes everything it doesn't own.
    for i in 0..n {
        for j in 0..n {
            let (r, w) = pipe().unwrap_or_else(|e| {
                log::error!("rankmeshrun: pipe() failed: {e}");
                std::process::exit(1);
            });
            dup_fd(r.into_raw_fd(), read_fd(i, j));
            dup_fd(w.into_raw_fd(), write_fd(i, j));
        }
    }

    let mut children = Vec::with_capacity(n);
    for i in 0..n {
        // SAFETY: the child immediately execs or exits; no heap allocation
        // or locking happens on the child side of the fork beyond what
        // `execvp`'s own argument-building below performs before the call.
        match unsafe { fork() } {
            Ok(ForkResult::Parent { child, .. }) => children.push(child),
            Ok(ForkResult::Child) => {
                run_child(i, n, &target, &target_args);
            }
            Err(e) => {
                log::error!("rankmeshrun: fork() failed: {e}");
                std::process::exit(1);
            }
        }
    }

    close_all_transfer_fds(n);

    let mut ret = 0i32;
    for child in children {
        match waitpid(child, None) {
            Ok(WaitStatus::Exited(_, code)) if code != 0 => ret = ret.max(code),
            Ok(_) => {}
            Err(e) => {
                log::error!("rankmeshrun: waitpid failed: {e}");
                ret = 1;
            }
        }
    }
    std::process::exit(ret);
}

fn dup_fd(from: i32, to: i32) {
    if from == to {
        return;
    }
    if let Err(e) = dup2(from, to) {
        log::error!("rankmeshrun: dup2({from}, {to}) failed: {e}");
        std::process::exit(1);
    }
    if let Err(e) = close(from) {
        log::warn!("rankmeshrun: close({from}) after dup2 failed: {e}");
    }
}

fn run_child(rank: usize, world_size: usize, target: &str, target_args: &[String]) -> ! {
    for (name, value) in WorldConfig::env_pair(rank, world_size) {
        std::env::set_var(name, value);
    }

    let program = CString::new(target.as_bytes()).expect("program path must not contain NUL bytes");
    let mut argv = vec![program.clone()];
    argv.extend(target_args.iter().map(|a| CString::new(a.as_bytes()).expect("argument must not contain NUL bytes")));

    match execvp(&program, &argv) {
        Ok(_infallible) => unreachable!("execvp only returns on error"),
        Err(e) => {
            log::error!("rankmeshrun: execvp({target:?}) failed: {e}");
            std::process::exit(127);
        }
    }
}

/// Closes every fd this launcher dup'd, once every child has its own
/// copies — the parent never reads or writes the mesh itself.
fn close_all_transfer_fds(world_size: usize) {
    for i in 0..world_size {
        for j in 0..world_size {
            close_quiet(read_fd(i, j));
            close_quiet(write_fd(i, j));
        }
    }
}
