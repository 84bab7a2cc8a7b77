//! End-to-end scenarios, driven by actually launching `rankmeshrun` over
//! one of the `w_*` worker binaries and checking its exit status — the
//! worker binaries themselves assert the property under test and abort
//! the process on failure.

use std::process::Command;
use std::time::{Duration, Instant};

fn launcher() -> &'static str {
    env!("CARGO_BIN_EXE_rankmeshrun")
}

#[test]
fn ping_delivers_the_payload() {
    let status = Command::new(launcher())
        .arg("2")
        .arg(env!("CARGO_BIN_EXE_w_ping"))
        .status()
        .expect("failed to launch rankmeshrun");
    assert!(status.success(), "w_ping scenario failed: {status:?}");
}

#[test]
fn barrier_holds_every_rank_until_all_have_entered() {
    let start = Instant::now();
    let status = Command::new(launcher())
        .arg("3")
        .arg(env!("CARGO_BIN_EXE_w_barrier"))
        .status()
        .expect("failed to launch rankmeshrun");
    assert!(status.success(), "w_barrier scenario failed: {status:?}");
    // Rank 2 sleeps 40ms before entering; if the barrier let rank 0 return
    // early the whole run could finish much faster than that.
    assert!(start.elapsed() >= Duration::from_millis(35));
}

#[test]
fn bcast_delivers_the_root_value_to_everyone() {
    let status = Command::new(launcher())
        .arg("4")
        .arg(env!("CARGO_BIN_EXE_w_bcast"))
        .status()
        .expect("failed to launch rankmeshrun");
    assert!(status.success(), "w_bcast scenario failed: {status:?}");
}

#[test]
fn reduce_sums_every_ranks_contribution() {
    let status = Command::new(launcher())
        .arg("4")
        .arg(env!("CARGO_BIN_EXE_w_reduce"))
        .status()
        .expect("failed to launch rankmeshrun");
    assert!(status.success(), "w_reduce scenario failed: {status:?}");
}

#[test]
fn a_receive_receive_cycle_is_detected_on_both_sides() {
    let status = Command::new(launcher())
        .arg("2")
        .arg(env!("CARGO_BIN_EXE_w_deadlock"))
        .status()
        .expect("failed to launch rankmeshrun");
    assert!(status.success(), "w_deadlock scenario failed: {status:?}");
}

#[test]
fn finalize_unblocks_a_peer_parked_in_recv() {
    let status = Command::new(launcher())
        .arg("2")
        .arg(env!("CARGO_BIN_EXE_w_finalize_race"))
        .status()
        .expect("failed to launch rankmeshrun");
    assert!(status.success(), "w_finalize_race scenario failed: {status:?}");
}

#[test]
fn zero_byte_payload_round_trips_and_send_after_finalize_is_reported() {
    let status = Command::new(launcher())
        .arg("2")
        .arg(env!("CARGO_BIN_EXE_w_edge"))
        .status()
        .expect("failed to launch rankmeshrun");
    assert!(status.success(), "w_edge scenario failed: {status:?}");
}

#[test]
fn a_lone_rank_fails_point_to_point_but_collectives_still_succeed() {
    let status = Command::new(launcher())
        .arg("1")
        .arg(env!("CARGO_BIN_EXE_w_solo"))
        .status()
        .expect("failed to launch rankmeshrun");
    assert!(status.success(), "w_solo scenario failed: {status:?}");
}
