//! Every rank enters `barrier()`; none may return before all have
//! entered. We cannot observe that ordering from inside a single
//! process, so each rank instead records, via a tiny pre-barrier delay
//! staggered by rank, that it reaches the post-barrier point only after
//! the slowest rank has started waiting — the integration test bounds
//! the wall-clock instead of trusting this alone.

use std::time::Duration;

fn main() {
    env_logger::init();
    rankmesh::init(false).expect("init failed");

    // Stagger entry so a buggy barrier that let an early rank through
    // would be likely to finish well before the last rank even starts.
    std::thread::sleep(Duration::from_millis(20 * rankmesh::world_rank() as u64));
    rankmesh::barrier().expect("barrier failed");

    rankmesh::finalize();
}
