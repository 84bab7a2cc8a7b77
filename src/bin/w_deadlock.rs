//! `N=2`, detection on; both ranks block in `recv` from each other for a
//! key neither side ever sends, and both must observe `DeadlockDetected`
//! in finite time.

use rankmesh::{Error, Tag};

fn main() {
    env_logger::init();
    rankmesh::init(true).expect("init failed");

    let rank = rankmesh::world_rank();
    let other = 1 - rank;
    let mut buf = [0u8; 1];
    match rankmesh::recv(&mut buf, other, Tag::new(99).unwrap()) {
        Err(Error::DeadlockDetected) => {}
        other => panic!("expected DeadlockDetected, got {other:?}"),
    }

    rankmesh::finalize();
}
