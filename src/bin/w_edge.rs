//! Two boundary behaviors that need two live processes to exercise: a
//! zero-byte payload round-trip, and `send` to a peer that has already
//! finalized returning `RemoteFinished`.

use rankmesh::{Error, Tag};
use std::thread::sleep;
use std::time::Duration;

fn main() {
    env_logger::init();
    rankmesh::init(false).expect("init failed");

    let ack_tag = Tag::new(5).unwrap();
    let stale_tag = Tag::new(6).unwrap();

    match rankmesh::world_rank() {
        0 => {
            rankmesh::send(&[], 1, ack_tag).expect("zero-byte send failed");
            // Give rank 1's worker time to both receive the ack and then
            // observe rank 1 itself close its outgoing channels.
            sleep(Duration::from_millis(80));
            match rankmesh::send(&[0xFF], 1, stale_tag) {
                Err(Error::RemoteFinished) => {}
                other => panic!("expected RemoteFinished sending to a finalized peer, got {other:?}"),
            }
        }
        1 => {
            let mut buf: [u8; 0] = [];
            rankmesh::recv(&mut buf, 0, ack_tag).expect("zero-byte recv failed");
        }
        r => panic!("w_edge expects exactly 2 ranks, got rank {r}"),
    }

    rankmesh::finalize();
}
