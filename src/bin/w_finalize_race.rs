//! `N=2`; rank 0 finalizes immediately without ever sending; rank 1,
//! blocked in `recv(src=0)`, must observe `RemoteFinished`.

use rankmesh::{Error, Tag};

fn main() {
    env_logger::init();
    rankmesh::init(false).expect("init failed");

    match rankmesh::world_rank() {
        0 => {
            // Nothing to send; finalize right away so rank 1's recv unblocks.
        }
        1 => {
            let mut buf = [0u8; 1];
            match rankmesh::recv(&mut buf, 0, Tag::new(1).unwrap()) {
                Err(Error::RemoteFinished) => {}
                other => panic!("expected RemoteFinished, got {other:?}"),
            }
        }
        r => panic!("w_finalize_race expects exactly 2 ranks, got rank {r}"),
    }

    rankmesh::finalize();
}
