//! `N=2`: rank 0 sends `[0xAA, 0xBB]` tagged `7` to rank 1, which
//! receives it and checks the payload.

use rankmesh::Tag;

fn main() {
    env_logger::init();
    rankmesh::init(false).expect("init failed");

    let tag = Tag::new(7).unwrap();
    match rankmesh::world_rank() {
        0 => {
            rankmesh::send(&[0xAA, 0xBB], 1, tag).expect("send failed");
        }
        1 => {
            let mut buf = [0u8; 2];
            rankmesh::recv(&mut buf, 0, tag).expect("recv failed");
            assert_eq!(buf, [0xAA, 0xBB], "payload mismatch");
        }
        r => panic!("w_ping expects exactly 2 ranks, got rank {r}"),
    }

    rankmesh::finalize();
}
