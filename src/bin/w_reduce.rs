//! `N=4`, `reduce` with `SUM`, root 0; rank `r` contributes
//! `[r+1, r+1, r+1, r+1]`, and the root's result is `[10, 10, 10, 10]`
//! under wrapping 8-bit addition.

use rankmesh::Op;

fn main() {
    env_logger::init();
    rankmesh::init(false).expect("init failed");

    let rank = rankmesh::world_rank();
    let send = [rank as u8 + 1; 4];
    let mut recv = [0u8; 4];

    rankmesh::reduce(&send, &mut recv, Op::Sum, 0).expect("reduce failed");

    if rank == 0 {
        assert_eq!(recv, [10, 10, 10, 10], "unexpected reduced value at the root");
    }

    rankmesh::finalize();
}
