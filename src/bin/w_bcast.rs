//! `N=4`, `bcast(data, root=2)`; rank 2 starts with `[1, 2, 3, 4]` and
//! every rank must end up with that value.

fn main() {
    env_logger::init();
    rankmesh::init(false).expect("init failed");

    let rank = rankmesh::world_rank();
    let mut data = if rank == 2 { [1u8, 2, 3, 4] } else { [0u8; 4] };

    rankmesh::bcast(&mut data, 2).expect("bcast failed");
    assert_eq!(data, [1, 2, 3, 4], "rank {rank} did not receive the broadcast value");

    rankmesh::finalize();
}
