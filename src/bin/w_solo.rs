//! `N=1` boundary: with no peers, every point-to-point call must fail
//! (`SelfOp` targeting itself, `NoSuchRank` targeting anyone else),
//! while all three collectives still succeed trivially.

use rankmesh::{Error, Op, Tag};

fn main() {
    env_logger::init();
    rankmesh::init(false).expect("init failed");

    assert_eq!(rankmesh::world_size(), 1);
    assert_eq!(rankmesh::world_rank(), 0);

    let tag = Tag::new(1).unwrap();
    match rankmesh::send(&[0u8], 0, tag) {
        Err(Error::SelfOp) => {}
        other => panic!("expected SelfOp sending to self, got {other:?}"),
    }
    match rankmesh::send(&[0u8], 1, tag) {
        Err(Error::NoSuchRank(1)) => {}
        other => panic!("expected NoSuchRank, got {other:?}"),
    }

    let mut buf = [0u8; 1];
    match rankmesh::recv(&mut buf, 0, tag) {
        Err(Error::SelfOp) => {}
        other => panic!("expected SelfOp receiving from self, got {other:?}"),
    }

    rankmesh::barrier().expect("barrier should succeed trivially with one rank");

    let mut data = [7u8, 8, 9];
    rankmesh::bcast(&mut data, 0).expect("bcast should succeed trivially with one rank");
    assert_eq!(data, [7, 8, 9]);

    let send = [3u8, 4];
    let mut recv = [0u8; 2];
    rankmesh::reduce(&send, &mut recv, Op::Sum, 0).expect("reduce should succeed trivially with one rank");
    assert_eq!(recv, [3, 4]);

    rankmesh::finalize();
}
