//! Barrier, broadcast, and reduce, all routed over the implicit heap
//! tree in `topology.rs`, rooted at rank 0.

use crate::context::{do_recv, do_send, with_rank_and_size};
use crate::error::Result;
use crate::frame::{BARRIER_TAG, BCAST_TAG, REDUCE_TAG};
use crate::topology::{children, is_on_path_to_root, parent};

const BARRIER_WAIT: u8 = 10;
const BARRIER_WAKE: u8 = 20;

/// No rank returns before every rank has entered. Any point-to-point
/// error encountered is propagated immediately.
pub fn barrier() -> Result<()> {
    with_rank_and_size(|rank, world_size| {
        let kids = children(rank, world_size);

        for &child in &kids {
            let mut buf = [0u8];
            do_recv(&mut buf, child, BARRIER_TAG)?;
            debug_assert_eq!(buf[0], BARRIER_WAIT);
        }

        if rank != 0 {
            do_send(&[BARRIER_WAIT], parent(rank), BARRIER_TAG)?;
            let mut buf = [0u8];
            do_recv(&mut buf, parent(rank), BARRIER_TAG)?;
            debug_assert_eq!(buf[0], BARRIER_WAKE);
        }

        for &child in &kids {
            do_send(&[BARRIER_WAKE], child, BARRIER_TAG)?;
        }
        Ok(())
    })
}

/// After this returns `Ok(())` on every rank, every rank's `data` equals
/// the root's input `data`.
///
/// Two waves: an upward wave carries the authoritative payload from
/// `root` up to rank 0 along heap-parent links (skipped entirely when
/// `root == 0`); a downward wave then floods the final payload to every
/// rank.
pub fn bcast(data: &mut [u8], root: i32) -> Result<()> {
    with_rank_and_size(|rank, world_size| {
        if root < 0 || root as usize >= world_size {
            return Err(crate::error::Error::NoSuchRank(root));
        }
        let root = root as usize;
        let kids = children(rank, world_size);
        let count = data.len();

        let mut scratch = vec![0u8; count];
        for &child in &kids {
            do_recv(&mut scratch, child, BCAST_TAG)?;
            if is_on_path_to_root(child, root) {
                data.copy_from_slice(&scratch);
            }
        }

        if rank != 0 {
            do_send(data, parent(rank), BCAST_TAG)?;
            do_recv(data, parent(rank), BCAST_TAG)?;
        }

        for &child in &kids {
            do_send(data, child, BCAST_TAG)?;
        }
        Ok(())
    })
}

/// Lane-wise reduction operator over wrapping, unsigned 8-bit values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Max,
    Min,
    Sum,
    Prod,
}

impl Op {
    fn apply(self, a: u8, b: u8) -> u8 {
        match self {
            Op::Max => a.max(b),
            Op::Min => a.min(b),
            Op::Sum => a.wrapping_add(b),
            Op::Prod => a.wrapping_mul(b),
        }
    }
}

fn reduce_lanes(partial: &mut [u8], update: &[u8], op: Op) {
    for (p, u) in partial.iter_mut().zip(update.iter()) {
        *p = op.apply(*p, *u);
    }
}

/// After this returns `Ok(())` on every rank, `recv[i]` at the rank
/// matching `root` equals `op` folded over every rank's `send[i]`, for
/// each lane `i`.
///
/// The reduction tree is always rooted at rank 0: the upward wave always
/// reduces to rank 0, and the final value is then flooded down the same
/// tree to every rank, so whichever rank equals `root` picks it up
/// during that downward wave.
pub fn reduce(send: &[u8], recv: &mut [u8], op: Op, root: i32) -> Result<()> {
    with_rank_and_size(|rank, world_size| {
        if root < 0 || root as usize >= world_size {
            return Err(crate::error::Error::NoSuchRank(root));
        }
        let root = root as usize;
        let kids = children(rank, world_size);
        let count = send.len();

        let mut partial = send.to_vec();
        let mut scratch = vec![0u8; count];
        for &child in &kids {
            do_recv(&mut scratch, child, REDUCE_TAG)?;
            reduce_lanes(&mut partial, &scratch, op);
        }

        if rank != 0 {
            do_send(&partial, parent(rank), REDUCE_TAG)?;
            do_recv(&mut partial, parent(rank), REDUCE_TAG)?;
        }

        if rank == root {
            recv.copy_from_slice(&partial);
        }

        for &child in &kids {
            do_send(&partial, child, REDUCE_TAG)?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sum_wraps_like_u8() {
        assert_eq!(Op::Sum.apply(250, 10), 4);
    }

    #[test]
    fn prod_wraps_like_u8() {
        assert_eq!(Op::Prod.apply(200, 2), 144); // 400 mod 256
    }

    #[test]
    fn max_min_are_plain_comparisons() {
        assert_eq!(Op::Max.apply(3, 9), 9);
        assert_eq!(Op::Min.apply(3, 9), 3);
    }

    #[test]
    fn reduce_lanes_applies_elementwise() {
        let mut partial = vec![1u8, 2, 3];
        reduce_lanes(&mut partial, &[10, 20, 30], Op::Sum);
        assert_eq!(partial, vec![11, 22, 33]);
    }
}
