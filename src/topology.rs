//! The implicit binary heap laid over ranks that every collective routes
//! through, rooted at rank 0.

/// `parent(v) = (v-1)/2`. Rank 0 has no parent; callers must not call this
/// with `v == 0`.
pub fn parent(v: usize) -> usize {
    debug_assert!(v > 0, "rank 0 has no parent");
    (v - 1) / 2
}

/// The (at most two) children of `v` that are within `[0, world_size)`.
pub fn children(v: usize, world_size: usize) -> Vec<usize> {
    let mut out = Vec::with_capacity(2);
    let left = 2 * v + 1;
    let right = 2 * v + 2;
    if left < world_size {
        out.push(left);
    }
    if right < world_size {
        out.push(right);
    }
    out
}

/// True if `v` lies on the path from `root` up to rank 0 (inclusive of
/// both ends), i.e. `v == root` or `v` is an ancestor of `root` reached by
/// repeatedly applying `parent`.
pub fn is_on_path_to_root(v: usize, root: usize) -> bool {
    if v == root {
        return true;
    }
    let mut curr = root;
    while curr != 0 {
        curr = parent(curr);
        if curr == v {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_and_children_agree() {
        for v in 1..16usize {
            let p = parent(v);
            assert!(children(p, 16).contains(&v));
        }
    }

    #[test]
    fn children_are_bounded_by_world_size() {
        assert_eq!(children(0, 1), Vec::<usize>::new());
        assert_eq!(children(0, 2), vec![1]);
        assert_eq!(children(0, 3), vec![1, 2]);
        assert_eq!(children(1, 4), vec![3]);
    }

    #[test]
    fn path_to_root_follows_parent_chain() {
        // Heap over 7 ranks: 0 -> {1,2}; 1 -> {3,4}; 2 -> {5,6}
        assert!(is_on_path_to_root(0, 6));
        assert!(is_on_path_to_root(2, 6));
        assert!(is_on_path_to_root(6, 6));
        assert!(!is_on_path_to_root(1, 6));
        assert!(!is_on_path_to_root(3, 6));
    }

    #[test]
    fn logical_root_zero_path_is_trivial() {
        assert!(is_on_path_to_root(0, 0));
        assert!(!is_on_path_to_root(1, 0));
    }
}
