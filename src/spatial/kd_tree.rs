use serde::{Deserialize, Serialize};

use crate::spatial::projection::euclidean;

/// Node in a 3D k-d tree over projected node positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KDNode {
    pub point: [f64; 3],
    /// Caller-supplied identifier carried through queries (a node id).
    pub index: usize,
    pub axis: usize,
    pub left: Option<Box<KDNode>>,
    pub right: Option<Box<KDNode>>,
}

/// 3D k-d tree supporting radius queries in Earth-centred kilometres.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KDTree {
    pub root: Option<Box<KDNode>>,
}

impl KDTree {
    /// Builds a tree from `(index, point)` pairs. Points must be finite.
    pub fn build(entries: &[(usize, [f64; 3])]) -> Self {
        let mut slots: Vec<usize> = (0..entries.len()).collect();
        let root = Self::build_recursive(entries, &mut slots, 0);
        KDTree { root }
    }

    fn build_recursive(
        entries: &[(usize, [f64; 3])],
        slots: &mut [usize],
        depth: usize,
    ) -> Option<Box<KDNode>> {
        if slots.is_empty() {
            return None;
        }

        let axis = depth % 3;
        slots.sort_by(|&a, &b| entries[a].1[axis].total_cmp(&entries[b].1[axis]));
        let mid = slots.len() / 2;
        let (index, point) = entries[slots[mid]];

        let (lower, rest) = slots.split_at_mut(mid);
        Some(Box::new(KDNode {
            point,
            index,
            axis,
            left: Self::build_recursive(entries, lower, depth + 1),
            right: Self::build_recursive(entries, &mut rest[1..], depth + 1),
        }))
    }

    /// Returns every `(index, distance)` whose point lies within `radius`
    /// (inclusive) of `target`, sorted by index.
    pub fn within_radius(&self, target: [f64; 3], radius: f64) -> Vec<(usize, f64)> {
        let mut results = Vec::new();
        Self::search_recursive(&self.root, target, radius, &mut results);
        results.sort_unstable_by_key(|&(idx, _)| idx);
        results
    }

    fn search_recursive(
        node: &Option<Box<KDNode>>,
        target: [f64; 3],
        radius: f64,
        results: &mut Vec<(usize, f64)>,
    ) {
        if let Some(noderef) = node {
            let dist = euclidean(noderef.point, target);
            if dist <= radius {
                results.push((noderef.index, dist));
            }

            let axis = noderef.axis;
            let delta = target[axis] - noderef.point[axis];
            let (first, second) = if delta < 0.0 {
                (&noderef.left, &noderef.right)
            } else {
                (&noderef.right, &noderef.left)
            };

            Self::search_recursive(first, target, radius, results);
            if delta.abs() <= radius {
                Self::search_recursive(second, target, radius, results);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::KDTree;

    #[test]
    fn within_radius_basic() {
        let pts = [
            (10, [0.0, 0.0, 0.0]),
            (11, [1.0, 0.0, 0.0]),
            (12, [2.0, 2.0, 0.0]),
            (13, [0.0, 2.0, 0.0]),
        ];
        let kd = KDTree::build(&pts);
        let res = kd.within_radius([0.0, 0.0, 0.0], 1.5);
        let ids: Vec<usize> = res.iter().map(|&(i, _)| i).collect();
        assert_eq!(ids, vec![10, 11]);
    }

    #[test]
    fn radius_is_inclusive_for_candidates() {
        let pts = [(0, [0.0, 0.0, 0.0]), (1, [3.0, 0.0, 0.0])];
        let kd = KDTree::build(&pts);
        assert_eq!(kd.within_radius([0.0, 0.0, 0.0], 3.0).len(), 2);
    }

    #[test]
    fn empty_tree_finds_nothing() {
        let kd = KDTree::build(&[]);
        assert!(kd.root.is_none());
        assert!(kd.within_radius([0.0, 0.0, 0.0], 1.0e9).is_empty());
    }
}
