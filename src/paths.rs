//! Leaf path extraction.
//!
//! Every leaf of a tree is reached by one sequence of split decisions. This
//! module walks a [`TreeNode`] and yields, per leaf, the split features,
//! thresholds and branch directions on the way down, together with the leaf
//! output.
//!
//! Traversal uses an explicit work stack, so arbitrarily deep trees do not
//! grow the call stack. Leaves come out left to right: at every split the
//! left subtree is fully visited before the right one. Leaf ids assigned
//! downstream therefore follow this order.

use crate::repr::TreeNode;

/// Which side of a split a path takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// `x[feature] <= threshold`
    Left,
    /// `x[feature] > threshold`
    Right,
}

impl Direction {
    /// `-1` for left, `+1` for right.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
        }
    }
}

/// The splits leading from the root to one leaf, and the leaf's output.
///
/// `features`, `thresholds` and `directions` are aligned: entry `i` of each
/// describes the `i`-th split on the path.
#[derive(Debug, Clone, PartialEq)]
pub struct LeafPath {
    pub features: Vec<usize>,
    pub thresholds: Vec<f64>,
    pub directions: Vec<Direction>,
    pub value: f64,
}

impl LeafPath {
    /// Number of splits on the path (the leaf's depth).
    #[inline]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the leaf is the root itself.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// The leaf value repeated once per split edge.
    pub fn leaf_values(&self) -> Vec<f64> {
        vec![self.value; self.len()]
    }

    /// Iterate over `(feature, threshold, direction)` triples, root first.
    pub fn splits(&self) -> impl Iterator<Item = (usize, f64, Direction)> + '_ {
        self.features
            .iter()
            .zip(&self.thresholds)
            .zip(&self.directions)
            .map(|((&f, &t), &d)| (f, t, d))
    }

    /// Whether `features` satisfies every split on the path.
    ///
    /// # Panics
    ///
    /// Panics if a split references a feature beyond `features.len()`.
    pub fn contains(&self, features: &[f64]) -> bool {
        self.splits().all(|(f, t, d)| match d {
            Direction::Left => features[f] <= t,
            Direction::Right => features[f] > t,
        })
    }
}

/// Work-stack entry: a node and the path that reached it.
struct Pending<'a> {
    node: &'a TreeNode,
    features: Vec<usize>,
    thresholds: Vec<f64>,
    directions: Vec<Direction>,
}

/// Iterator over the [`LeafPath`]s of one tree, left to right.
pub struct LeafPaths<'a> {
    stack: Vec<Pending<'a>>,
}

impl<'a> LeafPaths<'a> {
    /// Start a traversal at `root`.
    pub fn new(root: &'a TreeNode) -> Self {
        Self {
            stack: vec![Pending {
                node: root,
                features: Vec::new(),
                thresholds: Vec::new(),
                directions: Vec::new(),
            }],
        }
    }
}

impl Iterator for LeafPaths<'_> {
    type Item = LeafPath;

    fn next(&mut self) -> Option<LeafPath> {
        while let Some(entry) = self.stack.pop() {
            match entry.node {
                TreeNode::Leaf { value } => {
                    return Some(LeafPath {
                        features: entry.features,
                        thresholds: entry.thresholds,
                        directions: entry.directions,
                        value: *value,
                    });
                }
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let mut features = entry.features;
                    features.push(*feature);
                    let mut thresholds = entry.thresholds;
                    thresholds.push(*threshold);

                    let mut right_dirs = entry.directions.clone();
                    right_dirs.push(Direction::Right);
                    let mut left_dirs = entry.directions;
                    left_dirs.push(Direction::Left);

                    // Right first, so the left child is popped first.
                    self.stack.push(Pending {
                        node: right,
                        features: features.clone(),
                        thresholds: thresholds.clone(),
                        directions: right_dirs,
                    });
                    self.stack.push(Pending {
                        node: left,
                        features,
                        thresholds,
                        directions: left_dirs,
                    });
                }
            }
        }
        None
    }
}

/// All leaf paths of a tree, left to right.
pub fn leaf_paths(tree: &TreeNode) -> Vec<LeafPath> {
    LeafPaths::new(tree).collect()
}
