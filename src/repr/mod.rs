//! Canonical tree and ensemble representations.

pub mod ensemble;
pub mod tree;

pub use ensemble::TreeEnsemble;
pub use tree::TreeNode;
