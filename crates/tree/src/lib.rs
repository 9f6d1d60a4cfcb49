pub mod axes;
pub mod node;

pub use axes::Axis;
pub use node::{NodeType, QName, ScalarValue, TreeNode};

// Re-export test utilities for integration testing in downstream crates
pub use node::tests;
