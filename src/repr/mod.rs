//! Model representation: parameter vectors, trees, and forests.

mod forest;
mod tree;
mod vector;

pub use forest::Forest;
pub use tree::Tree;
pub use vector::ParamVec;
