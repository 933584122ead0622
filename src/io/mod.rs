//! Model persistence.

mod json;

pub use json::{read_forest, read_tree, write_forest, write_tree, PersistError};
