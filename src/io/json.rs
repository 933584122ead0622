//! JSON storage format for trees and forests.
//!
//! Models are stored as JSON objects with sparse fields: a tree is
//! `{Leaf, Params, Feature, Threshold, LessThan, GreaterEqual}` with fields
//! omitted when their zero value applies, and a forest is
//! `{Base, Trees, Weights}`. Serialization goes through mirror structs so
//! the in-memory representation stays free of format concerns.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::repr::{Forest, ParamVec, Tree};

/// Errors from reading or writing stored models.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed model: {0}")]
    Malformed(String),
}

// ============================================================================
// Mirror structs
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct TreeJson {
    #[serde(skip_serializing_if = "is_false")]
    leaf: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    params: Vec<f64>,
    #[serde(skip_serializing_if = "is_zero_u32")]
    feature: u32,
    #[serde(skip_serializing_if = "is_zero_f64")]
    threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    less_than: Option<Box<TreeJson>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    greater_equal: Option<Box<TreeJson>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct ForestJson {
    base: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    trees: Vec<TreeJson>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    weights: Vec<f64>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero_u32(value: &u32) -> bool {
    *value == 0
}

fn is_zero_f64(value: &f64) -> bool {
    *value == 0.0
}

impl From<&Tree> for TreeJson {
    fn from(tree: &Tree) -> Self {
        match tree {
            Tree::Leaf { params } => TreeJson {
                leaf: true,
                params: params.as_slice().to_vec(),
                ..TreeJson::default()
            },
            Tree::Branch {
                feature,
                threshold,
                less_than,
                greater_equal,
            } => TreeJson {
                feature: *feature,
                threshold: *threshold,
                less_than: Some(Box::new(TreeJson::from(less_than.as_ref()))),
                greater_equal: Some(Box::new(TreeJson::from(greater_equal.as_ref()))),
                ..TreeJson::default()
            },
        }
    }
}

impl TryFrom<TreeJson> for Tree {
    type Error = PersistError;

    fn try_from(json: TreeJson) -> Result<Self, PersistError> {
        if json.leaf {
            return Ok(Tree::leaf(ParamVec::from(json.params)));
        }
        match (json.less_than, json.greater_equal) {
            (Some(less_than), Some(greater_equal)) => Ok(Tree::branch(
                json.feature,
                json.threshold,
                Tree::try_from(*less_than)?,
                Tree::try_from(*greater_equal)?,
            )),
            _ => Err(PersistError::Malformed(
                "branch node is missing a child".into(),
            )),
        }
    }
}

impl From<&Forest> for ForestJson {
    fn from(forest: &Forest) -> Self {
        ForestJson {
            base: forest.base().as_slice().to_vec(),
            trees: forest.trees().map(TreeJson::from).collect(),
            weights: forest.weights().to_vec(),
        }
    }
}

impl TryFrom<ForestJson> for Forest {
    type Error = PersistError;

    fn try_from(json: ForestJson) -> Result<Self, PersistError> {
        if json.trees.len() != json.weights.len() {
            return Err(PersistError::Malformed(format!(
                "{} trees but {} weights",
                json.trees.len(),
                json.weights.len()
            )));
        }
        let mut forest = Forest::with_base(ParamVec::from(json.base));
        for (tree, weight) in json.trees.into_iter().zip(json.weights) {
            forest.add(Tree::try_from(tree)?, weight);
        }
        Ok(forest)
    }
}

// ============================================================================
// Read / write entry points
// ============================================================================

/// Serialize a tree as JSON.
pub fn write_tree<W: Write>(tree: &Tree, writer: W) -> Result<(), PersistError> {
    serde_json::to_writer(writer, &TreeJson::from(tree))?;
    Ok(())
}

/// Deserialize a tree from JSON.
pub fn read_tree<R: Read>(reader: R) -> Result<Tree, PersistError> {
    let json: TreeJson = serde_json::from_reader(reader)?;
    Tree::try_from(json)
}

/// Serialize a forest as JSON.
pub fn write_forest<W: Write>(forest: &Forest, writer: W) -> Result<(), PersistError> {
    serde_json::to_writer(writer, &ForestJson::from(forest))?;
    Ok(())
}

/// Deserialize a forest from JSON.
pub fn read_forest<R: Read>(reader: R) -> Result<Forest, PersistError> {
    let json: ForestJson = serde_json::from_reader(reader)?;
    Forest::try_from(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_forest() -> Forest {
        let mut forest = Forest::with_base(ParamVec::from(vec![0.25, -0.25]));
        forest.add(
            Tree::branch(
                2,
                1.5,
                Tree::leaf(ParamVec::from(vec![1.0, 0.0])),
                Tree::branch(
                    0,
                    -0.5,
                    Tree::leaf(ParamVec::from(vec![0.0, 0.0])),
                    Tree::leaf(ParamVec::from(vec![-1.0, 2.0])),
                ),
            ),
            0.3,
        );
        forest.add(Tree::leaf(ParamVec::from(vec![0.5, 0.5])), -0.1);
        forest
    }

    #[test]
    fn forest_round_trips() {
        let forest = sample_forest();

        let mut buffer = Vec::new();
        write_forest(&forest, &mut buffer).unwrap();
        let loaded = read_forest(buffer.as_slice()).unwrap();

        assert_eq!(forest, loaded);
        for features in [[0.0, 0.0, 0.0], [1.0, 0.0, 2.0], [-1.0, 0.0, 2.0]] {
            assert_eq!(forest.apply(&features), loaded.apply(&features));
        }
    }

    #[test]
    fn tree_round_trips() {
        let tree = Tree::branch(
            1,
            0.5,
            Tree::leaf(ParamVec::from(vec![1.0])),
            Tree::leaf(ParamVec::from(vec![-1.0])),
        );

        let mut buffer = Vec::new();
        write_tree(&tree, &mut buffer).unwrap();
        assert_eq!(tree, read_tree(buffer.as_slice()).unwrap());
    }

    #[test]
    fn zero_valued_fields_are_omitted() {
        let tree = Tree::branch(
            0,
            1.0,
            Tree::leaf(ParamVec::from(vec![0.5])),
            Tree::leaf(ParamVec::from(vec![-0.5])),
        );

        let mut buffer = Vec::new();
        write_tree(&tree, &mut buffer).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();

        // The branch has feature 0 and is not a leaf, so neither field is
        // written; the children and threshold are.
        let object = value.as_object().unwrap();
        assert!(!object.contains_key("Leaf"));
        assert!(!object.contains_key("Feature"));
        assert!(!object.contains_key("Params"));
        assert_eq!(object["Threshold"], 1.0);
        assert!(object.contains_key("LessThan"));
        assert!(object.contains_key("GreaterEqual"));
        assert_eq!(object["LessThan"]["Leaf"], true);
    }

    #[test]
    fn missing_child_is_malformed() {
        let result = read_tree(r#"{"Feature": 1, "LessThan": {"Leaf": true}}"#.as_bytes());
        assert!(matches!(result, Err(PersistError::Malformed(_))));
    }

    #[test]
    fn mismatched_weights_are_malformed() {
        let result = read_forest(r#"{"Base": [0.0], "Trees": [{"Leaf": true, "Params": [1.0]}], "Weights": []}"#.as_bytes());
        assert!(matches!(result, Err(PersistError::Malformed(_))));
    }
}
