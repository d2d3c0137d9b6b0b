use crate::core::MergeError;
use crate::manifest::document::Element;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How two declarations are compared when deciding whether a split's
/// declaration is already present in the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DedupPolicy {
    /// Same tag and the same attribute set, in any order. Children and text
    /// are ignored, so two `<activity>` elements that differ only in their
    /// intent filters count as one.
    #[default]
    #[serde(rename = "shallow")]
    ShallowAttributeEquality,

    /// Shallow equality, plus child elements equal pairwise in order and
    /// equal trimmed text. Comments and whitespace are ignored.
    #[serde(rename = "deep")]
    DeepStructuralEquality,
}

impl DedupPolicy {
    pub fn same_declaration(&self, a: &Element, b: &Element) -> bool {
        match self {
            DedupPolicy::ShallowAttributeEquality => shallow_eq(a, b),
            DedupPolicy::DeepStructuralEquality => deep_eq(a, b),
        }
    }
}

impl fmt::Display for DedupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupPolicy::ShallowAttributeEquality => f.write_str("shallow"),
            DedupPolicy::DeepStructuralEquality => f.write_str("deep"),
        }
    }
}

impl FromStr for DedupPolicy {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shallow" => Ok(DedupPolicy::ShallowAttributeEquality),
            "deep" => Ok(DedupPolicy::DeepStructuralEquality),
            other => Err(MergeError::Config(format!(
                "Unknown dedup policy '{}'. Expected 'shallow' or 'deep'",
                other
            ))),
        }
    }
}

fn shallow_eq(a: &Element, b: &Element) -> bool {
    // Attribute names are unique within an element, so equal length plus
    // containment is set equality.
    a.name == b.name
        && a.attributes.len() == b.attributes.len()
        && a
            .attributes
            .iter()
            .all(|(name, value)| b.attribute(name) == Some(value.as_str()))
}

fn deep_eq(a: &Element, b: &Element) -> bool {
    if !shallow_eq(a, b) || a.text().trim() != b.text().trim() {
        return false;
    }

    let a_children: Vec<&Element> = a.child_elements().collect();
    let b_children: Vec<&Element> = b.child_elements().collect();
    a_children.len() == b_children.len()
        && a_children
            .iter()
            .zip(&b_children)
            .all(|(x, y)| deep_eq(x, y))
}
