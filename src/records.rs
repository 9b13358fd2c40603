//! Graph Records
//!
//! Transient vertex and edge records produced by the row transformers and
//! flattened into property maps for the bulk-write statements.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Scalar Values
// ============================================================================

/// A single scalar cell, either read from a source row or written as a
/// node/relationship property.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Whole floats inside this range convert to `i64` without saturating.
const I64_MIN_F64: f64 = i64::MIN as f64;
const I64_MAX_F64: f64 = i64::MAX as f64;

impl Value {
    /// Interpret this cell as a vertex identifier. Null and empty strings have
    /// no identity.
    pub fn to_identifier(&self) -> Option<Identifier> {
        match self {
            Value::Int(i) => Some(Identifier::Int(*i)),
            Value::Text(s) if !s.is_empty() => Some(Identifier::Text(s.clone())),
            Value::Float(f) if f.fract() == 0.0 && (I64_MIN_F64..I64_MAX_F64).contains(f) => {
                Some(Identifier::Int(*f as i64))
            }
            Value::Float(f) => Some(Identifier::Text(f.to_string())),
            Value::Bool(b) => Some(Identifier::Text(b.to_string())),
            _ => None,
        }
    }
}

impl From<Option<String>> for Value {
    fn from(value: Option<String>) -> Self {
        value.map(Value::Text).unwrap_or(Value::Null)
    }
}

// ============================================================================
// Identifiers
// ============================================================================

/// Vertex identity. Kept in the type the source delivered so that the vertex
/// and edge phases match on identical property values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum Identifier {
    Int(i64),
    Text(String),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Int(i) => write!(f, "{}", i),
            Identifier::Text(s) => f.write_str(s),
        }
    }
}

impl From<Identifier> for Value {
    fn from(id: Identifier) -> Self {
        match id {
            Identifier::Int(i) => Value::Int(i),
            Identifier::Text(s) => Value::Text(s),
        }
    }
}

impl From<Option<Identifier>> for Value {
    fn from(id: Option<Identifier>) -> Self {
        id.map(Value::from).unwrap_or(Value::Null)
    }
}

impl From<i64> for Identifier {
    fn from(value: i64) -> Self {
        Identifier::Int(value)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Identifier::Text(value.to_string())
    }
}

/// Flat attribute map submitted as one element of a batch parameter.
pub type PropertyMap = BTreeMap<String, Value>;

/// Anything that can be flattened into one row of an `UNWIND $rows` batch.
pub trait ToProperties {
    fn to_properties(&self) -> PropertyMap;
}

impl<T: ToProperties + ?Sized> ToProperties for &T {
    fn to_properties(&self) -> PropertyMap {
        (**self).to_properties()
    }
}

// ============================================================================
// Vertices
// ============================================================================

/// A node of the physical asset hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetVertex {
    pub id: Identifier,
    pub name: Option<String>,
    pub description: Option<String>,
    pub group_type: Option<String>,
    pub parent_id: Option<Identifier>,
    pub mode: Option<String>,
    pub state: Option<String>,
}

impl AssetVertex {
    /// A vertex known only because another row names it as its parent.
    pub fn reference_only(id: Identifier) -> Self {
        Self {
            id,
            name: None,
            description: None,
            group_type: None,
            parent_id: None,
            mode: None,
            state: None,
        }
    }
}

impl ToProperties for AssetVertex {
    fn to_properties(&self) -> PropertyMap {
        let mut m = PropertyMap::new();
        m.insert("ID".to_string(), self.id.clone().into());
        m.insert("NAME".to_string(), self.name.clone().into());
        m.insert("DESCRIPTION".to_string(), self.description.clone().into());
        m.insert("GROUP_TYPE".to_string(), self.group_type.clone().into());
        m.insert("PARENT_ID".to_string(), self.parent_id.clone().into());
        m.insert("MODE".to_string(), self.mode.clone().into());
        m.insert("STATE".to_string(), self.state.clone().into());
        m
    }
}

/// A P&ID instrument node. The label doubles as its display name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentVertex {
    pub label: String,
    pub id: Identifier,
    pub name: String,
    pub confidence: Option<f64>,
}

impl ToProperties for InstrumentVertex {
    fn to_properties(&self) -> PropertyMap {
        let mut m = PropertyMap::new();
        m.insert("id".to_string(), self.id.clone().into());
        m.insert("name".to_string(), Value::Text(self.name.clone()));
        m.insert(
            "predConfidence".to_string(),
            self.confidence.map(Value::Float).unwrap_or(Value::Null),
        );
        m
    }
}

// ============================================================================
// Edges
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EdgeRecord {
    pub from: Identifier,
    pub to: Identifier,
    pub relationship_type: Option<String>,
    pub relationship_id: Option<Identifier>,
}

impl EdgeRecord {
    pub fn new(from: Identifier, to: Identifier) -> Self {
        Self {
            from,
            to,
            relationship_type: None,
            relationship_id: None,
        }
    }
}

impl ToProperties for EdgeRecord {
    fn to_properties(&self) -> PropertyMap {
        let mut m = PropertyMap::new();
        m.insert("from".to_string(), self.from.clone().into());
        m.insert("to".to_string(), self.to.clone().into());
        if let Some(rel_id) = &self.relationship_id {
            m.insert("rel_id".to_string(), rel_id.clone().into());
        }
        m
    }
}
