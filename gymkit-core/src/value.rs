//! Observation and action values.
//!
//! Environments and wrappers exchange a single closed value type instead of
//! per-environment generic observation/action types. Wrapper composition is
//! then plain delegation; shape and dtype agreement is checked at wrapper
//! construction time against the declared [`Space`](crate::space::Space).
use ndarray::{ArrayD, IxDyn};
use std::collections::BTreeMap;

/// A sample of a [`Space`](crate::space::Space).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A discrete scalar (sample of `Discrete`).
    Int(i64),

    /// A floating point tensor (sample of `Box`).
    Array(ArrayD<f64>),

    /// An integer tensor (sample of `MultiBinary` / `MultiDiscrete`).
    IntArray(ArrayD<i64>),

    /// A character string (sample of `Text`).
    Text(String),

    /// An ordered heterogeneous collection (sample of `Tuple`).
    Tuple(Vec<Value>),

    /// A key-sorted heterogeneous collection (sample of `Dict`).
    Dict(BTreeMap<String, Value>),

    /// A padded variable-length batch (sample of `Sequence`).
    Seq(SeqValue),

    /// A padded graph (sample of `Graph`).
    Graph(GraphValue),
}

impl Value {
    /// Builds a 1-dimensional [`Value::Array`] from a vector.
    pub fn vec(data: Vec<f64>) -> Self {
        let n = data.len();
        Value::Array(ArrayD::from_shape_vec(IxDyn(&[n]), data).expect("shape matches data"))
    }

    /// Returns the discrete scalar, if this is one.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(x) => Some(*x),
            _ => None,
        }
    }

    /// Returns the floating point tensor, if this is one.
    pub fn as_array(&self) -> Option<&ArrayD<f64>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Returns the integer tensor, if this is one.
    pub fn as_int_array(&self) -> Option<&ArrayD<i64>> {
        match self {
            Value::IntArray(a) => Some(a),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Array(_) => "Array",
            Value::IntArray(_) => "IntArray",
            Value::Text(_) => "Text",
            Value::Tuple(_) => "Tuple",
            Value::Dict(_) => "Dict",
            Value::Seq(_) => "Seq",
            Value::Graph(_) => "Graph",
        }
    }
}

/// A variable-length batch inside a fixed buffer.
///
/// `values.len() == mask.len()`; the `true`-prefix of `mask` marks the
/// logical elements. The mask is always a prefix mask: no `true` entry may
/// follow a `false` entry. Padded slots hold unspecified element values.
#[derive(Debug, Clone, PartialEq)]
pub struct SeqValue {
    /// Padded element batch, `max_len` entries.
    pub values: Vec<Value>,

    /// Prefix validity mask, one entry per slot.
    pub mask: Vec<bool>,
}

impl SeqValue {
    /// Number of logical (unmasked) elements.
    pub fn len(&self) -> usize {
        self.mask.iter().filter(|m| **m).count()
    }

    /// Whether the batch holds no logical elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A graph with padded node and edge batches.
///
/// `links[i]` holds the `(from, to)` endpoints of edge `i`; entries past the
/// edge mask's `true`-prefix are padding and carry no meaning.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphValue {
    /// Padded node feature batch, `max_nodes` entries.
    pub nodes: Vec<Value>,

    /// Prefix validity mask over `nodes`.
    pub node_mask: Vec<bool>,

    /// Padded edge feature batch, `max_edges` entries.
    pub edges: Vec<Value>,

    /// Prefix validity mask over `edges`.
    pub edge_mask: Vec<bool>,

    /// Edge endpoints as indices into the valid node prefix.
    pub links: Vec<(usize, usize)>,
}

impl GraphValue {
    /// Number of logical nodes.
    pub fn num_nodes(&self) -> usize {
        self.node_mask.iter().filter(|m| **m).count()
    }

    /// Number of logical edges.
    pub fn num_edges(&self) -> usize {
        self.edge_mask.iter().filter(|m| **m).count()
    }
}

/// Whether a mask is a well-formed prefix mask.
pub fn is_prefix_mask(mask: &[bool]) -> bool {
    let mut seen_false = false;
    for m in mask {
        if *m && seen_false {
            return false;
        }
        if !*m {
            seen_false = true;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_mask_well_formedness() {
        assert!(is_prefix_mask(&[]));
        assert!(is_prefix_mask(&[true, true, false]));
        assert!(is_prefix_mask(&[false, false]));
        assert!(!is_prefix_mask(&[true, false, true]));
        assert!(!is_prefix_mask(&[false, true]));
    }

    #[test]
    fn seq_len_counts_valid_prefix() {
        let s = SeqValue {
            values: vec![Value::Int(1), Value::Int(2), Value::Int(3)],
            mask: vec![true, true, false],
        };
        assert_eq!(s.len(), 2);
        assert!(!s.is_empty());
    }
}
