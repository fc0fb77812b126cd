//! Typed sample domains.
//!
//! A [`Space`] describes the universe of valid [`Value`]s for an observation
//! or action channel. Spaces are immutable after construction; sampling is a
//! pure function of an explicit [`EnvRng`] stream, which is forked before
//! every independent use.
//!
//! The family is a closed tagged union rather than a generic hierarchy, so
//! environments and wrappers can exchange spaces and samples without nested
//! generic instantiation. Validity is recovered at runtime with
//! [`Space::contains`] and with the wrapper constructors' space checks.
mod flatten;

pub use flatten::{flatten, flatten_space, unflatten};

use crate::error::GymError;
use crate::rng::EnvRng;
use crate::value::{is_prefix_mask, GraphValue, SeqValue, Value};
use anyhow::Result;
use ndarray::{ArrayD, IxDyn};
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use std::collections::BTreeMap;

/// Half-width of the sampling window used for unbounded `Box` dimensions.
const UNBOUNDED_WINDOW: f64 = 1e6;

/// Additive epsilon stabilizing probability-weighted discrete draws.
const PROB_EPS: f64 = 1e-12;

/// Element type of a tensor-backed space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dtype {
    /// 64-bit floating point.
    F64,
    /// 64-bit signed integer.
    I64,
}

/// A bounded or unbounded continuous range per dimension.
///
/// Bounded-below/above flags are computed once at construction and reused by
/// every sampling call.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSpace {
    /// Lower bound per element; `-inf` marks an unbounded-below element.
    pub low: ArrayD<f64>,

    /// Upper bound per element; `inf` marks an unbounded-above element.
    pub high: ArrayD<f64>,

    bounded_below: Vec<bool>,
    bounded_above: Vec<bool>,
}

impl BoxSpace {
    /// Whether every element is bounded on both sides.
    pub fn is_bounded(&self) -> bool {
        self.bounded_below.iter().all(|b| *b) && self.bounded_above.iter().all(|b| *b)
    }

    /// Shape of the box.
    pub fn shape(&self) -> &[usize] {
        self.low.shape()
    }
}

/// A bounded-length string domain.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpace {
    /// Minimum sampled length.
    pub min_len: usize,

    /// Maximum sampled length.
    pub max_len: usize,

    /// Characters the string may contain.
    pub charset: Vec<char>,
}

/// A graph domain with padded node and edge batches.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSpace {
    /// Domain of a single node feature row.
    pub node: Box<Space>,

    /// Domain of a single edge feature row.
    pub edge: Box<Space>,

    /// Capacity of the node batch; sampled graphs have 1..=max_nodes nodes.
    pub max_nodes: usize,

    /// Capacity of the edge batch.
    pub max_edges: usize,

    /// Whether an edge may connect a node to itself.
    pub self_loops: bool,

    /// Whether edges are directed.
    pub directed: bool,
}

/// A typed domain of observation or action values.
#[derive(Debug, Clone, PartialEq)]
pub enum Space {
    /// Integers in `[start, start + n)`.
    Discrete {
        /// Number of values.
        n: i64,
        /// Smallest value.
        start: i64,
    },

    /// A multi-dimensional bounded or unbounded continuous range.
    Box(BoxSpace),

    /// Independent binary entries.
    MultiBinary {
        /// Tensor shape.
        shape: Vec<usize>,
    },

    /// Independent discrete entries, entry `i` in `[0, nvec[i])`.
    MultiDiscrete {
        /// Number of values per entry.
        nvec: Vec<i64>,
    },

    /// A fixed ordered composition of sub-spaces.
    Tuple(Vec<Space>),

    /// A fixed key-sorted composition of sub-spaces.
    Dict(BTreeMap<String, Space>),

    /// Bounded-length strings over a finite charset.
    Text(TextSpace),

    /// Variable-length batches of an element space, padded with a prefix
    /// mask to `max_len` slots.
    Sequence {
        /// Domain of a single element.
        element: Box<Space>,
        /// Minimum logical length.
        min_len: usize,
        /// Maximum logical length and slot count.
        max_len: usize,
    },

    /// Graph-structured values with padded nodes and edges.
    Graph(GraphSpace),
}

impl Space {
    /// A discrete range `[0, n)`.
    pub fn discrete(n: i64) -> Result<Self> {
        Self::discrete_with_start(n, 0)
    }

    /// A discrete range `[start, start + n)`.
    pub fn discrete_with_start(n: i64, start: i64) -> Result<Self> {
        if n <= 0 {
            return Err(GymError::InvalidSpace(format!("Discrete needs n > 0, got {}", n)).into());
        }
        Ok(Space::Discrete { n, start })
    }

    /// A box with per-element bounds. `high` must dominate `low` elementwise;
    /// infinities mark unbounded sides.
    pub fn boxed(low: ArrayD<f64>, high: ArrayD<f64>) -> Result<Self> {
        if low.shape() != high.shape() {
            return Err(GymError::InvalidSpace(format!(
                "Box low/high shapes differ: {:?} vs {:?}",
                low.shape(),
                high.shape()
            ))
            .into());
        }
        for (l, h) in low.iter().zip(high.iter()) {
            if l.is_nan() || h.is_nan() || h < l {
                return Err(GymError::InvalidSpace(format!(
                    "Box needs low <= high elementwise, got low={} high={}",
                    l, h
                ))
                .into());
            }
        }
        let bounded_below = low.iter().map(|l| l.is_finite()).collect();
        let bounded_above = high.iter().map(|h| h.is_finite()).collect();
        Ok(Space::Box(BoxSpace {
            low,
            high,
            bounded_below,
            bounded_above,
        }))
    }

    /// A box with the same scalar bounds in every element.
    pub fn boxed_uniform(low: f64, high: f64, shape: &[usize]) -> Result<Self> {
        Self::boxed(
            ArrayD::from_elem(IxDyn(shape), low),
            ArrayD::from_elem(IxDyn(shape), high),
        )
    }

    /// A binary tensor domain.
    pub fn multi_binary(shape: Vec<usize>) -> Result<Self> {
        if shape.iter().product::<usize>() == 0 {
            return Err(
                GymError::InvalidSpace(format!("MultiBinary shape {:?} is empty", shape)).into(),
            );
        }
        Ok(Space::MultiBinary { shape })
    }

    /// A vector of independent discrete ranges.
    pub fn multi_discrete(nvec: Vec<i64>) -> Result<Self> {
        if nvec.is_empty() || nvec.iter().any(|n| *n <= 0) {
            return Err(GymError::InvalidSpace(format!(
                "MultiDiscrete needs a non-empty nvec of positive entries, got {:?}",
                nvec
            ))
            .into());
        }
        Ok(Space::MultiDiscrete { nvec })
    }

    /// An ordered composition.
    pub fn tuple(spaces: Vec<Space>) -> Self {
        Space::Tuple(spaces)
    }

    /// A key-sorted composition.
    pub fn dict(spaces: Vec<(impl Into<String>, Space)>) -> Self {
        Space::Dict(spaces.into_iter().map(|(k, s)| (k.into(), s)).collect())
    }

    /// A bounded-length string domain.
    pub fn text(min_len: usize, max_len: usize, charset: Vec<char>) -> Result<Self> {
        if max_len == 0 || max_len < min_len {
            return Err(GymError::InvalidSpace(format!(
                "Text needs 0 < max_len and min_len <= max_len, got [{}, {}]",
                min_len, max_len
            ))
            .into());
        }
        if charset.is_empty() {
            return Err(GymError::InvalidSpace("Text charset is empty".into()).into());
        }
        Ok(Space::Text(TextSpace {
            min_len,
            max_len,
            charset,
        }))
    }

    /// A variable-length batch domain.
    pub fn sequence(element: Space, min_len: usize, max_len: usize) -> Result<Self> {
        if max_len == 0 || max_len < min_len {
            return Err(GymError::InvalidSpace(format!(
                "Sequence needs 0 < max_len and min_len <= max_len, got [{}, {}]",
                min_len, max_len
            ))
            .into());
        }
        Ok(Space::Sequence {
            element: Box::new(element),
            min_len,
            max_len,
        })
    }

    /// A graph domain.
    pub fn graph(
        node: Space,
        edge: Space,
        max_nodes: usize,
        max_edges: usize,
        self_loops: bool,
        directed: bool,
    ) -> Result<Self> {
        if max_nodes == 0 {
            return Err(GymError::InvalidSpace("Graph needs max_nodes >= 1".into()).into());
        }
        Ok(Space::Graph(GraphSpace {
            node: Box::new(node),
            edge: Box::new(edge),
            max_nodes,
            max_edges,
            self_loops,
            directed,
        }))
    }

    /// Shape of a tensor-backed space, `None` otherwise.
    pub fn shape(&self) -> Option<Vec<usize>> {
        match self {
            Space::Box(b) => Some(b.shape().to_vec()),
            Space::MultiBinary { shape } => Some(shape.clone()),
            Space::MultiDiscrete { nvec } => Some(vec![nvec.len()]),
            _ => None,
        }
    }

    /// Number of entries a sample occupies once flattened to a `Box`,
    /// `None` for spaces without a `Box` flattening.
    pub fn flat_dim(&self) -> Option<usize> {
        flatten::flat_dim(self)
    }

    /// Element type of a tensor-backed space, `None` otherwise.
    pub fn dtype(&self) -> Option<Dtype> {
        match self {
            Space::Box(_) => Some(Dtype::F64),
            Space::MultiBinary { .. } | Space::MultiDiscrete { .. } => Some(Dtype::I64),
            _ => None,
        }
    }

    /// Draws a sample.
    ///
    /// The caller's stream is forked first; the draw consumes only the fork,
    /// so samples taken from the same seed are reproducible regardless of
    /// unrelated draws elsewhere.
    pub fn sample(&self, rng: &mut EnvRng) -> Value {
        let mut rng = rng.fork();
        self.sample_inner(&mut rng)
    }

    fn sample_inner(&self, rng: &mut EnvRng) -> Value {
        match self {
            Space::Discrete { n, start } => Value::Int(start + rng.gen_range(0..*n)),
            Space::Box(b) => {
                let mut data = Vec::with_capacity(b.low.len());
                for (i, (l, h)) in b.low.iter().zip(b.high.iter()).enumerate() {
                    let x = match (b.bounded_below[i], b.bounded_above[i]) {
                        (true, true) => rng.gen_range(*l..=*h),
                        (true, false) => rng.gen_range(*l..=(*l + UNBOUNDED_WINDOW)),
                        (false, true) => rng.gen_range((*h - UNBOUNDED_WINDOW)..=*h),
                        (false, false) => rng.gen_range(-UNBOUNDED_WINDOW..=UNBOUNDED_WINDOW),
                    };
                    data.push(x);
                }
                Value::Array(
                    ArrayD::from_shape_vec(IxDyn(b.shape()), data).expect("shape matches data"),
                )
            }
            Space::MultiBinary { shape } => {
                let len = shape.iter().product();
                let data = (0..len).map(|_| rng.gen_bool(0.5) as i64).collect();
                Value::IntArray(
                    ArrayD::from_shape_vec(IxDyn(shape), data).expect("shape matches data"),
                )
            }
            Space::MultiDiscrete { nvec } => {
                let data: Vec<i64> = nvec.iter().map(|n| rng.gen_range(0..*n)).collect();
                Value::IntArray(
                    ArrayD::from_shape_vec(IxDyn(&[nvec.len()]), data).expect("shape matches data"),
                )
            }
            Space::Tuple(spaces) => {
                Value::Tuple(spaces.iter().map(|s| s.sample(rng)).collect())
            }
            Space::Dict(spaces) => Value::Dict(
                spaces
                    .iter()
                    .map(|(k, s)| (k.clone(), s.sample(rng)))
                    .collect(),
            ),
            Space::Text(t) => {
                let len = rng.gen_range(t.min_len..=t.max_len);
                let s = (0..len)
                    .map(|_| t.charset[rng.gen_range(0..t.charset.len())])
                    .collect();
                Value::Text(s)
            }
            Space::Sequence {
                element,
                min_len,
                max_len,
            } => {
                let len = rng.gen_range(*min_len..=*max_len);
                let values = (0..*max_len).map(|_| element.sample(rng)).collect();
                let mask = (0..*max_len).map(|i| i < len).collect();
                Value::Seq(SeqValue { values, mask })
            }
            Space::Graph(g) => {
                let n_nodes = rng.gen_range(1..=g.max_nodes);
                // A loop-free graph with a single node admits no edges.
                let n_edges = if g.max_edges == 0 || (!g.self_loops && n_nodes == 1) {
                    0
                } else {
                    rng.gen_range(0..=g.max_edges)
                };
                let nodes = (0..g.max_nodes).map(|_| g.node.sample(rng)).collect();
                let edges = (0..g.max_edges).map(|_| g.edge.sample(rng)).collect();
                let links = (0..g.max_edges)
                    .map(|i| {
                        if i >= n_edges {
                            return (0, 0);
                        }
                        let from = rng.gen_range(0..n_nodes);
                        let mut to = rng.gen_range(0..n_nodes);
                        if !g.self_loops && to == from {
                            to = (from + 1) % n_nodes;
                        }
                        (from, to)
                    })
                    .collect();
                Value::Graph(GraphValue {
                    nodes,
                    node_mask: (0..g.max_nodes).map(|i| i < n_nodes).collect(),
                    edges,
                    edge_mask: (0..g.max_edges).map(|i| i < n_edges).collect(),
                    links,
                })
            }
        }
    }

    /// Draws from a `Discrete` space under an optional validity mask or an
    /// optional explicit probability vector.
    ///
    /// Supplying both constraints is a usage error. An all-`false` mask
    /// deterministically yields `start`. Probabilities are stabilized with a
    /// small additive epsilon before the categorical draw.
    pub fn sample_discrete(
        &self,
        rng: &mut EnvRng,
        mask: Option<&[bool]>,
        probs: Option<&[f64]>,
    ) -> Result<Value> {
        let (n, start) = match self {
            Space::Discrete { n, start } => (*n, *start),
            other => {
                return Err(GymError::SampleConstraint(format!(
                    "constrained sampling is defined for Discrete only, got {:?}",
                    other
                ))
                .into())
            }
        };
        let mut rng = rng.fork();
        match (mask, probs) {
            (Some(_), Some(_)) => Err(GymError::SampleConstraint(
                "mask and probability vector are mutually exclusive".into(),
            )
            .into()),
            (Some(mask), None) => {
                if mask.len() != n as usize {
                    return Err(GymError::SampleConstraint(format!(
                        "mask length {} does not match n = {}",
                        mask.len(),
                        n
                    ))
                    .into());
                }
                let allowed: Vec<i64> = (0..n).filter(|i| mask[*i as usize]).collect();
                if allowed.is_empty() {
                    return Ok(Value::Int(start));
                }
                Ok(Value::Int(
                    start + allowed[rng.gen_range(0..allowed.len())],
                ))
            }
            (None, Some(probs)) => {
                if probs.len() != n as usize {
                    return Err(GymError::SampleConstraint(format!(
                        "probability vector length {} does not match n = {}",
                        probs.len(),
                        n
                    ))
                    .into());
                }
                if probs.iter().any(|p| !p.is_finite() || *p < 0.0) {
                    return Err(GymError::SampleConstraint(
                        "probabilities must be finite and non-negative".into(),
                    )
                    .into());
                }
                let weights: Vec<f64> = probs.iter().map(|p| p + PROB_EPS).collect();
                let dist = WeightedIndex::new(&weights)
                    .map_err(|e| GymError::SampleConstraint(e.to_string()))?;
                Ok(Value::Int(start + dist.sample(&mut rng) as i64))
            }
            (None, None) => Ok(self.sample_inner(&mut rng)),
        }
    }

    /// Whether a value is a member of the space.
    pub fn contains(&self, value: &Value) -> bool {
        match (self, value) {
            (Space::Discrete { n, start }, Value::Int(x)) => *x >= *start && *x < start + n,
            (Space::Box(b), Value::Array(a)) => {
                a.shape() == b.shape()
                    && a.iter()
                        .zip(b.low.iter().zip(b.high.iter()))
                        .all(|(x, (l, h))| *x >= *l && *x <= *h)
            }
            (Space::MultiBinary { shape }, Value::IntArray(a)) => {
                a.shape() == shape.as_slice() && a.iter().all(|x| *x == 0 || *x == 1)
            }
            (Space::MultiDiscrete { nvec }, Value::IntArray(a)) => {
                a.shape() == [nvec.len()]
                    && a.iter().zip(nvec.iter()).all(|(x, n)| *x >= 0 && x < n)
            }
            (Space::Tuple(spaces), Value::Tuple(values)) => {
                spaces.len() == values.len()
                    && spaces.iter().zip(values.iter()).all(|(s, v)| s.contains(v))
            }
            (Space::Dict(spaces), Value::Dict(values)) => {
                spaces.len() == values.len()
                    && spaces.iter().all(|(k, s)| {
                        values.get(k).map(|v| s.contains(v)).unwrap_or(false)
                    })
            }
            (Space::Text(t), Value::Text(s)) => {
                let len = s.chars().count();
                len >= t.min_len
                    && len <= t.max_len
                    && s.chars().all(|c| t.charset.contains(&c))
            }
            (
                Space::Sequence {
                    element,
                    min_len,
                    max_len,
                },
                Value::Seq(seq),
            ) => {
                if seq.values.len() != *max_len || seq.mask.len() != *max_len {
                    return false;
                }
                if !is_prefix_mask(&seq.mask) {
                    return false;
                }
                let len = seq.len();
                len >= *min_len
                    && seq
                        .values
                        .iter()
                        .zip(seq.mask.iter())
                        .all(|(v, m)| !*m || element.contains(v))
            }
            (Space::Graph(g), Value::Graph(gv)) => {
                if gv.nodes.len() != g.max_nodes
                    || gv.node_mask.len() != g.max_nodes
                    || gv.edges.len() != g.max_edges
                    || gv.edge_mask.len() != g.max_edges
                    || gv.links.len() != g.max_edges
                {
                    return false;
                }
                if !is_prefix_mask(&gv.node_mask) || !is_prefix_mask(&gv.edge_mask) {
                    return false;
                }
                let n_nodes = gv.num_nodes();
                if n_nodes == 0 {
                    return false;
                }
                for i in 0..g.max_nodes {
                    if gv.node_mask[i] && !g.node.contains(&gv.nodes[i]) {
                        return false;
                    }
                }
                for i in 0..g.max_edges {
                    if !gv.edge_mask[i] {
                        continue;
                    }
                    if !g.edge.contains(&gv.edges[i]) {
                        return false;
                    }
                    let (from, to) = gv.links[i];
                    if from >= n_nodes || to >= n_nodes {
                        return false;
                    }
                    if !g.self_loops && from == to {
                        return false;
                    }
                }
                true
            }
            _ => false,
        }
    }
}
