//! Canonical flattening of structured spaces and samples.
//!
//! Every space whose sample has a fixed total size flattens to a single
//! 1-dimensional `Box`: one-hot encoding for `Discrete` and each
//! `MultiDiscrete` entry, reshape for `Box`/`MultiBinary`, character indices
//! padded with `-1` for `Text`, and concatenation of recursively flattened
//! children for `Tuple` (declared order) and `Dict` (key order). `Sequence`
//! and `Graph` keep their padded structure and flatten their element rows.
//!
//! Requesting a flattening that does not exist, such as a `Tuple` holding a
//! `Sequence`, is a configuration error surfaced as
//! [`GymError::Unflattenable`]; it marks a static mismatch between a wrapper
//! and the environment's declared space, not a recoverable condition.
use super::Space;
use crate::error::GymError;
use crate::value::{GraphValue, SeqValue, Value};
use anyhow::Result;
use ndarray::{ArrayD, IxDyn};

/// Returns the flattened form of a space.
pub fn flatten_space(space: &Space) -> Result<Space> {
    match space {
        Space::Sequence {
            element,
            min_len,
            max_len,
        } => Space::sequence(flatten_space(element)?, *min_len, *max_len),
        Space::Graph(g) => Space::graph(
            flatten_space(&g.node)?,
            flatten_space(&g.edge)?,
            g.max_nodes,
            g.max_edges,
            g.self_loops,
            g.directed,
        ),
        other => {
            let (low, high) = box_bounds(other)?;
            let n = low.len();
            Space::boxed(
                ArrayD::from_shape_vec(IxDyn(&[n]), low).expect("shape matches data"),
                ArrayD::from_shape_vec(IxDyn(&[n]), high).expect("shape matches data"),
            )
        }
    }
}

/// Number of entries a space contributes to a flat vector, `None` for
/// spaces that do not flatten to a `Box`.
pub(crate) fn flat_dim(space: &Space) -> Option<usize> {
    match space {
        Space::Discrete { n, .. } => Some(*n as usize),
        Space::Box(b) => Some(b.low.len()),
        Space::MultiBinary { shape } => Some(shape.iter().product()),
        Space::MultiDiscrete { nvec } => Some(nvec.iter().map(|n| *n as usize).sum()),
        Space::Text(t) => Some(t.max_len),
        Space::Tuple(spaces) => spaces.iter().map(flat_dim).sum(),
        Space::Dict(spaces) => spaces.values().map(flat_dim).sum(),
        Space::Sequence { .. } | Space::Graph(_) => None,
    }
}

fn box_bounds(space: &Space) -> Result<(Vec<f64>, Vec<f64>)> {
    match space {
        Space::Discrete { n, .. } => {
            let n = *n as usize;
            Ok((vec![0.0; n], vec![1.0; n]))
        }
        Space::Box(b) => Ok((
            b.low.iter().cloned().collect(),
            b.high.iter().cloned().collect(),
        )),
        Space::MultiBinary { shape } => {
            let n = shape.iter().product();
            Ok((vec![0.0; n], vec![1.0; n]))
        }
        Space::MultiDiscrete { nvec } => {
            let n = nvec.iter().map(|n| *n as usize).sum();
            Ok((vec![0.0; n], vec![1.0; n]))
        }
        Space::Text(t) => Ok((
            vec![-1.0; t.max_len],
            vec![(t.charset.len() - 1) as f64; t.max_len],
        )),
        Space::Tuple(spaces) => {
            let mut low = Vec::new();
            let mut high = Vec::new();
            for s in spaces {
                let (l, h) = box_bounds(s)?;
                low.extend(l);
                high.extend(h);
            }
            Ok((low, high))
        }
        Space::Dict(spaces) => {
            let mut low = Vec::new();
            let mut high = Vec::new();
            for s in spaces.values() {
                let (l, h) = box_bounds(s)?;
                low.extend(l);
                high.extend(h);
            }
            Ok((low, high))
        }
        Space::Sequence { .. } | Space::Graph(_) => Err(GymError::Unflattenable(
            "Sequence/Graph nested inside a composite space cannot flatten to a Box".into(),
        )
        .into()),
    }
}

/// Flattens a sample of `space` into its canonical flat form.
pub fn flatten(space: &Space, value: &Value) -> Result<Value> {
    match (space, value) {
        (Space::Sequence { element, .. }, Value::Seq(seq)) => {
            let values = seq
                .values
                .iter()
                .map(|v| flatten(element, v))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Seq(SeqValue {
                values,
                mask: seq.mask.clone(),
            }))
        }
        (Space::Graph(g), Value::Graph(gv)) => {
            let nodes = gv
                .nodes
                .iter()
                .map(|v| flatten(&g.node, v))
                .collect::<Result<Vec<_>>>()?;
            let edges = gv
                .edges
                .iter()
                .map(|v| flatten(&g.edge, v))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Graph(GraphValue {
                nodes,
                node_mask: gv.node_mask.clone(),
                edges,
                edge_mask: gv.edge_mask.clone(),
                links: gv.links.clone(),
            }))
        }
        _ => {
            let mut buf = Vec::new();
            flatten_into(space, value, &mut buf)?;
            Ok(Value::vec(buf))
        }
    }
}

fn flatten_into(space: &Space, value: &Value, buf: &mut Vec<f64>) -> Result<()> {
    match (space, value) {
        (Space::Discrete { n, start }, Value::Int(x)) => {
            let idx = x - start;
            if idx < 0 || idx >= *n {
                return Err(mismatch(space, value));
            }
            for i in 0..*n {
                buf.push(if i == idx { 1.0 } else { 0.0 });
            }
            Ok(())
        }
        (Space::Box(b), Value::Array(a)) => {
            if a.len() != b.low.len() {
                return Err(mismatch(space, value));
            }
            buf.extend(a.iter().cloned());
            Ok(())
        }
        (Space::MultiBinary { shape }, Value::IntArray(a)) => {
            if a.len() != shape.iter().product::<usize>() {
                return Err(mismatch(space, value));
            }
            buf.extend(a.iter().map(|x| *x as f64));
            Ok(())
        }
        (Space::MultiDiscrete { nvec }, Value::IntArray(a)) => {
            if a.len() != nvec.len() {
                return Err(mismatch(space, value));
            }
            for (x, n) in a.iter().zip(nvec.iter()) {
                if *x < 0 || x >= n {
                    return Err(mismatch(space, value));
                }
                for i in 0..*n {
                    buf.push(if i == *x { 1.0 } else { 0.0 });
                }
            }
            Ok(())
        }
        (Space::Text(t), Value::Text(s)) => {
            let mut count = 0;
            for c in s.chars() {
                let idx = t
                    .charset
                    .iter()
                    .position(|k| *k == c)
                    .ok_or_else(|| mismatch(space, value))?;
                buf.push(idx as f64);
                count += 1;
            }
            if count > t.max_len {
                return Err(mismatch(space, value));
            }
            buf.extend(std::iter::repeat(-1.0).take(t.max_len - count));
            Ok(())
        }
        (Space::Tuple(spaces), Value::Tuple(values)) => {
            if spaces.len() != values.len() {
                return Err(mismatch(space, value));
            }
            for (s, v) in spaces.iter().zip(values.iter()) {
                flatten_into(s, v, buf)?;
            }
            Ok(())
        }
        (Space::Dict(spaces), Value::Dict(values)) => {
            if spaces.len() != values.len() {
                return Err(mismatch(space, value));
            }
            for (k, s) in spaces.iter() {
                let v = values.get(k).ok_or_else(|| mismatch(space, value))?;
                flatten_into(s, v, buf)?;
            }
            Ok(())
        }
        (Space::Sequence { .. }, _) | (Space::Graph(_), _) => Err(GymError::Unflattenable(
            "Sequence/Graph nested inside a composite space cannot flatten to a Box".into(),
        )
        .into()),
        _ => Err(mismatch(space, value)),
    }
}

/// Reconstructs a sample of `space` from its flattened form.
///
/// Inverse of [`flatten`]: one-hot blocks decode via arg-max, `Box` blocks
/// reshape to the declared shape, text blocks read up to the `-1` padding.
pub fn unflatten(space: &Space, value: &Value) -> Result<Value> {
    match (space, value) {
        (Space::Sequence { element, .. }, Value::Seq(seq)) => {
            let values = seq
                .values
                .iter()
                .map(|v| unflatten(element, v))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Seq(SeqValue {
                values,
                mask: seq.mask.clone(),
            }))
        }
        (Space::Graph(g), Value::Graph(gv)) => {
            let nodes = gv
                .nodes
                .iter()
                .map(|v| unflatten(&g.node, v))
                .collect::<Result<Vec<_>>>()?;
            let edges = gv
                .edges
                .iter()
                .map(|v| unflatten(&g.edge, v))
                .collect::<Result<Vec<_>>>()?;
            Ok(Value::Graph(GraphValue {
                nodes,
                node_mask: gv.node_mask.clone(),
                edges,
                edge_mask: gv.edge_mask.clone(),
                links: gv.links.clone(),
            }))
        }
        (_, Value::Array(a)) => {
            let expected = flat_dim(space).ok_or_else(|| {
                GymError::Unflattenable("space has no Box flattening".to_string())
            })?;
            if a.len() != expected {
                return Err(GymError::Unflattenable(format!(
                    "flat vector has {} entries, space needs {}",
                    a.len(),
                    expected
                ))
                .into());
            }
            let buf: Vec<f64> = a.iter().cloned().collect();
            let mut pos = 0;
            unflatten_slice(space, &buf, &mut pos)
        }
        _ => Err(mismatch(space, value)),
    }
}

fn unflatten_slice(space: &Space, buf: &[f64], pos: &mut usize) -> Result<Value> {
    match space {
        Space::Discrete { n, start } => {
            let block = take(buf, pos, *n as usize)?;
            Ok(Value::Int(start + argmax(block) as i64))
        }
        Space::Box(b) => {
            let block = take(buf, pos, b.low.len())?;
            Ok(Value::Array(
                ArrayD::from_shape_vec(IxDyn(b.shape()), block.to_vec())
                    .expect("shape matches data"),
            ))
        }
        Space::MultiBinary { shape } => {
            let block = take(buf, pos, shape.iter().product())?;
            let data = block.iter().map(|x| (*x != 0.0) as i64).collect();
            Ok(Value::IntArray(
                ArrayD::from_shape_vec(IxDyn(shape), data).expect("shape matches data"),
            ))
        }
        Space::MultiDiscrete { nvec } => {
            let mut data = Vec::with_capacity(nvec.len());
            for n in nvec {
                let block = take(buf, pos, *n as usize)?;
                data.push(argmax(block) as i64);
            }
            Ok(Value::IntArray(
                ArrayD::from_shape_vec(IxDyn(&[nvec.len()]), data).expect("shape matches data"),
            ))
        }
        Space::Text(t) => {
            let block = take(buf, pos, t.max_len)?;
            let mut s = String::new();
            for x in block {
                if *x < 0.0 {
                    break;
                }
                let idx = *x as usize;
                if idx >= t.charset.len() {
                    return Err(GymError::Unflattenable(format!(
                        "character index {} outside charset of {} entries",
                        idx,
                        t.charset.len()
                    ))
                    .into());
                }
                s.push(t.charset[idx]);
            }
            Ok(Value::Text(s))
        }
        Space::Tuple(spaces) => Ok(Value::Tuple(
            spaces
                .iter()
                .map(|s| unflatten_slice(s, buf, pos))
                .collect::<Result<Vec<_>>>()?,
        )),
        Space::Dict(spaces) => Ok(Value::Dict(
            spaces
                .iter()
                .map(|(k, s)| Ok((k.clone(), unflatten_slice(s, buf, pos)?)))
                .collect::<Result<_>>()?,
        )),
        Space::Sequence { .. } | Space::Graph(_) => Err(GymError::Unflattenable(
            "Sequence/Graph nested inside a composite space cannot flatten to a Box".into(),
        )
        .into()),
    }
}

fn take<'a>(buf: &'a [f64], pos: &mut usize, n: usize) -> Result<&'a [f64]> {
    if *pos + n > buf.len() {
        return Err(GymError::Unflattenable(format!(
            "flat vector exhausted at offset {} needing {} more entries",
            pos, n
        ))
        .into());
    }
    let block = &buf[*pos..*pos + n];
    *pos += n;
    Ok(block)
}

fn argmax(xs: &[f64]) -> usize {
    let mut best = 0;
    for (i, x) in xs.iter().enumerate() {
        if *x > xs[best] {
            best = i;
        }
    }
    best
}

fn mismatch(space: &Space, value: &Value) -> anyhow::Error {
    GymError::Unflattenable(format!(
        "sample kind {} does not match space {:?}",
        value.kind(),
        space
    ))
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::EnvRng;

    fn round_trip(space: &Space, seeds: std::ops::Range<u64>) {
        let flat_space = flatten_space(space).unwrap();
        for seed in seeds {
            let mut rng = EnvRng::from_seed(seed);
            let x = space.sample(&mut rng);
            let flat = flatten(space, &x).unwrap();
            assert!(
                flat_space.contains(&flat),
                "{:?} not in {:?}",
                flat,
                flat_space
            );
            let back = unflatten(space, &flat).unwrap();
            assert_eq!(back, x);
        }
    }

    #[test]
    fn round_trip_primitive_spaces() {
        round_trip(&Space::discrete_with_start(6, -3).unwrap(), 0..30);
        round_trip(&Space::boxed_uniform(-2.0, 2.0, &[2, 3]).unwrap(), 0..30);
        round_trip(&Space::multi_binary(vec![2, 4]).unwrap(), 0..30);
        round_trip(&Space::multi_discrete(vec![2, 3, 5]).unwrap(), 0..30);
        round_trip(&Space::text(0, 6, "abcd".chars().collect()).unwrap(), 0..30);
    }

    #[test]
    fn round_trip_composite_spaces() {
        let space = Space::dict(vec![
            ("a", Space::discrete(4).unwrap()),
            (
                "b",
                Space::tuple(vec![
                    Space::boxed_uniform(0.0, 1.0, &[2]).unwrap(),
                    Space::multi_discrete(vec![3, 3]).unwrap(),
                ]),
            ),
        ]);
        round_trip(&space, 0..30);
    }

    #[test]
    fn round_trip_sequence_and_graph() {
        let seq = Space::sequence(
            Space::dict(vec![
                ("x", Space::boxed_uniform(-1.0, 1.0, &[2]).unwrap()),
                ("k", Space::discrete(3).unwrap()),
            ]),
            0,
            4,
        )
        .unwrap();
        round_trip(&seq, 0..20);

        let graph = Space::graph(
            Space::boxed_uniform(0.0, 1.0, &[3]).unwrap(),
            Space::discrete(4).unwrap(),
            4,
            5,
            true,
            false,
        )
        .unwrap();
        round_trip(&graph, 0..20);
    }

    #[test]
    fn flat_space_of_dict_concatenates_in_key_order() {
        let space = Space::dict(vec![
            ("z", Space::discrete(2).unwrap()),
            ("a", Space::boxed_uniform(-3.0, 3.0, &[1]).unwrap()),
        ]);
        let flat = flatten_space(&space).unwrap();
        match flat {
            Space::Box(b) => {
                // "a" (box entry) first, then "z" (one-hot of 2).
                assert_eq!(b.low.as_slice().unwrap(), &[-3.0, 0.0, 0.0]);
                assert_eq!(b.high.as_slice().unwrap(), &[3.0, 1.0, 1.0]);
            }
            other => panic!("expected Box, got {:?}", other),
        }
    }

    #[test]
    fn nested_sequence_is_unflattenable() {
        let space = Space::tuple(vec![
            Space::discrete(2).unwrap(),
            Space::sequence(Space::discrete(2).unwrap(), 0, 2).unwrap(),
        ]);
        let err = flatten_space(&space).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<crate::error::GymError>(),
            Some(crate::error::GymError::Unflattenable(_))
        ));
    }

    #[test]
    fn sequence_flatten_preserves_mask() {
        let space = Space::sequence(Space::discrete(3).unwrap(), 1, 3).unwrap();
        let mut rng = EnvRng::from_seed(9);
        let x = space.sample(&mut rng);
        let flat = flatten(&space, &x).unwrap();
        match (&x, &flat) {
            (Value::Seq(orig), Value::Seq(f)) => assert_eq!(orig.mask, f.mask),
            _ => panic!("expected sequences"),
        }
    }
}
