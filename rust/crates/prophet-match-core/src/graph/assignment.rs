use crate::graph::matrix::WeightMatrix;
use crate::graph::min_cost_flow::MinCostFlow;
use crate::ProphetError;

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// `(offline, online)` pairs sorted by offline index.
    pub pairs: Vec<(usize, usize)>,
    pub total: f64,
}

impl Assignment {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Online vertex assigned to `offline`, if any.
    pub fn partner_of(&self, offline: usize) -> Option<usize> {
        self.pairs
            .iter()
            .find(|(j, _)| *j == offline)
            .map(|&(_, i)| i)
    }
}

/// Unit-capacity network `source -> offline -> online -> sink` with costs
/// `-w`, `min(n, m)` units routed. Weights are non-negative, so a full-size
/// assignment of least negated cost is a maximum-weight matching.
pub fn max_weight_assignment(weights: &WeightMatrix) -> Result<Assignment, ProphetError> {
    let n = weights.rows();
    let m = weights.cols();
    if n == 0 || m == 0 {
        return Err(ProphetError::InvalidInput(
            "assignment needs at least one offline and one online vertex".to_string(),
        ));
    }

    let source = n + m;
    let sink = n + m + 1;
    let mut mcf = MinCostFlow::new(n + m + 2);

    for offline in 0..n {
        mcf.add_edge(source, offline, 1, 0.0);
    }
    let mut edge_refs = Vec::with_capacity(n * m);
    for offline in 0..n {
        for online in 0..m {
            let (idx, _rev) = mcf.add_edge(offline, n + online, 1, -weights.get(offline, online));
            edge_refs.push((offline, online, idx));
        }
    }
    for online in 0..m {
        mcf.add_edge(n + online, sink, 1, 0.0);
    }

    mcf.min_cost_flow(source, sink, n.min(m) as i64)?;

    let mut pairs = Vec::with_capacity(n.min(m));
    let mut total = 0.0;
    for (offline, online, idx) in edge_refs {
        if mcf.graph[offline][idx].cap == 0 {
            pairs.push((offline, online));
            total += weights.get(offline, online);
        }
    }

    Ok(Assignment { pairs, total })
}
