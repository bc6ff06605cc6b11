use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::ProphetError;

/// Slack under which a relaxation is treated as no improvement.
const RELAX_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone)]
pub(crate) struct Edge {
    pub(crate) to: usize,
    pub(crate) rev: usize,
    pub(crate) cap: i64,
    pub(crate) cost: f64,
}

#[derive(Debug)]
pub(crate) struct MinCostFlow {
    pub(crate) graph: Vec<Vec<Edge>>,
    potential: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
struct HeapEntry {
    dist: f64,
    node: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl Ord for HeapEntry {
    // min-heap on distance, node index breaks ties
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl MinCostFlow {
    pub(crate) fn new(nodes: usize) -> Self {
        Self {
            graph: vec![Vec::new(); nodes],
            potential: vec![0.0; nodes],
        }
    }

    pub(crate) fn add_edge(&mut self, from: usize, to: usize, cap: i64, cost: f64) -> (usize, usize) {
        let from_index = self.graph[from].len();
        let to_index = self.graph[to].len();
        self.graph[from].push(Edge {
            to,
            rev: to_index,
            cap,
            cost,
        });
        self.graph[to].push(Edge {
            to: from,
            rev: from_index,
            cap: 0,
            cost: -cost,
        });
        (from_index, to_index)
    }

    /// Plain Bellman-Ford over residual edges; tolerates the negative costs of
    /// the initial network.
    pub(crate) fn shortest_path_bellman_ford(
        &self,
        source: usize,
    ) -> (Vec<f64>, Vec<usize>, Vec<usize>) {
        let n = self.graph.len();
        let mut dist = vec![f64::INFINITY; n];
        let mut prev_node = vec![usize::MAX; n];
        let mut prev_edge = vec![usize::MAX; n];
        dist[source] = 0.0;

        for _ in 0..n {
            let mut updated = false;
            for u in 0..n {
                let du = dist[u];
                if !du.is_finite() {
                    continue;
                }
                for (edge_idx, edge) in self.graph[u].iter().enumerate() {
                    if edge.cap <= 0 {
                        continue;
                    }
                    let nd = du + edge.cost;
                    if nd + RELAX_EPSILON < dist[edge.to] {
                        dist[edge.to] = nd;
                        prev_node[edge.to] = u;
                        prev_edge[edge.to] = edge_idx;
                        updated = true;
                    }
                }
            }
            if !updated {
                break;
            }
        }
        (dist, prev_node, prev_edge)
    }

    /// Dijkstra on reduced costs `cost + pi(u) - pi(v)`. Only valid once the
    /// potentials come from a previous shortest-path pass.
    fn shortest_path_dijkstra(&self, source: usize) -> (Vec<f64>, Vec<usize>, Vec<usize>) {
        let n = self.graph.len();
        let mut dist = vec![f64::INFINITY; n];
        let mut prev_node = vec![usize::MAX; n];
        let mut prev_edge = vec![usize::MAX; n];
        dist[source] = 0.0;

        let mut heap = BinaryHeap::new();
        heap.push(HeapEntry {
            dist: 0.0,
            node: source,
        });

        while let Some(HeapEntry { dist: du, node: u }) = heap.pop() {
            if du > dist[u] {
                continue;
            }
            for (edge_idx, edge) in self.graph[u].iter().enumerate() {
                if edge.cap <= 0 {
                    continue;
                }
                // rounding can push an exact zero slightly negative
                let reduced = (edge.cost + self.potential[u] - self.potential[edge.to]).max(0.0);
                let nd = du + reduced;
                if nd + RELAX_EPSILON < dist[edge.to] {
                    dist[edge.to] = nd;
                    prev_node[edge.to] = u;
                    prev_edge[edge.to] = edge_idx;
                    heap.push(HeapEntry {
                        dist: nd,
                        node: edge.to,
                    });
                }
            }
        }
        (dist, prev_node, prev_edge)
    }

    /// Successive shortest paths from `source` to `sink`, returning the total
    /// cost of the routed flow.
    pub(crate) fn min_cost_flow(
        &mut self,
        source: usize,
        sink: usize,
        mut flow: i64,
    ) -> Result<f64, ProphetError> {
        let mut total_cost = 0.0;
        let mut first_phase = true;

        while flow > 0 {
            let (dist, prev_node, prev_edge) = if first_phase {
                self.shortest_path_bellman_ford(source)
            } else {
                self.shortest_path_dijkstra(source)
            };
            first_phase = false;

            if !dist[sink].is_finite() {
                return Err(ProphetError::InvalidInput(format!(
                    "flow network cannot route {flow} more unit(s) to the sink"
                )));
            }
            for (potential, d) in self.potential.iter_mut().zip(dist.iter()) {
                if d.is_finite() {
                    *potential += d;
                }
            }

            let mut add_flow = flow;
            let mut v = sink;
            while v != source {
                let u = prev_node[v];
                let eidx = prev_edge[v];
                if u == usize::MAX || eidx == usize::MAX {
                    return Err(ProphetError::InvalidInput(
                        "broken augmenting path in flow network".to_string(),
                    ));
                }
                add_flow = add_flow.min(self.graph[u][eidx].cap);
                v = u;
            }

            v = sink;
            while v != source {
                let u = prev_node[v];
                let eidx = prev_edge[v];
                let rev = self.graph[u][eidx].rev;
                total_cost += self.graph[u][eidx].cost * add_flow as f64;
                self.graph[u][eidx].cap -= add_flow;
                self.graph[v][rev].cap += add_flow;
                v = u;
            }

            flow -= add_flow;
        }

        Ok(total_cost)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_through_cheaper_parallel_path() {
        let mut mcf = MinCostFlow::new(4);
        mcf.add_edge(0, 1, 1, 1.0);
        mcf.add_edge(0, 2, 1, 3.0);
        mcf.add_edge(1, 3, 1, 1.0);
        mcf.add_edge(2, 3, 1, 1.0);
        let cost = mcf.min_cost_flow(0, 3, 1).unwrap();
        assert!((cost - 2.0).abs() < 1e-12);
    }

    #[test]
    fn reroutes_with_negative_costs_across_phases() {
        // second unit must undo part of the first path
        let mut mcf = MinCostFlow::new(4);
        mcf.add_edge(0, 1, 1, 0.0);
        mcf.add_edge(0, 2, 1, 0.0);
        mcf.add_edge(1, 3, 1, -5.0);
        mcf.add_edge(2, 1, 1, -4.0);
        mcf.add_edge(2, 3, 1, -1.0);
        let cost = mcf.min_cost_flow(0, 3, 2).unwrap();
        assert!((cost + 6.0).abs() < 1e-12);
    }

    #[test]
    fn reports_unroutable_flow() {
        let mut mcf = MinCostFlow::new(3);
        mcf.add_edge(0, 1, 1, 1.0);
        let err = mcf.min_cost_flow(0, 2, 1).unwrap_err();
        assert!(matches!(err, ProphetError::InvalidInput(_)));
    }
}
