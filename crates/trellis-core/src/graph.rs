use crate::model::Model;
use crate::variable::{Interface, VarId};

/// A labeled directed graph over a fixed variable set, stored as an `n×n`
/// adjacency matrix. A directed edge parent→child is `adj[parent][child]`;
/// an undirected graph satisfies `A == Aᵀ`. The diagonal stays clear.
///
/// Positions in the matrix follow the model's variable order; the id table
/// gives O(1) variable→position lookup.
#[derive(Clone, Debug)]
pub struct Graph {
    vars: Vec<VarId>,
    positions: Vec<usize>,
    adj: Vec<bool>,
}

impl Graph {
    /// An edgeless graph over a fixed variable set.
    pub fn new(vars: Vec<VarId>) -> Self {
        let n = vars.len();
        let table = vars.iter().map(|v| v.index()).max().map_or(0, |m| m + 1);
        let mut positions = vec![0usize; table];
        for (pos, v) in vars.iter().enumerate() {
            positions[v.index()] = pos;
        }
        Graph {
            vars,
            positions,
            adj: vec![false; n * n],
        }
    }

    /// The directed graph of a model: one node per variable, one edge per
    /// parent→child relation.
    pub fn from_model(model: &Model) -> Self {
        let mut graph = Graph::new(model.variables().iter().map(|v| v.id()).collect());
        for child in model.variables() {
            for parent in child.parents() {
                graph.add_edge(*parent, child.id());
            }
        }
        graph
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    #[inline]
    pub fn vars(&self) -> &[VarId] {
        &self.vars
    }

    #[inline]
    pub fn var_at(&self, position: usize) -> VarId {
        self.vars[position]
    }

    #[inline]
    pub fn position_of(&self, var: VarId) -> usize {
        self.positions[var.index()]
    }

    #[inline]
    pub fn is_adjacent(&self, from: usize, to: usize) -> bool {
        self.adj[from * self.len() + to]
    }

    /// Whether `child` has `parent` recorded as a parent edge.
    pub fn is_child(&self, parent: VarId, child: VarId) -> bool {
        self.is_adjacent(self.position_of(parent), self.position_of(child))
    }

    pub fn add_edge(&mut self, parent: VarId, child: VarId) {
        let (p, c) = (self.position_of(parent), self.position_of(child));
        let n = self.len();
        self.adj[p * n + c] = true;
    }

    /// Add an undirected edge between two positions.
    pub fn connect(&mut self, a: usize, b: usize) {
        let n = self.len();
        self.adj[a * n + b] = true;
        self.adj[b * n + a] = true;
    }

    /// Positions adjacent to `position`.
    pub fn neighbors(&self, position: usize) -> Vec<usize> {
        (0..self.len())
            .filter(|&other| self.is_adjacent(position, other))
            .collect()
    }

    pub fn neighbor_count(&self, position: usize) -> usize {
        (0..self.len())
            .filter(|&other| self.is_adjacent(position, other))
            .count()
    }

    /// Connect every pair of co-parents: for each node, each pair of its
    /// parents gains an undirected edge. Existing edges are preserved.
    pub fn moralize(&self) -> Graph {
        let n = self.len();
        let mut moral = self.clone();
        for v in 0..n {
            for i in 0..n {
                if !self.is_adjacent(i, v) {
                    continue;
                }
                for j in (i + 1)..n {
                    if self.is_adjacent(j, v) {
                        moral.connect(i, j);
                    }
                }
            }
        }
        moral
    }

    /// Connect every pair of variables sharing the `Outgoing` flag, and
    /// every pair sharing `OldOutgoing`. This forces each time-slice
    /// interface into a common clique so a single joint message can cross
    /// the slice boundary.
    pub fn add_interface_edges(&self, model: &Model) -> Graph {
        let n = self.len();
        let mut augmented = self.clone();
        for i in 0..n {
            let fi = model.variable(self.vars[i]).interface();
            if fi == Interface::None {
                continue;
            }
            for j in (i + 1)..n {
                let fj = model.variable(self.vars[j]).interface();
                if fi == fj {
                    augmented.connect(i, j);
                }
            }
        }
        augmented
    }

    /// The undirected closure `A ∨ Aᵀ`.
    pub fn to_undirected(&self) -> Graph {
        let n = self.len();
        let mut undirected = self.clone();
        for i in 0..n {
            for j in 0..n {
                undirected.adj[i * n + j] = self.adj[i * n + j] || self.adj[j * n + i];
            }
        }
        undirected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;

    fn v_structure() -> Model {
        // A -> C <- B
        let mut builder = Model::builder();
        let a = builder.variable("A", "", &["0", "1"]).unwrap();
        let b = builder.variable("B", "", &["0", "1"]).unwrap();
        let c = builder.variable("C", "", &["0", "1"]).unwrap();
        builder
            .cpt(c, &[a, b], &[0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5, 0.5])
            .unwrap();
        builder.build().unwrap()
    }

    #[test]
    fn directed_edges_follow_parent_lists() {
        let model = v_structure();
        let graph = Graph::from_model(&model);
        let (a, b, c) = (VarId(0), VarId(1), VarId(2));

        assert!(graph.is_child(a, c));
        assert!(graph.is_child(b, c));
        assert!(!graph.is_child(c, a));
        assert!(!graph.is_child(a, b));
    }

    #[test]
    fn moralization_marries_coparents() {
        let model = v_structure();
        let graph = Graph::from_model(&model).moralize();
        let (a, b) = (
            graph.position_of(VarId(0)),
            graph.position_of(VarId(1)),
        );

        assert!(graph.is_adjacent(a, b));
        assert!(graph.is_adjacent(b, a));
    }

    #[test]
    fn undirected_closure_symmetrizes() {
        let model = v_structure();
        let graph = Graph::from_model(&model).to_undirected();
        let (a, c) = (
            graph.position_of(VarId(0)),
            graph.position_of(VarId(2)),
        );

        assert!(graph.is_adjacent(a, c));
        assert!(graph.is_adjacent(c, a));
        assert_eq!(graph.neighbors(c).len(), 2);
    }

    #[test]
    fn diagonal_stays_clear() {
        let model = v_structure();
        let graph = Graph::from_model(&model).moralize().to_undirected();
        for i in 0..graph.len() {
            assert!(!graph.is_adjacent(i, i));
        }
    }
}
