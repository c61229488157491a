//! Shared state handed from pass to pass.
//!
//! The [`PropertySet`] carries the resolved target (basis gates, coupling map,
//! physical qubit count) plus whatever earlier passes decided, such as the
//! qubit [`Layout`].

use petgraph::algo::{astar, connected_components};
use petgraph::graph::{NodeIndex, UnGraph};
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;

use qcomp_ir::ALL_GATE_NAMES;

/// Mapping from logical qubits to physical qubits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    logical_to_physical: Vec<u32>,
    physical_to_logical: FxHashMap<u32, u32>,
}

impl Layout {
    /// Logical qubit `i` on physical qubit `i`.
    pub fn trivial(num_qubits: u32) -> Self {
        Self {
            logical_to_physical: (0..num_qubits).collect(),
            physical_to_logical: (0..num_qubits).map(|i| (i, i)).collect(),
        }
    }

    /// Physical location of a logical qubit.
    pub fn physical(&self, logical: u32) -> Option<u32> {
        self.logical_to_physical.get(logical as usize).copied()
    }

    /// Logical qubit currently held by a physical qubit.
    pub fn logical(&self, physical: u32) -> Option<u32> {
        self.physical_to_logical.get(&physical).copied()
    }

    /// Exchange the contents of two physical qubits.
    pub fn swap_physical(&mut self, p1: u32, p2: u32) {
        let l1 = self.physical_to_logical.remove(&p1);
        let l2 = self.physical_to_logical.remove(&p2);
        if let Some(l1) = l1 {
            self.logical_to_physical[l1 as usize] = p2;
            self.physical_to_logical.insert(p2, l1);
        }
        if let Some(l2) = l2 {
            self.logical_to_physical[l2 as usize] = p1;
            self.physical_to_logical.insert(p1, l2);
        }
    }

    /// Number of mapped logical qubits.
    pub fn len(&self) -> usize {
        self.logical_to_physical.len()
    }

    /// Whether no qubits are mapped.
    pub fn is_empty(&self) -> bool {
        self.logical_to_physical.is_empty()
    }
}

/// Undirected connectivity graph between physical qubits.
#[derive(Debug, Clone)]
pub struct CouplingMap {
    num_qubits: u32,
    edges: Vec<(u32, u32)>,
    graph: UnGraph<u32, ()>,
}

impl CouplingMap {
    /// Build a coupling map from an edge list. Duplicate edges are collapsed.
    pub fn from_edges(num_qubits: u32, edges: &[(u32, u32)]) -> Self {
        let mut graph = UnGraph::with_capacity(num_qubits as usize, edges.len());
        for q in 0..num_qubits {
            graph.add_node(q);
        }
        let mut seen = FxHashSet::default();
        let mut kept = Vec::with_capacity(edges.len());
        for &(a, b) in edges {
            let key = (a.min(b), a.max(b));
            if a == b || a >= num_qubits || b >= num_qubits || !seen.insert(key) {
                continue;
            }
            graph.add_edge(NodeIndex::new(a as usize), NodeIndex::new(b as usize), ());
            kept.push(key);
        }
        Self {
            num_qubits,
            edges: kept,
            graph,
        }
    }

    /// Linear chain `0 - 1 - ... - (n-1)`.
    pub fn linear(n: u32) -> Self {
        let edges: Vec<_> = (1..n).map(|i| (i - 1, i)).collect();
        Self::from_edges(n, &edges)
    }

    /// Star with every qubit connected to `center`.
    pub fn star(n: u32, center: u32) -> Self {
        let edges: Vec<_> = (0..n).filter(|&i| i != center).map(|i| (center, i)).collect();
        Self::from_edges(n, &edges)
    }

    /// Number of physical qubits.
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Normalised edge list (smaller index first).
    pub fn edges(&self) -> &[(u32, u32)] {
        &self.edges
    }

    /// Whether two physical qubits share an edge.
    pub fn is_adjacent(&self, q1: u32, q2: u32) -> bool {
        q1 < self.num_qubits
            && q2 < self.num_qubits
            && self
                .graph
                .contains_edge(NodeIndex::new(q1 as usize), NodeIndex::new(q2 as usize))
    }

    /// Whether every qubit can reach every other qubit.
    pub fn is_connected(&self) -> bool {
        self.num_qubits <= 1 || connected_components(&self.graph) == 1
    }

    /// Shortest path between two physical qubits, endpoints included.
    pub fn shortest_path(&self, from: u32, to: u32) -> Option<Vec<u32>> {
        if from >= self.num_qubits || to >= self.num_qubits {
            return None;
        }
        let goal = NodeIndex::new(to as usize);
        astar(
            &self.graph,
            NodeIndex::new(from as usize),
            |n| n == goal,
            |_| 1u32,
            |_| 0u32,
        )
        .map(|(_, path)| path.into_iter().map(|n| n.index() as u32).collect())
    }
}

/// The set of gate names a target executes natively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasisGates {
    names: FxHashSet<String>,
}

impl BasisGates {
    /// Basis from explicit gate names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Every gate the IR knows.
    pub fn all() -> Self {
        Self::new(ALL_GATE_NAMES.iter().copied())
    }

    /// Superconducting-style basis: RZ, SX, X, CX.
    pub fn rz_sx_cx() -> Self {
        Self::new(["rz", "sx", "x", "cx"])
    }

    /// Trapped-ion-style basis: PRX, CZ.
    pub fn prx_cz() -> Self {
        Self::new(["prx", "cz"])
    }

    /// Whether the basis contains the named gate.
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Keep only the names also present in `other`.
    pub fn intersect(&self, other: &BasisGates) -> BasisGates {
        Self {
            names: self.names.intersection(&other.names).cloned().collect(),
        }
    }

    /// Gate names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Whether the basis is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl fmt::Display for BasisGates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.names().join(", "))
    }
}

/// State shared across the passes of one compilation.
#[derive(Debug, Clone)]
pub struct PropertySet {
    /// Physical qubits available on the target.
    pub num_physical_qubits: u32,
    /// Native gate set.
    pub basis_gates: BasisGates,
    /// Connectivity. `None` means all-to-all.
    pub coupling_map: Option<CouplingMap>,
    /// Initial placement, written by the layout pass.
    pub layout: Option<Layout>,
    /// Placement after routing.
    pub final_layout: Option<Layout>,
}

impl PropertySet {
    /// Properties for an all-to-all target supporting every gate.
    pub fn unconstrained(num_physical_qubits: u32) -> Self {
        Self {
            num_physical_qubits,
            basis_gates: BasisGates::all(),
            coupling_map: None,
            layout: None,
            final_layout: None,
        }
    }

    /// Set the coupling map and basis gates.
    #[must_use]
    pub fn with_target(mut self, coupling_map: Option<CouplingMap>, basis_gates: BasisGates) -> Self {
        self.coupling_map = coupling_map;
        self.basis_gates = basis_gates;
        self
    }

    /// Whether two physical qubits may host a two-qubit gate.
    pub fn allows_interaction(&self, q1: u32, q2: u32) -> bool {
        match &self.coupling_map {
            Some(map) => map.is_adjacent(q1, q2),
            None => q1 < self.num_physical_qubits && q2 < self.num_physical_qubits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_paths() {
        let map = CouplingMap::linear(5);
        assert!(map.is_adjacent(1, 2));
        assert!(map.is_adjacent(2, 1));
        assert!(!map.is_adjacent(0, 2));
        assert_eq!(map.shortest_path(0, 3), Some(vec![0, 1, 2, 3]));
        assert!(map.is_connected());
    }

    #[test]
    fn test_star_paths_go_through_center() {
        let map = CouplingMap::star(5, 2);
        assert_eq!(map.shortest_path(0, 4), Some(vec![0, 2, 4]));
        assert_eq!(map.edges().len(), 4);
    }

    #[test]
    fn test_disconnected_map() {
        let map = CouplingMap::from_edges(4, &[(0, 1), (2, 3), (1, 0), (3, 3)]);
        assert_eq!(map.edges(), &[(0, 1), (2, 3)]);
        assert!(!map.is_connected());
        assert_eq!(map.shortest_path(0, 3), None);
    }

    #[test]
    fn test_layout_swap() {
        let mut layout = Layout::trivial(3);
        layout.swap_physical(0, 2);
        assert_eq!(layout.physical(0), Some(2));
        assert_eq!(layout.physical(2), Some(0));
        assert_eq!(layout.logical(2), Some(0));
        assert_eq!(layout.physical(1), Some(1));
    }

    #[test]
    fn test_layout_swap_with_empty_slot() {
        let mut layout = Layout::trivial(2);
        layout.swap_physical(1, 4);
        assert_eq!(layout.physical(1), Some(4));
        assert_eq!(layout.logical(1), None);
        assert_eq!(layout.logical(4), Some(1));
    }

    #[test]
    fn test_basis_intersection() {
        let basis = BasisGates::rz_sx_cx().intersect(&BasisGates::new(["rz", "cx", "h"]));
        assert_eq!(basis.names(), vec!["cx", "rz"]);
        assert_eq!(basis.to_string(), "[cx, rz]");
    }
}
