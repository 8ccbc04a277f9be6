//! Delta graphs: a graph view of infinity witnesses.
//!
//! Nodes are witnesses (delta lists), grouped by length. Two nodes of the
//! same length are joined by an edge labelled `k` when they differ in exactly
//! one delta and both differing deltas sit at choice index `k`.
//!
//! A node with `degree - 1` neighbours at label `k` is part of a clique that
//! covers every value at `k`; [`DeltaGraph::fusion`] replaces the clique by the
//! node with index `k` removed. Once the empty node appears, every choice is
//! infinite, which lets the analysis stop early.

use std::collections::BTreeMap;

use indexmap::{IndexMap, IndexSet};

use crate::algebra::Delta;

type Node = Vec<Delta>;

#[derive(Clone, Debug)]
pub struct DeltaGraph {
    degree: usize,
    levels: BTreeMap<usize, IndexMap<Node, IndexMap<Node, usize>>>,
}

impl Default for DeltaGraph {
    fn default() -> Self {
        Self::new(3)
    }
}

impl DeltaGraph {
    /// Graph for choices with `degree` values per index.
    pub fn new(degree: usize) -> Self {
        Self {
            degree,
            levels: BTreeMap::new(),
        }
    }

    pub fn insert_node(&mut self, node: Node) {
        let level = self.levels.entry(node.len()).or_default();
        if level.contains_key(&node) {
            return;
        }
        let edges: Vec<(Node, usize)> = level
            .keys()
            .filter_map(|other| Self::node_diff(&node, other).map(|label| (other.clone(), label)))
            .collect();
        level.insert(node.clone(), IndexMap::new());
        for (other, label) in edges {
            if let Some(adj) = level.get_mut(&node) {
                adj.insert(other.clone(), label);
            }
            if let Some(adj) = level.get_mut(&other) {
                adj.insert(node.clone(), label);
            }
        }
    }

    /// Index at which two same-length nodes differ, if they differ in
    /// exactly one delta at a shared index.
    pub fn node_diff(a: &[Delta], b: &[Delta]) -> Option<usize> {
        if a.len() != b.len() {
            return None;
        }
        let mut diff = None;
        for (x, y) in a.iter().zip(b) {
            if x == y {
                continue;
            }
            if diff.is_some() || x.index != y.index {
                return None;
            }
            diff = Some(x.index);
        }
        diff
    }

    fn is_full(&self, node: &Node, index: usize) -> bool {
        self.levels
            .get(&node.len())
            .and_then(|level| level.get(node))
            .map_or(false, |adj| {
                adj.values().filter(|&&label| label == index).count() + 1 == self.degree
            })
    }

    /// Remove `node` and, transitively, its neighbours along `index` edges.
    fn remove_clique(&mut self, node: &Node, index: usize) {
        let Some(level) = self.levels.get_mut(&node.len()) else {
            return;
        };
        let mut pending: IndexSet<Node> = IndexSet::new();
        pending.insert(node.clone());
        while let Some(current) = pending.pop() {
            let Some(adj) = level.shift_remove(&current) else {
                continue;
            };
            for (neighbour, label) in adj {
                if label == index {
                    pending.insert(neighbour);
                } else if let Some(n_adj) = level.get_mut(&neighbour) {
                    n_adj.shift_remove(&current);
                }
            }
        }
    }

    /// Contract same-label cliques until none is left.
    pub fn fusion(&mut self) {
        loop {
            let mut changed = false;
            let max = self.levels.keys().next_back().copied().unwrap_or(0);
            for size in (1..=max).rev() {
                let nodes: Vec<Node> = self
                    .levels
                    .get(&size)
                    .map(|level| level.keys().cloned().collect())
                    .unwrap_or_default();
                for node in nodes {
                    for index in node.iter().map(|d| d.index) {
                        let present = self
                            .levels
                            .get(&size)
                            .is_some_and(|level| level.contains_key(&node));
                        if present && self.is_full(&node, index) {
                            self.remove_clique(&node, index);
                            let shorter: Node =
                                node.iter().filter(|d| d.index != index).copied().collect();
                            self.insert_node(shorter);
                            changed = true;
                        }
                    }
                }
            }
            if !changed {
                return;
            }
        }
    }

    /// The empty witness is present: every choice is infinite.
    pub fn is_empty(&self) -> bool {
        self.levels
            .get(&0)
            .is_some_and(|level| level.contains_key(&Vec::new()))
    }

    /// All nodes, shortest first.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.levels.values().flat_map(|level| level.keys())
    }

    pub fn len(&self) -> usize {
        self.levels.values().map(IndexMap::len).sum()
    }
}
