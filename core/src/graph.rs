//! The payment graph — who has paid whom, as an undirected simple graph.
//!
//! RULE: The graph is built once from batch data and never mutated after.
//! Queries take `&self` and keep all BFS state on the stack of the call,
//! so a built graph can be shared across classifier threads without locks.

use crate::types::{Hops, PersonId};
use std::collections::{HashMap, HashSet};

/// Adjacency map: person -> everyone they have transacted with.
#[derive(Debug, Clone, Default)]
pub struct PaymentGraph {
    adjacency: HashMap<PersonId, HashSet<PersonId>>,
    edges: usize,
}

impl PaymentGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a person. No-op if already present.
    pub fn add_vertex(&mut self, id: PersonId) {
        self.adjacency.entry(id).or_default();
    }

    /// Record that `a` and `b` have transacted. Both vertices are created if
    /// missing. Returns true only when a new edge was inserted.
    ///
    /// `a == b` registers the vertex but stores no self-loop.
    pub fn add_edge(&mut self, a: PersonId, b: PersonId) -> bool {
        self.add_vertex(a);
        self.add_vertex(b);
        if a == b {
            return false;
        }
        let inserted = self.adjacency.entry(a).or_default().insert(b);
        if inserted {
            self.adjacency.entry(b).or_default().insert(a);
            self.edges += 1;
        }
        inserted
    }

    pub fn contains_vertex(&self, id: PersonId) -> bool {
        self.adjacency.contains_key(&id)
    }

    pub fn has_edge(&self, a: PersonId, b: PersonId) -> bool {
        self.adjacency
            .get(&a)
            .is_some_and(|neighbours| neighbours.contains(&b))
    }

    /// Direct contacts of `id`. Empty for unknown people.
    pub fn neighbours(&self, id: PersonId) -> impl Iterator<Item = PersonId> + '_ {
        self.adjacency.get(&id).into_iter().flatten().copied()
    }

    pub fn degree(&self, id: PersonId) -> usize {
        self.adjacency.get(&id).map_or(0, HashSet::len)
    }

    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges
    }

    /// Unweighted shortest-path length between `a` and `b`.
    ///
    /// - `Some(0)` when `a == b`, whether or not `a` is in the graph
    /// - `None` when either person is unknown or no path exists
    pub fn shortest_path_length(&self, a: PersonId, b: PersonId) -> Option<Hops> {
        self.shortest_path_length_within(a, b, Hops::MAX)
    }

    /// Like `shortest_path_length`, but gives up once every path would be
    /// longer than `max_hops`. Distances up to the bound are exact.
    pub fn shortest_path_length_within(
        &self,
        a: PersonId,
        b: PersonId,
        max_hops: Hops,
    ) -> Option<Hops> {
        if a == b {
            return Some(0);
        }
        if !self.contains_vertex(a) || !self.contains_vertex(b) {
            return None;
        }

        // Grow the frontier from the lower-degree end; distance is symmetric.
        let (source, target) = if self.degree(a) <= self.degree(b) {
            (a, b)
        } else {
            (b, a)
        };

        let mut visited: HashSet<PersonId> = HashSet::from([source]);
        let mut frontier: Vec<PersonId> = vec![source];
        let mut depth: Hops = 0;

        while !frontier.is_empty() && depth < max_hops {
            depth += 1;
            let mut next = Vec::new();
            for current in frontier {
                for neighbour in self.neighbours(current) {
                    if neighbour == target {
                        return Some(depth);
                    }
                    if visited.insert(neighbour) {
                        next.push(neighbour);
                    }
                }
            }
            frontier = next;
        }

        None
    }
}
