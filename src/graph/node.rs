//! Graph nodes, ordered edge sets, and the backtracking match walk.
//!
//! Nodes carry an `id` that totally orders them within one compiled graph.
//! Edge sets and members lists are kept sorted by that id. An edge whose
//! target id is less than or equal to the source id is a loop edge; loops
//! are what `*` and `+` compile to, and they are excluded from the members
//! closure, which is what keeps it finite.

use smallvec::SmallVec;

use crate::graph::arena::{NodeArena, NodeId};
use crate::state::State;

pub(crate) type EdgeSet = SmallVec<[NodeId; 4]>;
pub(crate) type MemberSet = SmallVec<[NodeId; 8]>;

/// Walks deeper than this report no-match instead of recursing further.
/// A loop whose body consumes nothing would otherwise never terminate.
pub(crate) const MAX_DEPTH: u32 = 4096;

/// One state in a compiled pattern graph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Node {
    pub(crate) state: State,
    /// Outgoing edges, sorted by target id, no duplicates.
    pub(crate) edges: EdgeSet,
    /// Cached members closure; `None` until computed, cleared when the
    /// edge set changes.
    members: Option<MemberSet>,
    /// Position of this node in its graph's total order. Assigned while
    /// subgraphs are grafted together during parsing.
    pub(crate) id: u32,
}

impl Node {
    pub(crate) fn with_state(state: State) -> Self {
        Node {
            state,
            ..Node::default()
        }
    }
}

impl NodeArena {
    /// True when `node` has at least one edge leading strictly forward.
    ///
    /// A node whose only edges are loops counts as a terminal of its
    /// subgraph; that is what lets `*` and `+` graphs accept.
    pub(crate) fn has_edges(&self, node: NodeId) -> bool {
        match self[node].edges.last() {
            Some(&max) => self[max].id > self[node].id,
            None => false,
        }
    }

    /// Insert `child` into `node`'s edge set, keeping the set sorted by
    /// target id and duplicate-free. Clears `node`'s members cache.
    pub(crate) fn insert_edge(&mut self, node: NodeId, child: NodeId) {
        if self[node].edges.contains(&child) {
            return;
        }
        let child_id = self[child].id;
        let at = self[node]
            .edges
            .iter()
            .position(|&e| self[e].id > child_id)
            .unwrap_or(self[node].edges.len());
        self[node].edges.insert(at, child);
        self[node].members = None;
    }

    /// Compute the members of `node`'s subgraph: the node itself plus
    /// everything reachable by following edges whose target id is greater
    /// than the id of the node the edge leaves.
    pub(crate) fn seek_members(&self, node: NodeId) -> MemberSet {
        let mut found = MemberSet::new();
        found.push(node);

        let mut work: SmallVec<[NodeId; 8]> = SmallVec::new();
        work.push(node);

        while let Some(current) = work.pop() {
            for i in 0..self[current].edges.len() {
                let target = self[current].edges[i];
                if self[target].id > self[current].id && insert_sorted(&mut found, self, target) {
                    work.push(target);
                }
            }
        }
        found
    }

    /// Members of `node`, served from the cache when one is present.
    pub(crate) fn members(&mut self, node: NodeId) -> MemberSet {
        if let Some(cached) = &self[node].members {
            return cached.clone();
        }
        let members = self.seek_members(node);
        self[node].members = Some(members.clone());
        members
    }

    /// Members of `node` for read-only callers; falls back to a fresh
    /// computation when the cache is cold.
    pub(crate) fn members_of(&self, node: NodeId) -> MemberSet {
        match &self[node].members {
            Some(cached) => cached.clone(),
            None => self.seek_members(node),
        }
    }

    /// The member of `node`'s subgraph with the largest id.
    pub(crate) fn end_of(&mut self, node: NodeId) -> NodeId {
        self.members(node).last().copied().unwrap_or(node)
    }

    /// Shift every member's id by `delta`, moving the subgraph above some
    /// baseline while preserving its internal order.
    fn shift_ids(&mut self, node: NodeId, delta: u32) {
        for member in self.members(node) {
            self[member].id += delta;
        }
    }

    /// Relabel `child`'s subgraph to follow this subgraph's ids, then add
    /// it as a direct alternative of `node`. Returns `child`.
    pub(crate) fn push(&mut self, node: NodeId, child: NodeId) -> NodeId {
        let end = self.end_of(node);
        let zero = self[end].id + 1;
        self.shift_ids(child, zero);
        self.insert_edge(node, child);
        self[node].members = None;
        child
    }

    /// Relabel `child`'s subgraph, then attach it after every terminal of
    /// `node`'s subgraph. Returns `child`.
    pub(crate) fn merge(&mut self, node: NodeId, child: NodeId) -> NodeId {
        let end = self.end_of(node);
        let zero = self[end].id + 1;
        self.shift_ids(child, zero);
        self.concat(node, child)
    }

    /// Attach `child` after every currently-terminal member of `node`'s
    /// subgraph, with no relabeling. When `child` is the subgraph's own
    /// head this creates the loop edges behind `*` and `+`. Returns
    /// `child`.
    pub(crate) fn concat(&mut self, node: NodeId, child: NodeId) -> NodeId {
        for member in self.members(node) {
            if !self.has_edges(member) {
                self.insert_edge(member, child);
            }
        }
        self[node].members = None;
        child
    }

    /// Precompute every node's members cache. Run once at the end of
    /// compilation, after which the graph needs only shared access.
    pub(crate) fn freeze(&mut self) {
        for index in 0..self.len() {
            let node = NodeId::from_index(index);
            let members = self.seek_members(node);
            self[node].members = Some(members);
        }
    }

    /// Walk the graph from `node`, trying to consume `subject` from byte
    /// offset `at`. Returns the offset after the match, or `None`.
    ///
    /// Edges are tried in id order and the first match wins, so
    /// alternatives fire in source order and loops are taken greedily
    /// before their fall-through. A terminal whose edges all fail keeps
    /// its own match.
    pub(crate) fn submit(
        &self,
        node: NodeId,
        subject: &str,
        at: usize,
        depth: u32,
    ) -> Option<usize> {
        if depth >= MAX_DEPTH {
            return None;
        }

        let matched = self[node].state.submit(self, subject, at, depth)?;

        if !self.has_edges(node) && matched >= subject.len() {
            return Some(matched);
        }

        for &edge in &self[node].edges {
            if let Some(forward) = self.submit(edge, subject, matched, depth + 1) {
                return Some(forward);
            }
        }

        if !self.has_edges(node) {
            Some(matched)
        } else {
            None
        }
    }
}

/// Insert `node` into `set` at its id-sorted position, skipping
/// duplicates. Returns true when the node was newly inserted.
fn insert_sorted(set: &mut MemberSet, arena: &NodeArena, node: NodeId) -> bool {
    if set.contains(&node) {
        return false;
    }
    let id = arena[node].id;
    let at = set
        .iter()
        .position(|&m| arena[m].id > id)
        .unwrap_or(set.len());
    set.insert(at, node);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eps(arena: &mut NodeArena, id: u32) -> NodeId {
        let node = arena.alloc(State::Eps);
        arena[node].id = id;
        node
    }

    #[test]
    fn test_insert_edge_keeps_id_order() {
        let mut arena = NodeArena::new();
        let root = eps(&mut arena, 0);
        let hi = eps(&mut arena, 5);
        let mid = eps(&mut arena, 3);
        let lo = eps(&mut arena, 1);

        arena.insert_edge(root, hi);
        arena.insert_edge(root, lo);
        arena.insert_edge(root, mid);

        assert_eq!(arena[root].edges.as_slice(), &[lo, mid, hi]);
    }

    #[test]
    fn test_insert_edge_drops_duplicates() {
        let mut arena = NodeArena::new();
        let root = eps(&mut arena, 0);
        let child = eps(&mut arena, 1);

        arena.insert_edge(root, child);
        arena.insert_edge(root, child);

        assert_eq!(arena[root].edges.len(), 1);
    }

    #[test]
    fn test_back_edge_alone_is_not_forward() {
        let mut arena = NodeArena::new();
        let root = eps(&mut arena, 3);
        let back = eps(&mut arena, 0);

        assert!(!arena.has_edges(root));
        arena.insert_edge(root, back);
        assert!(!arena.has_edges(root));

        let forward = eps(&mut arena, 7);
        arena.insert_edge(root, forward);
        assert!(arena.has_edges(root));
    }

    #[test]
    fn test_members_excludes_loops() {
        // a(0) -> b(1) -> c(2), plus a loop c -> a.
        let mut arena = NodeArena::new();
        let a = eps(&mut arena, 0);
        let b = eps(&mut arena, 1);
        let c = eps(&mut arena, 2);

        arena.insert_edge(a, b);
        arena.insert_edge(b, c);
        arena.insert_edge(c, a);

        assert_eq!(arena.seek_members(a).as_slice(), &[a, b, c]);
        assert_eq!(arena.seek_members(b).as_slice(), &[b, c]);
        assert_eq!(arena.seek_members(c).as_slice(), &[c]);
    }

    #[test]
    fn test_members_handles_shared_targets() {
        // Diamond: a -> b, a -> c, b -> d, c -> d. d appears once.
        let mut arena = NodeArena::new();
        let a = eps(&mut arena, 0);
        let b = eps(&mut arena, 1);
        let c = eps(&mut arena, 2);
        let d = eps(&mut arena, 3);

        arena.insert_edge(a, b);
        arena.insert_edge(a, c);
        arena.insert_edge(b, d);
        arena.insert_edge(c, d);

        assert_eq!(arena.seek_members(a).as_slice(), &[a, b, c, d]);
    }

    #[test]
    fn test_members_cache_cleared_on_edge_change() {
        let mut arena = NodeArena::new();
        let a = eps(&mut arena, 0);
        let b = eps(&mut arena, 1);

        assert_eq!(arena.members(a).len(), 1);
        arena.insert_edge(a, b);
        assert_eq!(arena.members(a).as_slice(), &[a, b]);
    }

    #[test]
    fn test_push_relabels_above_receiver() {
        let mut arena = NodeArena::new();
        let root = eps(&mut arena, 0);
        let child = eps(&mut arena, 0);
        let tail = eps(&mut arena, 1);
        arena.insert_edge(child, tail);

        arena.push(root, child);

        assert_eq!(arena[child].id, 1);
        assert_eq!(arena[tail].id, 2);
        assert_eq!(arena[root].edges.as_slice(), &[child]);
    }

    #[test]
    fn test_concat_targets_terminals_only() {
        // root(0) -> mid(1); mid is the sole terminal, so concat lands on
        // mid and not on root.
        let mut arena = NodeArena::new();
        let root = eps(&mut arena, 0);
        let mid = eps(&mut arena, 1);
        let tail = eps(&mut arena, 2);
        arena.insert_edge(root, mid);

        arena.concat(root, tail);

        assert_eq!(arena[root].edges.as_slice(), &[mid]);
        assert_eq!(arena[mid].edges.as_slice(), &[tail]);
    }

    #[test]
    fn test_self_concat_makes_single_loop_edge() {
        let mut arena = NodeArena::new();
        let root = eps(&mut arena, 0);

        arena.concat(root, root);
        arena.concat(root, root);

        assert_eq!(arena[root].edges.as_slice(), &[root]);
    }

    #[test]
    fn test_end_of_is_max_member() {
        let mut arena = NodeArena::new();
        let a = eps(&mut arena, 0);
        let b = eps(&mut arena, 4);
        let c = eps(&mut arena, 2);
        arena.insert_edge(a, b);
        arena.insert_edge(a, c);

        assert_eq!(arena.end_of(a), b);
    }

    #[test]
    fn test_submit_terminal_keeps_match_mid_subject() {
        let mut arena = NodeArena::new();
        let lit = arena.alloc(State::Str("ab".to_string()));

        assert_eq!(arena.submit(lit, "abxy", 0, 0), Some(2));
        assert_eq!(arena.submit(lit, "zz", 0, 0), None);
    }

    #[test]
    fn test_submit_terminates_on_empty_loop() {
        // A zero-width self loop. The walk abandons the loop at the depth
        // bound and the terminal fallback keeps the zero-width match.
        let mut arena = NodeArena::new();
        let root = arena.alloc(State::Str(String::new()));
        arena.concat(root, root);

        assert_eq!(arena.submit(root, "abc", 0, 0), Some(0));
    }
}
