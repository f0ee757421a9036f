//! The compiled pattern graph: arena storage, nodes, and the match walk.
//!
//! A compiled pattern is a graph of [`Node`]s whose edges are tried in
//! order during matching. The graph lives in a [`NodeArena`] so that the
//! loop edges built by `*` and `+` are plain indices rather than ownership
//! cycles.

mod arena;
mod node;


pub(crate) use arena::{NodeArena, NodeId};
pub(crate) use node::Node;
