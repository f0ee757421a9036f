//! DOT (GraphViz) rendering of compiled pattern graphs.
//!
//! Diagnostics only: the output names nodes by arena index, labels them
//! with their graph id, and draws `Not`/`Dash` sub-automata as tinted
//! clusters.

use rustc_hash::FxHashSet;

use crate::graph::{NodeArena, NodeId};
use crate::state::State;
use crate::Regex;

const GRAPH_MODE: &str = "rankdir=LR;bgcolor=\"#F9F9F9\";compound=true";
const NOT_MODE: &str = "style=filled;bgcolor=\"#FBF3F3\"";
const DASH_MODE: &str = "style=filled;bgcolor=\"#F4FDFF\"";

impl Regex {
    /// Render the compiled graph in DOT form.
    pub fn to_dot(&self) -> String {
        let mut writer = DotWriter {
            arena: &self.arena,
            out: String::new(),
            emitted: FxHashSet::default(),
        };
        writer.out.push_str("strict digraph {\n");

        if let Some(head) = self.head {
            writer.out.push_str(GRAPH_MODE);
            writer.out.push('\n');
            let banner = escape(&self.source);
            let label = writer.label(head);
            writer
                .out
                .push_str(&format!("\"{banner}\" [shape=\"none\"]\n"));
            writer.out.push_str(&format!(
                "\"{banner}\" -> \"n{}\" [label=\"{label}\"]\n",
                head.index(),
            ));

            for member in self.arena.members_of(head) {
                writer.node(member);
            }
        }

        writer.out.push_str("}\n");
        writer.out
    }
}

struct DotWriter<'a> {
    arena: &'a NodeArena,
    out: String,
    emitted: FxHashSet<NodeId>,
}

impl DotWriter<'_> {
    fn node(&mut self, node: NodeId) {
        if !self.emitted.insert(node) {
            return;
        }
        match self.arena[node].state {
            State::Not(sub) => self.cluster(node, sub, NOT_MODE),
            State::Dash(sub) => self.cluster(node, sub, DASH_MODE),
            _ => {
                self.define(node);
                let edges = self.arena[node].edges.clone();
                for edge in edges {
                    self.connect(node, edge);
                }
            }
        }
    }

    /// A lookaround node: a tinted cluster holding its sub-automaton,
    /// with the node's own outgoing edges drawn from the cluster's end.
    fn cluster(&mut self, node: NodeId, sub: NodeId, mode: &str) {
        self.out
            .push_str(&format!("subgraph cluster_n{} {{\n", node.index()));
        self.out.push_str(mode);
        self.out.push('\n');
        self.define(node);
        self.connect(node, sub);

        let members = self.arena.members_of(sub);
        for &member in &members {
            self.node(member);
        }
        self.out.push_str("}\n");

        let end = members.last().copied().unwrap_or(sub);
        let edges = self.arena[node].edges.clone();
        for edge in edges {
            self.connect(end, edge);
        }
    }

    fn define(&mut self, node: NodeId) {
        let shape = if self.arena.has_edges(node) {
            "square"
        } else {
            "circle"
        };
        let id = self.arena[node].id;
        self.out.push_str(&format!(
            "\"n{}\" [shape=\"{shape}\", label=\"{id}\"]\n",
            node.index(),
        ));
    }

    fn connect(&mut self, from: NodeId, to: NodeId) {
        let label = self.label(to);
        self.out.push_str(&format!(
            "\"n{}\" -> \"n{}\" [label=\"{label}\"]\n",
            from.index(),
            to.index(),
        ));
    }

    fn label(&self, node: NodeId) -> String {
        match &self.arena[node].state {
            State::Monostate => String::new(),
            State::Eps => "&Sigma;".to_string(),
            State::Any => "&alpha;".to_string(),
            State::None => "&times;".to_string(),
            State::Not(_) => "!".to_string(),
            State::Dash(_) => "/".to_string(),
            State::Str(text) => escape(&format!("{text:?}")),
            State::Scope(lo, hi) => escape(&format!("[{lo:?}..{hi:?}]")),
            State::Set(table) => {
                let first = table.chars().next();
                let last = table.chars().last();
                match (first, last) {
                    (Some(a), Some(b)) if a == b => escape(&format!("[{a:?}]")),
                    (Some(a), Some(b)) => escape(&format!("[{a:?}..{b:?}]")),
                    _ => "[]".to_string(),
                }
            }
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
