//! wavematch: a tiny backtracking pattern engine with a compact,
//! non-standard syntax.
//!
//! A pattern compiles into a graph of match states held in an arena.
//! Matching is anchored at the start of the subject: the walk tries each
//! node's alternatives in order, backtracking on failure, and reports how
//! much of the subject's prefix was consumed.
//!
//! # Syntax
//!
//! | token    | meaning                                              |
//! |----------|------------------------------------------------------|
//! | `'…'`, `` `…` `` | literal string                               |
//! | `^`      | any single character                                 |
//! | `[x-y]`  | one character in the inclusive range                 |
//! | `_` `a` `o` `n` `Q` `q` | predefined sets: blanks, letters, punctuation, digits, `"`, `'` |
//! | `{…}`    | grouping; braces nest                                |
//! | `A\|B`   | alternation, tried in source order                   |
//! | `A?` `A*` `A+` | optional, zero-or-more, one-or-more            |
//! | `A~B`    | repeat `A` until `B` matches; `B` is mandatory       |
//! | `!X`     | one character, provided `X` does not match here      |
//! | `/X`     | assert `X` matches here without consuming            |
//!
//! Whitespace between tokens is ignored.
//!
//! # Example
//!
//! ```
//! use wavematch::Regex;
//!
//! let digits = Regex::compile("[0-9]+").unwrap();
//! let m = digits.match_prefix("123abc");
//! assert!(m.ok);
//! assert_eq!(m.view, "123");
//! assert_eq!(m.next, "abc");
//!
//! let comment = Regex::compile("'//' ^~'\n'").unwrap();
//! assert!(comment.is_match("// trailing notes\nrest"));
//! ```

mod dot;
mod graph;
mod parser;
mod state;

pub use parser::ParseError;

use graph::{NodeArena, NodeId};
use parser::Parser;
use std::fmt;

/// Result of submitting a subject to a compiled pattern.
///
/// `view` and `next` always partition the subject: `view` is the matched
/// prefix, `next` the remaining suffix. On failure `view` is empty and
/// `next` is the whole subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match<'s> {
    pub ok: bool,
    pub view: &'s str,
    pub next: &'s str,
}

impl<'s> Match<'s> {
    fn new(subject: &'s str, end: Option<usize>) -> Self {
        match end {
            Some(end) => Match {
                ok: true,
                view: &subject[..end],
                next: &subject[end..],
            },
            None => Match {
                ok: false,
                view: &subject[..0],
                next: subject,
            },
        }
    }
}

/// A compiled pattern: the source text, the node arena, and the head of
/// the graph.
///
/// Compilation precomputes all derived node data, so a `Regex` is
/// immutable afterwards and can be shared freely across threads. Matching
/// allocates nothing.
#[derive(Clone, PartialEq)]
pub struct Regex {
    source: String,
    head: Option<NodeId>,
    arena: NodeArena,
}

impl Regex {
    /// Compile a pattern.
    ///
    /// A malformed pattern yields a [`ParseError`] whose `Display` output
    /// carries the source and a caret under the offending token; it never
    /// yields a partially usable `Regex`.
    pub fn compile(source: &str) -> Result<Regex, ParseError> {
        let mut arena = NodeArena::new();
        let head = Parser::new(source, &mut arena).parse()?;
        arena.freeze();
        Ok(Regex {
            source: source.to_string(),
            head,
            arena,
        })
    }

    /// The pattern text this `Regex` was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Match against a prefix of `subject`, anchored at its start.
    ///
    /// There is no searching: a match either begins at offset zero or does
    /// not exist. Callers that want "find anywhere" iterate offsets
    /// themselves.
    pub fn match_prefix<'s>(&self, subject: &'s str) -> Match<'s> {
        match self.head {
            Some(head) => Match::new(subject, self.arena.submit(head, subject, 0, 0)),
            None => Match::new(subject, None),
        }
    }

    /// True when some prefix of `subject` matches.
    pub fn is_match(&self, subject: &str) -> bool {
        self.match_prefix(subject).ok
    }
}

impl fmt::Debug for Regex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Regex")
            .field("source", &self.source)
            .field("node_count", &self.arena.len())
            .finish()
    }
}
