//! Token-driven compilation of pattern source into a node graph.
//!
//! The parser runs left to right over the source, producing a node (or a
//! whole subgraph) per token and keeping finished siblings on a stack.
//! Postfix operators (`?`, `*`, `+`) pop their operand off that stack;
//! prefix operators (`!`, `/`) and the right-hand side of binary operators
//! (`|`, `~`) parse the next token recursively. Once the source is
//! exhausted, the remaining siblings are chained head to tail.

use std::fmt;

use crate::graph::{NodeArena, NodeId};
use crate::state::State;

/// Characters skipped between tokens.
const WHITESPACE: &str = " \t\n\r\x0C\x0B";

/// Table behind the `_` token: space, VT, BS, FF, TAB.
const BLANKS: &str = " \x0B\x08\x0C\t";
/// Table behind the `a` token.
const LETTERS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
/// Table behind the `o` token.
const PUNCTUATION: &str = "!#$%&()*+,-./:;<=>?@[\\]^`{|}~";
/// Table behind the `n` token.
const DIGITS: &str = "0123456789";
/// Table behind the `Q` token.
const DOUBLE_QUOTE: &str = "\"";
/// Table behind the `q` token.
const SINGLE_QUOTE: &str = "'";

/// A malformed pattern: the source being parsed, the byte offset of the
/// offending token, and what went wrong.
///
/// `Display` renders the source with a caret under the token:
///
/// ```text
/// with {
///   'abc
///   ^
///   unmatched string quote, missing closing '\''
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub source: String,
    pub offset: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let column = self.source[..self.offset.min(self.source.len())]
            .chars()
            .count();
        writeln!(f, "with {{")?;
        writeln!(f, "  {}", self.source)?;
        writeln!(f, "  {:>width$}", '^', width = column + 1)?;
        writeln!(f, "  {}", self.message)?;
        write!(f, "}}")
    }
}

impl std::error::Error for ParseError {}

pub(crate) struct Parser<'s, 'a> {
    source: &'s str,
    pos: usize,
    arena: &'a mut NodeArena,
    siblings: Vec<NodeId>,
}

impl<'s, 'a> Parser<'s, 'a> {
    pub(crate) fn new(source: &'s str, arena: &'a mut NodeArena) -> Self {
        Parser {
            source,
            pos: 0,
            arena,
            siblings: Vec::new(),
        }
    }

    /// Parse the whole source. Returns the head of the graph, or `None`
    /// for an empty pattern.
    pub(crate) fn parse(mut self) -> Result<Option<NodeId>, ParseError> {
        while self.pos < self.source.len() {
            if let Some(node) = self.next_token()? {
                self.siblings.push(node);
            }
        }

        let head = self.siblings.first().copied();
        if let Some(head) = head {
            for i in 1..self.siblings.len() {
                let sibling = self.siblings[i];
                self.arena.merge(head, sibling);
            }
        }
        Ok(head)
    }

    /// Produce the node for the next token. `None` means the token
    /// produced nothing: the source is exhausted, or the token was an
    /// empty `{}` group. Whitespace is skipped here.
    fn next_token(&mut self) -> Result<Option<NodeId>, ParseError> {
        loop {
            let Some(token) = self.peek() else {
                return Ok(None);
            };
            match token {
                c if WHITESPACE.contains(c) => self.pos += 1,

                '_' => return self.table(BLANKS).map(Some),
                'a' => return self.table(LETTERS).map(Some),
                'o' => return self.table(PUNCTUATION).map(Some),
                'n' => return self.table(DIGITS).map(Some),
                'Q' => return self.table(DOUBLE_QUOTE).map(Some),
                'q' => return self.table(SINGLE_QUOTE).map(Some),

                '[' => return self.scope().map(Some),
                '^' => return self.any().map(Some),
                '!' => return self.not().map(Some),
                '/' => return self.dash().map(Some),
                '\'' => return self.literal('\'').map(Some),
                '`' => return self.literal('`').map(Some),
                '{' => return self.sequence(),
                '|' => return self.alternation().map(Some),
                '?' => return self.optional().map(Some),
                '*' => return self.star().map(Some),
                '+' => return self.plus().map(Some),
                '~' => return self.wave().map(Some),

                '}' => {
                    return Err(self.error(self.pos, "unmatched sequence brace, missing '{' token"))
                }
                ']' => {
                    return Err(self.error(self.pos, "unmatched scope brace, missing '[' token"))
                }
                _ => {
                    return Err(
                        self.error(self.pos, "unknown token, none of [_aonQq^'`{}[!|/?*+~]")
                    )
                }
            }
        }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn error(&self, offset: usize, message: impl Into<String>) -> ParseError {
        ParseError {
            source: self.source.to_string(),
            offset,
            message: message.into(),
        }
    }

    /// Pop the operand to the left of a postfix or binary operator.
    fn pre_operand(&mut self, op: char, at: usize) -> Result<NodeId, ParseError> {
        self.siblings
            .pop()
            .ok_or_else(|| self.error(at, format!("missing pre-operand for '{op}' operator")))
    }

    /// Parse the operand to the right of a prefix or binary operator.
    fn post_operand(&mut self, op: char, at: usize) -> Result<NodeId, ParseError> {
        match self.next_token()? {
            Some(node) => Ok(node),
            None => Err(self.error(at, format!("missing post-operand for '{op}' operator"))),
        }
    }

    /// One of the predefined character tables.
    fn table(&mut self, chars: &'static str) -> Result<NodeId, ParseError> {
        self.pos += 1;
        Ok(self.arena.alloc(State::Set(chars)))
    }

    /// `^`
    fn any(&mut self) -> Result<NodeId, ParseError> {
        self.pos += 1;
        Ok(self.arena.alloc(State::Any))
    }

    /// `[x-y]` — exactly five characters.
    fn scope(&mut self) -> Result<NodeId, ParseError> {
        let at = self.pos;
        let mut chars = self.source[self.pos..].chars();
        let shape = (
            chars.next(),
            chars.next(),
            chars.next(),
            chars.next(),
            chars.next(),
        );
        match shape {
            (Some('['), Some(lo), Some('-'), Some(hi), Some(']')) => {
                self.pos += 3 + lo.len_utf8() + hi.len_utf8();
                Ok(self.arena.alloc(State::Scope(lo, hi)))
            }
            _ => Err(self.error(at, "scope does not match the shape '[x-y]'")),
        }
    }

    /// `'…'` or `` `…` `` — everything up to the closing quote, verbatim.
    fn literal(&mut self, quote: char) -> Result<NodeId, ParseError> {
        let at = self.pos;
        let body = &self.source[self.pos + 1..];
        match body.find(quote) {
            Some(end) => {
                let text = body[..end].to_string();
                self.pos += 1 + end + 1;
                Ok(self.arena.alloc(State::Str(text)))
            }
            None => Err(self.error(
                at,
                format!("unmatched string quote, missing closing {quote:?}"),
            )),
        }
    }

    /// `{…}` — scan to the matching brace, then parse the body against the
    /// same arena.
    fn sequence(&mut self) -> Result<Option<NodeId>, ParseError> {
        let at = self.pos;
        let body_start = self.pos + 1;
        let mut depth = 1usize;
        let mut body_end = body_start;

        for (i, c) in self.source[body_start..].char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        body_end = body_start + i;
                        break;
                    }
                }
                _ => {}
            }
        }
        if depth > 0 {
            return Err(self.error(at, "unmatched sequence brace, missing '}' token"));
        }

        let body = &self.source[body_start..body_end];
        self.pos = body_end + 1;
        Parser::new(body, self.arena).parse()
    }

    /// `!X` — one character, provided `X` does not match here.
    fn not(&mut self) -> Result<NodeId, ParseError> {
        let at = self.pos;
        self.pos += 1;
        let sub = self.post_operand('!', at)?;
        Ok(self.arena.alloc(State::Not(sub)))
    }

    /// `/X` — assert `X` matches here, consuming nothing.
    fn dash(&mut self) -> Result<NodeId, ParseError> {
        let at = self.pos;
        self.pos += 1;
        let sub = self.post_operand('/', at)?;
        Ok(self.arena.alloc(State::Dash(sub)))
    }

    /// `A|B` — an epsilon hub with both operands as alternatives; `A` gets
    /// the lower ids, so it is tried first.
    fn alternation(&mut self) -> Result<NodeId, ParseError> {
        let at = self.pos;
        let a = self.pre_operand('|', at)?;
        self.pos += 1;
        let b = self.post_operand('|', at)?;

        let hub = self.arena.alloc(State::Eps);
        self.arena.push(hub, a);
        self.arena.push(hub, b);
        Ok(hub)
    }

    /// `A?` — the operand, with an epsilon alternative carrying the higher
    /// id so the empty branch is tried last.
    fn optional(&mut self) -> Result<NodeId, ParseError> {
        let at = self.pos;
        let body = self.pre_operand('?', at)?;
        self.pos += 1;

        let hub = self.arena.alloc(State::Eps);
        self.arena.merge(hub, body);
        let empty = self.arena.alloc(State::Eps);
        self.arena.push(hub, empty);
        Ok(hub)
    }

    /// `A*` — like `A?`, but the body's terminals also loop back to the
    /// hub, so the loop is exercised before falling through.
    fn star(&mut self) -> Result<NodeId, ParseError> {
        let at = self.pos;
        let body = self.pre_operand('*', at)?;
        self.pos += 1;

        let hub = self.arena.alloc(State::Eps);
        self.arena.merge(hub, body);
        self.arena.concat(hub, hub);
        let empty = self.arena.alloc(State::Eps);
        self.arena.push(hub, empty);
        Ok(hub)
    }

    /// `A+` — the operand with its terminals looping back to its own head:
    /// one pass is mandatory, further passes ride the loop.
    fn plus(&mut self) -> Result<NodeId, ParseError> {
        let at = self.pos;
        let body = self.pre_operand('+', at)?;
        self.pos += 1;

        self.arena.concat(body, body);
        Ok(body)
    }

    /// `A~B` — try `B` first; otherwise consume one `A` and loop back to
    /// the hub. `A`'s terminals also lead into a never-matching node, so a
    /// trailing bare `A` cannot be accepted: `B` is mandatory.
    fn wave(&mut self) -> Result<NodeId, ParseError> {
        let at = self.pos;
        let a = self.pre_operand('~', at)?;
        self.pos += 1;
        let b = self.post_operand('~', at)?;

        let hub = self.arena.alloc(State::Eps);
        self.arena.push(hub, b);
        self.arena.push(hub, a);
        self.arena.concat(a, hub);
        let dead = self.arena.alloc(State::None);
        self.arena.merge(a, dead);
        Ok(hub)
    }
}
