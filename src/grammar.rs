//! A tiny backtracking matcher for the fixed Steam ID text grammars.
//!
//! Patterns are static tables of [Node]s. Optional parts are greedy and
//! alternatives are tried left to right, so the first full match found is
//! the same one a conventional regex engine would report, including which
//! slots were captured.

/// Named capture slots shared by every pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Type,
    Universe,
    Account,
    Instance,
    AuthServer,
}

impl Slot {
    const COUNT: usize = 5;

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug)]
pub enum Node {
    /// Exact text.
    Text(&'static str),
    /// One byte out of the set, not captured.
    Class(&'static [u8]),
    /// One byte out of the set, captured into the slot.
    Capture(Slot, &'static [u8]),
    /// Between 1 and `max` ASCII digits, captured into the slot.
    Digits(Slot, usize),
    /// Zero or one occurrence of the sequence.
    Maybe(&'static [Node]),
    /// The first sequence, or else the second.
    Either(&'static [Node], &'static [Node]),
}

type Spans = [Option<(usize, usize)>; Slot::COUNT];

/// Slot contents of a successful match.
#[derive(Debug, Clone, Copy)]
pub struct Captures<'s> {
    input: &'s str,
    spans: Spans,
}

impl<'s> Captures<'s> {
    pub fn get(&self, slot: Slot) -> Option<&'s str> {
        self.spans[slot.index()].map(|(start, end)| &self.input[start..end])
    }

    pub fn has(&self, slot: Slot) -> bool {
        self.spans[slot.index()].is_some()
    }
}

/// Match `pattern` against the whole of `input`.
pub fn full_match<'s>(pattern: &[Node], input: &'s str) -> Option<Captures<'s>> {
    let mut spans: Spans = [None; Slot::COUNT];
    if step(input.as_bytes(), 0, pattern, None, &mut spans) {
        Some(Captures { input, spans })
    } else {
        None
    }
}

/// What remains to be matched after the current sequence.
struct Cont<'a> {
    nodes: &'a [Node],
    next: Option<&'a Cont<'a>>,
}

fn step(
    input: &[u8],
    pos: usize,
    nodes: &[Node],
    next: Option<&Cont<'_>>,
    spans: &mut Spans,
) -> bool {
    let Some((node, rest)) = nodes.split_first() else {
        return match next {
            Some(cont) => step(input, pos, cont.nodes, cont.next, spans),
            None => pos == input.len(),
        };
    };

    match node {
        Node::Text(text) => {
            input[pos..].starts_with(text.as_bytes())
                && step(input, pos + text.len(), rest, next, spans)
        }
        Node::Class(set) => {
            matches!(input.get(pos), Some(b) if set.contains(b))
                && step(input, pos + 1, rest, next, spans)
        }
        Node::Capture(slot, set) => {
            if !matches!(input.get(pos), Some(b) if set.contains(b)) {
                return false;
            }
            let saved: Spans = *spans;
            spans[slot.index()] = Some((pos, pos + 1));
            if step(input, pos + 1, rest, next, spans) {
                return true;
            }
            *spans = saved;
            false
        }
        Node::Digits(slot, max) => {
            let run: usize = input[pos..]
                .iter()
                .take(*max)
                .take_while(|b| b.is_ascii_digit())
                .count();
            let saved: Spans = *spans;
            for len in (1..=run).rev() {
                spans[slot.index()] = Some((pos, pos + len));
                if step(input, pos + len, rest, next, spans) {
                    return true;
                }
            }
            *spans = saved;
            false
        }
        Node::Maybe(inner) => {
            let cont = Cont { nodes: rest, next };
            let saved: Spans = *spans;
            if step(input, pos, inner, Some(&cont), spans) {
                return true;
            }
            *spans = saved;
            step(input, pos, rest, next, spans)
        }
        Node::Either(left, right) => {
            let cont = Cont { nodes: rest, next };
            let saved: Spans = *spans;
            if step(input, pos, left, Some(&cont), spans) {
                return true;
            }
            *spans = saved;
            step(input, pos, right, Some(&cont), spans)
        }
    }
}
