//! Pattern trie builder
//!
//! Patterns are inserted byte by byte into a trie kept in a flat node arena.
//! `build_links` resolves the suffix ("fail") links breadth-first and seals
//! the trie into an immutable [`AhoCorasick`] automaton.

use std::collections::VecDeque;
use std::sync::Arc;

use log::{debug, trace};

use crate::error::{MatchError, Result};
use crate::types::AcFlags;

use super::automaton::{AcMatch, AhoCorasick};

/// Callback invoked inline for each match when `DO_CALLBACK` is set.
///
/// The automaton is passed by shared reference: callbacks cannot mutate it.
pub type AcCallback<T> = Arc<dyn Fn(&AhoCorasick<T>, &AcMatch<'_, T>) + Send + Sync>;

/// Index of a state in the automaton arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub(crate) usize);

impl StateId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

pub(crate) const ROOT: StateId = StateId(0);

// =============================================================================
// Trie Nodes
// =============================================================================

pub(crate) struct AcNode {
    /// Edge byte leading to this node (`None` only for the root)
    pub(crate) byte: Option<u8>,
    pub(crate) depth: usize,
    /// Outgoing edges, sorted by byte
    pub(crate) children: Vec<(u8, StateId)>,
    /// Longest proper suffix that is also a trie path (`None` only for the root)
    pub(crate) fail: Option<StateId>,
    /// Nearest state on the fail chain that produces output
    pub(crate) dict: Option<StateId>,
    /// Indices into the pattern table of patterns ending here
    pub(crate) outputs: Vec<usize>,
}

impl AcNode {
    fn root() -> Self {
        Self {
            byte: None,
            depth: 0,
            children: Vec::new(),
            fail: None,
            dict: None,
            outputs: Vec::new(),
        }
    }

    #[inline]
    pub(crate) fn child(&self, byte: u8) -> Option<StateId> {
        self.children
            .binary_search_by_key(&byte, |&(b, _)| b)
            .ok()
            .map(|pos| self.children[pos].1)
    }

    #[inline]
    pub(crate) fn is_output(&self) -> bool {
        !self.outputs.is_empty()
    }
}

/// A registered pattern with its user data and optional callback.
pub(crate) struct PatternRecord<T> {
    pub(crate) bytes: Box<[u8]>,
    pub(crate) data: T,
    pub(crate) callback: Option<AcCallback<T>>,
}

// =============================================================================
// Builder
// =============================================================================

/// Mutable trie under construction.
pub struct AcBuilder<T> {
    flags: AcFlags,
    nodes: Vec<AcNode>,
    patterns: Vec<PatternRecord<T>>,
}

impl<T> AcBuilder<T> {
    /// Create an empty trie holding only the root.
    pub fn new(flags: AcFlags) -> Self {
        Self {
            flags,
            nodes: vec![AcNode::root()],
            patterns: Vec::new(),
        }
    }

    pub fn flags(&self) -> AcFlags {
        self.flags
    }

    /// Number of registered pattern records.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Number of trie states, root included.
    pub fn state_count(&self) -> usize {
        self.nodes.len()
    }

    /// Register a pattern.
    ///
    /// Every allocation the insertion needs is reserved before the trie is
    /// touched, so a failed call leaves the builder exactly as it was.
    /// Re-adding a byte-identical pattern replaces its callback and data.
    /// Under `NOCASE`, spellings that differ only in case share one trie
    /// path but keep separate records, and each is reported on a match.
    pub fn add_pattern(
        &mut self,
        pattern: &[u8],
        callback: Option<AcCallback<T>>,
        data: T,
    ) -> Result<()> {
        if pattern.is_empty() {
            return Err(MatchError::EmptyPattern);
        }

        // Follow the part of the path that already exists
        let mut state = ROOT;
        let mut matched = 0;
        for &b in pattern {
            match self.nodes[state.0].child(self.flags.fold(b)) {
                Some(next) => {
                    state = next;
                    matched += 1;
                }
                None => break,
            }
        }

        if matched == pattern.len() {
            let node = &self.nodes[state.0];
            if let Some(&index) = node
                .outputs
                .iter()
                .find(|&&i| &*self.patterns[i].bytes == pattern)
            {
                let record = &mut self.patterns[index];
                record.data = data;
                record.callback = callback;
                return Ok(());
            }
        }

        let missing = pattern.len() - matched;
        let mut tail = Vec::new();
        tail.try_reserve_exact(missing)?;
        for (i, &b) in pattern[matched..].iter().enumerate() {
            let depth = matched + i + 1;
            let mut children = Vec::new();
            let mut outputs = Vec::new();
            if depth < pattern.len() {
                children.try_reserve_exact(1)?;
            } else {
                outputs.try_reserve_exact(1)?;
            }
            tail.push(AcNode {
                byte: Some(self.flags.fold(b)),
                depth,
                children,
                fail: None,
                dict: None,
                outputs,
            });
        }

        let mut bytes = Vec::new();
        bytes.try_reserve_exact(pattern.len())?;
        bytes.extend_from_slice(pattern);

        self.nodes.try_reserve(missing)?;
        self.patterns.try_reserve(1)?;
        if missing > 0 {
            self.nodes[state.0].children.try_reserve(1)?;
        } else {
            self.nodes[state.0].outputs.try_reserve(1)?;
        }

        // Commit
        let mut parent = state;
        for node in tail {
            let id = StateId(self.nodes.len());
            let byte = node.byte.unwrap_or_default();
            let children = &mut self.nodes[parent.0].children;
            let pos = children
                .binary_search_by_key(&byte, |&(b, _)| b)
                .unwrap_or_else(|pos| pos);
            children.insert(pos, (byte, id));
            self.nodes.push(node);
            parent = id;
        }

        let index = self.patterns.len();
        self.patterns.push(PatternRecord {
            bytes: bytes.into_boxed_slice(),
            data,
            callback,
        });
        self.nodes[parent.0].outputs.push(index);

        Ok(())
    }

    /// Resolve fail links breadth-first and seal the automaton.
    pub fn build_links(self) -> Result<AhoCorasick<T>> {
        let Self {
            flags,
            mut nodes,
            patterns,
        } = self;

        let mut queue = VecDeque::new();
        queue.try_reserve(nodes.len())?;

        // Depth-1 states always fail back to the root
        for i in 0..nodes[ROOT.0].children.len() {
            let child = nodes[ROOT.0].children[i].1;
            nodes[child.0].fail = Some(ROOT);
            queue.push_back(child);
        }

        while let Some(state) = queue.pop_front() {
            for i in 0..nodes[state.0].children.len() {
                let (byte, child) = nodes[state.0].children[i];
                let fail = resolve_fail(&nodes, state, byte);
                let dict = if nodes[fail.0].is_output() {
                    Some(fail)
                } else {
                    nodes[fail.0].dict
                };
                trace!(
                    "state {} (depth {}) fails to {}",
                    child.0,
                    nodes[child.0].depth,
                    fail.0
                );
                let node = &mut nodes[child.0];
                node.fail = Some(fail);
                node.dict = dict;
                queue.push_back(child);
            }
        }

        debug!(
            "Aho-Corasick automaton built: {} states, {} patterns, nocase={}",
            nodes.len(),
            patterns.len(),
            flags.contains(AcFlags::NOCASE)
        );

        Ok(AhoCorasick {
            flags,
            nodes,
            patterns,
        })
    }
}

/// Walk the parent's fail chain looking for an edge on `byte`.
fn resolve_fail(nodes: &[AcNode], parent: StateId, byte: u8) -> StateId {
    let mut cursor = nodes[parent.0].fail;
    while let Some(candidate) = cursor {
        if let Some(next) = nodes[candidate.0].child(byte) {
            return next;
        }
        cursor = nodes[candidate.0].fail;
    }
    ROOT
}
