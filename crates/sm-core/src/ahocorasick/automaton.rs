//! Sealed automaton and streaming match context
//!
//! An [`AhoCorasick`] is immutable once built and may be shared across
//! threads. Each input stream gets its own [`AcContext`], which carries the
//! current state and byte count across `consume` calls so that a pattern
//! straddling two chunks is still found.

use std::collections::vec_deque::Drain;
use std::collections::VecDeque;
use std::fmt;

use log::trace;

use crate::error::Result;
use crate::types::{AcFlags, ConsumeFlags};

use super::builder::{AcNode, PatternRecord, StateId, ROOT};

// =============================================================================
// Automaton
// =============================================================================

/// Immutable Aho-Corasick automaton.
pub struct AhoCorasick<T> {
    pub(crate) flags: AcFlags,
    pub(crate) nodes: Vec<AcNode>,
    pub(crate) patterns: Vec<PatternRecord<T>>,
}

impl<T> AhoCorasick<T> {
    pub fn flags(&self) -> AcFlags {
        self.flags
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    pub fn state_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn root(&self) -> StateId {
        ROOT
    }

    /// Direct trie edge from `state` on `byte` (folded per tree flags).
    pub fn goto(&self, state: StateId, byte: u8) -> Option<StateId> {
        self.nodes.get(state.0)?.child(self.flags.fold(byte))
    }

    /// Fail link of `state`. The root has none.
    pub fn fail(&self, state: StateId) -> Option<StateId> {
        self.nodes.get(state.0)?.fail
    }

    /// Edge byte leading into `state`. The root has none.
    pub fn state_byte(&self, state: StateId) -> Option<u8> {
        self.nodes.get(state.0)?.byte
    }

    pub fn depth(&self, state: StateId) -> Option<usize> {
        self.nodes.get(state.0).map(|n| n.depth)
    }

    /// Whether at least one pattern ends at `state`.
    pub fn is_output(&self, state: StateId) -> bool {
        self.nodes.get(state.0).is_some_and(AcNode::is_output)
    }

    /// Fresh matching context positioned at the root.
    pub fn context(&self) -> AcContext<'_, T> {
        AcContext::new(self)
    }

    /// Transition on one already-folded byte, following fail links.
    #[inline]
    fn step(&self, mut state: StateId, byte: u8) -> StateId {
        loop {
            let node = &self.nodes[state.0];
            if let Some(next) = node.child(byte) {
                return next;
            }
            match node.fail {
                Some(fail) => state = fail,
                None => return ROOT,
            }
        }
    }
}

// =============================================================================
// Matches
// =============================================================================

/// A single pattern occurrence.
pub struct AcMatch<'t, T> {
    /// The pattern as registered (original case)
    pub pattern: &'t [u8],
    pub data: &'t T,
    /// Start position counted from the first byte ever consumed by the context
    pub offset: u64,
    /// Start position relative to the chunk in which the match completed.
    /// Negative when the match began in an earlier chunk.
    pub relative_offset: i64,
}

impl<T> AcMatch<'_, T> {
    pub fn pattern_len(&self) -> usize {
        self.pattern.len()
    }
}

impl<T> Clone for AcMatch<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for AcMatch<'_, T> {}

impl<T: fmt::Debug> fmt::Debug for AcMatch<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcMatch")
            .field("pattern", &String::from_utf8_lossy(self.pattern))
            .field("data", self.data)
            .field("offset", &self.offset)
            .field("relative_offset", &self.relative_offset)
            .finish()
    }
}

// =============================================================================
// Context
// =============================================================================

/// Per-stream matching state.
pub struct AcContext<'t, T> {
    tree: &'t AhoCorasick<T>,
    current: StateId,
    processed: u64,
    match_count: u64,
    queue: VecDeque<AcMatch<'t, T>>,
}

impl<'t, T> AcContext<'t, T> {
    pub fn new(tree: &'t AhoCorasick<T>) -> Self {
        Self {
            tree,
            current: ROOT,
            processed: 0,
            match_count: 0,
            queue: VecDeque::new(),
        }
    }

    /// Return to the root and forget all counters and queued matches.
    pub fn reset(&mut self) {
        self.current = ROOT;
        self.processed = 0;
        self.match_count = 0;
        self.queue.clear();
    }

    pub fn tree(&self) -> &'t AhoCorasick<T> {
        self.tree
    }

    pub fn current(&self) -> StateId {
        self.current
    }

    /// Total bytes consumed since creation or the last reset.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Total matches reported since creation or the last reset.
    pub fn match_count(&self) -> u64 {
        self.match_count
    }

    /// Number of matches waiting in the queue.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Dequeue the oldest listed match.
    pub fn pop_match(&mut self) -> Option<AcMatch<'t, T>> {
        self.queue.pop_front()
    }

    /// Dequeue every listed match, oldest first.
    pub fn drain_matches(&mut self) -> Drain<'_, AcMatch<'t, T>> {
        self.queue.drain(..)
    }

    /// Feed one chunk through the automaton.
    ///
    /// Returns the number of matches reported for this chunk; zero means no
    /// match. At each position matches are reported deepest first. Without
    /// `MATCH_ALL` only the deepest output state is reported.
    ///
    /// An `Err` stops the chunk part-way: matches already reported stay
    /// counted and queued, but the context no longer sits on a chunk
    /// boundary. Call [`reset`](Self::reset) before reusing it.
    pub fn consume(&mut self, data: &[u8], flags: ConsumeFlags) -> Result<usize> {
        let tree = self.tree;
        let match_all = flags.contains(ConsumeFlags::MATCH_ALL);
        let mut found = 0usize;

        for (index, &raw) in data.iter().enumerate() {
            let next = tree.step(self.current, tree.flags.fold(raw));
            self.current = next;
            self.processed += 1;

            let node = &tree.nodes[next.0];
            let mut cursor = if node.is_output() { Some(next) } else { node.dict };
            while let Some(out) = cursor {
                let out_node = &tree.nodes[out.0];
                for &pattern_index in &out_node.outputs {
                    let record = &tree.patterns[pattern_index];
                    let len = record.bytes.len();
                    let found_match = AcMatch {
                        pattern: &record.bytes,
                        data: &record.data,
                        offset: self.processed - len as u64,
                        relative_offset: (index + 1) as i64 - len as i64,
                    };
                    self.emit(record, found_match, flags)?;
                    self.match_count += 1;
                    found += 1;
                }
                if !match_all {
                    break;
                }
                cursor = out_node.dict;
            }
        }

        trace!(
            "consumed {} bytes, {} matches, state {}",
            data.len(),
            found,
            self.current.0
        );
        Ok(found)
    }

    fn emit(
        &mut self,
        record: &'t PatternRecord<T>,
        found: AcMatch<'t, T>,
        flags: ConsumeFlags,
    ) -> Result<()> {
        if flags.contains(ConsumeFlags::DO_CALLBACK) {
            if let Some(callback) = &record.callback {
                callback(self.tree, &found);
            }
        }
        if flags.contains(ConsumeFlags::DO_LIST) {
            self.queue.try_reserve(1)?;
            self.queue.push_back(found);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ahocorasick::{AcBuilder, AcCallback};
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    const LIST: ConsumeFlags = ConsumeFlags::DO_LIST;

    fn build(flags: AcFlags, patterns: &[&str]) -> AhoCorasick<String> {
        let mut builder = AcBuilder::new(flags);
        for p in patterns {
            builder
                .add_pattern(p.as_bytes(), None, p.to_string())
                .expect("pattern should insert");
        }
        builder.build_links().expect("links should build")
    }

    fn collect(ctx: &mut AcContext<'_, String>) -> Vec<(String, u64, i64)> {
        ctx.drain_matches()
            .map(|m| (m.data.clone(), m.offset, m.relative_offset))
            .collect()
    }

    #[test]
    fn test_shershis_order_and_offsets() {
        let ac = build(AcFlags::empty(), &["he", "she", "his", "hers"]);
        let mut ctx = ac.context();
        let n = ctx
            .consume(b"shershis", LIST | ConsumeFlags::MATCH_ALL)
            .unwrap();
        assert_eq!(n, 4);
        assert_eq!(
            collect(&mut ctx),
            vec![
                ("she".to_string(), 0, 0),
                ("he".to_string(), 1, 1),
                ("hers".to_string(), 1, 1),
                ("his".to_string(), 5, 5),
            ]
        );
        assert_eq!(ctx.processed(), 8);
        assert_eq!(ctx.match_count(), 4);
    }

    #[test]
    fn test_without_match_all_reports_deepest_only() {
        let ac = build(AcFlags::empty(), &["he", "she", "his", "hers"]);
        let mut ctx = ac.context();
        let n = ctx.consume(b"shershis", LIST).unwrap();
        assert_eq!(n, 3);
        let names: Vec<String> = collect(&mut ctx).into_iter().map(|m| m.0).collect();
        assert_eq!(names, vec!["she", "hers", "his"]);
    }

    #[test]
    fn test_chunked_consume_matches_one_shot() {
        let ac = build(AcFlags::empty(), &["he", "she", "his", "hers"]);
        let text = b"shershis";
        for chunk in 1..=3 {
            let mut ctx = ac.context();
            let mut total = 0;
            for piece in text.chunks(chunk) {
                total += ctx.consume(piece, LIST | ConsumeFlags::MATCH_ALL).unwrap();
            }
            assert_eq!(total, 4, "chunk size {chunk}");
            let absolute: Vec<(String, u64)> = ctx
                .drain_matches()
                .map(|m| (m.data.clone(), m.offset))
                .collect();
            assert_eq!(
                absolute,
                vec![
                    ("she".to_string(), 0),
                    ("he".to_string(), 1),
                    ("hers".to_string(), 1),
                    ("his".to_string(), 5),
                ]
            );
        }
    }

    #[test]
    fn test_relative_offset_negative_across_chunks() {
        let ac = build(AcFlags::empty(), &["hers"]);
        let mut ctx = ac.context();
        assert_eq!(ctx.consume(b"she", LIST).unwrap(), 0);
        assert_eq!(ctx.consume(b"rs", LIST).unwrap(), 1);
        let m = ctx.pop_match().expect("hers should be listed");
        assert_eq!(m.offset, 1);
        assert_eq!(m.relative_offset, -2);
        assert_eq!(m.pattern_len(), 4);
    }

    #[test]
    fn test_nocase_matches_mixed_case() {
        let ac = build(AcFlags::NOCASE, &["he", "she", "his", "hers"]);
        let mut ctx = ac.context();
        let n = ctx
            .consume(b"sHeRsHiS", LIST | ConsumeFlags::MATCH_ALL)
            .unwrap();
        assert_eq!(n, 4);
        let m = ctx.pop_match().unwrap();
        assert_eq!(m.pattern, b"she");
    }

    #[test]
    fn test_nocase_reports_each_spelling() {
        let ac = build(AcFlags::NOCASE, &["She", "sHE"]);
        assert_eq!(ac.pattern_count(), 2);
        let mut ctx = ac.context();
        assert_eq!(ctx.consume(b"she", LIST).unwrap(), 2);
        let got = collect(&mut ctx);
        assert_eq!(
            got,
            vec![("She".to_string(), 0, 0), ("sHE".to_string(), 0, 0)]
        );
    }

    #[test]
    fn test_case_sensitive_mixed_case_misses() {
        let ac = build(AcFlags::empty(), &["he", "she", "his", "hers"]);
        let mut ctx = ac.context();
        assert_eq!(ctx.consume(b"sHeRsHiS", LIST).unwrap(), 0);
        assert_eq!(ctx.queued(), 0);
    }

    #[test]
    fn test_nested_repeats() {
        let ac = build(AcFlags::empty(), &["abcabcabc", "abcabc", "abc"]);
        let mut ctx = ac.context();
        let n = ctx
            .consume(b"abcabcabcabc", LIST | ConsumeFlags::MATCH_ALL)
            .unwrap();
        assert_eq!(n, 9);
    }

    #[test]
    fn test_overlapping_suffixes() {
        let ac = build(AcFlags::empty(), &["expen", "pen", "expensive", "sive", "ve"]);
        let mut ctx = ac.context();
        let n = ctx
            .consume(b"expensive", LIST | ConsumeFlags::MATCH_ALL)
            .unwrap();
        assert_eq!(n, 5);
        let got: Vec<(String, u64)> = ctx.drain_matches().map(|m| (m.data.clone(), m.offset)).collect();
        assert_eq!(
            got,
            vec![
                ("expen".to_string(), 0),
                ("pen".to_string(), 2),
                ("expensive".to_string(), 0),
                ("sive".to_string(), 5),
                ("ve".to_string(), 7),
            ]
        );
    }

    #[test]
    fn test_count_only_leaves_queue_empty() {
        let ac = build(AcFlags::empty(), &["abc"]);
        let mut ctx = ac.context();
        assert_eq!(ctx.consume(b"abcabc", ConsumeFlags::empty()).unwrap(), 2);
        assert_eq!(ctx.queued(), 0);
        assert_eq!(ctx.match_count(), 2);
    }

    #[test]
    fn test_match_count_tracks_every_reported_match() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let callback: AcCallback<()> = Arc::new(move |_: &AhoCorasick<()>, _: &AcMatch<'_, ()>| {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        let mut builder = AcBuilder::new(AcFlags::empty());
        builder.add_pattern(b"ab", Some(Arc::clone(&callback)), ()).unwrap();
        builder.add_pattern(b"b", Some(callback), ()).unwrap();
        let ac = builder.build_links().unwrap();

        let mut ctx = ac.context();
        let flags = ConsumeFlags::DO_CALLBACK | ConsumeFlags::MATCH_ALL;
        let mut returned = 0;
        for chunk in [b"xa".as_slice(), b"bab", b"", b"b"] {
            returned += ctx.consume(chunk, flags).unwrap();
            assert_eq!(ctx.match_count(), seen.load(Ordering::Relaxed) as u64);
        }
        assert_eq!(returned, 5);
        assert_eq!(ctx.match_count(), 5);
    }

    #[test]
    fn test_reset_clears_state() {
        let ac = build(AcFlags::empty(), &["hers"]);
        let mut ctx = ac.context();
        ctx.consume(b"he", LIST).unwrap();
        assert_ne!(ctx.current(), ac.root());
        ctx.reset();
        assert_eq!(ctx.current(), ac.root());
        assert_eq!(ctx.processed(), 0);
        assert_eq!(ctx.consume(b"rs", LIST).unwrap(), 0);
    }

    #[test]
    fn test_callback_invoked() {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&hits);
        let callback: AcCallback<u32> = Arc::new(move |tree: &AhoCorasick<u32>, m: &AcMatch<'_, u32>| {
            assert_eq!(tree.pattern_count(), 2);
            sink.lock().unwrap().push((*m.data, m.offset));
        });

        let mut builder = AcBuilder::new(AcFlags::empty());
        builder.add_pattern(b"cat", Some(Arc::clone(&callback)), 1).unwrap();
        builder.add_pattern(b"dog", Some(callback), 2).unwrap();
        let ac = builder.build_links().unwrap();

        let mut ctx = ac.context();
        ctx.consume(b"hotdog and cat", ConsumeFlags::DO_CALLBACK).unwrap();
        assert_eq!(*hits.lock().unwrap(), vec![(2, 3), (1, 11)]);
        assert_eq!(ctx.queued(), 0);
    }

    #[test]
    fn test_callback_skipped_without_flag() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut builder = AcBuilder::new(AcFlags::empty());
        builder
            .add_pattern(
                b"x",
                Some(Arc::new(move |_: &AhoCorasick<()>, _: &AcMatch<'_, ()>| {
                    counter.fetch_add(1, Ordering::Relaxed);
                })),
                (),
            )
            .unwrap();
        let ac = builder.build_links().unwrap();
        let mut ctx = ac.context();
        assert_eq!(ctx.consume(b"xxx", LIST).unwrap(), 3);
        assert_eq!(calls.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_introspection() {
        let ac = build(AcFlags::NOCASE, &["he", "she"]);
        let root = ac.root();
        assert_eq!(ac.state_byte(root), None);
        assert_eq!(ac.fail(root), None);
        let h = ac.goto(root, b'H').expect("nocase goto");
        assert_eq!(ac.state_byte(h), Some(b'h'));
        assert_eq!(ac.fail(h), Some(root));
        let he = ac.goto(h, b'e').unwrap();
        assert!(ac.is_output(he));
        assert_eq!(ac.depth(he), Some(2));
        assert!(ac.goto(he, b'z').is_none());
    }

    #[test]
    fn test_automaton_is_shareable() {
        fn assert_send_sync<S: Send + Sync>() {}
        assert_send_sync::<AhoCorasick<String>>();
    }

    fn reference_matches(patterns: &[Vec<u8>], text: &[u8]) -> Vec<(Vec<u8>, u64)> {
        let mut out = Vec::new();
        for end in 1..=text.len() {
            for p in patterns {
                if p.len() <= end && &text[end - p.len()..end] == p.as_slice() {
                    out.push((p.clone(), (end - p.len()) as u64));
                }
            }
        }
        out.sort();
        out
    }

    proptest! {
        #[test]
        fn chunking_does_not_change_matches(
            patterns in prop::collection::btree_set(prop::collection::vec(b'a'..=b'c', 1..5), 1..8),
            text in prop::collection::vec(b'a'..=b'c', 0..64),
            chunk in 1usize..9,
        ) {
            let patterns: Vec<Vec<u8>> = patterns.into_iter().collect();
            let mut builder = AcBuilder::new(AcFlags::empty());
            for (i, p) in patterns.iter().enumerate() {
                builder.add_pattern(p, None, i).unwrap();
            }
            let ac = builder.build_links().unwrap();
            let flags = ConsumeFlags::DO_LIST | ConsumeFlags::MATCH_ALL;

            let mut whole = ac.context();
            whole.consume(&text, flags).unwrap();
            let whole: Vec<(Vec<u8>, u64)> =
                whole.drain_matches().map(|m| (m.pattern.to_vec(), m.offset)).collect();

            let mut split = ac.context();
            for piece in text.chunks(chunk) {
                split.consume(piece, flags).unwrap();
            }
            let split: Vec<(Vec<u8>, u64)> =
                split.drain_matches().map(|m| (m.pattern.to_vec(), m.offset)).collect();

            prop_assert_eq!(&whole, &split);

            let mut sorted = whole;
            sorted.sort();
            prop_assert_eq!(sorted, reference_matches(&patterns, &text));
        }
    }
}
