//! Compile parsed signatures into matchers
//!
//! Pattern signatures go into one Aho-Corasick automaton, network
//! signatures into one radix tree. Signatures sharing the same literal or
//! network are grouped under a single key so every id is reported.

use std::collections::HashMap;

use log::debug;

use sm_core::error::MatchError;
use sm_core::radix::ip_to_prefix;
use sm_core::{AcBuilder, AcContext, AcFlags, AhoCorasick, Callbacks, ConsumeFlags, Prefix, RadixTree};

use crate::parser::{Signature, SignatureKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Match pattern signatures without regard to ASCII case
    pub nocase: bool,
    /// Report every pattern ending at a position, not just the longest
    pub match_all: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Failed to build matcher: {0}")]
    Match(#[from] MatchError),
}

/// One pattern occurrence attributed to a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub id: u32,
    /// Absolute start offset in the scanned stream
    pub offset: u64,
    pub len: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetStats {
    pub signatures: usize,
    pub patterns: usize,
    pub states: usize,
    pub networks: usize,
}

/// Indices into the signature table sharing one key.
type Group = Vec<usize>;

pub struct SignatureSet {
    options: CompileOptions,
    signatures: Vec<Signature>,
    automaton: AhoCorasick<Group>,
    networks: RadixTree<Group>,
}

pub fn build_signature_set(
    signatures: &[Signature],
    options: &CompileOptions,
) -> Result<SignatureSet, BuildError> {
    let mut pattern_groups: Vec<(&[u8], Group)> = Vec::new();
    let mut pattern_index: HashMap<&[u8], usize> = HashMap::new();
    let mut net_groups: Vec<(&Prefix, Group)> = Vec::new();
    let mut net_index: HashMap<&Prefix, usize> = HashMap::new();

    for (i, signature) in signatures.iter().enumerate() {
        match &signature.kind {
            SignatureKind::Pattern(bytes) => {
                let slot = *pattern_index.entry(bytes.as_slice()).or_insert_with(|| {
                    pattern_groups.push((bytes.as_slice(), Vec::new()));
                    pattern_groups.len() - 1
                });
                pattern_groups[slot].1.push(i);
            }
            SignatureKind::Net(prefix) => {
                let slot = *net_index.entry(prefix).or_insert_with(|| {
                    net_groups.push((prefix, Vec::new()));
                    net_groups.len() - 1
                });
                net_groups[slot].1.push(i);
            }
        }
    }

    let flags = if options.nocase {
        AcFlags::NOCASE
    } else {
        AcFlags::empty()
    };
    let mut builder = AcBuilder::new(flags);
    for (bytes, group) in pattern_groups {
        builder.add_pattern(bytes, None, group)?;
    }
    let automaton = builder.build_links()?;

    let mut networks = RadixTree::with_callbacks(
        Callbacks::default().on_print(|group: &Group| format!("signatures {group:?}")),
    );
    for (prefix, group) in net_groups {
        networks.insert_data(prefix, group)?;
    }

    debug!(
        "Signature set built: {} signatures, {} patterns ({} states), {} networks",
        signatures.len(),
        automaton.pattern_count(),
        automaton.state_count(),
        networks.elements()
    );

    Ok(SignatureSet {
        options: *options,
        signatures: signatures.to_vec(),
        automaton,
        networks,
    })
}

impl SignatureSet {
    pub fn options(&self) -> CompileOptions {
        self.options
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    /// First signature carrying `id`.
    pub fn signature_by_id(&self, id: u32) -> Option<&Signature> {
        self.signatures.iter().find(|s| s.id == id)
    }

    pub fn automaton(&self) -> &AhoCorasick<Group> {
        &self.automaton
    }

    pub fn networks(&self) -> &RadixTree<Group> {
        &self.networks
    }

    /// Fresh streaming context over the pattern automaton.
    pub fn scanner(&self) -> AcContext<'_, Group> {
        self.automaton.context()
    }

    /// Flags to pass to `consume` for this set's options.
    pub fn consume_flags(&self) -> ConsumeFlags {
        if self.options.match_all {
            ConsumeFlags::DO_LIST | ConsumeFlags::MATCH_ALL
        } else {
            ConsumeFlags::DO_LIST
        }
    }

    /// Drain queued matches from `ctx` into hits, one per signature id.
    pub fn collect_hits(&self, ctx: &mut AcContext<'_, Group>, hits: &mut Vec<Hit>) {
        for found in ctx.drain_matches() {
            hits.extend(found.data.iter().map(|&i| Hit {
                id: self.signatures[i].id,
                offset: found.offset,
                len: found.pattern_len(),
            }));
        }
    }

    /// Stream `chunks` through one context and collect every hit.
    pub fn scan<'a, I>(&self, chunks: I) -> Result<Vec<Hit>, MatchError>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let flags = self.consume_flags();
        let mut ctx = self.scanner();
        let mut hits = Vec::new();
        for chunk in chunks {
            ctx.consume(chunk, flags)?;
            self.collect_hits(&mut ctx, &mut hits);
        }
        Ok(hits)
    }

    /// Signatures stored under exactly `addr`.
    pub fn exact(&self, addr: &str) -> Result<Vec<&Signature>, MatchError> {
        let key = ip_to_prefix(addr.as_bytes())?;
        Ok(self.resolve(self.networks.match_exact(&key)))
    }

    /// Signatures of the most specific network covering `addr`.
    pub fn lookup(&self, addr: &str) -> Result<Vec<&Signature>, MatchError> {
        let key = ip_to_prefix(addr.as_bytes())?;
        Ok(self.resolve(self.networks.match_closest(&key)))
    }

    /// Signatures of every network covering `addr`, broadest first.
    pub fn covering(&self, addr: &str) -> Result<Vec<&Signature>, MatchError> {
        let key = ip_to_prefix(addr.as_bytes())?;
        let groups = self.networks.match_all_data(&key).unwrap_or_default();
        Ok(groups
            .into_iter()
            .flat_map(|group| group.iter().map(|&i| &self.signatures[i]))
            .collect())
    }

    fn resolve(&self, group: Option<&Group>) -> Vec<&Signature> {
        group
            .map(|group| group.iter().map(|&i| &self.signatures[i]).collect())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> SetStats {
        SetStats {
            signatures: self.signatures.len(),
            patterns: self.automaton.pattern_count(),
            states: self.automaton.state_count(),
            networks: self.networks.elements(),
        }
    }
}
