use std::collections::HashSet;

use log::debug;

use crate::parser::{Signature, SignatureKind};

pub struct OptimizeStats {
    pub before: usize,
    pub after: usize,
    pub deduped: usize,
}

/// Drop repeated signatures, keeping the first occurrence.
///
/// Two signatures are duplicates when kind, value and id all match; the
/// message and source line are ignored.
pub fn optimize_signatures(signatures: &mut Vec<Signature>) -> OptimizeStats {
    let before = signatures.len();

    let mut seen: HashSet<SignatureKey> = HashSet::new();
    let mut deduped = 0usize;
    signatures.retain(|signature| {
        let key = SignatureKey::from(signature);
        if seen.contains(&key) {
            deduped += 1;
            false
        } else {
            seen.insert(key);
            true
        }
    });

    let after = signatures.len();
    debug!("Optimized signatures: {before} -> {after} ({deduped} duplicates)");

    OptimizeStats {
        before,
        after,
        deduped,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SignatureKey {
    kind: SignatureKind,
    id: u32,
}

impl From<&Signature> for SignatureKey {
    fn from(signature: &Signature) -> Self {
        Self {
            kind: signature.kind.clone(),
            id: signature.id,
        }
    }
}
