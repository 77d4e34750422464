//! Flag types for the automaton
//!
//! Tree flags are fixed when the automaton is created; consume flags are
//! chosen per `consume` call.

// =============================================================================
// Automaton Flags
// =============================================================================

bitflags::bitflags! {
    /// Flags fixed at automaton creation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AcFlags: u8 {
        /// Fold ASCII case of every inserted and scanned byte
        const NOCASE = 1 << 0;
    }
}

impl AcFlags {
    /// Canonicalize one byte according to the tree flags.
    #[inline]
    pub fn fold(self, b: u8) -> u8 {
        if self.contains(Self::NOCASE) {
            b.to_ascii_lowercase()
        } else {
            b
        }
    }
}

// =============================================================================
// Consume Flags
// =============================================================================

bitflags::bitflags! {
    /// Per-call matching mode.
    ///
    /// The empty set only counts matches and reports the longest pattern
    /// ending at each position.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ConsumeFlags: u8 {
        /// Report every registered pattern ending at a position, not just the longest
        const MATCH_ALL = 1 << 0;
        /// Queue matches on the context for the caller to dequeue
        const DO_LIST = 1 << 1;
        /// Invoke each pattern's callback inline
        const DO_CALLBACK = 1 << 2;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_nocase() {
        let flags = AcFlags::NOCASE;
        assert_eq!(flags.fold(b'S'), b's');
        assert_eq!(flags.fold(b's'), b's');
        assert_eq!(flags.fold(0xC4), 0xC4);
    }

    #[test]
    fn test_fold_case_sensitive() {
        let flags = AcFlags::empty();
        assert_eq!(flags.fold(b'S'), b'S');
    }

    #[test]
    fn test_consume_flags_combine() {
        let flags = ConsumeFlags::DO_LIST | ConsumeFlags::MATCH_ALL;
        assert!(flags.contains(ConsumeFlags::DO_LIST));
        assert!(!flags.contains(ConsumeFlags::DO_CALLBACK));
    }
}
