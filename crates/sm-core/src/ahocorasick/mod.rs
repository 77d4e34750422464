//! Aho-Corasick multi-pattern matcher
//!
//! Build with [`AcBuilder`], seal with [`AcBuilder::build_links`], then scan
//! any number of independent streams with [`AcContext`].

mod automaton;
mod builder;

pub use automaton::{AcContext, AcMatch, AhoCorasick};
pub use builder::{AcBuilder, AcCallback, StateId};
