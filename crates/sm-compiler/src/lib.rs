//! Signature List Compiler
//!
//! Parses signature lists and compiles them into an Aho-Corasick automaton
//! for byte patterns and a radix tree for networks.

pub mod parser;
pub mod optimizer;
pub mod builder;

pub use builder::{build_signature_set, BuildError, CompileOptions, Hit, SetStats, SignatureSet};
pub use optimizer::{optimize_signatures, OptimizeStats};
pub use parser::{parse_line, parse_signature_list, ParseError, Signature, SignatureKind};
