//! Radix (PATRICIA) tree for longest-prefix lookups
//!
//! Keys are arbitrary bit strings; [`ip_to_prefix`] turns IPv4/IPv6 text
//! with an optional `/mask` into one.

mod prefix;
mod tree;

pub use prefix::{ip_to_prefix, is_ipv4, is_ipv6, Prefix, IPV4_BITS, IPV6_BITS};
pub use tree::{Callbacks, CloneFn, FreeFn, PrintFn, RadixTree};
