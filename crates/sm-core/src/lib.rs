//! Signature Matching Core
//!
//! Two matchers used to prequalify traffic against large signature sets:
//!
//! - `ahocorasick`: streaming multi-pattern byte matcher
//! - `radix`: PATRICIA tree for longest-prefix lookups on IP networks
//! - `reload`: swap slot for publishing rebuilt matchers to readers
//! - `types`: flag sets shared by the matchers
//!
//! Both matchers are built once and then read concurrently; mutation after
//! the build phase is not supported.

pub mod ahocorasick;
pub mod error;
pub mod radix;
pub mod reload;
pub mod types;

pub use ahocorasick::{AcBuilder, AcCallback, AcContext, AcMatch, AhoCorasick, StateId};
pub use error::{MatchError, Result};
pub use radix::{ip_to_prefix, Callbacks, Prefix, RadixTree};
pub use reload::Published;
pub use types::{AcFlags, ConsumeFlags};
