//! Bit-string keys and IP/CIDR parsing
//!
//! A [`Prefix`] is an MSB-first bit string of explicit length. Bits past the
//! length inside the final byte are always zero, so two prefixes with the
//! same significant bits compare equal.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::error::{MatchError, Result};

pub const IPV4_BITS: usize = 32;
pub const IPV6_BITS: usize = 128;

/// Bit-string key for the radix tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Prefix {
    bits: Vec<u8>,
    len: usize,
}

#[inline]
fn bytes_for(len: usize) -> usize {
    len.div_ceil(8)
}

fn mask_tail(bits: &mut [u8], len: usize) {
    let rem = len % 8;
    if rem != 0 {
        if let Some(last) = bits.last_mut() {
            *last &= 0xFFu8 << (8 - rem);
        }
    }
}

impl Prefix {
    /// Zero-length prefix. Covers every key.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Take the first `len` bits of `raw`.
    pub fn new(raw: &[u8], len: usize) -> Result<Self> {
        let available = raw.len() * 8;
        if len > available {
            return Err(MatchError::PrefixLength { len, available });
        }
        let nbytes = bytes_for(len);
        let mut bits = Vec::new();
        bits.try_reserve_exact(nbytes)?;
        bits.extend_from_slice(&raw[..nbytes]);
        mask_tail(&mut bits, len);
        Ok(Self { bits, len })
    }

    pub fn from_ip(addr: IpAddr, len: usize) -> Result<Self> {
        match addr {
            IpAddr::V4(v4) => Self::new(&v4.octets(), len),
            IpAddr::V6(v6) => Self::new(&v6.octets(), len),
        }
    }

    /// Number of significant bits.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Raw bytes; the final byte is zero-padded.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bits
    }

    /// Bit at `index`, counted from the most significant bit.
    ///
    /// # Panics
    /// If `index >= self.len()`.
    #[inline]
    pub fn bit(&self, index: usize) -> bool {
        assert!(index < self.len, "bit {index} out of range for /{}", self.len);
        (self.bits[index / 8] >> (7 - index % 8)) & 1 == 1
    }

    /// Whether every bit of `self` is a leading bit of `other`.
    pub fn is_prefix_of(&self, other: &Prefix) -> bool {
        self.len <= other.len && self.common_len(other, 0) == self.len
    }

    /// Copy of bits `[start, end)`.
    pub(crate) fn slice(&self, start: usize, end: usize) -> Result<Prefix> {
        let len = end - start;
        let mut bits = Vec::new();
        bits.try_reserve_exact(bytes_for(len))?;
        bits.resize(bytes_for(len), 0);
        for i in 0..len {
            if self.bit(start + i) {
                bits[i / 8] |= 0x80 >> (i % 8);
            }
        }
        Ok(Prefix { bits, len })
    }

    pub(crate) fn try_clone(&self) -> Result<Prefix> {
        let mut bits = Vec::new();
        bits.try_reserve_exact(self.bits.len())?;
        bits.extend_from_slice(&self.bits);
        Ok(Prefix {
            bits,
            len: self.len,
        })
    }

    /// Count of leading bits of `self` that equal `key` starting at `offset`.
    pub(crate) fn common_len(&self, key: &Prefix, offset: usize) -> usize {
        let limit = self.len.min(key.len.saturating_sub(offset));
        (0..limit)
            .take_while(|&i| self.bit(i) == key.bit(offset + i))
            .count()
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..self.len {
            if i > 0 && i % 8 == 0 {
                f.write_str(" ")?;
            }
            f.write_str(if self.bit(i) { "1" } else { "0" })?;
        }
        write!(f, "/{}", self.len)
    }
}

impl FromStr for Prefix {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self> {
        ip_to_prefix(s.as_bytes())
    }
}

// =============================================================================
// Address Parsing
// =============================================================================

fn check_nul(text: &[u8]) -> Result<()> {
    match text.iter().position(|&b| b == 0) {
        Some(offset) => Err(MatchError::EmbeddedNul { offset }),
        None => Ok(()),
    }
}

/// Heuristic family check: IPv4 text contains no `:`.
pub fn is_ipv4(text: &[u8]) -> Result<bool> {
    check_nul(text)?;
    Ok(!text.contains(&b':'))
}

/// Heuristic family check: IPv6 text contains a `:`.
pub fn is_ipv6(text: &[u8]) -> Result<bool> {
    check_nul(text)?;
    Ok(text.contains(&b':'))
}

/// Parse `addr` or `addr/mask` into a prefix.
///
/// Without a mask the full address width is used. Host bits past the mask
/// are discarded.
pub fn ip_to_prefix(text: &[u8]) -> Result<Prefix> {
    let v6 = is_ipv6(text)?;
    let text = std::str::from_utf8(text)
        .map_err(|_| MatchError::InvalidAddress(String::from_utf8_lossy(text).into_owned()))?;

    let (addr, mask) = match text.split_once('/') {
        Some((addr, mask)) => (addr, Some(mask)),
        None => (text, None),
    };

    let max = if v6 { IPV6_BITS } else { IPV4_BITS };
    let len = match mask {
        Some(mask) => parse_mask(mask, max)?,
        None => max,
    };

    let ip = if v6 {
        Ipv6Addr::from_str(addr).map(IpAddr::V6)
    } else {
        Ipv4Addr::from_str(addr).map(IpAddr::V4)
    }
    .map_err(|_| MatchError::InvalidAddress(addr.to_string()))?;

    Prefix::from_ip(ip, len)
}

fn parse_mask(mask: &str, max: usize) -> Result<usize> {
    if mask.is_empty() || !mask.bytes().all(|b| b.is_ascii_digit()) {
        return Err(MatchError::InvalidMask(mask.to_string()));
    }
    let len: usize = mask
        .parse()
        .map_err(|_| MatchError::InvalidMask(mask.to_string()))?;
    if len > max {
        return Err(MatchError::InvalidMask(format!("/{len} exceeds /{max}")));
    }
    Ok(len)
}
