//! Signature list parser
//!
//! One signature per line:
//!
//! ```text
//! # comment
//! pattern "<literal>" <id> ["message"]
//! net <cidr> <id> ["message"]
//! ```

use log::{debug, warn};

use sm_core::error::MatchError;
use sm_core::radix::{ip_to_prefix, Prefix};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SignatureKind {
    /// Byte literal fed to the automaton
    Pattern(Vec<u8>),
    /// Network fed to the prefix tree
    Net(Prefix),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub kind: SignatureKind,
    pub id: u32,
    pub message: Option<String>,
    /// 1-based source line
    pub line: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Line {line}: unknown directive '{directive}'")]
    UnknownDirective { line: usize, directive: String },
    #[error("Line {line}: missing {field}")]
    MissingField { line: usize, field: &'static str },
    #[error("Line {line}: invalid escape {detail}")]
    BadEscape { line: usize, detail: String },
    #[error("Line {line}: unterminated quoted string")]
    Unterminated { line: usize },
    #[error("Line {line}: empty pattern")]
    EmptyPattern { line: usize },
    #[error("Line {line}: invalid id '{value}'")]
    InvalidId { line: usize, value: String },
    #[error("Line {line}: {source}")]
    Address {
        line: usize,
        #[source]
        source: MatchError,
    },
    #[error("Line {line}: unexpected trailing text '{text}'")]
    Trailing { line: usize, text: String },
}

/// Parse a whole list, skipping lines that fail to parse.
pub fn parse_signature_list(text: &str) -> Vec<Signature> {
    let mut signatures = Vec::new();
    let mut skipped = 0usize;

    for (index, raw_line) in text.lines().enumerate() {
        match parse_line(index + 1, raw_line) {
            Ok(Some(signature)) => signatures.push(signature),
            Ok(None) => {}
            Err(e) => {
                skipped += 1;
                warn!("Skipping signature: {e}");
            }
        }
    }

    debug!(
        "Parsed {} signatures ({} lines skipped)",
        signatures.len(),
        skipped
    );
    signatures
}

/// Parse one line. Blank lines and comments yield `None`.
pub fn parse_line(line: usize, text: &str) -> Result<Option<Signature>, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let mut fields = Fields {
        rest: trimmed,
        line,
    };
    let directive = fields.bare().unwrap_or_default();

    let kind = if directive.eq_ignore_ascii_case("pattern") {
        let literal = fields
            .quoted()?
            .ok_or(ParseError::MissingField {
                line,
                field: "pattern literal",
            })?;
        if literal.is_empty() {
            return Err(ParseError::EmptyPattern { line });
        }
        SignatureKind::Pattern(literal)
    } else if directive.eq_ignore_ascii_case("net") {
        let cidr = fields.bare().ok_or(ParseError::MissingField {
            line,
            field: "network",
        })?;
        let prefix = ip_to_prefix(cidr.as_bytes())
            .map_err(|source| ParseError::Address { line, source })?;
        SignatureKind::Net(prefix)
    } else {
        return Err(ParseError::UnknownDirective {
            line,
            directive: directive.to_string(),
        });
    };

    let id_text = fields.bare().ok_or(ParseError::MissingField {
        line,
        field: "signature id",
    })?;
    let id = id_text.parse::<u32>().map_err(|_| ParseError::InvalidId {
        line,
        value: id_text.to_string(),
    })?;

    let message = fields
        .quoted()?
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned());
    fields.finish()?;

    Ok(Some(Signature {
        kind,
        id,
        message,
        line,
    }))
}

/// Whitespace-separated field cursor over one line.
struct Fields<'a> {
    rest: &'a str,
    line: usize,
}

impl<'a> Fields<'a> {
    fn bare(&mut self) -> Option<&'a str> {
        self.rest = self.rest.trim_start();
        if self.rest.is_empty() {
            return None;
        }
        let end = self
            .rest
            .find(char::is_whitespace)
            .unwrap_or(self.rest.len());
        let (token, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(token)
    }

    /// Next field as a decoded quoted string, or `None` at end of line.
    fn quoted(&mut self) -> Result<Option<Vec<u8>>, ParseError> {
        self.rest = self.rest.trim_start();
        if self.rest.is_empty() {
            return Ok(None);
        }
        let line = self.line;
        let Some(body) = self.rest.strip_prefix('"') else {
            return Err(ParseError::MissingField {
                line,
                field: "opening quote",
            });
        };

        let bytes = body.as_bytes();
        let mut out = Vec::with_capacity(bytes.len());
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'"' => {
                    self.rest = &body[i + 1..];
                    return Ok(Some(out));
                }
                b'\\' => {
                    let escape = *bytes.get(i + 1).ok_or(ParseError::Unterminated { line })?;
                    let decoded = match escape {
                        b'\\' => b'\\',
                        b'"' => b'"',
                        b'n' => b'\n',
                        b'r' => b'\r',
                        b't' => b'\t',
                        b'0' => 0,
                        b'x' => {
                            let hex = bytes.get(i + 2..i + 4).ok_or(ParseError::BadEscape {
                                line,
                                detail: "\\x needs two hex digits".to_string(),
                            })?;
                            let value = Some(hex)
                                .filter(|h| h.iter().all(u8::is_ascii_hexdigit))
                                .and_then(|h| std::str::from_utf8(h).ok())
                                .and_then(|h| u8::from_str_radix(h, 16).ok())
                                .ok_or_else(|| ParseError::BadEscape {
                                    line,
                                    detail: format!("\\x{}", String::from_utf8_lossy(hex)),
                                })?;
                            i += 2;
                            value
                        }
                        other => {
                            return Err(ParseError::BadEscape {
                                line,
                                detail: format!("\\{}", other as char),
                            })
                        }
                    };
                    out.push(decoded);
                    i += 2;
                }
                b => {
                    out.push(b);
                    i += 1;
                }
            }
        }

        Err(ParseError::Unterminated { line })
    }

    fn finish(&mut self) -> Result<(), ParseError> {
        let rest = self.rest.trim();
        if rest.is_empty() {
            Ok(())
        } else {
            Err(ParseError::Trailing {
                line: self.line,
                text: rest.to_string(),
            })
        }
    }
}
