//! IRC message parsing and construction.
//!
//! Inbound lines are tokenized the way classic servers do it: the first
//! whitespace-delimited token is the verb, and a token beginning with `:`
//! consumes the remainder of the line (embedded whitespace included) as one
//! final parameter. Outbound messages carry an explicit `trailing` field so
//! the serializer knows which parameter gets the `:` sigil; the reply
//! catalog depends on exact placement.

use std::fmt;

/// A single protocol message.
///
/// For inbound messages (built via [`Message::parse`]) the trailing parameter
/// is merged into `params` and `trailing` is `None`; the distinction only
/// matters when serializing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Origin of the message (`:prefix ...`), without the leading colon.
    pub prefix: Option<String>,
    /// Command verb or numeric, as received (uppercase at dispatch time).
    pub command: String,
    /// Middle parameters, serialized space-separated without a sigil.
    pub params: Vec<String>,
    /// Final parameter serialized as ` :<trailing>`, even when it contains
    /// no whitespace.
    pub trailing: Option<String>,
}

impl Message {
    /// Build an outbound message with no trailing parameter.
    pub fn new(
        prefix: impl Into<String>,
        command: impl Into<String>,
        params: Vec<String>,
    ) -> Self {
        Self {
            prefix: Some(prefix.into()),
            command: command.into(),
            params,
            trailing: None,
        }
    }

    /// Build an outbound message with a trailing parameter.
    pub fn with_trailing(
        prefix: impl Into<String>,
        command: impl Into<String>,
        params: Vec<String>,
        trailing: impl Into<String>,
    ) -> Self {
        Self {
            prefix: Some(prefix.into()),
            command: command.into(),
            params,
            trailing: Some(trailing.into()),
        }
    }

    /// Parse one inbound line into a message.
    ///
    /// A trailing `\r` (and `\n`) is trimmed defensively. Returns `None` for
    /// lines that are empty after trimming.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);

        // A leading :token is the origin prefix, not a parameter.
        let mut rest = line.trim_start();
        let mut prefix = None;
        if let Some(after) = rest.strip_prefix(':') {
            let end = after.find(char::is_whitespace).unwrap_or(after.len());
            prefix = Some(after[..end].to_string());
            rest = &after[end..];
        }

        let mut tokens: Vec<String> = Vec::new();
        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                // Rest of the line is a single parameter
                tokens.push(trailing.to_string());
                break;
            }
            match rest.find(char::is_whitespace) {
                Some(i) => {
                    tokens.push(rest[..i].to_string());
                    rest = &rest[i..];
                }
                None => {
                    tokens.push(rest.to_string());
                    break;
                }
            }
        }

        if tokens.is_empty() {
            return None;
        }

        let command = tokens.remove(0);
        Some(Self {
            prefix,
            command,
            params: tokens,
            trailing: None,
        })
    }

    /// Parameter accessor; `arg(0)` is the first parameter after the verb.
    pub fn arg(&self, n: usize) -> Option<&str> {
        self.params.get(n).map(String::as_str)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        f.write_str(&self.command)?;
        for param in &self.params {
            write!(f, " {}", param)?;
        }
        if let Some(trailing) = &self.trailing {
            write!(f, " :{}", trailing)?;
        }
        Ok(())
    }
}
