//! Control channel replies
//!
//! Parses `<code><space-or-hyphen><text>` reply lines and classifies a reply
//! against the exact codes the issuing command expects.

use std::fmt;

use crate::error::ReplyError;

/// One parsed reply line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyLine {
    pub code: u16,
    /// `false` for `xyz-` continuation lines
    pub last: bool,
    pub text: String,
}

/// A complete server reply. Multi-line replies keep every line; the message
/// is the text of the closing line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    code: u16,
    message: String,
    lines: Vec<String>,
}

/// Outcome of checking a reply against the expected codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyClass {
    Success,
    Failure(String),
}

impl ReplyLine {
    pub fn parse(line: &str) -> Result<Self, ReplyError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let bytes = line.as_bytes();
        if bytes.len() < 4 || !bytes[..3].iter().all(u8::is_ascii_digit) {
            return Err(ReplyError::Malformed(line.to_string()));
        }
        let last = match bytes[3] {
            b' ' => true,
            b'-' => false,
            _ => return Err(ReplyError::Malformed(line.to_string())),
        };
        let code = bytes[..3]
            .iter()
            .fold(0u16, |acc, b| acc * 10 + (b - b'0') as u16);
        Ok(ReplyLine {
            code,
            last,
            text: line[4..].to_string(),
        })
    }
}

impl Reply {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            code,
            lines: vec![message.clone()],
            message,
        }
    }

    /// Parses a single reply line, `xyz text` or `xyz-text`.
    pub fn parse(line: &str) -> Result<Self, ReplyError> {
        let line = ReplyLine::parse(line)?;
        Ok(Reply::new(line.code, line.text))
    }

    pub(crate) fn from_lines(code: u16, lines: Vec<String>) -> Self {
        let message = lines.last().cloned().unwrap_or_default();
        Self {
            code,
            message,
            lines,
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_multi_line(&self) -> bool {
        self.lines.len() > 1
    }

    /// Exact-match classification: success iff the code is one of `expected`.
    pub fn classify(&self, expected: &[u16]) -> ReplyClass {
        if expected.contains(&self.code) {
            ReplyClass::Success
        } else {
            ReplyClass::Failure(self.to_string())
        }
    }

    /// Byte count carried by a `213` SIZE reply.
    pub fn size_value(&self) -> Option<u64> {
        self.message.split_whitespace().next()?.parse().ok()
    }

    /// Directory name quoted in a `257` PWD/MKD reply, `"` doubling undone.
    pub fn quoted_path(&self) -> Option<String> {
        let start = self.message.find('"')?;
        let end = self.message.rfind('"')?;
        if end <= start {
            return None;
        }
        Some(self.message[start + 1..end].replace("\"\"", "\""))
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Command;

    #[test]
    fn test_parse_single_line() {
        let reply = Reply::parse("226 Transfer complete.\r\n").unwrap();
        assert_eq!(reply.code(), 226);
        assert_eq!(reply.message(), "Transfer complete.");
        assert!(!reply.is_multi_line());
    }

    #[test]
    fn test_parse_continuation_line() {
        let line = ReplyLine::parse("211-Features:").unwrap();
        assert_eq!(line.code, 211);
        assert!(!line.last);
        assert_eq!(line.text, "Features:");
    }

    #[test]
    fn test_parse_empty_text() {
        let reply = Reply::parse("200 ").unwrap();
        assert_eq!(reply.code(), 200);
        assert_eq!(reply.message(), "");
    }

    #[test]
    fn test_parse_malformed() {
        for line in ["", "22", "226", "2a6 nope", "226Transfer", "abc def"] {
            assert!(
                matches!(Reply::parse(line), Err(ReplyError::Malformed(_))),
                "{line:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_classify_exact_match() {
        let complete = Reply::parse("226 Transfer complete.").unwrap();
        assert_eq!(
            complete.classify(Command::Retr("a".into()).completion_codes()),
            ReplyClass::Success
        );

        let missing = Reply::parse("550 File not found.").unwrap();
        assert_eq!(
            missing.classify(Command::Size("a".into()).expected_codes()),
            ReplyClass::Failure("550 File not found.".into())
        );
    }

    #[test]
    fn test_classify_pending_depends_on_command() {
        let pending = Reply::parse("350 Restarting at 1024.").unwrap();
        assert_eq!(
            pending.classify(Command::Rest(1024).expected_codes()),
            ReplyClass::Success
        );
        assert_eq!(
            pending.classify(Command::Rnfr("a".into()).expected_codes()),
            ReplyClass::Success
        );
        assert!(matches!(
            pending.classify(Command::Cwd("a".into()).expected_codes()),
            ReplyClass::Failure(_)
        ));
        assert!(matches!(
            pending.classify(Command::Stor("a".into()).expected_codes()),
            ReplyClass::Failure(_)
        ));

        let superfluous = Reply::parse("202 Command not implemented.").unwrap();
        assert!(matches!(
            superfluous.classify(Command::Type(crate::protocol::TransferType::Binary).expected_codes()),
            ReplyClass::Failure(_)
        ));
    }

    #[test]
    fn test_size_value() {
        let reply = Reply::parse("213 1048576").unwrap();
        assert_eq!(reply.size_value(), Some(1_048_576));
        let reply = Reply::parse("213 ").unwrap();
        assert_eq!(reply.size_value(), None);
    }

    #[test]
    fn test_quoted_path() {
        let reply = Reply::parse("257 \"/home/\"\"odd\"\"\" is the current directory").unwrap();
        assert_eq!(reply.quoted_path().as_deref(), Some("/home/\"odd\""));
        let reply = Reply::parse("257 no quotes here").unwrap();
        assert_eq!(reply.quoted_path(), None);
    }
}
