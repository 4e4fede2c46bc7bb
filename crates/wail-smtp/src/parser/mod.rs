//! SMTP reply parser.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Parses an SMTP reply from its lines (without CRLF).
///
/// - Single: `250 OK`
/// - Multi: `250-First line`, `250-Second line`, `250 Last line`
///
/// # Errors
///
/// Returns an error if the reply is empty, a line does not start with a
/// three-digit code, or the lines disagree on the code.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let Some(first) = lines.first() else {
        return Err(Error::Protocol("Empty reply".into()));
    };

    let code = reply_code(first)?;
    let mut message = Vec::with_capacity(lines.len());

    for line in lines {
        if reply_code(line)? != code {
            return Err(Error::Protocol(format!(
                "Reply code changed mid-reply: {line}"
            )));
        }
        match line.as_bytes().get(3) {
            None => message.push(String::new()),
            Some(b' ' | b'-') => message.push(line[4..].to_string()),
            Some(_) => {
                return Err(Error::Protocol(format!("Malformed reply line: {line}")));
            }
        }
    }

    Ok(Reply::new(ReplyCode::new(code), message))
}

fn reply_code(line: &str) -> Result<u16> {
    line.get(0..3)
        .filter(|code| code.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| Error::Protocol(format!("Invalid reply line: {line}")))
}

/// Checks if a line is the last line of a reply.
///
/// Continuation lines use `-` after the code; the last line uses a space
/// or nothing at all.
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    line.len() == 3 || (line.len() >= 4 && line.as_bytes()[3] == b' ')
}
