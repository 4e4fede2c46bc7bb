//! Email address validation and address-list formatting.

use crate::encoding::LINE_LENGTH_LIMIT;
use crate::error::{Error, Result};
use std::fmt;

/// Maximum length of an address (RFC 5321 §4.5.3.1.3 path limit minus brackets).
pub const MAX_ADDRESS_LENGTH: usize = 254;

/// A validated RFC 5322 addr-spec (`local@domain`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates a new address from a bare addr-spec.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is empty, longer than 254 characters
    /// or not a valid addr-spec.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        check_length(&addr)?;
        validate_addr_spec(&addr)?;
        Ok(Self(addr))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mailbox (optional display name + address).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// Display name (optional).
    pub name: Option<String>,
    /// Email address.
    pub address: Address,
}

impl Mailbox {
    /// Creates a new mailbox with just an address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(address: impl Into<String>) -> Result<Self> {
        Ok(Self {
            name: None,
            address: Address::new(address)?,
        })
    }

    /// Creates a new mailbox with a display name and address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Result<Self> {
        Ok(Self {
            name: Some(name.into()),
            address: Address::new(address)?,
        })
    }

    /// Parses a mailbox: either `local@domain` or `Display Name <local@domain>`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, longer than 254 characters or
    /// syntactically invalid.
    pub fn parse(input: &str) -> Result<Self> {
        check_length(input)?;
        let trimmed = input.trim();

        let Some(open) = trimmed.rfind('<') else {
            return Self::new(trimmed);
        };

        let Some(addr) = trimmed[open + 1..].strip_suffix('>') else {
            return Err(Error::invalid_address(input, "unterminated angle address"));
        };
        if addr.is_empty() {
            return Err(Error::invalid_address(input, "empty angle address"));
        }

        let name = trimmed[..open].trim();
        validate_display_name(input, name)?;

        Ok(Self {
            name: (!name.is_empty()).then(|| name.trim_matches('"').to_string()),
            address: Address::new(addr)?,
        })
    }
}

/// Validates a mailbox string and returns its addr-spec.
///
/// # Errors
///
/// Returns an error if the input is not an acceptable mailbox.
pub fn validate(input: &str) -> Result<Address> {
    Mailbox::parse(input).map(|mailbox| mailbox.address)
}

/// Renders `<a>,<b>,…` for a header, breaking the line with a bare CRLF
/// before an address that would push it past [`LINE_LENGTH_LIMIT`].
#[must_use]
pub fn format_address_list(addresses: &[Address]) -> String {
    let mut out = String::new();
    let mut line_length = 0;

    for (i, address) in addresses.iter().enumerate() {
        let token = format!("<{address}>");
        let separator = usize::from(i + 1 < addresses.len());

        if line_length > 0 && line_length + token.len() + separator > LINE_LENGTH_LIMIT {
            out.push_str("\r\n");
            line_length = 0;
        }

        out.push_str(&token);
        if separator == 1 {
            out.push(',');
        }
        line_length += token.len() + separator;
    }

    out
}

fn check_length(addr: &str) -> Result<()> {
    if addr.trim().is_empty() {
        return Err(Error::invalid_address(addr, "address cannot be empty"));
    }

    let length = addr.chars().count();
    if length > MAX_ADDRESS_LENGTH {
        return Err(Error::AddressTooLong(length));
    }

    Ok(())
}

fn validate_addr_spec(addr: &str) -> Result<()> {
    let Some((local, domain)) = addr.rsplit_once('@') else {
        return Err(Error::invalid_address(addr, "address must contain @"));
    };

    if local.is_empty() || domain.is_empty() {
        return Err(Error::invalid_address(
            addr,
            "local and domain parts cannot be empty",
        ));
    }

    let local_ok = if local.starts_with('"') {
        is_quoted_string(local)
    } else {
        is_dot_atom(local)
    };
    if !local_ok {
        return Err(Error::invalid_address(addr, "invalid local part"));
    }

    let domain_ok = if domain.starts_with('[') {
        is_domain_literal(domain)
    } else {
        is_dot_atom(domain)
    };
    if !domain_ok {
        return Err(Error::invalid_address(addr, "invalid domain"));
    }

    Ok(())
}

fn validate_display_name(input: &str, name: &str) -> Result<()> {
    let ok = if name.starts_with('"') {
        is_quoted_string(name)
    } else {
        name.chars()
            .all(|c| is_atext(c) || c == '.' || c == ' ' || c == '\t')
    };

    if ok {
        Ok(())
    } else {
        Err(Error::invalid_address(input, "invalid display name"))
    }
}

/// RFC 5322 `atext`, extended with non-ASCII characters (RFC 6532).
fn is_atext(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '!' | '#'
                | '$'
                | '%'
                | '&'
                | '\''
                | '*'
                | '+'
                | '-'
                | '/'
                | '='
                | '?'
                | '^'
                | '_'
                | '`'
                | '{'
                | '|'
                | '}'
                | '~'
        )
        || (!c.is_ascii() && !c.is_control() && !c.is_whitespace())
}

fn is_dot_atom(s: &str) -> bool {
    s.split('.')
        .all(|atom| !atom.is_empty() && atom.chars().all(is_atext))
}

fn is_quoted_string(s: &str) -> bool {
    let Some(inner) = s
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return false;
    };

    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if chars.next().is_none() {
                    return false;
                }
            }
            '"' => return false,
            c if c.is_control() && c != '\t' => return false,
            _ => {}
        }
    }
    true
}

fn is_domain_literal(s: &str) -> bool {
    s.strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .is_some_and(|inner| {
            inner
                .chars()
                .all(|c| c.is_ascii_graphic() && !matches!(c, '[' | ']' | '\\'))
        })
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    const INVALID: [&str; 13] = [
        "", "////", "*(())*", "1234", "<>", "^@", "####", "-_-", "++=1", "$%_", ";", "'/asd",
        "i am hero",
    ];

    fn addrs(list: &[&str]) -> Vec<Address> {
        list.iter().map(|a| Address::new(*a).unwrap()).collect()
    }

    #[test]
    fn test_valid_address() {
        let addr = Address::new("user@example.com").unwrap();
        assert_eq!(addr.as_str(), "user@example.com");
        assert!(validate("first.last+tag@mail.example.org").is_ok());
        assert!(validate("\"john doe\"@example.com").is_ok());
        assert!(validate("user@[192.168.0.1]").is_ok());
    }

    #[test]
    fn test_rejects_malformed_addresses() {
        for input in INVALID {
            assert!(validate(input).is_err(), "{input:?} should be rejected");
        }
    }

    #[test]
    fn test_invalid_address_empty_parts() {
        assert!(Address::new("@example.com").is_err());
        assert!(Address::new("user@").is_err());
        assert!(Address::new("user@exa mple.com").is_err());
        assert!(Address::new("us..er@example.com").is_err());
    }

    #[test]
    fn test_rejects_too_long_address() {
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(matches!(validate(&long), Err(Error::AddressTooLong(262))));

        let just_fits = format!("{}@example.com", "a".repeat(242));
        assert!(validate(&just_fits).is_ok());
    }

    #[test]
    fn test_rejects_multiline_long_address() {
        let long = "owBXheRtZT3c37SCAKT8BVcx6guSJRy\nguptnxkKxE6jWahc9LmcOJ1jisAeOD6kZUundp\n"
            .repeat(4)
            + "EYzB6tzlflv37AhEDAeJ7jxCppcMFwaVV@example.com";
        assert!(validate(&long).is_err());
    }

    #[test]
    fn test_mailbox_parse_name_addr() {
        let mailbox = Mailbox::parse("John Doe <john@example.com>").unwrap();
        assert_eq!(mailbox.name.as_deref(), Some("John Doe"));
        assert_eq!(mailbox.address.as_str(), "john@example.com");

        let mailbox = Mailbox::parse("\"Doe, John\" <john@example.com>").unwrap();
        assert_eq!(mailbox.name.as_deref(), Some("Doe, John"));

        let mailbox = Mailbox::parse("<john@example.com>").unwrap();
        assert!(mailbox.name.is_none());
    }

    #[test]
    fn test_mailbox_parse_rejects_bad_name_addr() {
        assert!(Mailbox::parse("John <john@example.com").is_err());
        assert!(Mailbox::parse("John; <john@example.com>").is_err());
    }

    #[test]
    fn test_mailbox_with_name() {
        let mailbox = Mailbox::with_name("John Doe", "john@example.com").unwrap();
        assert_eq!(mailbox.name.as_deref(), Some("John Doe"));
        assert_eq!(mailbox.address.as_str(), "john@example.com");
    }

    #[test]
    fn test_format_single_and_pair() {
        assert_eq!(
            format_address_list(&addrs(&["example1@example.com"])),
            "<example1@example.com>"
        );
        assert_eq!(
            format_address_list(&addrs(&["example1@example.com", "example2@example.com"])),
            "<example1@example.com>,<example2@example.com>"
        );
    }

    #[test]
    fn test_format_folds_after_third() {
        let list = addrs(&[
            "example1@example.com",
            "example2@example.com",
            "example3@example.com",
            "example4@example.com",
        ]);
        assert_eq!(
            format_address_list(&list),
            "<example1@example.com>,<example2@example.com>,<example3@example.com>,\r\n<example4@example.com>"
        );
    }

    #[test]
    fn test_format_lines_stay_within_limit() {
        let list: Vec<Address> = (0..20)
            .map(|i| Address::new(format!("recipient{i}@example.com")).unwrap())
            .collect();
        let formatted = format_address_list(&list);
        assert!(!formatted.ends_with(','));
        for line in formatted.split("\r\n") {
            assert!(line.len() <= LINE_LENGTH_LIMIT);
        }
    }
}
