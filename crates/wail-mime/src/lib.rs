//! # wail-mime
//!
//! Message composition for outgoing email: RFC 2047 header words, body
//! transfer encodings, address validation and MIME rendering.
//!
//! ## Features
//!
//! - **Encoding**: Base64 and Quoted-Printable bodies, `B`/`Q` encoded words,
//!   header folding at 76 characters
//! - **Addresses**: RFC 5322 mailbox validation and folded address lists
//! - **Messages**: plain/HTML text, `multipart/mixed` with attachments,
//!   `multipart/alternative` with ordered parts
//! - **Envelope**: header assembly and size-limited final rendering
//!
//! ## Quick Start
//!
//! ```
//! use wail_mime::{Attachment, Envelope, MailConfig, MultipartMixed, TextPart};
//!
//! let mut message = MultipartMixed::new(TextPart::plain("See attached."));
//! message.add_attachment(Attachment::new("notes.txt", "a few notes"));
//!
//! let mut envelope = Envelope::new(MailConfig::default());
//! envelope.set_subject("Notes");
//! envelope.set_from("Sender", "sender@example.com");
//! envelope.set_to(["recipient@example.com"])?;
//! envelope.set_message(message);
//!
//! let bytes = envelope.finalize(0)?;
//! assert!(bytes.starts_with(b"Date: "));
//! # Ok::<(), wail_mime::Error>(())
//! ```
//!
//! ### Encoded Words
//!
//! ```
//! use wail_mime::{Charset, Encoder, TransferEncoding};
//!
//! let encoder = Encoder::new(Charset::Utf8, TransferEncoding::Base64);
//! assert_eq!(
//!     encoder.encode_header_word("Hello world"),
//!     "=?UTF-8?B?SGVsbG8gd29ybGQ=?="
//! );
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod config;
mod content_type;
mod envelope;
mod error;
mod header;
mod message;

pub mod encoding;

pub use address::{Address, MAX_ADDRESS_LENGTH, Mailbox, format_address_list, validate};
pub use config::{Charset, MailConfig, TransferEncoding};
pub use content_type::{ContentKind, ContentType};
pub use encoding::Encoder;
pub use envelope::Envelope;
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{
    AlternativePart, Attachment, Message, MultipartAlternative, MultipartMixed, TextKind,
    TextPart, boundary,
};
