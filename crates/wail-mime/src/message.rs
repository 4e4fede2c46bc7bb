//! Message variants and their MIME rendering.

use crate::content_type::{ContentKind, ContentType, parameter_value};
use crate::encoding::Encoder;
use crate::error::{Error, Result};
use sha2::{Digest, Sha224};
use std::fmt::Write as _;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

const BOUNDARY_SEED: &[u8] = b"6MHoYQhoRORdeWi6RzQaFKK7iGYieH";

static BOUNDARY: LazyLock<String> = LazyLock::new(|| {
    let digest = Sha224::digest(BOUNDARY_SEED);
    let hex = digest.iter().fold(String::new(), |mut acc, byte| {
        let _ = write!(acc, "{byte:02x}");
        acc
    });
    hex[..hex.len() / 2].to_string()
});

/// Returns the multipart boundary shared by every message in the process.
///
/// The token is derived once from a fixed seed and is intentionally not
/// random.
#[must_use]
pub fn boundary() -> &'static str {
    &BOUNDARY
}

/// Text subtype of a [`TextPart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextKind {
    /// `text/plain`.
    Plain,
    /// `text/html`.
    Html,
}

impl TextKind {
    /// Returns the matching content kind.
    #[must_use]
    pub const fn content_kind(self) -> ContentKind {
        match self {
            Self::Plain => ContentKind::PlainText,
            Self::Html => ContentKind::HtmlText,
        }
    }
}

impl FromStr for TextKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "plain" => Ok(Self::Plain),
            "html" => Ok(Self::Html),
            _ => Err(Error::InvalidTextKind(s.to_string())),
        }
    }
}

/// A single text body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPart {
    kind: TextKind,
    body: Vec<u8>,
}

impl TextPart {
    /// Creates a text part.
    #[must_use]
    pub fn new(kind: TextKind, body: impl Into<Vec<u8>>) -> Self {
        Self {
            kind,
            body: body.into(),
        }
    }

    /// Creates a `text/plain` part.
    #[must_use]
    pub fn plain(body: impl Into<Vec<u8>>) -> Self {
        Self::new(TextKind::Plain, body)
    }

    /// Creates a `text/html` part.
    #[must_use]
    pub fn html(body: impl Into<Vec<u8>>) -> Self {
        Self::new(TextKind::Html, body)
    }

    /// Creates a text part from a subtype name (`plain` or `html`).
    ///
    /// # Errors
    ///
    /// Returns an error for any other subtype.
    pub fn parse(kind: &str, body: impl Into<Vec<u8>>) -> Result<Self> {
        Ok(Self::new(kind.parse()?, body))
    }

    /// Returns the text subtype.
    #[must_use]
    pub const fn kind(&self) -> TextKind {
        self.kind
    }

    /// Returns the raw body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns the content kind.
    #[must_use]
    pub const fn content_kind(&self) -> ContentKind {
        self.kind.content_kind()
    }

    /// Renders the part headers and encoded body.
    #[must_use]
    pub fn render(&self, encoder: &Encoder) -> String {
        let content_type = ContentType::new(self.content_kind())
            .with_parameter("charset", encoder.charset().as_str());

        let mut out = format!("Content-Type: {content_type}\r\n");
        let _ = write!(
            out,
            "Content-Transfer-Encoding: {}\r\n\r\n",
            encoder.encoding()
        );
        out.push_str(&encoder.encode_body(&self.body));
        out
    }
}

/// A file attached to a [`MultipartMixed`] message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    name: String,
    content: Vec<u8>,
}

impl Attachment {
    /// Creates an attachment from in-memory content.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Reads an attachment from disk, named after the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { name, content })
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the raw content.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Returns the content kind (always `application/octet-stream`).
    #[must_use]
    pub const fn content_kind(&self) -> ContentKind {
        ContentKind::OctetStream
    }

    /// Renders the part headers and encoded content.
    #[must_use]
    pub fn render(&self, encoder: &Encoder) -> String {
        let mut out = format!("Content-Type: {}\r\n", ContentKind::OctetStream);
        let _ = write!(
            out,
            "Content-Disposition: attachment; filename={}\r\n",
            parameter_value(&self.name)
        );
        let _ = write!(
            out,
            "Content-Transfer-Encoding: {}\r\n\r\n",
            encoder.encoding()
        );
        out.push_str(&encoder.encode_body(&self.content));
        out
    }
}

/// A text body followed by attachments (`multipart/mixed`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartMixed {
    text: TextPart,
    attachments: Vec<Attachment>,
}

impl MultipartMixed {
    /// Creates a mixed message around a text body.
    #[must_use]
    pub const fn new(text: TextPart) -> Self {
        Self {
            text,
            attachments: Vec::new(),
        }
    }

    /// Appends an attachment.
    pub fn add_attachment(&mut self, attachment: Attachment) {
        self.attachments.push(attachment);
    }

    /// Appends an attachment, builder style.
    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.add_attachment(attachment);
        self
    }

    /// Returns the text body.
    #[must_use]
    pub const fn text(&self) -> &TextPart {
        &self.text
    }

    /// Returns the attachments in insertion order.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Renders the multipart block.
    #[must_use]
    pub fn render(&self, encoder: &Encoder) -> String {
        let mut out = multipart_header(ContentKind::MultipartMixed);
        push_part(&mut out, &self.text.render(encoder));
        for attachment in &self.attachments {
            push_part(&mut out, &attachment.render(encoder));
        }
        push_close(&mut out);
        out
    }
}

/// One alternative rendering with its emission priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternativePart {
    /// The text body.
    pub text: TextPart,
    /// Lower values are emitted first.
    pub order: i32,
}

/// Alternative renderings of the same content (`multipart/alternative`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartAlternative {
    parts: Vec<AlternativePart>,
}

impl MultipartAlternative {
    /// Creates an empty alternative message.
    #[must_use]
    pub const fn new() -> Self {
        Self { parts: Vec::new() }
    }

    /// Adds a text part with the given order.
    pub fn add_part(&mut self, text: TextPart, order: i32) {
        self.parts.push(AlternativePart { text, order });
    }

    /// Adds a `text/plain` alternative.
    pub fn add_plain(&mut self, body: impl Into<Vec<u8>>, order: i32) {
        self.add_part(TextPart::plain(body), order);
    }

    /// Adds a `text/html` alternative.
    pub fn add_html(&mut self, body: impl Into<Vec<u8>>, order: i32) {
        self.add_part(TextPart::html(body), order);
    }

    /// Returns the parts in insertion order.
    #[must_use]
    pub fn parts(&self) -> &[AlternativePart] {
        &self.parts
    }

    /// Returns the parts in emission order; equal orders keep insertion order.
    #[must_use]
    pub fn sorted_parts(&self) -> Vec<&AlternativePart> {
        let mut sorted: Vec<&AlternativePart> = self.parts.iter().collect();
        sorted.sort_by_key(|part| part.order);
        sorted
    }

    /// Renders the multipart block.
    #[must_use]
    pub fn render(&self, encoder: &Encoder) -> String {
        let mut out = multipart_header(ContentKind::MultipartAlternative);
        for part in self.sorted_parts() {
            push_part(&mut out, &part.text.render(encoder));
        }
        push_close(&mut out);
        out
    }
}

fn multipart_header(kind: ContentKind) -> String {
    let content_type = ContentType::new(kind).with_parameter("boundary", boundary());
    format!("Content-Type: {content_type}\r\n\r\n")
}

fn push_part(out: &mut String, part: &str) {
    let _ = write!(out, "--{}\r\n{part}\r\n", boundary());
}

fn push_close(out: &mut String) {
    let _ = write!(out, "--{}--", boundary());
}

/// A message body: one of the supported content layouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Single `text/plain` or `text/html` body.
    Text(TextPart),
    /// Text body plus attachments.
    Mixed(MultipartMixed),
    /// Alternative renderings.
    Alternative(MultipartAlternative),
}

impl Message {
    /// Returns the top-level content kind.
    #[must_use]
    pub const fn content_kind(&self) -> ContentKind {
        match self {
            Self::Text(text) => text.content_kind(),
            Self::Mixed(_) => ContentKind::MultipartMixed,
            Self::Alternative(_) => ContentKind::MultipartAlternative,
        }
    }

    /// Renders the `Content-Type` block and body.
    #[must_use]
    pub fn render(&self, encoder: &Encoder) -> String {
        match self {
            Self::Text(text) => text.render(encoder),
            Self::Mixed(mixed) => mixed.render(encoder),
            Self::Alternative(alternative) => alternative.render(encoder),
        }
    }
}

impl From<TextPart> for Message {
    fn from(text: TextPart) -> Self {
        Self::Text(text)
    }
}

impl From<MultipartMixed> for Message {
    fn from(mixed: MultipartMixed) -> Self {
        Self::Mixed(mixed)
    }
}

impl From<MultipartAlternative> for Message {
    fn from(alternative: MultipartAlternative) -> Self {
        Self::Alternative(alternative)
    }
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
    use crate::config::{Charset, TransferEncoding};
    use crate::encoding::decode_base64;
    use std::io::Write as _;

    const B: Encoder = Encoder::new(Charset::Utf8, TransferEncoding::Base64);
    const Q: Encoder = Encoder::new(Charset::Utf8, TransferEncoding::QuotedPrintable);

    #[test]
    fn test_boundary_is_stable() {
        assert_eq!(boundary().len(), 28);
        assert!(boundary().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(boundary(), boundary());
    }

    #[test]
    fn test_text_kind_parse() {
        assert_eq!("plain".parse::<TextKind>().unwrap(), TextKind::Plain);
        assert_eq!("HTML".parse::<TextKind>().unwrap(), TextKind::Html);
        assert!(matches!(
            TextPart::parse("markdown", "x"),
            Err(Error::InvalidTextKind(_))
        ));
    }

    #[test]
    fn test_text_render() {
        let rendered = TextPart::plain("Hello, World").render(&B);
        assert_eq!(
            rendered,
            "Content-Type: text/plain; charset=UTF-8\r\n\
             Content-Transfer-Encoding: base64\r\n\
             \r\n\
             SGVsbG8sIFdvcmxk"
        );
    }

    #[test]
    fn test_html_render_quoted_printable() {
        let rendered = TextPart::html("<p>caf\u{e9}</p>").render(&Q);
        assert!(rendered.starts_with("Content-Type: text/html; charset=UTF-8\r\n"));
        assert!(rendered.contains("Content-Transfer-Encoding: quoted-printable\r\n\r\n"));
        assert!(rendered.ends_with("<p>caf=C3=A9</p>"));
    }

    #[test]
    fn test_mixed_render() {
        let message = MultipartMixed::new(TextPart::plain("body"))
            .with_attachment(Attachment::new("a.txt", "first"))
            .with_attachment(Attachment::new("my file.bin", vec![0u8, 1, 2]));
        let rendered = message.render(&B);
        let b = boundary();

        assert!(rendered.starts_with(&format!(
            "Content-Type: multipart/mixed; boundary={b}\r\n\r\n--{b}\r\n"
        )));
        assert!(rendered.ends_with(&format!("\r\n--{b}--")));
        assert_eq!(rendered.matches(&format!("--{b}\r\n")).count(), 3);

        let first = rendered.find("filename=a.txt").unwrap();
        let second = rendered.find("filename=\"my file.bin\"").unwrap();
        assert!(first < second);
        assert_eq!(
            rendered.matches("Content-Type: application/octet-stream\r\n").count(),
            2
        );
        assert_eq!(message.attachments().len(), 2);
    }

    #[test]
    fn test_alternative_orders_parts() {
        let mut message = MultipartAlternative::new();
        message.add_html("<b>hi</b>", 3);
        message.add_plain("hi", 2);

        let rendered = message.render(&B);
        let plain = rendered.find("text/plain").unwrap();
        let html = rendered.find("text/html").unwrap();
        assert!(plain < html);
        assert!(rendered.starts_with("Content-Type: multipart/alternative; boundary="));
    }

    #[test]
    fn test_alternative_sort_is_stable() {
        let mut message = MultipartAlternative::new();
        message.add_plain("first", 1);
        message.add_html("second", 1);
        message.add_plain("zero", 0);

        let order: Vec<&[u8]> = message
            .sorted_parts()
            .iter()
            .map(|p| p.text.body())
            .collect();
        assert_eq!(order, vec![&b"zero"[..], b"first", b"second"]);

        // Rendering does not reorder the stored parts.
        assert_eq!(message.parts()[0].text.body(), b"first");
        assert_eq!(message.render(&B), message.render(&B));
    }

    #[test]
    fn test_message_content_kind() {
        assert_eq!(
            Message::from(TextPart::plain("x")).content_kind(),
            ContentKind::PlainText
        );
        assert_eq!(
            Message::from(TextPart::html("x")).content_kind(),
            ContentKind::HtmlText
        );
        assert_eq!(
            Message::from(MultipartMixed::new(TextPart::plain("x"))).content_kind(),
            ContentKind::MultipartMixed
        );
        assert_eq!(
            Message::from(MultipartAlternative::new()).content_kind(),
            ContentKind::MultipartAlternative
        );
    }

    #[test]
    fn test_attachment_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"attachment bytes").unwrap();

        let attachment = Attachment::from_file(file.path()).unwrap();
        assert_eq!(attachment.content(), b"attachment bytes");
        assert_eq!(
            attachment.name(),
            file.path().file_name().unwrap().to_str().unwrap()
        );

        let rendered = attachment.render(&B);
        let body = rendered.split("\r\n\r\n").nth(1).unwrap();
        assert_eq!(decode_base64(body).unwrap(), b"attachment bytes");
    }

    #[test]
    fn test_attachment_name_cannot_add_headers() {
        let attachment = Attachment::new("a.txt\r\nX-Injected: yes", "z");
        let rendered = attachment.render(&B);
        let headers = rendered.split("\r\n\r\n").next().unwrap();

        assert_eq!(headers.lines().count(), 3);
        assert!(!rendered.lines().any(|line| line.starts_with("X-Injected")));
        assert!(headers.contains("filename=\"a.txt  X-Injected: yes\"\r\n"));
    }

    #[test]
    fn test_attachment_from_missing_file() {
        assert!(matches!(
            Attachment::from_file("/definitely/not/here.bin"),
            Err(Error::Io(_))
        ));
    }
}
