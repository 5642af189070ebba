// Copyright (c) The gallio-rs Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Execution logs: named markup streams and attachments.
//!
//! A [`TestLog`] belongs to one test step run. It owns a list of named
//! [`TestLogStream`]s, whose bodies form a lightweight markup tree of
//! sections, text runs, markers and attachment embeds, plus the list of
//! [`TestLogAttachment`]s referenced by those embeds.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Well-known stream names used by the test framework.
pub mod stream_names {
    /// The default output stream.
    pub const DEFAULT: &str = "Log";
    /// Console standard output captured during the step.
    pub const CONSOLE_OUTPUT: &str = "ConsoleOutput";
    /// Console standard error captured during the step.
    pub const CONSOLE_ERROR: &str = "ConsoleError";
    /// Failure messages and stack traces.
    pub const FAILURES: &str = "Failures";
    /// Warning messages.
    pub const WARNINGS: &str = "Warnings";
}

/// The execution log of a single test step run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TestLog {
    /// The named markup streams, in creation order.
    #[serde(rename = "stream", default, skip_serializing_if = "Vec::is_empty")]
    pub streams: Vec<TestLogStream>,

    /// The attachments referenced by embed tags inside the streams.
    #[serde(rename = "attachment", default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<TestLogAttachment>,
}

impl TestLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the log has no streams and no attachments.
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty() && self.attachments.is_empty()
    }

    /// Looks up a stream by name.
    pub fn stream(&self, name: &str) -> Option<&TestLogStream> {
        self.streams.iter().find(|stream| stream.name == name)
    }

    /// Looks up an attachment by name.
    pub fn attachment(&self, name: &str) -> Option<&TestLogAttachment> {
        self.attachments
            .iter()
            .find(|attachment| attachment.name == name)
    }

    /// Adds a stream and returns self for chaining.
    pub fn add_stream(&mut self, stream: TestLogStream) -> &mut Self {
        self.streams.push(stream);
        self
    }

    /// Adds an attachment and returns self for chaining.
    pub fn add_attachment(&mut self, attachment: TestLogAttachment) -> &mut Self {
        self.attachments.push(attachment);
        self
    }
}

/// A named markup stream within a test log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TestLogStream {
    /// The stream name, e.g. [`stream_names::DEFAULT`].
    #[serde(rename = "@name")]
    pub name: String,

    /// The root container of the stream's markup tree.
    #[serde(default)]
    pub body: BodyTag,
}

impl TestLogStream {
    /// Creates an empty stream with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: BodyTag::default(),
        }
    }

    /// Creates a stream holding a single text run.
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut stream = Self::new(name);
        stream.body.contents.push(Tag::text(text));
        stream
    }

    /// Concatenates all text runs in the stream, depth first.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.body.contents, &mut out);
        out
    }
}

fn collect_text(tags: &[Tag], out: &mut String) {
    for tag in tags {
        match tag {
            Tag::Text(text) => out.push_str(&text.text),
            Tag::Section(section) => collect_text(&section.contents, out),
            Tag::Marker(marker) => collect_text(&marker.contents, out),
            Tag::Embed(_) => {}
        }
    }
}

/// The root container tag of a stream body.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BodyTag {
    /// Child tags in document order.
    #[serde(rename = "$value", default, skip_serializing_if = "Vec::is_empty")]
    pub contents: Vec<Tag>,
}

/// One node of the markup tree inside a stream body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tag {
    /// A named section grouping nested content.
    Section(SectionTag),
    /// A run of plain text.
    Text(TextTag),
    /// A reference to an attachment by name.
    Embed(EmbedTag),
    /// A semantic marker (e.g. highlight class) around nested content.
    Marker(MarkerTag),
}

impl Tag {
    /// Creates a text tag.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(TextTag { text: text.into() })
    }

    /// Creates a section tag with the given contents.
    pub fn section(name: impl Into<String>, contents: Vec<Tag>) -> Self {
        Self::Section(SectionTag {
            name: name.into(),
            contents,
        })
    }

    /// Creates an embed tag referencing an attachment by name.
    pub fn embed(attachment_name: impl Into<String>) -> Self {
        Self::Embed(EmbedTag {
            attachment_name: attachment_name.into(),
        })
    }

    /// Creates a marker tag with the given contents.
    pub fn marker(class: impl Into<String>, contents: Vec<Tag>) -> Self {
        Self::Marker(MarkerTag {
            class: class.into(),
            contents,
        })
    }
}

/// A named section grouping nested markup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SectionTag {
    /// The section heading.
    #[serde(rename = "@name")]
    pub name: String,

    /// Nested tags in document order.
    #[serde(rename = "$value", default, skip_serializing_if = "Vec::is_empty")]
    pub contents: Vec<Tag>,
}

/// A run of plain text.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TextTag {
    /// The text contents.
    #[serde(rename = "$text", default)]
    pub text: String,
}

/// A reference to an attachment of the enclosing [`TestLog`], by name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmbedTag {
    /// The name of the referenced attachment.
    #[serde(rename = "@attachmentName")]
    pub attachment_name: String,
}

/// A semantic marker around nested markup, e.g. a highlight class.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerTag {
    /// The marker class, e.g. `"highlight"` or `"stacktrace"`.
    #[serde(rename = "@class")]
    pub class: String,

    /// Nested tags in document order.
    #[serde(rename = "$value", default, skip_serializing_if = "Vec::is_empty")]
    pub contents: Vec<Tag>,
}

/// How an attachment's bytes are represented inside the XML document.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttachmentEncoding {
    /// The contents are embedded directly as text.
    #[default]
    Text,
    /// The contents are Base64-encoded binary data.
    Base64,
}

/// Whether an attachment's bytes travel with the XML or live in a separate
/// container file.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttachmentContentDisposition {
    /// The contents are not available.
    #[default]
    Absent,
    /// The contents are stored in a separate file named by `contentPath`.
    Link,
    /// The contents are embedded in the XML document.
    Inline,
}

/// An error raised when an attachment's contents cannot be produced in the
/// requested representation.
#[derive(Clone, Debug, Error)]
pub enum AttachmentContentError {
    /// The contents were requested with the wrong encoding, e.g. asking for
    /// the text of a binary attachment.
    #[error("attachment `{name}` is not {expected} (encoding is {actual})")]
    EncodingMismatch {
        /// The attachment name.
        name: String,
        /// The requested representation.
        expected: &'static str,
        /// The attachment's actual encoding as a display string.
        actual: &'static str,
    },

    /// The serialized contents of a binary attachment were not valid Base64.
    #[error("attachment `{name}` contains invalid base64 data")]
    InvalidBase64 {
        /// The attachment name.
        name: String,
        /// The underlying decode error.
        #[source]
        error: base64::DecodeError,
    },
}

/// An XML-serializable attachment of a test log.
///
/// Text attachments embed their contents directly in the XML; binary
/// attachments are Base64-encoded. When serialized with Link disposition the
/// contents are dropped from the XML and `content_path` names the container
/// file holding the raw bytes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TestLogAttachment {
    /// The attachment name, unique within its log.
    #[serde(rename = "@name")]
    pub name: String,

    /// The MIME content type, e.g. `"text/plain"` or `"image/png"`.
    #[serde(rename = "@contentType")]
    pub content_type: String,

    /// How the contents are represented in the XML.
    #[serde(rename = "@encoding", default)]
    pub encoding: AttachmentEncoding,

    /// How the contents are stored.
    #[serde(rename = "@contentDisposition", default)]
    pub content_disposition: AttachmentContentDisposition,

    /// The container-relative path of the contents, when disposition is
    /// [`AttachmentContentDisposition::Link`].
    #[serde(rename = "@contentPath", default, skip_serializing_if = "Option::is_none")]
    pub content_path: Option<Utf8PathBuf>,

    /// The contents serialized as text (Base64 for binary attachments), when
    /// disposition is [`AttachmentContentDisposition::Inline`].
    #[serde(rename = "$text", default, skip_serializing_if = "Option::is_none")]
    pub serialized_contents: Option<String>,
}

impl TestLogAttachment {
    /// Creates an inline text attachment.
    pub fn text(
        name: impl Into<String>,
        content_type: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            encoding: AttachmentEncoding::Text,
            content_disposition: AttachmentContentDisposition::Inline,
            content_path: None,
            serialized_contents: Some(text.into()),
        }
    }

    /// Creates an inline binary attachment; the bytes are Base64-encoded.
    pub fn binary(
        name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: &[u8],
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            encoding: AttachmentEncoding::Base64,
            content_disposition: AttachmentContentDisposition::Inline,
            content_path: None,
            serialized_contents: Some(BASE64.encode(bytes)),
        }
    }

    /// Returns true if the attachment is textual.
    pub fn is_text(&self) -> bool {
        self.encoding == AttachmentEncoding::Text
    }

    /// Returns the text of a text attachment, if contents are available.
    pub fn text_contents(&self) -> Result<Option<&str>, AttachmentContentError> {
        if !self.is_text() {
            return Err(AttachmentContentError::EncodingMismatch {
                name: self.name.clone(),
                expected: "text",
                actual: "base64",
            });
        }
        Ok(self.serialized_contents.as_deref())
    }

    /// Returns the decoded bytes of a binary attachment, if contents are
    /// available. Returns `None` for attachments whose contents were not
    /// loaded (Link or Absent disposition).
    pub fn binary_contents(&self) -> Result<Option<Vec<u8>>, AttachmentContentError> {
        if self.is_text() {
            return Err(AttachmentContentError::EncodingMismatch {
                name: self.name.clone(),
                expected: "binary",
                actual: "text",
            });
        }
        match &self.serialized_contents {
            Some(contents) => {
                let bytes = BASE64.decode(contents.trim()).map_err(|error| {
                    AttachmentContentError::InvalidBase64 {
                        name: self.name.clone(),
                        error,
                    }
                })?;
                Ok(Some(bytes))
            }
            None => Ok(None),
        }
    }

    /// Returns the raw bytes of the attachment for storage: UTF-8 bytes for
    /// text attachments, decoded bytes for binary ones. Returns `None` when
    /// the contents are not loaded.
    pub fn content_bytes(&self) -> Option<Vec<u8>> {
        let contents = self.serialized_contents.as_ref()?;
        match self.encoding {
            AttachmentEncoding::Text => Some(contents.as_bytes().to_vec()),
            AttachmentEncoding::Base64 => BASE64.decode(contents.trim()).ok(),
        }
    }

    /// Replaces the contents from raw bytes read out of a container,
    /// re-encoding according to the attachment's encoding.
    pub fn set_content_bytes(&mut self, bytes: Vec<u8>) {
        self.serialized_contents = Some(match self.encoding {
            AttachmentEncoding::Text => String::from_utf8_lossy(&bytes).into_owned(),
            AttachmentEncoding::Base64 => BASE64.encode(&bytes),
        });
    }
}

/// Returns the customary file extension (with leading dot) for a MIME
/// content type, falling back to `.bin` for unknown types.
pub fn extension_for_content_type(content_type: &str) -> &'static str {
    match content_type {
        "text/plain" => ".txt",
        "text/xml" | "application/xml" => ".xml",
        "text/html" => ".html",
        "text/css" => ".css",
        "image/png" => ".png",
        "image/jpeg" => ".jpg",
        "image/gif" => ".gif",
        "image/bmp" => ".bmp",
        _ => ".bin",
    }
}

/// Encodes an arbitrary string (step ID, attachment name) into a file-name
/// safe form by replacing characters that are invalid in file names with
/// underscores.
pub fn encode_file_name(name: &str) -> String {
    let encoded: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ' | '(' | ')') {
                c
            } else {
                '_'
            }
        })
        .collect();

    // A file name of only dots or spaces is not portable.
    if encoded.chars().all(|c| c == '.' || c == ' ') {
        "_".to_string()
    } else {
        encoded
    }
}
