//! Attachment preparation
//!
//! Decision chain per attachment:
//! 1. MIME type supported natively: sent as a file part.
//! 2. PDF, provider takes images but not PDFs: rasterized to page images.
//! 3. Rasterization failed or anything else: treated as unsupported and
//!    inlined into the last user message as text.

use super::messages::{ContentPart, LlmMessage, MessageContent, MessageRole};
use crate::error::LumenResult;
use serde::{Deserialize, Serialize};

const PDF_MIME: &str = "application/pdf";

/// A user-supplied file attached to the current question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    /// Location the provider client can read the bytes from
    pub path: String,
    /// Extracted text, used when the file cannot be sent natively
    #[serde(default)]
    pub text: Option<String>,
}

/// An image produced from a PDF page
#[derive(Debug, Clone, PartialEq)]
pub struct RasterizedPage {
    pub mime_type: String,
    pub path: String,
}

/// Converts PDFs to page images
pub trait PdfRasterizer: Send + Sync {
    fn rasterize(&self, attachment: &Attachment) -> LumenResult<Vec<RasterizedPage>>;
}

fn supports(supported: &[String], mime_type: &str) -> bool {
    supported.iter().any(|s| {
        s == mime_type
            || s.strip_suffix("/*")
                .is_some_and(|family| mime_type.starts_with(&format!("{}/", family)))
    })
}

fn supports_images(supported: &[String]) -> bool {
    supported.iter().any(|s| s.starts_with("image/"))
}

/// Fold attachments into the last user message
pub fn prepare_attachments(
    mut messages: Vec<LlmMessage>,
    attachments: &[Attachment],
    supported: &[String],
    rasterizer: Option<&dyn PdfRasterizer>,
) -> Vec<LlmMessage> {
    if attachments.is_empty() {
        return messages;
    }

    let mut native_parts = Vec::new();
    let mut unsupported = Vec::new();

    for attachment in attachments {
        if supports(supported, &attachment.mime_type) {
            native_parts.push(ContentPart::File {
                name: attachment.name.clone(),
                mime_type: attachment.mime_type.clone(),
                uri: attachment.path.clone(),
            });
            continue;
        }

        if attachment.mime_type == PDF_MIME && supports_images(supported) {
            if let Some(rasterizer) = rasterizer {
                match rasterizer.rasterize(attachment) {
                    Ok(pages) if !pages.is_empty() => {
                        for (page_no, page) in pages.into_iter().enumerate() {
                            native_parts.push(ContentPart::File {
                                name: format!("{} (page {})", attachment.name, page_no + 1),
                                mime_type: page.mime_type,
                                uri: page.path,
                            });
                        }
                        continue;
                    }
                    Ok(_) => {
                        tracing::warn!("PDF '{}' produced no page images", attachment.name);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to convert PDF '{}' to images: {}", attachment.name, e);
                    }
                }
            }
        }

        unsupported.push(attachment);
    }

    let Some(target) = messages
        .iter_mut()
        .rev()
        .find(|m| m.role == MessageRole::User)
    else {
        tracing::warn!("No user message to attach {} file(s) to", attachments.len());
        return messages;
    };

    let mut text = target.text();
    for attachment in unsupported {
        text.push_str(&format!("\n\n[Attached file: {}]", attachment.name));
        if let Some(extracted) = attachment.text.as_deref().filter(|t| !t.is_empty()) {
            text.push('\n');
            text.push_str(extracted);
        }
    }

    target.content = if native_parts.is_empty() {
        MessageContent::Text(text)
    } else {
        let mut parts = vec![ContentPart::Text { text }];
        parts.extend(native_parts);
        MessageContent::Parts(parts)
    };

    messages
}
