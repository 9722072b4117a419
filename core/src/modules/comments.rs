use log::warn;

use crate::model::{Attachment, Comment, RawActivity, RawAttachment};
use crate::modules::attachments::AttachmentFetcher;

/// Normalizes raw report activity into `Comment`s.
pub struct CommentFormatter {
    attachments: AttachmentFetcher,
    allowed_content_types: Vec<String>,
}

impl CommentFormatter {
    pub fn new(attachments: AttachmentFetcher, allowed_content_types: Vec<String>) -> Self {
        Self {
            attachments,
            allowed_content_types,
        }
    }

    /// Formats `raw` in order, dropping nodes with neither a message nor
    /// attachments. Allowed attachments are fetched; others pass through.
    pub async fn format(&self, raw: &[RawActivity]) -> Vec<Comment> {
        let mut comments = Vec::with_capacity(raw.len());

        for node in raw {
            let message = node.message.clone().filter(|m| !m.is_empty());
            let author = node.actor.as_ref().and_then(|a| a.username.clone());

            let mut attachments = Vec::with_capacity(node.attachments.len());
            for attachment in &node.attachments {
                attachments.push(self.resolve(attachment).await);
            }

            if message.is_none() && attachments.is_empty() {
                continue;
            }

            comments.push(Comment {
                message,
                author,
                attachments,
            });
        }

        comments
    }

    async fn resolve(&self, raw: &RawAttachment) -> Attachment {
        let content_type = raw.content_type.as_deref();

        match raw.url.as_deref() {
            Some(url) if self.is_allowed(content_type) => Attachment::Fetched {
                content: self.attachments.fetch(url).await,
            },
            None if self.is_allowed(content_type) => {
                warn!(
                    "Attachment {} has no URL, keeping raw record",
                    raw.file_name.as_deref().unwrap_or("<unnamed>")
                );
                Attachment::Passthrough(raw.clone())
            }
            _ => {
                warn!(
                    "Attachment content type not allowed: {} ({})",
                    content_type.unwrap_or("<none>"),
                    raw.file_name.as_deref().unwrap_or("<unnamed>")
                );
                Attachment::Passthrough(raw.clone())
            }
        }
    }

    fn is_allowed(&self, content_type: Option<&str>) -> bool {
        let Some(content_type) = content_type.map(str::trim) else {
            return false;
        };
        self.allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(content_type))
    }
}
