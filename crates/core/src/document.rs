//! Structured document vocabulary sent to the platform's editor.
//!
//! A [`PublishDocument`] is one tier's worth of content. Its body is a flat
//! sequence of [`BlockNode`]s whose text is carried by [`InlineSpan`]s.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TransformError;
use crate::markdown;

// ---------------------------------------------------------------------------
// Inline content
// ---------------------------------------------------------------------------

/// Formatting applied to a run of text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Mark {
    Bold,
    Italic,
    Link { href: String },
}

impl Mark {
    /// Two marks of the same kind never coexist on one run, so a link
    /// inside a link keeps the outer target.
    pub fn same_kind(&self, other: &Mark) -> bool {
        matches!(
            (self, other),
            (Mark::Bold, Mark::Bold)
                | (Mark::Italic, Mark::Italic)
                | (Mark::Link { .. }, Mark::Link { .. })
        )
    }
}

/// One run of inline text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineSpan {
    Plain(String),
    /// Text carrying an ordered, duplicate-free set of marks (outermost first).
    Marked { text: String, marks: Vec<Mark> },
}

impl InlineSpan {
    /// Build a span, choosing `Plain` when no marks are active.
    pub fn new(text: impl Into<String>, marks: &[Mark]) -> Self {
        let text = text.into();
        if marks.is_empty() {
            InlineSpan::Plain(text)
        } else {
            InlineSpan::Marked {
                text,
                marks: marks.to_vec(),
            }
        }
    }

    pub fn text(&self) -> &str {
        match self {
            InlineSpan::Plain(text) | InlineSpan::Marked { text, .. } => text,
        }
    }

    pub fn marks(&self) -> &[Mark] {
        match self {
            InlineSpan::Plain(_) => &[],
            InlineSpan::Marked { marks, .. } => marks,
        }
    }
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// Smallest heading level the body may use; level 1 is the post title.
pub const MIN_HEADING_LEVEL: u8 = 2;

/// Deepest heading level the dialect produces.
pub const MAX_HEADING_LEVEL: u8 = 5;

/// A top-level node of the document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockNode {
    Heading { level: u8, content: Vec<InlineSpan> },
    Paragraph(Vec<InlineSpan>),
    /// Each item is the inline content of one list entry.
    BulletList(Vec<Vec<InlineSpan>>),
    HorizontalRule,
}

// ---------------------------------------------------------------------------
// Audience / tier
// ---------------------------------------------------------------------------

/// Who may read a post, using the platform's wire values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Audience {
    #[serde(rename = "everyone")]
    Everyone,
    #[serde(rename = "only_paid")]
    PaidOnly,
    #[serde(rename = "only_free")]
    FreeOnly,
}

impl Audience {
    /// Value sent in the draft payload's `audience` field.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Everyone => "everyone",
            Self::PaidOnly => "only_paid",
            Self::FreeOnly => "only_free",
        }
    }
}

/// One of the two simultaneous publish targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Paid,
}

impl Tier {
    /// The fixed audience each tier publishes to.
    pub fn audience(self) -> Audience {
        match self {
            Self::Free => Audience::Everyone,
            Self::Paid => Audience::PaidOnly,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Paid => "paid",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// PublishDocument
// ---------------------------------------------------------------------------

/// The content unit for one tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishDocument {
    pub title: String,
    pub subtitle: Option<String>,
    pub body: Vec<BlockNode>,
    pub audience: Audience,
    /// Whether subscribers are emailed on publish (default `true`).
    pub send_email: bool,
    /// Optional publication section the post is filed under.
    pub section_id: Option<i64>,
}

impl PublishDocument {
    pub fn new(title: impl Into<String>, body: Vec<BlockNode>, audience: Audience) -> Self {
        Self {
            title: title.into(),
            subtitle: None,
            body,
            audience,
            send_email: true,
            section_id: None,
        }
    }

    /// Build a document whose body is parsed from the restricted markdown dialect.
    pub fn from_markdown(title: impl Into<String>, source: &str, audience: Audience) -> Self {
        Self::new(title, markdown::parse_markdown(source), audience)
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn with_send_email(mut self, send_email: bool) -> Self {
        self.send_email = send_email;
        self
    }

    pub fn with_section_id(mut self, section_id: i64) -> Self {
        self.section_id = Some(section_id);
        self
    }

    /// Check the title and body invariants.
    pub fn validate(&self) -> Result<(), TransformError> {
        if self.title.trim().is_empty() {
            return Err(TransformError::EmptyTitle);
        }
        if self.body.is_empty() {
            return Err(TransformError::EmptyBody);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn paragraph(text: &str) -> BlockNode {
        BlockNode::Paragraph(vec![InlineSpan::Plain(text.into())])
    }

    #[test]
    fn valid_document_passes() {
        let doc = PublishDocument::new("Weekly", vec![paragraph("hi")], Audience::Everyone);
        assert!(doc.validate().is_ok());
        assert!(doc.send_email);
    }

    #[test]
    fn whitespace_title_is_rejected() {
        let doc = PublishDocument::new("   \t", vec![paragraph("hi")], Audience::Everyone);
        assert_matches!(doc.validate(), Err(TransformError::EmptyTitle));
    }

    #[test]
    fn empty_body_is_rejected() {
        let doc = PublishDocument::from_markdown("Weekly", "\n\n", Audience::Everyone);
        assert_matches!(doc.validate(), Err(TransformError::EmptyBody));
    }

    #[test]
    fn tiers_map_to_fixed_audiences() {
        assert_eq!(Tier::Free.audience(), Audience::Everyone);
        assert_eq!(Tier::Paid.audience(), Audience::PaidOnly);
        assert_eq!(Tier::Paid.audience().as_str(), "only_paid");
    }

    #[test]
    fn audience_serializes_to_wire_values() {
        assert_eq!(
            serde_json::to_value(Audience::PaidOnly).unwrap(),
            serde_json::json!("only_paid")
        );
        assert_eq!(
            serde_json::to_value(Audience::FreeOnly).unwrap(),
            serde_json::json!("only_free")
        );
    }

    #[test]
    fn marks_compare_by_kind() {
        let a = Mark::Link { href: "a".into() };
        let b = Mark::Link { href: "b".into() };
        assert!(a.same_kind(&b));
        assert!(!Mark::Bold.same_kind(&Mark::Italic));
    }

    #[test]
    fn inline_span_without_marks_is_plain() {
        assert_eq!(InlineSpan::new("x", &[]), InlineSpan::Plain("x".into()));
        assert_eq!(InlineSpan::new("x", &[Mark::Bold]).marks(), &[Mark::Bold]);
    }
}
