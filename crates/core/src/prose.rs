//! Encoder from [`BlockNode`]s to the editor's nested JSON document.
//!
//! The platform's drafting endpoint takes the editor tree itself rather
//! than rendered HTML, e.g.
//!
//! ```json
//! {"type": "doc", "content": [
//!   {"type": "heading", "attrs": {"level": 2}, "content": [{"type": "text", "text": "Hi"}]},
//!   {"type": "horizontal_rule"}
//! ]}
//! ```

use serde_json::{json, Value};

use crate::document::{BlockNode, InlineSpan, Mark};

/// Link marks always open in a new tab without leaking the referrer.
const LINK_TARGET: &str = "_blank";
const LINK_REL: &str = "noopener noreferrer nofollow";

/// Encode a document body as the editor's root `doc` node.
pub fn to_editor_doc(blocks: &[BlockNode]) -> Value {
    json!({
        "type": "doc",
        "content": blocks.iter().map(block_node).collect::<Vec<_>>(),
    })
}

fn block_node(block: &BlockNode) -> Value {
    match block {
        BlockNode::Heading { level, content } => json!({
            "type": "heading",
            "attrs": { "level": level },
            "content": inline_nodes(content),
        }),
        BlockNode::Paragraph(content) => paragraph(content),
        BlockNode::BulletList(items) => json!({
            "type": "bullet_list",
            "content": items
                .iter()
                .map(|item| json!({ "type": "listItem", "content": [paragraph(item)] }))
                .collect::<Vec<_>>(),
        }),
        BlockNode::HorizontalRule => json!({ "type": "horizontal_rule" }),
    }
}

fn paragraph(content: &[InlineSpan]) -> Value {
    json!({ "type": "paragraph", "content": inline_nodes(content) })
}

/// The editor rejects text containers with no children, so an empty span
/// list becomes one empty text node.
fn inline_nodes(spans: &[InlineSpan]) -> Vec<Value> {
    if spans.is_empty() {
        return vec![json!({ "type": "text", "text": "" })];
    }
    spans.iter().map(text_node).collect()
}

fn text_node(span: &InlineSpan) -> Value {
    let marks = span.marks();
    if marks.is_empty() {
        json!({ "type": "text", "text": span.text() })
    } else {
        json!({
            "type": "text",
            "text": span.text(),
            "marks": marks.iter().map(mark_node).collect::<Vec<_>>(),
        })
    }
}

fn mark_node(mark: &Mark) -> Value {
    match mark {
        Mark::Bold => json!({ "type": "bold" }),
        Mark::Italic => json!({ "type": "italic" }),
        Mark::Link { href } => json!({
            "type": "link",
            "attrs": {
                "href": href,
                "target": LINK_TARGET,
                "rel": LINK_REL,
                "class": null,
            },
        }),
    }
}
