use super::dispatch::{HandlerOutput, HandlerParams, ImportState, block_content};
use crate::element::Element;
use crate::model::{Mark, MarkType, Node, NodeType};

pub(crate) fn link_mark(href: String) -> Mark {
    Mark::new(MarkType::Link).with_attr("href", href)
}

pub(crate) fn handle_hyperlink(params: &HandlerParams<'_>, state: &mut ImportState) -> HandlerOutput {
    let Some(link) = params.first_named("w:hyperlink") else {
        return HandlerOutput::skip();
    };
    let r_id = link.attr("r:id");
    let anchor = link.attr("w:anchor");

    let href = match (r_id, anchor) {
        (Some(id), _) => match params.docx.resolve_relationship(&params.extra.part, id) {
            Some(target) => Some(match anchor {
                Some(a) => format!("{target}#{a}"),
                None => target,
            }),
            None => {
                log::debug!("Hyperlink relationship {id} not found");
                anchor.map(|a| format!("#{a}"))
            }
        },
        (None, Some(a)) => Some(format!("#{a}")),
        (None, None) => None,
    };

    let Some(href) = href else {
        // nothing to link to, keep the text
        return HandlerOutput::new(params.dispatch(&link.elements, state), 1);
    };
    let mut mark = link_mark(href);
    if let Some(id) = r_id {
        mark = mark.with_attr("rId", id);
    }
    if let Some(a) = anchor {
        mark = mark.with_attr("anchor", a);
    }
    if let Some(tooltip) = link.attr("w:tooltip") {
        mark = mark.with_attr("tooltip", tooltip);
    }

    let extra = params.extra.with_link(mark);
    let content = params.dispatch_with(&link.elements, &extra, params.parent_style_id, state);
    HandlerOutput::new(content, 1)
}

pub(crate) fn handle_bookmark(params: &HandlerParams<'_>, _state: &mut ImportState) -> HandlerOutput {
    let Some(bookmark) = params.first_named("w:bookmarkStart") else {
        return HandlerOutput::skip();
    };
    let mut node = Node::leaf(NodeType::BookmarkStart);
    if let Some(id) = bookmark.attr("w:id") {
        node = node.with_attr("id", id);
    }
    if let Some(name) = bookmark.attr("w:name") {
        node = node.with_attr("name", name);
    }
    HandlerOutput::one(node)
}

/// Range markers also feed the structural comment threading.
pub(crate) fn handle_comment_range(params: &HandlerParams<'_>, state: &mut ImportState) -> HandlerOutput {
    let Some(node) = params.first() else {
        return HandlerOutput::skip();
    };
    let kind = match node.name.as_str() {
        "w:commentRangeStart" => NodeType::CommentRangeStart,
        "w:commentRangeEnd" => NodeType::CommentRangeEnd,
        "w:commentReference" => return HandlerOutput::swallow(1),
        _ => return HandlerOutput::skip(),
    };
    let Some(id) = node.attr("w:id") else {
        return HandlerOutput::swallow(1);
    };
    if kind == NodeType::CommentRangeStart {
        state.comment_ranges.record_start(id, state.position);
    } else {
        state.comment_ranges.record_end(id, state.position);
    }
    HandlerOutput::one(Node::leaf(kind).with_attr("w:id", id))
}

pub(crate) fn handle_note_reference(params: &HandlerParams<'_>, state: &mut ImportState) -> HandlerOutput {
    let Some(node) = params.first() else {
        return HandlerOutput::skip();
    };
    let (kind, notes) = match node.name.as_str() {
        "w:footnoteReference" => (NodeType::FootnoteReference, &mut state.footnotes),
        "w:endnoteReference" => (NodeType::EndnoteReference, &mut state.endnotes),
        _ => return HandlerOutput::skip(),
    };
    let Some(id) = node.attr("w:id") else {
        return HandlerOutput::swallow(1);
    };
    let number = notes.register(id);
    state.position += 1;
    HandlerOutput::one(
        Node::leaf(kind)
            .with_attr("id", id)
            .with_attr("number", number),
    )
}

/// `w:ins`/`w:del` (and their move variants) mark everything inside.
pub(crate) fn handle_track_change(params: &HandlerParams<'_>, state: &mut ImportState) -> HandlerOutput {
    let Some(node) = params.first() else {
        return HandlerOutput::skip();
    };
    let kind = match node.name.as_str() {
        "w:ins" | "w:moveTo" => MarkType::TrackInsert,
        "w:del" | "w:moveFrom" => MarkType::TrackDelete,
        _ => return HandlerOutput::skip(),
    };
    let mut mark = Mark::new(kind);
    for (key, attr) in [("id", "w:id"), ("author", "w:author"), ("date", "w:date")] {
        if let Some(value) = node.attr(attr) {
            mark = mark.with_attr(key, value);
        }
    }
    let extra = params.extra.with_track(mark);
    let content = params.dispatch_with(&node.elements, &extra, params.parent_style_id, state);
    HandlerOutput::new(content, 1)
}

/// Wrappers with no node of their own; their children are lifted in place.
pub(crate) fn handle_passthrough(params: &HandlerParams<'_>, state: &mut ImportState) -> HandlerOutput {
    let Some(node) = params
        .first()
        .filter(|n| matches!(n.name.as_str(), "w:smartTag" | "w:customXml" | "w:dir" | "w:bdo"))
    else {
        return HandlerOutput::skip();
    };
    HandlerOutput::new(params.dispatch(&node.elements, state), 1)
}

fn has_block_children(content: &Element) -> bool {
    content
        .elements
        .iter()
        .any(|c| c.is("w:p") || c.is("w:tbl") || (c.is("w:sdt") && c.descendant("w:p").is_some()))
}

/// Content controls: block, inline or document part (e.g. a TOC gallery).
pub(crate) fn handle_sdt(params: &HandlerParams<'_>, state: &mut ImportState) -> HandlerOutput {
    let Some(sdt) = params.first_named("w:sdt") else {
        return HandlerOutput::skip();
    };
    let Some(content) = sdt.child("w:sdtContent") else {
        return HandlerOutput::swallow(1);
    };
    let sdt_pr = sdt.child("w:sdtPr");
    let id = sdt_pr.and_then(|p| p.child_val("w:id"));

    if let Some(doc_part) = sdt_pr.and_then(|p| p.child("w:docPartObj")) {
        let blocks = block_content(params.dispatch(&content.elements, state));
        let mut node = Node::container(NodeType::DocumentPartObject, blocks);
        if let Some(id) = id {
            node = node.with_attr("id", id);
        }
        if let Some(gallery) = doc_part.child_val("w:docPartGallery") {
            node = node.with_attr("docPartGallery", gallery);
        }
        return HandlerOutput::one(node);
    }

    let block = has_block_children(content);
    let children = params.dispatch(&content.elements, state);
    let (kind, children) = if block {
        (NodeType::StructuredContentBlock, block_content(children))
    } else {
        (NodeType::StructuredContent, children)
    };
    let mut node = Node::container(kind, children);
    if let Some(id) = id {
        node = node.with_attr("id", id);
    }
    if let Some(tag) = sdt_pr.and_then(|p| p.child_val("w:tag")) {
        node = node.with_attr("tag", tag);
    }
    if let Some(alias) = sdt_pr.and_then(|p| p.child_val("w:alias")) {
        node = node.with_attr("alias", alias);
    }
    HandlerOutput::one(node)
}
