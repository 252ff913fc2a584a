//! Field codes.
//!
//! Complex fields are spread over sibling runs:
//! `begin`, instruction text, `separate`, cached result runs, `end`.
//! Inline fields are resolved among the siblings of one paragraph; a TOC
//! field spans whole paragraphs and is consumed at block level.

use super::dispatch::{HandlerOutput, HandlerParams, ImportState};
use super::inline::link_mark;
use super::paragraph::{effective_paragraph, paragraph_style_id};
use super::run::run_marks;
use crate::element::Element;
use crate::model::{Mark, Node, NodeType, normalize_marks};

/// Split a field instruction into tokens; quoted arguments lose their quotes.
pub(crate) fn instruction_tokens(instruction: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for ch in instruction.chars() {
        match ch {
            '"' => {
                if quoted || !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
                quoted = !quoted;
            }
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Keyword of an instruction, uppercased.
pub(crate) fn field_keyword(instruction: &str) -> String {
    instruction
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase()
}

/// Switches taking an argument, as far as the fields handled here go.
fn switch_takes_argument(keyword: &str, switch: &str) -> bool {
    match keyword {
        "HYPERLINK" => matches!(switch, "\\l" | "\\o" | "\\t"),
        _ => false,
    }
}

/// `(first positional argument, argument of each switch)`
fn field_arguments(instruction: &str) -> (Option<String>, Vec<(String, String)>) {
    let tokens = instruction_tokens(instruction);
    let keyword = field_keyword(instruction);
    let mut positional = None;
    let mut switches = Vec::new();
    let mut iter = tokens.into_iter().skip(1);
    while let Some(token) = iter.next() {
        if token.starts_with('\\') {
            if switch_takes_argument(&keyword, &token)
                && let Some(arg) = iter.next()
            {
                switches.push((token, arg));
            }
        } else if positional.is_none() {
            positional = Some(token);
        }
    }
    (positional, switches)
}

fn hyperlink_target(instruction: &str) -> Option<Mark> {
    let (url, switches) = field_arguments(instruction);
    let anchor = switches.iter().find(|(s, _)| s == "\\l").map(|(_, a)| a.clone());
    let href = match (url, &anchor) {
        (Some(url), Some(a)) => format!("{url}#{a}"),
        (Some(url), None) => url,
        (None, Some(a)) => format!("#{a}"),
        (None, None) => return None,
    };
    let mut mark = link_mark(href);
    if let Some(a) = anchor {
        mark = mark.with_attr("anchor", a);
    }
    if let Some((_, tooltip)) = switches.iter().find(|(s, _)| s == "\\o") {
        mark = mark.with_attr("tooltip", tooltip.clone());
    }
    Some(mark)
}

fn pageref_href(instruction: &str) -> Option<String> {
    field_arguments(instruction).0.map(|bookmark| format!("#{bookmark}"))
}

fn fld_char_type(run: &Element) -> Option<&str> {
    run.child("w:fldChar").and_then(|f| f.attr("w:fldCharType"))
}

pub(crate) fn handle_field(params: &HandlerParams<'_>, state: &mut ImportState) -> HandlerOutput {
    match params.first() {
        Some(node) if node.is("w:fldSimple") => {
            let instruction = node.attr("w:instr").unwrap_or_default();
            let marks_run = node.children_named("w:r").next();
            let nodes = field_nodes(instruction, &node.elements, marks_run, params, state);
            HandlerOutput::new(nodes, 1)
        }
        Some(node) if node.is("w:r") && fld_char_type(node) == Some("begin") => {
            complex_field(params, state)
        }
        _ => HandlerOutput::skip(),
    }
}

fn complex_field(params: &HandlerParams<'_>, state: &mut ImportState) -> HandlerOutput {
    let mut depth = 0usize;
    let mut instruction = String::new();
    let mut separate_at = None;
    let mut end_at = None;

    'scan: for (index, node) in params.nodes.iter().enumerate() {
        if !node.is("w:r") {
            continue;
        }
        for child in &node.elements {
            match child.name.as_str() {
                "w:fldChar" => match child.attr("w:fldCharType") {
                    Some("begin") => depth += 1,
                    Some("separate") if depth == 1 => separate_at = Some(index),
                    Some("end") => {
                        depth = depth.saturating_sub(1);
                        if depth == 0 {
                            end_at = Some(index);
                            break 'scan;
                        }
                    }
                    _ => {}
                },
                "w:instrText" if depth == 1 && separate_at.is_none() => {
                    instruction.push_str(child.text.as_deref().unwrap_or_default());
                }
                _ => {}
            }
        }
    }

    // an unterminated field leaves its runs to the run handler
    let Some(end) = end_at else {
        return HandlerOutput::skip();
    };
    let result = match separate_at {
        Some(sep) if sep < end => &params.nodes[sep + 1..end],
        _ => &params.nodes[0..0],
    };
    let marks_run = result.iter().find(|n| n.is("w:r")).or(params.first());
    let nodes = field_nodes(&instruction, result, marks_run, params, state);
    HandlerOutput::new(nodes, end + 1)
}

fn field_nodes(
    instruction: &str,
    result: &[Element],
    marks_run: Option<&Element>,
    params: &HandlerParams<'_>,
    state: &mut ImportState,
) -> Vec<Node> {
    let instruction = instruction.trim();
    let keyword = field_keyword(instruction);
    let leaf = |kind: NodeType, state: &mut ImportState| {
        let marks = marks_run.map(|r| run_marks(r, params, state)).unwrap_or_default();
        state.position += 1;
        Node::leaf(kind)
            .with_attr("instruction", instruction)
            .with_marks(marks)
    };

    match keyword.as_str() {
        "PAGE" => vec![leaf(NodeType::PageNumber, state)],
        "NUMPAGES" => vec![leaf(NodeType::TotalPageNumber, state)],
        "HYPERLINK" => match hyperlink_target(instruction) {
            Some(mark) => {
                let extra = params.extra.with_link(mark);
                params.dispatch_with(result, &extra, params.parent_style_id, state)
            }
            None => params.dispatch(result, state),
        },
        "PAGEREF" => match pageref_href(instruction) {
            Some(href) => {
                let extra = params.extra.with_link(link_mark(href));
                params.dispatch_with(result, &extra, params.parent_style_id, state)
            }
            None => params.dispatch(result, state),
        },
        _ => params.dispatch(result, state),
    }
}

enum FieldEvent<'a> {
    Begin,
    Instr(&'a str),
    Separate,
    End,
    Text(&'a str, &'a Element),
}

/// Field markers and text of a paragraph in document order, looking
/// through hyperlinks, content controls and other inline wrappers.
fn field_events<'a>(container: &'a Element, out: &mut Vec<FieldEvent<'a>>) {
    for child in &container.elements {
        if child.is("w:r") {
            for item in &child.elements {
                match item.name.as_str() {
                    "w:fldChar" => match item.attr("w:fldCharType") {
                        Some("begin") => out.push(FieldEvent::Begin),
                        Some("separate") => out.push(FieldEvent::Separate),
                        Some("end") => out.push(FieldEvent::End),
                        _ => {}
                    },
                    "w:instrText" => out.push(FieldEvent::Instr(item.text.as_deref().unwrap_or_default())),
                    "w:t" => out.push(FieldEvent::Text(item.text.as_deref().unwrap_or_default(), child)),
                    _ => {}
                }
            }
        } else if !child.is("w:pPr") {
            field_events(child, out);
        }
    }
}

/// Whether the first field of `p` is a TOC.
fn opens_toc(p: &Element) -> bool {
    let mut events = Vec::new();
    field_events(p, &mut events);
    let mut instruction = String::new();
    let mut seen_begin = false;
    for event in events {
        match event {
            FieldEvent::Begin if !seen_begin => seen_begin = true,
            FieldEvent::Instr(text) if seen_begin => instruction.push_str(text),
            FieldEvent::Separate | FieldEvent::End | FieldEvent::Begin if seen_begin => break,
            _ => {}
        }
    }
    field_keyword(&instruction) == "TOC"
}

#[derive(Default)]
struct FieldFrame {
    instruction: String,
    in_result: bool,
}

impl FieldFrame {
    fn is_pageref(&self) -> bool {
        field_keyword(&self.instruction) == "PAGEREF"
    }
}

#[derive(Default)]
struct TocEntryParts<'a> {
    title: String,
    title_run: Option<&'a Element>,
    page: String,
    pageref: Option<String>,
}

/// A paragraph run of a TOC field becomes one `toc-wrapper`; each entry
/// paragraph becomes a `toc-entry` of `[title, tab, page]`.
pub(crate) fn handle_toc(params: &HandlerParams<'_>, state: &mut ImportState) -> HandlerOutput {
    let Some(first) = params.first_named("w:p") else {
        return HandlerOutput::skip();
    };
    if !opens_toc(first) {
        return HandlerOutput::skip();
    }

    let mut stack: Vec<FieldFrame> = Vec::new();
    let mut toc_instruction = None;
    let mut entries: Vec<(&Element, TocEntryParts<'_>)> = Vec::new();
    let mut end_at = None;

    for (index, node) in params.nodes.iter().enumerate() {
        if !node.is("w:p") {
            continue;
        }
        let mut events = Vec::new();
        field_events(node, &mut events);
        let mut parts = TocEntryParts::default();

        for event in events {
            match event {
                FieldEvent::Begin => stack.push(FieldFrame::default()),
                FieldEvent::Instr(text) => {
                    if let Some(top) = stack.last_mut()
                        && !top.in_result
                    {
                        top.instruction.push_str(text);
                    }
                }
                FieldEvent::Separate => {
                    if let Some(top) = stack.last_mut() {
                        top.in_result = true;
                    }
                    note_instruction(&stack, &mut toc_instruction, &mut parts);
                }
                FieldEvent::End => {
                    note_instruction(&stack, &mut toc_instruction, &mut parts);
                    stack.pop();
                }
                FieldEvent::Text(text, run) => {
                    if stack.last().is_some_and(|f| !f.in_result) {
                        continue;
                    }
                    if stack.iter().any(|f| f.in_result && f.is_pageref()) {
                        parts.page.push_str(text);
                    } else {
                        parts.title.push_str(text);
                        parts.title_run.get_or_insert(run);
                    }
                }
            }
        }
        entries.push((node, parts));
        if stack.is_empty() {
            end_at = Some(index);
            break;
        }
    }

    let Some(end) = end_at else {
        log::debug!("TOC field without end, leaving paragraphs as they are");
        return HandlerOutput::skip();
    };

    let content: Vec<Node> = entries
        .into_iter()
        .filter_map(|(p, parts)| toc_entry(p, parts, params, state))
        .collect();
    let wrapper = Node::container(NodeType::TocWrapper, content)
        .with_attr("instruction", toc_instruction.unwrap_or_default());
    HandlerOutput::new(vec![wrapper], end + 1)
}

fn note_instruction(
    stack: &[FieldFrame],
    toc_instruction: &mut Option<String>,
    parts: &mut TocEntryParts<'_>,
) {
    let Some(top) = stack.last() else {
        return;
    };
    let instruction = top.instruction.trim();
    if stack.len() == 1 && toc_instruction.is_none() {
        *toc_instruction = Some(instruction.to_string());
    } else if top.is_pageref() && parts.pageref.is_none() {
        parts.pageref = Some(instruction.to_string());
    }
}

fn toc_entry(
    p: &Element,
    parts: TocEntryParts<'_>,
    params: &HandlerParams<'_>,
    state: &mut ImportState,
) -> Option<Node> {
    let title = parts.title.trim_end().to_string();
    let page = parts.page.trim().to_string();
    if title.is_empty() && page.is_empty() {
        return None;
    }

    let effective = effective_paragraph(p, params.docx);
    let entry_params = HandlerParams {
        nodes: params.nodes,
        docx: params.docx,
        node_list_handler: params.node_list_handler,
        extra: params.extra,
        parent_style_id: effective.applied_style.as_deref(),
    };
    let base_marks = parts
        .title_run
        .map(|r| run_marks(r, &entry_params, state))
        .unwrap_or_default();

    let link = parts
        .pageref
        .as_deref()
        .and_then(pageref_href)
        .map(link_mark);
    let with_link = |marks: Vec<Mark>| normalize_marks(marks.into_iter().chain(link.clone()));

    let mut content = Vec::new();
    state.position += 1;
    if !title.is_empty() {
        state.position += title.chars().count();
        content.push(Node::text(title, with_link(base_marks)));
    }
    if parts.pageref.is_some() {
        state.position += 1;
        content.push(Node::leaf(NodeType::Tab));
        if !page.is_empty() {
            state.position += page.chars().count();
            content.push(Node::text(page, with_link(Vec::new())));
        }
    }
    state.position += 1;

    let mut entry = Node::container(NodeType::TocEntry, content);
    if let Some(instruction) = parts.pageref {
        entry = entry.with_attr("instruction", instruction);
    }
    if let Some(style_id) = paragraph_style_id(p) {
        state.styles_used.insert(style_id.to_string());
        entry = entry.with_attr("styleId", style_id);
    }
    Some(entry)
}
