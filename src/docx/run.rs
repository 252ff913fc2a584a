use super::dispatch::{HandlerOutput, HandlerParams, ImportState};
use super::marks::compose_marks;
use super::styles::PropertyBag;
use crate::element::Element;
use crate::model::{Mark, Node, NodeType, normalize_marks};

/// Marks for `run`: defaults < paragraph style < run style < direct `rPr`,
/// plus whatever link or tracked-change mark encloses it.
pub(crate) fn run_marks(run: &Element, params: &HandlerParams<'_>, state: &mut ImportState) -> Vec<Mark> {
    let styles = &params.docx.styles;
    let rpr = run.child("w:rPr");

    let paragraph_style = params
        .parent_style_id
        .map(|id| styles.resolve(id).run)
        .unwrap_or_default();
    let run_style = match rpr.and_then(|r| r.child_val("w:rStyle")) {
        Some(id) => {
            state.styles_used.insert(id.to_string());
            styles.resolve(id).run
        }
        None => PropertyBag::default(),
    };

    let composed = compose_marks(
        rpr,
        &[&styles.defaults().run, &paragraph_style, &run_style],
        styles.theme(),
    );
    normalize_marks(
        composed
            .into_iter()
            .chain(params.extra.link.clone())
            .chain(params.extra.track.clone()),
    )
}

pub(crate) fn handle_run(params: &HandlerParams<'_>, state: &mut ImportState) -> HandlerOutput {
    let Some(run) = params.first_named("w:r") else {
        return HandlerOutput::skip();
    };
    let marks = run_marks(run, params, state);
    let extra = params.extra.with_run_marks(marks);
    let content = params.dispatch_with(&run.elements, &extra, params.parent_style_id, state);
    if content.is_empty() {
        return HandlerOutput::swallow(1);
    }
    HandlerOutput::one(Node::container(NodeType::Run, content))
}

fn text_node(text: &str, params: &HandlerParams<'_>, state: &mut ImportState) -> Node {
    state.position += text.chars().count();
    Node::text(text, params.extra.run_marks.clone())
}

/// `w:t` and, inside deletions, `w:delText`.
pub(crate) fn handle_text(params: &HandlerParams<'_>, state: &mut ImportState) -> HandlerOutput {
    let Some(node) = params
        .first()
        .filter(|n| n.is("w:t") || n.is("w:delText"))
    else {
        return HandlerOutput::skip();
    };
    match node.text.as_deref() {
        Some(text) if !text.is_empty() => HandlerOutput::one(text_node(text, params, state)),
        _ => HandlerOutput::swallow(1),
    }
}

pub(crate) fn handle_tab(params: &HandlerParams<'_>, state: &mut ImportState) -> HandlerOutput {
    if params.first_named("w:tab").is_none() && params.first_named("w:ptab").is_none() {
        return HandlerOutput::skip();
    }
    state.position += 1;
    HandlerOutput::one(Node::leaf(NodeType::Tab))
}

pub(crate) fn handle_break(params: &HandlerParams<'_>, state: &mut ImportState) -> HandlerOutput {
    let Some(node) = params.first().filter(|n| n.is("w:br") || n.is("w:cr")) else {
        return HandlerOutput::skip();
    };
    state.position += 1;
    let node = match node.attr("w:type") {
        Some(kind @ ("page" | "column")) if node.is("w:br") => {
            Node::leaf(NodeType::HardBreak).with_attr("pageBreakType", kind)
        }
        _ => Node::leaf(NodeType::LineBreak),
    };
    HandlerOutput::one(node)
}

/// `w:sym`, `w:noBreakHyphen` and `w:softHyphen` become plain characters.
pub(crate) fn handle_symbol(params: &HandlerParams<'_>, state: &mut ImportState) -> HandlerOutput {
    let Some(node) = params.first() else {
        return HandlerOutput::skip();
    };
    let ch = match node.name.as_str() {
        "w:noBreakHyphen" => Some('\u{2011}'),
        "w:softHyphen" => Some('\u{00AD}'),
        "w:sym" => node
            .attr("w:char")
            .and_then(|c| u32::from_str_radix(c, 16).ok())
            .and_then(symbol_char),
        _ => return HandlerOutput::skip(),
    };
    match ch {
        Some(ch) => HandlerOutput::one(text_node(&ch.to_string(), params, state)),
        None => HandlerOutput::swallow(1),
    }
}

/// Symbol fonts address glyphs in the F000 private-use block.
fn symbol_char(cp: u32) -> Option<char> {
    if (0xF000..=0xF0FF).contains(&cp) {
        symbol_pua_to_unicode(cp)
    } else {
        char::from_u32(cp)
    }
}

pub(crate) fn symbol_pua_to_unicode(cp: u32) -> Option<char> {
    let sym = cp.checked_sub(0xF000)?;
    let mapped = match sym {
        0xB7 => '\u{2022}', // bullet
        0xA7 => '\u{25A0}', // black square (Wingdings)
        0xA8 => '\u{25CB}', // white circle
        0xD8 => '\u{2666}', // diamond
        0x76 => '\u{221A}', // check mark
        _ => return char::from_u32(sym),
    };
    Some(mapped)
}
