pub mod dispatch;
pub mod marks;
pub mod numbering;
pub mod styles;

mod comments;
mod drawing;
mod fields;
mod inline;
mod notes;
mod paragraph;
mod run;
mod table;

use std::collections::HashSet;
use std::time::Instant;

use crate::element::Element;
use crate::error::Error;
use crate::model::{HeaderFooter, HeaderFooterKind, ImportResult, Node};
use crate::package::{DOCUMENT_PART, ENDNOTES_PART, FOOTNOTES_PART, Package};

use dispatch::{DocxContext, ExtraParams, ImportState, NodeListHandler, block_content};

pub use comments::{CommentRanges, RangeMarker};
pub use notes::NoteReferences;

/// Knobs for one import. `Default` turns everything on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportOptions {
    pub include_headers_footers: bool,
    /// Thread comments from range markers when `commentsExtended.xml` is absent.
    pub infer_comment_threads: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            include_headers_footers: true,
            infer_comment_threads: true,
        }
    }
}

/// OOXML toggle value: absent or anything but 0/false/off is on.
pub fn toggle_value(val: Option<&str>) -> bool {
    match val {
        None => true,
        Some(v) => {
            let v = v.trim();
            !(v == "0" || v.eq_ignore_ascii_case("false") || v.eq_ignore_ascii_case("off"))
        }
    }
}

/// Toggle element such as `w:keepNext`: `Some(true)` when present and on.
pub(crate) fn toggle_child(parent: &Element, name: &str) -> Option<bool> {
    parent.child(name).map(|n| toggle_value(n.val()))
}

pub(crate) fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 1440 twips per inch, 96 px per inch.
pub fn twips_to_px(twips: f64) -> f64 {
    round2(twips / 15.0)
}

/// 914400 EMU per inch, 96 px per inch.
pub fn emu_to_px(emu: f64) -> f64 {
    round2(emu / 9525.0)
}

/// DrawingML angles are in 60000ths of a degree.
pub fn rot_to_degrees(rot: f64) -> f64 {
    round2(rot / 60000.0)
}

pub(crate) fn twips_attr(node: &Element, attr: &str) -> Option<f64> {
    node.attr(attr).and_then(parse_number).map(twips_to_px)
}

pub(crate) fn emu_attr(node: &Element, attr: &str) -> Option<f64> {
    node.attr(attr).and_then(parse_number).map(emu_to_px)
}

pub(crate) fn highlight_color(name: &str) -> Option<&'static str> {
    let hex = match name {
        "yellow" => "#FFFF00",
        "green" => "#00FF00",
        "cyan" => "#00FFFF",
        "magenta" => "#FF00FF",
        "red" => "#FF0000",
        "blue" => "#0000FF",
        "darkYellow" => "#808000",
        "darkGreen" => "#008000",
        "darkCyan" => "#008080",
        "darkMagenta" => "#800080",
        "darkRed" => "#800000",
        "darkBlue" => "#000080",
        "lightGray" => "#C0C0C0",
        "darkGray" => "#808080",
        "black" => "#000000",
        "white" => "#FFFFFF",
        _ => return None,
    };
    Some(hex)
}

pub(crate) fn is_hex_color(val: &str) -> bool {
    val.len() == 6 && val.chars().all(|c| c.is_ascii_hexdigit())
}

pub fn create_document_json(package: &Package) -> Result<ImportResult, Error> {
    create_document_json_with(package, ImportOptions::default())
}

/// Convert a loaded package into the document tree and its side channels.
///
/// Only a missing `word/document.xml` or `w:body` is an error; everything
/// below that degrades element by element.
pub fn create_document_json_with(
    package: &Package,
    options: ImportOptions,
) -> Result<ImportResult, Error> {
    let t0 = Instant::now();

    let Some(document) = package.part(DOCUMENT_PART) else {
        return Err(Error::InvalidDocx("missing word/document.xml".into()));
    };
    let Some(body) = document.child("w:body") else {
        return Err(Error::InvalidDocx("word/document.xml has no w:body".into()));
    };

    let docx = DocxContext::new(package, options);
    let handler = NodeListHandler::standard();
    let mut state = ImportState::default();
    let extra = ExtraParams::for_part(DOCUMENT_PART);

    let content = block_content(handler.handle(&body.elements, &docx, &extra, None, &mut state));
    let pm_doc = Node::doc(content);
    let t_body = t0.elapsed();

    let (headers, footers) = if docx.options.include_headers_footers {
        import_headers_footers(&docx, &handler, body, &mut state)
    } else {
        (Vec::new(), Vec::new())
    };

    let footnote_refs = std::mem::take(&mut state.footnotes);
    let endnote_refs = std::mem::take(&mut state.endnotes);
    let footnotes = notes::import_notes(
        &docx,
        &handler,
        FOOTNOTES_PART,
        "w:footnote",
        &footnote_refs,
        &mut state,
    );
    let endnotes = notes::import_notes(
        &docx,
        &handler,
        ENDNOTES_PART,
        "w:endnote",
        &endnote_refs,
        &mut state,
    );

    let mut styles_used = std::mem::take(&mut state.styles_used);
    let comments = comments::import_comments(
        &docx,
        &handler,
        &state.comment_ranges,
        &mut styles_used,
    );

    let t_total = t0.elapsed();
    log::info!(
        "Timing: body={:.1}ms, total={:.1}ms ({} blocks, {} comments, {} footnotes, {} endnotes)",
        t_body.as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        pm_doc.children().len(),
        comments.len(),
        footnotes.len(),
        endnotes.len(),
    );

    Ok(ImportResult {
        pm_doc,
        footnotes,
        endnotes,
        comments,
        headers,
        footers,
        styles_used: styles_used.into_iter().collect(),
    })
}

fn import_headers_footers(
    docx: &DocxContext<'_>,
    handler: &NodeListHandler,
    body: &Element,
    body_state: &mut ImportState,
) -> (Vec<HeaderFooter>, Vec<HeaderFooter>) {
    let mut sections = Vec::new();
    body.descendants_named("w:sectPr", &mut sections);

    let rels = docx.relationships(DOCUMENT_PART);
    let mut seen = HashSet::new();
    let mut headers = Vec::new();
    let mut footers = Vec::new();

    for sect in sections {
        for reference in &sect.elements {
            let is_header = match reference.name.as_str() {
                "w:headerReference" => true,
                "w:footerReference" => false,
                _ => continue,
            };
            let Some(id) = reference.attr("r:id") else {
                continue;
            };
            if !seen.insert(id.to_string()) {
                continue;
            }
            let Some(path) = rels.resolve(id) else {
                log::debug!("Unresolved header/footer relationship {id}");
                continue;
            };
            let Some(root) = docx.package.part(&path) else {
                log::warn!("Header/footer part {path} is missing");
                continue;
            };
            let kind = match reference.attr("w:type") {
                Some("first") => HeaderFooterKind::First,
                Some("even") => HeaderFooterKind::Even,
                _ => HeaderFooterKind::Default,
            };

            let mut state = body_state.continue_in_part();
            let extra = ExtraParams::for_part(&path);
            let content =
                block_content(handler.handle(&root.elements, docx, &extra, None, &mut state));
            body_state.rejoin(state);

            let entry = HeaderFooter {
                id: id.to_string(),
                kind,
                part: path,
                content: Node::doc(content),
            };
            if is_header {
                headers.push(entry);
            } else {
                footers.push(entry);
            }
        }
    }
    (headers, footers)
}
