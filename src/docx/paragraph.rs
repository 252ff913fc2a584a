use serde_json::{Value, json};

use super::dispatch::{DocxContext, HandlerOutput, HandlerParams, ImportState};
use super::styles::{PropertyBag, PropertyKey};
use super::{parse_number, round2, toggle_value, twips_to_px};
use crate::element::Element;
use crate::model::{Attrs, Node, NodeType};

/// Paragraph properties after the cascade: defaults, style chain, direct `pPr`.
pub(crate) struct EffectiveParagraph {
    /// `w:pStyle` as written on the paragraph.
    pub style_id: Option<String>,
    /// The style that actually applies, falling back to the default style.
    pub applied_style: Option<String>,
    pub properties: PropertyBag,
}

pub(crate) fn effective_paragraph(p: &Element, docx: &DocxContext<'_>) -> EffectiveParagraph {
    let direct = p
        .child("w:pPr")
        .map(PropertyBag::from_paragraph_properties)
        .unwrap_or_default();
    let style_id = direct.val(PropertyKey::ParagraphStyle).map(str::to_string);
    let applied_style = style_id
        .clone()
        .or_else(|| docx.styles.default_paragraph_style().map(str::to_string));
    let resolved = applied_style
        .as_deref()
        .map(|id| docx.styles.resolve(id))
        .unwrap_or_default();
    let properties = PropertyBag::merged(&[
        &docx.styles.defaults().paragraph,
        &resolved.paragraph,
        &direct,
    ]);
    EffectiveParagraph {
        style_id,
        applied_style,
        properties,
    }
}

pub(crate) fn handle_paragraph(params: &HandlerParams<'_>, state: &mut ImportState) -> HandlerOutput {
    let Some(p) = params.first_named("w:p") else {
        return HandlerOutput::skip();
    };
    HandlerOutput::one(paragraph_node(p, params, state))
}

/// Convert one `w:p`, dispatching its children with the paragraph's style
/// as their parent style.
pub(crate) fn paragraph_node(p: &Element, params: &HandlerParams<'_>, state: &mut ImportState) -> Node {
    let effective = effective_paragraph(p, params.docx);
    if let Some(id) = &effective.style_id {
        state.styles_used.insert(id.clone());
    }
    let attrs = paragraph_attrs(p, &effective);
    // block boundaries count as positions, so ranges in adjacent
    // paragraphs never share one
    state.position += 1;
    let content = params.dispatch_with(
        &p.elements,
        params.extra,
        effective.applied_style.as_deref(),
        state,
    );
    state.position += 1;
    Node::container(NodeType::Paragraph, content).with_attrs(attrs)
}

fn paragraph_attrs(p: &Element, effective: &EffectiveParagraph) -> Attrs {
    let bag = &effective.properties;
    let mut attrs = Attrs::new();

    if let Some(id) = &effective.style_id {
        attrs.insert("styleId".into(), id.clone().into());
    }
    if let Some(align) = bag.val(PropertyKey::Justification).and_then(text_align) {
        attrs.insert("textAlign".into(), align.into());
    }
    if let Some(spacing) = bag.get(PropertyKey::ParagraphSpacing).and_then(spacing_attrs) {
        attrs.insert("spacing".into(), spacing);
    }
    if let Some(indent) = bag.get(PropertyKey::Indentation).and_then(indent_attrs) {
        attrs.insert("indent".into(), indent);
    }
    if bag.contains(PropertyKey::KeepNext) && toggle_value(bag.val(PropertyKey::KeepNext)) {
        attrs.insert("keepNext".into(), true.into());
    }
    if bag.contains(PropertyKey::PageBreakBefore)
        && toggle_value(bag.val(PropertyKey::PageBreakBefore))
    {
        attrs.insert("pageBreakBefore".into(), true.into());
    }
    if let Some(level) = bag.val(PropertyKey::OutlineLevel).and_then(|v| v.parse::<u8>().ok()) {
        attrs.insert("outlineLevel".into(), level.into());
    }
    if let Some(para_id) = p.attr("w14:paraId") {
        attrs.insert("paraId".into(), para_id.into());
    }
    attrs
}

fn text_align(jc: &str) -> Option<&'static str> {
    Some(match jc {
        "left" | "start" => "left",
        "center" => "center",
        "right" | "end" => "right",
        "both" | "distribute" => "justify",
        _ => return None,
    })
}

type Attributes = std::collections::BTreeMap<String, String>;

fn spacing_attrs(spacing: &Attributes) -> Option<Value> {
    let px = |name: &str| spacing.get(name).and_then(|v| parse_number(v)).map(twips_to_px);
    let mut out = Attrs::new();
    if let Some(before) = px("w:before") {
        out.insert("before".into(), json!(before));
    }
    if let Some(after) = px("w:after") {
        out.insert("after".into(), json!(after));
    }
    let rule = spacing.get("w:lineRule").map(String::as_str).unwrap_or("auto");
    if let Some(line) = spacing.get("w:line").and_then(|v| parse_number(v)) {
        // auto spacing is in 240ths of a line, the others are twips
        let line = if rule == "auto" {
            round2(line / 240.0)
        } else {
            twips_to_px(line)
        };
        out.insert("line".into(), json!(line));
        out.insert("lineRule".into(), rule.into());
    }
    (!out.is_empty()).then_some(Value::Object(out))
}

fn indent_attrs(ind: &Attributes) -> Option<Value> {
    let px = |names: &[&str]| {
        names
            .iter()
            .find_map(|n| ind.get(*n))
            .and_then(|v| parse_number(v))
            .map(twips_to_px)
    };
    let mut out = Attrs::new();
    for (key, names) in [
        ("left", &["w:left", "w:start"][..]),
        ("right", &["w:right", "w:end"][..]),
        ("firstLine", &["w:firstLine"][..]),
        ("hanging", &["w:hanging"][..]),
    ] {
        if let Some(value) = px(names) {
            out.insert(key.into(), json!(value));
        }
    }
    (!out.is_empty()).then_some(Value::Object(out))
}

/// Style id a paragraph names directly, if any.
pub(crate) fn paragraph_style_id(p: &Element) -> Option<&str> {
    p.child("w:pPr").and_then(|ppr| ppr.child_val("w:pStyle"))
}
