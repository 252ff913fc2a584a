use serde_json::{Value, json};

use super::dispatch::{HandlerOutput, HandlerParams, ImportState};
use super::{emu_attr, emu_to_px, parse_number, rot_to_degrees, toggle_value};
use crate::element::Element;
use crate::model::{Attrs, Node, NodeType};

const WRAP_KINDS: &[(&str, &str)] = &[
    ("wp:wrapNone", "None"),
    ("wp:wrapSquare", "Square"),
    ("wp:wrapTight", "Tight"),
    ("wp:wrapThrough", "Through"),
    ("wp:wrapTopAndBottom", "TopAndBottom"),
];

/// `w:drawing` holding a `wp:inline` or `wp:anchor` picture. Drawings
/// whose picture cannot be resolved are consumed and dropped.
pub(crate) fn handle_drawing(params: &HandlerParams<'_>, state: &mut ImportState) -> HandlerOutput {
    let Some(drawing) = params.first_named("w:drawing") else {
        return HandlerOutput::skip();
    };
    let image = drawing
        .elements
        .iter()
        .filter(|c| c.is("wp:inline") || c.is("wp:anchor"))
        .find_map(|c| image_node(c, params));
    match image {
        Some(node) => {
            state.position += 1;
            HandlerOutput::one(node)
        }
        None => HandlerOutput::swallow(1),
    }
}

fn find_blip_embed(container: &Element) -> Option<&str> {
    container.descendant("a:blip").and_then(|b| b.attr("r:embed"))
}

pub(crate) fn image_node(container: &Element, params: &HandlerParams<'_>) -> Option<Node> {
    let Some(embed) = find_blip_embed(container) else {
        log::warn!("Drawing without picture payload, dropping it");
        return None;
    };
    let Some(src) = params.docx.resolve_relationship(&params.extra.part, embed) else {
        log::warn!("Image relationship {embed} not found in {}", params.extra.part);
        return None;
    };
    if !params.docx.package.has_media(&src) {
        log::debug!("Image target {src} is not a package part");
    }

    let is_anchor = container.is("wp:anchor");
    let doc_pr = container.child("wp:docPr");

    let mut attrs = Attrs::new();
    attrs.insert("src".into(), src.into());
    attrs.insert("rId".into(), embed.into());
    if let Some(doc_pr) = doc_pr {
        if let Some(id) = doc_pr.attr("id") {
            attrs.insert("id".into(), id.into());
        }
        if let Some(alt) = doc_pr.attr("descr").or_else(|| doc_pr.attr("name")) {
            attrs.insert("alt".into(), alt.into());
        }
        if let Some(title) = doc_pr.attr("title") {
            attrs.insert("title".into(), title.into());
        }
    }

    if let Some(extent) = container.child("wp:extent") {
        attrs.insert(
            "size".into(),
            json!({
                "width": emu_attr(extent, "cx").unwrap_or(0.0),
                "height": emu_attr(extent, "cy").unwrap_or(0.0),
            }),
        );
    }
    if let Some(padding) = padding(container) {
        attrs.insert("padding".into(), padding);
    }
    attrs.insert("isAnchor".into(), is_anchor.into());

    if is_anchor {
        attrs.insert("anchorData".into(), anchor_data(container));
    }
    attrs.insert("wrap".into(), wrap(container, is_anchor));
    if let Some(transform) = transform_data(container) {
        attrs.insert("transformData".into(), transform);
    }

    Some(Node::leaf(NodeType::Image).with_attrs(attrs))
}

fn padding(container: &Element) -> Option<Value> {
    let sides = [("top", "distT"), ("bottom", "distB"), ("left", "distL"), ("right", "distR")];
    let mut out = Attrs::new();
    for (key, attr) in sides {
        if let Some(px) = emu_attr(container, attr) {
            out.insert(key.into(), json!(px));
        }
    }
    (!out.is_empty()).then_some(Value::Object(out))
}

fn position_value(position: Option<&Element>, child: &str) -> Option<f64> {
    position
        .and_then(|p| p.child(child))
        .and_then(|n| n.text.as_deref())
        .and_then(parse_number)
        .map(emu_to_px)
}

fn anchor_data(anchor: &Element) -> Value {
    let pos_h = anchor.child("wp:positionH");
    let pos_v = anchor.child("wp:positionV");
    let align = |pos: Option<&Element>| {
        pos.and_then(|p| p.child("wp:align"))
            .and_then(|a| a.text.clone())
    };
    let mut data = Attrs::new();
    data.insert(
        "hRelativeFrom".into(),
        pos_h.and_then(|p| p.attr("relativeFrom")).unwrap_or("column").into(),
    );
    data.insert(
        "vRelativeFrom".into(),
        pos_v.and_then(|p| p.attr("relativeFrom")).unwrap_or("paragraph").into(),
    );
    if let Some(a) = align(pos_h) {
        data.insert("alignH".into(), a.into());
    }
    if let Some(a) = align(pos_v) {
        data.insert("alignV".into(), a.into());
    }
    if let Some(offset) = position_value(pos_h, "wp:posOffset") {
        data.insert("offsetH".into(), json!(offset));
    }
    if let Some(offset) = position_value(pos_v, "wp:posOffset") {
        data.insert("offsetV".into(), json!(offset));
    }
    Value::Object(data)
}

fn wrap(container: &Element, is_anchor: bool) -> Value {
    if !is_anchor {
        return json!({ "type": "Inline" });
    }
    let behind_doc = container.attr("behindDoc").is_some_and(|v| toggle_value(Some(v)));
    let found = container
        .elements
        .iter()
        .find_map(|c| WRAP_KINDS.iter().find(|(n, _)| c.is(n)).map(|(_, k)| (c, *k)));

    let mut wrap_attrs = Attrs::new();
    let kind = match found {
        Some((el, kind)) => {
            if let Some(text) = el.attr("wrapText") {
                wrap_attrs.insert("wrapText".into(), text.into());
            }
            for (key, attr) in [("distTop", "distT"), ("distBottom", "distB"), ("distLeft", "distL"), ("distRight", "distR")] {
                if let Some(px) = emu_attr(el, attr) {
                    wrap_attrs.insert(key.into(), json!(px));
                }
            }
            kind
        }
        None => "None",
    };
    if kind == "None" {
        wrap_attrs.insert("behindDoc".into(), behind_doc.into());
    }
    json!({ "type": kind, "attrs": wrap_attrs })
}

fn transform_data(container: &Element) -> Option<Value> {
    let mut data = Attrs::new();
    if let Some(xfrm) = container.descendant("a:xfrm") {
        if let Some(rot) = xfrm.attr("rot").and_then(parse_number) {
            data.insert("rotation".into(), json!(rot_to_degrees(rot)));
        }
        if xfrm.attr("flipH").is_some_and(|v| toggle_value(Some(v))) {
            data.insert("horizontalFlip".into(), true.into());
        }
        if xfrm.attr("flipV").is_some_and(|v| toggle_value(Some(v))) {
            data.insert("verticalFlip".into(), true.into());
        }
    }
    if let Some(effect) = container.child("wp:effectExtent") {
        let mut ext = Attrs::new();
        for (key, attr) in [("left", "l"), ("top", "t"), ("right", "r"), ("bottom", "b")] {
            if let Some(px) = emu_attr(effect, attr) {
                ext.insert(key.into(), json!(px));
            }
        }
        if ext.values().any(|v| v.as_f64().is_some_and(|f| f != 0.0)) {
            data.insert("sizeExtension".into(), Value::Object(ext));
        }
    }
    (!data.is_empty()).then_some(Value::Object(data))
}
