//! Run properties to marks.
//!
//! Every recognized `rPr` child has its own importer with the shape
//! `fn(&[Element]) -> PropertyImport`, so each one can be exercised alone.
//! [`compose_marks`] merges the precedence layers into one property bag
//! first and only then runs the importers, so a later layer switching a
//! toggle off removes the mark an earlier layer switched on.

use serde_json::Value;

use super::styles::{PropertyBag, PropertyKey, Theme};
use super::{highlight_color, is_hex_color, parse_number, round2, toggle_value};
use crate::element::Element;
use crate::model::{Attrs, Mark, MarkType, normalize_marks};

/// Where an attribute contribution lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkTarget {
    /// A mark of its own, e.g. `bold`.
    Mark(MarkType),
    /// A key merged into the single `textStyle` mark.
    TextStyle(&'static str),
}

#[derive(Clone, Debug, PartialEq)]
pub struct AttrContribution {
    pub xml_name: &'static str,
    pub target: MarkTarget,
    pub attributes: Attrs,
}

/// `consumed` is 1 when the importer recognized the element, even if the
/// element switches its property off and contributes nothing.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PropertyImport {
    pub consumed: usize,
    pub nodes: Vec<AttrContribution>,
}

impl PropertyImport {
    fn skip() -> Self {
        Self::default()
    }

    fn off() -> Self {
        Self {
            consumed: 1,
            nodes: Vec::new(),
        }
    }

    fn contribute(xml_name: &'static str, target: MarkTarget, attributes: Attrs) -> Self {
        Self {
            consumed: 1,
            nodes: vec![AttrContribution {
                xml_name,
                target,
                attributes,
            }],
        }
    }
}

pub type PropertyImporter = fn(&[Element]) -> PropertyImport;

#[derive(Clone, Copy)]
pub struct PropertyImporterEntity {
    pub xml_name: &'static str,
    pub importer: PropertyImporter,
}

pub const PROPERTY_IMPORTERS: &[PropertyImporterEntity] = &[
    PropertyImporterEntity { xml_name: "w:b", importer: bold_importer },
    PropertyImporterEntity { xml_name: "w:i", importer: italic_importer },
    PropertyImporterEntity { xml_name: "w:u", importer: underline_importer },
    PropertyImporterEntity { xml_name: "w:strike", importer: strike_importer },
    PropertyImporterEntity { xml_name: "w:dstrike", importer: double_strike_importer },
    PropertyImporterEntity { xml_name: "w:highlight", importer: highlight_importer },
    PropertyImporterEntity { xml_name: "w:color", importer: color_importer },
    PropertyImporterEntity { xml_name: "w:sz", importer: font_size_importer },
    PropertyImporterEntity { xml_name: "w:szCs", importer: font_size_cs_importer },
    PropertyImporterEntity { xml_name: "w:rFonts", importer: font_family_importer },
    PropertyImporterEntity { xml_name: "w:rStyle", importer: style_id_importer },
    PropertyImporterEntity { xml_name: "w:vertAlign", importer: vert_align_importer },
    PropertyImporterEntity { xml_name: "w:caps", importer: caps_importer },
    PropertyImporterEntity { xml_name: "w:spacing", importer: letter_spacing_importer },
];

fn first_named<'a>(nodes: &'a [Element], name: &str) -> Option<&'a Element> {
    nodes.first().filter(|n| n.is(name))
}

fn toggle_mark(nodes: &[Element], xml_name: &'static str, kind: MarkType) -> PropertyImport {
    let Some(node) = first_named(nodes, xml_name) else {
        return PropertyImport::skip();
    };
    if toggle_value(node.val()) {
        PropertyImport::contribute(xml_name, MarkTarget::Mark(kind), Attrs::new())
    } else {
        PropertyImport::off()
    }
}

fn one_attr(key: &str, value: impl Into<Value>) -> Attrs {
    let mut attrs = Attrs::new();
    attrs.insert(key.to_string(), value.into());
    attrs
}

pub fn bold_importer(nodes: &[Element]) -> PropertyImport {
    toggle_mark(nodes, "w:b", MarkType::Bold)
}

pub fn italic_importer(nodes: &[Element]) -> PropertyImport {
    toggle_mark(nodes, "w:i", MarkType::Italic)
}

pub fn strike_importer(nodes: &[Element]) -> PropertyImport {
    toggle_mark(nodes, "w:strike", MarkType::Strike)
}

pub fn double_strike_importer(nodes: &[Element]) -> PropertyImport {
    toggle_mark(nodes, "w:dstrike", MarkType::Strike)
}

/// `w:u` names a line style, so a bare element carries `underlineType: none`
/// instead of switching on a default underline.
pub fn underline_importer(nodes: &[Element]) -> PropertyImport {
    let Some(node) = first_named(nodes, "w:u") else {
        return PropertyImport::skip();
    };
    let underline_type = match node.val() {
        None => "none",
        Some(v) if v.eq_ignore_ascii_case("none") || !toggle_value(Some(v)) => {
            return PropertyImport::off();
        }
        Some(v) => v,
    };
    let mut attrs = one_attr("underlineType", underline_type);
    if let Some(color) = node.attr("w:color").filter(|c| is_hex_color(c)) {
        attrs.insert("underlineColor".into(), format!("#{color}").into());
    }
    PropertyImport::contribute("w:u", MarkTarget::Mark(MarkType::Underline), attrs)
}

pub fn highlight_importer(nodes: &[Element]) -> PropertyImport {
    let Some(node) = first_named(nodes, "w:highlight") else {
        return PropertyImport::skip();
    };
    let color = match node.val() {
        None | Some("none") => return PropertyImport::off(),
        Some(name) => highlight_color(name)
            .map(str::to_string)
            .or_else(|| is_hex_color(name).then(|| format!("#{name}"))),
    };
    match color {
        Some(color) => PropertyImport::contribute(
            "w:highlight",
            MarkTarget::Mark(MarkType::Highlight),
            one_attr("color", color),
        ),
        None => PropertyImport::off(),
    }
}

/// Emits `color` for hex values and `themeColor` when the run points into
/// the theme; [`compose_marks`] settles which one survives.
pub fn color_importer(nodes: &[Element]) -> PropertyImport {
    let Some(node) = first_named(nodes, "w:color") else {
        return PropertyImport::skip();
    };
    let mut attrs = Attrs::new();
    if let Some(val) = node.val().filter(|v| is_hex_color(v)) {
        attrs.insert("color".into(), format!("#{}", val.to_ascii_uppercase()).into());
    }
    if let Some(theme) = node.attr("w:themeColor") {
        attrs.insert("themeColor".into(), theme.into());
    }
    if attrs.is_empty() {
        return PropertyImport::off();
    }
    PropertyImport::contribute("w:color", MarkTarget::TextStyle("color"), attrs)
}

fn half_points(node: &Element) -> Option<f64> {
    node.val().and_then(parse_number).map(|hp| round2(hp / 2.0))
}

fn font_size(nodes: &[Element], xml_name: &'static str) -> PropertyImport {
    let Some(node) = first_named(nodes, xml_name) else {
        return PropertyImport::skip();
    };
    match half_points(node) {
        Some(pt) => PropertyImport::contribute(
            xml_name,
            MarkTarget::TextStyle("fontSize"),
            one_attr("fontSize", format!("{pt}pt")),
        ),
        None => PropertyImport::off(),
    }
}

pub fn font_size_importer(nodes: &[Element]) -> PropertyImport {
    font_size(nodes, "w:sz")
}

/// Complex-script size; only used when no `w:sz` applies.
pub fn font_size_cs_importer(nodes: &[Element]) -> PropertyImport {
    font_size(nodes, "w:szCs")
}

const FONT_SLOTS: &[(&str, &str)] = &[
    ("w:ascii", "w:asciiTheme"),
    ("w:hAnsi", "w:hAnsiTheme"),
    ("w:eastAsia", "w:eastAsiaTheme"),
    ("w:cs", "w:cstheme"),
];

pub fn font_family_importer(nodes: &[Element]) -> PropertyImport {
    let Some(node) = first_named(nodes, "w:rFonts") else {
        return PropertyImport::skip();
    };
    // first slot with either a name or a theme reference decides
    let slot = FONT_SLOTS.iter().find_map(|(name, theme)| {
        node.attr(name)
            .map(|family| ("fontFamily", family))
            .or_else(|| node.attr(theme).map(|reference| ("fontTheme", reference)))
    });
    match slot {
        Some((key, value)) => PropertyImport::contribute(
            "w:rFonts",
            MarkTarget::TextStyle("fontFamily"),
            one_attr(key, value),
        ),
        None => PropertyImport::off(),
    }
}

pub fn style_id_importer(nodes: &[Element]) -> PropertyImport {
    let Some(node) = first_named(nodes, "w:rStyle") else {
        return PropertyImport::skip();
    };
    match node.val() {
        Some(id) => PropertyImport::contribute(
            "w:rStyle",
            MarkTarget::TextStyle("styleId"),
            one_attr("styleId", id),
        ),
        None => PropertyImport::off(),
    }
}

pub fn vert_align_importer(nodes: &[Element]) -> PropertyImport {
    let Some(node) = first_named(nodes, "w:vertAlign") else {
        return PropertyImport::skip();
    };
    match node.val() {
        Some(v @ ("superscript" | "subscript")) => PropertyImport::contribute(
            "w:vertAlign",
            MarkTarget::TextStyle("vertAlign"),
            one_attr("vertAlign", v),
        ),
        _ => PropertyImport::off(),
    }
}

pub fn caps_importer(nodes: &[Element]) -> PropertyImport {
    let Some(node) = first_named(nodes, "w:caps") else {
        return PropertyImport::skip();
    };
    if toggle_value(node.val()) {
        PropertyImport::contribute(
            "w:caps",
            MarkTarget::TextStyle("textTransform"),
            one_attr("textTransform", "uppercase"),
        )
    } else {
        PropertyImport::off()
    }
}

/// Run-level `w:spacing` is character spacing in twips.
pub fn letter_spacing_importer(nodes: &[Element]) -> PropertyImport {
    let Some(node) = first_named(nodes, "w:spacing") else {
        return PropertyImport::skip();
    };
    match node.val().and_then(parse_number) {
        Some(twips) if twips != 0.0 => PropertyImport::contribute(
            "w:spacing",
            MarkTarget::TextStyle("letterSpacing"),
            one_attr("letterSpacing", format!("{}pt", round2(twips / 20.0))),
        ),
        _ => PropertyImport::off(),
    }
}

/// Run every importer over one property element.
pub fn import_property(element: &Element) -> PropertyImport {
    let nodes = std::slice::from_ref(element);
    PROPERTY_IMPORTERS
        .iter()
        .filter(|e| e.xml_name == element.name)
        .map(|e| (e.importer)(nodes))
        .find(|r| r.consumed > 0)
        .unwrap_or_default()
}

/// Marks for a run. `context` is ordered from lowest to highest precedence
/// (document defaults, paragraph style, run style); `properties` is the
/// direct `rPr` and wins over all of them.
pub fn compose_marks(
    properties: Option<&Element>,
    context: &[&PropertyBag],
    theme: &Theme,
) -> Vec<Mark> {
    let mut bag = PropertyBag::merged(context);
    if let Some(rpr) = properties {
        bag.overlay(&PropertyBag::from_run_properties(rpr));
    }
    marks_from_bag(&bag, theme)
}

pub fn marks_from_bag(bag: &PropertyBag, theme: &Theme) -> Vec<Mark> {
    let has_size = bag.contains(PropertyKey::Size);
    let mut marks = Vec::new();
    let mut text_style = Attrs::new();

    for element in bag.to_elements() {
        if has_size && element.is("w:szCs") {
            continue;
        }
        for contribution in import_property(&element).nodes {
            match contribution.target {
                MarkTarget::Mark(kind) => marks.push(Mark {
                    kind,
                    attrs: contribution.attributes,
                }),
                MarkTarget::TextStyle(_) => text_style.extend(contribution.attributes),
            }
        }
    }

    resolve_theme_references(&mut text_style, theme);
    if !text_style.is_empty() {
        marks.push(Mark {
            kind: MarkType::TextStyle,
            attrs: text_style,
        });
    }
    normalize_marks(marks)
}

fn resolve_theme_references(text_style: &mut Attrs, theme: &Theme) {
    if let Some(Value::String(name)) = text_style.remove("themeColor")
        && let Some(hex) = theme.color(&name)
    {
        text_style.insert("color".into(), format!("#{}", hex.to_ascii_uppercase()).into());
    }
    if let Some(Value::String(reference)) = text_style.remove("fontTheme") {
        match theme.font(&reference) {
            Some(face) => {
                text_style.insert("fontFamily".into(), face.into());
            }
            None => log::debug!("Theme font {reference} not found"),
        }
    }
}
