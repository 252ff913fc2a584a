mod common;

use common::{element, package, styles_xml, w};
use docxide_pm::docx::marks::{
    self, AttrContribution, MarkTarget, compose_marks, import_property,
};
use docxide_pm::docx::styles::{PropertyBag, Theme};
use docxide_pm::docx::toggle_value;
use docxide_pm::model::Attrs;
use docxide_pm::{Mark, MarkType, NodeType};
use pretty_assertions::assert_eq;
use serde_json::json;

fn marks_for(rpr: &str) -> Vec<Mark> {
    let rpr = w(&format!("<w:rPr>{rpr}</w:rPr>"));
    compose_marks(Some(&rpr), &[], &Theme::default())
}

fn text_style(marks: &[Mark]) -> serde_json::Value {
    marks
        .iter()
        .find(|m| m.kind == MarkType::TextStyle)
        .map(|m| serde_json::Value::Object(m.attrs.clone()))
        .unwrap_or(serde_json::Value::Null)
}

#[test]
fn toggle_value_truth_table() {
    assert!(toggle_value(None));
    for on in ["1", "true", "on", "TRUE", "yes-ish"] {
        assert!(toggle_value(Some(on)), "{on} should be on");
    }
    for off in ["0", "false", "off", "False", "OFF", " 0 "] {
        assert!(!toggle_value(Some(off)), "{off} should be off");
    }
}

#[test]
fn bold_importer_contract() {
    let result = marks::bold_importer(&[w("<w:b/>")]);
    assert_eq!(result.consumed, 1);
    assert_eq!(
        result.nodes,
        vec![AttrContribution {
            xml_name: "w:b",
            target: MarkTarget::Mark(MarkType::Bold),
            attributes: Attrs::new(),
        }]
    );

    let off = marks::bold_importer(&[w(r#"<w:b w:val="0"/>"#)]);
    assert_eq!(off.consumed, 1);
    assert!(off.nodes.is_empty());

    assert_eq!(marks::bold_importer(&[w("<w:i/>")]).consumed, 0);
    assert_eq!(marks::bold_importer(&[]).consumed, 0);
}

#[test]
fn importers_only_claim_their_own_element() {
    let sz = w(r#"<w:sz w:val="24"/>"#);
    assert_eq!(marks::italic_importer(std::slice::from_ref(&sz)).consumed, 0);
    assert_eq!(marks::font_size_importer(std::slice::from_ref(&sz)).consumed, 1);

    let unknown = w(r#"<w:emboss/>"#);
    assert_eq!(import_property(&unknown).consumed, 0);
}

#[test]
fn toggles_follow_their_values() {
    assert_eq!(marks_for("<w:b/><w:i/>"), vec![
        Mark::new(MarkType::Bold),
        Mark::new(MarkType::Italic),
    ]);
    assert!(marks_for(r#"<w:b w:val="false"/>"#).is_empty());
    assert_eq!(marks_for(r#"<w:strike w:val="1"/>"#), vec![Mark::new(MarkType::Strike)]);
    assert_eq!(marks_for("<w:dstrike/>"), vec![Mark::new(MarkType::Strike)]);
}

#[test]
fn bare_underline_has_type_none() {
    let marks = marks_for("<w:u/>");
    assert_eq!(marks, vec![Mark::new(MarkType::Underline).with_attr("underlineType", "none")]);
}

#[test]
fn underline_none_switches_an_inherited_underline_off() {
    assert!(marks_for(r#"<w:u w:val="none"/>"#).is_empty());

    let style = PropertyBag::from_run_properties(&w(r#"<w:rPr><w:u w:val="single"/><w:b/></w:rPr>"#));
    let rpr = w(r#"<w:rPr><w:u w:val="none"/></w:rPr>"#);
    let marks = compose_marks(Some(&rpr), &[&style], &Theme::default());
    assert_eq!(marks, vec![Mark::new(MarkType::Bold)]);
}

#[test]
fn underline_with_style_and_color() {
    let marks = marks_for(r#"<w:u w:val="double" w:color="00FF00"/>"#);
    assert_eq!(
        marks,
        vec![Mark::new(MarkType::Underline)
            .with_attr("underlineType", "double")
            .with_attr("underlineColor", "#00FF00")]
    );
    assert!(marks_for(r#"<w:u w:val="0"/>"#).is_empty());
}

#[test]
fn highlight_names_map_to_hex() {
    assert_eq!(
        marks_for(r#"<w:highlight w:val="yellow"/>"#),
        vec![Mark::new(MarkType::Highlight).with_attr("color", "#FFFF00")]
    );
    assert!(marks_for(r#"<w:highlight w:val="none"/>"#).is_empty());
}

#[test]
fn text_style_collects_every_contribution() {
    let marks = marks_for(concat!(
        r#"<w:rStyle w:val="Emphasis"/>"#,
        r#"<w:rFonts w:ascii="Georgia" w:hAnsi="Georgia"/>"#,
        r#"<w:color w:val="ff0000"/>"#,
        r#"<w:sz w:val="28"/>"#,
        r#"<w:szCs w:val="40"/>"#,
        r#"<w:vertAlign w:val="superscript"/>"#,
        r#"<w:caps/>"#,
        r#"<w:spacing w:val="40"/>"#,
    ));
    assert_eq!(marks.len(), 1);
    assert_eq!(
        text_style(&marks),
        json!({
            "styleId": "Emphasis",
            "fontFamily": "Georgia",
            "color": "#FF0000",
            "fontSize": "14pt",
            "vertAlign": "superscript",
            "textTransform": "uppercase",
            "letterSpacing": "2pt",
        })
    );
}

#[test]
fn complex_script_size_only_without_sz() {
    let marks = marks_for(r#"<w:szCs w:val="21"/>"#);
    assert_eq!(text_style(&marks), json!({ "fontSize": "10.5pt" }));
}

#[test]
fn baseline_vert_align_adds_nothing() {
    assert!(marks_for(r#"<w:vertAlign w:val="baseline"/>"#).is_empty());
}

#[test]
fn direct_off_beats_style_on() {
    let style = PropertyBag::from_run_properties(&w("<w:rPr><w:b/><w:i/></w:rPr>"));
    let rpr = w(r#"<w:rPr><w:b w:val="0"/></w:rPr>"#);
    let marks = compose_marks(Some(&rpr), &[&style], &Theme::default());
    assert_eq!(marks, vec![Mark::new(MarkType::Italic)]);
}

#[test]
fn later_layers_win() {
    let defaults = PropertyBag::from_run_properties(&w(
        r#"<w:rPr><w:sz w:val="22"/><w:rFonts w:ascii="Calibri"/></w:rPr>"#,
    ));
    let paragraph = PropertyBag::from_run_properties(&w(
        r#"<w:rPr><w:sz w:val="32"/><w:color w:val="111111"/></w:rPr>"#,
    ));
    let run = PropertyBag::from_run_properties(&w(r#"<w:rPr><w:color w:val="222222"/></w:rPr>"#));
    let marks = compose_marks(None, &[&defaults, &paragraph, &run], &Theme::default());
    assert_eq!(
        text_style(&marks),
        json!({ "fontFamily": "Calibri", "fontSize": "16pt", "color": "#222222" })
    );
}

#[test]
fn marks_come_out_in_canonical_order() {
    let marks = marks_for(r#"<w:color w:val="0000FF"/><w:i/><w:u w:val="single"/><w:b/>"#);
    let kinds: Vec<MarkType> = marks.iter().map(|m| m.kind).collect();
    assert_eq!(
        kinds,
        vec![MarkType::Bold, MarkType::Italic, MarkType::Underline, MarkType::TextStyle]
    );
}

fn theme() -> Theme {
    let theme = element(
        r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office">
            <a:themeElements>
                <a:clrScheme name="Office">
                    <a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1>
                    <a:accent1><a:srgbClr val="4472C4"/></a:accent1>
                </a:clrScheme>
                <a:fontScheme name="Office">
                    <a:majorFont><a:latin typeface="Calibri Light"/></a:majorFont>
                    <a:minorFont><a:latin typeface="Calibri"/></a:minorFont>
                </a:fontScheme>
            </a:themeElements>
        </a:theme>"#,
    );
    Theme::from_part(Some(&theme))
}

#[test]
fn theme_references_resolve_through_the_theme() {
    let rpr = w(concat!(
        r#"<w:rPr><w:rFonts w:asciiTheme="majorHAnsi" w:hAnsiTheme="majorHAnsi"/>"#,
        r#"<w:color w:val="000000" w:themeColor="accent1"/></w:rPr>"#,
    ));
    let marks = compose_marks(Some(&rpr), &[], &theme());
    assert_eq!(
        text_style(&marks),
        json!({ "fontFamily": "Calibri Light", "color": "#4472C4" })
    );
}

#[test]
fn explicit_font_replaces_inherited_theme_font() {
    let style = PropertyBag::from_run_properties(&w(
        r#"<w:rPr><w:rFonts w:asciiTheme="minorHAnsi"/></w:rPr>"#,
    ));
    let rpr = w(r#"<w:rPr><w:rFonts w:ascii="Consolas"/></w:rPr>"#);
    let marks = compose_marks(Some(&rpr), &[&style], &theme());
    assert_eq!(text_style(&marks), json!({ "fontFamily": "Consolas" }));
}

#[test]
fn theme_font_of_a_later_layer_beats_an_earlier_east_asian_font() {
    let defaults = PropertyBag::from_run_properties(&w(
        r#"<w:rPr><w:rFonts w:eastAsia="SimSun"/></w:rPr>"#,
    ));
    let heading = PropertyBag::from_run_properties(&w(
        r#"<w:rPr><w:rFonts w:asciiTheme="majorHAnsi" w:hAnsiTheme="majorHAnsi"/></w:rPr>"#,
    ));
    let marks = compose_marks(None, &[&defaults, &heading], &theme());
    assert_eq!(text_style(&marks), json!({ "fontFamily": "Calibri Light" }));

    // with no Latin slot set the East Asian font still applies
    let marks = compose_marks(None, &[&defaults], &theme());
    assert_eq!(text_style(&marks), json!({ "fontFamily": "SimSun" }));
}

#[test]
fn theme_text_color_uses_dark_slot() {
    let rpr = w(r#"<w:rPr><w:color w:themeColor="text1"/></w:rPr>"#);
    let marks = compose_marks(Some(&rpr), &[], &theme());
    assert_eq!(text_style(&marks), json!({ "color": "#000000" }));
}

#[test]
fn run_style_beats_paragraph_style_in_a_document() {
    let package = package(&[
        (
            "word/document.xml",
            common::document_xml(concat!(
                r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr>"#,
                r#"<w:r><w:rPr><w:rStyle w:val="Code"/></w:rPr><w:t>styled</w:t></w:r>"#,
                r#"<w:r><w:rPr><w:b w:val="0"/></w:rPr><w:t>plain</w:t></w:r></w:p>"#,
            )),
        ),
        (
            "word/styles.xml",
            styles_xml(concat!(
                r#"<w:docDefaults><w:rPrDefault><w:rPr><w:sz w:val="22"/>"#,
                r#"<w:rFonts w:ascii="Calibri"/></w:rPr></w:rPrDefault></w:docDefaults>"#,
                r#"<w:style w:type="paragraph" w:styleId="Base"><w:rPr><w:b/>"#,
                r#"<w:color w:val="FF0000"/></w:rPr></w:style>"#,
                r#"<w:style w:type="paragraph" w:styleId="Heading1"><w:basedOn w:val="Base"/>"#,
                r#"<w:rPr><w:rFonts w:ascii="Arial"/><w:sz w:val="32"/></w:rPr></w:style>"#,
                r#"<w:style w:type="character" w:styleId="Code"><w:rPr>"#,
                r#"<w:rFonts w:ascii="Courier New"/></w:rPr></w:style>"#,
            )),
        ),
    ]);
    let result = common::import(&package);
    let texts = result.pm_doc.find_all(NodeType::Text);
    assert_eq!(texts.len(), 2);

    let styled = texts[0].marks.clone().unwrap_or_default();
    assert_eq!(
        styled,
        vec![
            Mark::new(MarkType::Bold),
            Mark {
                kind: MarkType::TextStyle,
                attrs: json!({
                    "fontFamily": "Courier New",
                    "fontSize": "16pt",
                    "color": "#FF0000",
                    "styleId": "Code",
                })
                .as_object()
                .cloned()
                .unwrap_or_default(),
            },
        ]
    );

    let plain = texts[1].marks.clone().unwrap_or_default();
    assert!(!plain.iter().any(|m| m.kind == MarkType::Bold));
    assert_eq!(
        text_style(&plain),
        json!({ "fontFamily": "Arial", "fontSize": "16pt", "color": "#FF0000" })
    );

    assert_eq!(result.styles_used, vec!["Code".to_string(), "Heading1".to_string()]);
}
