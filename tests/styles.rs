mod common;

use common::{element, styles_xml, w};
use docxide_pm::docx::styles::{PropertyBag, PropertyKey, StyleKind, StyleRegistry};
use pretty_assertions::assert_eq;

fn registry() -> StyleRegistry {
    let styles = element(&styles_xml(concat!(
        r#"<w:docDefaults>"#,
        r#"<w:rPrDefault><w:rPr><w:sz w:val="22"/><w:rFonts w:ascii="Calibri"/></w:rPr></w:rPrDefault>"#,
        r#"<w:pPrDefault><w:pPr><w:spacing w:after="160" w:line="259" w:lineRule="auto"/></w:pPr></w:pPrDefault>"#,
        r#"</w:docDefaults>"#,
        r#"<w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/></w:style>"#,
        r#"<w:style w:type="paragraph" w:styleId="Base"><w:pPr><w:spacing w:before="240"/>"#,
        r#"<w:ind w:firstLine="720"/></w:pPr><w:rPr><w:b/><w:color w:val="FF0000"/></w:rPr></w:style>"#,
        r#"<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/>"#,
        r#"<w:basedOn w:val="Base"/><w:pPr><w:ind w:hanging="360"/></w:pPr>"#,
        r#"<w:rPr><w:rFonts w:ascii="Arial"/><w:sz w:val="32"/></w:rPr></w:style>"#,
        r#"<w:style w:type="character" w:styleId="Code"><w:rPr><w:rFonts w:ascii="Courier New"/></w:rPr></w:style>"#,
        r#"<w:style w:type="paragraph" w:styleId="LoopA"><w:basedOn w:val="LoopB"/><w:rPr><w:i/></w:rPr></w:style>"#,
        r#"<w:style w:type="paragraph" w:styleId="LoopB"><w:basedOn w:val="LoopA"/><w:rPr><w:b/></w:rPr></w:style>"#,
        r#"<w:style w:type="paragraph" w:styleId="Self"><w:basedOn w:val="Self"/><w:rPr><w:strike/></w:rPr></w:style>"#,
        r#"<w:style w:type="paragraph" w:styleId="Orphan"><w:basedOn w:val="Missing"/><w:rPr><w:caps/></w:rPr></w:style>"#,
    )));
    StyleRegistry::from_parts(Some(&styles), None)
}

#[test]
fn indexes_definitions_and_the_default_style() {
    let registry = registry();
    assert_eq!(registry.len(), 8);
    assert_eq!(registry.default_paragraph_style(), Some("Normal"));

    let heading = registry.definition("Heading1").expect("Heading1 indexed");
    assert_eq!(heading.kind, StyleKind::Paragraph);
    assert_eq!(heading.name.as_deref(), Some("heading 1"));
    assert_eq!(heading.based_on.as_deref(), Some("Base"));
    assert_eq!(registry.definition("Code").map(|d| d.kind), Some(StyleKind::Character));

    let defaults = registry.defaults();
    assert_eq!(defaults.run.val(PropertyKey::Size), Some("22"));
    assert_eq!(defaults.paragraph.attr(PropertyKey::ParagraphSpacing, "w:after"), Some("160"));
}

#[test]
fn based_on_chain_merges_closest_last() {
    let resolved = registry().resolve("Heading1");
    assert!(resolved.run.contains(PropertyKey::Bold));
    assert_eq!(resolved.run.val(PropertyKey::Color), Some("FF0000"));
    assert_eq!(resolved.run.attr(PropertyKey::Fonts, "w:ascii"), Some("Arial"));
    assert_eq!(resolved.run.val(PropertyKey::Size), Some("32"));

    assert_eq!(resolved.paragraph.attr(PropertyKey::ParagraphSpacing, "w:before"), Some("240"));
    // hanging replaces the inherited firstLine
    assert_eq!(resolved.paragraph.attr(PropertyKey::Indentation, "w:hanging"), Some("360"));
    assert_eq!(resolved.paragraph.attr(PropertyKey::Indentation, "w:firstLine"), None);
}

#[test]
fn resolution_is_idempotent() {
    let registry = registry();
    for id in ["Heading1", "LoopA", "Self", "Code"] {
        let first = registry.resolve(id);
        let second = registry.resolve(id);
        assert_eq!(first, second, "{id}");
    }
}

#[test]
fn cycles_terminate() {
    let registry = registry();

    let own = registry.resolve("Self");
    assert!(own.run.contains(PropertyKey::Strike));
    assert_eq!(own.run.len(), 1);

    let loop_a = registry.resolve("LoopA");
    assert!(loop_a.run.contains(PropertyKey::Italic));
    assert!(loop_a.run.contains(PropertyKey::Bold));
}

#[test]
fn missing_styles_resolve_empty() {
    let registry = registry();
    let missing = registry.resolve("DoesNotExist");
    assert!(missing.run.is_empty());
    assert!(missing.paragraph.is_empty());

    let orphan = registry.resolve("Orphan");
    assert!(orphan.run.contains(PropertyKey::Caps));
    assert_eq!(orphan.run.len(), 1);
}

#[test]
fn registry_without_styles_part_is_empty() {
    let registry = StyleRegistry::from_parts(None, None);
    assert!(registry.is_empty());
    assert!(registry.defaults().run.is_empty());
    assert_eq!(registry.default_paragraph_style(), None);
}

#[test]
fn overlay_replaces_whole_toggle_but_merges_attribute_keys() {
    let mut base = PropertyBag::from_run_properties(&w(
        r#"<w:rPr><w:u w:val="double" w:color="FF0000"/><w:rFonts w:ascii="Arial" w:eastAsia="SimSun"/></w:rPr>"#,
    ));
    let top = PropertyBag::from_run_properties(&w(
        r#"<w:rPr><w:u w:val="single"/><w:rFonts w:asciiTheme="minorHAnsi"/></w:rPr>"#,
    ));
    base.overlay(&top);

    assert_eq!(base.val(PropertyKey::Underline), Some("single"));
    assert_eq!(base.attr(PropertyKey::Underline, "w:color"), None);
    assert_eq!(base.attr(PropertyKey::Fonts, "w:ascii"), None);
    assert_eq!(base.attr(PropertyKey::Fonts, "w:asciiTheme"), Some("minorHAnsi"));
    assert_eq!(base.attr(PropertyKey::Fonts, "w:eastAsia"), Some("SimSun"));
}

#[test]
fn numbering_properties_flatten_into_the_bag() {
    let bag = PropertyBag::from_paragraph_properties(&w(
        r#"<w:pPr><w:pStyle w:val="ListParagraph"/><w:numPr><w:ilvl w:val="1"/><w:numId w:val="4"/></w:numPr></w:pPr>"#,
    ));
    assert_eq!(bag.val(PropertyKey::ParagraphStyle), Some("ListParagraph"));
    assert_eq!(bag.attr(PropertyKey::Numbering, "w:numId"), Some("4"));
    assert_eq!(bag.attr(PropertyKey::Numbering, "w:ilvl"), Some("1"));
}

#[test]
fn unknown_properties_stay_out_of_the_bag() {
    let bag = PropertyBag::from_run_properties(&w(
        r#"<w:rPr><w:b/><w:emboss/><w:lang w:val="en-US"/></w:rPr>"#,
    ));
    assert_eq!(bag.len(), 1);
    assert_eq!(bag.to_elements().first().map(|e| e.name.as_str()), Some("w:b"));
}
