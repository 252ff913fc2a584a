#![allow(dead_code)]

use std::io::{Cursor, Write};

use docxide_pm::{Element, ImportOptions, ImportResult, Node, Package};

pub const NAMESPACES: &str = concat!(
    r#"xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
    r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
    r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" "#,
    r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
    r#"xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture" "#,
    r#"xmlns:w14="http://schemas.microsoft.com/office/word/2010/wordml" "#,
    r#"xmlns:w15="http://schemas.microsoft.com/office/word/2012/wordml" "#,
    r#"xmlns:custom="urn:docxide:custom""#,
);

const RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
pub const IMAGE_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
pub const HYPERLINK_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
pub const HEADER_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/header";

/// Wrap `inner` in a root element that declares every prefix the tests use.
pub fn part(root: &str, inner: &str) -> String {
    format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><{root} {NAMESPACES}>{inner}</{root}>"#)
}

pub fn document_xml(body: &str) -> String {
    part("w:document", &format!("<w:body>{body}</w:body>"))
}

pub fn styles_xml(inner: &str) -> String {
    part("w:styles", inner)
}

pub fn numbering_xml(inner: &str) -> String {
    part("w:numbering", inner)
}

pub fn comments_xml(inner: &str) -> String {
    part("w:comments", inner)
}

/// `(id, type, target, external)`
pub fn rels_xml(rels: &[(&str, &str, &str, bool)]) -> String {
    let mut out = format!(r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="{RELS_NS}">"#);
    for (id, kind, target, external) in rels {
        let mode = if *external { r#" TargetMode="External""# } else { "" };
        out.push_str(&format!(
            r#"<Relationship Id="{id}" Type="{kind}" Target="{target}"{mode}/>"#
        ));
    }
    out.push_str("</Relationships>");
    out
}

pub fn element(xml: &str) -> Element {
    Element::parse(xml).expect("test XML parses")
}

/// Element from a fragment that uses the `w:` prefix.
pub fn w(fragment: &str) -> Element {
    let wrapped = part("w:root", fragment);
    element(&wrapped).elements.remove(0)
}

pub fn package(parts: &[(&str, String)]) -> Package {
    let mut package = Package::new();
    for (path, xml) in parts {
        package.insert_xml(path, xml).expect("test part parses");
    }
    package
}

pub fn package_with_body(body: &str) -> Package {
    package(&[("word/document.xml", document_xml(body))])
}

pub fn import(package: &Package) -> ImportResult {
    docxide_pm::create_document_json(package).expect("import succeeds")
}

pub fn import_with(package: &Package, options: ImportOptions) -> ImportResult {
    docxide_pm::create_document_json_with(package, options).expect("import succeeds")
}

pub fn import_body(body: &str) -> Vec<Node> {
    let result = import(&package_with_body(body));
    result.pm_doc.content.unwrap_or_default()
}

/// Zip `parts` into an in-memory .docx.
pub fn docx_bytes(parts: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (name, data) in parts {
        writer.start_file(*name, options).expect("start zip entry");
        writer.write_all(data).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
