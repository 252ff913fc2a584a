mod common;

use common::import_body;
use docxide_pm::{Node, NodeType};
use pretty_assertions::assert_eq;
use serde_json::json;

const TABLE: &str = concat!(
    r#"<w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/><w:tblW w:w="3000" w:type="dxa"/></w:tblPr>"#,
    r#"<w:tblGrid><w:gridCol w:w="1500"/><w:gridCol w:w="1500"/></w:tblGrid>"#,
    r#"<w:tr><w:trPr><w:tblHeader/><w:trHeight w:val="450"/></w:trPr>"#,
    r#"<w:tc><w:tcPr><w:gridSpan w:val="2"/></w:tcPr><w:p><w:r><w:t>Header</w:t></w:r></w:p></w:tc></w:tr>"#,
    r#"<w:tr><w:tc><w:tcPr><w:vMerge w:val="restart"/><w:shd w:val="clear" w:fill="FFFF00"/></w:tcPr>"#,
    r#"<w:p><w:r><w:t>Tall</w:t></w:r></w:p></w:tc>"#,
    r#"<w:tc><w:p><w:r><w:t>B1</w:t></w:r></w:p></w:tc></w:tr>"#,
    r#"<w:tr><w:tc><w:tcPr><w:vMerge/></w:tcPr><w:p/></w:tc>"#,
    r#"<w:tc><w:tcPr><w:vAlign w:val="center"/></w:tcPr></w:tc></w:tr>"#,
    r#"</w:tbl>"#,
);

fn table() -> Node {
    let blocks = import_body(TABLE);
    assert_eq!(blocks.len(), 1);
    blocks.into_iter().next().unwrap_or_else(|| Node::leaf(NodeType::Table))
}

#[test]
fn table_attributes() {
    let table = table();
    assert_eq!(table.kind, NodeType::Table);
    assert_eq!(table.attr_str("tableStyleId"), Some("TableGrid"));
    assert_eq!(table.attr("grid"), Some(&json!([100.0, 100.0])));
    assert_eq!(table.attr("tableWidth"), Some(&json!({ "width": 200.0, "type": "dxa" })));
    assert_eq!(table.children().len(), 3);
}

#[test]
fn header_row_and_height() {
    let table = table();
    let header = &table.children()[0];
    assert_eq!(header.kind, NodeType::TableRow);
    assert_eq!(header.attr("tableHeader"), Some(&json!(true)));
    assert_eq!(header.attr("rowHeight"), Some(&json!(30.0)));
    assert_eq!(table.children()[1].attr("tableHeader"), None);
}

#[test]
fn grid_span_becomes_colspan() {
    let table = table();
    let cell = &table.children()[0].children()[0];
    assert_eq!(cell.attr("colspan"), Some(&json!(2)));
    assert_eq!(cell.attr("rowspan"), Some(&json!(1)));
    assert_eq!(cell.attr("colwidth"), Some(&json!([100.0, 100.0])));
    assert_eq!(cell.text_content(), "Header");
}

#[test]
fn vertical_merge_becomes_rowspan() {
    let table = table();
    let second = table.children()[1].children();
    assert_eq!(second.len(), 2);
    assert_eq!(second[0].attr("rowspan"), Some(&json!(2)));
    assert_eq!(second[0].attr("background"), Some(&json!({ "color": "#FFFF00" })));
    assert_eq!(second[1].attr("rowspan"), Some(&json!(1)));

    // the continuation cell is absorbed by the merge
    let third = table.children()[2].children();
    assert_eq!(third.len(), 1);
    assert_eq!(third[0].attr("colwidth"), Some(&json!([100.0])));
    assert_eq!(third[0].attr_str("verticalAlign"), Some("center"));
}

#[test]
fn empty_cell_gets_an_empty_paragraph() {
    let table = table();
    let cell = &table.children()[2].children()[0];
    let content = serde_json::to_value(cell.children()).expect("serializes");
    assert_eq!(content, json!([{ "type": "paragraph", "content": [] }]));
}

#[test]
fn table_style_is_recorded() {
    let result = common::import(&common::package_with_body(TABLE));
    assert_eq!(result.styles_used, vec!["TableGrid".to_string()]);
}

#[test]
fn grid_before_shifts_columns() {
    let body = concat!(
        r#"<w:tbl><w:tblGrid><w:gridCol w:w="300"/><w:gridCol w:w="600"/><w:gridCol w:w="900"/></w:tblGrid>"#,
        r#"<w:tr><w:trPr><w:gridBefore w:val="1"/></w:trPr>"#,
        r#"<w:tc><w:p/></w:tc><w:tc><w:p/></w:tc></w:tr></w:tbl>"#,
    );
    let blocks = import_body(body);
    let cells = blocks[0].children()[0].children();
    assert_eq!(cells[0].attr("colwidth"), Some(&json!([40.0])));
    assert_eq!(cells[1].attr("colwidth"), Some(&json!([60.0])));
}

#[test]
fn rows_inside_content_controls_are_kept() {
    let body = concat!(
        r#"<w:tbl><w:sdt><w:sdtContent><w:tr><w:tc><w:p><w:r><w:t>wrapped</w:t></w:r></w:p></w:tc></w:tr>"#,
        r#"</w:sdtContent></w:sdt></w:tbl>"#,
    );
    let blocks = import_body(body);
    assert_eq!(blocks[0].children().len(), 1);
    assert_eq!(blocks[0].text_content(), "wrapped");
}

#[test]
fn nested_tables_stay_in_their_cell() {
    let body = format!(r#"<w:tbl><w:tr><w:tc>{TABLE}<w:p/></w:tc></w:tr></w:tbl>"#);
    let blocks = import_body(&body);
    let cell = &blocks[0].children()[0].children()[0];
    let kinds: Vec<NodeType> = cell.children().iter().map(|n| n.kind).collect();
    assert_eq!(kinds, vec![NodeType::Table, NodeType::Paragraph]);
}

#[test]
fn oversized_spans_fall_back_to_cell_width() {
    let body = concat!(
        r#"<w:tbl><w:tblGrid><w:gridCol w:w="300"/></w:tblGrid>"#,
        r#"<w:tr><w:trPr><w:gridBefore w:val="18446744073709551615"/></w:trPr>"#,
        r#"<w:tc><w:tcPr><w:gridSpan w:val="18446744073709551615"/><w:tcW w:w="600" w:type="dxa"/></w:tcPr><w:p/></w:tc>"#,
        r#"<w:tc><w:p/></w:tc></w:tr></w:tbl>"#,
    );
    let blocks = import_body(body);
    let cells = blocks[0].children()[0].children();
    assert_eq!(cells.len(), 2);
    assert_eq!(cells[0].attr("colwidth"), Some(&json!([40.0])));
    assert_eq!(cells[1].attr("colwidth"), None);
}
