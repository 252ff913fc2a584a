use serde_json::json;

use super::dispatch::{HandlerOutput, HandlerParams, ImportState, block_content};
use super::{is_hex_color, toggle_child, twips_attr};
use crate::element::Element;
use crate::model::{Node, NodeType};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum VMerge {
    None,
    Restart,
    Continue,
}

struct CellSlot<'a> {
    cell: &'a Element,
    column: usize,
    span: usize,
    vmerge: VMerge,
}

/// Children of `container` matching `name`, looking through content
/// controls and custom XML wrappers.
fn unwrap_children<'a>(container: &'a Element, name: &str, out: &mut Vec<&'a Element>) {
    for child in &container.elements {
        if child.is(name) {
            out.push(child);
        } else if child.is("w:sdt") {
            if let Some(content) = child.child("w:sdtContent") {
                unwrap_children(content, name, out);
            }
        } else if child.is("w:customXml") {
            unwrap_children(child, name, out);
        }
    }
}

fn layout_row(row: &Element) -> Vec<CellSlot<'_>> {
    let mut cells = Vec::new();
    unwrap_children(row, "w:tc", &mut cells);

    let mut column = row
        .child("w:trPr")
        .and_then(|p| p.child_val("w:gridBefore"))
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);

    cells
        .into_iter()
        .map(|cell| {
            let tcpr = cell.child("w:tcPr");
            let span = tcpr
                .and_then(|p| p.child_val("w:gridSpan"))
                .and_then(|v| v.parse::<usize>().ok())
                .filter(|s| *s > 0)
                .unwrap_or(1);
            let vmerge = match tcpr.and_then(|p| p.child("w:vMerge")) {
                None => VMerge::None,
                Some(vm) if vm.val() == Some("restart") => VMerge::Restart,
                Some(_) => VMerge::Continue,
            };
            let slot = CellSlot {
                cell,
                column,
                span,
                vmerge,
            };
            column = column.saturating_add(span);
            slot
        })
        .collect()
}

pub(crate) fn handle_table(params: &HandlerParams<'_>, state: &mut ImportState) -> HandlerOutput {
    let Some(tbl) = params.first_named("w:tbl") else {
        return HandlerOutput::skip();
    };
    HandlerOutput::one(table_node(tbl, params, state))
}

fn table_node(tbl: &Element, params: &HandlerParams<'_>, state: &mut ImportState) -> Node {
    let mut table = Node::leaf(NodeType::Table);
    let tbl_pr = tbl.child("w:tblPr");

    if let Some(style_id) = tbl_pr.and_then(|p| p.child_val("w:tblStyle")) {
        state.styles_used.insert(style_id.to_string());
        table = table.with_attr("tableStyleId", style_id);
    }
    if let Some(tbl_w) = tbl_pr.and_then(|p| p.child("w:tblW")) {
        let kind = tbl_w.attr("w:type").unwrap_or("dxa");
        let width = match kind {
            "dxa" => twips_attr(tbl_w, "w:w").map(|w| json!(w)),
            _ => tbl_w.attr("w:w").map(|w| json!(w)),
        };
        if let Some(width) = width {
            table = table.with_attr("tableWidth", json!({ "width": width, "type": kind }));
        }
    }

    let grid: Vec<f64> = tbl
        .child("w:tblGrid")
        .map(|g| {
            g.children_named("w:gridCol")
                .map(|c| twips_attr(c, "w:w").unwrap_or(0.0))
                .collect()
        })
        .unwrap_or_default();
    if !grid.is_empty() {
        table = table.with_attr("grid", grid.clone());
    }

    let mut rows = Vec::new();
    unwrap_children(tbl, "w:tr", &mut rows);
    let layout: Vec<Vec<CellSlot<'_>>> = rows.iter().map(|r| layout_row(r)).collect();

    let mut content = Vec::with_capacity(rows.len());
    for (row_index, row) in rows.iter().enumerate() {
        let mut cells = Vec::new();
        for slot in &layout[row_index] {
            if slot.vmerge == VMerge::Continue {
                continue;
            }
            let rowspan = if slot.vmerge == VMerge::Restart {
                1 + layout[row_index + 1..]
                    .iter()
                    .take_while(|next| {
                        next.iter().any(|s| {
                            s.column == slot.column && s.vmerge == VMerge::Continue
                        })
                    })
                    .count()
            } else {
                1
            };
            cells.push(cell_node(slot, rowspan, &grid, params, state));
        }
        content.push(row_node(row, cells));
    }

    table.content = Some(content);
    table
}

fn row_node(row: &Element, cells: Vec<Node>) -> Node {
    let mut node = Node::container(NodeType::TableRow, cells);
    let tr_pr = row.child("w:trPr");
    if let Some(height) = tr_pr
        .and_then(|p| p.child("w:trHeight"))
        .and_then(|h| twips_attr(h, "w:val"))
    {
        node = node.with_attr("rowHeight", height);
    }
    if tr_pr.and_then(|p| toggle_child(p, "w:tblHeader")) == Some(true) {
        node = node.with_attr("tableHeader", true);
    }
    node
}

fn cell_node(
    slot: &CellSlot<'_>,
    rowspan: usize,
    grid: &[f64],
    params: &HandlerParams<'_>,
    state: &mut ImportState,
) -> Node {
    let tc_pr = slot.cell.child("w:tcPr");

    let columns = slot
        .column
        .checked_add(slot.span)
        .and_then(|end| grid.get(slot.column..end));
    let colwidth: Vec<f64> = if let Some(columns) = columns {
        columns.to_vec()
    } else {
        tc_pr
            .and_then(|p| p.child("w:tcW"))
            .filter(|w| w.attr("w:type").is_none_or(|t| t == "dxa"))
            .and_then(|w| twips_attr(w, "w:w"))
            .map(|w| vec![w])
            .unwrap_or_default()
    };

    state.position += 1;
    let mut content = block_content(params.dispatch_with(&slot.cell.elements, params.extra, None, state));
    state.position += 1;
    if content.is_empty() {
        content.push(Node::container(NodeType::Paragraph, Vec::new()));
    }

    let mut node = Node::container(NodeType::TableCell, content)
        .with_attr("colspan", slot.span)
        .with_attr("rowspan", rowspan);
    if !colwidth.is_empty() {
        node = node.with_attr("colwidth", colwidth);
    }
    if let Some(fill) = tc_pr
        .and_then(|p| p.child("w:shd"))
        .and_then(|s| s.attr("w:fill"))
        .filter(|f| is_hex_color(f))
    {
        node = node.with_attr("background", json!({ "color": format!("#{fill}") }));
    }
    if let Some(align) = tc_pr.and_then(|p| p.child_val("w:vAlign")) {
        node = node.with_attr("verticalAlign", align);
    }
    node
}
