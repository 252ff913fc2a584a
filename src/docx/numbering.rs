use std::collections::{BTreeMap, HashMap};
use std::iter::Peekable;

use serde_json::json;

use super::dispatch::{HandlerOutput, HandlerParams, ImportState};
use super::paragraph::{effective_paragraph, paragraph_node};
use super::run::symbol_pua_to_unicode;
use super::styles::{PropertyKey, StyleRegistry};
use super::twips_attr;
use crate::element::Element;
use crate::model::{Node, NodeType};

#[derive(Clone, Debug, PartialEq)]
pub struct LevelDefinition {
    pub ilvl: u8,
    pub start: u32,
    pub num_fmt: String,
    pub lvl_text: String,
    pub indent_left: Option<f64>,
    pub indent_hanging: Option<f64>,
}

impl LevelDefinition {
    fn fallback(ilvl: u8) -> Self {
        Self {
            ilvl,
            start: 1,
            num_fmt: "decimal".into(),
            lvl_text: format!("%{}.", ilvl + 1),
            indent_left: None,
            indent_hanging: None,
        }
    }

    fn from_element(lvl: &Element) -> Option<Self> {
        let ilvl = lvl.attr("w:ilvl")?.parse::<u8>().ok()?;
        let ind = lvl.child("w:pPr").and_then(|p| p.child("w:ind"));
        Some(Self {
            ilvl,
            start: lvl
                .child_val("w:start")
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
            num_fmt: lvl.child_val("w:numFmt").unwrap_or("decimal").to_string(),
            lvl_text: lvl.child_val("w:lvlText").unwrap_or_default().to_string(),
            indent_left: ind.and_then(|i| twips_attr(i, "w:left").or_else(|| twips_attr(i, "w:start"))),
            indent_hanging: ind.and_then(|i| twips_attr(i, "w:hanging")),
        })
    }

    pub fn is_bullet(&self) -> bool {
        self.num_fmt == "bullet"
    }
}

#[derive(Clone, Debug, Default)]
struct AbstractNumbering {
    levels: BTreeMap<u8, LevelDefinition>,
    num_style_link: Option<String>,
}

#[derive(Clone, Debug, Default)]
struct NumberingInstance {
    abstract_id: String,
    start_overrides: HashMap<u8, u32>,
    level_overrides: HashMap<u8, LevelDefinition>,
}

/// `w:abstractNum` / `w:num` definitions from `numbering.xml`.
#[derive(Clone, Debug, Default)]
pub struct NumberingDefinitions {
    abstracts: HashMap<String, AbstractNumbering>,
    nums: HashMap<String, NumberingInstance>,
}

impl NumberingDefinitions {
    pub fn from_part(root: Option<&Element>) -> Self {
        let mut defs = NumberingDefinitions::default();
        let Some(root) = root else {
            return defs;
        };

        for abs in root.children_named("w:abstractNum") {
            let Some(id) = abs.attr("w:abstractNumId") else {
                continue;
            };
            let levels = abs
                .children_named("w:lvl")
                .filter_map(LevelDefinition::from_element)
                .map(|l| (l.ilvl, l))
                .collect();
            defs.abstracts.insert(
                id.to_string(),
                AbstractNumbering {
                    levels,
                    num_style_link: abs.child_val("w:numStyleLink").map(str::to_string),
                },
            );
        }

        for num in root.children_named("w:num") {
            let (Some(num_id), Some(abstract_id)) =
                (num.attr("w:numId"), num.child_val("w:abstractNumId"))
            else {
                continue;
            };
            let mut instance = NumberingInstance {
                abstract_id: abstract_id.to_string(),
                ..NumberingInstance::default()
            };
            for ov in num.children_named("w:lvlOverride") {
                let Some(ilvl) = ov.attr("w:ilvl").and_then(|v| v.parse::<u8>().ok()) else {
                    continue;
                };
                if let Some(start) = ov.child_val("w:startOverride").and_then(|v| v.parse().ok()) {
                    instance.start_overrides.insert(ilvl, start);
                }
                if let Some(level) = ov.child("w:lvl").and_then(LevelDefinition::from_element) {
                    instance.level_overrides.insert(ilvl, level);
                }
            }
            defs.nums.insert(num_id.to_string(), instance);
        }

        log::debug!(
            "Indexed {} numbering instances over {} abstract definitions",
            defs.nums.len(),
            defs.abstracts.len()
        );
        defs
    }

    pub fn contains(&self, num_id: &str) -> bool {
        self.nums.contains_key(num_id)
    }

    /// Follow `w:numStyleLink` through numbering styles to the abstract
    /// definition that actually holds levels. A link cycle stops at the
    /// abstract where it closes.
    fn resolve_abstract(&self, num_id: &str, styles: &StyleRegistry) -> Option<&AbstractNumbering> {
        let mut current = self.nums.get(num_id)?.abstract_id.as_str();
        let mut visited: Vec<&str> = Vec::new();
        loop {
            let abs = self.abstracts.get(current)?;
            let Some(link) = abs.num_style_link.as_deref() else {
                return Some(abs);
            };
            if visited.contains(&current) {
                log::debug!("numStyleLink cycle at abstractNum {current}, truncating");
                return Some(abs);
            }
            visited.push(current);

            let linked = styles
                .resolve(link)
                .paragraph
                .attr(PropertyKey::Numbering, "w:numId")
                .and_then(|id| self.nums.get(id))
                .map(|n| n.abstract_id.as_str());
            match linked {
                Some(next) => current = next,
                None => return Some(abs),
            }
        }
    }

    /// Effective definition of one level, overrides applied. Unknown levels
    /// of a known list fall back to plain decimal numbering.
    pub fn level(&self, num_id: &str, ilvl: u8, styles: &StyleRegistry) -> Option<LevelDefinition> {
        let instance = self.nums.get(num_id)?;
        let mut level = match instance.level_overrides.get(&ilvl) {
            Some(level) => level.clone(),
            None => self
                .resolve_abstract(num_id, styles)
                .and_then(|abs| abs.levels.get(&ilvl).cloned())
                .unwrap_or_else(|| LevelDefinition::fallback(ilvl)),
        };
        if let Some(start) = instance.start_overrides.get(&ilvl) {
            level.start = *start;
        }
        Some(level)
    }
}

/// Running counters per (numId, level), advanced in document order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NumberingContext {
    counters: HashMap<(String, u8), u32>,
}

impl NumberingContext {
    /// Count one item at `ilvl`; deeper levels of the same list restart.
    pub fn advance(&mut self, num_id: &str, ilvl: u8, start: u32) -> u32 {
        self.counters
            .retain(|(id, lvl), _| !(id == num_id && *lvl > ilvl));
        *self
            .counters
            .entry((num_id.to_string(), ilvl))
            .and_modify(|c| *c = c.saturating_add(1))
            .or_insert(start)
    }

    pub fn current(&self, num_id: &str, ilvl: u8) -> Option<u32> {
        self.counters.get(&(num_id.to_string(), ilvl)).copied()
    }

    /// Counters of levels 0..=ilvl; levels never seen count as 1.
    pub fn path(&self, num_id: &str, ilvl: u8) -> Vec<u32> {
        (0..=ilvl)
            .map(|lvl| self.current(num_id, lvl).unwrap_or(1))
            .collect()
    }
}

fn to_roman(mut n: u32) -> String {
    const TABLE: &[(u32, &str)] = &[
        (1000, "m"),
        (900, "cm"),
        (500, "d"),
        (400, "cd"),
        (100, "c"),
        (90, "xc"),
        (50, "l"),
        (40, "xl"),
        (10, "x"),
        (9, "ix"),
        (5, "v"),
        (4, "iv"),
        (1, "i"),
    ];
    let mut result = String::new();
    for &(value, numeral) in TABLE {
        while n >= value {
            result.push_str(numeral);
            n -= value;
        }
    }
    result
}

fn to_letters(value: u32, base: u8) -> String {
    if value == 0 {
        return String::new();
    }
    let mut n = value - 1;
    let mut result = String::new();
    loop {
        result.insert(0, (base + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

pub fn format_number(value: u32, num_fmt: &str) -> String {
    match num_fmt {
        "decimal" => value.to_string(),
        "decimalZero" => format!("{value:02}"),
        "lowerLetter" => to_letters(value, b'a'),
        "upperLetter" => to_letters(value, b'A'),
        "lowerRoman" => to_roman(value),
        "upperRoman" => to_roman(value).to_uppercase(),
        "none" => String::new(),
        _ => value.to_string(),
    }
}

fn normalize_bullet_text(text: &str) -> String {
    text.chars()
        .map(|c| {
            let cp = c as u32;
            if (0xF000..=0xF0FF).contains(&cp) {
                symbol_pua_to_unicode(cp).unwrap_or(c)
            } else {
                c
            }
        })
        .collect()
}

/// Marker text for the item just counted: `%N` placeholders take the
/// counter of level N-1 in that level's own format.
fn list_marker(
    level: &LevelDefinition,
    num_id: &str,
    definitions: &NumberingDefinitions,
    styles: &StyleRegistry,
    context: &NumberingContext,
) -> String {
    if level.is_bullet() {
        let text = normalize_bullet_text(&level.lvl_text);
        return if text.is_empty() { "\u{2022}".to_string() } else { text };
    }
    let mut label = level.lvl_text.clone();
    for lvl in 0..9u8 {
        let placeholder = format!("%{}", lvl + 1);
        if !label.contains(&placeholder) {
            continue;
        }
        let def = if lvl == level.ilvl {
            Some(level.clone())
        } else {
            definitions.level(num_id, lvl, styles)
        };
        let counter = context
            .current(num_id, lvl)
            .or_else(|| def.as_ref().map(|d| d.start))
            .unwrap_or(1);
        let fmt = def.as_ref().map(|d| d.num_fmt.as_str()).unwrap_or("decimal");
        label = label.replace(&placeholder, &format_number(counter, fmt));
    }
    label
}

struct ListEntry<'a> {
    paragraph: &'a Element,
    num_id: String,
    ilvl: u8,
}

/// Numbering reference of a paragraph, direct or from its style.
/// `numId` 0 and ids with no `w:num` are not lists.
fn list_entry<'a>(p: &'a Element, params: &HandlerParams<'_>) -> Option<ListEntry<'a>> {
    if !p.is("w:p") {
        return None;
    }
    let effective = effective_paragraph(p, params.docx);
    let num_id = effective
        .properties
        .attr(PropertyKey::Numbering, "w:numId")?
        .to_string();
    if num_id == "0" || !params.docx.numbering.contains(&num_id) {
        return None;
    }
    let ilvl = effective
        .properties
        .attr(PropertyKey::Numbering, "w:ilvl")
        .and_then(|v| v.parse::<u8>().ok())
        .unwrap_or(0)
        .min(8);
    Some(ListEntry {
        paragraph: p,
        num_id,
        ilvl,
    })
}

/// Groups consecutive list paragraphs sharing a `numId` into one list node;
/// deeper levels nest inside the preceding item.
pub(crate) fn handle_list(params: &HandlerParams<'_>, state: &mut ImportState) -> HandlerOutput {
    let Some(first) = params.first().and_then(|p| list_entry(p, params)) else {
        return HandlerOutput::skip();
    };
    let mut entries = vec![first];
    for p in &params.nodes[1..] {
        match list_entry(p, params) {
            Some(entry) if entry.num_id == entries[0].num_id => entries.push(entry),
            _ => break,
        }
    }
    let consumed = entries.len();
    let base_level = entries.iter().map(|e| e.ilvl).min().unwrap_or(0);

    let mut iter = entries.iter().peekable();
    let mut lists = Vec::new();
    while iter.peek().is_some() {
        lists.push(build_list(&mut iter, base_level, params, state));
    }
    HandlerOutput::new(lists, consumed)
}

fn build_list(
    entries: &mut Peekable<std::slice::Iter<'_, ListEntry<'_>>>,
    level: u8,
    params: &HandlerParams<'_>,
    state: &mut ImportState,
) -> Node {
    let mut items: Vec<Node> = Vec::new();
    let mut list_kind = None;
    let mut list_attrs = None;

    while let Some(entry) = entries.peek() {
        if entry.ilvl < level {
            break;
        }
        if entry.ilvl > level {
            let nested = build_list(entries, level + 1, params, state);
            match items.last_mut() {
                Some(item) => item.push(nested),
                None => items.push(Node::container(NodeType::ListItem, vec![nested])),
            }
            continue;
        }

        let Some(entry) = entries.next() else {
            break;
        };
        let docx = params.docx;
        let def = docx
            .numbering
            .level(&entry.num_id, entry.ilvl, &docx.styles)
            .unwrap_or_else(|| LevelDefinition::fallback(entry.ilvl));

        if list_kind.is_none() {
            list_kind = Some(if def.is_bullet() {
                NodeType::BulletList
            } else {
                NodeType::OrderedList
            });
            list_attrs = Some((entry.num_id.clone(), def.num_fmt.clone(), def.start));
        }

        state.numbering.advance(&entry.num_id, entry.ilvl, def.start);
        let marker = list_marker(&def, &entry.num_id, &docx.numbering, &docx.styles, &state.numbering);
        let path = state.numbering.path(&entry.num_id, entry.ilvl);

        let paragraph = paragraph_node(entry.paragraph, params, state);
        let mut item = Node::container(NodeType::ListItem, vec![paragraph])
            .with_attr("numId", entry.num_id.clone())
            .with_attr("level", entry.ilvl)
            .with_attr("numberingType", def.num_fmt.clone())
            .with_attr("lvlText", def.lvl_text.clone())
            .with_attr("listLevel", path)
            .with_attr("listMarker", marker);
        if def.indent_left.is_some() || def.indent_hanging.is_some() {
            item = item.with_attr(
                "indent",
                json!({ "left": def.indent_left, "hanging": def.indent_hanging }),
            );
        }
        items.push(item);
    }

    let kind = list_kind.unwrap_or(NodeType::BulletList);
    let mut list = Node::container(kind, items);
    if let Some((num_id, fmt, start)) = list_attrs {
        list = list
            .with_attr("listId", num_id)
            .with_attr("listStyleType", fmt);
        if kind == NodeType::OrderedList {
            list = list.with_attr("order", start);
        }
    }
    list
}
