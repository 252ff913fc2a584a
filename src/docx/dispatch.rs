use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use super::ImportOptions;
use super::comments::CommentRanges;
use super::notes::NoteReferences;
use super::numbering::{NumberingContext, NumberingDefinitions};
use super::styles::StyleRegistry;
use super::{drawing, fields, inline, numbering, paragraph, run, table};
use crate::element::Element;
use crate::model::{Mark, Node};
use crate::package::{NUMBERING_PART, Package, Relationships};

/// Read-only view of the package plus everything indexed from it up front.
pub struct DocxContext<'a> {
    pub package: &'a Package,
    pub styles: StyleRegistry,
    pub numbering: NumberingDefinitions,
    pub options: ImportOptions,
    relationships: RefCell<HashMap<String, Rc<Relationships>>>,
}

impl<'a> DocxContext<'a> {
    pub fn new(package: &'a Package, options: ImportOptions) -> Self {
        Self {
            package,
            styles: StyleRegistry::from_package(package),
            numbering: NumberingDefinitions::from_part(package.part(NUMBERING_PART)),
            options,
            relationships: RefCell::new(HashMap::new()),
        }
    }

    pub fn relationships(&self, part: &str) -> Rc<Relationships> {
        if let Some(rels) = self.relationships.borrow().get(part) {
            return Rc::clone(rels);
        }
        let rels = Rc::new(self.package.relationships(part));
        self.relationships
            .borrow_mut()
            .insert(part.to_string(), Rc::clone(&rels));
        rels
    }

    pub fn resolve_relationship(&self, part: &str, id: &str) -> Option<String> {
        self.relationships(part).resolve(id)
    }
}

/// Context inherited by a dispatcher pass. Each level derives a new value,
/// the parent's copy is never touched.
#[derive(Clone, Debug, Default)]
pub struct ExtraParams {
    /// Part whose relationships resolve `r:id`/`r:embed` here.
    pub part: String,
    /// Marks composed by the enclosing run.
    pub run_marks: Vec<Mark>,
    pub link: Option<Mark>,
    pub track: Option<Mark>,
}

impl ExtraParams {
    pub fn for_part(part: &str) -> Self {
        Self {
            part: part.to_string(),
            ..Self::default()
        }
    }

    pub fn with_run_marks(&self, marks: Vec<Mark>) -> Self {
        Self {
            run_marks: marks,
            ..self.clone()
        }
    }

    pub fn with_link(&self, link: Mark) -> Self {
        Self {
            link: Some(link),
            ..self.clone()
        }
    }

    pub fn with_track(&self, track: Mark) -> Self {
        Self {
            track: Some(track),
            ..self.clone()
        }
    }
}

/// Mutable state that must follow document order across the whole walk.
#[derive(Debug, Default)]
pub struct ImportState {
    pub numbering: NumberingContext,
    pub comment_ranges: CommentRanges,
    /// Position counter, advanced by emitted text, inline leaves and block
    /// boundaries (paragraphs, table cells, TOC entries).
    pub position: usize,
    pub footnotes: NoteReferences,
    pub endnotes: NoteReferences,
    pub styles_used: BTreeSet<String>,
}

impl ImportState {
    /// Fresh state for another part (header, footer, note) that goes on
    /// counting comment ranges and positions where this one stopped.
    pub fn continue_in_part(&mut self) -> ImportState {
        ImportState {
            comment_ranges: std::mem::take(&mut self.comment_ranges),
            position: self.position,
            ..ImportState::default()
        }
    }

    /// Take back the ranges, position and styles a part state recorded.
    pub fn rejoin(&mut self, part: ImportState) {
        self.comment_ranges = part.comment_ranges;
        self.position = part.position;
        self.styles_used.extend(part.styles_used);
    }
}

pub struct HandlerParams<'a> {
    /// The remaining siblings, starting at the element under consideration.
    pub nodes: &'a [Element],
    pub docx: &'a DocxContext<'a>,
    pub node_list_handler: &'a NodeListHandler,
    pub extra: &'a ExtraParams,
    pub parent_style_id: Option<&'a str>,
}

impl<'a> HandlerParams<'a> {
    pub fn first(&self) -> Option<&'a Element> {
        self.nodes.first()
    }

    /// First node if it is named `name`.
    pub fn first_named(&self, name: &str) -> Option<&'a Element> {
        self.nodes.first().filter(|n| n.is(name))
    }

    /// Dispatch `children` with the same context.
    pub fn dispatch(&self, children: &[Element], state: &mut ImportState) -> Vec<Node> {
        self.node_list_handler.handle(
            children,
            self.docx,
            self.extra,
            self.parent_style_id,
            state,
        )
    }

    pub fn dispatch_with(
        &self,
        children: &[Element],
        extra: &ExtraParams,
        parent_style_id: Option<&str>,
        state: &mut ImportState,
    ) -> Vec<Node> {
        self.node_list_handler
            .handle(children, self.docx, extra, parent_style_id, state)
    }
}

/// `consumed == 0` means the handler does not apply and the next one is tried.
#[derive(Debug, Default, PartialEq)]
pub struct HandlerOutput {
    pub nodes: Vec<Node>,
    pub consumed: usize,
}

impl HandlerOutput {
    pub fn skip() -> Self {
        Self::default()
    }

    pub fn one(node: Node) -> Self {
        Self {
            nodes: vec![node],
            consumed: 1,
        }
    }

    pub fn new(nodes: Vec<Node>, consumed: usize) -> Self {
        Self { nodes, consumed }
    }

    /// Element recognized and deliberately dropped.
    pub fn swallow(consumed: usize) -> Self {
        Self {
            nodes: Vec::new(),
            consumed,
        }
    }
}

pub type HandlerFn = fn(&HandlerParams<'_>, &mut ImportState) -> HandlerOutput;

#[derive(Clone, Copy)]
pub struct HandlerEntity {
    pub name: &'static str,
    pub handler: HandlerFn,
}

impl std::fmt::Debug for HandlerEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerEntity").field("name", &self.name).finish()
    }
}

/// Ordered chain of handlers driven over a sibling list.
#[derive(Debug)]
pub struct NodeListHandler {
    entities: Vec<HandlerEntity>,
}

impl NodeListHandler {
    pub fn new(entities: Vec<HandlerEntity>) -> Self {
        Self { entities }
    }

    /// The full registry in the order block handlers must be tried.
    pub fn standard() -> Self {
        Self::new(vec![
            HandlerEntity { name: "tableOfContents", handler: fields::handle_toc },
            HandlerEntity { name: "list", handler: numbering::handle_list },
            HandlerEntity { name: "paragraph", handler: paragraph::handle_paragraph },
            HandlerEntity { name: "table", handler: table::handle_table },
            HandlerEntity { name: "sdt", handler: inline::handle_sdt },
            HandlerEntity { name: "field", handler: fields::handle_field },
            HandlerEntity { name: "run", handler: run::handle_run },
            HandlerEntity { name: "text", handler: run::handle_text },
            HandlerEntity { name: "tab", handler: run::handle_tab },
            HandlerEntity { name: "break", handler: run::handle_break },
            HandlerEntity { name: "symbol", handler: run::handle_symbol },
            HandlerEntity { name: "hyperlink", handler: inline::handle_hyperlink },
            HandlerEntity { name: "bookmark", handler: inline::handle_bookmark },
            HandlerEntity { name: "commentRange", handler: inline::handle_comment_range },
            HandlerEntity { name: "drawing", handler: drawing::handle_drawing },
            HandlerEntity { name: "noteReference", handler: inline::handle_note_reference },
            HandlerEntity { name: "trackChange", handler: inline::handle_track_change },
            HandlerEntity { name: "passthrough", handler: inline::handle_passthrough },
            HandlerEntity { name: "ignored", handler: handle_ignored },
        ])
    }

    pub fn entities(&self) -> &[HandlerEntity] {
        &self.entities
    }

    pub fn handle(
        &self,
        nodes: &[Element],
        docx: &DocxContext<'_>,
        extra: &ExtraParams,
        parent_style_id: Option<&str>,
        state: &mut ImportState,
    ) -> Vec<Node> {
        let mut out = Vec::new();
        let mut index = 0;
        while index < nodes.len() {
            let params = HandlerParams {
                nodes: &nodes[index..],
                docx,
                node_list_handler: self,
                extra,
                parent_style_id,
            };
            let claimed = self.entities.iter().find_map(|entity| {
                let result = (entity.handler)(&params, state);
                (result.consumed > 0).then_some(result)
            });
            match claimed {
                Some(result) => {
                    index += result.consumed.min(nodes.len() - index);
                    out.extend(result.nodes);
                }
                None => {
                    log::debug!("No handler for <{}>, dropping it", nodes[index].name);
                    index += 1;
                }
            }
        }
        out
    }
}

/// Property containers and markers with no node of their own.
const IGNORED_ELEMENTS: &[&str] = &[
    "w:pPr",
    "w:rPr",
    "w:sectPr",
    "w:proofErr",
    "w:lastRenderedPageBreak",
    "w:fldChar",
    "w:instrText",
    "w:annotationRef",
    "w:footnoteRef",
    "w:endnoteRef",
    "w:separator",
    "w:continuationSeparator",
    "w:permStart",
    "w:permEnd",
    "w:tblPr",
    "w:tblGrid",
    "w:trPr",
    "w:tcPr",
    "w:sdtPr",
    "w:sdtEndPr",
    "w:tblPrEx",
    "w:bookmarkEnd",
];

fn handle_ignored(params: &HandlerParams<'_>, _state: &mut ImportState) -> HandlerOutput {
    match params.first() {
        Some(node) if IGNORED_ELEMENTS.contains(&node.name.as_str()) => HandlerOutput::swallow(1),
        _ => HandlerOutput::skip(),
    }
}

/// Keep only block-level nodes; stray inline nodes at block level are dropped.
pub fn block_content(nodes: Vec<Node>) -> Vec<Node> {
    nodes
        .into_iter()
        .filter(|node| {
            let keep = node.kind.is_block();
            if !keep {
                log::debug!("Dropping inline {:?} at block level", node.kind);
            }
            keep
        })
        .collect()
}
