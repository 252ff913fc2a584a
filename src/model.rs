use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

pub type Attrs = Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum NodeType {
    #[serde(rename = "doc")]
    Doc,
    #[serde(rename = "paragraph")]
    Paragraph,
    #[serde(rename = "run")]
    Run,
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "tab")]
    Tab,
    #[serde(rename = "lineBreak")]
    LineBreak,
    #[serde(rename = "hardBreak")]
    HardBreak,
    #[serde(rename = "table")]
    Table,
    #[serde(rename = "tableRow")]
    TableRow,
    #[serde(rename = "tableCell")]
    TableCell,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "orderedList")]
    OrderedList,
    #[serde(rename = "bulletList")]
    BulletList,
    #[serde(rename = "listItem")]
    ListItem,
    #[serde(rename = "structuredContent")]
    StructuredContent,
    #[serde(rename = "structuredContentBlock")]
    StructuredContentBlock,
    #[serde(rename = "documentPartObject")]
    DocumentPartObject,
    #[serde(rename = "toc-wrapper")]
    TocWrapper,
    #[serde(rename = "toc-entry")]
    TocEntry,
    #[serde(rename = "footnoteReference")]
    FootnoteReference,
    #[serde(rename = "endnoteReference")]
    EndnoteReference,
    #[serde(rename = "bookmarkStart")]
    BookmarkStart,
    #[serde(rename = "commentRangeStart")]
    CommentRangeStart,
    #[serde(rename = "commentRangeEnd")]
    CommentRangeEnd,
    #[serde(rename = "page-number")]
    PageNumber,
    #[serde(rename = "total-page-number")]
    TotalPageNumber,
}

impl NodeType {
    /// Kinds allowed directly in `doc`, table cells and block containers.
    pub fn is_block(self) -> bool {
        matches!(
            self,
            NodeType::Paragraph
                | NodeType::Table
                | NodeType::OrderedList
                | NodeType::BulletList
                | NodeType::StructuredContentBlock
                | NodeType::DocumentPartObject
                | NodeType::TocWrapper
        )
    }
}

/// Mark kinds in their canonical order; `Ord` is the serialization order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MarkType {
    Bold,
    Italic,
    Underline,
    Strike,
    Highlight,
    Link,
    TextStyle,
    TrackInsert,
    TrackDelete,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub kind: MarkType,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub attrs: Attrs,
}

impl Mark {
    pub fn new(kind: MarkType) -> Self {
        Self {
            kind,
            attrs: Attrs::new(),
        }
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }
}

/// One mark per kind, in canonical order. Later marks of a kind win.
pub fn normalize_marks(marks: impl IntoIterator<Item = Mark>) -> Vec<Mark> {
    let mut by_kind: BTreeMap<MarkType, Mark> = BTreeMap::new();
    for mark in marks {
        by_kind.insert(mark.kind, mark);
    }
    by_kind.into_values().collect()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub kind: NodeType,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub attrs: Attrs,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<Node>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marks: Option<Vec<Mark>>,
}

impl Node {
    pub fn leaf(kind: NodeType) -> Self {
        Self {
            kind,
            attrs: Attrs::new(),
            content: None,
            text: None,
            marks: None,
        }
    }

    pub fn container(kind: NodeType, content: Vec<Node>) -> Self {
        Self {
            content: Some(content),
            ..Self::leaf(kind)
        }
    }

    pub fn doc(content: Vec<Node>) -> Self {
        Self::container(NodeType::Doc, content)
    }

    pub fn text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self {
            text: Some(text.into()),
            marks: Some(marks),
            ..Self::leaf(NodeType::Text)
        }
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    pub fn with_attrs(mut self, attrs: Attrs) -> Self {
        self.attrs.extend(attrs);
        self
    }

    pub fn with_marks(mut self, marks: Vec<Mark>) -> Self {
        self.marks = Some(marks);
        self
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }

    pub fn children(&self) -> &[Node] {
        self.content.as_deref().unwrap_or(&[])
    }

    pub fn push(&mut self, node: Node) {
        self.content.get_or_insert_with(Vec::new).push(node);
    }

    pub fn mark(&self, kind: MarkType) -> Option<&Mark> {
        self.marks.as_ref()?.iter().find(|m| m.kind == kind)
    }

    pub fn has_mark(&self, kind: MarkType) -> bool {
        self.mark(kind).is_some()
    }

    /// Plain text of the subtree; tabs and breaks become whitespace.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self.kind {
            NodeType::Text => out.push_str(self.text.as_deref().unwrap_or_default()),
            NodeType::Tab => out.push('\t'),
            NodeType::LineBreak | NodeType::HardBreak => out.push('\n'),
            _ => {}
        }
        for child in self.children() {
            child.collect_text(out);
        }
    }

    /// Every node of `kind` in the subtree, in document order.
    pub fn find_all(&self, kind: NodeType) -> Vec<&Node> {
        let mut out = Vec::new();
        self.collect_kind(kind, &mut out);
        out
    }

    fn collect_kind<'a>(&'a self, kind: NodeType, out: &mut Vec<&'a Node>) {
        if self.kind == kind {
            out.push(self);
        }
        for child in self.children() {
            child.collect_kind(kind, out);
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub comment_id: String,
    pub imported_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<String>,
    pub creator_name: String,
    pub creator_email: Option<String>,
    /// Milliseconds since the Unix epoch.
    pub created_time: Option<i64>,
    pub initials: Option<String>,
    pub is_done: bool,
    pub para_id: Option<String>,
    pub text_json: Option<Node>,
    pub elements: Vec<Node>,
    pub tracked_change: bool,
    pub tracked_change_type: Option<String>,
    pub tracked_change_text: Option<String>,
    pub tracked_deleted_text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Footnote {
    pub id: String,
    pub content: Vec<Node>,
    pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HeaderFooterKind {
    Default,
    First,
    Even,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HeaderFooter {
    pub id: String,
    pub kind: HeaderFooterKind,
    pub part: String,
    pub content: Node,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub pm_doc: Node,
    pub footnotes: Vec<Footnote>,
    pub endnotes: Vec<Footnote>,
    pub comments: Vec<Comment>,
    pub headers: Vec<HeaderFooter>,
    pub footers: Vec<HeaderFooter>,
    pub styles_used: Vec<String>,
}
