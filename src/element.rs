use std::collections::BTreeMap;

use crate::error::Error;

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Owned XML element, the unit every handler consumes.
///
/// Names keep the prefix declared in the source (`w:p`, `wp:anchor`), so
/// handlers match on qualified names the way the parts spell them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub elements: Vec<Element>,
    pub text: Option<String>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.elements.push(child);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Parse an XML fragment or part into its root element.
    pub fn parse(xml: &str) -> Result<Element, Error> {
        Self::parse_part("<inline>", xml)
    }

    pub fn parse_part(part: &str, xml: &str) -> Result<Element, Error> {
        let xml = xml.trim_start_matches('\u{feff}');
        let doc = roxmltree::Document::parse(xml).map_err(|e| Error::xml(part, e))?;
        Ok(convert(doc.root_element()))
    }

    pub fn is(&self, name: &str) -> bool {
        self.name == name
    }

    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map(|(_, local)| local)
            .unwrap_or(&self.name)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The `w:val` attribute, the carrier of most WordprocessingML settings.
    pub fn val(&self) -> Option<&str> {
        self.attr("w:val")
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.name == name)
    }

    pub fn child_val(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(Element::val)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements.iter().filter(move |e| e.name == name)
    }

    /// Depth-first search below this element.
    pub fn descendant(&self, name: &str) -> Option<&Element> {
        for child in &self.elements {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.descendant(name) {
                return Some(found);
            }
        }
        None
    }

    pub fn descendants_named<'a>(&'a self, name: &str, out: &mut Vec<&'a Element>) {
        for child in &self.elements {
            if child.name == name {
                out.push(child);
            }
            child.descendants_named(name, out);
        }
    }

    /// Concatenated character data of this element and everything below it.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(t) = &self.text {
            out.push_str(t);
        }
        for child in &self.elements {
            child.collect_text(out);
        }
    }
}

fn qualified(node: roxmltree::Node, namespace: Option<&str>, local: &str) -> String {
    match namespace {
        Some(XML_NS) => format!("xml:{local}"),
        Some(uri) => match node.lookup_prefix(uri) {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}:{local}"),
            _ => local.to_string(),
        },
        None => local.to_string(),
    }
}

fn convert(node: roxmltree::Node) -> Element {
    let tag = node.tag_name();
    let name = qualified(node, tag.namespace(), tag.name());
    let attributes = node
        .attributes()
        .map(|a| (qualified(node, a.namespace(), a.name()), a.value().to_string()))
        .collect();

    let mut elements = Vec::new();
    let mut text = String::new();
    let mut saw_text = false;
    for child in node.children() {
        if child.is_element() {
            elements.push(convert(child));
        } else if child.is_text()
            && let Some(t) = child.text()
        {
            text.push_str(t);
            saw_text = true;
        }
    }

    // Whitespace between child elements is layout, not content.
    let text = if saw_text && (elements.is_empty() || !text.trim().is_empty()) {
        Some(text)
    } else {
        None
    };

    Element {
        name,
        attributes,
        elements,
        text,
    }
}
