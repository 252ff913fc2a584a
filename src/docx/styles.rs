use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

use crate::element::Element;
use crate::package::{Package, STYLES_PART};

/// Formatting properties the cascade knows about. Anything else in an
/// `rPr`/`pPr` is ignored by the merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyKey {
    RunStyle,
    Fonts,
    Bold,
    Italic,
    Caps,
    SmallCaps,
    Strike,
    DoubleStrike,
    Vanish,
    Color,
    RunSpacing,
    Size,
    SizeCs,
    Highlight,
    Underline,
    VertAlign,
    ParagraphStyle,
    KeepNext,
    KeepLines,
    PageBreakBefore,
    Numbering,
    ParagraphSpacing,
    Indentation,
    Justification,
    OutlineLevel,
}

impl PropertyKey {
    pub fn from_run_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "w:rStyle" => Self::RunStyle,
            "w:rFonts" => Self::Fonts,
            "w:b" => Self::Bold,
            "w:i" => Self::Italic,
            "w:caps" => Self::Caps,
            "w:smallCaps" => Self::SmallCaps,
            "w:strike" => Self::Strike,
            "w:dstrike" => Self::DoubleStrike,
            "w:vanish" => Self::Vanish,
            "w:color" => Self::Color,
            "w:spacing" => Self::RunSpacing,
            "w:sz" => Self::Size,
            "w:szCs" => Self::SizeCs,
            "w:highlight" => Self::Highlight,
            "w:u" => Self::Underline,
            "w:vertAlign" => Self::VertAlign,
            _ => return None,
        })
    }

    pub fn from_paragraph_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "w:pStyle" => Self::ParagraphStyle,
            "w:keepNext" => Self::KeepNext,
            "w:keepLines" => Self::KeepLines,
            "w:pageBreakBefore" => Self::PageBreakBefore,
            "w:numPr" => Self::Numbering,
            "w:spacing" => Self::ParagraphSpacing,
            "w:ind" => Self::Indentation,
            "w:jc" => Self::Justification,
            "w:outlineLvl" => Self::OutlineLevel,
            _ => return None,
        })
    }

    pub fn xml_name(self) -> &'static str {
        match self {
            Self::RunStyle => "w:rStyle",
            Self::Fonts => "w:rFonts",
            Self::Bold => "w:b",
            Self::Italic => "w:i",
            Self::Caps => "w:caps",
            Self::SmallCaps => "w:smallCaps",
            Self::Strike => "w:strike",
            Self::DoubleStrike => "w:dstrike",
            Self::Vanish => "w:vanish",
            Self::Color => "w:color",
            Self::RunSpacing | Self::ParagraphSpacing => "w:spacing",
            Self::Size => "w:sz",
            Self::SizeCs => "w:szCs",
            Self::Highlight => "w:highlight",
            Self::Underline => "w:u",
            Self::VertAlign => "w:vertAlign",
            Self::ParagraphStyle => "w:pStyle",
            Self::KeepNext => "w:keepNext",
            Self::KeepLines => "w:keepLines",
            Self::PageBreakBefore => "w:pageBreakBefore",
            Self::Numbering => "w:numPr",
            Self::Indentation => "w:ind",
            Self::Justification => "w:jc",
            Self::OutlineLevel => "w:outlineLvl",
        }
    }

    /// Keys whose attributes are independent settings and merge one by one
    /// instead of replacing the whole element.
    fn merges_attributes(self) -> bool {
        matches!(
            self,
            Self::Fonts | Self::ParagraphSpacing | Self::Indentation | Self::Numbering
        )
    }
}

/// Attribute pairs where setting one side clears the other.
const EXCLUSIVE_ATTRIBUTES: &[(&str, &str)] = &[
    ("w:ascii", "w:asciiTheme"),
    ("w:hAnsi", "w:hAnsiTheme"),
    ("w:eastAsia", "w:eastAsiaTheme"),
    ("w:cs", "w:cstheme"),
    ("w:firstLine", "w:hanging"),
    ("w:left", "w:start"),
    ("w:right", "w:end"),
];

pub type PropertyAttributes = BTreeMap<String, String>;

/// Ordered property-tag -> attributes map, the unit of cascading merge.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PropertyBag {
    entries: BTreeMap<PropertyKey, PropertyAttributes>,
}

impl PropertyBag {
    pub fn from_run_properties(rpr: &Element) -> Self {
        Self::collect(rpr, PropertyKey::from_run_tag)
    }

    pub fn from_paragraph_properties(ppr: &Element) -> Self {
        Self::collect(ppr, PropertyKey::from_paragraph_tag)
    }

    fn collect(props: &Element, key_for: fn(&str) -> Option<PropertyKey>) -> Self {
        let mut bag = PropertyBag::default();
        for child in &props.elements {
            let Some(key) = key_for(&child.name) else {
                continue;
            };
            let attrs = if key == PropertyKey::Numbering {
                // numPr carries its settings as child elements
                child
                    .elements
                    .iter()
                    .filter_map(|c| c.val().map(|v| (c.name.clone(), v.to_string())))
                    .collect()
            } else {
                child.attributes.clone()
            };
            bag.set(key, attrs);
        }
        bag
    }

    pub fn set(&mut self, key: PropertyKey, attrs: PropertyAttributes) {
        self.entries.insert(key, attrs);
    }

    /// Apply `other` on top of `self`: matching keys from `other` win.
    pub fn overlay(&mut self, other: &PropertyBag) {
        for (key, attrs) in &other.entries {
            if key.merges_attributes() {
                let base = self.entries.entry(*key).or_default();
                merge_attributes(base, attrs);
            } else {
                self.entries.insert(*key, attrs.clone());
            }
        }
    }

    /// Merge layers ordered from lowest to highest precedence.
    pub fn merged(layers: &[&PropertyBag]) -> Self {
        let mut bag = PropertyBag::default();
        for layer in layers {
            bag.overlay(layer);
        }
        bag
    }

    pub fn get(&self, key: PropertyKey) -> Option<&PropertyAttributes> {
        self.entries.get(&key)
    }

    pub fn attr(&self, key: PropertyKey, name: &str) -> Option<&str> {
        self.entries.get(&key)?.get(name).map(String::as_str)
    }

    pub fn val(&self, key: PropertyKey) -> Option<&str> {
        self.attr(key, "w:val")
    }

    pub fn contains(&self, key: PropertyKey) -> bool {
        self.entries.contains_key(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PropertyKey, &PropertyAttributes)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    /// Rebuild each entry as the element it came from.
    pub fn to_elements(&self) -> Vec<Element> {
        self.entries
            .iter()
            .map(|(key, attrs)| Element {
                name: key.xml_name().to_string(),
                attributes: attrs.clone(),
                ..Element::default()
            })
            .collect()
    }
}

fn merge_attributes(base: &mut PropertyAttributes, overlay: &PropertyAttributes) {
    for (name, value) in overlay {
        for (a, b) in EXCLUSIVE_ATTRIBUTES {
            if name == a {
                base.remove(*b);
            } else if name == b {
                base.remove(*a);
            }
        }
        base.insert(name.clone(), value.clone());
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StyleKind {
    Paragraph,
    Character,
    Table,
    Numbering,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StyleDefinition {
    pub style_id: String,
    pub kind: StyleKind,
    pub name: Option<String>,
    pub based_on: Option<String>,
    pub is_default: bool,
    pub run_properties: PropertyBag,
    pub paragraph_properties: PropertyBag,
}

impl StyleDefinition {
    pub fn from_element(style: &Element) -> Option<Self> {
        let style_id = style.attr("w:styleId")?.to_string();
        let kind = match style.attr("w:type").unwrap_or("paragraph") {
            "character" => StyleKind::Character,
            "table" => StyleKind::Table,
            "numbering" => StyleKind::Numbering,
            _ => StyleKind::Paragraph,
        };
        Some(Self {
            style_id,
            kind,
            name: style.child_val("w:name").map(str::to_string),
            based_on: style.child_val("w:basedOn").map(str::to_string),
            is_default: style
                .attr("w:default")
                .is_some_and(|v| super::toggle_value(Some(v))),
            run_properties: style
                .child("w:rPr")
                .map(PropertyBag::from_run_properties)
                .unwrap_or_default(),
            paragraph_properties: style
                .child("w:pPr")
                .map(PropertyBag::from_paragraph_properties)
                .unwrap_or_default(),
        })
    }
}

/// Effective run and paragraph properties of a style after walking its
/// `basedOn` chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedStyle {
    pub run: PropertyBag,
    pub paragraph: PropertyBag,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Theme {
    pub major_font: Option<String>,
    pub minor_font: Option<String>,
    pub colors: HashMap<String, String>,
}

impl Theme {
    pub fn from_part(root: Option<&Element>) -> Self {
        let mut theme = Theme::default();
        let Some(elements) = root.and_then(|r| r.child("a:themeElements")) else {
            return theme;
        };

        if let Some(scheme) = elements.child("a:fontScheme") {
            let latin = |name: &str| {
                scheme
                    .child(name)
                    .and_then(|f| f.child("a:latin"))
                    .and_then(|l| l.attr("typeface"))
                    .filter(|tf| !tf.is_empty())
                    .map(str::to_string)
            };
            theme.major_font = latin("a:majorFont");
            theme.minor_font = latin("a:minorFont");
        }

        if let Some(scheme) = elements.child("a:clrScheme") {
            for slot in &scheme.elements {
                let value = slot
                    .child("a:srgbClr")
                    .and_then(|c| c.attr("val"))
                    .or_else(|| slot.child("a:sysClr").and_then(|c| c.attr("lastClr")));
                if let Some(hex) = value {
                    theme
                        .colors
                        .insert(slot.local_name().to_string(), hex.to_string());
                }
            }
        }
        theme
    }

    /// Typeface for an `asciiTheme`-style reference such as `minorHAnsi`.
    pub fn font(&self, theme_ref: &str) -> Option<&str> {
        if theme_ref.starts_with("major") {
            self.major_font.as_deref()
        } else if theme_ref.starts_with("minor") {
            self.minor_font.as_deref()
        } else {
            None
        }
    }

    /// Hex value for a `w:themeColor` name.
    pub fn color(&self, theme_color: &str) -> Option<&str> {
        let slot = match theme_color {
            "text1" | "dark1" => "dk1",
            "background1" | "light1" => "lt1",
            "text2" | "dark2" => "dk2",
            "background2" | "light2" => "lt2",
            "hyperlink" => "hlink",
            "followedHyperlink" => "folHlink",
            other => other,
        };
        self.colors.get(slot).map(String::as_str)
    }
}

/// Document-wide style definitions with memoized `basedOn` resolution.
///
/// One registry per import; the cache lives and dies with it.
#[derive(Debug, Default)]
pub struct StyleRegistry {
    definitions: HashMap<String, StyleDefinition>,
    defaults: ResolvedStyle,
    default_paragraph_style: Option<String>,
    theme: Theme,
    cache: RefCell<HashMap<String, ResolvedStyle>>,
}

impl StyleRegistry {
    pub fn from_package(package: &Package) -> Self {
        Self::from_parts(package.part(STYLES_PART), package.theme())
    }

    pub fn from_parts(styles: Option<&Element>, theme: Option<&Element>) -> Self {
        let mut registry = StyleRegistry {
            theme: Theme::from_part(theme),
            ..StyleRegistry::default()
        };
        let Some(root) = styles else {
            return registry;
        };

        if let Some(doc_defaults) = root.child("w:docDefaults") {
            if let Some(rpr) = doc_defaults.child("w:rPrDefault").and_then(|n| n.child("w:rPr")) {
                registry.defaults.run = PropertyBag::from_run_properties(rpr);
            }
            if let Some(ppr) = doc_defaults.child("w:pPrDefault").and_then(|n| n.child("w:pPr")) {
                registry.defaults.paragraph = PropertyBag::from_paragraph_properties(ppr);
            }
        }

        for style in root.children_named("w:style") {
            let Some(def) = StyleDefinition::from_element(style) else {
                continue;
            };
            if def.is_default
                && def.kind == StyleKind::Paragraph
                && registry.default_paragraph_style.is_none()
            {
                registry.default_paragraph_style = Some(def.style_id.clone());
            }
            registry.definitions.insert(def.style_id.clone(), def);
        }

        log::debug!("Indexed {} style definitions", registry.definitions.len());
        registry
    }

    pub fn insert(&mut self, definition: StyleDefinition) {
        self.cache.get_mut().clear();
        self.definitions
            .insert(definition.style_id.clone(), definition);
    }

    pub fn definition(&self, style_id: &str) -> Option<&StyleDefinition> {
        self.definitions.get(style_id)
    }

    pub fn defaults(&self) -> &ResolvedStyle {
        &self.defaults
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// The paragraph style Word applies when a paragraph names none.
    pub fn default_paragraph_style(&self) -> Option<&str> {
        self.default_paragraph_style.as_deref()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Merged properties of `style_id` and its ancestors, closest wins.
    /// Unknown ids resolve to an empty style.
    pub fn resolve(&self, style_id: &str) -> ResolvedStyle {
        let mut stack = Vec::new();
        self.resolve_on_stack(style_id, &mut stack)
    }

    fn resolve_on_stack(&self, style_id: &str, stack: &mut Vec<String>) -> ResolvedStyle {
        if let Some(hit) = self.cache.borrow().get(style_id) {
            return hit.clone();
        }
        let Some(def) = self.definitions.get(style_id) else {
            return ResolvedStyle::default();
        };

        stack.push(style_id.to_string());
        let mut resolved = match def.based_on.as_deref() {
            Some(parent) if stack.iter().any(|s| s == parent) => {
                log::debug!("basedOn cycle at {style_id} -> {parent}, truncating");
                ResolvedStyle::default()
            }
            Some(parent) => self.resolve_on_stack(parent, stack),
            None => ResolvedStyle::default(),
        };
        stack.pop();

        resolved.run.overlay(&def.run_properties);
        resolved.paragraph.overlay(&def.paragraph_properties);
        self.cache
            .borrow_mut()
            .insert(style_id.to_string(), resolved.clone());
        resolved
    }
}
