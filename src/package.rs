use std::collections::{BTreeSet, HashMap};
use std::io::{Read, Seek};
use std::path::Path;

use crate::element::Element;
use crate::error::Error;

pub const DOCUMENT_PART: &str = "word/document.xml";
pub const STYLES_PART: &str = "word/styles.xml";
pub const NUMBERING_PART: &str = "word/numbering.xml";
pub const COMMENTS_PART: &str = "word/comments.xml";
pub const COMMENTS_EXTENDED_PART: &str = "word/commentsExtended.xml";
pub const FOOTNOTES_PART: &str = "word/footnotes.xml";
pub const ENDNOTES_PART: &str = "word/endnotes.xml";

/// The parsed parts of one `.docx` package, keyed by part path.
///
/// Loaded once per import and never mutated while the converter walks it.
#[derive(Clone, Debug, Default)]
pub struct Package {
    parts: HashMap<String, Element>,
    media: BTreeSet<String>,
}

impl Package {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, root: Element) {
        self.parts.insert(path.into(), root);
    }

    pub fn insert_xml(&mut self, path: &str, xml: &str) -> Result<(), Error> {
        let root = Element::parse_part(path, xml)?;
        self.parts.insert(path.to_string(), root);
        Ok(())
    }

    pub fn add_media(&mut self, path: impl Into<String>) {
        self.media.insert(path.into());
    }

    pub fn part(&self, path: &str) -> Option<&Element> {
        self.parts.get(path)
    }

    pub fn has_media(&self, path: &str) -> bool {
        self.media.contains(path)
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    /// First theme part, wherever the package keeps it.
    pub fn theme(&self) -> Option<&Element> {
        let mut names: Vec<&String> = self
            .parts
            .keys()
            .filter(|n| n.starts_with("word/theme/") && n.ends_with(".xml"))
            .collect();
        names.sort();
        names.first().and_then(|n| self.parts.get(n.as_str()))
    }

    pub fn open(path: &Path) -> Result<Self, Error> {
        let file = std::fs::File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => Error::Io(
                std::io::Error::new(e.kind(), format!("{}: {}", e, path.display())),
            ),
            _ => Error::Io(e),
        })?;
        Self::from_reader(file)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        Self::from_reader(std::io::Cursor::new(bytes))
    }

    fn from_reader<R: Read + Seek>(reader: R) -> Result<Self, Error> {
        let mut zip = zip::ZipArchive::new(reader)
            .map_err(|_| Error::InvalidDocx("file is not a ZIP archive".into()))?;

        let mut package = Package::new();
        for index in 0..zip.len() {
            let mut entry = zip.by_index(index)?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            if !(name.ends_with(".xml") || name.ends_with(".rels")) {
                package.add_media(name);
                continue;
            }

            let mut content = String::new();
            if let Err(e) = entry.read_to_string(&mut content) {
                if name == DOCUMENT_PART {
                    return Err(Error::Io(e));
                }
                log::warn!("Skipping unreadable part {name}: {e}");
                continue;
            }
            match Element::parse_part(&name, &content) {
                Ok(root) => package.insert(name, root),
                Err(e) if name == DOCUMENT_PART => return Err(e),
                Err(e) => log::warn!("Skipping unparsable part: {e}"),
            }
        }

        if package.part(DOCUMENT_PART).is_none() {
            return Err(Error::InvalidDocx(
                "missing word/document.xml (is this a DOCX file?)".into(),
            ));
        }
        Ok(package)
    }

    /// Relationships owned by `part_path`, read from `<dir>/_rels/<file>.rels`.
    pub fn relationships(&self, part_path: &str) -> Relationships {
        let base_dir = part_dir(part_path).to_string();
        let mut by_id = HashMap::new();
        if let Some(root) = self.part(&rels_path_for(part_path)) {
            for rel in root.elements.iter().filter(|e| e.local_name() == "Relationship") {
                let (Some(id), Some(target)) = (rel.attr("Id"), rel.attr("Target")) else {
                    continue;
                };
                by_id.insert(
                    id.to_string(),
                    Relationship {
                        id: id.to_string(),
                        target: target.to_string(),
                        rel_type: rel.attr("Type").unwrap_or_default().to_string(),
                        external: rel.attr("TargetMode") == Some("External"),
                    },
                );
            }
        }
        Relationships { base_dir, by_id }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub target: String,
    pub rel_type: String,
    pub external: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Relationships {
    base_dir: String,
    by_id: HashMap<String, Relationship>,
}

impl Relationships {
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Target of `id` as a package path, or unchanged when it points
    /// outside the package.
    pub fn resolve(&self, id: &str) -> Option<String> {
        let rel = self.by_id.get(id)?;
        if rel.external || has_scheme(&rel.target) {
            return Some(rel.target.clone());
        }
        Some(resolve_target(&self.base_dir, &rel.target))
    }
}

/// "word/header1.xml" -> "word/_rels/header1.xml.rels"
pub fn rels_path_for(part_path: &str) -> String {
    match part_path.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part_path}.rels"),
    }
}

fn part_dir(part_path: &str) -> &str {
    part_path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

fn has_scheme(target: &str) -> bool {
    target
        .split_once(':')
        .is_some_and(|(scheme, _)| {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
        })
}

/// Join a relationship target against the owning part's directory.
/// Absolute targets are already package paths and only lose the leading slash.
pub fn resolve_target(base_dir: &str, target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None if base_dir.is_empty() => target.to_string(),
        None => format!("{base_dir}/{target}"),
    };
    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}
