use std::collections::HashMap;

use super::dispatch::{DocxContext, ExtraParams, ImportState, NodeListHandler, block_content};
use crate::model::{Footnote, Node};

/// Note ids in order of first reference; the 1-based position is the number.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NoteReferences {
    order: Vec<String>,
    index: HashMap<String, usize>,
}

impl NoteReferences {
    pub fn register(&mut self, id: &str) -> usize {
        if let Some(&number) = self.index.get(id) {
            return number;
        }
        self.order.push(id.to_string());
        let number = self.order.len();
        self.index.insert(id.to_string(), number);
        number
    }

    pub fn number(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn plain_text(blocks: &[Node]) -> String {
    blocks
        .iter()
        .map(|b| b.text_content().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Convert the entries of a footnotes or endnotes part. Separator entries
/// (`w:type` set) are skipped.
pub(crate) fn import_notes(
    docx: &DocxContext<'_>,
    handler: &NodeListHandler,
    part: &str,
    entry_name: &str,
    references: &NoteReferences,
    body_state: &mut ImportState,
) -> Vec<Footnote> {
    let Some(root) = docx.package.part(part) else {
        return Vec::new();
    };
    let extra = ExtraParams::for_part(part);

    let mut notes: Vec<(Option<usize>, usize, Footnote)> = Vec::new();
    for (position, entry) in root.children_named(entry_name).enumerate() {
        if entry.attr("w:type").is_some_and(|t| t != "normal") {
            continue;
        }
        let Some(id) = entry.attr("w:id") else {
            continue;
        };
        let mut state = body_state.continue_in_part();
        let content = block_content(handler.handle(&entry.elements, docx, &extra, None, &mut state));
        body_state.rejoin(state);

        notes.push((
            references.number(id),
            position,
            Footnote {
                id: id.to_string(),
                text: plain_text(&content),
                content,
            },
        ));
    }

    // referenced notes first, by first reference, then the rest in part order
    notes.sort_by_key(|(number, position, _)| (number.is_none(), number.unwrap_or(0), *position));
    log::debug!("Imported {} entries from {part}", notes.len());
    notes.into_iter().map(|(_, _, note)| note).collect()
}
