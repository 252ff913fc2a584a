use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, NaiveDateTime};

use super::dispatch::{DocxContext, ExtraParams, ImportState, NodeListHandler, block_content};
use super::toggle_value;
use crate::element::Element;
use crate::model::Comment;
use crate::package::{COMMENTS_EXTENDED_PART, COMMENTS_PART};

/// Where a range marker was met: `seq` orders all markers of the walk,
/// `position` is the inline position counter at that point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RangeMarker {
    pub seq: usize,
    pub position: usize,
}

/// `commentRangeStart`/`commentRangeEnd` markers seen in the body, by `w:id`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommentRanges {
    starts: HashMap<String, RangeMarker>,
    ends: HashMap<String, RangeMarker>,
    next_seq: usize,
}

impl CommentRanges {
    fn marker(&mut self, position: usize) -> RangeMarker {
        let marker = RangeMarker {
            seq: self.next_seq,
            position,
        };
        self.next_seq += 1;
        marker
    }

    pub fn record_start(&mut self, id: &str, position: usize) {
        let marker = self.marker(position);
        self.starts.entry(id.to_string()).or_insert(marker);
    }

    pub fn record_end(&mut self, id: &str, position: usize) {
        let marker = self.marker(position);
        self.ends.entry(id.to_string()).or_insert(marker);
    }

    pub fn start(&self, id: &str) -> Option<RangeMarker> {
        self.starts.get(id).copied()
    }

    pub fn end(&self, id: &str) -> Option<RangeMarker> {
        self.ends.get(id).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty() && self.ends.is_empty()
    }
}

/// Attribute value with empty and literal "null"/"undefined" mapped to `None`.
fn metadata(el: &Element, name: &str) -> Option<String> {
    let value = el.attr(name)?.trim();
    match value {
        "" | "null" | "undefined" => None,
        v => Some(v.to_string()),
    }
}

/// `w:date` to epoch milliseconds. Offset-less stamps are taken as UTC.
pub(crate) fn parse_date(value: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.timestamp_millis());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.and_utc().timestamp_millis())
}

fn comment_from_element(
    el: &Element,
    docx: &DocxContext<'_>,
    handler: &NodeListHandler,
    extra: &ExtraParams,
    styles_used: &mut BTreeSet<String>,
) -> Comment {
    let mut state = ImportState::default();
    let elements = block_content(handler.handle(&el.elements, docx, extra, None, &mut state));
    styles_used.extend(state.styles_used);

    let para_id = el
        .elements
        .iter()
        .filter(|e| e.is("w:p"))
        .last()
        .and_then(|p| p.attr("w14:paraId"))
        .map(str::to_string);

    Comment {
        comment_id: metadata(el, "custom:internalId")
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        imported_id: metadata(el, "w:id"),
        parent_comment_id: None,
        creator_name: el.attr("w:author").unwrap_or_default().to_string(),
        creator_email: metadata(el, "custom:authorEmail"),
        created_time: el.attr("w:date").and_then(parse_date),
        initials: metadata(el, "w:initials"),
        is_done: false,
        para_id,
        text_json: elements.first().cloned(),
        elements,
        tracked_change: metadata(el, "custom:trackedChange").is_some_and(|v| v == "true"),
        tracked_change_type: metadata(el, "custom:trackedChangeType"),
        tracked_change_text: metadata(el, "custom:trackedChangeText"),
        tracked_deleted_text: metadata(el, "custom:trackedDeletedText"),
    }
}

pub(crate) fn import_comments(
    docx: &DocxContext<'_>,
    handler: &NodeListHandler,
    ranges: &CommentRanges,
    styles_used: &mut BTreeSet<String>,
) -> Vec<Comment> {
    let Some(root) = docx.package.part(COMMENTS_PART) else {
        return Vec::new();
    };
    let extra = ExtraParams::for_part(COMMENTS_PART);

    let mut comments = Vec::new();
    for el in root.children_named("w:comment") {
        comments.push(comment_from_element(el, docx, handler, &extra, styles_used));
    }

    if let Some(extended) = docx.package.part(COMMENTS_EXTENDED_PART) {
        apply_extended(&mut comments, extended);
    } else if docx.options.infer_comment_threads {
        infer_threads(&mut comments, ranges);
    }
    comments
}

/// `w15:commentEx` entries carry the done flag and the parent by `paraId`.
pub(crate) fn apply_extended(comments: &mut [Comment], extended: &Element) {
    let entries: HashMap<&str, (bool, Option<&str>)> = extended
        .elements
        .iter()
        .filter(|e| e.local_name() == "commentEx")
        .filter_map(|e| {
            let para_id = e.attr("w15:paraId")?;
            let done = e.attr("w15:done").is_some_and(|v| toggle_value(Some(v)));
            Some((para_id, (done, e.attr("w15:paraIdParent"))))
        })
        .collect();

    let by_para: HashMap<String, String> = comments
        .iter()
        .filter_map(|c| Some((c.para_id.clone()?, c.comment_id.clone())))
        .collect();

    for comment in comments.iter_mut() {
        let Some((done, parent)) = comment.para_id.as_deref().and_then(|p| entries.get(p)) else {
            continue;
        };
        comment.is_done = *done;
        comment.parent_comment_id = parent
            .and_then(|p| by_para.get(p))
            .filter(|id| **id != comment.comment_id)
            .cloned();
    }
}

/// Thread comments from range markers: nested ranges first, then shared
/// start positions, then unranged comments following a ranged one.
pub(crate) fn infer_threads(comments: &mut [Comment], ranges: &CommentRanges) {
    let n = comments.len();
    let starts: Vec<Option<RangeMarker>> = comments
        .iter()
        .map(|c| c.imported_id.as_deref().and_then(|id| ranges.start(id)))
        .collect();
    let ends: Vec<Option<RangeMarker>> = comments
        .iter()
        .map(|c| c.imported_id.as_deref().and_then(|id| ranges.end(id)))
        .collect();
    let mut parents: Vec<Option<usize>> = vec![None; n];

    // innermost range strictly enclosing this one
    for i in 0..n {
        let (Some(start), Some(end)) = (starts[i], ends[i]) else {
            continue;
        };
        let mut best: Option<(usize, usize)> = None;
        for j in (0..n).filter(|&j| j != i) {
            let (Some(ps), Some(pe)) = (starts[j], ends[j]) else {
                continue;
            };
            if ps.seq < start.seq && end.seq < pe.seq && best.is_none_or(|(_, seq)| ps.seq > seq) {
                best = Some((j, ps.seq));
            }
        }
        parents[i] = best.map(|(j, _)| j);
    }

    let mut by_position: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in (0..n).filter(|&i| parents[i].is_none()) {
        if let Some(start) = starts[i] {
            by_position.entry(start.position).or_default().push(i);
        }
    }
    for group in by_position.values().filter(|g| g.len() > 1) {
        let Some(&root) = group
            .iter()
            .min_by_key(|&&i| (comments[i].created_time.unwrap_or(i64::MAX), i))
        else {
            continue;
        };
        for &i in group.iter().filter(|&&i| i != root) {
            parents[i] = Some(root);
        }
    }

    let mut last_ranged = None;
    for i in 0..n {
        if starts[i].is_some() {
            last_ranged = Some(i);
        } else if parents[i].is_none() {
            parents[i] = last_ranged;
        }
    }

    let ids: Vec<String> = comments.iter().map(|c| c.comment_id.clone()).collect();
    for (comment, parent) in comments.iter_mut().zip(parents) {
        comment.parent_comment_id = parent.map(|p| ids[p].clone());
    }
}
