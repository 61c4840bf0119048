//! Read-only views over a [`MemoryDocument`]. Every query returns fresh,
//! sorted copies and never touches the document.

use crate::document::MemoryDocument;
use crate::types::EntityType;
use crate::types::Experience;
use crate::types::ExperienceFilter;
use crate::types::Goal;
use crate::types::GoalStatus;
use crate::types::Learning;
use crate::types::Preference;
use crate::types::PreferenceCategory;
use crate::types::Relationship;
use std::cmp::Ordering;

impl ExperienceFilter {
    pub fn matches(&self, e: &Experience) -> bool {
        if let Some(kind) = self.kind
            && e.kind != kind
        {
            return false;
        }
        if !self.tags.is_empty() && !e.tags.iter().any(|t| self.tags.contains(t)) {
            return false;
        }
        if let Some(since) = self.since
            && e.timestamp < since
        {
            return false;
        }
        if let Some(until) = self.until
            && e.timestamp > until
        {
            return false;
        }
        if let Some(min) = self.min_emotional_impact
            && e.emotional_impact < min
        {
            return false;
        }
        if let Some(max) = self.max_emotional_impact
            && e.emotional_impact > max
        {
            return false;
        }
        true
    }
}

fn desc(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Newest first; equal timestamps put the later arrival first.
fn newest_first<'a>(items: impl Iterator<Item = &'a Experience>) -> Vec<Experience> {
    let mut indexed: Vec<(usize, &Experience)> = items.enumerate().collect();
    indexed.sort_by(|(ia, a), (ib, b)| b.timestamp.cmp(&a.timestamp).then(ib.cmp(ia)));
    indexed.into_iter().map(|(_, e)| e.clone()).collect()
}

pub fn experiences(doc: &MemoryDocument, filter: &ExperienceFilter) -> Vec<Experience> {
    newest_first(doc.experiences.iter().filter(|e| filter.matches(e)))
}

pub fn recent_experiences(doc: &MemoryDocument, limit: usize) -> Vec<Experience> {
    let mut out = newest_first(doc.experiences.iter());
    out.truncate(limit);
    out
}

/// Case-insensitive substring search over content and tags, newest first.
pub fn search_experiences(doc: &MemoryDocument, text: &str) -> Vec<Experience> {
    let q = text.to_lowercase();
    newest_first(doc.experiences.iter().filter(|e| {
        e.content.to_lowercase().contains(&q) || e.tags.iter().any(|t| t.to_lowercase().contains(&q))
    }))
}

pub fn preferences(doc: &MemoryDocument, category: Option<PreferenceCategory>) -> Vec<Preference> {
    let mut out: Vec<Preference> = doc
        .preferences
        .iter()
        .filter(|p| category.is_none_or(|c| p.category == c))
        .cloned()
        .collect();
    out.sort_by(|a, b| desc(a.confidence, b.confidence));
    out
}

pub fn goals(doc: &MemoryDocument, status: Option<GoalStatus>) -> Vec<Goal> {
    let mut out: Vec<Goal> = doc
        .goals
        .iter()
        .filter(|g| status.is_none_or(|s| g.status == s))
        .cloned()
        .collect();
    out.sort_by(|a, b| b.priority.cmp(&a.priority));
    out
}

pub fn find_goal<'a>(doc: &'a MemoryDocument, id: &str) -> Option<&'a Goal> {
    doc.goals.iter().find_map(|g| g.find(id))
}

pub fn learnings(doc: &MemoryDocument, topic: Option<&str>) -> Vec<Learning> {
    let needle = topic.map(str::to_lowercase);
    let mut out: Vec<Learning> = doc
        .learnings
        .iter()
        .filter(|l| match &needle {
            None => true,
            Some(q) => {
                l.topic.to_lowercase().contains(q)
                    || l.related_topics.iter().any(|r| r.to_lowercase().contains(q))
            }
        })
        .cloned()
        .collect();
    out.sort_by(|a, b| desc(a.understanding, b.understanding));
    out
}

pub fn relationships(doc: &MemoryDocument, entity_type: Option<EntityType>) -> Vec<Relationship> {
    let mut out: Vec<Relationship> = doc
        .relationships
        .iter()
        .filter(|r| entity_type.is_none_or(|t| r.entity_type == t))
        .cloned()
        .collect();
    out.sort_by(|a, b| desc(a.relationship_strength, b.relationship_strength));
    out
}
