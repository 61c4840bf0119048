//! Derived metadata. Recomputed from scratch after every mutation, which is
//! O(n) in the collection sizes; fine while collections stay small.

use crate::document::MemoryDocument;
use crate::types::MemoryMetadata;
use crate::types::TagCount;
use std::collections::HashMap;

pub fn summarize(doc: &MemoryDocument, top_tag_limit: usize) -> MemoryMetadata {
    MemoryMetadata {
        total_experiences: doc.experiences.len(),
        average_emotional_impact: mean(doc.experiences.iter().map(|e| e.emotional_impact)),
        most_frequent_tags: top_tags(doc.experiences.iter().flat_map(|e| e.tags.iter()), top_tag_limit),
        average_understanding: mean(doc.learnings.iter().map(|l| l.understanding)),
        relationship_count: doc.relationships.len(),
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 { 0.0 } else { sum / n as f64 }
}

/// Highest counts first; equal counts keep first-encountered order.
fn top_tags<'a>(tags: impl Iterator<Item = &'a String>, limit: usize) -> Vec<TagCount> {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for tag in tags {
        let c = counts.entry(tag.as_str()).or_insert(0);
        if *c == 0 {
            order.push(tag.as_str());
        }
        *c += 1;
    }
    let mut ranked: Vec<TagCount> = order
        .into_iter()
        .map(|t| TagCount {
            tag: t.to_string(),
            count: counts.get(t).copied().unwrap_or(0),
        })
        .collect();
    // sort_by is stable, so ties stay in first-seen order.
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(limit);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tags(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn ranks_by_count_then_first_seen() {
        let all = [tags(&["solo", "ai"]), tags(&["ai", "tools"]), tags(&["tools", "late"])];
        let ranked = top_tags(all.iter().flatten(), 10);
        let names: Vec<_> = ranked.iter().map(|t| (t.tag.as_str(), t.count)).collect();
        assert_eq!(names, vec![("ai", 2), ("tools", 2), ("solo", 1), ("late", 1)]);
    }

    #[test]
    fn truncates_to_limit() {
        let all: Vec<String> = (0..15).map(|i| format!("t{i}")).collect();
        assert_eq!(top_tags(all.iter(), 10).len(), 10);
    }

    #[test]
    fn empty_document_is_zeroed() {
        let meta = summarize(&MemoryDocument::default(), 10);
        assert_eq!(meta, MemoryMetadata::default());
    }
}
