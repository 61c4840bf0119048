use crate::error::LedgerError;
use crate::error::Result;
use crate::types::Experience;
use crate::types::Goal;
use crate::types::Learning;
use crate::types::MemoryMetadata;
use crate::types::Preference;
use crate::types::Relationship;
use serde::Deserialize;
use serde::Serialize;
use serde::de::Error as _;
use std::collections::HashSet;

/// The whole persisted memory: five collections in arrival order plus the
/// derived metadata block.
///
/// All five collections must be present when deserializing; `metadata` may be
/// omitted because it is recomputed on load.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MemoryDocument {
    pub experiences: Vec<Experience>,
    pub preferences: Vec<Preference>,
    pub goals: Vec<Goal>,
    pub learnings: Vec<Learning>,
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub metadata: MemoryMetadata,
}

impl MemoryDocument {
    pub fn is_empty(&self) -> bool {
        self.experiences.is_empty()
            && self.preferences.is_empty()
            && self.goals.is_empty()
            && self.learnings.is_empty()
            && self.relationships.is_empty()
    }

    /// Clamp every bounded scalar, complete finished goals and collapse tags.
    ///
    /// Duplicate ids within a collection (the goal tree counts as one) are a
    /// parse error; the check runs before anything is changed.
    pub fn normalize(&mut self) -> Result<()> {
        let mut goal_ids = Vec::new();
        for g in &self.goals {
            g.collect_ids(&mut goal_ids);
        }
        check_unique("experiences", self.experiences.iter().map(|e| e.id.as_str()))?;
        check_unique("preferences", self.preferences.iter().map(|p| p.id.as_str()))?;
        check_unique("goals", goal_ids.into_iter())?;
        check_unique("learnings", self.learnings.iter().map(|l| l.id.as_str()))?;
        check_unique("relationships", self.relationships.iter().map(|r| r.id.as_str()))?;

        self.experiences.iter_mut().for_each(|e| e.normalize());
        self.preferences.iter_mut().for_each(|p| p.normalize());
        self.goals.iter_mut().for_each(|g| g.normalize());
        self.learnings.iter_mut().for_each(|l| l.normalize());
        self.relationships.iter_mut().for_each(|r| r.normalize());
        Ok(())
    }

    /// Drop the oldest experiences so at most `cap` remain. Returns how many
    /// were evicted. A cap of zero means no cap.
    pub fn evict_experiences(&mut self, cap: Option<usize>) -> usize {
        let Some(cap) = cap.filter(|&c| c > 0) else {
            return 0;
        };
        let excess = self.experiences.len().saturating_sub(cap);
        if excess > 0 {
            self.experiences.drain(..excess);
        }
        excess
    }

    pub(crate) fn goal_mut(&mut self, id: &str) -> Option<&mut Goal> {
        self.goals.iter_mut().find_map(|g| g.find_mut(id))
    }

    pub(crate) fn learning_mut(&mut self, id: &str) -> Option<&mut Learning> {
        self.learnings.iter_mut().find(|l| l.id == id)
    }
}

fn check_unique<'a>(collection: &str, ids: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(LedgerError::Parse(serde_json::Error::custom(format!(
                "duplicate id {id:?} in {collection}"
            ))));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_is_optional_but_collections_are_not() {
        let ok = r#"{"experiences":[],"preferences":[],"goals":[],"learnings":[],"relationships":[]}"#;
        let doc: MemoryDocument = serde_json::from_str(ok).unwrap();
        assert!(doc.is_empty());

        let missing = r#"{"experiences":[],"preferences":[]}"#;
        assert!(serde_json::from_str::<MemoryDocument>(missing).is_err());
    }

    #[test]
    fn eviction_without_cap_is_noop() {
        let mut doc = MemoryDocument::default();
        assert_eq!(doc.evict_experiences(None), 0);
        assert_eq!(doc.evict_experiences(Some(0)), 0);
    }
}
