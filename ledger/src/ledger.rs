use crate::analytics;
use crate::clock::Clock;
use crate::clock::SystemClock;
use crate::config::LedgerConfig;
use crate::document::MemoryDocument;
use crate::error::Result;
use crate::persist;
use crate::query;
use crate::store::BlobStore;
use crate::store::MemoryBlobStore;
use crate::types::EntityType;
use crate::types::Experience;
use crate::types::ExperienceFilter;
use crate::types::ExperienceInput;
use crate::types::Goal;
use crate::types::GoalInput;
use crate::types::GoalStatus;
use crate::types::Learning;
use crate::types::LearningInput;
use crate::types::LearningPatch;
use crate::types::MemoryMetadata;
use crate::types::Preference;
use crate::types::PreferenceCategory;
use crate::types::Relationship;
use crate::types::RelationshipPatch;
use crate::types::clamp_priority;
use crate::types::clamp_signed;
use crate::types::clamp_unit;
use crate::types::normalize_tags;
use chrono::DateTime;
use chrono::Utc;
use std::collections::BTreeMap;
use uuid::Uuid;

const NEW_PREFERENCE_CONFIDENCE: f64 = 0.5;
const NEW_TRUST: f64 = 0.5;
const NEW_FAMILIARITY: f64 = 0.1;
const NEW_STRENGTH: f64 = 0.3;

fn new_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

/// Single-writer facade over the memory document.
///
/// Every mutating call clamps its inputs, mutates the document, recomputes the
/// metadata and saves the whole document before returning. A failed save is
/// logged and leaves the ledger non-durable until the next successful save;
/// the in-memory change is kept either way. Use [`Ledger::flush`] to observe
/// storage errors directly.
///
/// Two ledgers opened over the same backend key do not see each other's
/// writes; the last save wins.
pub struct Ledger {
    doc: MemoryDocument,
    backend: Box<dyn BlobStore>,
    config: LedgerConfig,
    clock: Box<dyn Clock>,
    durable: bool,
}

impl Ledger {
    /// Load the document stored under `config.storage_key`, or start empty.
    pub fn open(backend: Box<dyn BlobStore>, config: LedgerConfig) -> Self {
        let mut doc = persist::load(backend.as_ref(), &config.storage_key);
        let evicted = doc.evict_experiences(config.retention.max_experiences);
        if evicted > 0 {
            tracing::debug!("ledger: evicted {evicted} experiences on load");
        }
        doc.metadata = analytics::summarize(&doc, config.top_tag_limit);
        Self {
            doc,
            backend,
            config,
            clock: Box::new(SystemClock),
            durable: true,
        }
    }

    /// Ledger over a private in-process backend.
    pub fn in_memory(config: LedgerConfig) -> Self {
        Self::open(Box::new(MemoryBlobStore::new()), config)
    }

    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn document(&self) -> &MemoryDocument {
        &self.doc
    }

    /// `false` after a save failed and before the next one succeeded.
    pub fn is_durable(&self) -> bool {
        self.durable
    }

    /// Save now and report the outcome instead of only logging it.
    pub fn flush(&mut self) -> Result<()> {
        let res = persist::save(self.backend.as_ref(), &self.config.storage_key, &self.doc);
        self.durable = res.is_ok();
        res
    }

    fn commit(&mut self) {
        self.doc.metadata = analytics::summarize(&self.doc, self.config.top_tag_limit);
        if let Err(e) = self.flush() {
            tracing::warn!("ledger: save failed, continuing in memory only: {e}");
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // --- Experiences ---

    pub fn add_experience(&mut self, input: ExperienceInput) -> String {
        let id = new_id("exp");
        let exp = Experience {
            id: id.clone(),
            timestamp: self.now(),
            kind: input.kind,
            content: input.content,
            emotional_impact: clamp_signed(input.emotional_impact),
            learning_value: clamp_unit(input.learning_value),
            tags: normalize_tags(input.tags),
            context: input.context,
        };
        self.doc.experiences.push(exp);
        let evicted = self
            .doc
            .evict_experiences(self.config.retention.max_experiences);
        if evicted > 0 {
            tracing::debug!("ledger: retention evicted {evicted} experiences");
        }
        self.commit();
        id
    }

    pub fn get_experiences(&self, filter: &ExperienceFilter) -> Vec<Experience> {
        query::experiences(&self.doc, filter)
    }

    pub fn recent_experiences(&self, limit: usize) -> Vec<Experience> {
        query::recent_experiences(&self.doc, limit)
    }

    pub fn search_experiences(&self, text: &str) -> Vec<Experience> {
        query::search_experiences(&self.doc, text)
    }

    // --- Preferences ---

    /// Upsert by `(category, name)`. New entries start at confidence 0.5;
    /// each repeat raises it by `confidence_step`, capped at 1.
    pub fn update_preference(
        &mut self,
        category: PreferenceCategory,
        name: &str,
        value: f64,
        evidence: Option<&str>,
    ) -> String {
        let now = self.now();
        let step = clamp_unit(self.config.confidence_step);
        let existing = self
            .doc
            .preferences
            .iter()
            .position(|p| p.category == category && p.name == name);
        let id = match existing {
            Some(i) => {
                let p = &mut self.doc.preferences[i];
                p.value = clamp_unit(value);
                p.confidence = clamp_unit(p.confidence + step);
                p.last_updated = now;
                if let Some(ev) = evidence {
                    p.evidence.push(ev.to_string());
                }
                p.id.clone()
            }
            None => {
                let id = new_id("pref");
                self.doc.preferences.push(Preference {
                    id: id.clone(),
                    category,
                    name: name.to_string(),
                    value: clamp_unit(value),
                    confidence: NEW_PREFERENCE_CONFIDENCE,
                    last_updated: now,
                    evidence: evidence.map(str::to_string).into_iter().collect(),
                });
                id
            }
        };
        self.commit();
        id
    }

    pub fn get_preferences(&self, category: Option<PreferenceCategory>) -> Vec<Preference> {
        query::preferences(&self.doc, category)
    }

    // --- Goals ---

    fn build_goal(input: GoalInput) -> Goal {
        Goal {
            id: new_id("goal"),
            title: input.title,
            description: input.description,
            category: input.category,
            priority: clamp_priority(input.priority),
            progress: 0.0,
            deadline: input.deadline,
            status: GoalStatus::Active,
            sub_goals: input.sub_goals.into_iter().map(Self::build_goal).collect(),
            metrics: input.metrics,
        }
    }

    pub fn add_goal(&mut self, input: GoalInput) -> String {
        let goal = Self::build_goal(input);
        let id = goal.id.clone();
        self.doc.goals.push(goal);
        self.commit();
        id
    }

    /// Clamp and set progress, merge `metrics`, complete the goal at 1.0.
    /// Sub-goals are addressable by id. Unknown ids change nothing and return
    /// `false`.
    pub fn update_goal_progress(
        &mut self,
        id: &str,
        progress: f64,
        metrics: Option<BTreeMap<String, f64>>,
    ) -> bool {
        let Some(goal) = self.doc.goal_mut(id) else {
            tracing::debug!("ledger: update_goal_progress: no goal {id}");
            return false;
        };
        goal.progress = clamp_unit(progress);
        if let Some(m) = metrics {
            goal.metrics.extend(m);
        }
        if goal.progress >= 1.0 {
            goal.status = GoalStatus::Completed;
        }
        self.commit();
        true
    }

    pub fn set_goal_status(&mut self, id: &str, status: GoalStatus) -> bool {
        let Some(goal) = self.doc.goal_mut(id) else {
            tracing::debug!("ledger: set_goal_status: no goal {id}");
            return false;
        };
        goal.status = status;
        self.commit();
        true
    }

    pub fn get_goals(&self, status: Option<GoalStatus>) -> Vec<Goal> {
        query::goals(&self.doc, status)
    }

    pub fn find_goal(&self, id: &str) -> Option<&Goal> {
        query::find_goal(&self.doc, id)
    }

    // --- Learnings ---

    pub fn add_learning(&mut self, input: LearningInput) -> String {
        let id = new_id("learn");
        let learning = Learning {
            id: id.clone(),
            topic: input.topic,
            concept: input.concept,
            understanding: clamp_unit(input.understanding),
            confidence: clamp_unit(input.confidence),
            applications: input.applications,
            related_topics: input.related_topics,
            last_reviewed: self.now(),
            review_count: 0,
        };
        self.doc.learnings.push(learning);
        self.commit();
        id
    }

    /// Apply `patch` and count a review. Unknown ids return `false`.
    pub fn update_learning(&mut self, id: &str, patch: LearningPatch) -> bool {
        let now = self.now();
        let Some(l) = self.doc.learning_mut(id) else {
            tracing::debug!("ledger: update_learning: no learning {id}");
            return false;
        };
        if let Some(topic) = patch.topic {
            l.topic = topic;
        }
        if let Some(concept) = patch.concept {
            l.concept = concept;
        }
        if let Some(u) = patch.understanding {
            l.understanding = clamp_unit(u);
        }
        if let Some(c) = patch.confidence {
            l.confidence = clamp_unit(c);
        }
        if let Some(apps) = patch.applications {
            l.applications = apps;
        }
        if let Some(related) = patch.related_topics {
            l.related_topics = related;
        }
        l.review_count = l.review_count.saturating_add(1);
        l.last_reviewed = now;
        self.commit();
        true
    }

    pub fn get_learnings(&self, topic: Option<&str>) -> Vec<Learning> {
        query::learnings(&self.doc, topic)
    }

    // --- Relationships ---

    /// Upsert by `(entity_name, entity_type)`.
    pub fn update_relationship(
        &mut self,
        entity_name: &str,
        entity_type: EntityType,
        patch: RelationshipPatch,
    ) -> String {
        let now = self.now();
        let idx = self
            .doc
            .relationships
            .iter()
            .position(|r| r.entity_name == entity_name && r.entity_type == entity_type);
        let rel = match idx {
            Some(i) => &mut self.doc.relationships[i],
            None => {
                self.doc.relationships.push(Relationship {
                    id: new_id("rel"),
                    entity_name: entity_name.to_string(),
                    entity_type,
                    trust_level: NEW_TRUST,
                    familiarity: NEW_FAMILIARITY,
                    relationship_strength: NEW_STRENGTH,
                    shared_experiences: Vec::new(),
                    preferences: Default::default(),
                    last_interaction: now,
                });
                let last = self.doc.relationships.len() - 1;
                &mut self.doc.relationships[last]
            }
        };
        if let Some(v) = patch.trust_level {
            rel.trust_level = clamp_unit(v);
        }
        if let Some(v) = patch.familiarity {
            rel.familiarity = clamp_unit(v);
        }
        if let Some(v) = patch.relationship_strength {
            rel.relationship_strength = clamp_unit(v);
        }
        rel.shared_experiences
            .extend(patch.shared_experiences.into_iter().map(|mut exp| {
                exp.normalize();
                exp
            }));
        rel.preferences.extend(patch.preferences);
        rel.last_interaction = now;
        let id = rel.id.clone();
        self.commit();
        id
    }

    pub fn get_relationships(&self, entity_type: Option<EntityType>) -> Vec<Relationship> {
        query::relationships(&self.doc, entity_type)
    }

    // --- Whole-document operations ---

    pub fn get_memory_analytics(&self) -> MemoryMetadata {
        self.doc.metadata.clone()
    }

    pub fn export_memory(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.doc)?)
    }

    /// Replace the whole document with `text`. Malformed or mis-shaped JSON,
    /// or duplicate ids within a collection, fail with
    /// [`crate::LedgerError::Parse`] and leave the ledger untouched. Scalars
    /// are clamped the same way the mutating calls clamp them.
    pub fn import_memory(&mut self, text: &str) -> Result<()> {
        let mut doc: MemoryDocument = serde_json::from_str(text)?;
        doc.normalize()?;
        doc.evict_experiences(self.config.retention.max_experiences);
        self.doc = doc;
        self.commit();
        Ok(())
    }

    pub fn clear_memory(&mut self) {
        self.doc = MemoryDocument::default();
        self.commit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::StepClock;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn ledger() -> Ledger {
        let start = DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Ledger::in_memory(LedgerConfig::default()).with_clock(StepClock::new(start, Duration::seconds(1)))
    }

    #[test]
    fn tags_are_deduplicated_in_order() {
        assert_eq!(
            normalize_tags(vec!["b".into(), " a ".into(), "b".into(), "".into()]),
            vec!["b".to_string(), "a".to_string()]
        );
    }

    #[test]
    fn experience_scalars_are_clamped() {
        let mut l = ledger();
        let id = l.add_experience(ExperienceInput {
            content: "too much".into(),
            emotional_impact: -4.0,
            learning_value: 2.0,
            ..Default::default()
        });
        let e = &l.document().experiences[0];
        assert!(id.starts_with("exp-"));
        assert_eq!(e.emotional_impact, -1.0);
        assert_eq!(e.learning_value, 1.0);
    }

    #[test]
    fn preference_confidence_rises_and_caps() {
        let mut l = ledger();
        let first = l.update_preference(PreferenceCategory::Creative, "color", 0.7, Some("liked it"));
        assert_eq!(l.get_preferences(None)[0].confidence, 0.5);
        let mut last = 0.5;
        for _ in 0..20 {
            let id = l.update_preference(PreferenceCategory::Creative, "color", 1.5, None);
            assert_eq!(id, first);
            let c = l.get_preferences(None)[0].confidence;
            assert!(c >= last && c <= 1.0);
            last = c;
        }
        let p = &l.get_preferences(Some(PreferenceCategory::Creative))[0];
        assert_eq!(p.confidence, 1.0);
        assert_eq!(p.value, 1.0);
        assert_eq!(p.evidence, vec!["liked it".to_string()]);
        assert_eq!(l.document().preferences.len(), 1);
    }

    #[test]
    fn goal_completes_only_at_full_progress() {
        let mut l = ledger();
        let id = l.add_goal(GoalInput {
            title: "launch".into(),
            priority: 12,
            ..Default::default()
        });
        assert!(l.update_goal_progress(&id, 0.99, None));
        assert_eq!(l.find_goal(&id).map(|g| g.status), Some(GoalStatus::Active));
        let metrics = BTreeMap::from([("users".to_string(), 10.0)]);
        assert!(l.update_goal_progress(&id, 1.0, Some(metrics)));
        let g = l.find_goal(&id).unwrap();
        assert_eq!(g.status, GoalStatus::Completed);
        assert_eq!(g.priority, 10);
        assert_eq!(g.metrics.get("users"), Some(&10.0));
    }

    #[test]
    fn sub_goals_are_initialized_and_addressable() {
        let mut l = ledger();
        l.add_goal(GoalInput {
            title: "parent".into(),
            priority: 5,
            sub_goals: vec![GoalInput {
                title: "child".into(),
                priority: 2,
                ..Default::default()
            }],
            ..Default::default()
        });
        let child_id = l.document().goals[0].sub_goals[0].id.clone();
        assert!(l.update_goal_progress(&child_id, 3.0, None));
        let child = l.find_goal(&child_id).unwrap();
        assert_eq!(child.progress, 1.0);
        assert_eq!(child.status, GoalStatus::Completed);
    }

    #[test]
    fn unknown_ids_are_soft_noops() {
        let mut l = ledger();
        assert!(!l.update_goal_progress("goal-missing", 0.5, None));
        assert!(!l.set_goal_status("goal-missing", GoalStatus::Paused));
        assert!(!l.update_learning("learn-missing", LearningPatch::default()));
        assert!(l.document().is_empty());
    }

    #[test]
    fn review_count_only_moves_on_update() {
        let mut l = ledger();
        let id = l.add_learning(LearningInput {
            topic: "Rust".into(),
            concept: "lifetimes".into(),
            understanding: 0.4,
            confidence: 0.3,
            ..Default::default()
        });
        assert_eq!(l.get_learnings(None)[0].review_count, 0);
        let before = l.get_learnings(None)[0].last_reviewed;
        assert!(l.update_learning(
            &id,
            LearningPatch {
                understanding: Some(7.0),
                ..Default::default()
            }
        ));
        let after = &l.get_learnings(None)[0];
        assert_eq!(after.review_count, 1);
        assert_eq!(after.understanding, 1.0);
        assert_eq!(after.concept, "lifetimes");
        assert!(after.last_reviewed > before);
    }

    #[test]
    fn relationship_patch_keeps_unspecified_fields() {
        let mut l = ledger();
        let patch = || RelationshipPatch {
            trust_level: Some(0.9),
            ..Default::default()
        };
        let first = l.update_relationship("Bob", EntityType::Person, patch());
        let second = l.update_relationship("Bob", EntityType::Person, patch());
        assert_eq!(first, second);
        let rels = l.get_relationships(Some(EntityType::Person));
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].trust_level, 0.9);
        assert_eq!(rels[0].familiarity, NEW_FAMILIARITY);
        assert_eq!(rels[0].relationship_strength, NEW_STRENGTH);

        l.update_relationship("Bob", EntityType::Ai, RelationshipPatch::default());
        assert_eq!(l.get_memory_analytics().relationship_count, 2);
    }

    #[test]
    fn relationship_scalars_and_shared_experiences_are_clamped() {
        let mut l = ledger();
        let shared = Experience {
            id: "exp-shared".into(),
            timestamp: l.now(),
            kind: Default::default(),
            content: "met at the conference".into(),
            emotional_impact: 9.0,
            learning_value: -1.0,
            tags: vec!["ai".into(), "ai".into()],
            context: Default::default(),
        };
        l.update_relationship(
            "Eve",
            EntityType::Person,
            RelationshipPatch {
                trust_level: Some(3.0),
                familiarity: Some(-0.4),
                relationship_strength: Some(f64::NAN),
                shared_experiences: vec![shared],
                ..Default::default()
            },
        );
        let rel = &l.get_relationships(None)[0];
        assert_eq!(rel.trust_level, 1.0);
        assert_eq!(rel.familiarity, 0.0);
        assert_eq!(rel.relationship_strength, 0.0);
        let exp = &rel.shared_experiences[0];
        assert_eq!(exp.emotional_impact, 1.0);
        assert_eq!(exp.learning_value, 0.0);
        assert_eq!(exp.tags, vec!["ai".to_string()]);
    }

    #[test]
    fn clear_resets_everything() {
        let mut l = ledger();
        l.add_experience(ExperienceInput::default());
        l.clear_memory();
        assert!(l.document().is_empty());
        assert_eq!(l.get_memory_analytics(), MemoryMetadata::default());
    }
}
