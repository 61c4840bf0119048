use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;

/// Open key-value map attached to experiences and relationships.
pub type ContextMap = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExperienceKind {
    Conversation,
    Creation,
    Learning,
    #[default]
    Interaction,
    Achievement,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PreferenceCategory {
    #[default]
    Communication,
    Creative,
    Learning,
    Social,
    Aesthetic,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GoalCategory {
    #[default]
    Personal,
    Creative,
    Learning,
    Social,
    Financial,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GoalStatus {
    #[default]
    Active,
    Completed,
    Paused,
    Failed,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    #[default]
    Person,
    Ai,
    Organization,
    Platform,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Experience {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: ExperienceKind,
    pub content: String,
    /// In [-1, 1].
    pub emotional_impact: f64,
    /// In [0, 1].
    pub learning_value: f64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub context: ContextMap,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Preference {
    pub id: String,
    pub category: PreferenceCategory,
    pub name: String,
    pub value: f64,
    pub confidence: f64,
    pub last_updated: DateTime<Utc>,
    #[serde(default)]
    pub evidence: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: GoalCategory,
    /// In 1..=10.
    pub priority: u8,
    pub progress: f64,
    pub deadline: Option<DateTime<Utc>>,
    pub status: GoalStatus,
    #[serde(default)]
    pub sub_goals: Vec<Goal>,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

impl Goal {
    /// Depth-first lookup through this goal and its sub-goals.
    pub fn find(&self, id: &str) -> Option<&Goal> {
        if self.id == id {
            return Some(self);
        }
        self.sub_goals.iter().find_map(|g| g.find(id))
    }

    pub(crate) fn find_mut(&mut self, id: &str) -> Option<&mut Goal> {
        if self.id == id {
            return Some(self);
        }
        self.sub_goals.iter_mut().find_map(|g| g.find_mut(id))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Learning {
    pub id: String,
    pub topic: String,
    pub concept: String,
    pub understanding: f64,
    pub confidence: f64,
    #[serde(default)]
    pub applications: Vec<String>,
    #[serde(default)]
    pub related_topics: Vec<String>,
    pub last_reviewed: DateTime<Utc>,
    pub review_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: String,
    pub entity_name: String,
    pub entity_type: EntityType,
    pub trust_level: f64,
    pub familiarity: f64,
    pub relationship_strength: f64,
    #[serde(default)]
    pub shared_experiences: Vec<Experience>,
    #[serde(default)]
    pub preferences: ContextMap,
    pub last_interaction: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Summary derived from the five collections. Never edited directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MemoryMetadata {
    pub total_experiences: usize,
    pub average_emotional_impact: f64,
    pub most_frequent_tags: Vec<TagCount>,
    pub average_understanding: f64,
    pub relationship_count: usize,
}

// --- Inputs and patches ---

#[derive(Debug, Clone, Default)]
pub struct ExperienceInput {
    pub kind: ExperienceKind,
    pub content: String,
    pub emotional_impact: f64,
    pub learning_value: f64,
    pub tags: Vec<String>,
    pub context: ContextMap,
}

#[derive(Debug, Clone, Default)]
pub struct GoalInput {
    pub title: String,
    pub description: String,
    pub category: GoalCategory,
    pub priority: u8,
    pub deadline: Option<DateTime<Utc>>,
    pub sub_goals: Vec<GoalInput>,
    pub metrics: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default)]
pub struct LearningInput {
    pub topic: String,
    pub concept: String,
    pub understanding: f64,
    pub confidence: f64,
    pub applications: Vec<String>,
    pub related_topics: Vec<String>,
}

/// Fields left as `None` keep their stored value.
#[derive(Debug, Clone, Default)]
pub struct LearningPatch {
    pub topic: Option<String>,
    pub concept: Option<String>,
    pub understanding: Option<f64>,
    pub confidence: Option<f64>,
    pub applications: Option<Vec<String>>,
    pub related_topics: Option<Vec<String>>,
}

/// Fields left as `None` keep their stored value, or take the creation
/// default when the relationship is new.
#[derive(Debug, Clone, Default)]
pub struct RelationshipPatch {
    pub trust_level: Option<f64>,
    pub familiarity: Option<f64>,
    pub relationship_strength: Option<f64>,
    /// Appended to the relationship's shared experiences.
    pub shared_experiences: Vec<Experience>,
    /// Merged key by key into the stored preference map.
    pub preferences: ContextMap,
}

/// Conjunctive experience filter. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct ExperienceFilter {
    pub kind: Option<ExperienceKind>,
    /// Matches when the experience carries any of these tags.
    pub tags: Vec<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub min_emotional_impact: Option<f64>,
    pub max_emotional_impact: Option<f64>,
}

pub(crate) fn clamp_unit(v: f64) -> f64 {
    clamp_range(v, 0.0, 1.0)
}

pub(crate) fn clamp_signed(v: f64) -> f64 {
    clamp_range(v, -1.0, 1.0)
}

fn clamp_range(v: f64, lo: f64, hi: f64) -> f64 {
    if v.is_nan() { lo } else { v.clamp(lo, hi) }
}

pub(crate) fn clamp_priority(p: u8) -> u8 {
    p.clamp(1, 10)
}

/// Collapse duplicate and blank tags, keeping first-seen order.
pub(crate) fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for t in tags {
        let t = t.trim();
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}

impl Experience {
    /// Clamp scalars and collapse tags in place.
    pub(crate) fn normalize(&mut self) {
        self.emotional_impact = clamp_signed(self.emotional_impact);
        self.learning_value = clamp_unit(self.learning_value);
        self.tags = normalize_tags(std::mem::take(&mut self.tags));
    }
}

impl Preference {
    pub(crate) fn normalize(&mut self) {
        self.value = clamp_unit(self.value);
        self.confidence = clamp_unit(self.confidence);
    }
}

impl Goal {
    /// Clamp priority and progress through the whole sub-goal tree; finished
    /// goals are marked completed.
    pub(crate) fn normalize(&mut self) {
        self.priority = clamp_priority(self.priority);
        self.progress = clamp_unit(self.progress);
        if self.progress >= 1.0 {
            self.status = GoalStatus::Completed;
        }
        for sub in &mut self.sub_goals {
            sub.normalize();
        }
    }

    /// Ids of this goal and every sub-goal, depth first.
    pub(crate) fn collect_ids<'a>(&'a self, out: &mut Vec<&'a str>) {
        out.push(&self.id);
        for sub in &self.sub_goals {
            sub.collect_ids(out);
        }
    }
}

impl Learning {
    pub(crate) fn normalize(&mut self) {
        self.understanding = clamp_unit(self.understanding);
        self.confidence = clamp_unit(self.confidence);
    }
}

impl Relationship {
    pub(crate) fn normalize(&mut self) {
        self.trust_level = clamp_unit(self.trust_level);
        self.familiarity = clamp_unit(self.familiarity);
        self.relationship_strength = clamp_unit(self.relationship_strength);
        for exp in &mut self.shared_experiences {
            exp.normalize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_to_nearest_bound() {
        assert_eq!(clamp_unit(1.7), 1.0);
        assert_eq!(clamp_unit(-0.2), 0.0);
        assert_eq!(clamp_signed(-3.0), -1.0);
        assert_eq!(clamp_signed(0.25), 0.25);
        assert_eq!(clamp_unit(f64::NAN), 0.0);
        assert_eq!(clamp_priority(0), 1);
        assert_eq!(clamp_priority(42), 10);
    }

    #[test]
    fn experience_uses_camel_case_and_type_key() {
        let exp = Experience {
            id: "exp-1".into(),
            timestamp: DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
            kind: ExperienceKind::Achievement,
            content: "shipped".into(),
            emotional_impact: 0.5,
            learning_value: 0.1,
            tags: vec!["ai".into()],
            context: ContextMap::new(),
        };
        let v = serde_json::to_value(&exp).unwrap();
        assert_eq!(v["type"], "achievement");
        assert_eq!(v["emotionalImpact"], 0.5);
        assert_eq!(v["timestamp"], "2025-01-01T00:00:00Z");
    }

    #[test]
    fn find_walks_sub_goals() {
        let leaf = Goal {
            id: "goal-leaf".into(),
            title: "leaf".into(),
            description: String::new(),
            category: GoalCategory::Learning,
            priority: 3,
            progress: 0.0,
            deadline: None,
            status: GoalStatus::Active,
            sub_goals: vec![],
            metrics: BTreeMap::new(),
        };
        let root = Goal {
            id: "goal-root".into(),
            title: "root".into(),
            sub_goals: vec![leaf],
            ..root_template()
        };
        assert_eq!(root.find("goal-leaf").map(|g| g.title.as_str()), Some("leaf"));
        assert!(root.find("missing").is_none());
    }

    fn root_template() -> Goal {
        Goal {
            id: String::new(),
            title: String::new(),
            description: String::new(),
            category: GoalCategory::Personal,
            priority: 5,
            progress: 0.0,
            deadline: None,
            status: GoalStatus::Active,
            sub_goals: vec![],
            metrics: BTreeMap::new(),
        }
    }
}
