//! Quest State Tracking
//!
//! Runtime quest collections: active quests with live progress, the
//! completed and turned-in id sets, and per-quest progress snapshots.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::definition::{Objective, ObjectiveId, QuestDefinition, QuestId};

/// Lifecycle status of a quest.
///
/// `Locked` and `Available` are derived from the gate and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestStatus {
    /// Prerequisites not met
    Locked,
    /// Quest could be accepted right now
    Available,
    /// Quest is active and in progress
    Active,
    /// All objectives complete, ready to turn in
    Completed,
    /// Rewards claimed
    TurnedIn,
    /// Quest was failed; terminal for this acceptance
    Failed,
}

impl QuestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestStatus::Locked => "locked",
            QuestStatus::Available => "available",
            QuestStatus::Active => "active",
            QuestStatus::Completed => "completed",
            QuestStatus::TurnedIn => "turned_in",
            QuestStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "locked" => Some(QuestStatus::Locked),
            "available" => Some(QuestStatus::Available),
            "active" => Some(QuestStatus::Active),
            "completed" => Some(QuestStatus::Completed),
            "turned_in" => Some(QuestStatus::TurnedIn),
            "failed" => Some(QuestStatus::Failed),
            _ => None,
        }
    }

    /// Statuses an entry of the active map may carry
    pub fn is_stored_active(&self) -> bool {
        matches!(self, QuestStatus::Active | QuestStatus::Completed)
    }
}

/// An accepted quest: an independent copy of its definition plus status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveQuest {
    pub quest: QuestDefinition,
    pub status: QuestStatus,
    pub accepted_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ActiveQuest {
    /// Start a new acceptance with freshly cloned objectives
    pub fn accept(definition: &QuestDefinition) -> Self {
        let mut quest = definition.clone();
        quest.objectives = definition.objectives.iter().map(Objective::fresh_clone).collect();

        Self {
            quest,
            status: QuestStatus::Active,
            accepted_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn id(&self) -> QuestId {
        self.quest.id
    }

    pub fn objectives(&self) -> &[Objective] {
        &self.quest.objectives
    }

    pub fn objective_mut(&mut self, objective_id: ObjectiveId) -> Option<&mut Objective> {
        self.quest.objectives.iter_mut().find(|o| o.id == objective_id)
    }

    pub fn all_objectives_complete(&self) -> bool {
        self.quest.objectives.iter().all(|o| o.completed)
    }

    /// Mark quest as completed
    pub fn complete(&mut self) {
        self.status = QuestStatus::Completed;
        self.completed_at = Some(Utc::now());
    }

    /// Get duration in seconds
    pub fn duration_secs(&self) -> i64 {
        let end = self.completed_at.unwrap_or_else(Utc::now);
        (end - self.accepted_at).num_seconds()
    }

    /// Clamp counts back into range after an import. A count at its target
    /// marks the objective done.
    pub(crate) fn sanitize(&mut self) {
        for objective in &mut self.quest.objectives {
            if let Some(target) = objective.target_count {
                objective.current_count = objective.current_count.min(target);
                if objective.current_count >= target {
                    objective.completed = true;
                }
            }
        }
    }
}

/// Progress on a single objective
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectiveProgress {
    pub objective_id: ObjectiveId,
    pub current: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<u32>,
    pub completed: bool,
}

impl ObjectiveProgress {
    pub fn progress_percent(&self) -> f32 {
        match self.target {
            _ if self.completed => 1.0,
            Some(0) | None => 0.0,
            Some(target) => self.current as f32 / target as f32,
        }
    }
}

/// Snapshot of one quest's objective progress, for trackers and saves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestProgressSnapshot {
    pub quest_id: QuestId,
    pub objectives: Vec<ObjectiveProgress>,
}

impl QuestProgressSnapshot {
    pub fn of(quest: &ActiveQuest) -> Self {
        Self {
            quest_id: quest.id(),
            objectives: quest
                .objectives()
                .iter()
                .map(|o| ObjectiveProgress {
                    objective_id: o.id,
                    current: o.current_count,
                    target: o.target_count,
                    completed: o.completed,
                })
                .collect(),
        }
    }

    pub fn completed_objectives(&self) -> usize {
        self.objectives.iter().filter(|o| o.completed).count()
    }
}

/// All quest state for the player
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestStateStore {
    /// Accepted quests with status Active or Completed
    pub active_quests: BTreeMap<QuestId, ActiveQuest>,
    pub completed_quests: BTreeSet<QuestId>,
    pub turned_in_quests: BTreeSet<QuestId>,
    pub quest_progress: BTreeMap<QuestId, QuestProgressSnapshot>,
}

impl QuestStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a newly accepted quest and its initial snapshot
    pub fn insert_active(&mut self, quest: ActiveQuest) {
        self.quest_progress.insert(quest.id(), QuestProgressSnapshot::of(&quest));
        self.active_quests.insert(quest.id(), quest);
    }

    pub fn get_active(&self, quest_id: QuestId) -> Option<&ActiveQuest> {
        self.active_quests.get(&quest_id)
    }

    pub fn is_active(&self, quest_id: QuestId) -> bool {
        self.active_quests.contains_key(&quest_id)
    }

    pub fn is_completed(&self, quest_id: QuestId) -> bool {
        self.completed_quests.contains(&quest_id)
    }

    pub fn is_turned_in(&self, quest_id: QuestId) -> bool {
        self.turned_in_quests.contains(&quest_id)
    }

    /// Refresh the snapshot for an active quest
    pub fn record_progress(&mut self, quest_id: QuestId) {
        if let Some(quest) = self.active_quests.get(&quest_id) {
            self.quest_progress.insert(quest_id, QuestProgressSnapshot::of(quest));
        }
    }

    pub fn clear(&mut self) {
        self.active_quests.clear();
        self.completed_quests.clear();
        self.turned_in_quests.clear();
        self.quest_progress.clear();
    }
}
