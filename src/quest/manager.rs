//! Quest Manager
//!
//! The single owner of runtime quest state. Every operation runs to
//! completion synchronously; observers are called inline with snapshots of
//! the affected quest.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::catalog::QuestCatalog;
use super::definition::{ObjectiveId, ObjectiveType, QuestDefinition, QuestId, QuestKind, TargetId};
use super::events::{GameplayEvent, QuestEvent, QuestEventKind, QuestObservers};
use super::persistence::SerializableState;
use super::state::{ActiveQuest, QuestProgressSnapshot, QuestStateStore, QuestStatus};

/// Why the acceptance gate refused a quest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptRefusal {
    UnknownQuest,
    AlreadyActive,
    AlreadyTurnedIn,
    PrerequisitesUnmet,
}

impl AcceptRefusal {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcceptRefusal::UnknownQuest => "quest not found",
            AcceptRefusal::AlreadyActive => "already active",
            AcceptRefusal::AlreadyTurnedIn => "already turned in and not repeatable",
            AcceptRefusal::PrerequisitesUnmet => "prerequisites not turned in",
        }
    }
}

pub struct QuestManager {
    catalog: Arc<QuestCatalog>,
    state: QuestStateStore,
    observers: QuestObservers,
}

impl QuestManager {
    /// Create the engine and start every auto-accept quest that is available
    pub fn new(catalog: Arc<QuestCatalog>) -> Self {
        Self::with_observers(catalog, QuestObservers::new())
    }

    /// Like [`QuestManager::new`], but observers also see the initial auto-accepts
    pub fn with_observers(catalog: Arc<QuestCatalog>, observers: QuestObservers) -> Self {
        let mut manager = Self {
            catalog,
            state: QuestStateStore::new(),
            observers,
        };
        let started = manager.check_auto_accept();
        info!(
            "Quest engine ready: {} quests in catalog, {} auto-accepted",
            manager.catalog.len(),
            started.len()
        );
        manager
    }

    pub fn catalog(&self) -> &QuestCatalog {
        &self.catalog
    }

    pub fn state(&self) -> &QuestStateStore {
        &self.state
    }

    // ========================================================================
    // Observers
    // ========================================================================

    pub fn on_quest_accepted(&mut self, handler: impl FnMut(&QuestEvent) + 'static) {
        self.observers.register(Some(QuestEventKind::Accepted), Box::new(handler));
    }

    pub fn on_quest_updated(&mut self, handler: impl FnMut(&QuestEvent) + 'static) {
        self.observers.register(Some(QuestEventKind::Updated), Box::new(handler));
    }

    pub fn on_objective_completed(&mut self, handler: impl FnMut(&QuestEvent) + 'static) {
        self.observers.register(Some(QuestEventKind::ObjectiveCompleted), Box::new(handler));
    }

    pub fn on_quest_completed(&mut self, handler: impl FnMut(&QuestEvent) + 'static) {
        self.observers.register(Some(QuestEventKind::Completed), Box::new(handler));
    }

    pub fn on_quest_turned_in(&mut self, handler: impl FnMut(&QuestEvent) + 'static) {
        self.observers.register(Some(QuestEventKind::TurnedIn), Box::new(handler));
    }

    pub fn on_quest_failed(&mut self, handler: impl FnMut(&QuestEvent) + 'static) {
        self.observers.register(Some(QuestEventKind::Failed), Box::new(handler));
    }

    pub fn subscribe_all(&mut self, handler: impl FnMut(&QuestEvent) + 'static) {
        self.observers.register(None, Box::new(handler));
    }

    // ========================================================================
    // Acceptance gate
    // ========================================================================

    /// First reason the quest cannot be accepted right now, if any
    pub fn accept_refusal(&self, quest_id: QuestId) -> Option<AcceptRefusal> {
        let Some(quest) = self.catalog.get_quest(quest_id) else {
            return Some(AcceptRefusal::UnknownQuest);
        };

        if self.state.is_active(quest_id) {
            return Some(AcceptRefusal::AlreadyActive);
        }

        if !quest.repeatable && self.state.is_turned_in(quest_id) {
            return Some(AcceptRefusal::AlreadyTurnedIn);
        }

        if !quest.prerequisites.iter().all(|p| self.state.is_turned_in(*p)) {
            return Some(AcceptRefusal::PrerequisitesUnmet);
        }

        None
    }

    /// Check if the player can start a quest. Never fails loudly; UI polls this.
    pub fn can_accept(&self, quest_id: QuestId) -> bool {
        match self.accept_refusal(quest_id) {
            Some(reason) => {
                debug!("Quest {} not acceptable: {}", quest_id, reason.as_str());
                false
            }
            None => true,
        }
    }

    /// Start a quest if the gate allows it
    pub fn accept_quest(&mut self, quest_id: QuestId) -> bool {
        if let Some(reason) = self.accept_refusal(quest_id) {
            warn!("Cannot accept quest {}: {}", quest_id, reason.as_str());
            return false;
        }
        let Some(definition) = self.catalog.get_quest(quest_id) else {
            return false;
        };

        let quest = ActiveQuest::accept(definition);
        info!("Accepted quest: {} ({})", quest.quest.name, quest_id);

        self.state.insert_active(quest.clone());
        self.observers.emit(QuestEvent::Accepted { quest });
        true
    }

    /// One pass over the catalog accepting every available auto-accept quest.
    /// Returns the ids started by this pass.
    pub fn check_auto_accept(&mut self) -> Vec<QuestId> {
        let candidates: Vec<QuestId> = self
            .catalog
            .all()
            .filter(|q| q.auto_accept && self.accept_refusal(q.id).is_none())
            .map(|q| q.id)
            .collect();

        candidates
            .into_iter()
            .filter(|id| self.accept_quest(*id))
            .collect()
    }

    // ========================================================================
    // Progress dispatch
    // ========================================================================

    /// Apply a gameplay tick to every matching objective of every active quest.
    /// `target_id = None` matches objectives of the type regardless of target.
    pub fn update_progress(&mut self, objective_type: ObjectiveType, target_id: Option<TargetId>, count: u32) {
        let quest_ids: Vec<QuestId> = self
            .state
            .active_quests
            .values()
            .filter(|q| q.status == QuestStatus::Active)
            .map(ActiveQuest::id)
            .collect();

        for quest_id in quest_ids {
            let Some(quest) = self.state.active_quests.get_mut(&quest_id) else {
                continue;
            };

            let mut matched = false;
            for index in 0..quest.quest.objectives.len() {
                let objective = &mut quest.quest.objectives[index];
                if !objective.matches(objective_type, target_id) {
                    continue;
                }
                matched = true;

                let newly_completed = objective.add_progress(count);
                let objective = objective.clone();
                debug!(
                    "Quest {} objective {} progress: {}/{}",
                    quest_id,
                    objective.id,
                    objective.current_count,
                    objective.target_count.map_or_else(|| "-".to_string(), |t| t.to_string())
                );

                if newly_completed {
                    self.observers.emit(QuestEvent::ObjectiveCompleted {
                        quest: quest.clone(),
                        objective: objective.clone(),
                    });
                }
                self.observers.emit(QuestEvent::Updated {
                    quest: quest.clone(),
                    objective,
                });
            }

            if matched {
                self.state.record_progress(quest_id);
                self.check_completion(quest_id);
            }
        }
    }

    pub fn handle_gameplay_event(&mut self, event: &GameplayEvent) {
        let (objective_type, target_id, count) = event.to_progress();
        debug!("Gameplay event {} -> {}", event.event_type(), objective_type.as_str());
        self.update_progress(objective_type, target_id, count);
    }

    /// Force an objective complete, for objectives without a natural counter.
    /// Returns false if nothing changed.
    pub fn complete_objective(&mut self, quest_id: QuestId, objective_id: ObjectiveId) -> bool {
        let Some(quest) = self.state.active_quests.get_mut(&quest_id) else {
            debug!("complete_objective: quest {} is not active", quest_id);
            return false;
        };
        if quest.status != QuestStatus::Active {
            return false;
        }
        let Some(objective) = quest.objective_mut(objective_id) else {
            debug!("complete_objective: quest {} has no objective {}", quest_id, objective_id);
            return false;
        };
        if objective.completed {
            return false;
        }

        objective.force_complete();
        let objective = objective.clone();
        debug!("Quest {} objective {} force-completed", quest_id, objective_id);

        self.observers.emit(QuestEvent::ObjectiveCompleted {
            quest: quest.clone(),
            objective: objective.clone(),
        });
        self.observers.emit(QuestEvent::Updated {
            quest: quest.clone(),
            objective,
        });

        self.state.record_progress(quest_id);
        self.check_completion(quest_id);
        true
    }

    // ========================================================================
    // Completion, turn-in, failure
    // ========================================================================

    /// Flip an active quest to COMPLETED once every objective is done.
    /// Returns true only on the transition.
    pub fn check_completion(&mut self, quest_id: QuestId) -> bool {
        let Some(quest) = self.state.active_quests.get_mut(&quest_id) else {
            return false;
        };
        if quest.status != QuestStatus::Active || !quest.all_objectives_complete() {
            return false;
        }

        quest.complete();
        info!("Quest {} ({}) completed, ready to turn in", quest.quest.name, quest_id);

        let quest = quest.clone();
        self.observers.emit(QuestEvent::Completed { quest });
        true
    }

    /// Claim a completed quest. Announces the rewards and re-runs auto-accept.
    pub fn turn_in_quest(&mut self, quest_id: QuestId) -> bool {
        match self.state.get_active(quest_id).map(|q| q.status) {
            Some(QuestStatus::Completed) => {}
            Some(status) => {
                warn!("Cannot turn in quest {}: status is {}", quest_id, status.as_str());
                return false;
            }
            None => {
                warn!("Cannot turn in quest {}: not active", quest_id);
                return false;
            }
        }
        let Some(mut quest) = self.state.active_quests.remove(&quest_id) else {
            return false;
        };

        quest.status = QuestStatus::TurnedIn;
        self.state.turned_in_quests.insert(quest_id);
        self.state.completed_quests.insert(quest_id);

        let rewards = quest.quest.rewards.clone();
        info!(
            "Turned in quest {} ({}): {} xp, {} gold, {} item stacks",
            quest.quest.name,
            quest_id,
            rewards.xp,
            rewards.gold,
            rewards.items.len()
        );
        self.observers.emit(QuestEvent::TurnedIn { quest, rewards });

        self.check_auto_accept();
        true
    }

    /// Fail an in-progress quest. The id stays eligible for re-acceptance.
    pub fn fail_quest(&mut self, quest_id: QuestId) -> bool {
        if self.state.get_active(quest_id).map(|q| q.status) != Some(QuestStatus::Active) {
            warn!("Cannot fail quest {}: not in progress", quest_id);
            return false;
        }
        let Some(mut quest) = self.state.active_quests.remove(&quest_id) else {
            return false;
        };

        quest.status = QuestStatus::Failed;
        self.state.quest_progress.remove(&quest_id);
        info!("Quest {} ({}) failed", quest.quest.name, quest_id);

        self.observers.emit(QuestEvent::Failed { quest });
        true
    }

    /// Debug/testing: forget every accepted, completed and turned-in quest
    pub fn reset_all_quests(&mut self) {
        self.state.clear();
        info!("All quest state reset");
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn get_quest(&self, quest_id: QuestId) -> Option<&QuestDefinition> {
        self.catalog.get_quest(quest_id)
    }

    pub fn get_quests_by_type(&self, kind: QuestKind) -> Vec<&QuestDefinition> {
        self.catalog.get_quests_by_type(kind)
    }

    pub fn get_active_quest(&self, quest_id: QuestId) -> Option<&ActiveQuest> {
        self.state.get_active(quest_id)
    }

    /// Accepted quests not yet turned in, in id order
    pub fn get_active_quests(&self) -> Vec<&ActiveQuest> {
        self.state.active_quests.values().collect()
    }

    /// Catalog quests the gate would accept right now
    pub fn get_available_quests(&self) -> Vec<&QuestDefinition> {
        self.catalog
            .all()
            .filter(|q| self.accept_refusal(q.id).is_none())
            .collect()
    }

    pub fn get_completed_quests(&self) -> Vec<QuestId> {
        self.state.completed_quests.iter().copied().collect()
    }

    pub fn is_quest_completed(&self, quest_id: QuestId) -> bool {
        self.state.is_completed(quest_id)
    }

    pub fn is_quest_active(&self, quest_id: QuestId) -> bool {
        self.state.is_active(quest_id)
    }

    pub fn get_quest_progress(&self, quest_id: QuestId) -> Option<&QuestProgressSnapshot> {
        self.state.quest_progress.get(&quest_id)
    }

    /// Stored status for accepted quests, derived LOCKED/AVAILABLE otherwise
    pub fn quest_status(&self, quest_id: QuestId) -> Option<QuestStatus> {
        if !self.catalog.contains(quest_id) {
            return None;
        }
        if let Some(quest) = self.state.get_active(quest_id) {
            return Some(quest.status);
        }
        if self.state.is_turned_in(quest_id) && self.accept_refusal(quest_id).is_some() {
            return Some(QuestStatus::TurnedIn);
        }
        Some(if self.can_accept(quest_id) {
            QuestStatus::Available
        } else {
            QuestStatus::Locked
        })
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    pub fn save_quest_state(&self) -> SerializableState {
        SerializableState::export(&self.state)
    }

    /// Replace runtime state with a saved one. The catalog is not re-merged.
    /// Active quests whose objectives are all done come back COMPLETED,
    /// without notifying observers.
    pub fn load_quest_state(&mut self, state: SerializableState) {
        let restored = state.into_store();
        info!(
            "Loaded quest state: {} active, {} turned in",
            restored.active_quests.len(),
            restored.turned_in_quests.len()
        );
        self.state = restored;

        for quest in self.state.active_quests.values_mut() {
            if quest.status == QuestStatus::Active && quest.all_objectives_complete() {
                quest.complete();
                debug!("Saved quest {} was already finished, marked completed", quest.id());
            }
        }
    }
}
