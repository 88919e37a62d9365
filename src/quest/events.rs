//! Quest Event Types
//!
//! Inbound gameplay events that drive objective progress, and the outbound
//! events the engine publishes to registered observers.

use serde::{Deserialize, Serialize};

use super::definition::{Objective, ObjectiveType, Reward, TargetId};
use super::state::ActiveQuest;

/// Gameplay happenings that can trigger quest progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameplayEvent {
    EnemyKilled {
        enemy_id: TargetId,
        #[serde(default = "one")]
        count: u32,
    },
    BossDefeated {
        boss_id: TargetId,
    },
    ItemCollected {
        item_id: TargetId,
        #[serde(default = "one")]
        count: u32,
    },
    ItemUsed {
        item_id: TargetId,
    },
    ItemCrafted {
        item_id: TargetId,
        #[serde(default = "one")]
        count: u32,
    },
    ItemEquipped {
        item_id: TargetId,
    },
    ItemDelivered {
        item_id: TargetId,
        #[serde(default = "one")]
        count: u32,
    },
    NpcTalkedTo {
        npc_id: TargetId,
    },
    NpcEscorted {
        npc_id: TargetId,
    },
    LocationReached {
        location_id: TargetId,
    },
    AreaExplored {
        area_id: TargetId,
    },
    /// Survived a number of waves or ticks, optionally in a specific encounter
    Survived {
        encounter_id: Option<TargetId>,
        #[serde(default = "one")]
        count: u32,
    },
    /// Player gained levels
    LevelReached {
        #[serde(default = "one")]
        levels: u32,
    },
    DungeonCompleted {
        dungeon_id: TargetId,
    },
}

fn one() -> u32 {
    1
}

impl GameplayEvent {
    /// The `(objective type, target, count)` triple this event feeds
    pub fn to_progress(&self) -> (ObjectiveType, Option<TargetId>, u32) {
        match *self {
            GameplayEvent::EnemyKilled { enemy_id, count } => (ObjectiveType::KillEnemy, Some(enemy_id), count),
            GameplayEvent::BossDefeated { boss_id } => (ObjectiveType::DefeatBoss, Some(boss_id), 1),
            GameplayEvent::ItemCollected { item_id, count } => (ObjectiveType::CollectItem, Some(item_id), count),
            GameplayEvent::ItemUsed { item_id } => (ObjectiveType::UseItem, Some(item_id), 1),
            GameplayEvent::ItemCrafted { item_id, count } => (ObjectiveType::CraftItem, Some(item_id), count),
            GameplayEvent::ItemEquipped { item_id } => (ObjectiveType::EquipItem, Some(item_id), 1),
            GameplayEvent::ItemDelivered { item_id, count } => (ObjectiveType::DeliverItem, Some(item_id), count),
            GameplayEvent::NpcTalkedTo { npc_id } => (ObjectiveType::TalkToNpc, Some(npc_id), 1),
            GameplayEvent::NpcEscorted { npc_id } => (ObjectiveType::Escort, Some(npc_id), 1),
            GameplayEvent::LocationReached { location_id } => (ObjectiveType::ReachLocation, Some(location_id), 1),
            GameplayEvent::AreaExplored { area_id } => (ObjectiveType::Explore, Some(area_id), 1),
            GameplayEvent::Survived { encounter_id, count } => (ObjectiveType::Survive, encounter_id, count),
            GameplayEvent::LevelReached { levels } => (ObjectiveType::LevelUp, None, levels),
            GameplayEvent::DungeonCompleted { dungeon_id } => (ObjectiveType::CompleteDungeon, Some(dungeon_id), 1),
        }
    }

    /// Get event type as string (for logging/debugging)
    pub fn event_type(&self) -> &'static str {
        match self {
            GameplayEvent::EnemyKilled { .. } => "enemy_killed",
            GameplayEvent::BossDefeated { .. } => "boss_defeated",
            GameplayEvent::ItemCollected { .. } => "item_collected",
            GameplayEvent::ItemUsed { .. } => "item_used",
            GameplayEvent::ItemCrafted { .. } => "item_crafted",
            GameplayEvent::ItemEquipped { .. } => "item_equipped",
            GameplayEvent::ItemDelivered { .. } => "item_delivered",
            GameplayEvent::NpcTalkedTo { .. } => "npc_talked_to",
            GameplayEvent::NpcEscorted { .. } => "npc_escorted",
            GameplayEvent::LocationReached { .. } => "location_reached",
            GameplayEvent::AreaExplored { .. } => "area_explored",
            GameplayEvent::Survived { .. } => "survived",
            GameplayEvent::LevelReached { .. } => "level_reached",
            GameplayEvent::DungeonCompleted { .. } => "dungeon_completed",
        }
    }
}

/// Discriminant of [`QuestEvent`], used to register observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestEventKind {
    Accepted,
    Updated,
    ObjectiveCompleted,
    Completed,
    TurnedIn,
    Failed,
}

/// Events published by the quest engine. Each carries a snapshot of the
/// quest taken at the moment of emission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum QuestEvent {
    #[serde(rename = "QUEST_ACCEPTED")]
    Accepted { quest: ActiveQuest },

    /// Objective progressed, including partial ticks
    #[serde(rename = "QUEST_UPDATED")]
    Updated { quest: ActiveQuest, objective: Objective },

    #[serde(rename = "QUEST_OBJECTIVE_COMPLETED")]
    ObjectiveCompleted { quest: ActiveQuest, objective: Objective },

    #[serde(rename = "QUEST_COMPLETED")]
    Completed { quest: ActiveQuest },

    /// Reward payload for whoever grants xp, gold and items
    #[serde(rename = "QUEST_TURNED_IN")]
    TurnedIn { quest: ActiveQuest, rewards: Reward },

    #[serde(rename = "QUEST_FAILED")]
    Failed { quest: ActiveQuest },
}

impl QuestEvent {
    pub fn kind(&self) -> QuestEventKind {
        match self {
            QuestEvent::Accepted { .. } => QuestEventKind::Accepted,
            QuestEvent::Updated { .. } => QuestEventKind::Updated,
            QuestEvent::ObjectiveCompleted { .. } => QuestEventKind::ObjectiveCompleted,
            QuestEvent::Completed { .. } => QuestEventKind::Completed,
            QuestEvent::TurnedIn { .. } => QuestEventKind::TurnedIn,
            QuestEvent::Failed { .. } => QuestEventKind::Failed,
        }
    }

    pub fn quest(&self) -> &ActiveQuest {
        match self {
            QuestEvent::Accepted { quest }
            | QuestEvent::Updated { quest, .. }
            | QuestEvent::ObjectiveCompleted { quest, .. }
            | QuestEvent::Completed { quest }
            | QuestEvent::TurnedIn { quest, .. }
            | QuestEvent::Failed { quest } => quest,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self.kind() {
            QuestEventKind::Accepted => "QUEST_ACCEPTED",
            QuestEventKind::Updated => "QUEST_UPDATED",
            QuestEventKind::ObjectiveCompleted => "QUEST_OBJECTIVE_COMPLETED",
            QuestEventKind::Completed => "QUEST_COMPLETED",
            QuestEventKind::TurnedIn => "QUEST_TURNED_IN",
            QuestEventKind::Failed => "QUEST_FAILED",
        }
    }
}

pub type QuestObserver = Box<dyn FnMut(&QuestEvent)>;

/// Registered observers. `None` as the filter means every event.
#[derive(Default)]
pub struct QuestObservers {
    handlers: Vec<(Option<QuestEventKind>, QuestObserver)>,
}

impl QuestObservers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, filter: Option<QuestEventKind>, handler: QuestObserver) {
        self.handlers.push((filter, handler));
    }

    /// Deliver an event synchronously, in registration order
    pub fn emit(&mut self, event: QuestEvent) {
        let kind = event.kind();
        for (filter, handler) in &mut self.handlers {
            if filter.is_none_or(|f| f == kind) {
                handler(&event);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::definition::{QuestDefinition, QuestKind};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn sample_quest() -> ActiveQuest {
        let definition = QuestDefinition::new(1, "Awakening", QuestKind::Main)
            .with_objective(Objective::new(1, ObjectiveType::TalkToNpc).with_target(1));
        ActiveQuest::accept(&definition)
    }

    #[test]
    fn test_gameplay_event_mapping() {
        assert_eq!(
            GameplayEvent::EnemyKilled { enemy_id: 3, count: 2 }.to_progress(),
            (ObjectiveType::KillEnemy, Some(3), 2)
        );
        assert_eq!(
            GameplayEvent::LevelReached { levels: 1 }.to_progress(),
            (ObjectiveType::LevelUp, None, 1)
        );
        assert_eq!(
            GameplayEvent::NpcTalkedTo { npc_id: 1 }.to_progress(),
            (ObjectiveType::TalkToNpc, Some(1), 1)
        );
    }

    #[test]
    fn test_gameplay_event_json_defaults_count() {
        let event: GameplayEvent = serde_json::from_str(r#"{"kind":"item_collected","item_id":4}"#).unwrap();
        assert_eq!(event, GameplayEvent::ItemCollected { item_id: 4, count: 1 });
        assert_eq!(event.event_type(), "item_collected");
    }

    #[test]
    fn test_observers_filter_by_kind() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let all = Rc::new(RefCell::new(0));

        let mut observers = QuestObservers::new();
        let sink = seen.clone();
        observers.register(
            Some(QuestEventKind::Completed),
            Box::new(move |event: &QuestEvent| sink.borrow_mut().push(event.quest().id())),
        );
        let counter = all.clone();
        observers.register(None, Box::new(move |_: &QuestEvent| *counter.borrow_mut() += 1));

        observers.emit(QuestEvent::Accepted { quest: sample_quest() });
        observers.emit(QuestEvent::Completed { quest: sample_quest() });

        assert_eq!(*seen.borrow(), vec![1]);
        assert_eq!(*all.borrow(), 2);
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_value(QuestEvent::Failed { quest: sample_quest() }).unwrap();
        assert_eq!(json["event"], "QUEST_FAILED");
        assert_eq!(json["quest"]["quest"]["id"], 1);
    }
}
