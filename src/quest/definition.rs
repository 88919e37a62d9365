//! Quest Definition Structures
//!
//! Catalog-side quest data. The raw shapes are deserialized from TOML quest
//! files; the resolved shapes are what the engine clones into active quests.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub type QuestId = u32;
pub type ObjectiveId = u32;
/// Enemy, item, NPC, location or dungeon id an objective points at
pub type TargetId = u32;
pub type ItemId = u32;

/// A quest definition loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestFile {
    pub quest: RawQuest,
}

/// Raw quest data as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuest {
    pub id: QuestId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default = "default_kind")]
    pub kind: String,
    #[serde(default = "default_level")]
    pub level: u32,
    #[serde(default)]
    pub objectives: Vec<RawObjective>,
    #[serde(default)]
    pub rewards: Option<RawReward>,
    /// Quests that must be turned in first
    #[serde(default)]
    pub prerequisites: Vec<QuestId>,
    #[serde(default)]
    pub follow_up_quests: Vec<QuestId>,
    #[serde(default)]
    pub auto_accept: bool,
    #[serde(default)]
    pub repeatable: bool,
}

fn default_kind() -> String {
    "side".to_string()
}

fn default_level() -> u32 {
    1
}

/// Raw objective as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawObjective {
    pub id: ObjectiveId,
    #[serde(rename = "type")]
    pub objective_type: String,
    pub target: Option<TargetId>,
    /// Omitted for binary objectives (talk to, reach)
    pub count: Option<u32>,
    #[serde(default)]
    pub current: u32,
    #[serde(default)]
    pub description: String,
}

/// Raw reward as it appears in TOML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawReward {
    #[serde(default)]
    pub xp: u32,
    #[serde(default)]
    pub gold: u32,
    #[serde(default)]
    pub items: Vec<RawItemReward>,
    pub unlock_quest: Option<QuestId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawItemReward {
    pub id: ItemId,
    #[serde(default = "default_item_count")]
    pub count: u32,
}

fn default_item_count() -> u32 {
    1
}

// ============================================================================
// Resolved Quest Structures (after parsing)
// ============================================================================

/// Main story or side content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestKind {
    Main,
    Side,
}

impl QuestKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "main" => Some(QuestKind::Main),
            "side" => Some(QuestKind::Side),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestKind::Main => "main",
            QuestKind::Side => "side",
        }
    }
}

/// Objective types the progress dispatcher understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObjectiveType {
    KillEnemy,
    CollectItem,
    TalkToNpc,
    ReachLocation,
    Escort,
    Explore,
    UseItem,
    Survive,
    DefeatBoss,
    DeliverItem,
    CraftItem,
    LevelUp,
    EquipItem,
    CompleteDungeon,
}

impl ObjectiveType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "kill_enemy" | "kill" => Some(ObjectiveType::KillEnemy),
            "collect_item" | "collect" => Some(ObjectiveType::CollectItem),
            "talk_to_npc" | "talk_to" | "talk" => Some(ObjectiveType::TalkToNpc),
            "reach_location" | "reach" | "location" => Some(ObjectiveType::ReachLocation),
            "escort" => Some(ObjectiveType::Escort),
            "explore" => Some(ObjectiveType::Explore),
            "use_item" | "use" => Some(ObjectiveType::UseItem),
            "survive" => Some(ObjectiveType::Survive),
            "defeat_boss" | "boss" => Some(ObjectiveType::DefeatBoss),
            "deliver_item" | "deliver" => Some(ObjectiveType::DeliverItem),
            "craft_item" | "craft" => Some(ObjectiveType::CraftItem),
            "level_up" | "level" => Some(ObjectiveType::LevelUp),
            "equip_item" | "equip" => Some(ObjectiveType::EquipItem),
            "complete_dungeon" | "dungeon" => Some(ObjectiveType::CompleteDungeon),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectiveType::KillEnemy => "kill_enemy",
            ObjectiveType::CollectItem => "collect_item",
            ObjectiveType::TalkToNpc => "talk_to_npc",
            ObjectiveType::ReachLocation => "reach_location",
            ObjectiveType::Escort => "escort",
            ObjectiveType::Explore => "explore",
            ObjectiveType::UseItem => "use_item",
            ObjectiveType::Survive => "survive",
            ObjectiveType::DefeatBoss => "defeat_boss",
            ObjectiveType::DeliverItem => "deliver_item",
            ObjectiveType::CraftItem => "craft_item",
            ObjectiveType::LevelUp => "level_up",
            ObjectiveType::EquipItem => "equip_item",
            ObjectiveType::CompleteDungeon => "complete_dungeon",
        }
    }
}

/// A quest objective. The catalog copy is never mutated; active quests carry
/// their own clone with live `current_count`/`completed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Objective {
    pub id: ObjectiveId,
    #[serde(rename = "type")]
    pub objective_type: ObjectiveType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<TargetId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_count: Option<u32>,
    #[serde(default)]
    pub current_count: u32,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub description: String,
}

impl Objective {
    pub fn new(id: ObjectiveId, objective_type: ObjectiveType) -> Self {
        Self {
            id,
            objective_type,
            target_id: None,
            target_count: None,
            current_count: 0,
            completed: false,
            description: String::new(),
        }
    }

    pub fn with_target(mut self, target_id: TargetId) -> Self {
        self.target_id = Some(target_id);
        self
    }

    pub fn with_count(mut self, target_count: u32) -> Self {
        self.target_count = Some(target_count);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn from_raw(raw: &RawObjective) -> Option<Self> {
        let objective_type = ObjectiveType::from_str(&raw.objective_type)?;
        Some(Self {
            id: raw.id,
            objective_type,
            target_id: raw.target,
            target_count: raw.count,
            current_count: raw.current,
            completed: false,
            description: raw.description.clone(),
        })
    }

    /// Whether a progress event of this type and target applies here.
    /// An event without a target matches any objective of the type.
    pub fn matches(&self, objective_type: ObjectiveType, target_id: Option<TargetId>) -> bool {
        !self.completed
            && self.objective_type == objective_type
            && (target_id.is_none() || self.target_id == target_id)
    }

    /// Add progress and return true if newly completed
    pub fn add_progress(&mut self, amount: u32) -> bool {
        if self.completed {
            return false;
        }
        match self.target_count {
            Some(target) => {
                self.current_count = self.current_count.saturating_add(amount).min(target);
                if self.current_count >= target {
                    self.completed = true;
                }
            }
            None => self.completed = true,
        }
        self.completed
    }

    /// Mark as complete regardless of count
    pub fn force_complete(&mut self) {
        if let Some(target) = self.target_count {
            self.current_count = target;
        }
        self.completed = true;
    }

    /// Fresh copy for a new acceptance: predefined count kept (clamped), never completed
    pub fn fresh_clone(&self) -> Self {
        let mut objective = self.clone();
        objective.completed = false;
        if let Some(target) = objective.target_count {
            objective.current_count = objective.current_count.min(target);
        }
        objective
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemReward {
    pub item_id: ItemId,
    pub count: u32,
}

/// Reward payload announced on turn-in. The engine never grants it itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    #[serde(default)]
    pub xp: u32,
    #[serde(default)]
    pub gold: u32,
    #[serde(default)]
    pub items: Vec<ItemReward>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unlock_quest: Option<QuestId>,
}

impl Reward {
    pub fn from_raw(raw: &RawReward) -> Self {
        Self {
            xp: raw.xp,
            gold: raw.gold,
            items: raw
                .items
                .iter()
                .map(|i| ItemReward {
                    item_id: i.id,
                    count: i.count,
                })
                .collect(),
            unlock_quest: raw.unlock_quest,
        }
    }
}

/// A fully resolved quest definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestDefinition {
    pub id: QuestId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: QuestKind,
    #[serde(default)]
    pub level: u32,
    pub objectives: Vec<Objective>,
    #[serde(default)]
    pub rewards: Reward,
    #[serde(default)]
    pub prerequisites: BTreeSet<QuestId>,
    #[serde(default)]
    pub follow_up_quests: BTreeSet<QuestId>,
    #[serde(default)]
    pub auto_accept: bool,
    #[serde(default)]
    pub repeatable: bool,
}

impl QuestDefinition {
    pub fn new(id: QuestId, name: impl Into<String>, kind: QuestKind) -> Self {
        Self {
            id,
            name: name.into(),
            description: String::new(),
            kind,
            level: 1,
            objectives: Vec::new(),
            rewards: Reward::default(),
            prerequisites: BTreeSet::new(),
            follow_up_quests: BTreeSet::new(),
            auto_accept: false,
            repeatable: false,
        }
    }

    pub fn with_objective(mut self, objective: Objective) -> Self {
        self.objectives.push(objective);
        self
    }

    pub fn with_prerequisite(mut self, quest_id: QuestId) -> Self {
        self.prerequisites.insert(quest_id);
        self
    }

    pub fn with_follow_up(mut self, quest_id: QuestId) -> Self {
        self.follow_up_quests.insert(quest_id);
        self
    }

    pub fn with_rewards(mut self, rewards: Reward) -> Self {
        self.rewards = rewards;
        self
    }

    pub fn auto_accept(mut self, auto_accept: bool) -> Self {
        self.auto_accept = auto_accept;
        self
    }

    pub fn repeatable(mut self, repeatable: bool) -> Self {
        self.repeatable = repeatable;
        self
    }

    /// Create a QuestDefinition from raw TOML data
    pub fn from_raw(raw: &RawQuest) -> Result<Self, String> {
        let kind = QuestKind::from_str(&raw.kind)
            .ok_or_else(|| format!("Quest {} has invalid type '{}'", raw.id, raw.kind))?;

        let objectives: Vec<Objective> = raw
            .objectives
            .iter()
            .enumerate()
            .map(|(i, o)| {
                Objective::from_raw(o).ok_or_else(|| {
                    format!("Invalid objective type '{}' at index {}", o.objective_type, i)
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if objectives.is_empty() {
            return Err(format!("Quest {} has no objectives", raw.id));
        }

        let mut seen = BTreeSet::new();
        if let Some(dup) = objectives.iter().find(|o| !seen.insert(o.id)) {
            return Err(format!("Quest {} repeats objective id {}", raw.id, dup.id));
        }

        Ok(Self {
            id: raw.id,
            name: raw.name.clone(),
            description: raw.description.clone(),
            kind,
            level: raw.level,
            objectives,
            rewards: raw.rewards.as_ref().map(Reward::from_raw).unwrap_or_default(),
            prerequisites: raw.prerequisites.iter().copied().collect(),
            follow_up_quests: raw.follow_up_quests.iter().copied().collect(),
            auto_accept: raw.auto_accept,
            repeatable: raw.repeatable,
        })
    }

    /// Get objective by ID
    pub fn get_objective(&self, id: ObjectiveId) -> Option<&Objective> {
        self.objectives.iter().find(|o| o.id == id)
    }

    /// Every quest id this one points at
    pub fn referenced_quests(&self) -> impl Iterator<Item = QuestId> + '_ {
        self.prerequisites
            .iter()
            .chain(self.follow_up_quests.iter())
            .copied()
            .chain(self.rewards.unlock_quest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_objective_type_parsing() {
        assert_eq!(ObjectiveType::from_str("kill_enemy"), Some(ObjectiveType::KillEnemy));
        assert_eq!(ObjectiveType::from_str("KILL"), Some(ObjectiveType::KillEnemy));
        assert_eq!(ObjectiveType::from_str("talk_to_npc"), Some(ObjectiveType::TalkToNpc));
        assert_eq!(ObjectiveType::from_str("complete_dungeon"), Some(ObjectiveType::CompleteDungeon));
        assert_eq!(ObjectiveType::from_str("invalid"), None);
    }

    #[test]
    fn test_objective_progress_clamps() {
        let mut obj = Objective::new(1, ObjectiveType::KillEnemy).with_target(3).with_count(5);

        assert!(!obj.add_progress(3));
        assert_eq!(obj.current_count, 3);

        assert!(obj.add_progress(10));
        assert_eq!(obj.current_count, 5);
        assert!(obj.completed);

        // Can't add more after complete
        assert!(!obj.add_progress(1));
        assert_eq!(obj.current_count, 5);
    }

    #[test]
    fn test_binary_objective_completes_on_first_hit() {
        let mut obj = Objective::new(1, ObjectiveType::ReachLocation).with_target(9);
        assert!(obj.add_progress(1));
        assert_eq!(obj.current_count, 0);
    }

    #[test]
    fn test_matches_respects_target() {
        let obj = Objective::new(1, ObjectiveType::CollectItem).with_target(4).with_count(2);
        assert!(obj.matches(ObjectiveType::CollectItem, Some(4)));
        assert!(obj.matches(ObjectiveType::CollectItem, None));
        assert!(!obj.matches(ObjectiveType::CollectItem, Some(5)));
        assert!(!obj.matches(ObjectiveType::UseItem, Some(4)));

        let untargeted = Objective::new(2, ObjectiveType::LevelUp).with_count(1);
        assert!(!untargeted.matches(ObjectiveType::LevelUp, Some(3)));
    }

    #[test]
    fn test_fresh_clone_resets_completion() {
        let mut obj = Objective::new(1, ObjectiveType::CraftItem).with_count(2);
        obj.current_count = 7;
        obj.completed = true;

        let fresh = obj.fresh_clone();
        assert!(!fresh.completed);
        assert_eq!(fresh.current_count, 2);
    }

    #[test]
    fn test_from_raw_rejects_bad_objectives() {
        let raw: RawQuestFile = toml::from_str(
            r#"
[quest]
id = 7
name = "Broken"

[[quest.objectives]]
id = 1
type = "dance"
"#,
        )
        .unwrap();
        assert!(QuestDefinition::from_raw(&raw.quest).is_err());

        let raw: RawQuestFile = toml::from_str(
            r#"
[quest]
id = 8
name = "Empty"
"#,
        )
        .unwrap();
        assert!(QuestDefinition::from_raw(&raw.quest).is_err());
    }

    #[test]
    fn test_from_raw_full_quest() {
        let raw: RawQuestFile = toml::from_str(
            r#"
[quest]
id = 2
name = "The Rat Infestation"
type = "main"
level = 2
prerequisites = [1]
follow_up_quests = [3]

[[quest.objectives]]
id = 1
type = "kill_enemy"
target = 1
count = 5

[quest.rewards]
xp = 100
gold = 25
unlock_quest = 3

[[quest.rewards.items]]
id = 10
count = 2
"#,
        )
        .unwrap();

        let quest = QuestDefinition::from_raw(&raw.quest).unwrap();
        assert_eq!(quest.kind, QuestKind::Main);
        assert!(quest.prerequisites.contains(&1));
        assert_eq!(quest.objectives[0].target_count, Some(5));
        assert_eq!(quest.rewards.items, vec![ItemReward { item_id: 10, count: 2 }]);
        assert_eq!(quest.referenced_quests().collect::<Vec<_>>(), vec![1, 3, 3]);
    }
}
