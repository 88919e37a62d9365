use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use quest_engine::config::Config;
use quest_engine::db::SaveStore;
use quest_engine::quest::{
    GameplayEvent, ObjectiveId, ObjectiveType, QuestCatalog, QuestEvent, QuestId, QuestManager, TargetId,
};

#[derive(Parser, Debug)]
#[command(name = "quest-engine", about = "Headless quest progression driver")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

/// One line of stdin
#[derive(Debug, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum Command {
    Accept {
        quest: QuestId,
    },
    Progress {
        objective: String,
        target: Option<TargetId>,
        #[serde(default = "one")]
        count: u32,
    },
    Event {
        event: GameplayEvent,
    },
    CompleteObjective {
        quest: QuestId,
        objective: ObjectiveId,
    },
    TurnIn {
        quest: QuestId,
    },
    Fail {
        quest: QuestId,
    },
    Status,
    Save,
    Reset,
}

fn one() -> u32 {
    1
}

fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string(value) {
        Ok(line) => println!("{line}"),
        Err(e) => error!("Failed to encode output: {}", e),
    }
}

async fn save(store: &SaveStore, slot: &str, manager: &QuestManager) {
    match store.save(slot, &manager.save_quest_state()).await {
        Ok(()) => info!("Saved quest state to slot '{}'", slot),
        Err(e) => error!("Failed to save quest state: {}", e),
    }
}

async fn handle_command(manager: &mut QuestManager, store: &SaveStore, slot: &str, command: Command) {
    match command {
        Command::Accept { quest } => {
            manager.accept_quest(quest);
        }
        Command::Progress { objective, target, count } => match ObjectiveType::from_str(&objective) {
            Some(objective_type) => manager.update_progress(objective_type, target, count),
            None => warn!("Unknown objective type '{}'", objective),
        },
        Command::Event { event } => manager.handle_gameplay_event(&event),
        Command::CompleteObjective { quest, objective } => {
            manager.complete_objective(quest, objective);
        }
        Command::TurnIn { quest } => {
            manager.turn_in_quest(quest);
        }
        Command::Fail { quest } => {
            manager.fail_quest(quest);
        }
        Command::Status => {
            let status: Vec<_> = manager
                .catalog()
                .ids()
                .filter_map(|id| manager.quest_status(id).map(|s| (id, s)))
                .collect();
            print_json(&serde_json::json!({
                "status": status,
                "progress": manager.state().quest_progress.values().collect::<Vec<_>>(),
            }));
        }
        Command::Save => save(store, slot, manager).await,
        Command::Reset => {
            manager.reset_all_quests();
            manager.check_auto_accept();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load(&args.config)?;

    let rust_log = std::env::var(tracing_subscriber::EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(config.env_filter(rust_log.as_deref())?)
        .with_writer(std::io::stderr)
        .init();

    let catalog = QuestCatalog::load_from_directory(&config.data_dir)
        .context("Failed to load quest catalog")?;

    let store = SaveStore::open(&config.save)
        .await
        .context("Failed to open save store")?;
    let slot = config.save.slot.as_str();

    let emitted: Rc<RefCell<Vec<QuestEvent>>> = Rc::new(RefCell::new(Vec::new()));
    let mut manager = QuestManager::new(Arc::new(catalog));
    let sink = emitted.clone();
    manager.subscribe_all(move |event| sink.borrow_mut().push(event.clone()));

    match store.load(slot).await {
        Ok(Some(state)) => {
            manager.load_quest_state(state);
            manager.check_auto_accept();
        }
        Ok(None) => info!("No save in slot '{}', starting fresh", slot),
        Err(e) => error!("Failed to load quest state, keeping fresh state: {}", e),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command: Command = match serde_json::from_str(line) {
            Ok(command) => command,
            Err(e) => {
                warn!("Ignoring malformed command '{}': {}", line, e);
                continue;
            }
        };

        handle_command(&mut manager, &store, slot, command).await;

        for event in emitted.borrow_mut().drain(..) {
            print_json(&event);
        }
    }

    save(&store, slot, &manager).await;
    Ok(())
}
