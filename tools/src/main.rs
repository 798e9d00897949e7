//! desk-runner: headless JSON-lines driver for the review desk.
//!
//! Usage:
//!   desk-runner --data-dir ./data --db desk.db < commands.jsonl
//!
//! Each stdin line is one JSON object. Desk operations use the
//! `DeskCommand` shape (`{"cmd": "assign_reviewer", ...}`); the runner
//! adds `seed_work_item`, `work_item_owner` and `quit`.

use anyhow::Result;
use review_desk_core::{
    clock::SystemClock,
    command::DeskCommand,
    config::DeskConfig,
    engine::DeskEngine,
    ledger::SqliteLedger,
    response::ApiResponse,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

#[derive(serde::Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
enum RunnerCommand {
    SeedWorkItem { item_id: String, reviewer_id: String },
    WorkItemOwner { item_id: String },
    Quit,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = arg_value(&args, "--db").unwrap_or(":memory:");
    let data_dir = arg_value(&args, "--data-dir");

    let config = match data_dir {
        Some(dir) => DeskConfig::load(dir)?,
        None => DeskConfig::default(),
    };

    let ledger = Arc::new(if db == ":memory:" {
        SqliteLedger::in_memory()?
    } else {
        SqliteLedger::open(db)?
    });
    ledger.migrate()?;

    log::info!("desk-runner: db={db} data_dir={}", data_dir.unwrap_or("(defaults)"));
    let engine = DeskEngine::with_ledger(config, Arc::new(SystemClock), Arc::clone(&ledger));

    run_loop(&engine, &ledger)
}

fn run_loop(engine: &DeskEngine, ledger: &SqliteLedger) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let value: serde_json::Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                writeln!(stdout, "{}", serde_json::json!({ "success": false, "error": e.to_string() }))?;
                stdout.flush()?;
                continue;
            }
        };

        let response = if let Ok(cmd) = serde_json::from_value::<RunnerCommand>(value.clone()) {
            match cmd {
                RunnerCommand::Quit => break,
                RunnerCommand::SeedWorkItem { item_id, reviewer_id } => {
                    ApiResponse::from(ledger.assign_work_item(&item_id, &reviewer_id, engine.now()))
                        .into_json()
                }
                RunnerCommand::WorkItemOwner { item_id } => {
                    ApiResponse::from(ledger.work_item_owner(&item_id)).into_json()
                }
            }
        } else {
            match serde_json::from_value::<DeskCommand>(value) {
                Ok(cmd) => engine.execute(cmd),
                Err(e) => {
                    log::warn!("desk-runner: unrecognised command: {e}");
                    ApiResponse {
                        success: false,
                        data:    None,
                        error:   Some(e.to_string()),
                        code:    None,
                    }
                }
            }
        };

        writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
        stdout.flush()?;
    }
    Ok(())
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
