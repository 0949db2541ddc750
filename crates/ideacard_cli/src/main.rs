//! CLI probe for `ideacard_core`.
//!
//! # Responsibility
//! - Wire config, logging and storage explicitly, run one read use-case,
//!   print the result as JSON and close the database.
//!
//! Usage: `ideacard_cli [ping|active|deleted|card <id>|history <id>|timeline [start] [end]]`

use ideacard_core::db::{close_db, open_db};
use ideacard_core::{init_logging_from_config, CardService, CoreConfig, SqliteCardStore};
use log::info;
use serde::Serialize;
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), Box<dyn Error>> {
    let command = args.first().map(String::as_str).unwrap_or("ping");
    if command == "ping" {
        println!("ideacard_core ping={}", ideacard_core::ping());
        println!("ideacard_core version={}", ideacard_core::core_version());
        return Ok(());
    }

    let config = CoreConfig::from_env()?;
    init_logging_from_config(&config)?;

    let mut conn = open_db(&config.db_path)?;
    let output = {
        let store = SqliteCardStore::try_new(&mut conn)?;
        let service = CardService::new(store).with_limits(config.limits);
        let arg = |index: usize| args.get(index).map(String::as_str);

        match command {
            "active" => to_json(&service.list_active()?)?,
            "deleted" => to_json(&service.list_deleted()?)?,
            "card" => to_json(&service.get_card(required(arg(1), "card id")?)?)?,
            "history" => to_json(&service.get_history(required(arg(1), "card id")?)?)?,
            "timeline" => to_json(&service.get_timeline_iso(arg(1), arg(2))?)?,
            other => return Err(format!("unknown command `{other}`").into()),
        }
    };
    println!("{output}");

    info!("event=cli_done module=cli status=ok command={command}");
    close_db(conn)?;
    Ok(())
}

fn required<'a>(value: Option<&'a str>, what: &str) -> Result<&'a str, String> {
    value.ok_or_else(|| format!("missing {what}"))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}
