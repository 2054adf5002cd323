//! Command execution.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::info;

use super::args::{Cli, Commands};
use crate::api::Api;
use crate::config::Config;
use crate::extract::CommandResponse;
use crate::models::{Status, TimeSlot};

pub async fn execute(cli: Cli) -> Result<()> {
    let config = Arc::new(Config::from_env()?);
    let api = Api::new(Arc::clone(&config))?;
    let result = run(&cli, &api).await;
    api.close();
    result
}

async fn run(cli: &Cli, api: &Api) -> Result<()> {
    match &cli.command {
        Commands::Week { offset } => {
            let slots = api
                .fetch_week(*offset)
                .await
                .with_context(|| format!("failed to fetch week {offset}"))?;
            print_slots(&slots, cli.json)
        }
        Commands::Bookings => {
            let slots = api.bookings().await.context("failed to list bookings")?;
            print_slots(&slots, cli.json)
        }
        Commands::Book {
            group_id,
            pass_number,
            date,
        } => {
            let response = api
                .book(*group_id, *pass_number, *date)
                .await
                .context("book command failed")?;
            print_response(&response, cli.json)
        }
        Commands::Unbook {
            group_id,
            pass_number,
            date,
        } => {
            let response = api
                .unbook(*group_id, *pass_number, *date)
                .await
                .context("unbook command failed")?;
            print_response(&response, cli.json)
        }
        Commands::Auto { weeks } => auto_book(api, *weeks, cli.json).await,
    }
}

/// Scan the coming weeks and take the first slot that is open for booking.
async fn auto_book(api: &Api, weeks: i64, json: bool) -> Result<()> {
    for offset in 0..weeks {
        let slots = api
            .fetch_week(offset)
            .await
            .with_context(|| format!("failed to fetch week {offset}"))?;
        if let Some(slot) = slots.iter().find(|s| s.status == Status::Available) {
            info!(
                group_id = slot.group_id,
                pass_number = slot.pass_number,
                start = %slot.start,
                "booking the first available slot"
            );
            let response = api.book_slot(slot).await.context("book command failed")?;
            return print_response(&response, json);
        }
    }
    bail!("no available slot within {weeks} week(s)")
}

fn print_slots(slots: &[TimeSlot], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(slots)?);
        return Ok(());
    }
    if slots.is_empty() {
        println!("no slots");
        return Ok(());
    }
    for slot in slots {
        println!(
            "w{:02}  {} {}-{}  group {:>3}  pass {:>3}  {}",
            slot.week.week,
            slot.start.format("%Y-%m-%d"),
            slot.start.format("%H:%M"),
            slot.end.format("%H:%M"),
            slot.group_id,
            slot.pass_number,
            slot.status,
        );
    }
    Ok(())
}

fn print_response(response: &CommandResponse, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }
    match response {
        CommandResponse::Success { action, raw_action } => {
            println!("ok: {action} ({raw_action})");
            Ok(())
        }
        CommandResponse::Rejected { kind, message, .. } => {
            bail!("rejected ({kind}): {message}")
        }
    }
}
