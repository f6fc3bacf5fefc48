use anyhow::Result;
use comfy_table::{Cell, Table};
use solace_ai::MemoryRecord;

use crate::cli::MemoriesArgs;
use crate::output::json::print_json;
use crate::setup::{Devices, build_session};
use solace_core::Settings;

pub async fn run(settings: &Settings, args: MemoriesArgs) -> Result<()> {
    let session = build_session(settings, Devices::default()).await?;
    let records = session.memories(args.limit).await?;

    if args.format.is_json() {
        return print_json(&records);
    }

    if records.is_empty() {
        println!("No memories stored for {}.", session.user_id());
        return Ok(());
    }
    println!("{}", memory_table(&records));
    Ok(())
}

fn memory_table(records: &[MemoryRecord]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Memory", "Score"]);
    for record in records {
        table.add_row(vec![
            Cell::new(&record.id),
            Cell::new(&record.memory),
            Cell::new(
                record
                    .score
                    .map(|score| format!("{score:.2}"))
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ]);
    }
    table
}
