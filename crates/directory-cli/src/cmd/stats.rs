//! Usage statistics command

use anyhow::Result;
use comfy_table::Table;
use comfy_table::presets::UTF8_FULL_CONDENSED;

use super::context::Context;

/// Print recorded usage counts
pub async fn stats(ctx: &Context, json: bool) -> Result<()> {
    let counts = ctx.db.usage_counts().await?;

    if json {
        let rows: Vec<_> = counts
            .iter()
            .map(|c| {
                serde_json::json!({
                    "date": c.date,
                    "kind": c.kind,
                    "app_id": c.app_id,
                    "count": c.count,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if counts.is_empty() {
        println!("No usage recorded yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["Date", "Event", "App", "Count"]);
    for count in &counts {
        table.add_row(vec![
            count.date.clone(),
            count.kind.clone(),
            count.app_id.clone(),
            count.count.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}
