//! Dashboard statistics.

use crate::output::human_size;
use crate::Ctx;

pub async fn run(ctx: &Ctx) -> anyhow::Result<()> {
    let stats = ctx.api.dashboard_stats().await?;
    println!("emails:            {}", stats.total_emails);
    println!("  with attachments {}", stats.emails_with_attachments);
    println!("attachments:       {}", stats.total_attachments);
    println!("archives:          {}", stats.total_pst_files);
    println!("tasks:             {} done, {} running", stats.completed_tasks, stats.processing_tasks);
    println!("storage:           {}", human_size(stats.storage_used));
    Ok(())
}
