//! Search commands.

use clap::Args;

use mv_protocol::rest::{SearchFilters, SearchQuery};

use crate::output::local_time;
use crate::Ctx;

#[derive(Args)]
pub struct SearchArgs {
    /// Free-text query; omit with --history to list past queries
    pub query: Option<String>,
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long, default_value_t = 20)]
    pub page_size: u32,
    /// Restrict to specific archives
    #[arg(long = "file")]
    pub pst_file_ids: Vec<String>,
    #[arg(long)]
    pub sender: Option<String>,
    #[arg(long)]
    pub has_attachments: bool,
    /// Use the advanced query parser
    #[arg(long)]
    pub advanced: bool,
    /// Show recent queries instead of searching
    #[arg(long)]
    pub history: bool,
    /// Clear the stored query history
    #[arg(long)]
    pub clear_history: bool,
}

pub async fn run(ctx: &Ctx, args: SearchArgs) -> anyhow::Result<()> {
    if args.clear_history {
        ctx.api.clear_search_history().await?;
        println!("Search history cleared");
        return Ok(());
    }
    if args.history {
        for query in ctx.api.search_history().await? {
            println!("{query}");
        }
        return Ok(());
    }

    let Some(query) = args.query else {
        anyhow::bail!("a query is required unless --history or --clear-history is given");
    };

    let filters = SearchFilters {
        pst_file_ids: (!args.pst_file_ids.is_empty()).then(|| args.pst_file_ids.clone()),
        sender: args.sender.clone(),
        has_attachments: args.has_attachments.then_some(true),
        ..Default::default()
    };
    let has_filters = filters.pst_file_ids.is_some()
        || filters.sender.is_some()
        || filters.has_attachments.is_some();
    let request = SearchQuery {
        query,
        filters: has_filters.then_some(filters),
        page: Some(args.page),
        page_size: Some(args.page_size),
    };

    let results = if args.advanced {
        ctx.api.advanced_search(&request).await?
    } else {
        ctx.api.search(&request).await?
    };

    for email in &results.emails {
        println!(
            "{}  {}  {:<40}  {}",
            email.id,
            local_time(email.date_sent),
            truncate(&email.subject, 40),
            email.sender,
        );
        println!("      {}", truncate(&email.preview, 100));
    }
    println!(
        "page {}/{} — {} results in {:.0} ms",
        results.page, results.total_pages, results.total, results.query_time_ms
    );
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
