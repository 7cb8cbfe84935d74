//! Forensic queries.

use chrono::{DateTime, Utc};
use clap::Subcommand;

use mv_client::AuditLogFilter;

use crate::output::{human_size, local_time};
use crate::Ctx;

#[derive(Subcommand)]
pub enum ForensicCommand {
    /// Browse the audit trail
    Audit {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 50)]
        page_size: u32,
        #[arg(long)]
        action: Option<String>,
        #[arg(long)]
        resource_type: Option<String>,
        #[arg(long)]
        user_id: Option<String>,
    },
    /// List registered evidence files
    Evidence,
    /// Re-verify an evidence file's hashes
    Verify { id: String },
    /// Message timeline across archives
    Timeline {
        #[arg(long = "file")]
        pst_file_ids: Vec<String>,
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        #[arg(long)]
        to: Option<DateTime<Utc>>,
    },
    /// Header and routing analysis for one email
    Analyze { email_id: String },
}

pub async fn run(ctx: &Ctx, cmd: ForensicCommand) -> anyhow::Result<()> {
    match cmd {
        ForensicCommand::Audit {
            page,
            page_size,
            action,
            resource_type,
            user_id,
        } => {
            let filter = AuditLogFilter {
                action,
                resource_type,
                user_id,
            };
            let logs = ctx.api.audit_logs(page, page_size, &filter).await?;
            for entry in &logs.items {
                println!(
                    "{}  {:<24} {:<16} {:<12} {}",
                    local_time(entry.created_at),
                    entry.user_email,
                    entry.action,
                    entry.resource_type,
                    entry.resource_id.as_deref().unwrap_or("-"),
                );
            }
            println!("page {}/{} — {} entries", logs.page, logs.total_pages, logs.total);
        }
        ForensicCommand::Evidence => {
            for e in ctx.api.evidence().await? {
                let verified = if e.is_verified { "verified" } else { "UNVERIFIED" };
                println!(
                    "{}  {:<30} {:>10}  {}  sha256:{}",
                    e.id,
                    e.filename,
                    human_size(e.file_size),
                    verified,
                    &e.sha256_hash[..12.min(e.sha256_hash.len())],
                );
                for custody in &e.chain_of_custody {
                    println!(
                        "    {}  {}  {}",
                        local_time(custody.timestamp),
                        custody.user_email,
                        custody.action
                    );
                }
            }
        }
        ForensicCommand::Verify { id } => {
            let result = ctx.api.verify_evidence(&id).await?;
            if result.is_valid {
                println!("VALID: {}", result.message);
            } else {
                anyhow::bail!("INVALID: {}", result.message);
            }
        }
        ForensicCommand::Timeline {
            pst_file_ids,
            from,
            to,
        } => {
            for event in ctx.api.timeline(&pst_file_ids, from, to).await? {
                println!(
                    "{}  {:<10} {}  {} -> {}",
                    local_time(event.date_sent),
                    event.event_type,
                    event.subject,
                    event.sender,
                    event.recipients.join(", "),
                );
            }
        }
        ForensicCommand::Analyze { email_id } => {
            let analysis = ctx.api.analyze_email(&email_id).await?;
            println!("email {}", analysis.email_id);
            println!(
                "spf: {}  dkim: {}  dmarc: {}",
                analysis.spf_result.as_deref().unwrap_or("n/a"),
                analysis.dkim_result.as_deref().unwrap_or("n/a"),
                analysis.dmarc_result.as_deref().unwrap_or("n/a"),
            );
            if !analysis.routing_path.is_empty() {
                println!("routing:");
                for hop in &analysis.routing_path {
                    println!("  {hop}");
                }
            }
            if !analysis.anomalies.is_empty() {
                println!("anomalies:");
                for anomaly in &analysis.anomalies {
                    println!("  ! {anomaly}");
                }
            }
        }
    }
    Ok(())
}
