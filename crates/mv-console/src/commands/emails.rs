//! Email browsing commands.

use std::path::PathBuf;

use clap::Subcommand;

use crate::output::{human_size, local_time};
use crate::Ctx;

#[derive(Subcommand)]
pub enum EmailsCommand {
    /// List archived emails
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        page_size: u32,
        #[arg(long)]
        file: Option<String>,
    },
    /// Show one email in full
    Show { id: String },
    /// List an email's attachments
    Attachments { id: String },
    /// Download one attachment
    Download {
        email_id: String,
        attachment_id: String,
        /// Target path; defaults to the attachment's filename
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show the conversation an email belongs to
    Thread { conversation_id: String },
}

pub async fn run(ctx: &Ctx, cmd: EmailsCommand) -> anyhow::Result<()> {
    match cmd {
        EmailsCommand::List {
            page,
            page_size,
            file,
        } => {
            let listing = ctx.api.list_emails(page, page_size, file.as_deref()).await?;
            for email in &listing.items {
                let flag = if email.has_attachments { "📎" } else { "  " };
                println!(
                    "{}  {}  {} {}  {}",
                    email.id,
                    local_time(email.date_sent),
                    flag,
                    email.subject,
                    email.sender,
                );
            }
            println!(
                "page {}/{} — {} emails",
                listing.page, listing.total_pages, listing.total
            );
        }
        EmailsCommand::Show { id } => {
            let email = ctx.api.get_email(&id).await?;
            println!("Subject: {}", email.subject);
            println!(
                "From:    {} {}",
                email.sender,
                email.sender_name.as_deref().unwrap_or("")
            );
            println!("To:      {}", email.recipients.join(", "));
            if !email.cc.is_empty() {
                println!("Cc:      {}", email.cc.join(", "));
            }
            println!("Date:    {}", local_time(email.date_sent));
            println!();
            if let Some(body) = email.body_text.as_deref() {
                println!("{body}");
            }
        }
        EmailsCommand::Attachments { id } => {
            for a in ctx.api.email_attachments(&id).await? {
                println!(
                    "{}  {:<40} {:>10}  {}",
                    a.id,
                    a.filename,
                    human_size(a.size),
                    a.content_type
                );
            }
        }
        EmailsCommand::Download {
            email_id,
            attachment_id,
            out,
        } => {
            let attachments = ctx.api.email_attachments(&email_id).await?;
            let meta = attachments
                .iter()
                .find(|a| a.id == attachment_id)
                .ok_or_else(|| anyhow::anyhow!("no attachment {attachment_id} on {email_id}"))?;
            let target = out.unwrap_or_else(|| PathBuf::from(&meta.filename));
            let bytes = ctx.api.download_attachment(&email_id, &attachment_id).await?;
            tokio::fs::write(&target, &bytes).await?;
            println!("Wrote {} ({})", target.display(), human_size(bytes.len() as u64));
        }
        EmailsCommand::Thread { conversation_id } => {
            for email in ctx.api.email_thread(&conversation_id).await? {
                println!(
                    "{}  {}  {}",
                    local_time(email.date_sent),
                    email.sender,
                    email.subject
                );
            }
        }
    }
    Ok(())
}
