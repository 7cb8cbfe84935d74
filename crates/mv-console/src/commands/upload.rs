//! Archive upload and management.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use mv_client::{TaskProgressWatcher, WsClient, WsConfig};
use mv_protocol::ws::MessageType;

use crate::output::{human_size, local_time, progress_line};
use crate::Ctx;

/// Single-request uploads above this size switch to the chunked path.
const CHUNKED_THRESHOLD_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Args)]
pub struct UploadArgs {
    pub path: PathBuf,
    /// Force the chunked upload path regardless of file size
    #[arg(long)]
    pub chunked: bool,
    /// Follow processing over the event channel until it finishes
    #[arg(long)]
    pub watch: bool,
}

#[derive(Subcommand)]
pub enum FilesCommand {
    /// List uploaded archives
    List,
    /// Show one archive
    Show { id: String },
    /// Delete an archive and its extracted emails
    Rm { id: String },
}

pub async fn upload(ctx: &Ctx, args: UploadArgs) -> anyhow::Result<()> {
    let size = tokio::fs::metadata(&args.path).await?.len();
    println!(
        "Uploading {} ({})",
        args.path.display(),
        human_size(size)
    );

    let accepted = if args.chunked || size > CHUNKED_THRESHOLD_BYTES {
        ctx.api.upload_pst_chunked(&args.path).await?
    } else {
        ctx.api.upload_pst(&args.path).await?
    };
    println!(
        "Accepted: file {} task {}",
        accepted.pst_file_id, accepted.task_id
    );

    if args.watch {
        watch_task(ctx, &accepted.task_id).await?;
    } else {
        println!("Follow with: mailvault tasks watch {}", accepted.task_id);
    }
    Ok(())
}

/// Follow a task over the event channel until it reaches a terminal state.
pub async fn watch_task(ctx: &Ctx, task_id: &str) -> anyhow::Result<()> {
    let client = WsClient::new(WsConfig::from_config(&ctx.config), ctx.tokens.clone());
    let watcher = TaskProgressWatcher::new(client.clone());
    watcher.set_task(Some(task_id));
    let _notifications = client.on(MessageType::Notification, |msg| {
        if let Some(text) = msg.data.get("message").and_then(|v| v.as_str()) {
            eprintln!("\n[server] {text}");
        }
        Ok(())
    });
    client.connect();

    let mut rx = watcher.watch();
    loop {
        rx.changed().await?;
        let snapshot = rx.borrow_and_update().clone();
        let Some(progress) = snapshot else { continue };
        progress_line(&format!(
            "[{:>3.0}%] {} {}",
            progress.progress, progress.status, progress.message
        ));
        if progress.is_finished() {
            println!();
            if progress.is_failed {
                anyhow::bail!("task {task_id} failed: {}", progress.message);
            }
            println!("Task {task_id} completed");
            break;
        }
    }
    client.disconnect();
    Ok(())
}

pub async fn files(ctx: &Ctx, cmd: FilesCommand) -> anyhow::Result<()> {
    match cmd {
        FilesCommand::List => {
            let files = ctx.api.list_pst_files().await?;
            for f in files {
                println!(
                    "{}  {:<30} {:>10}  {:<10} {} emails  {}",
                    f.id,
                    f.original_filename,
                    human_size(f.file_size),
                    f.status,
                    f.email_count,
                    local_time(f.created_at),
                );
            }
        }
        FilesCommand::Show { id } => {
            let f = ctx.api.get_pst_file(&id).await?;
            println!("{:#?}", f);
        }
        FilesCommand::Rm { id } => {
            ctx.api.delete_pst_file(&id).await?;
            println!("Deleted {id}");
        }
    }
    Ok(())
}
