//! Processing-task commands.

use clap::Subcommand;

use crate::Ctx;

#[derive(Subcommand)]
pub enum TasksCommand {
    /// Show a task's current state
    Status { task_id: String },
    /// Follow a task live over the event channel
    Watch { task_id: String },
    /// Request cancellation
    Cancel { task_id: String },
}

pub async fn run(ctx: &Ctx, cmd: TasksCommand) -> anyhow::Result<()> {
    match cmd {
        TasksCommand::Status { task_id } => {
            let task = ctx.api.task_status(&task_id).await?;
            println!(
                "{} [{}] {}% {}",
                task.id,
                task.status,
                task.progress,
                task.message.as_deref().unwrap_or("")
            );
            if let Some(error) = task.error {
                println!("error: {error}");
            }
        }
        TasksCommand::Watch { task_id } => {
            super::upload::watch_task(ctx, &task_id).await?;
        }
        TasksCommand::Cancel { task_id } => {
            ctx.api.cancel_task(&task_id).await?;
            println!("Cancellation requested for {task_id}");
        }
    }
    Ok(())
}
