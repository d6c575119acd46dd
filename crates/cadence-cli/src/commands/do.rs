use anyhow::Result;
use cadence_core::planner::Planner;
use cadence_core::repository::Repository;
use owo_colors::OwoColorize;

use crate::cli::DoCommand;

pub async fn do_task<R: Repository>(planner: &Planner<R>, user_id: &str, command: DoCommand) -> Result<()> {
    let task_id = planner.resolve_task_id(user_id, &command.id).await?;
    let task = planner.complete_task(task_id, !command.undo).await?;

    if task.completed {
        println!("{} Completed task: '{}'", "✓".green().bold(), task.title);
    } else {
        println!("Reopened task: '{}'", task.title);
    }
    Ok(())
}
