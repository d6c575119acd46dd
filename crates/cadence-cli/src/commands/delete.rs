use anyhow::Result;
use cadence_core::planner::Planner;
use cadence_core::repository::Repository;
use dialoguer::Confirm;

use crate::cli::DeleteCommand;

pub async fn delete_task<R: Repository>(planner: &Planner<R>, user_id: &str, command: DeleteCommand) -> Result<()> {
    let task_id = planner.resolve_task_id(user_id, &command.id).await?;
    let task = planner.get_task(task_id).await?;

    if !command.force {
        let confirmation = Confirm::new()
            .with_prompt(format!("Are you sure you want to delete task '{}'?", task.title))
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirmation {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    planner.delete_task(task_id).await?;
    println!("Deleted task: '{}'", task.title);
    Ok(())
}
