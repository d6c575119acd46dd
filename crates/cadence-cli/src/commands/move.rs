use anyhow::Result;
use cadence_core::planner::Planner;
use cadence_core::reorder::{apply_locally, resolve_reorder, ListSnapshot, ReorderOutcome};
use cadence_core::repository::Repository;
use owo_colors::OwoColorize;

use crate::cli::MoveCommand;
use crate::views::table::display_tasks;

pub async fn move_task<R: Repository>(planner: &Planner<R>, user_id: &str, command: MoveCommand) -> Result<()> {
    let task_id = planner.resolve_task_id(user_id, &command.id).await?;
    let task = planner.get_task(task_id).await?;
    let new_index = command.to.saturating_sub(1);

    // Show the new order right away and put the old one back if the write fails.
    let mut list = planner.list_scope(user_id, task.scheduled_date).await?;
    let snapshot = ListSnapshot::capture(&list);
    let local = resolve_reorder(&list, task_id, new_index)?;
    apply_locally(&mut list, task_id, &local);

    match planner.move_task(task_id, new_index).await {
        Ok(outcome) => {
            if matches!(outcome, ReorderOutcome::Rebalance(_)) {
                println!("{} Positions for this day were renumbered", "Info:".yellow().bold());
            }
            println!("Moved '{}' to position {}", task.title, new_index.min(list.len().saturating_sub(1)) + 1);
            display_tasks(&list);
            Ok(())
        }
        Err(e) => {
            snapshot.restore(&mut list);
            eprintln!("{} Move was not saved; order left as it was", "Warning:".yellow().bold());
            display_tasks(&list);
            Err(e.into())
        }
    }
}
