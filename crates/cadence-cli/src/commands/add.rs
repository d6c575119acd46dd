use anyhow::Result;
use cadence_core::models::NewTask;
use cadence_core::planner::{short_id, Planner};
use cadence_core::repository::Repository;
use owo_colors::{OwoColorize, Style};

use crate::cli::AddCommand;
use crate::parser::parse_date;

pub async fn add_task<R: Repository>(planner: &Planner<R>, user_id: &str, command: AddCommand) -> Result<()> {
    let scheduled_date = command.on.as_deref().map(parse_date).transpose()?;
    let due_date = command.due.as_deref().map(parse_date).transpose()?;

    let task = planner
        .add_task(NewTask {
            user_id: user_id.to_string(),
            title: command.title,
            description: command.description,
            category_id: None,
            priority: command.priority,
            sections: command.section,
            scheduled_date,
            due_date,
        })
        .await?;

    let success_style = Style::new().green().bold();
    println!(
        "{} Created task: '{}' ({})",
        "✓".style(success_style),
        task.title.cyan(),
        short_id(task.id).yellow()
    );
    match task.scheduled_date {
        Some(date) => println!("  Planned for {}", date.format("%a %Y-%m-%d")),
        None => println!("  Unscheduled"),
    }
    Ok(())
}
