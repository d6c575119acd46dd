use anyhow::Result;
use cadence_core::models::{Frequency, NewRecurringItem, UpdateRecurringItem};
use cadence_core::planner::{short_id, Planner};
use cadence_core::repository::Repository;
use chrono::Local;
use dialoguer::Confirm;
use owo_colors::OwoColorize;

use crate::cli::{
    RecurAddCommand, RecurCommand, RecurDeleteCommand, RecurEditCommand, RecurIdCommand, RecurListCommand,
    RecurPreviewCommand, RecurSubcommand,
};
use crate::parser::{build_pattern, parse_date};
use crate::views::table::{describe_schedule, display_occurrences, display_recurring_items};

pub async fn recur_command<R: Repository>(planner: &Planner<R>, user_id: &str, command: RecurCommand) -> Result<()> {
    match command.command {
        RecurSubcommand::Add(cmd) => add_item(planner, user_id, cmd).await,
        RecurSubcommand::List(cmd) => list_items(planner, user_id, cmd).await,
        RecurSubcommand::Preview(cmd) => preview_item(planner, user_id, cmd).await,
        RecurSubcommand::Edit(cmd) => edit_item(planner, user_id, cmd).await,
        RecurSubcommand::Pause(cmd) => set_active(planner, user_id, cmd, false).await,
        RecurSubcommand::Resume(cmd) => set_active(planner, user_id, cmd, true).await,
        RecurSubcommand::Delete(cmd) => delete_item(planner, user_id, cmd).await,
    }
}

async fn add_item<R: Repository>(planner: &Planner<R>, user_id: &str, cmd: RecurAddCommand) -> Result<()> {
    let frequency = Frequency::from(cmd.every);
    let pattern = build_pattern(frequency, cmd.on.as_deref(), cmd.day, cmd.month)?;
    let start_date = cmd
        .start
        .as_deref()
        .map(parse_date)
        .transpose()?
        .unwrap_or_else(|| Local::now().date_naive());
    let end_date = cmd.until.as_deref().map(parse_date).transpose()?;

    let item = planner
        .create_recurring_item(NewRecurringItem {
            user_id: user_id.to_string(),
            title: cmd.title,
            description: cmd.description,
            category_id: None,
            priority: cmd.priority,
            sections: cmd.section,
            pattern,
            start_date,
            end_date,
            due_offset_days: cmd.due_offset,
            look_ahead_count: cmd.look_ahead,
        })
        .await?;

    println!(
        "{} Created recurring item: '{}' ({})",
        "✓".green().bold(),
        item.title.cyan(),
        short_id(item.id).yellow()
    );
    println!("  Repeats {} starting {}", describe_schedule(&item), item.start_date);

    let upcoming = planner.preview_occurrences(item.id, 3).await?;
    if upcoming.is_empty() {
        println!("  {} No occurrences fall within the next year", "Warning:".yellow().bold());
    } else {
        let dates: Vec<String> = upcoming.iter().map(|d| d.format("%a %Y-%m-%d").to_string()).collect();
        println!("  Next: {}", dates.join(", "));
    }
    Ok(())
}

async fn list_items<R: Repository>(planner: &Planner<R>, user_id: &str, cmd: RecurListCommand) -> Result<()> {
    let items = planner.list_recurring_items(user_id, !cmd.all).await?;
    display_recurring_items(&items);
    Ok(())
}

async fn preview_item<R: Repository>(planner: &Planner<R>, user_id: &str, cmd: RecurPreviewCommand) -> Result<()> {
    let id = planner.resolve_recurring_item_id(user_id, &cmd.id).await?;
    let item = planner.get_recurring_item(id).await?;
    let dates = planner.preview_occurrences(id, cmd.count).await?;
    display_occurrences(&item, &dates);
    Ok(())
}

async fn edit_item<R: Repository>(planner: &Planner<R>, user_id: &str, cmd: RecurEditCommand) -> Result<()> {
    let id = planner.resolve_recurring_item_id(user_id, &cmd.id).await?;

    let description = if cmd.description_clear {
        Some(None)
    } else {
        cmd.description.map(Some)
    };
    let end_date = if cmd.until_clear {
        Some(None)
    } else {
        cmd.until.as_deref().map(parse_date).transpose()?.map(Some)
    };

    let update = UpdateRecurringItem {
        title: cmd.title,
        description,
        priority: cmd.priority,
        sections: cmd.section,
        end_date,
        due_offset_days: cmd.due_offset,
        look_ahead_count: cmd.look_ahead,
        ..Default::default()
    };

    let item = planner.update_recurring_item(id, update).await?;
    println!("{} Updated recurring item: '{}'", "✓".green().bold(), item.title.cyan());
    println!("  Changes apply to tasks generated from now on");
    Ok(())
}

async fn set_active<R: Repository>(planner: &Planner<R>, user_id: &str, cmd: RecurIdCommand, active: bool) -> Result<()> {
    let id = planner.resolve_recurring_item_id(user_id, &cmd.id).await?;
    let item = planner.get_recurring_item(id).await?;

    // Pausing is repeatable: every pause clears the unfinished tasks.
    if active && item.active {
        println!("{} Recurring item is already active", "Info:".yellow().bold());
        return Ok(());
    }
    let was_paused = !item.active;

    let update = UpdateRecurringItem {
        active: Some(active),
        ..Default::default()
    };
    let item = planner.update_recurring_item(id, update).await?;

    if active {
        println!("{} '{}' has been resumed", "Success:".green().bold(), item.title);
    } else if was_paused {
        println!("{} Recurring item is already paused", "Info:".yellow().bold());
    } else {
        println!("{} '{}' has been paused; its unfinished tasks were removed", "Success:".green().bold(), item.title);
    }
    Ok(())
}

async fn delete_item<R: Repository>(planner: &Planner<R>, user_id: &str, cmd: RecurDeleteCommand) -> Result<()> {
    let id = planner.resolve_recurring_item_id(user_id, &cmd.id).await?;
    let item = planner.get_recurring_item(id).await?;

    if !cmd.force {
        let confirmation = Confirm::new()
            .with_prompt(format!(
                "Delete recurring item '{}' and its unfinished tasks?",
                item.title
            ))
            .default(false)
            .interact()
            .unwrap_or(false);

        if !confirmation {
            println!("Deletion cancelled.");
            return Ok(());
        }
    }

    let removed = planner.delete_recurring_item(id).await?;
    println!("Deleted recurring item '{}' and {} unfinished task(s)", item.title, removed);
    Ok(())
}
