use anyhow::Result;
use cadence_core::planner::Planner;
use cadence_core::repository::Repository;
use chrono::{Days, Local, NaiveDate};
use owo_colors::OwoColorize;

use crate::cli::ListCommand;
use crate::config::Config;
use crate::parser::parse_date;
use crate::views::table::display_tasks;

pub async fn list_tasks<R: Repository>(planner: &Planner<R>, config: &Config, command: ListCommand) -> Result<()> {
    if command.unscheduled {
        let tasks = planner.list_scope(&config.user_id, None).await?;
        display_tasks(&tasks);
        return Ok(());
    }

    let today = Local::now().date_naive();
    let start = command.from.as_deref().map(parse_date).transpose()?.unwrap_or(today);
    let days = command.days.unwrap_or(config.default_days).max(1);
    let end = start
        .checked_add_days(Days::new(u64::from(days) - 1))
        .unwrap_or(NaiveDate::MAX);

    let (tasks, report) = planner.list_range(&config.user_id, start, end, today).await?;
    if report.items_with_errors > 0 {
        eprintln!(
            "{} {} recurring item(s) could not be brought up to date; run with CADENCE_LOG=warn for details",
            "Warning:".yellow().bold(),
            report.items_with_errors
        );
    }

    display_tasks(&tasks);
    Ok(())
}
