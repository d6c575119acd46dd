use cadence_core::models::{Frequency, TaskPriority};
use clap::{Parser, Subcommand, ValueEnum};

use crate::parser::parse_priority;

/// A planner whose recurring tasks appear on their own, day by day
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Add a new task
    Add(AddCommand),
    /// List tasks for a range of days
    List(ListCommand),
    /// Move a task within its day
    Move(MoveCommand),
    /// Mark a task as completed
    Do(DoCommand),
    /// Delete a task
    Delete(DeleteCommand),
    /// Manage recurring items
    Recur(RecurCommand),
}

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    /// The title of the task
    pub title: String,
    /// The description of the task
    #[clap(short, long)]
    pub description: Option<String>,
    /// Day the task is planned for (e.g. 'today', 'next friday', '2025-03-01')
    #[clap(long)]
    pub on: Option<String>,
    /// The due date of the task
    #[clap(long)]
    pub due: Option<String>,
    /// The priority of the task (none, low, medium, high)
    #[clap(long, value_parser = parse_priority)]
    pub priority: Option<TaskPriority>,
    /// Sections to file the task under
    #[clap(short, long)]
    pub section: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct ListCommand {
    /// First day to show (defaults to today)
    #[clap(long)]
    pub from: Option<String>,
    /// Number of days to show
    #[clap(long)]
    pub days: Option<u32>,
    /// Show unscheduled tasks instead of a date range
    #[clap(long, conflicts_with_all = ["from", "days"])]
    pub unscheduled: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct MoveCommand {
    /// The ID of the task to move
    pub id: String,
    /// New place in the day's list, starting at 1
    pub to: usize,
}

#[derive(Parser, Debug, Clone)]
pub struct DoCommand {
    /// The ID of the task to mark as completed
    pub id: String,
    /// Mark the task as not done instead
    #[clap(long)]
    pub undo: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct DeleteCommand {
    /// The ID of the task to delete
    pub id: String,
    /// Force deletion without confirmation
    #[clap(short, long)]
    pub force: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct RecurCommand {
    #[command(subcommand)]
    pub command: RecurSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RecurSubcommand {
    /// Create a recurring item
    Add(RecurAddCommand),
    /// List recurring items
    List(RecurListCommand),
    /// Show the next N occurrence dates
    Preview(RecurPreviewCommand),
    /// Edit a recurring item's template or end date
    Edit(RecurEditCommand),
    /// Stop generating tasks and remove unfinished ones
    Pause(RecurIdCommand),
    /// Start generating tasks again
    Resume(RecurIdCommand),
    /// Delete a recurring item and its unfinished tasks
    Delete(RecurDeleteCommand),
}

/// How often a recurring item repeats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Every {
    /// Every day
    Daily,
    /// Monday to Friday
    Weekdays,
    /// Saturday and Sunday
    Weekends,
    /// On chosen days of the week
    Weekly,
    /// On one day of the month
    Monthly,
    /// On one day of the year
    Yearly,
}

impl From<Every> for Frequency {
    fn from(every: Every) -> Self {
        match every {
            Every::Daily => Frequency::Daily,
            Every::Weekdays => Frequency::Weekdays,
            Every::Weekends => Frequency::Weekends,
            Every::Weekly => Frequency::Weekly,
            Every::Monthly => Frequency::Monthly,
            Every::Yearly => Frequency::Yearly,
        }
    }
}

#[derive(Parser, Debug, Clone)]
pub struct RecurAddCommand {
    /// Title given to every generated task
    pub title: String,
    /// How often the item repeats
    #[clap(long, value_enum)]
    pub every: Every,
    /// Days of week for weekly items (e.g. 'mon,wed,fri')
    #[clap(long)]
    pub on: Option<String>,
    /// Day of month for monthly and yearly items
    #[clap(long)]
    pub day: Option<i32>,
    /// Month (1-12) for yearly items
    #[clap(long)]
    pub month: Option<i32>,
    /// First day the item may occur (defaults to today)
    #[clap(long)]
    pub start: Option<String>,
    /// Last day the item may occur
    #[clap(long)]
    pub until: Option<String>,
    /// Days between a task's date and its due date
    #[clap(long, default_value = "0")]
    pub due_offset: i32,
    /// Generate fewer tasks per pass than the frequency allows
    #[clap(long)]
    pub look_ahead: Option<i32>,
    /// The description of generated tasks
    #[clap(short, long)]
    pub description: Option<String>,
    /// The priority of generated tasks
    #[clap(long, value_parser = parse_priority)]
    pub priority: Option<TaskPriority>,
    /// Sections to file generated tasks under
    #[clap(short, long)]
    pub section: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct RecurListCommand {
    /// Include paused items
    #[clap(long)]
    pub all: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct RecurPreviewCommand {
    /// Recurring item ID
    pub id: String,
    /// Number of occurrences to show
    #[clap(long, short, default_value = "10")]
    pub count: usize,
}

#[derive(Parser, Debug, Clone)]
pub struct RecurEditCommand {
    /// Recurring item ID
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, conflicts_with = "description")]
    pub description_clear: bool,

    #[arg(long, value_parser = parse_priority)]
    pub priority: Option<TaskPriority>,

    /// Replace the section list
    #[arg(long, num_args = 1..)]
    pub section: Option<Vec<String>>,

    #[arg(long)]
    pub until: Option<String>,
    #[arg(long, conflicts_with = "until")]
    pub until_clear: bool,

    #[arg(long)]
    pub due_offset: Option<i32>,

    #[arg(long)]
    pub look_ahead: Option<i32>,
}

#[derive(Parser, Debug, Clone)]
pub struct RecurIdCommand {
    /// Recurring item ID
    pub id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct RecurDeleteCommand {
    /// Recurring item ID
    pub id: String,
    /// Force deletion without confirmation
    #[clap(short, long)]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_recur_add() {
        let cli = Cli::try_parse_from([
            "cadence", "recur", "add", "Gym", "--every", "weekly", "--on", "mon,thu", "--priority", "high",
        ])
        .unwrap();
        match cli.command {
            Commands::Recur(RecurCommand { command: RecurSubcommand::Add(add) }) => {
                assert_eq!(add.every, Every::Weekly);
                assert_eq!(add.on.as_deref(), Some("mon,thu"));
                assert_eq!(add.priority, Some(TaskPriority::High));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn rejects_unknown_priority() {
        assert!(Cli::try_parse_from(["cadence", "add", "x", "--priority", "urgent"]).is_err());
    }
}
