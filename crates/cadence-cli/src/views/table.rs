use cadence_core::models::{RecurringItem, Task, TaskPriority};
use cadence_core::planner::short_id;
use chrono::{Local, NaiveDate};
use chrono_humanize::Humanize;
use comfy_table::{Attribute, Cell, Color, Row, Table};

fn plain<T: serde::Serialize>(value: &T) -> String {
    serde_plain::to_string(value).unwrap_or_default()
}

fn title_cell(title: &str, priority: &TaskPriority, completed: bool) -> Cell {
    let cell = Cell::new(title);
    if completed {
        return cell.add_attribute(Attribute::CrossedOut).fg(Color::DarkGrey);
    }
    match priority {
        TaskPriority::High => cell.fg(Color::Red).add_attribute(Attribute::Bold),
        TaskPriority::Medium => cell.fg(Color::Yellow),
        TaskPriority::Low => cell.fg(Color::Green),
        TaskPriority::None => cell,
    }
}

fn due_cell(due: Option<NaiveDate>, completed: bool, today: NaiveDate) -> Cell {
    let Some(due) = due else {
        return Cell::new("None");
    };
    let cell = Cell::new(due.format("%Y-%m-%d").to_string());
    if completed {
        cell
    } else if due < today {
        cell.fg(Color::Red)
    } else if due == today {
        cell.fg(Color::Yellow)
    } else {
        cell
    }
}

/// Prints tasks in the order given, with a `#` column counting from 1 within
/// each scheduled date.
pub fn display_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }

    let today = Local::now().date_naive();
    let mut table = Table::new();
    table.set_header(vec!["Date", "#", "ID", "Title", "Due", "Priority", "Sections"]);

    let mut current_date = None;
    let mut index = 0;
    for task in tasks {
        if current_date != Some(task.scheduled_date) {
            current_date = Some(task.scheduled_date);
            index = 0;
        }
        index += 1;

        let mut row = Row::new();
        let date_text = match task.scheduled_date {
            Some(date) if index == 1 => date.format("%a %Y-%m-%d").to_string(),
            Some(_) => String::new(),
            None if index == 1 => "Unscheduled".to_string(),
            None => String::new(),
        };
        row.add_cell(Cell::new(date_text).add_attribute(Attribute::Bold));
        row.add_cell(Cell::new(index));
        row.add_cell(Cell::new(short_id(task.id)));

        let mut title = String::new();
        if task.recurring_item_id.is_some() {
            title.push('↻');
            title.push(' ');
        }
        title.push_str(&task.title);
        row.add_cell(title_cell(&title, &task.priority, task.completed));

        row.add_cell(due_cell(task.due_date, task.completed, today));
        row.add_cell(Cell::new(plain(&task.priority)));
        row.add_cell(Cell::new(if task.sections.0.is_empty() {
            "None".to_string()
        } else {
            task.sections.0.join(", ")
        }));
        table.add_row(row);
    }

    println!("{table}");
}

pub fn display_recurring_items(items: &[RecurringItem]) {
    if items.is_empty() {
        println!("No recurring items found.");
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Title", "Every", "Starts", "Ends", "Generated Through", "Active"]);

    for item in items {
        let mut row = Row::new();
        row.add_cell(Cell::new(short_id(item.id)));
        row.add_cell(title_cell(&item.title, &item.priority, false));
        row.add_cell(Cell::new(describe_schedule(item)));
        row.add_cell(Cell::new(item.start_date.format("%Y-%m-%d").to_string()));
        row.add_cell(Cell::new(
            item.end_date.map_or_else(|| "Never".to_string(), |d| d.format("%Y-%m-%d").to_string()),
        ));
        row.add_cell(Cell::new(
            item.last_generated_date.map_or_else(|| "Not yet".to_string(), |d| d.format("%Y-%m-%d").to_string()),
        ));
        row.add_cell(if item.active {
            Cell::new("Yes").fg(Color::Green)
        } else {
            Cell::new("Paused").fg(Color::DarkGrey)
        });
        table.add_row(row);
    }

    println!("{table}");
}

/// Short text such as "weekly (MO,TH)" or "monthly (day 15)".
pub fn describe_schedule(item: &RecurringItem) -> String {
    let frequency = plain(&item.frequency);
    match (&item.weekdays, item.month, item.day_of_month) {
        (Some(days), _, _) if !days.is_empty() => format!("{} ({})", frequency, days),
        (_, Some(month), Some(day)) => format!("{} ({}/{})", frequency, month, day),
        (_, None, Some(day)) => format!("{} (day {})", frequency, day),
        _ => frequency,
    }
}

pub fn display_occurrences(item: &RecurringItem, dates: &[NaiveDate]) {
    if dates.is_empty() {
        println!("No upcoming occurrences (the item may have ended)");
        return;
    }

    let today = Local::now().date_naive();
    let mut table = Table::new();
    table.set_header(vec!["#", "Date", "When"]);
    for (i, date) in dates.iter().enumerate() {
        let mut row = Row::new();
        row.add_cell(Cell::new(i + 1));
        row.add_cell(Cell::new(date.format("%a %Y-%m-%d").to_string()));
        let when = date
            .and_hms_opt(0, 0, 0)
            .map(|dt| (dt - today.and_hms_opt(0, 0, 0).unwrap_or(dt)).humanize())
            .unwrap_or_default();
        row.add_cell(Cell::new(when));
        table.add_row(row);
    }
    println!("Next {} occurrences of '{}':", dates.len(), item.title);
    println!("{table}");
}
