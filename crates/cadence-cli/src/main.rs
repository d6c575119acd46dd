use cadence_core::db;
use cadence_core::error::CoreError;
use cadence_core::materialization::GenerationManager;
use cadence_core::planner::Planner;
use cadence_core::repository::SqliteRepository;
use clap::Parser;
use owo_colors::{OwoColorize, Style};
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;
mod parser;
mod views;

#[tokio::main]
async fn main() {
    // Logs go to stderr so table output on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env("CADENCE_LOG").unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = cli::Cli::parse();

    let config = match config::Config::new() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} Invalid configuration: {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };
    let db_pool = match db::establish_connection(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };
    let planner = Planner::new(
        SqliteRepository::new(db_pool),
        GenerationManager::new(config.generation_config()),
    );
    let user_id = config.user_id.as_str();

    let result = match cli.command {
        cli::Commands::Add(command) => commands::add::add_task(&planner, user_id, command).await,
        cli::Commands::List(command) => commands::list::list_tasks(&planner, &config, command).await,
        cli::Commands::Move(command) => commands::r#move::move_task(&planner, user_id, command).await,
        cli::Commands::Do(command) => commands::r#do::do_task(&planner, user_id, command).await,
        cli::Commands::Delete(command) => commands::delete::delete_task(&planner, user_id, command).await,
        cli::Commands::Recur(command) => commands::recur::recur_command(&planner, user_id, command).await,
    };

    if let Err(e) = result {
        handle_error(e);
        std::process::exit(1);
    }
}

fn handle_error(err: anyhow::Error) {
    let error_style = Style::new().red().bold();

    if let Some(core_error) = err.downcast_ref::<CoreError>() {
        match core_error {
            CoreError::NotFound(s) => {
                eprintln!("{} {}", "Error:".style(error_style), s);
            }
            CoreError::AmbiguousId(matches) => {
                eprintln!("{}", "Error: Ambiguous ID.".style(error_style));
                eprintln!("Did you mean one of these?");
                for (id, title) in matches {
                    eprintln!("  {} ({})", id.yellow(), title);
                }
            }
            CoreError::InvalidInput(s) => {
                eprintln!("{} Invalid input: {}", "Error:".style(error_style), s);
            }
            CoreError::Database(e) => {
                eprintln!("{} Database error: {}", "Error:".style(error_style), e);
            }
            _ => eprintln!("{} {}", "Error:".style(error_style), err),
        }
    } else {
        eprintln!("{} {}", "Error:".style(error_style), err);
    }
}
