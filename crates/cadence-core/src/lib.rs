//! # Cadence Core Library
//!
//! Recurring tasks materialized lazily, and user-ordered task lists kept in
//! order with fractional index keys.
//!
//! ## Features
//!
//! - **Lazy Generation**: recurring items are expanded into concrete tasks
//!   inline with reads; a per-item watermark records how far generation got
//! - **RFC 5545 Rules**: schedules compile to standard RRULE text evaluated
//!   by the `rrule` crate
//! - **Bounded Look-Ahead**: each pass creates at most a frequency-dependent
//!   number of tasks per item
//! - **Fractional Ordering**: drag-and-drop moves rewrite a single key; a
//!   transactional rebalance is the fallback when keys run out of room
//! - **Duplicate-Safe Writes**: one task per (recurring item, date), enforced
//!   by the database
//!
//! ## Core Modules
//!
//! - [`db`]: Database connection and migration management
//! - [`models`]: Core data structures and transfer objects
//! - [`repository`]: Store traits and their SQLite implementation
//! - [`recurrence`]: Rule compilation and occurrence expansion
//! - [`materialization`]: Task materializer and lazy generation orchestrator
//! - [`position`]: Fractional index key allocator
//! - [`reorder`]: Reorder resolution and rebalancing
//! - [`planner`]: Lifecycle service tying the pieces together
//! - [`error`]: Error types
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use cadence_core::{
//!     db,
//!     materialization::GenerationManager,
//!     models::{NewRecurringItem, RecurrencePattern},
//!     planner::Planner,
//!     repository::SqliteRepository,
//! };
//! use chrono::NaiveDate;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = db::establish_connection("tasks.db").await?;
//!     let planner = Planner::new(SqliteRepository::new(pool), GenerationManager::with_defaults());
//!
//!     planner
//!         .create_recurring_item(NewRecurringItem {
//!             user_id: "me".to_string(),
//!             title: "Water the plants".to_string(),
//!             description: None,
//!             category_id: None,
//!             priority: None,
//!             sections: vec![],
//!             pattern: RecurrencePattern::Weekly { weekdays: vec!["MO".into(), "TH".into()] },
//!             start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
//!             end_date: None,
//!             due_offset_days: 0,
//!             look_ahead_count: None,
//!         })
//!         .await?;
//!
//!     let report = planner.ensure_generated("me").await;
//!     println!("Generated {} tasks", report.generated_tasks.len());
//!     Ok(())
//! }
//! ```

pub mod db;
pub mod error;
pub mod materialization;
pub mod models;
pub mod planner;
pub mod position;
pub mod recurrence;
pub mod reorder;
pub mod repository;
