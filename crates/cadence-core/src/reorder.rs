//! Drag-and-drop reordering within one list scope (a user's tasks on one
//! scheduled date, or their unscheduled tasks).
//!
//! [`resolve_reorder`] is pure and picks a single new key for the moved task.
//! When no key fits, it hands back the full desired order and [`rebalance`]
//! respreads the whole list in one transaction.

use std::collections::HashMap;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::CoreError;
use crate::models::{Task, UpdateTask};
use crate::position::{self, Between};
use crate::repository::TaskStore;

/// What a move resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReorderOutcome {
    /// New key for the moved task; nothing else changes.
    Position(String),
    /// Every task id of the list in its desired final order.
    Rebalance(Vec<Uuid>),
}

/// Computes the new position of `task_id` when moved to `new_index` in `list`.
///
/// `list` must be in display order. Moving later lands the task right after
/// the task currently at `new_index`; moving earlier lands it right before.
/// An index past the end is clamped to the last slot.
pub fn resolve_reorder(list: &[Task], task_id: Uuid, new_index: usize) -> Result<ReorderOutcome, CoreError> {
    let current = list
        .iter()
        .position(|t| t.id == task_id)
        .ok_or_else(|| CoreError::NotFound(format!("Task with id {} is not in this list", task_id)))?;

    let target = new_index.min(list.len() - 1);
    if target == current {
        return Ok(ReorderOutcome::Position(list[current].position.clone()));
    }

    let mut order: Vec<&Task> = list.iter().collect();
    let moved = order.remove(current);
    order.insert(target, moved);

    let lower = target
        .checked_sub(1)
        .map(|i| order[i].position.as_str())
        .unwrap_or("");
    let upper = order.get(target + 1).map(|t| t.position.as_str()).unwrap_or("");

    match position::between(lower, upper) {
        Between::Key(key) => Ok(ReorderOutcome::Position(key)),
        Between::RebalanceRequired => Ok(ReorderOutcome::Rebalance(order.iter().map(|t| t.id).collect())),
    }
}

/// Assigns fresh evenly spaced keys to `ids`, in order, as one atomic write.
pub async fn rebalance<S>(store: &S, ids: &[Uuid]) -> Result<Vec<(Uuid, String)>, CoreError>
where
    S: TaskStore + ?Sized,
{
    let assignments: Vec<(Uuid, String)> = ids.iter().copied().zip(position::spread(ids.len())).collect();
    store.update_positions(&assignments).await?;
    tracing::info!(tasks = ids.len(), "rebalanced list positions");
    Ok(assignments)
}

/// Resolves a move against the stored list and persists it.
pub async fn apply_reorder<S>(
    store: &S,
    user_id: &str,
    date: Option<NaiveDate>,
    task_id: Uuid,
    new_index: usize,
) -> Result<ReorderOutcome, CoreError>
where
    S: TaskStore + ?Sized,
{
    let list = store.find_by_user_and_date(user_id, date).await?;
    let outcome = resolve_reorder(&list, task_id, new_index)?;

    match &outcome {
        ReorderOutcome::Position(key) => {
            let unchanged = list.iter().any(|t| t.id == task_id && &t.position == key);
            if !unchanged {
                let update = UpdateTask {
                    position: Some(key.clone()),
                    ..Default::default()
                };
                store.update_task(task_id, &update).await?;
            }
        }
        ReorderOutcome::Rebalance(ids) => {
            rebalance(store, ids).await?;
        }
    }
    Ok(outcome)
}

/// Applies a resolved move to an in-memory list and re-sorts it.
pub fn apply_locally(list: &mut [Task], task_id: Uuid, outcome: &ReorderOutcome) {
    match outcome {
        ReorderOutcome::Position(key) => {
            if let Some(task) = list.iter_mut().find(|t| t.id == task_id) {
                task.position = key.clone();
            }
        }
        ReorderOutcome::Rebalance(ids) => {
            let keys: HashMap<Uuid, String> = ids.iter().copied().zip(position::spread(ids.len())).collect();
            for task in list.iter_mut() {
                if let Some(key) = keys.get(&task.id) {
                    task.position = key.clone();
                }
            }
        }
    }
    sort_by_position(list);
}

fn sort_by_position(list: &mut [Task]) {
    list.sort_by(|a, b| a.position.cmp(&b.position).then(a.created_at.cmp(&b.created_at)));
}

/// Positions of a list captured before an optimistic local move, so the
/// move can be undone if the store rejects it.
#[derive(Debug, Clone, Default)]
pub struct ListSnapshot {
    positions: Vec<(Uuid, String)>,
}

impl ListSnapshot {
    pub fn capture(list: &[Task]) -> Self {
        Self {
            positions: list.iter().map(|t| (t.id, t.position.clone())).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Puts every captured position back and restores the captured order.
    pub fn restore(&self, list: &mut [Task]) {
        let saved: HashMap<Uuid, &String> = self.positions.iter().map(|(id, key)| (*id, key)).collect();
        for task in list.iter_mut() {
            if let Some(key) = saved.get(&task.id) {
                task.position = (*key).clone();
            }
        }
        sort_by_position(list);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn list_with_positions(keys: &[&str]) -> Vec<Task> {
        let base = Utc::now();
        keys.iter()
            .enumerate()
            .map(|(i, key)| Task {
                title: format!("task {}", i),
                position: key.to_string(),
                created_at: base + Duration::seconds(i as i64),
                ..Default::default()
            })
            .collect()
    }

    fn key_of(outcome: ReorderOutcome) -> String {
        match outcome {
            ReorderOutcome::Position(key) => key,
            other => panic!("expected a position, got {:?}", other),
        }
    }

    #[test]
    fn moving_last_to_front_goes_before_first() {
        let list = list_with_positions(&["1", "2", "3"]);
        let key = key_of(resolve_reorder(&list, list[2].id, 0).unwrap());
        assert!(key.as_str() < "1");
    }

    #[test]
    fn moving_later_lands_after_the_target() {
        let list = list_with_positions(&["1", "2", "3", "4"]);
        let key = key_of(resolve_reorder(&list, list[0].id, 2).unwrap());
        assert!("3" < key.as_str() && key.as_str() < "4");
    }

    #[test]
    fn moving_earlier_lands_before_the_target() {
        let list = list_with_positions(&["1", "2", "3", "4"]);
        let key = key_of(resolve_reorder(&list, list[3].id, 1).unwrap());
        assert!("1" < key.as_str() && key.as_str() < "2");
    }

    #[test]
    fn index_past_the_end_is_clamped() {
        let list = list_with_positions(&["1", "2", "3"]);
        let key = key_of(resolve_reorder(&list, list[0].id, 99).unwrap());
        assert!(key.as_str() > "3");
    }

    #[test]
    fn same_index_keeps_the_current_key() {
        let list = list_with_positions(&["1", "2", "3"]);
        assert_eq!(
            resolve_reorder(&list, list[1].id, 1).unwrap(),
            ReorderOutcome::Position("2".to_string())
        );
    }

    #[test]
    fn unknown_task_is_not_found() {
        let list = list_with_positions(&["1", "2"]);
        let result = resolve_reorder(&list, Uuid::now_v7(), 0);
        assert!(matches!(result, Err(CoreError::NotFound(_))));

        let result = resolve_reorder(&[], Uuid::now_v7(), 0);
        assert!(matches!(result, Err(CoreError::NotFound(_))));
    }

    #[test]
    fn colliding_neighbours_require_rebalance_in_desired_order() {
        let list = list_with_positions(&["5", "5", "7"]);
        let moved = list[2].id;
        match resolve_reorder(&list, moved, 1).unwrap() {
            ReorderOutcome::Rebalance(ids) => {
                assert_eq!(ids, vec![list[0].id, moved, list[1].id]);
            }
            other => panic!("expected rebalance, got {:?}", other),
        }
    }

    #[test]
    fn legacy_keys_require_rebalance() {
        let list = list_with_positions(&["1000.0", "2000.0", "3"]);
        assert!(matches!(
            resolve_reorder(&list, list[2].id, 1).unwrap(),
            ReorderOutcome::Rebalance(_)
        ));
    }

    #[test]
    fn apply_locally_reorders_the_list() {
        let mut list = list_with_positions(&["1", "2", "3"]);
        let moved = list[2].id;
        let outcome = resolve_reorder(&list, moved, 0).unwrap();
        apply_locally(&mut list, moved, &outcome);
        assert_eq!(list[0].id, moved);

        let ids: Vec<Uuid> = list.iter().rev().map(|t| t.id).collect();
        apply_locally(&mut list, moved, &ReorderOutcome::Rebalance(ids.clone()));
        assert_eq!(list.iter().map(|t| t.id).collect::<Vec<_>>(), ids);
    }

    #[test]
    fn snapshot_restores_positions_and_order() {
        let mut list = list_with_positions(&["1", "2", "3"]);
        let original: Vec<Uuid> = list.iter().map(|t| t.id).collect();
        let snapshot = ListSnapshot::capture(&list);
        assert_eq!(snapshot.len(), 3);

        let moved = list[0].id;
        apply_locally(&mut list, moved, &ReorderOutcome::Position("z".to_string()));
        assert_eq!(list[2].id, moved);

        snapshot.restore(&mut list);
        assert_eq!(list.iter().map(|t| t.id).collect::<Vec<_>>(), original);
        assert_eq!(list[0].position, "1");
    }
}
