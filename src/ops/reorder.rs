use crate::io::kv_store::KeyValueStore;
use crate::model::task::TaskId;
use crate::ops::store::{StoreError, TaskStore};

/// Vertical extent of a rendered item, in the adapter's coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemBox {
    pub id: TaskId,
    pub top: f64,
    pub height: f64,
}

impl ItemBox {
    fn midpoint(&self) -> f64 {
        self.top + self.height / 2.0
    }
}

/// The item the dragged one should be inserted before, or `None` for the end
/// of the list. Scans only non-dragged items and picks the nearest one whose
/// midpoint is still below the pointer.
pub fn drop_target(pointer_y: f64, items: &[ItemBox], dragged: TaskId) -> Option<TaskId> {
    let mut best: Option<(f64, TaskId)> = None;
    for item in items.iter().filter(|i| i.id != dragged) {
        let offset = pointer_y - item.midpoint();
        if offset < 0.0 && best.is_none_or(|(closest, _)| offset > closest) {
            best = Some((offset, item.id));
        }
    }
    best.map(|(_, id)| id)
}

/// New presentation sequence with `dragged` moved in front of `target`
/// (or to the end for `None`). Returns `None` when `dragged` is not in
/// `order` or `target` is not in it.
pub fn move_before(order: &[TaskId], dragged: TaskId, target: Option<TaskId>) -> Option<Vec<TaskId>> {
    if !order.contains(&dragged) {
        return None;
    }
    if target == Some(dragged) {
        return Some(order.to_vec());
    }

    let mut out: Vec<TaskId> = order.iter().copied().filter(|&id| id != dragged).collect();
    match target {
        None => out.push(dragged),
        Some(t) => {
            let idx = out.iter().position(|&id| id == t)?;
            out.insert(idx, dragged);
        }
    }
    Some(out)
}

/// Error type for reorder operations
#[derive(Debug, thiserror::Error)]
pub enum ReorderError {
    #[error("task {0} is not in the current view")]
    NotVisible(TaskId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Move `dragged` before `target` within `visible` and renumber the result.
/// Returns the new sequence.
pub fn relocate<S: KeyValueStore>(
    store: &mut TaskStore<S>,
    visible: &[TaskId],
    dragged: TaskId,
    target: Option<TaskId>,
) -> Result<Vec<TaskId>, ReorderError> {
    let order = match move_before(visible, dragged, target) {
        Some(order) => order,
        None => {
            let missing = if visible.contains(&dragged) {
                target.unwrap_or(dragged)
            } else {
                dragged
            };
            return Err(ReorderError::NotVisible(missing));
        }
    };
    store.renumber(&order)?;
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::kv_store::MemoryStore;
    use crate::ops::filter::{ViewFilters, filtered_view};
    use chrono::{DateTime, NaiveDate};
    use pretty_assertions::assert_eq;

    fn boxes(ids: &[TaskId]) -> Vec<ItemBox> {
        // 40px tall rows stacked from y=0
        ids.iter()
            .enumerate()
            .map(|(i, &id)| ItemBox {
                id,
                top: i as f64 * 40.0,
                height: 40.0,
            })
            .collect()
    }

    #[test]
    fn drop_target_picks_nearest_item_below_pointer() {
        let items = boxes(&[1, 2, 3, 4]);
        // midpoints: 20, 60, 100, 140
        assert_eq!(drop_target(5.0, &items, 4), Some(1));
        assert_eq!(drop_target(65.0, &items, 1), Some(3));
        assert_eq!(drop_target(99.0, &items, 1), Some(3));
    }

    #[test]
    fn drop_target_ignores_dragged_item() {
        let items = boxes(&[1, 2, 3]);
        // Pointer above 2's midpoint, but 2 is the one being dragged
        assert_eq!(drop_target(50.0, &items, 2), Some(3));
    }

    #[test]
    fn drop_target_past_last_midpoint_is_end() {
        let items = boxes(&[1, 2, 3]);
        assert_eq!(drop_target(101.0, &items, 1), None);
        assert_eq!(drop_target(0.0, &[], 1), None);
    }

    #[test]
    fn move_before_cases() {
        let order = [1, 2, 3, 4];
        assert_eq!(move_before(&order, 4, Some(1)), Some(vec![4, 1, 2, 3]));
        assert_eq!(move_before(&order, 1, Some(4)), Some(vec![2, 3, 1, 4]));
        assert_eq!(move_before(&order, 2, None), Some(vec![1, 3, 4, 2]));
        assert_eq!(move_before(&order, 3, Some(3)), Some(vec![1, 2, 3, 4]));
        assert_eq!(move_before(&order, 9, Some(1)), None);
        assert_eq!(move_before(&order, 1, Some(9)), None);
    }

    #[test]
    fn renumber_then_view_follows_new_order() {
        let mut store = TaskStore::open(MemoryStore::new()).unwrap();
        for ms in 1..=3 {
            let at = DateTime::from_timestamp_millis(ms).unwrap();
            store.create_at(&format!("t{}", ms), None, None, at).unwrap();
        }
        store.renumber(&[3, 1, 2]).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let view: Vec<TaskId> = filtered_view(store.all(), &ViewFilters::default(), today)
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(view, vec![3, 1, 2]);
    }

    #[test]
    fn relocate_renumbers_store() {
        let mut store = TaskStore::open(MemoryStore::new()).unwrap();
        for ms in 1..=3 {
            let at = DateTime::from_timestamp_millis(ms).unwrap();
            store.create_at(&format!("t{}", ms), None, None, at).unwrap();
        }
        let order = relocate(&mut store, &[1, 2, 3], 3, Some(1)).unwrap();
        assert_eq!(order, vec![3, 1, 2]);
        assert_eq!(store.get(3).unwrap().position, 0);
        assert_eq!(store.get(2).unwrap().position, 2);

        assert!(matches!(
            relocate(&mut store, &[1, 2], 3, None),
            Err(ReorderError::NotVisible(3))
        ));
        assert!(matches!(
            relocate(&mut store, &[1, 2], 1, Some(7)),
            Err(ReorderError::NotVisible(7))
        ));
    }
}
