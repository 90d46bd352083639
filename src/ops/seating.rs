use super::{new_id, replace_class_order};
use crate::error::{GradebookError, Result};
use crate::model::{AppState, SeatArrangement, Student};

/// Snapshots the current class's display order under `name`.
pub fn save_seat_arrangement(state: &AppState, name: &str) -> Result<AppState> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GradebookError::validation("arrangement name must not be empty"));
    }
    let class_id = state.current_class_id();
    let mut next = state.clone();
    next.seat_arrangements.push(SeatArrangement {
        id: new_id("seat-"),
        name: name.to_string(),
        student_order: state
            .class_students(&class_id)
            .iter()
            .map(|s| s.id.clone())
            .collect(),
    });
    Ok(next)
}

/// Reorders the current class by a saved arrangement. Students missing from
/// the arrangement follow in their present order; ids of departed students
/// are skipped.
pub fn load_seat_arrangement(state: &AppState, arrangement_id: &str) -> Result<AppState> {
    let Some(arrangement) = state
        .seat_arrangements
        .iter()
        .find(|a| a.id == arrangement_id)
    else {
        return Ok(state.clone());
    };

    let class_id = state.current_class_id();
    let current = state.class_students(&class_id);
    let mut ordered: Vec<Student> = arrangement
        .student_order
        .iter()
        .filter_map(|id| current.iter().find(|s| &s.id == id).map(|s| (*s).clone()))
        .collect();
    for s in &current {
        if !ordered.iter().any(|o| o.id == s.id) {
            ordered.push((*s).clone());
        }
    }

    let mut next = state.clone();
    next.students = replace_class_order(&state.students, &class_id, ordered);
    Ok(next)
}

pub fn delete_seat_arrangement(state: &AppState, arrangement_id: &str) -> Result<AppState> {
    let mut next = state.clone();
    next.seat_arrangements.retain(|a| a.id != arrangement_id);
    Ok(next)
}
