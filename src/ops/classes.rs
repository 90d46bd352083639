use super::new_id;
use crate::error::{GradebookError, Result};
use crate::model::{AppState, ClassInfo};

pub fn add_class(state: &AppState, name: &str) -> Result<AppState> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GradebookError::validation("class name must not be empty"));
    }
    let id = new_id("c");
    let mut next = state.clone();
    next.classes.push(ClassInfo {
        id: id.clone(),
        name: name.to_string(),
    });
    next.current_class_id = id;
    Ok(next)
}

pub fn rename_class(state: &AppState, class_id: &str, name: &str) -> Result<AppState> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GradebookError::validation("class name must not be empty"));
    }
    let mut next = state.clone();
    if let Some(c) = next.classes.iter_mut().find(|c| c.id == class_id) {
        c.name = name.to_string();
    }
    Ok(next)
}

pub fn select_class(state: &AppState, class_id: &str) -> Result<AppState> {
    let mut next = state.clone();
    if state.has_class(class_id) {
        next.current_class_id = class_id.to_string();
    }
    Ok(next)
}

pub fn delete_class(state: &AppState, class_id: &str) -> Result<AppState> {
    if !state.has_class(class_id) {
        return Ok(state.clone());
    }
    if state.classes.len() <= 1 {
        return Err(GradebookError::invariant(
            "at least one class must remain",
        ));
    }

    let mut next = state.clone();
    next.classes.retain(|c| c.id != class_id);
    next.students.retain(|s| s.class_id != class_id);
    if state.current_class_id == class_id || !next.has_class(&next.current_class_id) {
        next.current_class_id = next.classes[0].id.clone();
    }
    Ok(next)
}
