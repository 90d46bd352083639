use super::{add_score, append_line, new_id, note_date};
use crate::error::{GradebookError, Result};
use crate::model::{AppState, Group};
use chrono::NaiveDate;

pub fn create_group(state: &AppState, name: &str, member_ids: &[String]) -> Result<AppState> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GradebookError::validation("group name must not be empty"));
    }
    if member_ids.is_empty() {
        return Err(GradebookError::validation("a group needs at least one member"));
    }
    let mut next = state.clone();
    next.groups.push(Group {
        id: new_id("group-"),
        name: name.to_string(),
        member_ids: member_ids.to_vec(),
        temp_score: 0,
        temp_tags: Vec::new(),
    });
    Ok(next)
}

pub fn delete_group(state: &AppState, group_id: &str) -> Result<AppState> {
    let mut next = state.clone();
    next.groups.retain(|g| g.id != group_id);
    Ok(next)
}

fn map_group<F>(state: &AppState, group_id: &str, f: F) -> AppState
where
    F: FnOnce(&mut Group),
{
    let mut next = state.clone();
    if let Some(g) = next.groups.iter_mut().find(|g| g.id == group_id) {
        f(g);
    }
    next
}

pub fn update_temp_score(state: &AppState, group_id: &str, delta: i64) -> Result<AppState> {
    let mut next = state.clone();
    if let Some(g) = next.groups.iter_mut().find(|g| g.id == group_id) {
        g.temp_score = add_score(g.temp_score, delta)?;
    }
    Ok(next)
}

/// Stages a behavior tag, stamped `YYYY/MM/DD(分組)`.
pub fn update_temp_tag(
    state: &AppState,
    group_id: &str,
    tag: &str,
    today: NaiveDate,
) -> Result<AppState> {
    let tag = tag.trim();
    if tag.is_empty() {
        return Err(GradebookError::validation("tag must not be empty"));
    }
    let formatted = format!("{}(分組) {}", note_date(today), tag);
    Ok(map_group(state, group_id, |g| g.temp_tags.push(formatted)))
}

pub fn remove_temp_tag(state: &AppState, group_id: &str, index: usize) -> Result<AppState> {
    Ok(map_group(state, group_id, |g| {
        if index < g.temp_tags.len() {
            g.temp_tags.remove(index);
        }
    }))
}

/// Moves every group's staged score and tags onto its members, then clears
/// the stage. Groups with nothing staged are left exactly as they are. A
/// member score that would overflow fails the whole commit.
pub fn commit_group_scores(state: &AppState) -> Result<AppState> {
    let mut next = state.clone();
    for group in next.groups.iter_mut().filter(|g| g.has_pending_stage()) {
        let tags = group.temp_tags.join("\n");
        for member_id in &group.member_ids {
            if let Some(s) = next.students.iter_mut().find(|s| &s.id == member_id) {
                s.score = add_score(s.score, group.temp_score)?;
                s.note = append_line(&s.note, &tags);
            }
        }
        group.temp_score = 0;
        group.temp_tags.clear();
    }
    Ok(next)
}
