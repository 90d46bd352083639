use crate::error::{GradebookError, Result};
use crate::model::{homework_key, AppState, ContactBookEntry, HomeworkStatus};
use chrono::NaiveDate;
use serde::Serialize;

fn check_date(date: &str) -> Result<()> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| GradebookError::validation(format!("date must be YYYY-MM-DD (got {:?})", date)))
}

/// Overwrites the contact-book entry for one day.
pub fn save_contact_book(state: &AppState, date: &str, entry: ContactBookEntry) -> Result<AppState> {
    check_date(date)?;
    let mut next = state.clone();
    next.contact_books.insert(date.to_string(), entry);
    Ok(next)
}

pub fn homework_items(state: &AppState, date: &str) -> Vec<String> {
    state
        .contact_books
        .get(date)
        .map(ContactBookEntry::homework_items)
        .unwrap_or_default()
}

pub fn set_homework_status(
    state: &AppState,
    date: &str,
    student_id: &str,
    status: HomeworkStatus,
    item: &str,
) -> Result<AppState> {
    check_date(date)?;
    if item.trim().is_empty() {
        return Err(GradebookError::validation("homework item must not be empty"));
    }
    let mut next = state.clone();
    next.homework_status
        .entry(homework_key(date, item))
        .or_default()
        .insert(student_id.to_string(), status);
    Ok(next)
}

/// Applies one tap of the check sheet and returns the new state with the
/// status that was written.
pub fn cycle_homework_status(
    state: &AppState,
    date: &str,
    student_id: &str,
    item: &str,
) -> Result<(AppState, HomeworkStatus)> {
    let next_status = HomeworkStatus::cycle(state.homework_status(date, item, student_id));
    let next = set_homework_status(state, date, student_id, next_status, item)?;
    Ok((next, next_status))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HomeworkStats {
    pub missing: u32,
    pub correction: u32,
}

/// Counts explicit not-submitted and needs-correction marks across every day
/// and item. Unevaluated entries count as neither.
pub fn homework_stats(state: &AppState, student_id: &str) -> HomeworkStats {
    let mut stats = HomeworkStats::default();
    for per_student in state.homework_status.values() {
        match per_student.get(student_id) {
            Some(HomeworkStatus::NotSubmitted) => stats.missing += 1,
            Some(HomeworkStatus::NeedsCorrection) => stats.correction += 1,
            _ => {}
        }
    }
    stats
}
