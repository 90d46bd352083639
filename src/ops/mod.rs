//! Mutation operations.
//!
//! Every operation takes the current snapshot and returns a new one; nothing
//! here mutates a shared value. An unknown id leaves the state unchanged,
//! while empty names and the last-class guard are reported as errors.

pub mod classes;
pub mod groups;
pub mod homework;
pub mod seating;
pub mod settings;
pub mod students;

use crate::error::{GradebookError, Result};
use crate::model::{AppState, Student};
use chrono::NaiveDate;
use uuid::Uuid;

pub use classes::{add_class, delete_class, rename_class, select_class};
pub use groups::{
    commit_group_scores, create_group, delete_group, remove_temp_tag, update_temp_score,
    update_temp_tag,
};
pub use homework::{
    cycle_homework_status, homework_items, homework_stats, save_contact_book, set_homework_status,
    HomeworkStats,
};
pub use seating::{delete_seat_arrangement, load_seat_arrangement, save_seat_arrangement};
pub use settings::{set_rows_per_page, update_settings_options};
pub use students::{
    add_students, append_student_note, avatar_for, delete_student, move_student,
    parse_student_names, reset_class, set_avatars, sort_current_class_by_name, toggle_leave,
    toggle_records, update_student, update_student_score, AvatarStyle, ScoreTarget, StudentPatch,
};

pub(crate) fn new_id(prefix: &str) -> String {
    format!("{}{}", prefix, Uuid::new_v4().simple())
}

pub(crate) fn note_date(today: NaiveDate) -> String {
    today.format("%Y/%m/%d").to_string()
}

/// Adds a score delta, refusing to overflow.
pub(crate) fn add_score(score: i64, delta: i64) -> Result<i64> {
    score
        .checked_add(delta)
        .ok_or_else(|| GradebookError::validation(format!("score {} {:+} is out of range", score, delta)))
}

/// Appends `line` to a newline-delimited log, without a leading newline on
/// an empty log.
pub(crate) fn append_line(note: &str, line: &str) -> String {
    if note.is_empty() {
        line.to_string()
    } else if line.is_empty() {
        note.to_string()
    } else {
        format!("{}\n{}", note, line)
    }
}

/// Writes `reordered` back into the slots held by `class_id`'s students.
/// Every other student keeps its exact index in the global sequence.
pub(crate) fn replace_class_order(
    students: &[Student],
    class_id: &str,
    reordered: Vec<Student>,
) -> Vec<Student> {
    let mut incoming = reordered.into_iter();
    students
        .iter()
        .map(|s| {
            if s.class_id == class_id {
                incoming.next().unwrap_or_else(|| s.clone())
            } else {
                s.clone()
            }
        })
        .collect()
}

pub(crate) fn map_students<F>(state: &AppState, mut f: F) -> AppState
where
    F: FnMut(&Student) -> Option<Student>,
{
    let mut next = state.clone();
    next.students = state
        .students
        .iter()
        .map(|s| f(s).unwrap_or_else(|| s.clone()))
        .collect();
    next
}

#[cfg(test)]
pub(crate) mod testutil {
    use crate::model::{default_state, AppState, ClassInfo, Student};

    pub fn student(id: &str, class_id: &str, name: &str) -> Student {
        Student {
            id: id.to_string(),
            class_id: class_id.to_string(),
            name: name.to_string(),
            score: 0,
            avatar: String::new(),
            note: String::new(),
            record_tag: String::new(),
            show_record: false,
            is_on_leave: None,
        }
    }

    /// Two classes with students interleaved: a1 b1 a2 b2 a3.
    pub fn interleaved() -> AppState {
        let mut state = default_state();
        state.classes = vec![
            ClassInfo {
                id: "a".into(),
                name: "A".into(),
            },
            ClassInfo {
                id: "b".into(),
                name: "B".into(),
            },
        ];
        state.current_class_id = "a".into();
        state.students = vec![
            student("a1", "a", "Cara"),
            student("b1", "b", "Zed"),
            student("a2", "a", "Amy"),
            student("b2", "b", "Yan"),
            student("a3", "a", "Bob"),
        ];
        state
    }

    pub fn ids(state: &AppState) -> Vec<&str> {
        state.students.iter().map(|s| s.id.as_str()).collect()
    }

    pub fn class_ids<'a>(state: &'a AppState, class_id: &str) -> Vec<&'a str> {
        state
            .students
            .iter()
            .filter(|s| s.class_id == class_id)
            .map(|s| s.id.as_str())
            .collect()
    }
}
