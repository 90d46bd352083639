use super::{add_score, append_line, map_students, new_id, note_date, replace_class_order};
use crate::collate::compare_names;
use crate::error::{GradebookError, Result};
use crate::model::{AppState, Student};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use std::collections::HashSet;

/// Splits pasted roster text on newlines, commas (ASCII or full-width) and
/// whitespace.
pub fn parse_student_names(text: &str) -> Vec<String> {
    text.split(|c: char| c == ',' || c == '，' || c.is_whitespace())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_cjk_ideograph(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

/// First CJK ideograph of the name (the surname, for Chinese names), else the
/// first character.
pub fn avatar_for(name: &str) -> String {
    name.chars()
        .find(|c| is_cjk_ideograph(*c))
        .or_else(|| name.chars().next())
        .map(String::from)
        .unwrap_or_default()
}

pub fn add_students(state: &AppState, text: &str, class_id: &str) -> Result<AppState> {
    let names = parse_student_names(text);
    if names.is_empty() {
        return Err(GradebookError::validation("no student names given"));
    }
    if !state.has_class(class_id) {
        return Ok(state.clone());
    }

    let mut next = state.clone();
    next.students.extend(names.into_iter().map(|name| Student {
        id: new_id("s"),
        class_id: class_id.to_string(),
        avatar: avatar_for(&name),
        name,
        score: 0,
        note: String::new(),
        record_tag: String::new(),
        show_record: false,
        is_on_leave: None,
    }));
    Ok(next)
}

pub fn delete_student(state: &AppState, student_id: &str) -> Result<AppState> {
    let mut next = state.clone();
    next.students.retain(|s| s.id != student_id);
    Ok(next)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentPatch {
    pub name: Option<String>,
    pub score: Option<i64>,
    pub avatar: Option<String>,
    pub note: Option<String>,
    pub record_tag: Option<String>,
    pub show_record: Option<bool>,
    pub is_on_leave: Option<bool>,
}

pub fn update_student(state: &AppState, student_id: &str, patch: &StudentPatch) -> Result<AppState> {
    if let Some(name) = &patch.name {
        if name.trim().is_empty() {
            return Err(GradebookError::validation("student name must not be empty"));
        }
    }
    Ok(map_students(state, |s| {
        if s.id != student_id {
            return None;
        }
        let mut s = s.clone();
        if let Some(v) = &patch.name {
            s.name = v.trim().to_string();
        }
        if let Some(v) = patch.score {
            s.score = v;
        }
        if let Some(v) = &patch.avatar {
            s.avatar = v.clone();
        }
        if let Some(v) = &patch.note {
            s.note = v.clone();
        }
        if let Some(v) = &patch.record_tag {
            s.record_tag = v.clone();
        }
        if let Some(v) = patch.show_record {
            s.show_record = v;
        }
        if let Some(v) = patch.is_on_leave {
            s.is_on_leave = Some(v);
        }
        Some(s)
    }))
}

/// Adds a dated behavior line to the student's note.
pub fn append_student_note(
    state: &AppState,
    student_id: &str,
    text: &str,
    today: NaiveDate,
) -> Result<AppState> {
    let text = text.trim();
    if text.is_empty() {
        return Err(GradebookError::validation("note text must not be empty"));
    }
    let line = format!("{} {}", note_date(today), text);
    Ok(map_students(state, |s| {
        (s.id == student_id).then(|| Student {
            note: append_line(&s.note, &line),
            ..s.clone()
        })
    }))
}

/// Moves a student within one class's display order.
pub fn move_student(state: &AppState, from: usize, to: usize, class_id: &str) -> Result<AppState> {
    let mut ordered: Vec<Student> = state
        .class_students(class_id)
        .into_iter()
        .cloned()
        .collect();
    let len = ordered.len();
    if from >= len {
        return Err(GradebookError::Range { index: from, len });
    }
    if to >= len {
        return Err(GradebookError::Range { index: to, len });
    }
    if from == to {
        return Ok(state.clone());
    }

    let moved = ordered.remove(from);
    ordered.insert(to, moved);

    let mut next = state.clone();
    next.students = replace_class_order(&state.students, class_id, ordered);
    Ok(next)
}

/// One student, or a batch of students (group tools).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ScoreTarget {
    One(String),
    Many(Vec<String>),
}

impl ScoreTarget {
    fn ids(&self) -> HashSet<&str> {
        match self {
            ScoreTarget::One(id) => HashSet::from([id.as_str()]),
            ScoreTarget::Many(ids) => ids.iter().map(String::as_str).collect(),
        }
    }
}

pub fn update_student_score(state: &AppState, target: &ScoreTarget, delta: i64) -> Result<AppState> {
    let ids = target.ids();
    let mut next = state.clone();
    for s in next.students.iter_mut().filter(|s| ids.contains(s.id.as_str())) {
        s.score = add_score(s.score, delta)?;
    }
    Ok(next)
}

/// Flips leave status. Going on leave logs a dated line; coming back does not.
pub fn toggle_leave(state: &AppState, student_id: &str, today: NaiveDate) -> Result<AppState> {
    Ok(map_students(state, |s| {
        if s.id != student_id {
            return None;
        }
        let leaving = !s.on_leave();
        let note = if leaving {
            append_line(&s.note, &format!("{} 請假", note_date(today)))
        } else {
            s.note.clone()
        };
        Some(Student {
            is_on_leave: Some(leaving),
            note,
            ..s.clone()
        })
    }))
}

/// Clears scores and records of one class. Homework history is cleared for
/// everyone, since status keys are not partitioned by class.
pub fn reset_class(state: &AppState, class_id: &str) -> Result<AppState> {
    let mut next = map_students(state, |s| {
        (s.class_id == class_id).then(|| Student {
            score: 0,
            note: String::new(),
            record_tag: String::new(),
            show_record: false,
            ..s.clone()
        })
    });
    next.homework_status.clear();
    Ok(next)
}

/// Hides every record if any is shown, otherwise shows them all.
pub fn toggle_records(state: &AppState, class_id: &str) -> Result<AppState> {
    let any_shown = state
        .students
        .iter()
        .any(|s| s.class_id == class_id && s.show_record);
    Ok(map_students(state, |s| {
        (s.class_id == class_id).then(|| Student {
            show_record: !any_shown,
            ..s.clone()
        })
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarStyle {
    Surname,
    Human,
    Animal,
    Plant,
    Robot,
}

const HUMAN: &[&str] = &["👦", "👧", "🧑", "👱", "👨", "👩", "🧓", "👴", "👵", "👲", "👳", "🧕"];
const ANIMAL: &[&str] = &[
    "🐶", "🐱", "🐭", "🐹", "🐰", "🦊", "🐻", "🐼", "🐨", "🐯", "🦁", "🐮", "🐷", "🐸", "🐵", "🐔",
    "🐧", "🐦",
];
const PLANT: &[&str] = &[
    "🌵", "🌲", "🌳", "🌴", "🌱", "🌿", "🍀", "🍁", "🍂", "🍃", "🍄", "🌷", "🌸", "🌹", "🌻", "🌼",
];
const ROBOT: &[&str] = &["🤖", "👾", "👽", "👻", "💀", "☠️", "🎃"];

impl AvatarStyle {
    /// Unknown styles fall back to `Human`.
    pub fn parse(s: &str) -> Self {
        match s {
            "surname" => Self::Surname,
            "animal" => Self::Animal,
            "plant" => Self::Plant,
            "robot" => Self::Robot,
            _ => Self::Human,
        }
    }

    fn glyphs(self) -> &'static [&'static str] {
        match self {
            Self::Surname | Self::Human => HUMAN,
            Self::Animal => ANIMAL,
            Self::Plant => PLANT,
            Self::Robot => ROBOT,
        }
    }
}

pub fn set_avatars(state: &AppState, class_id: &str, style: AvatarStyle, seed: u64) -> Result<AppState> {
    let mut rng = StdRng::seed_from_u64(seed);
    let glyphs = style.glyphs();
    Ok(map_students(state, |s| {
        if s.class_id != class_id {
            return None;
        }
        let avatar = match style {
            AvatarStyle::Surname => avatar_for(&s.name),
            _ => glyphs[rng.random_range(0..glyphs.len())].to_string(),
        };
        Some(Student {
            avatar,
            ..s.clone()
        })
    }))
}

pub fn sort_current_class_by_name(state: &AppState) -> Result<AppState> {
    let class_id = state.current_class_id();
    let mut ordered: Vec<Student> = state
        .class_students(&class_id)
        .into_iter()
        .cloned()
        .collect();
    ordered.sort_by(|a, b| compare_names(&a.name, &b.name));

    let mut next = state.clone();
    next.students = replace_class_order(&state.students, &class_id, ordered);
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::super::testutil::*;
    use super::*;
    use crate::model::default_state;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 1).expect("date")
    }

    #[test]
    fn roster_text_splits_on_all_separators() {
        let names = parse_student_names("王小明, 李小華，陳大文\n  Amy\tBob\n\n");
        assert_eq!(names, vec!["王小明", "李小華", "陳大文", "Amy", "Bob"]);
    }

    #[test]
    fn avatar_prefers_first_cjk_ideograph() {
        assert_eq!(avatar_for("01王小明"), "王");
        assert_eq!(avatar_for("Amy"), "A");
        assert_eq!(avatar_for(""), "");
    }

    #[test]
    fn add_students_appends_to_class() {
        let state = default_state();
        let next = add_students(&state, "王小明\n李小華", "c1").expect("add");
        assert_eq!(next.students.len(), state.students.len() + 2);
        let added = &next.students[state.students.len()];
        assert_eq!(added.name, "王小明");
        assert_eq!(added.avatar, "王");
        assert_eq!(added.score, 0);
        assert_eq!(added.class_id, "c1");
        assert!(added.note.is_empty());
        assert!(!added.show_record);
    }

    #[test]
    fn add_students_rejects_blank_text() {
        let state = default_state();
        assert!(matches!(
            add_students(&state, " ,\n ", "c1"),
            Err(GradebookError::Validation(_))
        ));
    }

    #[test]
    fn move_student_only_touches_its_class() {
        let state = interleaved();
        let next = move_student(&state, 0, 2, "a").expect("move");
        assert_eq!(class_ids(&next, "a"), vec!["a2", "a3", "a1"]);
        assert_eq!(class_ids(&next, "b"), class_ids(&state, "b"));
        assert_eq!(next.students[1].id, "b1");
        assert_eq!(next.students[3].id, "b2");
    }

    #[test]
    fn move_student_equal_indices_is_noop_and_range_checked() {
        let state = interleaved();
        assert_eq!(move_student(&state, 1, 1, "a").expect("noop"), state);
        assert_eq!(
            move_student(&state, 0, 3, "a"),
            Err(GradebookError::Range { index: 3, len: 3 })
        );
        assert_eq!(
            move_student(&state, 5, 0, "b"),
            Err(GradebookError::Range { index: 5, len: 2 })
        );
    }

    #[test]
    fn score_updates_single_and_bulk_without_clamping() {
        let state = interleaved();
        let one = update_student_score(&state, &ScoreTarget::One("a1".into()), -7).expect("one");
        assert_eq!(one.student("a1").map(|s| s.score), Some(-7));
        assert_eq!(one.student("a2").map(|s| s.score), Some(0));

        let many = update_student_score(
            &one,
            &ScoreTarget::Many(vec!["a1".into(), "b2".into()]),
            3,
        )
        .expect("many");
        assert_eq!(many.student("a1").map(|s| s.score), Some(-4));
        assert_eq!(many.student("b2").map(|s| s.score), Some(3));
        assert_eq!(many.student("b1").map(|s| s.score), Some(0));
    }

    #[test]
    fn score_overflow_is_rejected() {
        let mut state = interleaved();
        state.students[0].score = i64::MAX - 1;
        let err = update_student_score(&state, &ScoreTarget::One("a1".into()), 2)
            .expect_err("overflow");
        assert_eq!(err.code(), "validation_failed");

        let err = update_student_score(
            &state,
            &ScoreTarget::Many(vec!["a2".into(), "a1".into()]),
            i64::MAX,
        )
        .expect_err("overflow");
        assert!(matches!(err, GradebookError::Validation(_)));

        let min = update_student_score(&state, &ScoreTarget::One("a2".into()), i64::MIN)
            .expect("min");
        assert_eq!(min.student("a2").map(|s| s.score), Some(i64::MIN));
    }

    #[test]
    fn toggle_leave_logs_only_when_leaving() {
        let state = interleaved();
        let away = toggle_leave(&state, "a1", day()).expect("leave");
        let s = away.student("a1").expect("student");
        assert!(s.on_leave());
        assert_eq!(s.note, "2025/10/01 請假");

        let back = toggle_leave(&away, "a1", day()).expect("return");
        let s = back.student("a1").expect("student");
        assert!(!s.on_leave());
        assert_eq!(s.note, "2025/10/01 請假");
    }

    #[test]
    fn append_note_prefixes_date() {
        let state = default_state();
        let next = append_student_note(&state, "s3", "遲到", day()).expect("append");
        assert_eq!(
            next.student("s3").map(|s| s.note.as_str()),
            Some("2025/09/23 還未進入classroom\n2025/10/01 遲到")
        );
    }

    #[test]
    fn sort_by_name_keeps_other_class_positions() {
        let state = interleaved();
        let next = sort_current_class_by_name(&state).expect("sort");
        assert_eq!(ids(&next), vec!["a2", "b1", "a3", "b2", "a1"]);
    }

    #[test]
    fn toggle_records_hides_when_any_shown() {
        let mut state = interleaved();
        state.students[0].show_record = true;
        let hidden = toggle_records(&state, "a").expect("toggle");
        assert!(hidden.class_students("a").iter().all(|s| !s.show_record));
        let shown = toggle_records(&hidden, "a").expect("toggle");
        assert!(shown.class_students("a").iter().all(|s| s.show_record));
        assert!(shown.class_students("b").iter().all(|s| !s.show_record));
    }

    #[test]
    fn seeded_avatars_are_deterministic_and_scoped() {
        let state = interleaved();
        let a = set_avatars(&state, "a", AvatarStyle::Animal, 7).expect("avatars");
        let b = set_avatars(&state, "a", AvatarStyle::Animal, 7).expect("avatars");
        assert_eq!(a, b);
        assert!(a
            .class_students("a")
            .iter()
            .all(|s| ANIMAL.contains(&s.avatar.as_str())));
        assert!(a.class_students("b").iter().all(|s| s.avatar.is_empty()));
    }

    #[test]
    fn patch_updates_selected_fields() {
        let state = default_state();
        let patch = StudentPatch {
            note: Some("raw edit".into()),
            show_record: Some(true),
            ..StudentPatch::default()
        };
        let next = update_student(&state, "s1", &patch).expect("patch");
        let s = next.student("s1").expect("student");
        assert_eq!(s.note, "raw edit");
        assert!(s.show_record);
        assert_eq!(s.name, "顏維均01");
    }
}
