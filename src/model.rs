use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub class_id: String,
    pub name: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub record_tag: String,
    #[serde(default)]
    pub show_record: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_on_leave: Option<bool>,
}

impl Student {
    pub fn on_leave(&self) -> bool {
        self.is_on_leave.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactBookEntry {
    #[serde(default)]
    pub important: String,
    #[serde(default)]
    pub homework: String,
}

impl ContactBookEntry {
    /// Non-blank homework lines, in entry order.
    pub fn homework_items(&self) -> Vec<String> {
        self.homework
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| l.to_string())
            .collect()
    }
}

/// Explicit homework evaluation. "Not yet evaluated" is the absence of an
/// entry, never a value of this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum HomeworkStatus {
    NotSubmitted,
    Submitted,
    NeedsCorrection,
}

impl HomeworkStatus {
    /// Next state when a student is tapped on the check sheet. An unevaluated student is
    /// shown as submitted, so the first tap marks it not-submitted.
    pub fn cycle(current: Option<HomeworkStatus>) -> HomeworkStatus {
        match current.unwrap_or(HomeworkStatus::Submitted) {
            HomeworkStatus::Submitted => HomeworkStatus::NotSubmitted,
            HomeworkStatus::NotSubmitted => HomeworkStatus::NeedsCorrection,
            HomeworkStatus::NeedsCorrection => HomeworkStatus::Submitted,
        }
    }
}

impl From<HomeworkStatus> for u8 {
    fn from(s: HomeworkStatus) -> u8 {
        match s {
            HomeworkStatus::NotSubmitted => 0,
            HomeworkStatus::Submitted => 1,
            HomeworkStatus::NeedsCorrection => 2,
        }
    }
}

impl TryFrom<u8> for HomeworkStatus {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            0 => Ok(HomeworkStatus::NotSubmitted),
            1 => Ok(HomeworkStatus::Submitted),
            2 => Ok(HomeworkStatus::NeedsCorrection),
            other => Err(format!("homework status must be 0, 1 or 2 (got {})", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsOptions {
    #[serde(default)]
    pub behaviors: Vec<String>,
    #[serde(default)]
    pub important_info: Vec<String>,
    #[serde(default)]
    pub homework_presets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatArrangement {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub student_order: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub member_ids: Vec<String>,
    #[serde(default)]
    pub temp_score: i64,
    #[serde(default)]
    pub temp_tags: Vec<String>,
}

impl Group {
    pub fn has_pending_stage(&self) -> bool {
        self.temp_score != 0 || !self.temp_tags.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSettings {
    pub rows_per_page: u32,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self { rows_per_page: 6 }
    }
}

/// The whole gradebook. Keyed collections are BTreeMaps so that two equal
/// states always encode to the same bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub classes: Vec<ClassInfo>,
    #[serde(default)]
    pub current_class_id: String,
    pub students: Vec<Student>,
    #[serde(default)]
    pub contact_books: BTreeMap<String, ContactBookEntry>,
    #[serde(default)]
    pub homework_status: BTreeMap<String, BTreeMap<String, HomeworkStatus>>,
    #[serde(default)]
    pub settings_options: SettingsOptions,
    #[serde(default)]
    pub seat_arrangements: Vec<SeatArrangement>,
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub settings: LayoutSettings,
    /// Top-level fields written by newer clients.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

pub fn homework_key(date: &str, item: &str) -> String {
    format!("hw-{}-{}", date, item)
}

impl AppState {
    /// Current class, falling back to the first class when the reference dangles.
    pub fn current_class(&self) -> Option<&ClassInfo> {
        self.classes
            .iter()
            .find(|c| c.id == self.current_class_id)
            .or_else(|| self.classes.first())
    }

    pub fn current_class_id(&self) -> String {
        self.current_class()
            .map(|c| c.id.clone())
            .unwrap_or_default()
    }

    pub fn has_class(&self, class_id: &str) -> bool {
        self.classes.iter().any(|c| c.id == class_id)
    }

    pub fn class_students(&self, class_id: &str) -> Vec<&Student> {
        self.students
            .iter()
            .filter(|s| s.class_id == class_id)
            .collect()
    }

    pub fn student(&self, student_id: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.id == student_id)
    }

    pub fn homework_status(
        &self,
        date: &str,
        item: &str,
        student_id: &str,
    ) -> Option<HomeworkStatus> {
        self.homework_status
            .get(&homework_key(date, item))
            .and_then(|m| m.get(student_id))
            .copied()
    }

    /// Repairs the two structural invariants after decoding untrusted input.
    pub fn normalize(mut self) -> Self {
        if self.classes.is_empty() {
            self.classes = default_state().classes;
        }
        if !self.has_class(&self.current_class_id) {
            self.current_class_id = self.classes[0].id.clone();
        }
        self
    }

    pub fn encode(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Structural equality: both sides encode to identical bytes.
    pub fn same_content(&self, other: &AppState) -> bool {
        match (self.encode(), other.encode()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

fn demo_student(id: &str, name: &str, score: i64, note: &str, tag: &str) -> Student {
    Student {
        id: id.to_string(),
        class_id: "c1".to_string(),
        name: name.to_string(),
        score,
        avatar: name.chars().next().map(String::from).unwrap_or_default(),
        note: note.to_string(),
        record_tag: tag.to_string(),
        show_record: !note.is_empty(),
        is_on_leave: None,
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn default_state() -> AppState {
    AppState {
        classes: vec![ClassInfo {
            id: "c1".to_string(),
            name: "五年12班".to_string(),
        }],
        current_class_id: "c1".to_string(),
        students: vec![
            demo_student("s1", "顏維均01", 2, "", ""),
            demo_student("s2", "顏維佑02", 0, "", ""),
            demo_student("s3", "林憲弘03", -1, "2025/09/23 還未進入classroom", "homework"),
            demo_student("s4", "黃仲儒04", -2, "", ""),
            demo_student("s5", "彭覺寬05", 0, "", ""),
            demo_student("s6", "楊以樂06", -3, "", ""),
        ],
        contact_books: BTreeMap::new(),
        homework_status: BTreeMap::new(),
        settings_options: SettingsOptions {
            behaviors: strings(&[
                "好行為值得嘉獎",
                "主動協助同學",
                "積極發言",
                "忘記帳號密碼",
                "作業缺交",
                "遲到",
                "打掃認真",
                "上課搗蛋",
            ]),
            important_info: strings(&[
                "明天帶美術用具",
                "下週一體育課請穿體育服",
                "繳交綜合活動學習單",
                "校外教學活動通知單已發放",
                "班級旅遊費用請於本週內繳交",
                "明天有數學小考",
                "參加語文競賽",
                "校園環境打掃活動",
            ]),
            homework_presets: strings(&[
                "國語第1課生字",
                "圈詞",
                "查生字",
                "國語習作第1課",
                "數學習作P.10",
                "英文講義 Ch.1",
            ]),
        },
        seat_arrangements: Vec::new(),
        groups: Vec::new(),
        settings: LayoutSettings::default(),
        extra: BTreeMap::new(),
    }
}
