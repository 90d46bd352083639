use crate::error::{GradebookError, Result};
use crate::ipc::error::{err, ok};
use crate::ipc::types::Request;
use crate::model::AppState;
use crate::session::Session;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Instant;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<GradebookError> for HandlerErr {
    fn from(e: GradebookError) -> Self {
        let details = match &e {
            GradebookError::Range { index, len } => Some(json!({ "index": index, "len": len })),
            _ => None,
        };
        Self {
            code: e.code(),
            message: e.to_string(),
            details,
        }
    }
}

pub fn get_str(req: &Request, key: &str) -> std::result::Result<String, HandlerErr> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn opt_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.trim().to_string())
}

pub fn get_i64(req: &Request, key: &str) -> std::result::Result<i64, HandlerErr> {
    req.params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn get_usize(req: &Request, key: &str) -> std::result::Result<usize, HandlerErr> {
    req.params
        .get(key)
        .and_then(|v| v.as_u64())
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing or negative {}", key)))
}

pub fn get_parsed<T: DeserializeOwned>(req: &Request, key: &str) -> std::result::Result<T, HandlerErr> {
    let Some(v) = req.params.get(key) else {
        return Err(HandlerErr::bad_params(format!("missing {}", key)));
    };
    serde_json::from_value(v.clone())
        .map_err(|e| HandlerErr::bad_params(format!("invalid {}: {}", key, e)))
}

/// `params.classId`, or the current class when omitted.
pub fn class_id_or_current(session: &Session, req: &Request) -> String {
    opt_str(req, "classId").unwrap_or_else(|| session.state().current_class_id())
}

/// `params.today` as `YYYY-MM-DD`, or the local date when omitted.
pub fn today(req: &Request) -> std::result::Result<NaiveDate, HandlerErr> {
    match opt_str(req, "today") {
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map_err(|_| HandlerErr::bad_params(format!("today must be YYYY-MM-DD (got {})", s))),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

pub fn state_result(session: &Session) -> serde_json::Value {
    json!({
        "version": session.version(),
        "state": &*session.state(),
    })
}

/// Runs a mutation through the session and answers with the new state.
pub fn mutate<F>(session: &mut Session, req: &Request, op: F) -> serde_json::Value
where
    F: FnOnce(&AppState) -> Result<AppState>,
{
    match session.apply(op, Instant::now()) {
        Ok(_) => ok(&req.id, state_result(session)),
        Err(e) => HandlerErr::from(e).response(&req.id),
    }
}
