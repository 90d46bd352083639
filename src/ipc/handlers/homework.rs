use crate::error::GradebookError;
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_parsed, get_str, mutate, state_result, HandlerErr};
use crate::ipc::types::Request;
use crate::model::{ContactBookEntry, HomeworkStatus};
use crate::ops;
use crate::session::Session;
use serde_json::json;
use std::time::Instant;

type HandlerResult = Result<serde_json::Value, HandlerErr>;

fn handle_contact_book_get(session: &mut Session, req: &Request) -> HandlerResult {
    let date = get_str(req, "date")?;
    let state = session.state();
    let entry = state.contact_books.get(&date).cloned().unwrap_or_default();
    Ok(ok(
        &req.id,
        json!({
            "date": date,
            "entry": entry,
            "items": entry.homework_items(),
        }),
    ))
}

fn handle_contact_book_save(session: &mut Session, req: &Request) -> HandlerResult {
    let date = get_str(req, "date")?;
    let text = |key: &str| {
        req.params
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    };
    let entry = ContactBookEntry {
        important: text("important"),
        homework: text("homework"),
    };
    Ok(mutate(session, req, |s| ops::save_contact_book(s, &date, entry)))
}

fn handle_homework_items(session: &mut Session, req: &Request) -> HandlerResult {
    let date = get_str(req, "date")?;
    Ok(ok(
        &req.id,
        json!({ "items": ops::homework_items(&session.state(), &date) }),
    ))
}

fn handle_homework_set_status(session: &mut Session, req: &Request) -> HandlerResult {
    let date = get_str(req, "date")?;
    let student_id = get_str(req, "studentId")?;
    let item = get_str(req, "item")?;
    let status: HomeworkStatus = get_parsed(req, "status")?;
    Ok(mutate(session, req, |s| {
        ops::set_homework_status(s, &date, &student_id, status, &item)
    }))
}

fn handle_homework_cycle(session: &mut Session, req: &Request) -> HandlerResult {
    let date = get_str(req, "date")?;
    let student_id = get_str(req, "studentId")?;
    let item = get_str(req, "item")?;
    let mut written = None;
    let res = session.apply(
        |s| {
            let (next, status) = ops::cycle_homework_status(s, &date, &student_id, &item)?;
            written = Some(status);
            Ok(next)
        },
        Instant::now(),
    );
    res?;
    let Some(status) = written else {
        return Err(GradebookError::invariant("no status written").into());
    };
    let mut result = state_result(session);
    result["status"] = json!(status);
    Ok(ok(&req.id, result))
}

fn handle_homework_stats(session: &mut Session, req: &Request) -> HandlerResult {
    let student_id = get_str(req, "studentId")?;
    Ok(ok(
        &req.id,
        json!(ops::homework_stats(&session.state(), &student_id)),
    ))
}

pub fn try_handle(session: &mut Session, req: &Request) -> Option<serde_json::Value> {
    let res = match req.method.as_str() {
        "contactBook.get" => handle_contact_book_get(session, req),
        "contactBook.save" => handle_contact_book_save(session, req),
        "homework.items" => handle_homework_items(session, req),
        "homework.setStatus" => handle_homework_set_status(session, req),
        "homework.cycle" => handle_homework_cycle(session, req),
        "homework.stats" => handle_homework_stats(session, req),
        _ => return None,
    };
    Some(res.unwrap_or_else(|e| e.response(&req.id)))
}
