use crate::ipc::helpers::{get_str, mutate, HandlerErr};
use crate::ipc::types::Request;
use crate::ops;
use crate::session::Session;

fn handle_classes_add(session: &mut Session, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let name = get_str(req, "name")?;
    Ok(mutate(session, req, |s| ops::add_class(s, &name)))
}

fn handle_classes_rename(session: &mut Session, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_str(req, "classId")?;
    let name = get_str(req, "name")?;
    Ok(mutate(session, req, |s| ops::rename_class(s, &class_id, &name)))
}

fn handle_classes_select(session: &mut Session, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_str(req, "classId")?;
    Ok(mutate(session, req, |s| ops::select_class(s, &class_id)))
}

fn handle_classes_delete(session: &mut Session, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_str(req, "classId")?;
    Ok(mutate(session, req, |s| ops::delete_class(s, &class_id)))
}

pub fn try_handle(session: &mut Session, req: &Request) -> Option<serde_json::Value> {
    let res = match req.method.as_str() {
        "classes.add" => handle_classes_add(session, req),
        "classes.rename" => handle_classes_rename(session, req),
        "classes.select" => handle_classes_select(session, req),
        "classes.delete" => handle_classes_delete(session, req),
        _ => return None,
    };
    Some(res.unwrap_or_else(|e| e.response(&req.id)))
}
