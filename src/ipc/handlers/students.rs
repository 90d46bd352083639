use crate::ipc::helpers::{
    class_id_or_current, get_i64, get_parsed, get_str, get_usize, mutate, opt_str, today,
    HandlerErr,
};
use crate::ipc::types::Request;
use crate::ops::{self, AvatarStyle, ScoreTarget, StudentPatch};
use crate::session::Session;

type HandlerResult = Result<serde_json::Value, HandlerErr>;

fn handle_students_add(session: &mut Session, req: &Request) -> HandlerResult {
    let text = get_str(req, "text")?;
    let class_id = class_id_or_current(session, req);
    Ok(mutate(session, req, |s| ops::add_students(s, &text, &class_id)))
}

fn handle_students_update(session: &mut Session, req: &Request) -> HandlerResult {
    let student_id = get_str(req, "studentId")?;
    let patch: StudentPatch = get_parsed(req, "patch")?;
    Ok(mutate(session, req, |s| ops::update_student(s, &student_id, &patch)))
}

fn handle_students_append_note(session: &mut Session, req: &Request) -> HandlerResult {
    let student_id = get_str(req, "studentId")?;
    let text = get_str(req, "text")?;
    let today = today(req)?;
    Ok(mutate(session, req, |s| {
        ops::append_student_note(s, &student_id, &text, today)
    }))
}

fn handle_students_delete(session: &mut Session, req: &Request) -> HandlerResult {
    let student_id = get_str(req, "studentId")?;
    Ok(mutate(session, req, |s| ops::delete_student(s, &student_id)))
}

fn handle_students_move(session: &mut Session, req: &Request) -> HandlerResult {
    let from = get_usize(req, "from")?;
    let to = get_usize(req, "to")?;
    let class_id = class_id_or_current(session, req);
    Ok(mutate(session, req, |s| ops::move_student(s, from, to, &class_id)))
}

fn handle_students_update_score(session: &mut Session, req: &Request) -> HandlerResult {
    let target = match (req.params.get("studentIds"), opt_str(req, "studentId")) {
        (Some(_), _) => ScoreTarget::Many(get_parsed(req, "studentIds")?),
        (None, Some(id)) => ScoreTarget::One(id),
        (None, None) => return Err(HandlerErr::bad_params("missing studentId or studentIds")),
    };
    let delta = get_i64(req, "delta")?;
    Ok(mutate(session, req, |s| ops::update_student_score(s, &target, delta)))
}

fn handle_students_toggle_leave(session: &mut Session, req: &Request) -> HandlerResult {
    let student_id = get_str(req, "studentId")?;
    let today = today(req)?;
    Ok(mutate(session, req, |s| ops::toggle_leave(s, &student_id, today)))
}

fn handle_students_reset_class(session: &mut Session, req: &Request) -> HandlerResult {
    let class_id = class_id_or_current(session, req);
    Ok(mutate(session, req, |s| ops::reset_class(s, &class_id)))
}

fn handle_students_toggle_records(session: &mut Session, req: &Request) -> HandlerResult {
    let class_id = class_id_or_current(session, req);
    Ok(mutate(session, req, |s| ops::toggle_records(s, &class_id)))
}

fn handle_students_set_avatars(session: &mut Session, req: &Request) -> HandlerResult {
    let class_id = class_id_or_current(session, req);
    let style = AvatarStyle::parse(&opt_str(req, "style").unwrap_or_default());
    let seed = req
        .params
        .get("seed")
        .and_then(|v| v.as_u64())
        .unwrap_or_else(rand::random);
    Ok(mutate(session, req, |s| ops::set_avatars(s, &class_id, style, seed)))
}

fn handle_students_sort_by_name(session: &mut Session, req: &Request) -> HandlerResult {
    Ok(mutate(session, req, ops::sort_current_class_by_name))
}

pub fn try_handle(session: &mut Session, req: &Request) -> Option<serde_json::Value> {
    let res = match req.method.as_str() {
        "students.add" => handle_students_add(session, req),
        "students.update" => handle_students_update(session, req),
        "students.appendNote" => handle_students_append_note(session, req),
        "students.delete" => handle_students_delete(session, req),
        "students.move" => handle_students_move(session, req),
        "students.updateScore" => handle_students_update_score(session, req),
        "students.toggleLeave" => handle_students_toggle_leave(session, req),
        "students.resetClass" => handle_students_reset_class(session, req),
        "students.toggleRecords" => handle_students_toggle_records(session, req),
        "students.setAvatars" => handle_students_set_avatars(session, req),
        "students.sortByName" => handle_students_sort_by_name(session, req),
        _ => return None,
    };
    Some(res.unwrap_or_else(|e| e.response(&req.id)))
}
