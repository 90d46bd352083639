use crate::ipc::helpers::{get_i64, get_parsed, get_str, get_usize, mutate, today, HandlerErr};
use crate::ipc::types::Request;
use crate::ops;
use crate::session::Session;

type HandlerResult = Result<serde_json::Value, HandlerErr>;

fn handle_groups_create(session: &mut Session, req: &Request) -> HandlerResult {
    let name = get_str(req, "name")?;
    let member_ids: Vec<String> = get_parsed(req, "memberIds")?;
    Ok(mutate(session, req, |s| ops::create_group(s, &name, &member_ids)))
}

fn handle_groups_delete(session: &mut Session, req: &Request) -> HandlerResult {
    let group_id = get_str(req, "groupId")?;
    Ok(mutate(session, req, |s| ops::delete_group(s, &group_id)))
}

fn handle_groups_update_temp_score(session: &mut Session, req: &Request) -> HandlerResult {
    let group_id = get_str(req, "groupId")?;
    let delta = get_i64(req, "delta")?;
    Ok(mutate(session, req, |s| ops::update_temp_score(s, &group_id, delta)))
}

fn handle_groups_update_temp_tag(session: &mut Session, req: &Request) -> HandlerResult {
    let group_id = get_str(req, "groupId")?;
    let tag = get_str(req, "tag")?;
    let today = today(req)?;
    Ok(mutate(session, req, |s| {
        ops::update_temp_tag(s, &group_id, &tag, today)
    }))
}

fn handle_groups_remove_temp_tag(session: &mut Session, req: &Request) -> HandlerResult {
    let group_id = get_str(req, "groupId")?;
    let index = get_usize(req, "index")?;
    Ok(mutate(session, req, |s| ops::remove_temp_tag(s, &group_id, index)))
}

fn handle_groups_commit_scores(session: &mut Session, req: &Request) -> HandlerResult {
    Ok(mutate(session, req, ops::commit_group_scores))
}

pub fn try_handle(session: &mut Session, req: &Request) -> Option<serde_json::Value> {
    let res = match req.method.as_str() {
        "groups.create" => handle_groups_create(session, req),
        "groups.delete" => handle_groups_delete(session, req),
        "groups.updateTempScore" => handle_groups_update_temp_score(session, req),
        "groups.updateTempTag" => handle_groups_update_temp_tag(session, req),
        "groups.removeTempTag" => handle_groups_remove_temp_tag(session, req),
        "groups.commitScores" => handle_groups_commit_scores(session, req),
        _ => return None,
    };
    Some(res.unwrap_or_else(|e| e.response(&req.id)))
}
