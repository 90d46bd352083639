use crate::ipc::helpers::{get_parsed, mutate, HandlerErr};
use crate::ipc::types::Request;
use crate::model::SettingsOptions;
use crate::ops;
use crate::session::Session;

fn handle_settings_update_options(
    session: &mut Session,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let options: SettingsOptions = get_parsed(req, "options")?;
    Ok(mutate(session, req, |s| ops::update_settings_options(s, &options)))
}

fn handle_settings_set_rows_per_page(
    session: &mut Session,
    req: &Request,
) -> Result<serde_json::Value, HandlerErr> {
    let rows: u32 = get_parsed(req, "rowsPerPage")?;
    Ok(mutate(session, req, |s| ops::set_rows_per_page(s, rows)))
}

pub fn try_handle(session: &mut Session, req: &Request) -> Option<serde_json::Value> {
    let res = match req.method.as_str() {
        "settings.updateOptions" => handle_settings_update_options(session, req),
        "settings.setRowsPerPage" => handle_settings_set_rows_per_page(session, req),
        _ => return None,
    };
    Some(res.unwrap_or_else(|e| e.response(&req.id)))
}
