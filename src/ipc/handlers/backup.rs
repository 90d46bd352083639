use crate::export;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{get_str, opt_str, today, HandlerErr};
use crate::ipc::types::Request;
use crate::session::Session;
use serde_json::json;
use std::path::PathBuf;
use std::time::Instant;

type HandlerResult = Result<serde_json::Value, HandlerErr>;

/// `params.outDir`, else the workspace folder.
fn out_dir(session: &Session, req: &Request) -> Option<PathBuf> {
    opt_str(req, "outDir")
        .map(PathBuf::from)
        .or_else(|| session.workspace().map(|p| p.to_path_buf()))
}

fn handle_backup_export_json(session: &mut Session, req: &Request) -> HandlerResult {
    let date = today(req)?;
    let Some(dir) = out_dir(session, req) else {
        return Ok(err(&req.id, "no_workspace", "select a workspace or pass outDir", None));
    };
    Ok(match export::export_json(&session.state(), &dir, date) {
        Ok(path) => ok(&req.id, json!({ "path": path.to_string_lossy() })),
        Err(e) => err(
            &req.id,
            "storage_failed",
            format!("{e:#}"),
            Some(json!({ "path": dir.to_string_lossy() })),
        ),
    })
}

fn handle_backup_import_json(session: &mut Session, req: &Request) -> HandlerResult {
    let in_path = get_str(req, "inPath")?;
    let src = PathBuf::from(in_path.trim());
    if !src.is_file() {
        return Ok(err(
            &req.id,
            "not_found",
            "backup file not found",
            Some(json!({ "path": in_path })),
        ));
    }
    let state = export::import_json(&src)?;
    session.import(state, Instant::now());
    Ok(ok(
        &req.id,
        json!({
            "version": session.version(),
            "state": &*session.state(),
        }),
    ))
}

fn handle_backup_export_workbook(session: &mut Session, req: &Request) -> HandlerResult {
    let date = today(req)?;
    let out_path = match opt_str(req, "outPath") {
        Some(p) => PathBuf::from(p),
        None => match out_dir(session, req) {
            Some(dir) => dir.join(export::workbook_file_name(date)),
            None => {
                return Ok(err(
                    &req.id,
                    "no_workspace",
                    "select a workspace or pass outPath",
                    None,
                ))
            }
        },
    };
    Ok(match export::export_workbook(&session.state(), &out_path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "path": summary.path.to_string_lossy(),
                "sheetCount": summary.sheet_count,
                "rowCount": summary.row_count,
            }),
        ),
        Err(e) => err(
            &req.id,
            "storage_failed",
            format!("{e:#}"),
            Some(json!({ "path": out_path.to_string_lossy() })),
        ),
    })
}

pub fn try_handle(session: &mut Session, req: &Request) -> Option<serde_json::Value> {
    let res = match req.method.as_str() {
        "backup.exportJson" => handle_backup_export_json(session, req),
        "backup.importJson" => handle_backup_import_json(session, req),
        "backup.exportWorkbook" => handle_backup_export_workbook(session, req),
        _ => return None,
    };
    Some(res.unwrap_or_else(|e| e.response(&req.id)))
}
