use classbookd::export;
use classbookd::model::{default_state, HomeworkStatus};
use classbookd::ops;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn read_entry(archive: &mut zip::ZipArchive<File>, name: &str) -> String {
    let mut text = String::new();
    archive
        .by_name(name)
        .unwrap_or_else(|_| panic!("missing entry {}", name))
        .read_to_string(&mut text)
        .expect("read entry");
    text
}

#[test]
fn workbook_has_one_checksummed_sheet_per_class() {
    let out_dir = temp_dir("classbookd-workbook");
    let state = ops::add_class(&default_state(), "一年1班").expect("add");
    let cid = state.current_class_id.clone();
    let state = ops::add_students(&state, "張三", &cid).expect("student");
    let state = ops::set_homework_status(&state, "2025-10-01", "s1", HomeworkStatus::NotSubmitted, "圈詞")
        .expect("hw");
    let state = ops::set_homework_status(&state, "2025-10-02", "s1", HomeworkStatus::NeedsCorrection, "圈詞")
        .expect("hw");

    let path = out_dir.join("classroom_data_2025-10-02.zip");
    let summary = export::export_workbook(&state, &path).expect("export");
    assert_eq!(summary.sheet_count, 2);
    assert_eq!(summary.row_count, 7);

    let mut archive = zip::ZipArchive::new(File::open(&path).expect("open")).expect("zip");
    let manifest: serde_json::Value =
        serde_json::from_str(&read_entry(&mut archive, "manifest.json")).expect("manifest json");
    assert_eq!(manifest["format"], export::WORKBOOK_FORMAT);
    let sheets = manifest["sheets"].as_array().expect("sheets");
    let names: Vec<&str> = sheets.iter().filter_map(|s| s["className"].as_str()).collect();
    assert_eq!(names, vec!["一年1班", "五年12班"]);

    for sheet in sheets {
        let entry = sheet["entry"].as_str().expect("entry");
        let csv = read_entry(&mut archive, entry);
        let mut hasher = Sha256::new();
        hasher.update(csv.as_bytes());
        assert_eq!(sheet["sha256"], format!("{:x}", hasher.finalize()));
        assert!(csv.starts_with("ID,姓名,分數,未繳交次數,待訂正次數,表現,備註\n"));
    }

    let main_sheet = read_entry(&mut archive, "sheets/02-五年12班.csv");
    let s1_row = main_sheet
        .lines()
        .find(|l| l.starts_with("s1,"))
        .expect("s1 row");
    assert_eq!(s1_row, "s1,顏維均01,2,1,1,,");
    assert!(main_sheet.contains("s3,林憲弘03,-1,0,0,homework,2025/09/23 還未進入classroom"));

    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn json_backup_round_trips_through_import() {
    let out_dir = temp_dir("classbookd-json-backup");
    let date = chrono::NaiveDate::from_ymd_opt(2025, 10, 1).expect("date");
    let state = ops::add_class(&default_state(), "六年1班").expect("add");

    let path = export::export_json(&state, &out_dir, date).expect("export");
    assert_eq!(
        path.file_name().and_then(|n| n.to_str()),
        Some("classroom_backup_2025-10-01.json")
    );
    let text = std::fs::read_to_string(&path).expect("read");
    assert!(text.contains("\n  \"classes\""));
    let back = export::import_json(&path).expect("import");
    assert_eq!(back, state);

    let missing = export::import_json(&out_dir.join("nope.json")).expect_err("missing file");
    assert_eq!(missing.code(), "decode_failed");
    let _ = std::fs::remove_dir_all(out_dir);
}
