use crate::error::{GradebookError, Result};
use crate::model::{AppState, SettingsOptions};

pub const MAX_ROWS_PER_PAGE: u32 = 12;

fn clean(list: &[String]) -> Vec<String> {
    list.iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn update_settings_options(state: &AppState, options: &SettingsOptions) -> Result<AppState> {
    let mut next = state.clone();
    next.settings_options = SettingsOptions {
        behaviors: clean(&options.behaviors),
        important_info: clean(&options.important_info),
        homework_presets: clean(&options.homework_presets),
    };
    Ok(next)
}

pub fn set_rows_per_page(state: &AppState, rows: u32) -> Result<AppState> {
    if !(1..=MAX_ROWS_PER_PAGE).contains(&rows) {
        return Err(GradebookError::Range {
            index: rows as usize,
            len: MAX_ROWS_PER_PAGE as usize + 1,
        });
    }
    let mut next = state.clone();
    next.settings.rows_per_page = rows;
    Ok(next)
}
