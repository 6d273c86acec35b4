use std::fs;

use crate::{bronze::{LandRequest, RawLander}, config, error, success, warning};

/// Lands a JSON file from disk. The API is not involved.
pub fn land(file: &str, base_dir: Option<String>, request: LandRequest) {
    let raw_text = match fs::read_to_string(file) {
        Ok(text) => text,
        Err(e) => error!("Cannot read {}. Err: {}", file, e),
    };

    let base_dir = base_dir.unwrap_or_else(config::bronze_base_dir);
    let lander = RawLander::new(&base_dir);

    let paths = match lander.land(&raw_text, &request) {
        Ok(paths) => paths,
        Err(e) => error!("Landing failed: {}", e),
    };

    if !paths.data_written {
        if paths.existing_matches == Some(false) {
            warning!("Data file exists with different content; kept it (use --overwrite to replace)");
        } else {
            warning!("Data file already present; kept it");
        }
    }

    super::print_landed(&[(request.page, &paths)]);
    success!("Landed {}", file);
}
