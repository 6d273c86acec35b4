use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    config::{self, Settings},
    error,
    pipeline::{IngestJob, IngestPipeline},
    success, warning,
};

/// Runs the full pipeline for one job.
///
/// `base_dir` overrides `BRONZE_BASE_DIR` when given. Credentials must be
/// present in the environment; a missing one terminates with a configuration
/// error before any network call.
pub fn ingest(job: IngestJob, base_dir: Option<String>) {
    let mut settings = match Settings::from_env() {
        Ok(s) => s,
        Err(e) => error!(
            "{}\nSet it in the environment or in {}",
            e,
            config::env_file_path().display()
        ),
    };
    if let Some(dir) = base_dir {
        settings.base_dir = dir;
    }

    let pipeline = match IngestPipeline::from_settings(&settings) {
        Ok(p) => p,
        Err(e) => error!("Cannot set up pipeline. Err: {}", e),
    };

    let pb = ProgressBar::new_spinner();
    pb.set_message(format!(
        "Fetching '{}' ({}) into {}...",
        job.query, job.search_type, settings.base_dir
    ));
    pb.enable_steady_tick(Duration::from_millis(100));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.blue} {msg}") {
        pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
    }

    let landed = match pipeline.run(&job) {
        Ok(landed) => landed,
        Err(e) => {
            pb.finish_and_clear();
            error!("Ingest failed: {}", e);
        }
    };
    pb.finish_and_clear();

    for page in landed.iter().filter(|p| !p.paths.data_written) {
        match page.paths.existing_matches {
            Some(false) => warning!(
                "Page {} already landed with different content; kept existing data file",
                page.page
            ),
            _ => warning!("Page {} already landed; kept existing data file", page.page),
        }
    }

    let rows: Vec<_> = landed.iter().map(|p| (p.page, &p.paths)).collect();
    super::print_landed(&rows);
    success!("Landed {} page(s)", landed.len());
}
