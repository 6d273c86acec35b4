use std::{
    fs::{self, File},
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::{
    IngestError, Res,
    bronze::storage::{self, StorageBackend},
    types::{LandedArtifact, LandedPaths},
    utils,
};

/// Where and how one payload is landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandRequest {
    pub dataset: String,
    /// Partition pairs in path order.
    pub partitions: Vec<(String, String)>,
    pub run_id: Option<String>,
    pub page: u32,
    pub overwrite: bool,
}

impl LandRequest {
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            partitions: Vec::new(),
            run_id: None,
            page: 0,
            overwrite: false,
        }
    }

    pub fn partition(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.partitions.push((key.into(), value.into()));
        self
    }

    pub fn run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

/// Writes raw payloads into the partitioned bronze layout:
///
/// ```text
/// <base>/<dataset>/<k1>=<v1>/.../dt=<YYYY-MM-DD>/run_id=<id>/
///     page=<n>.jsonl.gz
///     page=<n>._manifest.json
///     page=<n>._checksum.txt
/// ```
///
/// Every file is written to a temp file in the destination directory and renamed
/// into place. An existing data file is never replaced unless overwrite is set,
/// but the checksum and manifest sidecars are always rewritten from the incoming
/// text. Two landers racing on one path therefore end up with the first committed
/// data file and the last writer's sidecars; a kept data file whose content differs
/// from the incoming payload is logged and reported in
/// [`LandedPaths::existing_matches`].
#[derive(Debug)]
pub struct RawLander {
    backend: Box<dyn StorageBackend>,
}

impl RawLander {
    pub fn new(base_dir: &str) -> Self {
        Self {
            backend: storage::backend_for(base_dir),
        }
    }

    pub fn with_backend(backend: Box<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    pub fn land(&self, raw_text: &str, request: &LandRequest) -> Res<LandedPaths> {
        let document: Value =
            serde_json::from_str(raw_text).map_err(|e| IngestError::Validation(e.to_string()))?;

        check_partition_keys(&request.partitions)?;
        self.backend.ensure_available()?;

        let ts = Utc::now();
        let run_id = request
            .run_id
            .clone()
            .unwrap_or_else(|| utils::generate_run_id(ts));

        let dest_dir = self.destination_dir(request, &run_id, ts);
        fs::create_dir_all(&dest_dir).map_err(|e| {
            IngestError::storage(format!("creating {}", dest_dir.display()), e)
        })?;

        let stem = format!("page={}", request.page);
        let data_path = dest_dir.join(format!("{stem}.jsonl.gz"));
        let manifest_path = dest_dir.join(format!("{stem}._manifest.json"));
        let checksum_path = dest_dir.join(format!("{stem}._checksum.txt"));

        let line = utils::to_single_line(raw_text);
        // Without overwrite the rename never replaces a committed data file.
        let data_written = if data_path.exists() && !request.overwrite {
            false
        } else {
            write_gzip_atomic(&data_path, &line, request.overwrite)?
        };
        let existing_matches = (!data_written).then(|| keep_existing(&data_path, &line));

        let checksum = utils::checksum_md5(raw_text);
        write_text_atomic(&checksum_path, &checksum)?;

        let data_display = self.backend.display_path(&data_path);
        let artifact = LandedArtifact {
            dataset: request.dataset.clone(),
            path: data_display.clone(),
            partitions: partitions_map(&request.partitions),
            run_id,
            page: request.page,
            record_count: record_count(&document),
            checksum_md5: checksum,
            fetched_at: utils::iso_timestamp(Utc::now()),
        };
        let manifest = serde_json::to_string_pretty(&artifact).map_err(|e| {
            IngestError::storage("serializing manifest", io::Error::other(e))
        })?;
        write_text_atomic(&manifest_path, &manifest)?;

        info!(
            dataset = %artifact.dataset,
            run_id = %artifact.run_id,
            page = artifact.page,
            records = artifact.record_count,
            data_written,
            "landed {}",
            data_display
        );

        Ok(LandedPaths {
            data: data_display,
            manifest: self.backend.display_path(&manifest_path),
            checksum: self.backend.display_path(&checksum_path),
            data_written,
            existing_matches,
        })
    }

    fn destination_dir(&self, request: &LandRequest, run_id: &str, ts: DateTime<Utc>) -> PathBuf {
        let mut dir = self.backend.local_root().join(&request.dataset);
        for (key, value) in &request.partitions {
            dir.push(format!("{}={}", key, utils::sanitize_partition_value(value)));
        }
        dir.push(format!("dt={}", utils::partition_date(ts)));
        dir.push(format!("run_id={run_id}"));
        dir
    }
}

/// `artists.items` length, or 1 when that path is missing or not a list.
pub fn record_count(document: &Value) -> u64 {
    document
        .get("artists")
        .and_then(|artists| artists.get("items"))
        .and_then(Value::as_array)
        .map_or(1, |items| items.len() as u64)
}

/// Each key may appear once; the manifest keys partitions by name.
fn check_partition_keys(partitions: &[(String, String)]) -> Res<()> {
    for (i, (key, _)) in partitions.iter().enumerate() {
        if partitions[..i].iter().any(|(seen, _)| seen == key) {
            return Err(IngestError::Validation(format!(
                "duplicate partition key '{key}'"
            )));
        }
    }
    Ok(())
}

fn partitions_map(partitions: &[(String, String)]) -> Map<String, Value> {
    partitions
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
}

fn keep_existing(path: &Path, line: &str) -> bool {
    let matches = existing_content_matches(path, line);
    if matches {
        debug!("{} already landed, keeping it", path.display());
    } else {
        warn!(
            "{} already exists with different content; keeping it, sidecars describe the new payload",
            path.display()
        );
    }
    matches
}

fn existing_content_matches(path: &Path, line: &str) -> bool {
    let mut content = String::new();
    let read = File::open(path).and_then(|f| GzDecoder::new(f).read_to_string(&mut content));
    match read {
        Ok(_) => content == line,
        Err(e) => {
            warn!("cannot read existing {}: {}", path.display(), e);
            false
        }
    }
}

fn temp_file_beside(path: &Path) -> Res<NamedTempFile> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    NamedTempFile::new_in(dir)
        .map_err(|e| IngestError::storage(format!("creating temp file in {}", dir.display()), e))
}

/// Renames `tmp` onto `path`. Without `replace` an existing file wins and
/// `Ok(false)` is returned.
fn commit(tmp: NamedTempFile, path: &Path, replace: bool) -> Res<bool> {
    tmp.as_file()
        .sync_all()
        .map_err(|e| IngestError::storage(format!("syncing {}", path.display()), e))?;
    let persisted = if replace {
        tmp.persist(path)
    } else {
        tmp.persist_noclobber(path)
    };
    match persisted {
        Ok(_) => Ok(true),
        Err(e) if !replace && e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(IngestError::storage(
            format!("renaming into {}", path.display()),
            e.error,
        )),
    }
}

fn write_gzip_atomic(path: &Path, line: &str, replace: bool) -> Res<bool> {
    let mut encoder = GzEncoder::new(temp_file_beside(path)?, Compression::default());
    encoder
        .write_all(line.as_bytes())
        .map_err(|e| IngestError::storage(format!("compressing {}", path.display()), e))?;
    let tmp = encoder
        .finish()
        .map_err(|e| IngestError::storage(format!("compressing {}", path.display()), e))?;
    commit(tmp, path, replace)
}

fn write_text_atomic(path: &Path, text: &str) -> Res<()> {
    let mut tmp = temp_file_beside(path)?;
    tmp.write_all(text.as_bytes())
        .map_err(|e| IngestError::storage(format!("writing {}", path.display()), e))?;
    commit(tmp, path, true).map(|_| ())
}
