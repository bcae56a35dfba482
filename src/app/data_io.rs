use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use url::Url;

use crate::app::error::SinkError;
use crate::app::types::MergedRecord;

pub const OUTPUT_EXTENSION: &str = "csv";

/// Creates per-target CSV outputs with a fixed column order.
#[derive(Debug, Clone)]
pub struct RecordSink {
    dir: PathBuf,
    fields: Vec<String>,
}

impl RecordSink {
    pub fn new(dir: impl Into<PathBuf>, fields: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            fields,
        }
    }

    /// Claims the first unused `<target>_<n>.csv` in the sink directory.
    /// The claim holds for the whole target; nothing is written yet.
    pub fn open(&self, target_name: &str) -> Result<OutputHandle, SinkError> {
        let path = claim_output_version(&self.dir, target_name, OUTPUT_EXTENSION)?;
        info!(path = %path.display(), "claimed output file");
        Ok(OutputHandle {
            path,
            fields: self.fields.clone(),
            rows_written: 0,
        })
    }
}

#[derive(Debug)]
pub struct OutputHandle {
    path: PathBuf,
    fields: Vec<String>,
    rows_written: usize,
}

impl OutputHandle {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Appends one row, creating the directory and header on first write.
    /// Each call opens, writes and flushes so a crash loses at most the row in flight.
    pub fn append(&mut self, record: &MergedRecord) -> Result<(), SinkError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                ensure_directory(parent)?;
            }
        }

        let has_content = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() > 0,
            Err(err) if err.kind() == io::ErrorKind::NotFound => false,
            Err(source) => return Err(io_error(&self.path, source)),
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| io_error(&self.path, source))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if !has_content {
            debug!(path = %self.path.display(), "writing header");
            writer
                .write_record(&self.fields)
                .map_err(|source| csv_error(&self.path, source))?;
        }
        writer
            .write_record(record.values_for(&self.fields))
            .map_err(|source| csv_error(&self.path, source))?;
        writer.flush().map_err(|source| io_error(&self.path, source))?;

        self.rows_written += 1;
        Ok(())
    }
}

/// First `<dir>/<base>_<n>.<ext>` (n from 1) that does not exist yet.
pub fn claim_output_version(dir: &Path, base: &str, ext: &str) -> Result<PathBuf, SinkError> {
    let mut version = 1u32;
    loop {
        let candidate = dir.join(format!("{base}_{version}.{ext}"));
        let taken = candidate
            .try_exists()
            .map_err(|source| io_error(&candidate, source))?;
        if !taken {
            return Ok(candidate);
        }
        version += 1;
    }
}

/// Output base name for a listing URL: its last path segment, made filename-safe.
pub fn target_name_from_url(url: &str) -> String {
    let parsed = Url::parse(url).ok();
    let segment = parsed
        .as_ref()
        .and_then(|u| u.path_segments())
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last().map(str::to_string))
        .or_else(|| {
            parsed
                .as_ref()
                .and_then(|u| u.host_str().map(|h| h.to_string()))
        })
        .unwrap_or_else(|| "crawl".to_string());

    segment
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect::<String>()
}

fn ensure_directory(dir: &Path) -> Result<(), SinkError> {
    if dir.exists() && !dir.is_dir() {
        return Err(SinkError::NotADirectory(dir.to_path_buf()));
    }
    fs::create_dir_all(dir).map_err(|source| io_error(dir, source))
}

fn io_error(path: &Path, source: io::Error) -> SinkError {
    SinkError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn csv_error(path: &Path, source: csv::Error) -> SinkError {
    SinkError::Csv {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use super::*;

    fn record(pairs: &[(&str, &str)]) -> MergedRecord {
        pairs.iter().copied().collect()
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn version_skips_claimed_files() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            claim_output_version(dir.path(), "report", "csv").unwrap(),
            dir.path().join("report_1.csv")
        );

        File::create(dir.path().join("report_1.csv")).unwrap();
        assert_eq!(
            claim_output_version(dir.path(), "report", "csv").unwrap(),
            dir.path().join("report_2.csv")
        );

        File::create(dir.path().join("report_2.csv")).unwrap();
        assert_eq!(
            claim_output_version(dir.path(), "report", "csv").unwrap(),
            dir.path().join("report_3.csv")
        );
    }

    #[test]
    fn rows_round_trip_under_one_header() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordSink::new(dir.path().join("nested/out"), fields(&["login", "rate", "plus"]));
        let mut handle = sink.open("report").unwrap();

        let written = [
            record(&[("login", "a"), ("rate", "5"), ("plus", "fast, really")]),
            record(&[("login", "b"), ("rate", "3"), ("plus", "line\nbreak")]),
            record(&[("login", "c"), ("ignored", "x")]),
        ];
        for row in &written {
            handle.append(row).unwrap();
        }
        assert_eq!(handle.rows_written(), 3);

        let mut reader = csv::Reader::from_path(handle.path()).unwrap();
        assert_eq!(reader.headers().unwrap(), vec!["login", "rate", "plus"]);
        let rows = reader
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        assert_eq!(
            rows,
            vec![
                vec!["a", "5", "fast, really"],
                vec!["b", "3", "line\nbreak"],
                vec!["c", "", ""],
            ]
        );
    }

    #[test]
    fn appending_to_existing_file_keeps_single_header() {
        let dir = tempfile::tempdir().unwrap();
        let sink = RecordSink::new(dir.path(), fields(&["login"]));
        let mut first = sink.open("t").unwrap();
        first.append(&record(&[("login", "a")])).unwrap();

        let mut again = OutputHandle {
            path: first.path().to_path_buf(),
            fields: fields(&["login"]),
            rows_written: 0,
        };
        again.append(&record(&[("login", "b")])).unwrap();

        let contents = fs::read_to_string(first.path()).unwrap();
        assert_eq!(contents, "login\na\nb\n");
    }

    #[test]
    fn target_names_come_from_the_last_segment() {
        assert_eq!(
            target_name_from_url("https://otzovik.com/reviews/okko_tv-onlayn_kinoteatr/"),
            "okko_tv-onlayn_kinoteatr"
        );
        assert_eq!(
            target_name_from_url("https://irecommend.ru/content/tvzavrru"),
            "tvzavrru"
        );
        assert_eq!(target_name_from_url("https://example.com/"), "example_com");
        assert_eq!(target_name_from_url("not a url"), "crawl");
    }
}
