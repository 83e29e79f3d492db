//! CSV report output.
//!
//! One file per tick, named after the extraction instant:
//! `PowerPosition_YYYYMMDD_HHmm.csv`. The file holds the header row and the 24
//! buckets in slot order with volumes rounded to whole numbers.

use std::fmt::{Display, Write as _};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use power_core::{AggregationBucket, Error, Result, RoundingPolicy, PERIODS_PER_DAY, REPORT_HEADER};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Writes aggregation results into an output directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
    rounding: RoundingPolicy,
}

impl ReportWriter {
    /// Create a writer for `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>, rounding: RoundingPolicy) -> Self {
        Self {
            output_dir: output_dir.into(),
            rounding,
        }
    }

    /// File name for a report extracted at `extracted_at`.
    pub fn file_name<Tz>(extracted_at: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        format!("PowerPosition_{}.csv", extracted_at.format("%Y%m%d_%H%M"))
    }

    /// Render the report body.
    pub fn render(&self, buckets: &[AggregationBucket; PERIODS_PER_DAY]) -> String {
        let mut out = String::with_capacity(32 + buckets.len() * 16);
        out.push_str(REPORT_HEADER);
        out.push('\n');
        for bucket in buckets {
            // Writing into a String cannot fail.
            let _ = writeln!(out, "{},{}", bucket.label, self.rounding.round(bucket.volume));
        }
        out
    }

    /// Write a report stamped with the current local time.
    pub async fn write_now(&self, buckets: &[AggregationBucket; PERIODS_PER_DAY]) -> Result<PathBuf> {
        self.write(buckets, Local::now()).await
    }

    /// Write a report extracted at `extracted_at`, returning its path.
    ///
    /// The body goes to a hidden temporary file first and is renamed into place
    /// once synced, so a reader never sees a truncated report. An existing report
    /// with the same name is replaced.
    pub async fn write<Tz>(
        &self,
        buckets: &[AggregationBucket; PERIODS_PER_DAY],
        extracted_at: DateTime<Tz>,
    ) -> Result<PathBuf>
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let file_name = Self::file_name(&extracted_at);
        let path = self.output_dir.join(&file_name);
        let tmp_path = self.output_dir.join(format!(".{}.tmp", file_name));
        let body = self.render(buckets);

        if let Err(e) = write_synced(&tmp_path, body.as_bytes()).await {
            discard(&tmp_path).await;
            return Err(Error::write(path, e));
        }
        if let Err(e) = fs::rename(&tmp_path, &path).await {
            discard(&tmp_path).await;
            return Err(Error::write(path, e));
        }

        info!(
            "[{}] Wrote CSV: {}",
            extracted_at.format("%Y-%m-%d %H:%M:%S"),
            path.display()
        );
        Ok(path)
    }
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove temporary file {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDate};

    fn make_buckets(volumes: &[(usize, f64)]) -> [AggregationBucket; PERIODS_PER_DAY] {
        let mut buckets: [AggregationBucket; PERIODS_PER_DAY] =
            std::array::from_fn(AggregationBucket::for_slot);
        for &(slot, volume) in volumes {
            buckets[slot].volume = volume;
        }
        buckets
    }

    fn make_instant() -> DateTime<FixedOffset> {
        let offset = FixedOffset::east_opt(3600).unwrap();
        NaiveDate::from_ymd_opt(2024, 1, 9)
            .unwrap()
            .and_hms_opt(7, 5, 42)
            .unwrap()
            .and_local_timezone(offset)
            .unwrap()
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            ReportWriter::file_name(&make_instant()),
            "PowerPosition_20240109_0705.csv"
        );
    }

    #[test]
    fn test_render_exact() {
        let writer = ReportWriter::new(".", RoundingPolicy::HalfEven);
        let buckets = make_buckets(&[(0, 12.4), (1, 12.5), (2, 13.5), (3, -7.6), (23, 150.0)]);

        let body = writer.render(&buckets);
        let lines: Vec<&str> = body.lines().collect();

        assert_eq!(lines.len(), 25);
        assert_eq!(lines[0], "Local Time,Volume");
        assert_eq!(lines[1], "23:00,12");
        assert_eq!(lines[2], "00:00,12");
        assert_eq!(lines[3], "01:00,14");
        assert_eq!(lines[4], "02:00,-8");
        assert_eq!(lines[5], "03:00,0");
        assert_eq!(lines[24], "22:00,150");
        assert!(body.ends_with("22:00,150\n"));
    }

    #[test]
    fn test_render_half_away_from_zero() {
        let writer = ReportWriter::new(".", RoundingPolicy::HalfAwayFromZero);
        let body = writer.render(&make_buckets(&[(1, 12.5), (2, -0.4)]));
        let lines: Vec<&str> = body.lines().collect();

        assert_eq!(lines[2], "00:00,13");
        assert_eq!(lines[3], "01:00,0");
    }

    #[tokio::test]
    async fn test_write_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path(), RoundingPolicy::HalfEven);
        let buckets = make_buckets(&[(0, 100.0)]);

        let path = writer.write(&buckets, make_instant()).await.unwrap();

        assert_eq!(path, dir.path().join("PowerPosition_20240109_0705.csv"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, writer.render(&buckets));

        // Only the report remains; the temporary file was renamed away.
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_write_overwrites_same_minute() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path(), RoundingPolicy::HalfEven);

        writer.write(&make_buckets(&[(0, 1.0)]), make_instant()).await.unwrap();
        let path = writer.write(&make_buckets(&[(0, 2.0)]), make_instant()).await.unwrap();

        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("23:00,2\n"));
    }

    #[tokio::test]
    async fn test_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ReportWriter::new(dir.path().join("missing"), RoundingPolicy::HalfEven);

        let result = writer.write(&make_buckets(&[]), make_instant()).await;

        match result {
            Err(Error::Write { path, .. }) => {
                assert!(path.ends_with("PowerPosition_20240109_0705.csv"));
            }
            other => panic!("expected write error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_rename_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory squats on the report path.
        let blocker = dir.path().join("PowerPosition_20240109_0705.csv");
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), b"x").unwrap();
        let writer = ReportWriter::new(dir.path(), RoundingPolicy::HalfEven);

        let result = writer.write(&make_buckets(&[(0, 1.0)]), make_instant()).await;

        assert!(matches!(result, Err(Error::Write { .. })));
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["PowerPosition_20240109_0705.csv".to_string()]);
        assert!(blocker.join("keep").exists());
    }
}
