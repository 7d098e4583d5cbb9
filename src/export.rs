//! CSV export of a filtered track.
//!
//! Rows are written in time order with a header row. Files may optionally be
//! gzip-compressed.

use anyhow::Result;
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::model::FilteredTrack;

pub const DEFAULT_FILE_NAME: &str = "results.csv";

/// Writes `track` as CSV to `writer`.
pub fn write_csv<W: Write>(writer: W, track: &FilteredTrack) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(writer);

    for sample in track.samples() {
        writer.serialize(sample)?;
    }
    writer.flush()?;

    Ok(())
}

/// UTF-8 CSV bytes for `track`, ready for download.
pub fn to_csv_bytes(track: &FilteredTrack) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv(&mut buf, track)?;
    Ok(buf)
}

/// Writes `track` to `path`, replacing any existing file.
pub fn export_file(path: &Path, track: &FilteredTrack, gzip: bool) -> Result<()> {
    let file = File::create(path)?;

    if gzip {
        let mut encoder = GzEncoder::new(file, Compression::default());
        write_csv(&mut encoder, track)?;
        encoder.finish()?;
    } else {
        write_csv(file, track)?;
    }

    info!(path = %path.display(), rows = track.len(), gzip, "Track exported");
    debug!(subject_id = %track.subject_id, date = %track.date, "Export complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LocationSample, SubjectId};
    use chrono::NaiveDate;
    use flate2::read::GzDecoder;
    use std::env;
    use std::fs;
    use std::io::Read;

    fn temp_path(name: &str) -> std::path::PathBuf {
        env::temp_dir().join(name)
    }

    fn track() -> FilteredTrack {
        let date = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
        FilteredTrack::new(
            SubjectId::new("c1"),
            date,
            vec![
                LocationSample {
                    timestamp: date.and_hms_opt(10, 5, 0).unwrap(),
                    latitude: 35.001,
                    longitude: -78.001,
                    hdop: 0.9,
                },
                LocationSample {
                    timestamp: date.and_hms_opt(10, 0, 0).unwrap(),
                    latitude: 35.0,
                    longitude: -78.0,
                    hdop: 0.5,
                },
            ],
        )
    }

    #[test]
    fn test_csv_header_and_time_order() {
        let bytes = to_csv_bytes(&track()).unwrap();
        let content = String::from_utf8(bytes).unwrap();
        let lines: Vec<_> = content.lines().collect();

        assert_eq!(
            lines[0],
            "timestamp_local,location_lat,location_long,gps_hdop"
        );
        assert_eq!(lines[1], "2021-06-01T10:00:00,35.0,-78.0,0.5");
        assert_eq!(lines[2], "2021-06-01T10:05:00,35.001,-78.001,0.9");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_empty_track_writes_nothing() {
        let date = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();
        let empty = FilteredTrack::new(SubjectId::new("c1"), date, vec![]);
        assert!(to_csv_bytes(&empty).unwrap().is_empty());
    }

    #[test]
    fn test_export_file_plain() {
        let path = temp_path("cattracks_test_export.csv");
        let _ = fs::remove_file(&path);

        export_file(&path, &track(), false).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_export_file_gzip() {
        let path = temp_path("cattracks_test_export.csv.gz");
        let _ = fs::remove_file(&path);

        export_file(&path, &track(), true).unwrap();

        let mut decoded = String::new();
        GzDecoder::new(File::open(&path).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, String::from_utf8(to_csv_bytes(&track()).unwrap()).unwrap());

        fs::remove_file(&path).unwrap();
    }
}
