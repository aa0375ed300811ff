// Saved analysis format: the active steps of a session as JSON

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::debug;
use stepgrid_engine::{SavedAnalysis, ANALYSIS_FORMAT_VERSION};

use crate::error::IoError;

pub fn save(analysis: &SavedAnalysis, path: &Path) -> Result<(), IoError> {
    let write_err = |source: std::io::Error| IoError::Write {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, analysis).map_err(|e| write_err(e.into()))?;
    writer.flush().map_err(write_err)?;
    debug!("saved {} steps to {}", analysis.steps.len(), path.display());
    Ok(())
}

pub fn load(path: &Path) -> Result<SavedAnalysis, IoError> {
    let file = File::open(path).map_err(|source| IoError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let analysis: SavedAnalysis = serde_json::from_reader(BufReader::new(file))?;
    check_version(&analysis)?;
    Ok(analysis)
}

pub fn from_json(json: &str) -> Result<SavedAnalysis, IoError> {
    let analysis: SavedAnalysis = serde_json::from_str(json)?;
    check_version(&analysis)?;
    Ok(analysis)
}

fn check_version(analysis: &SavedAnalysis) -> Result<(), IoError> {
    if analysis.format_version > ANALYSIS_FORMAT_VERSION {
        return Err(IoError::UnsupportedVersion {
            found: analysis.format_version,
            supported: ANALYSIS_FORMAT_VERSION,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stepgrid_engine::cell::CellValue;
    use stepgrid_engine::frame::DataFrame;
    use stepgrid_engine::{Session, StepRequest};
    use tempfile::tempdir;

    fn frames() -> Vec<(String, DataFrame)> {
        let df = DataFrame::from_rows(
            vec!["x".to_string()],
            vec![vec![CellValue::number(1.0)], vec![CellValue::number(2.0)]],
        )
        .unwrap();
        vec![("df1".to_string(), df)]
    }

    #[test]
    fn test_save_load_replay() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("analysis.json");

        let mut session = Session::new(frames()).unwrap();
        let params = json!({
            "sheet_index": 0,
            "column_id": "x",
            "toggle_type": {"type": "toggle_specific_value", "value": 1, "remove_from_dataframe": true},
        });
        session
            .handle_step(StepRequest::new("bulk_filter", params.as_object().cloned().unwrap()))
            .unwrap();

        save(&session.to_saved(), &path).unwrap();
        let loaded = load(&path).unwrap();
        assert_eq!(loaded, session.to_saved());

        let replayed = Session::replay(frames(), &loaded).unwrap();
        assert_eq!(replayed.curr_state().row_view(0).unwrap().visible_rows(), &[1]);
    }

    #[test]
    fn test_save_into_directory_is_write_error() {
        let dir = tempdir().unwrap();
        let session = Session::new(frames()).unwrap();
        assert!(matches!(
            save(&session.to_saved(), dir.path()),
            Err(IoError::Write { .. })
        ));
    }

    /// The buffered JSON only reaches the device on flush, which must fail
    #[cfg(target_os = "linux")]
    #[test]
    fn test_failed_flush_is_write_error() {
        let session = Session::new(frames()).unwrap();
        let result = save(&session.to_saved(), Path::new("/dev/full"));
        assert!(matches!(result, Err(IoError::Write { .. })), "got {result:?}");
    }

    #[test]
    fn test_newer_format_rejected() {
        let json = r#"{"format_version": 99, "steps": []}"#;
        assert!(matches!(
            from_json(json),
            Err(IoError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load(&dir.path().join("nope.json")),
            Err(IoError::Read { .. })
        ));
    }
}
