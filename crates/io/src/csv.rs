// CSV/TSV import and export of dataframes

use std::io::Read;
use std::path::Path;

use log::debug;
use stepgrid_engine::cell::CellValue;
use stepgrid_engine::frame::DataFrame;
use stepgrid_engine::state::TabularState;

use crate::error::IoError;

/// Import a CSV file. The first record holds the headers.
///
/// `delimiter: None` sniffs the delimiter from the first lines.
pub fn import(path: &Path, delimiter: Option<u8>) -> Result<DataFrame, IoError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(&content));
    debug!("importing {} with delimiter {:?}", path.display(), delimiter as char);
    import_from_string(&content, delimiter).map_err(|e| match e {
        IoError::NoHeader { .. } => IoError::NoHeader { path: path.to_path_buf() },
        other => other,
    })
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Lines agreeing with line 1, weighted by field count
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let read_err = |source| IoError::Read { path: path.to_path_buf(), source };

    let mut file = std::fs::File::open(path).map_err(read_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(read_err)?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // Excel-exported CSVs are usually Windows-1252
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

pub fn import_from_string(content: &str, delimiter: u8) -> Result<DataFrame, IoError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let headers: Vec<String> = match records.next() {
        Some(record) => record?.iter().map(|h| h.trim().to_string()).collect(),
        None => return Err(IoError::NoHeader { path: Default::default() }),
    };

    let mut rows = Vec::new();
    for result in records {
        let record = result?;
        let mut row: Vec<CellValue> = record.iter().map(CellValue::from_input).collect();
        // Trailing empty fields past the header are padding, not data
        while row.len() > headers.len() && row.last().is_some_and(CellValue::is_blank) {
            row.pop();
        }
        rows.push(row);
    }

    Ok(DataFrame::from_rows(headers, rows)?)
}

/// Export the visible rows of a sheet, headers first.
pub fn export_visible(state: &TabularState, sheet_index: usize, path: &Path, delimiter: u8) -> Result<(), IoError> {
    let df = state.df(sheet_index)?;
    let view = state.row_view(sheet_index)?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)?;

    writer.write_record(df.headers())?;
    for &row in view.visible_rows() {
        let record: Vec<String> = df
            .row(row)
            .unwrap_or_default()
            .into_iter()
            .map(CellValue::display_string)
            .collect();
        writer.write_record(&record)?;
    }

    writer.flush().map_err(|source| IoError::Write { path: path.to_path_buf(), source })?;
    Ok(())
}

/// Dataframe name for an imported file: its stem as a Python identifier.
pub fn df_name_for(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut name: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert_str(0, "df_");
    }
    name
}
