// run / replay / params / step-types

use std::io::{self, Read, Write};
use std::path::Path;

use log::info;
use serde::Serialize;
use serde_json::Value;
use stepgrid_config::Settings;
use stepgrid_engine::code_chunk::CodeOptions;
use stepgrid_engine::frame::DataFrame;
use stepgrid_engine::performers::registry;
use stepgrid_engine::resolver::ParamsQuery;
use stepgrid_engine::step::ExecutionData;
use stepgrid_engine::{Session, Step, StepRequest};
use stepgrid_io::{analysis, csv};

use crate::{CliError, DataArgs, OutputArgs};

// ============================================================================
// run
// ============================================================================

pub fn cmd_run(
    settings: &Settings,
    data: &DataArgs,
    steps: &Path,
    save: Option<&Path>,
    output: &OutputArgs,
) -> Result<(), CliError> {
    let requests = read_requests(steps)?;
    let mut session = Session::new(load_frames(settings, data)?)?;

    for (idx, request) in requests.into_iter().enumerate() {
        let step_type = request.step_type.clone();
        session.handle_step(request).map_err(|e| {
            let err = CliError::from(e);
            let message = format!("step request {} ({}): {}", idx, step_type, err.message);
            CliError { message, ..err }
        })?;
    }

    if let Some(path) = save {
        analysis::save(&session.to_saved(), path)?;
        info!("saved analysis to {}", path.display());
    }

    write_output(settings, &session, output)
}

fn read_requests(path: &Path) -> Result<Vec<StepRequest>, CliError> {
    let json = if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map_err(|e| CliError::io(format!("cannot read stdin: {}", e)))?;
        buf
    } else {
        std::fs::read_to_string(path)
            .map_err(|e| CliError::io(format!("cannot read {}: {}", path.display(), e)))?
    };

    serde_json::from_str(&json).map_err(|e| {
        CliError::parse(format!("invalid step requests: {}", e))
            .with_hint("expected a JSON array of {\"step_type\": ..., \"params\": {...}}")
    })
}

// ============================================================================
// replay
// ============================================================================

pub fn cmd_replay(
    settings: &Settings,
    analysis_path: &Path,
    data: &DataArgs,
    output: &OutputArgs,
) -> Result<(), CliError> {
    let saved = analysis::load(analysis_path)?;
    let session = Session::replay(load_frames(settings, data)?, &saved)?;
    write_output(settings, &session, output)
}

// ============================================================================
// params
// ============================================================================

pub fn cmd_params(
    settings: &Settings,
    analysis_path: &Path,
    data: &DataArgs,
    step_type: String,
    step_id: String,
    matches: &[String],
) -> Result<(), CliError> {
    let saved = analysis::load(analysis_path)?;
    let session = Session::replay(load_frames(settings, data)?, &saved)?;

    let query = ParamsQuery {
        step_type,
        step_id_to_match: step_id,
        execution_data_to_match: parse_matches(matches)?,
    };

    // No match prints nothing: an empty result is not an error
    let params = session.get_params(&query)?;
    if !params.is_empty() {
        println!("{}", params);
    }
    Ok(())
}

/// Parse `key=value` pairs. Values are JSON when they parse as JSON, plain
/// strings otherwise.
fn parse_matches(matches: &[String]) -> Result<ExecutionData, CliError> {
    let mut execution_data = ExecutionData::new();
    for pair in matches {
        let (key, raw) = pair
            .split_once('=')
            .ok_or_else(|| CliError::args(format!("--match expects KEY=JSON, got '{}'", pair)))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        execution_data.insert(key.to_string(), value);
    }
    Ok(execution_data)
}

// ============================================================================
// step-types
// ============================================================================

pub fn cmd_step_types() -> Result<(), CliError> {
    let registry = registry();
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    for step_type in registry.step_types() {
        let performer = registry.get(step_type)?;
        writeln!(handle, "{}\t{}", step_type, performer.step_version())
            .map_err(|e| CliError::io(e.to_string()))?;
    }

    Ok(())
}

// ============================================================================
// Shared helpers
// ============================================================================

fn load_frames(settings: &Settings, data: &DataArgs) -> Result<Vec<(String, DataFrame)>, CliError> {
    let delimiter = match data.delimiter {
        Some(c) if c.is_ascii() => Some(c as u8),
        Some(c) => return Err(CliError::args(format!("delimiter must be ASCII, got '{}'", c))),
        None => settings
            .csv
            .delimiter_byte()
            .map_err(|e| CliError::args(e.to_string()))?,
    };

    let mut frames: Vec<(String, DataFrame)> = Vec::new();
    for path in &data.data {
        let name = csv::df_name_for(path);
        if frames.iter().any(|(existing, _)| *existing == name) {
            return Err(CliError::args(format!("two data files map to dataframe '{}'", name))
                .with_hint("rename one of the files"));
        }
        let frame = csv::import(path, delimiter)?;
        info!("loaded {} as {} ({} rows)", path.display(), name, frame.row_count());
        frames.push((name, frame));
    }
    Ok(frames)
}

#[derive(Serialize)]
struct SheetSummary<'a> {
    name: &'a str,
    rows: usize,
    visible_rows: usize,
}

#[derive(Serialize)]
struct RunSummary<'a> {
    steps: &'a [Step],
    sheets: Vec<SheetSummary<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<Vec<String>>,
}

fn write_output(settings: &Settings, session: &Session, output: &OutputArgs) -> Result<(), CliError> {
    let state = session.curr_state();

    if let Some(dir) = &output.export {
        std::fs::create_dir_all(dir)
            .map_err(|e| CliError::io(format!("cannot create {}: {}", dir.display(), e)))?;
        for (idx, name) in state.df_names().iter().enumerate() {
            csv::export_visible(state, idx, &dir.join(format!("{}.csv", name)), b',')?;
        }
    }

    let code = if output.code {
        let options = CodeOptions {
            include_comments: settings.codegen.include_comments && !output.no_comments,
            optimize: settings.codegen.optimize && !output.no_optimize,
        };
        Some(session.generated_code(options)?)
    } else {
        None
    };

    let mut sheets = Vec::new();
    for (idx, name) in state.df_names().iter().enumerate() {
        let view = state.row_view(idx)?;
        sheets.push(SheetSummary {
            name,
            rows: view.row_count(),
            visible_rows: view.visible_count(),
        });
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let write_err = |e: io::Error| CliError::io(e.to_string());

    if output.json {
        let summary = RunSummary { steps: session.steps(), sheets, code };
        let json = serde_json::to_string_pretty(&summary).map_err(|e| CliError::io(e.to_string()))?;
        writeln!(handle, "{}", json).map_err(write_err)?;
        return Ok(());
    }

    for (idx, step) in session.steps().iter().enumerate() {
        writeln!(handle, "{}\t{}\t{}", idx, step.step_type, step.step_id).map_err(write_err)?;
    }
    for sheet in &sheets {
        writeln!(handle, "{}: {} of {} rows visible", sheet.name, sheet.visible_rows, sheet.rows)
            .map_err(write_err)?;
    }
    if let Some(code) = code {
        writeln!(handle).map_err(write_err)?;
        for line in code {
            writeln!(handle, "{}", line).map_err(write_err)?;
        }
    }

    Ok(())
}
