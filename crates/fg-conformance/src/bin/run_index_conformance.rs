#![forbid(unsafe_code)]

use std::path::PathBuf;

use fg_conformance::{HarnessConfig, mode_label, run_index_conformance};
use fg_core::ExecutionMode;
use serde_json::json;

fn main() -> Result<(), String> {
    let mut mode = String::from("both");
    let mut output: Option<PathBuf> = None;
    let mut case_filter: Option<String> = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--mode" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--mode requires one of: strict|hardened|both".to_string())?;
                mode = value;
            }
            "--output" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--output requires a file path".to_string())?;
                output = Some(PathBuf::from(value));
            }
            "--case" => {
                let value = args
                    .next()
                    .ok_or_else(|| "--case requires a fixture case name".to_string())?;
                case_filter = Some(value);
            }
            other => {
                return Err(format!(
                    "unknown arg '{other}'. usage: run_index_conformance [--mode strict|hardened|both] [--case name] [--output path]"
                ));
            }
        }
    }

    let config = HarnessConfig::default_paths();
    let mut lines = Vec::new();
    let mut summaries = Vec::new();
    for mode in parse_modes(mode.as_str())? {
        let (report, cases) = run_index_conformance(&config, mode)?;
        let mut failed = 0usize;
        for case in cases
            .iter()
            .filter(|case| case_filter.as_deref().is_none_or(|name| case.name == name))
        {
            if !case.passed() {
                failed += 1;
            }
            lines.push(case.forensic_log.to_json_line()?);
        }
        summaries.push(json!({
            "mode": mode_label(mode),
            "cases_total": report.cases_total,
            "cases_passed": report.cases_passed,
            "failed_entries": failed,
        }));
    }

    let mut body = lines.join("\n");
    body.push('\n');
    match &output {
        Some(path) => std::fs::write(path, &body)
            .map_err(|error| format!("failed to write {}: {error}", path.display()))?,
        None => print!("{body}"),
    }

    eprintln!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "status": "ok",
            "output_path": output.as_ref().map(|path| path.display().to_string()),
            "log_entries": lines.len(),
            "case_filter": case_filter,
            "modes": summaries,
        }))
        .map_err(|error| format!("failed to serialize summary: {error}"))?
    );

    Ok(())
}

fn parse_modes(raw: &str) -> Result<Vec<ExecutionMode>, String> {
    match raw {
        "strict" => Ok(vec![ExecutionMode::Strict]),
        "hardened" => Ok(vec![ExecutionMode::Hardened]),
        "both" => Ok(vec![ExecutionMode::Strict, ExecutionMode::Hardened]),
        _ => Err(format!(
            "unsupported mode '{raw}'; expected strict|hardened|both"
        )),
    }
}
