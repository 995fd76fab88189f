//! `soiaudit` — headless validation of extracted schedules of investments.
//!
//! Reads one extraction JSON file (rows + document facts), runs the
//! sanitize/reconcile/classify pipeline, and renders the report: human
//! summary on stderr, JSON on stdout or to a file, optional CSV issue
//! export for spreadsheet triage.

mod exit_codes;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use soiaudit_core::Issue;
use soiaudit_recon::{run, ValidationConfig, ValidationInput, ValidationReport};

use exit_codes::{EXIT_FINDINGS, EXIT_INVALID_CONFIG, EXIT_RUNTIME, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "soiaudit")]
#[command(about = "Deterministic validation for extracted schedules of investments")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate one extraction JSON file
    #[command(after_help = "\
Examples:
  soiaudit run extraction.json
  soiaudit run extraction.json --config validation.toml --json
  soiaudit run extraction.json --output report.json --csv issues.csv")]
    Run {
        /// Extraction JSON (document facts + rows)
        input: PathBuf,

        /// TOML config with tolerances and sanitizer thresholds
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the full report as JSON on stdout
        #[arg(long)]
        json: bool,

        /// Write the full report as JSON to a file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the issue list as CSV to a file
        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Parse and validate a config file without running
    #[command(after_help = "\
Examples:
  soiaudit check-config validation.toml")]
    CheckConfig {
        /// Path to the TOML config file
        config: PathBuf,
    },
}

#[derive(Debug)]
struct CliError {
    code: u8,
    message: String,
}

fn cli_err(code: u8, message: impl Into<String>) -> CliError {
    CliError {
        code,
        message: message.into(),
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            let code = if err.use_stderr() { EXIT_USAGE } else { EXIT_SUCCESS };
            return ExitCode::from(code);
        }
    };
    let result = match cli.command {
        Commands::Run {
            input,
            config,
            json,
            output,
            csv,
        } => cmd_run(input, config, json, output, csv),
        Commands::CheckConfig { config } => cmd_check_config(config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {}", err.message);
            ExitCode::from(err.code)
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

fn cmd_run(
    input_path: PathBuf,
    config_path: Option<PathBuf>,
    json_output: bool,
    output_file: Option<PathBuf>,
    csv_file: Option<PathBuf>,
) -> Result<u8, CliError> {
    let config = load_config(config_path.as_deref())?;

    let input_str = std::fs::read_to_string(&input_path).map_err(|e| {
        cli_err(EXIT_RUNTIME, format!("cannot read {}: {e}", input_path.display()))
    })?;
    let mut input: ValidationInput = serde_json::from_str(&input_str).map_err(|e| {
        cli_err(EXIT_RUNTIME, format!("malformed extraction JSON: {e}"))
    })?;
    if input.document.source_name.is_empty() {
        input.document.source_name = input_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
    }

    let report = run(&config, &input);

    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| cli_err(EXIT_RUNTIME, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| cli_err(EXIT_RUNTIME, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if let Some(ref path) = csv_file {
        let csv_str = issues_csv(&report.issues)
            .map_err(|e| cli_err(EXIT_RUNTIME, format!("CSV render error: {e}")))?;
        std::fs::write(path, csv_str)
            .map_err(|e| cli_err(EXIT_RUNTIME, format!("cannot write CSV: {e}")))?;
        eprintln!("wrote {}", path.display());
    }

    if json_output {
        println!("{json_str}");
    }

    eprintln!("{}", human_summary(&report));

    if report.is_trustworthy() {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FINDINGS)
    }
}

fn cmd_check_config(config_path: PathBuf) -> Result<u8, CliError> {
    let config_str = std::fs::read_to_string(&config_path).map_err(|e| {
        cli_err(EXIT_RUNTIME, format!("cannot read {}: {e}", config_path.display()))
    })?;
    let config = ValidationConfig::from_toml(&config_str)
        .map_err(|e| cli_err(EXIT_INVALID_CONFIG, e.to_string()))?;
    eprintln!(
        "config '{}' ok (summary-table threshold {}%, coverage threshold {:.0}%)",
        config.name,
        config.sanitizer.summary_table.percent_threshold,
        config.sanitizer.page_repair.coverage_threshold * 100.0,
    );
    Ok(EXIT_SUCCESS)
}

fn load_config(path: Option<&std::path::Path>) -> Result<ValidationConfig, CliError> {
    let Some(path) = path else {
        return Ok(ValidationConfig::default());
    };
    let config_str = std::fs::read_to_string(path)
        .map_err(|e| cli_err(EXIT_RUNTIME, format!("cannot read {}: {e}", path.display())))?;
    ValidationConfig::from_toml(&config_str).map_err(|e| cli_err(EXIT_INVALID_CONFIG, e.to_string()))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn human_summary(report: &ValidationReport) -> String {
    let s = &report.summary;
    let mut line = format!(
        "{}: {} issue(s) — {} error(s), {} warning(s)",
        report.meta.source_name,
        report.issues.len(),
        s.error_count,
        s.warning_count,
    );
    if s.has_arithmetic_error {
        line.push_str(&format!(
            "; {} section(s) fail subtotals, {} fail roll-up, max diff ${}",
            s.sections_failing_subtotal, s.sections_failing_rollup, s.max_dollar_diff,
        ));
    }
    if !report.fix_log.is_empty() {
        line.push_str(&format!("; {} sanitizer fix(es)", report.fix_log.len()));
    }
    line
}

fn issues_csv(issues: &[Issue]) -> Result<String, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["severity", "code", "section_path", "rows", "numeric_diff", "message"])?;
    for issue in issues {
        let rows = issue
            .row_refs
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        writer.write_record([
            issue.severity.to_string().as_str(),
            issue.code.as_str(),
            issue.section_path.as_deref().unwrap_or(""),
            rows.as_str(),
            issue
                .numeric_diff
                .map(|d| d.to_string())
                .unwrap_or_default()
                .as_str(),
            issue.message.as_str(),
        ])?;
    }
    let bytes = writer.into_inner().expect("in-memory writer");
    Ok(String::from_utf8(bytes).expect("csv output is utf-8"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use soiaudit_core::{Row, RowType};

    fn sample_report(reported: i64) -> ValidationReport {
        let input = ValidationInput {
            rows: vec![
                Row {
                    section_path: vec!["A".into()],
                    row_type: Some(RowType::Holding),
                    investment: Some("x".into()),
                    fair_value: Some(Decimal::from(100)),
                    ..Row::default()
                },
                Row {
                    section_path: vec!["A".into()],
                    row_type: Some(RowType::Subtotal),
                    label: Some("Subtotal A".into()),
                    fair_value: Some(Decimal::from(reported)),
                    ..Row::default()
                },
            ],
            ..ValidationInput::default()
        };
        run(&ValidationConfig::default(), &input)
    }

    #[test]
    fn summary_line_mentions_arithmetic() {
        let report = sample_report(150);
        let line = human_summary(&report);
        assert!(line.contains("error(s)"));
        assert!(line.contains("max diff $50"));
    }

    #[test]
    fn csv_has_header_and_rows() {
        let report = sample_report(150);
        let csv = issues_csv(&report.issues).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "severity,code,section_path,rows,numeric_diff,message"
        );
        assert!(csv.contains("ARITH_MISMATCH_FV"));
    }

    #[test]
    fn exit_codes_follow_trustworthiness() {
        assert!(sample_report(100).is_trustworthy());
        assert!(!sample_report(150).is_trustworthy());
    }

    #[test]
    fn config_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validation.toml");
        std::fs::write(
            &path,
            r#"
name = "batch"

[tolerance.fair_value]
abs = 2
rel = 0.001
"#,
        )
        .unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.name, "batch");
        assert_eq!(config.tolerance.fair_value.abs, Decimal::from(2));
    }

    #[test]
    fn missing_config_file_is_runtime_error() {
        let err = load_config(Some(std::path::Path::new("/nonexistent/cfg.toml"))).unwrap_err();
        assert_eq!(err.code, EXIT_RUNTIME);
    }

    #[test]
    fn bad_config_is_invalid_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("validation.toml");
        std::fs::write(&path, "[tolerance.cost]\nabs = -5\n").unwrap();
        let err = load_config(Some(&path)).unwrap_err();
        assert_eq!(err.code, EXIT_INVALID_CONFIG);
    }

    #[test]
    fn run_and_write_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("extraction.json");
        std::fs::write(
            &input_path,
            r#"{"rows": [
                {"section_path": ["A"], "row_type": "HOLDING", "investment": "x", "fair_value_raw": "100"},
                {"section_path": ["A"], "row_type": "SUBTOTAL", "label": "Subtotal A", "fair_value_raw": "100"}
            ]}"#,
        )
        .unwrap();
        let output_path = dir.path().join("report.json");
        let csv_path = dir.path().join("issues.csv");

        let code = cmd_run(
            input_path,
            None,
            false,
            Some(output_path.clone()),
            Some(csv_path.clone()),
        )
        .unwrap();
        assert_eq!(code, EXIT_SUCCESS);

        let report: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output_path).unwrap()).unwrap();
        assert_eq!(report["summary"]["error_count"], 0);
        // source_name falls back to the file name.
        assert_eq!(report["meta"]["source_name"], "extraction.json");
        assert!(std::fs::read_to_string(&csv_path).unwrap().starts_with("severity,"));
    }

    #[test]
    fn findings_exit_code_on_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("extraction.json");
        std::fs::write(
            &input_path,
            r#"{"rows": [
                {"section_path": ["A"], "row_type": "HOLDING", "investment": "x", "fair_value_raw": "100"},
                {"section_path": ["A"], "row_type": "SUBTOTAL", "label": "Subtotal A", "fair_value_raw": "250"}
            ]}"#,
        )
        .unwrap();
        let code = cmd_run(input_path, None, false, None, None).unwrap();
        assert_eq!(code, EXIT_FINDINGS);
    }
}
