//! `celex-mipi validate`: load a config file and report what is wrong with it.

use anyhow::{Context, Result};
use contracts::{EventShowType, ProcessorConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Outcome of checking one file; serialized as-is for `--json`
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

impl ValidationResult {
    fn rejected(config_path: String, error: String) -> Self {
        Self {
            valid: false,
            config_path,
            error: Some(error),
            warnings: Vec::new(),
            summary: None,
        }
    }

    fn accepted(config_path: String, config: &ProcessorConfig) -> Self {
        Self {
            valid: true,
            config_path,
            error: None,
            warnings: collect_warnings(config),
            summary: Some(ConfigSummary::from(config)),
        }
    }
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    geometry: String,
    mipi_format: u8,
    mode: String,
    loop_enabled: bool,
}

impl From<&ProcessorConfig> for ConfigSummary {
    fn from(config: &ProcessorConfig) -> Self {
        Self {
            version: format!("{:?}", config.version),
            geometry: format!("{}x{}", config.sensor.rows, config.sensor.cols),
            mipi_format: config.sensor.mipi_format,
            mode: config.mode.fixed.to_string(),
            loop_enabled: config.mode.loop_enabled,
        }
    }
}

pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "checking configuration");

    let result = validate_config(args);
    if args.json {
        let json = serde_json::to_string_pretty(&result).context("encoding validation result")?;
        println!("{json}");
    } else {
        print_validation_result(&result);
    }

    anyhow::ensure!(result.valid, "{} is not a usable configuration", result.config_path);
    Ok(())
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();
    if !args.config.is_file() {
        return ValidationResult::rejected(config_path, "no such file".to_string());
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => ValidationResult::accepted(config_path, &config),
        Err(e) => ValidationResult::rejected(config_path, e.to_string()),
    }
}

/// Settings that load fine but are probably not what the user wants
fn collect_warnings(config: &ProcessorConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !config.modules.frame {
        warnings.push("modules.frame is off: no pictures will be published".to_string());
    }
    if config.event.show == EventShowType::ByStep && !config.mode.loop_enabled {
        warnings.push("event.show is by_step: event frames close only on request".to_string());
    }
    let carries_adc = config.sensor.mipi_format != 2;
    if config.mode.fixed.is_event_mode() && carries_adc && config.fpn.path.is_none() {
        warnings.push("no FPN table configured: ADC values are uncorrected".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    match (&result.summary, &result.error) {
        (Some(summary), _) => {
            println!("ok  {}", result.config_path);
            println!(
                "    {} sensor, MIPI format {}, mode {}{}",
                summary.geometry,
                summary.mipi_format,
                summary.mode,
                if summary.loop_enabled { " (loop)" } else { "" }
            );
            for warning in &result.warnings {
                println!("    warning: {warning}");
            }
        }
        (None, error) => {
            println!("bad {}", result.config_path);
            if let Some(error) = error {
                println!("    {error}");
            }
        }
    }
}
