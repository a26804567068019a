//! Config command handler

use std::fs;
use std::path::Path;

use insights_core::InsightsConfig;

use crate::commands::ConfigArgs;
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};

/// Load runner configuration; JSON when the file ends in `.json`, YAML otherwise
pub fn load_insights_config(path: Option<&Path>) -> CliResult<InsightsConfig> {
    let Some(path) = path else {
        return Ok(InsightsConfig::default());
    };
    let text = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let config = if is_json {
        InsightsConfig::from_json(&text)
    } else {
        InsightsConfig::from_yaml(&text)
    };
    config.map_err(|e| CliError::config(format!("{}: {e}", path.display())))
}

/// Execute the config command
pub fn execute_config(config: &CliConfig, args: &ConfigArgs) -> CliResult<()> {
    let insights = load_insights_config(args.file.as_deref())?;
    let rendered = serde_yaml_ng::to_string(&insights).map_err(|e| CliError::config(e.to_string()))?;

    if !config.verbosity.is_quiet() {
        let output = serde_yaml_ng::to_string(config).map_err(|e| CliError::config(e.to_string()))?;
        println!("# output");
        print!("{output}");
        println!("# runner");
    }
    print!("{rendered}");
    Ok(())
}
