//! Command handlers

pub mod inventory;
pub mod report;
pub mod run;

use std::path::PathBuf;

use clap::Args;
use quickshop_core::PipelineConfig;

use crate::error::CliError;

/// Directory and config-file options shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct DirArgs {
    /// Directory holding products.csv, inventory.csv and the order files
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Output root (defaults to ./output)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// TOML pipeline configuration; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Build the pipeline configuration from the optional file and the flags
pub fn load_config(dirs: &DirArgs, verbose: bool) -> Result<PipelineConfig, CliError> {
    let mut config = match &dirs.config {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::new(),
    };

    if let Some(data_dir) = &dirs.data_dir {
        config = config.with_data_dir(data_dir);
    }
    if let Some(output_dir) = &dirs.output_dir {
        config = config.with_output_dir(output_dir);
    }
    if verbose {
        config = config.with_verbose(true);
    }

    config.validate().map_err(CliError::InvalidArgument)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_defaults() {
        let config = load_config(&DirArgs::default(), false).unwrap();
        assert_eq!(config, PipelineConfig::new());
    }

    #[test]
    fn test_flags_override_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("pipeline.toml");
        std::fs::write(
            &path,
            "data_dir = \"/from/file\"\noutput_dir = \"/out/file\"\nretries = 2\n",
        )
        .unwrap();

        let dirs = DirArgs {
            data_dir: Some(PathBuf::from("/from/flag")),
            output_dir: None,
            config: Some(path),
        };
        let config = load_config(&dirs, true).unwrap();

        assert_eq!(config.data_dir, Some(PathBuf::from("/from/flag")));
        assert_eq!(config.output_dir, Some(PathBuf::from("/out/file")));
        assert_eq!(config.retries, 2);
        assert!(config.verbose);
    }

    #[test]
    fn test_missing_config_file() {
        let dirs = DirArgs {
            config: Some(PathBuf::from("/nonexistent/pipeline.toml")),
            ..Default::default()
        };
        assert!(load_config(&dirs, false).is_err());
    }
}
