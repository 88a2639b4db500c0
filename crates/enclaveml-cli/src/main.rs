mod cli;
mod commands;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use enclaveml_core::{BuildConfig, Device, ElementType};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log);

    match cli.command {
        Command::CreateModel {
            path,
            ir_version,
            opset_version,
            producer_name,
            input_name,
            output_name,
            feature_dim,
            element_type,
        } => {
            let element_type: ElementType = element_type
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            let config = BuildConfig {
                producer_name,
                ir_version,
                opset_version,
                input_name,
                output_name,
                feature_dim,
                element_type,
            };
            commands::create_model(&config, &path)
        }
        Command::Tokenize { tokenizer_dir } => commands::tokenize(&tokenizer_dir),
        Command::Inspect { path } => commands::inspect(&path),
        Command::Verify {
            path,
            batch,
            device,
        } => {
            let device = parse_device(&device)?;
            commands::verify(&path, device, batch)
        }
        Command::CheckExport { dir } => commands::check_export(&dir),
    }
}

/// Logs go to stderr; stdout carries command output only.
fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_device(raw: &str) -> Result<Device> {
    if raw.eq_ignore_ascii_case("cpu") {
        return Ok(Device::Cpu);
    }

    if let Some(rest) = raw.strip_prefix("cuda:") {
        let device_id: u32 = rest.parse().context("invalid cuda device id")?;
        return Ok(Device::Cuda { device_id });
    }

    anyhow::bail!("unsupported device: {raw} (expected cpu or cuda:N)");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_devices() {
        assert!(matches!(parse_device("cpu").unwrap(), Device::Cpu));
        assert!(matches!(parse_device("CPU").unwrap(), Device::Cpu));
        assert!(matches!(
            parse_device("cuda:1").unwrap(),
            Device::Cuda { device_id: 1 }
        ));
        assert!(parse_device("cuda:x").is_err());
        assert!(parse_device("tpu").is_err());
    }
}
