use anyhow::{Context, Result};
use std::{env, fs, path::PathBuf, process::Command};
use wts_config::{codegen::generate_modules, Configuration};

const DEFAULT_CONFIG_FILENAME: &str = "wts_rc.ron";

fn main() -> Result<()> {
    process_configuration_file()?;
    Ok(())
}

fn process_configuration_file() -> Result<()> {
    println!("cargo:rerun-if-env-changed=WTS_CONFIG");
    println!(
        "cargo:rerun-if-changed=./wts_config/sample_configurations/{}",
        DEFAULT_CONFIG_FILENAME
    );

    let filename = env::var("WTS_CONFIG").unwrap_or_else(|_| {
        format!("./wts_config/sample_configurations/{}", DEFAULT_CONFIG_FILENAME)
    });
    println!("cargo:rerun-if-changed={}", filename);

    let contents = fs::read_to_string(&filename)
        .with_context(|| format!("Failed to read configuration file {}", filename))?;
    let configuration: Configuration = ron::from_str(&contents)
        .with_context(|| format!("Failed to parse configuration file {}", filename))?;
    configuration.validate().with_context(|| format!("Invalid configuration in {}", filename))?;

    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    generate_modules(&out_dir, &configuration, &compiler_version())?;
    Ok(())
}

/// Version of the compiler building the firmware, served over the bus.
fn compiler_version() -> String {
    let rustc = env::var("RUSTC").unwrap_or_else(|_| String::from("rustc"));
    Command::new(rustc)
        .arg("--version")
        .output()
        .ok()
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|version| version.trim().to_owned())
        .filter(|version| !version.is_empty())
        .unwrap_or_else(|| String::from("rustc (unknown version)"))
}
