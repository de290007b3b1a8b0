// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! Environment readiness check.

use crate::cli::output::{self, Styled};
use crate::cli::DEFAULT_CONFIG_FILE;
use crate::config::RenderConfig;
use crate::renderer::chromium::find_chromium;
use anyhow::Result;
use std::path::Path;

/// Check Chromium availability and the local config file.
pub async fn run() -> Result<()> {
    let chromium = find_chromium();
    let config_path = Path::new(DEFAULT_CONFIG_FILE);
    let config = if config_path.is_file() {
        Some(RenderConfig::load(config_path))
    } else {
        None
    };

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "chromium": chromium.as_ref().map(|p| p.display().to_string()),
            "config": match &config {
                Some(Ok(_)) => serde_json::json!("ok"),
                Some(Err(e)) => serde_json::json!(e.to_string()),
                None => serde_json::Value::Null,
            },
            "ready": chromium.is_some(),
        }));
        return Ok(());
    }

    let s = Styled::new();
    println!("Rendition Doctor");
    println!("================");
    println!();
    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();

    match &chromium {
        Some(path) => println!("{} Chromium found: {}", s.ok_sym(), path.display()),
        None => println!(
            "{} Chromium NOT found. Install Chrome/Chromium or set RENDITION_CHROMIUM_PATH.",
            s.warn_sym()
        ),
    }

    match &config {
        Some(Ok(config)) => {
            println!("{} {DEFAULT_CONFIG_FILE} is valid", s.ok_sym());
            if config.source_dir.is_dir() {
                println!("{} Source directory: {}", s.ok_sym(), config.source_dir.display());
            } else {
                println!(
                    "{} Source directory {} does not exist yet",
                    s.warn_sym(),
                    config.source_dir.display()
                );
            }
        }
        Some(Err(e)) => println!("{} {DEFAULT_CONFIG_FILE}: {e}", s.warn_sym()),
        None => println!("{} No {DEFAULT_CONFIG_FILE}; defaults apply", s.info_sym()),
    }

    println!();
    if chromium.is_some() {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }
    Ok(())
}
