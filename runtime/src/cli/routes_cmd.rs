// Copyright 2026 Rendition Contributors
// SPDX-License-Identifier: Apache-2.0

//! `rendition routes`: print the resolved route set without writing pages.

use crate::cli::output::{self, Styled};
use crate::cli::render_cmd::Session;
use crate::cli::RunArgs;
use crate::config::RenderConfig;
use crate::pipeline::RenderPipeline;
use anyhow::Result;

pub async fn run(args: &RunArgs, config: RenderConfig) -> Result<()> {
    let session = Session::start(&config, args.port).await?;
    let resolved = async {
        let pipeline = RenderPipeline::new(
            config.clone(),
            session.renderer.clone(),
            session.base_url.clone(),
            None,
        )?;
        anyhow::Ok(pipeline.resolve_routes().await)
    }
    .await;
    session.stop().await?;
    let resolved = resolved?;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "seeds": resolved.seeds,
            "discovered": resolved.discovered,
        }));
        return Ok(());
    }

    let s = Styled::new();
    for route in &resolved.seeds {
        println!("{route}");
    }
    for route in &resolved.discovered {
        println!("{route}  {}", s.dim("(crawled)"));
    }
    if !output::is_quiet() {
        eprintln!(
            "  {} {} seed route(s), {} discovered",
            s.info_sym(),
            resolved.seeds.len(),
            resolved.discovered.len()
        );
    }
    Ok(())
}
