use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use pics_core::{FilterService, PicsItem, PicsValue};
use serde::Deserialize;

use super::super::args::{EvalArgs, OutputFormat};
use crate::exit_codes::SUCCESS;

#[derive(Deserialize)]
#[serde(untagged)]
enum PicsFile {
    Items(Vec<PicsItem>),
    Request { pics_items: Vec<PicsItem> },
    Map(BTreeMap<String, PicsValue>),
}

fn load_pics(path: &Path) -> anyhow::Result<Vec<PicsItem>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read PICS file {}", path.display()))?;
    let parsed: PicsFile = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse PICS file {}", path.display()))?;
    Ok(match parsed {
        PicsFile::Items(items) | PicsFile::Request { pics_items: items } => items,
        PicsFile::Map(map) => map
            .into_iter()
            .map(|(id, value)| PicsItem::new(id, value))
            .collect(),
    })
}

pub async fn run(args: EvalArgs) -> anyhow::Result<i32> {
    let mut cfg = super::config::resolve(
        args.config.as_deref(),
        None,
        args.parser_url.as_deref(),
        None,
    )?;
    // no catalog involved
    cfg.database = None;

    let items = match &args.pics {
        Some(path) => load_pics(path)?,
        None => Vec::new(),
    };

    let service = FilterService::from_config(cfg)?;
    let (outcome, stats) = service.evaluate_expression(&args.expr, &items).await;

    match args.format {
        OutputFormat::Json => {
            let v = serde_json::json!({
                "outcome": outcome,
                "fallback": stats,
            });
            println!("{}", serde_json::to_string_pretty(&v)?);
        }
        OutputFormat::Text => {
            println!("Result: {}", outcome.result);
            println!("Logic: {}", outcome.logic);
            for step in &outcome.steps {
                println!("  {}", step);
            }
        }
    }
    Ok(SUCCESS)
}
