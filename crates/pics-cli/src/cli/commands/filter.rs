use anyhow::Context;
use pics_core::report::{console, json};
use pics_core::{FilterRequest, FilterService};
use tracing::warn;

use super::super::args::{FilterArgs, OutputFormat};
use crate::exit_codes::{NO_MATCHES, SUCCESS};

pub async fn run(args: FilterArgs) -> anyhow::Result<i32> {
    let cfg = super::config::resolve(
        args.config.as_deref(),
        args.db.as_deref(),
        args.parser_url.as_deref(),
        args.batch_size,
    )?;

    let text = std::fs::read_to_string(&args.request)
        .with_context(|| format!("failed to read request {}", args.request.display()))?;
    let request = FilterRequest::from_json(&text)?;

    let service = FilterService::from_config(cfg)?;
    let result = service.filter(&request).await?;

    match (args.format, &args.output) {
        (OutputFormat::Json, Some(path)) => json::write_json(&result, path)
            .with_context(|| format!("failed to write {}", path.display()))?,
        (OutputFormat::Json, None) => println!("{}", json::to_json(&result)?),
        (OutputFormat::Text, Some(path)) => {
            std::fs::write(path, console::format_summary(&result, args.explain))
                .with_context(|| format!("failed to write {}", path.display()))?
        }
        (OutputFormat::Text, None) => console::print_summary(&result, args.explain),
    }

    if args.fail_on_empty && result.matched_count == 0 {
        warn!(total = result.total_evaluated, "no applicable test cases");
        return Ok(NO_MATCHES);
    }
    Ok(SUCCESS)
}
