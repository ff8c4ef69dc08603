use std::path::Path;

use pics_core::EngineConfig;

/// Defaults, then the YAML file (or the environment alone), then flags.
pub fn resolve(
    config: Option<&Path>,
    db: Option<&Path>,
    parser_url: Option<&str>,
    batch_size: Option<usize>,
) -> anyhow::Result<EngineConfig> {
    let mut cfg = match config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::from_env(),
    };
    if let Some(db) = db {
        cfg = cfg.with_database(db);
    }
    if let Some(url) = parser_url {
        cfg = cfg.with_parser_url(url);
    }
    if let Some(n) = batch_size {
        cfg = cfg.with_batch_size(n);
    }
    Ok(cfg)
}
