pub mod user;

use std::path::Path;
use uowmap_store::StoreConfig;

/// Store config from `--config` when given, else a file store at `--db`
pub fn store_config(
    db: &Path,
    config: Option<&Path>,
) -> Result<StoreConfig, Box<dyn std::error::Error>> {
    match config {
        Some(path) => {
            let source = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
            Ok(StoreConfig::from_toml_str(&source)?)
        }
        None => Ok(StoreConfig::file(db)),
    }
}
