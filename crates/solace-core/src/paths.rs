use anyhow::Result;
use std::path::PathBuf;

const SOLACE_DIR: &str = ".solace";
const CONFIG_FILE: &str = "config.toml";
const LOGS_DIR: &str = "logs";

/// Environment variable to override the Solace directory.
pub const SOLACE_DIR_ENV: &str = "SOLACE_DIR";

/// Resolve the Solace data directory.
/// Priority: SOLACE_DIR env var > ~/.solace/
pub fn resolve_solace_dir() -> Result<PathBuf> {
    resolve_solace_dir_with(|key| std::env::var(key).ok())
}

fn resolve_solace_dir_with(lookup: impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    if let Some(dir) = lookup(SOLACE_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|h| h.join(SOLACE_DIR))
        .ok_or_else(|| anyhow::anyhow!("Failed to determine home directory"))
}

/// Ensure the Solace directory exists and return its path.
pub fn ensure_solace_dir() -> Result<PathBuf> {
    let dir = resolve_solace_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

/// Get the config file path: ~/.solace/config.toml
pub fn config_path() -> Result<PathBuf> {
    Ok(resolve_solace_dir()?.join(CONFIG_FILE))
}

/// Get the logs directory: ~/.solace/logs/
pub fn logs_dir() -> Result<PathBuf> {
    let dir = resolve_solace_dir()?.join(LOGS_DIR);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_override_wins() {
        let dir = resolve_solace_dir_with(|key| {
            (key == SOLACE_DIR_ENV).then(|| "/tmp/solace-test".to_string())
        })
        .unwrap();
        assert_eq!(dir, PathBuf::from("/tmp/solace-test"));
    }

    #[test]
    fn test_blank_override_is_ignored() {
        let dir = resolve_solace_dir_with(|_| Some("   ".to_string()));
        if let Ok(dir) = dir {
            assert!(dir.ends_with(SOLACE_DIR));
        }
    }
}
