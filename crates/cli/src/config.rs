use std::path::Path;

use anyhow::{bail, Context, Result};
use fraudlens_core::Config;
use tracing::debug;

/// Load config from a TOML file when given, otherwise from the environment.
///
/// Unlike the environment path, a file that is named but missing is an error.
/// A profile only selects environment variables, so it cannot be combined
/// with a file.
pub fn load(path: Option<&Path>, profile: Option<&str>) -> Result<Config> {
    let Some(path) = path else {
        let config = match profile {
            Some(p) => Config::for_profile(p),
            None => Config::from_env(),
        };
        return Ok(config);
    };

    if let Some(p) = profile {
        bail!(
            "profile {p} applies to environment config only; drop it or the config file {}",
            path.display()
        );
    }

    debug!(?path, "Loading config");
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("failed to parse config: {}", path.display()))
}
