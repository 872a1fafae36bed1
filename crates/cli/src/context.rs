//! Locating and loading the formula context file.

use std::path::{Path, PathBuf};

use inciscope_estimate::FormulaContext;

use crate::CliError;

/// File name looked up under the user config directory.
const DEFAULT_CONTEXT: &str = "inciscope/context.toml";

/// Context path: the explicit flag (clap folds `INCISCOPE_CONTEXT` into it),
/// else `<config dir>/inciscope/context.toml` when that file exists.
pub fn context_path(explicit: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = explicit {
        return Ok(path);
    }

    dirs::config_dir()
        .map(|dir| dir.join(DEFAULT_CONTEXT))
        .filter(|path| path.is_file())
        .ok_or_else(|| {
            CliError::usage("no formula context found")
                .with_hint("pass --context <file> or set INCISCOPE_CONTEXT")
        })
}

/// Read, parse and validate a context file.
pub fn load_context(path: &Path) -> Result<FormulaContext, CliError> {
    let toml = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read context {}: {e}", path.display())))?;
    let context = FormulaContext::from_toml(&toml).map_err(CliError::estimate)?;
    log::debug!(
        "loaded context '{}' from {} ({} profiles, {} usage entries)",
        context.name,
        path.display(),
        context.profiles.len(),
        context.usage.len()
    );
    Ok(context)
}
