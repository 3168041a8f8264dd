use std::path::Path;

use colored::Colorize;

use crate::cli::context::Context;
use crate::cli::output;
use crate::core::errors::Result;

/// Execute the `authkeys list` command.
pub fn execute(manifest: &Path, user: &str) -> Result<()> {
    let ctx = Context::load(manifest)?;
    let path = ctx.engine.key_file_path(user)?;
    let keys = ctx.engine.list_keys(user)?;

    if keys.is_empty() {
        output::warning(&format!("No keys in {}", path.display()));
        return Ok(());
    }

    output::header(&format!("{} ({} keys)", path.display(), keys.len()));
    for key in &keys {
        let declared = if ctx.engine.registry.is_declared(user, key) {
            "declared".green()
        } else {
            "unlisted".yellow()
        };
        let options = key
            .options
            .as_deref()
            .map(|o| format!(" [{o}]").dimmed().to_string())
            .unwrap_or_default();

        println!("  • {} {declared}{options}", key.label());
    }

    Ok(())
}
