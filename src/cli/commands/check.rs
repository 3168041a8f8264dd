use std::path::Path;

use crate::cli::commands::describe::describe;
use crate::cli::context::Context;
use crate::cli::output;
use crate::core::errors::{AuthkeysError, Result};

/// Execute the `authkeys check` command.
///
/// Detects the state of every declaration without changing anything and
/// fails when at least one is out of sync.
pub fn execute(manifest: &Path, verbose: bool, quiet: bool) -> Result<()> {
    let ctx = Context::load(manifest)?;

    if !quiet {
        output::header("authkeys check");
    }

    let mut drifted = 0;
    for decl in &ctx.config.declarations {
        let outcome = ctx.engine.reconcile(decl, true)?;
        if outcome.changed {
            drifted += 1;
            if !quiet {
                output::warning(&format!(
                    "{} ({}): {}, expected {}",
                    outcome.declaration, outcome.user, outcome.before, outcome.target
                ));
                if verbose {
                    println!("    {}", describe(&outcome, true));
                }
            }
        } else if verbose && !quiet {
            output::unchanged(&describe(&outcome, true));
        }
    }

    if drifted > 0 {
        return Err(AuthkeysError::DriftDetected { count: drifted });
    }

    if !quiet {
        output::success(&format!(
            "{} declaration(s) in sync",
            ctx.config.declarations.len()
        ));
    }
    Ok(())
}
