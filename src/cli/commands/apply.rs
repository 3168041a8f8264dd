use std::path::Path;

use tracing::error;

use crate::cli::commands::audit_helpers;
use crate::cli::commands::describe::describe;
use crate::cli::context::Context;
use crate::cli::output;
use crate::core::errors::{AuthkeysError, Result};

/// Execute the `authkeys apply` command.
///
/// Reconciles declarations in manifest order. A failing declaration is
/// reported and the rest still run; the command fails at the end if any
/// declaration did.
pub fn execute(manifest: &Path, dry_run: bool, verbose: bool, quiet: bool) -> Result<()> {
    let ctx = Context::load(manifest)?;
    let logger = ctx.audit_logger();
    let total = ctx.config.declarations.len();

    if !quiet {
        if dry_run {
            output::header("authkeys apply (dry run)");
        } else {
            output::header("authkeys apply");
        }
    }

    let mut changed = 0;
    let mut failed = 0;

    for decl in &ctx.config.declarations {
        match ctx.engine.reconcile(decl, dry_run) {
            Ok(outcome) if outcome.changed => {
                changed += 1;
                if !dry_run {
                    audit_helpers::log_outcome(logger.as_ref(), &outcome);
                }
                if !quiet {
                    output::success(&describe(&outcome, dry_run));
                }
            }
            Ok(outcome) => {
                if verbose && !quiet {
                    output::unchanged(&describe(&outcome, dry_run));
                }
            }
            Err(e) => {
                failed += 1;
                error!(declaration = %decl.name, user = %decl.user, error = %e, "reconcile failed");
                output::error(&format!("{} ({}): {e}", decl.name, decl.user));
            }
        }
    }

    if !quiet {
        println!();
        let verb = if dry_run { "would change" } else { "changed" };
        output::success(&format!(
            "{total} declaration(s), {changed} {verb}, {} in sync",
            total - changed - failed
        ));
    }

    if failed > 0 {
        return Err(AuthkeysError::ApplyFailed { failed, total });
    }

    Ok(())
}
