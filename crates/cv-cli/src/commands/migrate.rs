//! Migrate command implementation - applies the migration plan

use anyhow::{Context, Result};
use cv_core::DbType;
use cv_migrate::plan::ensure_root;
use cv_migrate::{ApplyReport, MigrationRunner, StepEvent};

use crate::cli::{GlobalArgs, MigrateArgs, MigrateOutput};
use crate::commands::common::{
    build_backend, has_config_file, load_config, migrations_root, resolve_database, verbose,
    ExitCode, IN_MEMORY_DB,
};

/// Execute the migrate command
pub(crate) async fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let root = migrations_root(global);
    ensure_root(&root)?;
    let config = load_config(global)?;
    let target = global.target.as_deref();
    let steps = config.steps_for(target)?;
    let database = resolve_database(
        &config,
        target,
        &args.connection,
        has_config_file(global),
    )?;
    if database.db_type == DbType::DuckDb && database.path == IN_MEMORY_DB {
        anyhow::bail!(
            "No migration target: the DuckDB database is in-memory. Pass --database <file>, \
             --backend postgres, or set POSTGRES_USER / POSTGRES_DB."
        );
    }
    let db = build_backend(&database, &args.connection.psql)?;

    let text = args.output == MigrateOutput::Text;
    if text {
        println!(
            "Applying migrations from {} to {}\n",
            root.display(),
            db.describe()
        );
    }
    verbose(global, format!("Plan has {} step(s)", steps.len()));

    let runner = MigrationRunner::new(&root, steps);
    let result = runner
        .apply(&*db, |event| print_event(event, text, global.verbose))
        .await;

    match result {
        Ok(report) => {
            if text {
                print_summary(&report);
            } else {
                let json = serde_json::to_string_pretty(&report)
                    .context("Failed to serialize report to JSON")?;
                println!("{}", json);
            }
            Ok(())
        }
        Err(err) => {
            eprintln!("\nMigration aborted: {}", err);
            let code = err.client_exit_code().filter(|c| *c != 0).unwrap_or(1);
            Err(ExitCode(code).into())
        }
    }
}

fn print_event(event: &StepEvent<'_>, text: bool, verbose: bool) {
    match event {
        StepEvent::Starting { file } => {
            if verbose {
                eprintln!("[verbose] Executing {}", file.path.display());
            }
        }
        StepEvent::Applied { file, duration } => {
            if text {
                println!(
                    "  \u{2713} {} ({}ms)",
                    file.relative.display(),
                    duration.as_millis()
                );
            }
        }
        StepEvent::Missing { file } => {
            eprintln!(
                "  Warning: {} not found, skipping",
                file.relative.display()
            );
        }
        StepEvent::EmptyGlob { pattern } => {
            eprintln!("  Warning: no files match {}, skipping", pattern);
        }
        StepEvent::Failed { file, error } => {
            eprintln!("  \u{2717} {}: {}", file.relative.display(), error);
        }
    }
}

fn print_summary(report: &ApplyReport) {
    println!();
    println!(
        "Applied {} file(s) in {}ms",
        report.applied_count(),
        report.elapsed_ms
    );
    if report.has_warnings() {
        println!(
            "{} missing file(s), {} empty glob(s)",
            report.missing_count(),
            report.empty_globs.len()
        );
    }
}
