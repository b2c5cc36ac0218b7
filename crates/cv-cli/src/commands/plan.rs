//! Plan command implementation - shows which files a migrate would visit

use anyhow::{Context, Result};
use cv_migrate::{resolve_plan, ResolvedStep};

use crate::cli::{GlobalArgs, OutputFormat, PlanArgs};
use crate::commands::common::{load_config, migrations_root, verbose};

/// Execute the plan command
pub(crate) async fn execute(args: &PlanArgs, global: &GlobalArgs) -> Result<()> {
    let root = migrations_root(global);
    let config = load_config(global)?;
    let steps = config.steps_for(global.target.as_deref())?;
    verbose(
        global,
        format!("Resolving {} step(s) under {}", steps.len(), root.display()),
    );

    let resolved = resolve_plan(&root, &steps)?;

    match args.output {
        OutputFormat::Table => print_table(&resolved),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&resolved)
                .context("Failed to serialize to JSON")?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn print_table(steps: &[ResolvedStep]) {
    let step_width = steps
        .iter()
        .map(|s| s.step.len())
        .max()
        .unwrap_or(4)
        .max(4);
    let file_width = steps
        .iter()
        .flat_map(|s| s.files.iter())
        .map(|f| f.relative.display().to_string().len())
        .max()
        .unwrap_or(4)
        .max(4);

    println!(
        "{:<3}  {:<step_width$}  {:<file_width$}  STATUS",
        "#", "STEP", "FILE"
    );
    println!(
        "{:-<3}  {:-<step_width$}  {:-<file_width$}  {}",
        "", "", "", "-------"
    );

    let mut present = 0;
    let mut missing = 0;
    for step in steps {
        if step.is_empty_glob() {
            println!(
                "{:<3}  {:<step_width$}  {:<file_width$}  no match",
                step.index + 1,
                step.step,
                "-"
            );
            continue;
        }
        for file in &step.files {
            let status = if file.present {
                present += 1;
                "ok"
            } else {
                missing += 1;
                "missing"
            };
            println!(
                "{:<3}  {:<step_width$}  {:<file_width$}  {}",
                step.index + 1,
                step.step,
                file.relative.display().to_string(),
                status
            );
        }
    }

    println!();
    println!("{} file(s) to apply, {} missing", present, missing);
}
