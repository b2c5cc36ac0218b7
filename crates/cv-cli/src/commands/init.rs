//! Init command implementation - scaffolds a migrations directory

use anyhow::{Context, Result};
use cv_core::{DbType, MigrationStep};
use cv_history::{default_steps, migration_files};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::{GlobalArgs, InitArgs};
use crate::commands::common::verbose;

/// Execute the init command
pub(crate) async fn execute(args: &InitArgs, global: &GlobalArgs) -> Result<()> {
    let root = PathBuf::from(args.path.as_deref().unwrap_or(&global.dir));
    let dialect: DbType = args.dialect.into();

    println!(
        "Scaffolding {} migrations in {}\n",
        dialect,
        root.display()
    );

    let mut files: Vec<(String, String)> = migration_files(dialect)
        .iter()
        .map(|f| (f.path.to_string(), f.sql.to_string()))
        .collect();
    files.push(("convoy.yml".to_string(), config_template(&root, dialect)));

    let mut written = 0;
    let mut skipped = 0;
    for (relative, content) in &files {
        let path = root.join(relative);
        if path.exists() && !args.force {
            println!("  Skipping (exists): {}", relative);
            skipped += 1;
            continue;
        }
        write_file(&path, content)?;
        verbose(global, format!("Wrote {}", path.display()));
        println!("  Created: {}", relative);
        written += 1;
    }

    // Keep the glob directories around even when they start empty.
    for dir in glob_dirs(dialect) {
        let path = root.join(dir);
        fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
    }

    println!();
    if skipped > 0 {
        println!(
            "{} file(s) written, {} skipped (use --force to overwrite)",
            written, skipped
        );
    } else {
        println!("{} file(s) written", written);
    }
    println!("\nNext: cv migrate --dir {}", root.display());
    Ok(())
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

fn glob_dirs(dialect: DbType) -> Vec<&'static str> {
    default_steps(dialect)
        .iter()
        .filter_map(|step| match step {
            MigrationStep::Glob(pattern) => match pattern.as_str() {
                "roles/*.sql" => Some("roles"),
                "feature/*.sql" => Some("feature"),
                _ => None,
            },
            MigrationStep::File(_) => None,
        })
        .collect()
}

/// `convoy.yml` for a fresh scaffold
fn config_template(root: &Path, dialect: DbType) -> String {
    let name = root
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("convoy")
        .replace('"', "\\\"");

    let mut steps = String::new();
    for step in default_steps(dialect) {
        match step {
            MigrationStep::File(file) => steps.push_str(&format!("  - file: {}\n", file)),
            MigrationStep::Glob(pattern) => {
                steps.push_str(&format!("  - glob: \"{}\"\n", pattern))
            }
        }
    }

    let database = match dialect {
        DbType::DuckDb => "database:\n  type: duckdb\n  path: \"convoy.duckdb\"\n".to_string(),
        DbType::Postgres => "database:\n  type: postgres\n  user: postgres\n  name: postgres\n\
             # POSTGRES_USER, POSTGRES_DB, POSTGRES_HOST and POSTGRES_PORT override these.\n"
            .to_string(),
    };

    format!(
        r#"name: "{name}"

# Applied in order. A missing file or an empty glob is a warning;
# the first failing file aborts the run.
steps:
{steps}
{database}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use cv_core::Config;

    #[test]
    fn test_config_template_parses_back() {
        for dialect in [DbType::DuckDb, DbType::Postgres] {
            let yaml = config_template(Path::new("/opt/migrations"), dialect);
            let config: Config = serde_yaml::from_str(&yaml).unwrap();
            config.validate().unwrap();
            assert_eq!(config.name, "migrations");
            assert_eq!(config.database.db_type, dialect);
            assert_eq!(config.steps, default_steps(dialect));
        }
    }

    #[test]
    fn test_glob_dirs_per_dialect() {
        assert_eq!(glob_dirs(DbType::DuckDb), vec!["feature"]);
        assert_eq!(glob_dirs(DbType::Postgres), vec!["roles", "feature"]);
    }
}
