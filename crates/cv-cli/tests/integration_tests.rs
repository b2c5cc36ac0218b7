//! CLI integration tests for the cv binary

use cv_db::DuckDbBackend;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

/// Path to the compiled cv binary
fn cv_bin() -> String {
    env!("CARGO_BIN_EXE_cv").to_string()
}

/// Run `cv` with a clean environment for the variables it reads.
fn run_cv(args: &[&str]) -> Output {
    run_cv_with_env(args, &[])
}

/// Run `cv` with a clean environment plus the given variables.
fn run_cv_with_env(args: &[&str], env: &[(&str, &str)]) -> Output {
    let mut command = Command::new(cv_bin());
    command
        .args(args)
        .env_remove("CONVOY_MIGRATIONS_DIR")
        .env_remove("CONVOY_PSQL")
        .env_remove("POSTGRES_USER")
        .env_remove("POSTGRES_DB")
        .env_remove("POSTGRES_HOST")
        .env_remove("POSTGRES_PORT");
    for (key, value) in env {
        command.env(key, value);
    }
    command
        .output()
        .unwrap_or_else(|e| panic!("Failed to execute cv with args {:?}: {}", args, e))
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn write_steps(root: &Path, steps: &[&str]) {
    let mut yaml = String::from("name: test\nsteps:\n");
    for step in steps {
        yaml.push_str(&format!("  - file: {}\n", step));
    }
    write(root, "convoy.yml", &yaml);
}

fn table_exists(db_path: &Path, table: &str) -> bool {
    let db = DuckDbBackend::from_path(db_path).unwrap();
    db.query_count(&format!("SELECT * FROM {table}")).is_ok()
}

// ── init + migrate ─────────────────────────────────────────────────────

#[test]
fn test_init_then_migrate_duckdb() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("migrations");
    let root_str = root.to_str().unwrap();
    let db_path = dir.path().join("convoy.duckdb");

    let output = run_cv(&["init", root_str, "--dialect", "duckdb"]);
    assert!(output.status.success(), "init failed: {}", stderr(&output));
    assert!(root.join("003_conversation_state_history.sql").is_file());
    assert!(root.join("convoy.yml").is_file());
    assert!(root.join("feature").is_dir());

    let output = run_cv(&[
        "migrate",
        "--dir",
        root_str,
        "--database",
        db_path.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "migrate failed: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("001_reset_schema.sql"));
    assert!(out.contains("feature/001_conversation_latest_status.sql"));
    assert!(out.contains("Applied 5 file(s)"));

    assert!(table_exists(&db_path, "conversation_state_history"));
    assert!(table_exists(&db_path, "conversation_latest_status"));
}

#[test]
fn test_init_does_not_overwrite_without_force() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_str().unwrap();
    write(dir.path(), "001_reset_schema.sql", "-- custom\n");

    let output = run_cv(&["init", root]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Skipping (exists): 001_reset_schema.sql"));
    assert_eq!(
        fs::read_to_string(dir.path().join("001_reset_schema.sql")).unwrap(),
        "-- custom\n"
    );

    let output = run_cv(&["init", root, "--force"]);
    assert!(output.status.success());
    assert_ne!(
        fs::read_to_string(dir.path().join("001_reset_schema.sql")).unwrap(),
        "-- custom\n"
    );
}

#[test]
fn test_init_postgres_ships_trigger_and_roles() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_cv(&["init", dir.path().to_str().unwrap(), "--dialect", "postgres"]);
    assert!(output.status.success());

    let ddl =
        fs::read_to_string(dir.path().join("003_conversation_state_history.sql")).unwrap();
    assert!(ddl.contains("trg_conversation_state_history_id"));
    assert!(dir.path().join("roles/001_app_roles.sql").is_file());
    let config = fs::read_to_string(dir.path().join("convoy.yml")).unwrap();
    assert!(config.contains("type: postgres"));
    assert!(config.contains("roles/*.sql"));
}

// ── Applier semantics ──────────────────────────────────────────────────

#[test]
fn test_missing_file_warns_and_later_steps_run() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("m");
    write(&root, "001_a.sql", "CREATE TABLE first_t (id INT);");
    write(&root, "003_c.sql", "CREATE TABLE third_t (id INT);");
    write_steps(&root, &["001_a.sql", "002_b.sql", "003_c.sql"]);
    let db_path = dir.path().join("db.duckdb");

    let output = run_cv(&[
        "migrate",
        "-d",
        root.to_str().unwrap(),
        "--database",
        db_path.to_str().unwrap(),
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("Warning: 002_b.sql not found, skipping"));
    assert!(table_exists(&db_path, "third_t"));
}

#[test]
fn test_failing_file_aborts_with_non_zero_exit() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("m");
    write(&root, "001_a.sql", "CREATE TABLE first_t (id INT);");
    write(&root, "002_bad.sql", "INSERT INTO no_such_table VALUES (1);");
    write(&root, "003_c.sql", "CREATE TABLE third_t (id INT);");
    write_steps(&root, &["001_a.sql", "002_bad.sql", "003_c.sql"]);
    let db_path = dir.path().join("db.duckdb");

    let output = run_cv(&[
        "migrate",
        "-d",
        root.to_str().unwrap(),
        "--database",
        db_path.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("Migration aborted"));
    assert!(err.contains("002_bad.sql"));
    assert!(!stdout(&output).contains("003_c.sql"));

    assert!(table_exists(&db_path, "first_t"));
    assert!(!table_exists(&db_path, "third_t"));
}

#[test]
fn test_missing_root_fails() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("absent");
    let output = run_cv(&["migrate", "-d", root.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("[M002]"));
}

#[test]
fn test_migrate_json_report() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "001_a.sql", "CREATE TABLE a (id INT);");
    write_steps(dir.path(), &["001_a.sql", "002_b.sql"]);

    let db_path = dir.path().join("db.duckdb");

    let output = run_cv(&[
        "migrate",
        "-d",
        dir.path().to_str().unwrap(),
        "--database",
        db_path.to_str().unwrap(),
        "--output",
        "json",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(report["outcomes"][0]["status"], "applied");
    assert_eq!(report["outcomes"][1]["status"], "missing");
}

#[test]
fn test_in_memory_target_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "001_reset_schema.sql", "CREATE TABLE a (id INT);");

    let output = run_cv(&["migrate", "-d", dir.path().to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("in-memory"));
    assert!(!stdout(&output).contains("001_reset_schema.sql"));
}

#[cfg(unix)]
#[test]
fn test_environment_alone_targets_postgres() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("m");
    write(&root, "001_reset_schema.sql", "SELECT 1;");
    write(&root, "002_conversations.sql", "SELECT 1;");

    let calls = dir.path().join("calls.log");
    let client = dir.path().join("fake-psql");
    fs::write(
        &client,
        format!("#!/bin/sh\nprintf '%s\\n' \"$*\" >> '{}'\n", calls.display()),
    )
    .unwrap();
    fs::set_permissions(&client, fs::Permissions::from_mode(0o755)).unwrap();

    let output = run_cv_with_env(
        &["--dir", root.to_str().unwrap(), "migrate"],
        &[
            ("POSTGRES_USER", "postgres"),
            ("POSTGRES_DB", "platform"),
            ("CONVOY_PSQL", client.to_str().unwrap()),
        ],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("postgres (postgres@platform)"));

    let log = fs::read_to_string(&calls).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("--username postgres"));
    assert!(lines[0].contains("--dbname platform"));
    assert!(lines[0].contains("001_reset_schema.sql"));
    assert!(lines[1].contains("002_conversations.sql"));
}

#[cfg(unix)]
#[test]
fn test_postgres_client_exit_status_is_propagated() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("m");
    write(&root, "001_a.sql", "SELECT 1;");
    write_steps(&root, &["001_a.sql"]);

    let client = dir.path().join("fake-psql");
    fs::write(&client, "#!/bin/sh\necho 'ERROR:  boom' >&2\nexit 3\n").unwrap();
    fs::set_permissions(&client, fs::Permissions::from_mode(0o755)).unwrap();

    let output = run_cv(&[
        "migrate",
        "-d",
        root.to_str().unwrap(),
        "--backend",
        "postgres",
        "--user",
        "app",
        "--dbname",
        "platform",
        "--psql",
        client.to_str().unwrap(),
    ]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("boom"));
}

#[cfg(unix)]
#[test]
fn test_postgres_backend_applies_every_file() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_cv(&["init", dir.path().to_str().unwrap(), "--dialect", "postgres"]);
    assert!(output.status.success());

    let output = run_cv(&[
        "migrate",
        "-d",
        dir.path().to_str().unwrap(),
        "--psql",
        "true",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("postgres (postgres@postgres)"));
    assert!(out.contains("roles/001_app_roles.sql"));
    assert!(out.contains("Applied 6 file(s)"));
}

// ── plan ───────────────────────────────────────────────────────────────

#[test]
fn test_plan_json_marks_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "001_reset_schema.sql", "SELECT 1;");
    write(dir.path(), "feature/b.sql", "SELECT 1;");
    write(dir.path(), "feature/a.sql", "SELECT 1;");

    let output = run_cv(&["plan", "-d", dir.path().to_str().unwrap(), "-o", "json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let steps: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let steps = steps.as_array().unwrap();
    assert_eq!(steps.len(), 6);
    assert_eq!(steps[0]["files"][0]["present"], true);
    assert_eq!(steps[1]["files"][0]["present"], false);
    assert_eq!(steps[3]["files"].as_array().unwrap().len(), 0);
    assert_eq!(steps[5]["files"][0]["relative"], "feature/a.sql");
    assert_eq!(steps[5]["files"][1]["relative"], "feature/b.sql");
}

#[test]
fn test_plan_table_output() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "001_reset_schema.sql", "SELECT 1;");

    let output = run_cv(&["plan", "-d", dir.path().to_str().unwrap()]);
    assert!(output.status.success());
    let out = stdout(&output);
    assert!(out.contains("STEP"));
    assert!(out.contains("missing"));
    assert!(out.contains("no match"));
    assert!(out.contains("1 file(s) to apply, 3 missing"));
}

// ── history ────────────────────────────────────────────────────────────

#[test]
fn test_history_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("history.duckdb");
    let db = db_path.to_str().unwrap();

    let output = run_cv(&["history", "--database", db, "open", "c1"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let output = run_cv(&["history", "--database", db, "append", "c1", "--to", "active", "--json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let first: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(first["history_id"].as_str().unwrap().len(), 26);
    assert_eq!(first["actor_type"], "system");

    let output = run_cv(&[
        "history",
        "--database",
        db,
        "append",
        "c1",
        "--from",
        "active",
        "--to",
        "closed",
        "--actor-type",
        "agent",
        "--actor-id",
        "agent-9",
        "--meta",
        "turns=4",
        "--id",
        "manual-id",
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Recorded manual-id: active -> closed"));

    let output = run_cv(&["history", "--database", db, "list", "c1", "-o", "json"]);
    assert!(output.status.success());
    let rows: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["to_status"], "active");
    assert_eq!(rows[1]["history_id"], "manual-id");
    assert_eq!(rows[1]["metadata"]["turns"], 4);

    let output = run_cv(&["history", "--database", db, "delete", "c1"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Deleted conversation c1 and 2 history row(s)"));

    let output = run_cv(&["history", "--database", db, "list", "c1"]);
    assert!(!output.status.success());
}

#[test]
fn test_history_append_to_unknown_conversation_fails() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("history.duckdb");

    let output = run_cv(&[
        "history",
        "--database",
        db_path.to_str().unwrap(),
        "append",
        "ghost",
        "--to",
        "active",
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("[H001]"));
}

#[test]
fn test_history_rejects_unknown_actor_type() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("history.duckdb");
    let db = db_path.to_str().unwrap();
    run_cv(&["history", "--database", db, "open", "c1"]);

    let output = run_cv(&[
        "history", "--database", db, "append", "c1", "--to", "active", "--actor-type", "robot",
    ]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("[C007]"));
}

#[test]
fn test_history_rejects_padded_conversation_id() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("history.duckdb");

    let output = run_cv(&["history", "--database", db_path.to_str().unwrap(), "open", " c1"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("[C009] Invalid conversation id ' c1'"));
}
