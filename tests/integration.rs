use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn guidely_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("guidely");
    path
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();

    // Create exhibition source files
    let docs_dir = root.join("docs");
    fs::create_dir_all(&docs_dir).unwrap();
    fs::write(
        docs_dir.join("hojakdo.md"),
        "# 호작도\n\n호작도는 까치와 호랑이가 함께 등장하는 조선 후기 민화다.\n\n까치는 기쁜 소식을, 호랑이는 잡귀를 쫓는 수호자를 상징한다.",
    ).unwrap();
    fs::write(
        docs_dir.join("visit.txt"),
        "전시 관람 안내.\n\n호랑이 전시는 국립중앙박물관 특별전시실에서 열린다.\n\n관람 시간은 오전 열 시부터 오후 여섯 시까지다.",
    ).unwrap();
    fs::write(
        docs_dir.join("index.html"),
        "<html><body>Tiger exhibition landing page</body></html>",
    )
    .unwrap();

    // Embeddings disabled: these tests exercise the CLI without network access
    let config_content = format!(
        r#"[db]
path = "{}/data/guidely.db"

[chunking]
max_chars = 1200
overlap = 200

[embedding]
provider = "disabled"

[server]
bind = "127.0.0.1:8000"
"#,
        root.display()
    );

    let config_path = root.join("guidely.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_guidely(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    run_guidely_env(config_path, args, &[])
}

fn run_guidely_env(
    config_path: &Path,
    args: &[&str],
    envs: &[(&str, &str)],
) -> (String, String, bool) {
    let binary = guidely_binary();
    let mut command = Command::new(&binary);
    command
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args);
    for (key, value) in envs {
        command.env(key, value);
    }
    let output = command
        .output()
        .unwrap_or_else(|e| panic!("Failed to run guidely binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

/// First whitespace-separated token of the ingest report line.
fn first_document_id(stdout: &str) -> String {
    stdout
        .split_whitespace()
        .next()
        .unwrap_or_else(|| panic!("No document id in output: {}", stdout))
        .to_string()
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_guidely(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data").join("guidely.db").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_guidely(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_guidely(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_init_writes_starter_config() {
    // No config file prepared: init must create one. The starter config
    // stores the database relative to the working directory.
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("guidely.toml");

    let output = Command::new(guidely_binary())
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("init")
        .current_dir(tmp.path())
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    assert!(output.status.success(), "init failed: {}", stdout);
    assert!(stdout.contains("Wrote starter config"));
    assert!(config_path.exists());
    assert!(tmp.path().join("guidely.db").exists());

    // A second init keeps the existing file untouched
    let output = Command::new(guidely_binary())
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .arg("init")
        .current_dir(tmp.path())
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    assert!(output.status.success());
    assert!(
        !stdout.contains("Wrote starter config"),
        "Second init must not overwrite the config, got: {}",
        stdout
    );
}

#[test]
fn test_ingest_text() {
    let (_tmp, config_path) = setup_test_env();

    run_guidely(&config_path, &["init"]);
    let (stdout, stderr, success) = run_guidely(
        &config_path,
        &[
            "ingest",
            "text",
            "--title",
            "용호도",
            "--content",
            "용과 호랑이가 마주 보는 구도의 그림을 용호도라고 한다.",
        ],
    );
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("\"용호도\""));
    assert!(stdout.contains("(1 passages)"));
}

#[test]
fn test_ingest_text_empty_content_errors() {
    let (_tmp, config_path) = setup_test_env();

    run_guidely(&config_path, &["init"]);
    let (_, stderr, success) = run_guidely(
        &config_path,
        &["ingest", "text", "--title", "빈 문서", "--content", "   "],
    );
    assert!(!success, "Empty content should fail");
    assert!(
        stderr.contains("content must not be empty"),
        "Should report empty content, got: {}",
        stderr
    );
}

#[test]
fn test_ingest_file_and_show_document() {
    let (tmp, config_path) = setup_test_env();

    run_guidely(&config_path, &["init"]);
    let file_path = tmp.path().join("docs").join("hojakdo.md");
    let (stdout, stderr, success) = run_guidely(
        &config_path,
        &["ingest", "file", file_path.to_str().unwrap()],
    );
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    // Title defaults to the file stem
    assert!(stdout.contains("\"hojakdo\""));

    let id = first_document_id(&stdout);
    let (stdout, _, success) = run_guidely(&config_path, &["documents", "show", &id]);
    assert!(success, "show should succeed");
    assert!(stdout.contains("--- Document ---"));
    assert!(stdout.contains(&id));
    assert!(stdout.contains("file_name:  hojakdo.md"));
    assert!(stdout.contains("--- Passages (1) ---"));
    // Disabled provider: passages are stored without vectors
    assert!(stdout.contains("no embedding"));
}

#[test]
fn test_ingest_dir_skips_unsupported_files() {
    let (tmp, config_path) = setup_test_env();

    run_guidely(&config_path, &["init"]);
    let docs_dir = tmp.path().join("docs");
    let (stdout, stderr, success) =
        run_guidely(&config_path, &["ingest", "dir", docs_dir.to_str().unwrap()]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    // .md and .txt are picked up, index.html is not
    assert!(
        stdout.contains("Ingested 2 document(s)."),
        "Expected 2 documents, got: {}",
        stdout
    );
}

#[test]
fn test_ingest_dir_include_glob() {
    let (tmp, config_path) = setup_test_env();

    run_guidely(&config_path, &["init"]);
    let docs_dir = tmp.path().join("docs");
    let (stdout, _, success) = run_guidely(
        &config_path,
        &[
            "ingest",
            "dir",
            docs_dir.to_str().unwrap(),
            "--include",
            "*.md",
        ],
    );
    assert!(success);
    assert!(
        stdout.contains("Ingested 1 document(s)."),
        "Expected only the .md file, got: {}",
        stdout
    );
}

#[test]
fn test_documents_list_empty() {
    let (_tmp, config_path) = setup_test_env();

    run_guidely(&config_path, &["init"]);
    let (stdout, _, success) = run_guidely(&config_path, &["documents", "list"]);
    assert!(success);
    assert!(stdout.contains("No documents."));
}

#[test]
fn test_documents_list_after_ingest() {
    let (_tmp, config_path) = setup_test_env();

    run_guidely(&config_path, &["init"]);
    run_guidely(
        &config_path,
        &[
            "ingest",
            "text",
            "--title",
            "산신도",
            "--content",
            "산신 곁에 호랑이가 엎드려 있는 그림이다.",
        ],
    );

    let (stdout, _, success) = run_guidely(&config_path, &["documents", "list"]);
    assert!(success);
    assert!(stdout.contains("active"));
    assert!(stdout.contains("\"산신도\""));
    assert!(stdout.contains("(1 passages)"));
}

#[test]
fn test_deactivate_hides_document_from_default_list() {
    let (_tmp, config_path) = setup_test_env();

    run_guidely(&config_path, &["init"]);
    let (stdout, _, _) = run_guidely(
        &config_path,
        &[
            "ingest",
            "text",
            "--title",
            "호렵도",
            "--content",
            "말을 탄 사냥꾼들이 호랑이를 쫓는 수렵 장면이다.",
        ],
    );
    let id = first_document_id(&stdout);

    let (stdout, _, success) = run_guidely(&config_path, &["documents", "deactivate", &id]);
    assert!(success);
    assert!(stdout.contains("Deactivated"));

    // Gone from the default listing
    let (stdout, _, _) = run_guidely(&config_path, &["documents", "list"]);
    assert!(stdout.contains("No documents."));

    // Still present with --all, marked inactive
    let (stdout, _, _) = run_guidely(&config_path, &["documents", "list", "--all"]);
    assert!(stdout.contains(&id));
    assert!(stdout.contains("inactive"));

    // And still fetchable by id
    let (stdout, _, success) = run_guidely(&config_path, &["documents", "show", &id]);
    assert!(success);
    assert!(stdout.contains("active:     false"));
}

#[test]
fn test_delete_removes_document() {
    let (_tmp, config_path) = setup_test_env();

    run_guidely(&config_path, &["init"]);
    let (stdout, _, _) = run_guidely(
        &config_path,
        &[
            "ingest",
            "text",
            "--title",
            "까치 호랑이",
            "--content",
            "소나무 가지 위의 까치가 호랑이를 내려다본다.",
        ],
    );
    let id = first_document_id(&stdout);

    let (stdout, _, success) = run_guidely(&config_path, &["documents", "delete", &id]);
    assert!(success);
    assert!(stdout.contains("Deleted"));

    let (_, stderr, success) = run_guidely(&config_path, &["documents", "show", &id]);
    assert!(!success, "show after delete should fail");
    assert!(stderr.contains("not found"));

    // Deleting twice reports the missing document
    let (_, stderr, success) = run_guidely(&config_path, &["documents", "delete", &id]);
    assert!(!success);
    assert!(stderr.contains("not found"));
}

#[test]
fn test_delete_missing_document() {
    let (_tmp, config_path) = setup_test_env();

    run_guidely(&config_path, &["init"]);
    let (_, stderr, success) = run_guidely(&config_path, &["documents", "delete", "nonexistent-id"]);
    assert!(!success, "delete with missing ID should fail");
    assert!(
        stderr.contains("not found"),
        "Should report not found, got: {}",
        stderr
    );
}

#[test]
fn test_rechunk_document() {
    let (_tmp, config_path) = setup_test_env();

    run_guidely(&config_path, &["init"]);
    let (stdout, _, _) = run_guidely(
        &config_path,
        &[
            "ingest",
            "text",
            "--title",
            "월하송림호족도",
            "--content",
            "달빛 아래 소나무 숲을 지나는 호랑이 가족을 그렸다.",
        ],
    );
    let id = first_document_id(&stdout);

    let (stdout, stderr, success) = run_guidely(&config_path, &["documents", "rechunk", &id]);
    assert!(success, "rechunk failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Re-chunked"));
    assert!(stdout.contains("1 passages"));
}

#[test]
fn test_rechunk_missing_document() {
    let (_tmp, config_path) = setup_test_env();

    run_guidely(&config_path, &["init"]);
    let (_, stderr, success) =
        run_guidely(&config_path, &["documents", "rechunk", "nonexistent-id"]);
    assert!(!success);
    assert!(
        stderr.contains("nonexistent-id"),
        "Should name the missing document, got: {}",
        stderr
    );
}

#[test]
fn test_search_errors_when_embeddings_disabled() {
    let (_tmp, config_path) = setup_test_env();

    run_guidely(&config_path, &["init"]);
    let (_, stderr, success) = run_guidely(&config_path, &["search", "호랑이 그림"]);
    assert!(!success, "Search should fail when embeddings disabled");
    assert!(
        stderr.contains("embeddings"),
        "Should mention embeddings, got: {}",
        stderr
    );
}

#[test]
fn test_search_empty_query() {
    let (_tmp, config_path) = setup_test_env();

    run_guidely(&config_path, &["init"]);
    let (stdout, _, success) = run_guidely(&config_path, &["search", ""]);
    assert!(success, "Empty query should not panic");
    assert!(stdout.contains("No results"));
}

#[test]
fn test_ask_unknown_persona() {
    let (_tmp, config_path) = setup_test_env();

    run_guidely(&config_path, &["init"]);
    let (_, stderr, success) = run_guidely(
        &config_path,
        &["ask", "호랑이 그림 보여줘", "--persona", "bogus"],
    );
    assert!(!success, "Unknown persona should fail");
    assert!(
        stderr.contains("Unknown persona"),
        "Should mention the persona, got: {}",
        stderr
    );
}

#[test]
fn test_ask_off_topic_question_is_refused() {
    let (_tmp, config_path) = setup_test_env();

    run_guidely(&config_path, &["init"]);
    // The relevance gate fires before any provider call, so a placeholder
    // key is enough and no network access happens.
    let (stdout, stderr, success) = run_guidely_env(
        &config_path,
        &["ask", "What's the weather today?"],
        &[("OPENAI_API_KEY", "test-key")],
    );
    assert!(success, "ask failed: stdout={}, stderr={}", stdout, stderr);
    assert!(
        stdout.contains("I'm here to help with questions about the Tiger Exhibition"),
        "Expected the refusal line, got: {}",
        stdout
    );
    assert!(!stdout.contains("Sources:"));
}

#[test]
fn test_ask_apologizes_when_provider_unavailable() {
    let (_tmp, config_path) = setup_test_env();

    run_guidely(&config_path, &["init"]);
    // On-topic question passes the gate, then query embedding fails against
    // the disabled provider. That is a spoken apology, not a CLI error.
    let (stdout, stderr, success) = run_guidely_env(
        &config_path,
        &["ask", "호랑이 그림에 대해 알려줘"],
        &[("OPENAI_API_KEY", "test-key")],
    );
    assert!(success, "ask failed: stdout={}, stderr={}", stdout, stderr);
    assert!(
        stdout.contains("having trouble accessing"),
        "Expected the apology line, got: {}",
        stdout
    );
    assert!(!stdout.contains("Sources:"));
}
