//! PDF handling at the ingestion boundary.
//!
//! A PDF with no text layer (a scan, an image-only export) must be rejected
//! rather than stored as an empty document, and one broken file must not
//! abort a directory walk.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use guidely::extract;

fn guidely_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.push("guidely");
    path
}

/// Structurally valid single-page PDF whose content stream draws no text.
/// Builds body then xref with correct byte offsets so the parser accepts it.
fn text_free_pdf() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");
    let o1 = out.len();
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    let o2 = out.len();
    out.extend_from_slice(b"2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj\n");
    let o3 = out.len();
    out.extend_from_slice(b"3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R /Resources << >> >> endobj\n");
    let o4 = out.len();
    let stream = b"BT ET\n";
    out.extend_from_slice(format!("4 0 obj << /Length {} >> stream\n", stream.len()).as_bytes());
    out.extend_from_slice(stream);
    out.extend_from_slice(b"endstream endobj\n");
    let xref_start = out.len();
    out.extend_from_slice(b"xref\n0 5\n");
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in [o1, o2, o3, o4] {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(b"trailer << /Size 5 /Root 1 0 R >>\nstartxref\n");
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_content = format!(
        r#"[db]
path = "{}/guidely.db"

[embedding]
provider = "disabled"
"#,
        root.display()
    );
    let config_path = root.join("guidely.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_guidely(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = guidely_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run guidely: {}", e));
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[test]
fn test_text_free_pdf_is_rejected() {
    // Parseable file, nothing to extract: rejected either as empty or as a
    // parse-level failure, never stored
    let result = extract::extract_pdf(&text_free_pdf());
    assert!(result.is_err(), "text-free PDF must not extract");
}

#[test]
fn test_ingest_file_text_free_pdf_errors() {
    let (tmp, config_path) = setup_test_env();
    run_guidely(&config_path, &["init"]);

    let pdf_path = tmp.path().join("scan.pdf");
    fs::write(&pdf_path, text_free_pdf()).unwrap();

    let (_, stderr, success) = run_guidely(
        &config_path,
        &["ingest", "file", pdf_path.to_str().unwrap()],
    );
    assert!(!success, "ingesting a text-free PDF should fail");
    assert!(
        stderr.contains("extract"),
        "Should report the extraction failure, got: {}",
        stderr
    );
}

#[test]
fn test_directory_walk_skips_broken_pdf() {
    let (tmp, config_path) = setup_test_env();
    run_guidely(&config_path, &["init"]);

    let docs_dir = tmp.path().join("docs");
    fs::create_dir_all(&docs_dir).unwrap();
    fs::write(docs_dir.join("bad.pdf"), b"not a valid pdf").unwrap();
    fs::write(
        docs_dir.join("hojakdo.md"),
        "호작도는 까치와 호랑이를 함께 그린 민화다.",
    )
    .unwrap();

    let (stdout, stderr, success) =
        run_guidely(&config_path, &["ingest", "dir", docs_dir.to_str().unwrap()]);
    assert!(
        success,
        "walk must continue past the broken file: stdout={}, stderr={}",
        stdout, stderr
    );
    assert!(
        stdout.contains("Ingested 1 document(s)."),
        "only the markdown file should land, got: {}",
        stdout
    );
}
