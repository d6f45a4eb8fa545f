use assert_cmd::Command;
use httpmock::MockServer;
use predicates::str::contains;
use tempfile::TempDir;

fn workspace(source: &str) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    std::fs::write(dir.path().join("doc.tex"), source).expect("write source");
    dir
}

fn texflag(dir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("texflag"));
    cmd.current_dir(dir.path())
        .env_remove("TEXFLAG_CONFIG_FILE")
        .env_remove("TEXFLAG__SERVICE__ENDPOINT")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn render_writes_the_image() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("POST").path("/render").body("\\( a \\)");
        then.status(200)
            .header("content-type", "image/png")
            .body(b"\x89PNG");
    });

    let dir = workspace("\\( a \\)");
    texflag(&dir)
        .args(["render", "--endpoint", &server.base_url(), "--output", "out.png", "doc.tex"])
        .assert()
        .success()
        .stdout(contains("rendered out.png (4 bytes)"));

    assert_eq!(
        std::fs::read(dir.path().join("out.png")).expect("output"),
        b"\x89PNG"
    );
    mock.assert();
}

#[test]
fn render_failure_reports_the_diagnostic() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method("POST").path("/render");
        then.status(400)
            .body("This is pdfTeX\n*!Undefined control sequence.\nl.3 \\foo\n!  ==> Fatal error");
    });

    let dir = workspace("\\foo");
    texflag(&dir)
        .args(["render", "--endpoint", &server.base_url(), "--output", "out.png", "doc.tex"])
        .assert()
        .failure()
        .stderr(contains("Undefined control sequence."));

    assert!(!dir.path().join("out.png").exists());
}

#[test]
fn link_prints_the_shareable_url() {
    let dir = workspace("a b");
    texflag(&dir)
        .args(["link", "--endpoint", "https://texflag.example/", "doc.tex"])
        .assert()
        .success()
        .stdout(contains("https://texflag.example/render/a%20b"));
}

#[test]
fn link_for_an_oversized_document_fails() {
    let dir = workspace(&"x".repeat(3000));
    texflag(&dir)
        .args(["link", "--endpoint", "https://texflag.example/", "doc.tex"])
        .assert()
        .failure()
        .stderr(contains("over the limit of 2000"));
}

#[test]
fn invalid_endpoint_fails_fast() {
    let dir = workspace("a");
    texflag(&dir)
        .args(["link", "--endpoint", "ftp://texflag.example/", "doc.tex"])
        .assert()
        .failure()
        .stderr(contains("service.endpoint"));
}
