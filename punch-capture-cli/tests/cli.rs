use assert_cmd::Command;
use image::{ImageFormat, Rgb, RgbImage};
use predicates::prelude::*;
use std::fs::write;
use tempfile::{tempdir, NamedTempFile};

/// Minimal config; the store and API are never reached in dry-run mode.
fn create_minimal_config() -> NamedTempFile {
    let config = NamedTempFile::new().expect("Creating temp config file failed");
    write(
        config.path(),
        b"api:\n  base_url: \"http://127.0.0.1:9\"\nstore:\n  endpoint: \"http://127.0.0.1:9/storage/v1\"\n  public_base: \"https://cdn.example.com\"\n  bucket: punch-images\n",
    )
    .expect("Writing temp config failed");
    config
}

#[test]
fn help_lists_every_subcommand() {
    Command::cargo_bin("punch-capture")
        .expect("Binary exists")
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("upload")
                .and(predicate::str::contains("submit"))
                .and(predicate::str::contains("show"))
                .and(predicate::str::contains("--dry-run")),
        );
}

#[test]
fn missing_config_file_fails_with_clear_error() {
    Command::cargo_bin("punch-capture")
        .expect("Binary exists")
        .args(["--config", "/definitely/not/here.yaml", "show", "--id", "abc"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read config file"));
}

#[test]
fn dry_run_upload_prints_public_url() {
    let config = create_minimal_config();
    let dir = tempdir().unwrap();
    let image = dir.path().join("door-frame.png");
    RgbImage::from_pixel(16, 16, Rgb([10, 120, 200]))
        .save_with_format(&image, ImageFormat::Png)
        .unwrap();

    Command::cargo_bin("punch-capture")
        .expect("Binary exists")
        .arg("--config")
        .arg(config.path())
        .arg("--dry-run")
        .arg("upload")
        .arg("--image")
        .arg(&image)
        .assert()
        .success()
        .stdout(
            predicate::str::is_match(r"^https://cdn\.example\.com/punch-images/punch_\d+\.jpg\n$")
                .unwrap(),
        );
}

#[test]
fn dry_run_submit_validates_before_anything_else() {
    let config = create_minimal_config();

    Command::cargo_bin("punch-capture")
        .expect("Binary exists")
        .arg("--config")
        .arg(config.path())
        .arg("--dry-run")
        .args(["submit", "--title", "Loose handrail"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Please fill in required fields: description, category, system, project",
        ));
}

#[test]
fn dry_run_submit_prints_payload_with_image_url() {
    let config = create_minimal_config();
    let dir = tempdir().unwrap();
    let image = dir.path().join("stair.png");
    RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]))
        .save_with_format(&image, ImageFormat::Png)
        .unwrap();

    Command::cargo_bin("punch-capture")
        .expect("Binary exists")
        .arg("--config")
        .arg(config.path())
        .arg("--dry-run")
        .arg("submit")
        .arg("--image")
        .arg(&image)
        .args([
            "--title",
            "Loose handrail",
            "--description",
            "Stair 2, level 3",
            "--category",
            "A",
            "--system-id",
            "architectural",
            "--project-id",
            "p-42",
        ])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("\"image_url\": \"https://cdn.example.com/punch-images/punch_")
                .and(predicate::str::contains("\"status\": \"OPEN\"")),
        );
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[tokio::test]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use punch_capture_cli::cli::{run, Cli, Commands};

    let cli = Cli {
        config: std::path::PathBuf::from("dummy.yaml"),
        dry_run: false,
        command: Commands::Show {
            id: "abc".to_string(),
        },
    };

    let result = run(cli).await;
    assert!(result.is_err(), "dummy config must not load");

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
    assert!(
        event_msgs.iter().any(|msg| msg.contains("exit")),
        "Expected an 'exit' trace event, got: {:?}",
        event_msgs
    );
}
