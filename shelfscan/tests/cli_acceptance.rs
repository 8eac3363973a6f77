use chrono::NaiveDate;
use shelfscan_core::{DetectionStore, NewDetection, NewModelMetrics};
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

struct CliTestEnv {
    _temp_dir: TempDir,
    home: PathBuf,
    xdg_data: PathBuf,
    xdg_config: PathBuf,
    xdg_state: PathBuf,
}

impl CliTestEnv {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let base = temp_dir.path().to_path_buf();
        let home = base.join("home");
        let xdg_data = base.join("xdg-data");
        let xdg_config = base.join("xdg-config");
        let xdg_state = base.join("xdg-state");

        fs::create_dir_all(&home).expect("failed to create HOME");
        fs::create_dir_all(&xdg_data).expect("failed to create XDG_DATA_HOME");
        fs::create_dir_all(&xdg_config).expect("failed to create XDG_CONFIG_HOME");
        fs::create_dir_all(&xdg_state).expect("failed to create XDG_STATE_HOME");

        Self {
            _temp_dir: temp_dir,
            home,
            xdg_data,
            xdg_config,
            xdg_state,
        }
    }

    fn db_path(&self) -> PathBuf {
        self.xdg_data.join("shelfscan/detections.db")
    }

    /// Seed the default-location store the way the pipeline would
    fn seed(&self) -> DetectionStore {
        let store = DetectionStore::open(self.db_path()).expect("failed to open seed store");
        let date = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();

        for (category, product) in [("bakery", "sku-1"), ("bakery", "sku-2"), ("dairy", "sku-3")] {
            store
                .add_detection(&NewDetection {
                    product_id: Some(product.to_string()),
                    product_category: Some(category.to_string()),
                    location_branch: Some("leeds".to_string()),
                    date: Some(date),
                    ..NewDetection::new("video-1")
                })
                .expect("failed to seed detection");
        }

        store
            .add_video("video-1", "leeds", "staff-7", 900)
            .expect("failed to seed video");
        store
            .add_video("video-2", "york", "staff-8", 450)
            .expect("failed to seed video");

        store
            .add_model_metrics(&NewModelMetrics {
                model_version: "2024.05".to_string(),
                accuracy: 0.875,
                precision_recall: serde_json::json!({"precision": 0.9}),
                feature_importance: [("hour_of_day".to_string(), 0.6)].into_iter().collect(),
            })
            .expect("failed to seed metrics");

        store
    }

    fn run(&self, args: &[&str]) -> Output {
        let bin_path = PathBuf::from(assert_cmd::cargo::cargo_bin!("shelfscan"));

        Command::new(bin_path)
            .args(args)
            .env("HOME", &self.home)
            .env("XDG_DATA_HOME", &self.xdg_data)
            .env("XDG_CONFIG_HOME", &self.xdg_config)
            .env("XDG_STATE_HOME", &self.xdg_state)
            .env_remove("RUST_LOG")
            .output()
            .unwrap_or_else(|e| panic!("failed to execute shelfscan: {e}"))
    }
}

fn assert_success(args: &[&str], output: &Output) {
    assert!(
        output.status.success(),
        "shelfscan {:?} failed\nstdout:\n{}\nstderr:\n{}",
        args,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn run_ok(env: &CliTestEnv, args: &[&str]) -> String {
    let output = env.run(args);
    assert_success(args, &output);
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn run_json(env: &CliTestEnv, args: &[&str]) -> serde_json::Value {
    let stdout = run_ok(env, args);
    serde_json::from_str(&stdout)
        .unwrap_or_else(|e| panic!("invalid JSON from {:?}: {e}\n{stdout}", args))
}

#[test]
fn init_creates_database_at_default_path() {
    let env = CliTestEnv::new();

    let stdout = run_ok(&env, &["init"]);

    assert!(env.db_path().exists());
    assert!(stdout.contains("Initialized detection store"));

    let log_path = env.xdg_state.join("shelfscan/shelfscan.log");
    assert!(stdout.contains(&format!("Logging to {}", log_path.display())));
}

#[test]
fn db_flag_overrides_default_path() {
    let env = CliTestEnv::new();
    let custom = env.home.join("custom/store.db");
    let custom_str = custom.to_string_lossy().to_string();

    run_ok(&env, &["--db", &custom_str, "init"]);

    assert!(custom.exists());
    assert!(!env.db_path().exists());
}

#[test]
fn config_file_sets_database_path() {
    let env = CliTestEnv::new();
    let configured = env.home.join("configured.db");
    let config_dir = env.xdg_config.join("shelfscan");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.toml"),
        format!("[database]\npath = {:?}\n", configured.to_string_lossy()),
    )
    .unwrap();

    run_ok(&env, &["init"]);

    assert!(configured.exists());
}

#[test]
fn stats_json_reports_counts() {
    let env = CliTestEnv::new();
    env.seed();

    let stats = run_json(&env, &["stats", "--format", "json"]);

    assert_eq!(stats["total_detections"], 3);
    assert_eq!(stats["total_videos"], 2);
    assert_eq!(stats["processed_videos"], 0);
    assert_eq!(stats["unique_products"], 3);
    assert_eq!(stats["category_stats"]["bakery"], 2);
    assert_eq!(stats["category_stats"]["dairy"], 1);

    // Categories keep count-descending order in the raw output
    let stdout = run_ok(&env, &["stats", "--format", "json"]);
    let bakery = stdout.find("\"bakery\"").expect("bakery missing");
    let dairy = stdout.find("\"dairy\"").expect("dairy missing");
    assert!(bakery < dairy);
}

#[test]
fn stats_text_lists_categories() {
    let env = CliTestEnv::new();
    env.seed();

    let stdout = run_ok(&env, &["stats"]);

    assert!(stdout.contains("Detections:       3"));
    assert!(stdout.contains("bakery"));
    assert!(stdout.contains("dairy"));
}

#[test]
fn detections_filter_by_category() {
    let env = CliTestEnv::new();
    env.seed();

    let rows = run_json(
        &env,
        &["detections", "--category", "bakery", "--format", "json"],
    );

    let rows = rows.as_array().expect("expected a JSON array");
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r["product_category"] == "bakery"));
}

#[test]
fn training_data_applies_min_samples() {
    let env = CliTestEnv::new();
    env.seed();

    let rows = run_json(
        &env,
        &[
            "training-data",
            "--start",
            "2024-05-01",
            "--end",
            "2024-05-31",
            "--min-samples",
            "1",
            "--format",
            "json",
        ],
    );
    assert_eq!(rows.as_array().unwrap().len(), 3);

    let stdout = run_ok(
        &env,
        &["training-data", "--start", "2024-05-01", "--end", "2024-05-31"],
    );
    assert!(stdout.contains("No groups met the sample threshold."));
}

#[test]
fn training_data_inverted_window_is_empty() {
    let env = CliTestEnv::new();
    env.seed();

    let rows = run_json(
        &env,
        &[
            "training-data",
            "--start",
            "2024-05-31",
            "--end",
            "2024-05-01",
            "--min-samples",
            "1",
            "--format",
            "json",
        ],
    );
    assert!(rows.as_array().unwrap().is_empty());
}

#[test]
fn metrics_with_non_finite_accuracy_still_list() {
    let env = CliTestEnv::new();
    let store = env.seed();
    store
        .add_model_metrics(&NewModelMetrics {
            model_version: "2024.06".to_string(),
            accuracy: f64::NAN,
            precision_recall: serde_json::json!({}),
            feature_importance: [("hour_of_day".to_string(), f64::NAN)].into_iter().collect(),
        })
        .expect("failed to seed metrics");

    let stdout = run_ok(&env, &["metrics"]);
    assert!(stdout.contains("2024.06 trained"));
    assert!(stdout.contains("accuracy=-"));
    assert!(stdout.contains("accuracy=0.8750"));
}

#[test]
fn mark_processed_updates_video_status() {
    let env = CliTestEnv::new();
    env.seed();

    let stdout = run_ok(&env, &["mark-processed", "video-2"]);
    assert!(stdout.contains("Marked video video-2 as processed"));

    let video = run_json(&env, &["video", "video-2", "--format", "json"]);
    assert_eq!(video["processed"], true);

    let pending = run_json(&env, &["videos", "--pending", "--format", "json"]);
    let pending = pending.as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["id"], "video-1");
}

#[test]
fn mark_processed_unknown_video_is_not_an_error() {
    let env = CliTestEnv::new();
    env.seed();

    let stdout = run_ok(&env, &["mark-processed", "ghost"]);
    assert!(stdout.contains("nothing changed"));
}

#[test]
fn video_not_found_exits_with_error() {
    let env = CliTestEnv::new();
    env.seed();

    let output = env.run(&["video", "ghost"]);

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("No video found"));
}

#[test]
fn metrics_lists_recorded_runs() {
    let env = CliTestEnv::new();
    env.seed();

    let stdout = run_ok(&env, &["metrics"]);
    assert!(stdout.contains("2024.05"));
    assert!(stdout.contains("hour_of_day"));

    let metrics = run_json(
        &env,
        &["metrics", "--model-version", "other", "--format", "json"],
    );
    assert!(metrics.as_array().unwrap().is_empty());
}
