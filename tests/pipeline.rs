use std::{fs, path::Path};

use filetime::{set_file_mtime, FileTime};
use pretty_assertions::assert_eq;
use serde_json::Value;
use test_log::test;
use ui_log_analyzer::{run, AggMode, Config, ConfigError, OutputFormat, RunOutcome};

const TEMPLATE: &str = "<!doctype html>\n<html>\n<body>\n<script>\nvar table = $table_json;\n</script>\n</body>\n</html>\n";

fn line(url: &str, time: f64) -> String {
    format!(
        r#"1.196.116.32 -  - [29/Jun/2017:03:50:22 +0300] "GET {} HTTP/1.1" 200 927 "-" "Lynx/2.8.8dev.9 libwww-FM/2.14" "-" "1498697422-2190034393-4708-9752759" "dc7161be3" {:.3}"#,
        url, time
    )
}

fn write_log(dir: &Path, name: &str) -> std::path::PathBuf {
    let mut log = String::new();
    for (url, time) in [
        ("/api/v2/banner/1", 0.390),
        ("/api/v2/banner/2", 0.100),
        ("/api/v2/banner/1", 0.210),
        ("/api/v2/slot/4705/groups", 1.500),
        ("/api/v2/banner/2", 0.050),
    ] {
        log.push_str(&line(url, time));
        log.push('\n');
    }
    log.push_str(r#"1.1.1.1 -  - [29/Jun/2017:03:50:22 +0300] "0" 400 166 "-" "-" "-" "-" "-" 0.000"#);
    log.push('\n');
    log.push_str("not a log line\n");
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, log).unwrap();
    path
}

fn setup() -> (tempfile::TempDir, Config) {
    let root = tempfile::tempdir().unwrap();
    let config = Config::with_dirs(root.path().join("log"), root.path().join("reports"));
    write_log(&config.log_dir, "nginx-access-ui.log-20170630");
    (root, config)
}

fn read_json(path: &Path) -> Vec<Value> {
    let value: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    value.as_array().unwrap().clone()
}

#[test]
fn json_report_is_ranked_and_complete() {
    let (_root, mut config) = setup();
    config.format = OutputFormat::Json;

    let outcome = run(&config).unwrap();
    let path = config.report_dir.join("report-2017.06.30.json");
    assert_eq!(outcome, RunOutcome::Written(path.clone()));

    let rows = read_json(&path);
    let urls: Vec<_> = rows.iter().map(|r| r["url"].as_str().unwrap()).collect();
    assert_eq!(
        urls,
        vec![
            "/api/v2/slot/4705/groups",
            "/api/v2/banner/1",
            "/api/v2/banner/2"
        ]
    );
    let counts: u64 = rows.iter().map(|r| r["count"].as_u64().unwrap()).sum();
    assert_eq!(counts, 5);
    assert_eq!(rows[1]["time_sum"].as_f64().unwrap(), 0.6);
    assert_eq!(rows[1]["time_avg"].as_f64().unwrap(), 0.3);
    assert_eq!(rows[0]["time_perc"].as_f64().unwrap(), 66.667);

    let count_perc: f64 = rows.iter().map(|r| r["count_perc"].as_f64().unwrap()).sum();
    let time_perc: f64 = rows.iter().map(|r| r["time_perc"].as_f64().unwrap()).sum();
    assert!((count_perc - 100.0).abs() < 0.01);
    assert!((time_perc - 100.0).abs() < 0.01);
}

#[test]
fn percentages_cover_rows_dropped_by_report_size() {
    let (_root, mut config) = setup();
    config.format = OutputFormat::Json;
    config.report_size = 1;
    config.agg_mode = AggMode::Percentile;

    run(&config).unwrap();
    let rows = read_json(&config.report_dir.join("report-2017.06.30.json"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["count_perc"].as_f64().unwrap(), 20.0);
    assert_eq!(rows[0]["time_p95"].as_f64().unwrap(), 1.5);
    assert!(rows[0].get("time_avg").is_none());
}

#[test]
fn html_report_embeds_rows() {
    let (_root, config) = setup();
    fs::create_dir_all(&config.report_dir).unwrap();
    fs::write(&config.template_path, TEMPLATE).unwrap();

    let outcome = run(&config).unwrap();
    let path = config.report_dir.join("report-2017.06.30.html");
    assert_eq!(outcome, RunOutcome::Written(path.clone()));

    let html = fs::read_to_string(&path).unwrap();
    assert!(!html.contains("$table_json"));
    assert!(html.starts_with("<!doctype html>\n<html>\n<body>\n<script>\nvar table = [{"));
    assert!(html.ends_with("}];\n</script>\n</body>\n</html>\n"));
    assert!(html.contains(r#""url":"/api/v2/slot/4705/groups""#));
}

#[test]
fn existing_report_is_never_overwritten() {
    let (_root, mut config) = setup();
    config.format = OutputFormat::Json;

    let first = run(&config).unwrap();
    let RunOutcome::Written(path) = first else {
        panic!("first run should write a report");
    };
    let before = fs::read(&path).unwrap();

    // a different log for the same date must not replace the report
    write_log(&config.log_dir, "nginx-access-ui.log-20170630.bak");
    fs::write(
        config.log_dir.join("nginx-access-ui.log-20170630"),
        line("/other", 9.0),
    )
    .unwrap();
    let second = run(&config).unwrap();
    assert_eq!(second, RunOutcome::AlreadyExists(path.clone()));
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn newest_log_is_picked() {
    let (_root, mut config) = setup();
    config.format = OutputFormat::Json;
    let older = write_log(&config.log_dir, "nginx-access-ui.log-20170629");
    set_file_mtime(&older, FileTime::from_unix_time(1_000_000_000, 0)).unwrap();

    let outcome = run(&config).unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Written(config.report_dir.join("report-2017.06.30.json"))
    );
}

#[test]
fn explicit_log_path_wins() {
    let (_root, mut config) = setup();
    config.format = OutputFormat::Json;
    let other_dir = config.log_dir.with_file_name("elsewhere");
    config.log_path = Some(write_log(&other_dir, "nginx-access-ui.log-20170101"));

    let outcome = run(&config).unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Written(config.report_dir.join("report-2017.01.01.json"))
    );
}

#[test]
fn unknown_format_writes_html() {
    let (_root, mut config) = setup();
    config.format = OutputFormat::from_name("xml");
    fs::create_dir_all(&config.report_dir).unwrap();
    fs::write(&config.template_path, TEMPLATE).unwrap();

    let outcome = run(&config).unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Written(config.report_dir.join("report-2017.06.30.html"))
    );
}

#[test]
fn missing_template_aborts() {
    let (_root, config) = setup();
    let err = run(&config).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::TemplateMissing(_))
    ));
    assert!(!config.report_dir.join("report-2017.06.30.html").exists());
}

#[test]
fn empty_log_dir_aborts() {
    let root = tempfile::tempdir().unwrap();
    let config = Config::with_dirs(root.path().join("log"), root.path().join("reports"));
    fs::create_dir_all(&config.log_dir).unwrap();

    let err = run(&config).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::NoLogFile(_))
    ));
    assert!(!config.report_dir.exists());
}

fn gzip(path: &Path) {
    let status = std::process::Command::new("gzip")
        .arg("-f")
        .arg(path)
        .status()
        .unwrap();
    assert!(status.success());
}

#[test]
fn truncated_archive_writes_no_report() {
    let root = tempfile::tempdir().unwrap();
    let mut config = Config::with_dirs(root.path().join("log"), root.path().join("reports"));
    config.format = OutputFormat::Json;
    fs::create_dir_all(&config.log_dir).unwrap();

    let plain = config.log_dir.join("nginx-access-ui.log-20170630");
    let log: String = (0..20_000)
        .map(|i| line(&format!("/api/v2/banner/{}", i % 50), 0.1) + "\n")
        .collect();
    fs::write(&plain, log).unwrap();
    gzip(&plain);
    let archive = config.log_dir.join("nginx-access-ui.log-20170630.gz");
    let compressed = fs::read(&archive).unwrap();
    fs::write(&archive, &compressed[..compressed.len() / 2]).unwrap();

    let report = config.report_dir.join("report-2017.06.30.json");
    assert!(run(&config).is_err());
    assert!(!report.exists());
    // nothing was cached, the next run tries again
    assert!(run(&config).is_err());
}
