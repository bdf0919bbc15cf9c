// tests/update_flow.rs

//! Integration tests for the application update flow.
//!
//! These tests drive [`AppUpdater`] end to end against a real temporary
//! filesystem, with artifact bytes served from a directory source. They
//! verify that:
//! 1. Asset content is swapped in place and the displaced copy is
//!    removed (or kept when configured).
//! 2. A failure mid-swap restores the previous content.
//! 3. Cron configuration is committed only when the run has no hard
//!    errors, and an invalid cron document stops the run up front.
//! 4. Running the same update twice is harmless.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

#[cfg(unix)]
use steward::Command;
use steward::{
    AppUpdater, Application, Asset, Config, DataSource, DirData, JoinErrors, OrderEntry,
    Severity, JOBS_KEY,
};
use tempfile::TempDir;

/// A workspace with an artifact directory, an install directory and a
/// config whose scratch and cron paths stay inside the tempdir.
fn setup() -> (TempDir, Config, PathBuf, PathBuf) {
    let root = tempfile::tempdir().unwrap();
    let artifacts = root.path().join("artifacts");
    let install = root.path().join("install");
    fs::create_dir_all(&artifacts).unwrap();
    fs::create_dir_all(&install).unwrap();

    let cron_dir = root.path().join("cron.d");
    fs::create_dir_all(&cron_dir).unwrap();
    let config = Config {
        base_path: root.path().join("scratch"),
        cron_dir,
        ..Config::default()
    };

    (root, config, artifacts, install)
}

fn asset(name: &str, target: &Path) -> Asset {
    Asset {
        name: name.to_string(),
        target_path: target.to_path_buf(),
        ..Asset::default()
    }
}

fn entry(name: &str) -> OrderEntry {
    OrderEntry {
        asset: name.to_string(),
        independent: false,
    }
}

fn app_with(assets: Vec<Asset>, order: Vec<OrderEntry>) -> Application {
    Application {
        name: "demo".to_string(),
        assets,
        order,
        ..Application::default()
    }
}

fn run_update(config: &Config, app: &Application, artifacts: &Path) -> JoinErrors {
    AppUpdater::new(config, app)
        .with_data(DirData::new(artifacts))
        .run()
}

fn backup_of(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_owned();
    name.push(".old");
    PathBuf::from(name)
}

#[cfg(unix)]
fn failing_command() -> Command {
    Command {
        command: "false".to_string(),
        ..Command::default()
    }
}

#[test]
fn test_update_replaces_target_and_removes_backup() {
    let (_root, config, artifacts, install) = setup();
    let target = install.join("app.bin");
    fs::write(&target, b"version one").unwrap();
    fs::write(artifacts.join("app-bin"), b"version two").unwrap();

    let app = app_with(vec![asset("app-bin", &target)], vec![entry("app-bin")]);
    let errs = run_update(&config, &app, &artifacts);

    assert!(errs.is_empty(), "unexpected faults: {}", errs);
    assert_eq!(fs::read(&target).unwrap(), b"version two");
    assert!(!backup_of(&target).exists());
}

#[test]
fn test_missing_artifact_is_a_warning() {
    let (_root, config, artifacts, install) = setup();
    let target = install.join("app.bin");
    fs::write(&target, b"version one").unwrap();
    // The artifact directory has nothing under the asset name

    let app = app_with(vec![asset("app-bin", &target)], vec![entry("app-bin")]);
    let errs = run_update(&config, &app, &artifacts);

    assert_eq!(errs.len(), 1);
    assert!(!errs.level_is_error());
    let fault = errs.iter().next().unwrap();
    assert_eq!(fault.severity(), Severity::Warning);
    assert!(fault.message().contains("no match for asset `app-bin`"));

    // The target was never touched
    assert_eq!(fs::read(&target).unwrap(), b"version one");
    assert!(!backup_of(&target).exists());
}

/// A source whose stream breaks partway through, as a dropped network
/// connection would.
struct FlakyData;

struct BrokenReader;

impl Read for BrokenReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::ConnectionAborted, "stream cut"))
    }
}

impl DataSource for FlakyData {
    fn get(&self, name: &str) -> Option<Box<dyn Read>> {
        if name == JOBS_KEY {
            return None;
        }
        let head: &[u8] = b"partial conte";
        Some(Box::new(head.chain(BrokenReader)))
    }
}

#[test]
fn test_interrupted_copy_restores_previous_content() {
    let (_root, config, _artifacts, install) = setup();
    let target = install.join("app.bin");
    fs::write(&target, b"version one").unwrap();

    let app = app_with(vec![asset("app-bin", &target)], vec![entry("app-bin")]);
    let errs = AppUpdater::new(&config, &app).with_data(FlakyData).run();

    assert!(errs.level_is_error());
    assert!(errs.iter().any(|f| f.message().contains("writing")));

    // The swap was rolled back: previous bytes are live again and the
    // set-aside copy is gone
    assert_eq!(fs::read(&target).unwrap(), b"version one");
    assert!(!backup_of(&target).exists());
}

#[test]
fn test_keep_old_retains_backup() {
    let (_root, config, artifacts, install) = setup();
    let target = install.join("config.toml");
    fs::write(&target, b"old settings").unwrap();
    fs::write(artifacts.join("app-config"), b"new settings").unwrap();

    let mut keeper = asset("app-config", &target);
    keeper.keep_old = true;
    let app = app_with(vec![keeper], vec![entry("app-config")]);
    let errs = run_update(&config, &app, &artifacts);

    assert!(errs.is_empty(), "unexpected faults: {}", errs);
    assert_eq!(fs::read(&target).unwrap(), b"new settings");
    assert_eq!(fs::read(backup_of(&target)).unwrap(), b"old settings");
}

#[test]
fn test_zip_asset_unpacks_next_to_target() {
    let (_root, config, artifacts, install) = setup();
    let target = install.join("bundle");

    let archive = fs::File::create(artifacts.join("app-bundle")).unwrap();
    let mut writer = zip::ZipWriter::new(archive);
    let options = zip::write::SimpleFileOptions::default();
    writer.start_file("inner.txt", options).unwrap();
    writer.write_all(b"unpacked content").unwrap();
    writer.finish().unwrap();

    let mut bundled = asset("app-bundle", &target);
    bundled.unzip = true;
    let app = app_with(vec![bundled], vec![entry("app-bundle")]);
    let errs = run_update(&config, &app, &artifacts);

    assert!(errs.is_empty(), "unexpected faults: {}", errs);
    assert_eq!(fs::read(install.join("inner.txt")).unwrap(), b"unpacked content");
    // The archive itself stays at the target path
    assert!(target.exists());
    assert!(!backup_of(&target).exists());
}

#[test]
fn test_corrupt_archive_rolls_back() {
    let (_root, config, artifacts, install) = setup();
    let target = install.join("bundle");
    fs::write(&target, b"previous bundle").unwrap();
    fs::write(artifacts.join("app-bundle"), b"definitely not an archive").unwrap();

    let mut bundled = asset("app-bundle", &target);
    bundled.unzip = true;
    let app = app_with(vec![bundled], vec![entry("app-bundle")]);
    let errs = run_update(&config, &app, &artifacts);

    assert!(errs.level_is_error());
    assert!(errs.iter().any(|f| f.message().contains("decompressing")));
    assert_eq!(fs::read(&target).unwrap(), b"previous bundle");
    assert!(!backup_of(&target).exists());
}

#[test]
fn test_warnings_do_not_block_cron_commit() {
    let (_root, config, artifacts, install) = setup();
    let target = install.join("app.bin");
    // No artifact for the asset, so the run ends with a warning
    fs::write(
        artifacts.join(JOBS_KEY),
        br#"[{"name": "prune-logs", "command": "find /var/log/demo -mtime +7 -delete", "time": "0 3 * * *"}]"#,
    )
    .unwrap();

    let app = app_with(vec![asset("app-bin", &target)], vec![entry("app-bin")]);
    let errs = run_update(&config, &app, &artifacts);

    assert!(!errs.level_is_error());
    let written = fs::read_to_string(config.cron_dir.join("demo")).unwrap();
    assert_eq!(
        written,
        "# prune-logs\n0 3 * * * root find /var/log/demo -mtime +7 -delete\n"
    );
}

#[cfg(unix)]
#[test]
fn test_hard_error_blocks_cron_commit() {
    let (_root, config, artifacts, install) = setup();
    let target = install.join("app.bin");
    fs::write(&target, b"version one").unwrap();
    fs::write(artifacts.join("app-bin"), b"version two").unwrap();
    fs::write(
        artifacts.join(JOBS_KEY),
        br#"{"name": "tick", "command": "echo tick", "time": "* * * * *"}"#,
    )
    .unwrap();

    let mut failing = asset("app-bin", &target);
    failing.post_command = Some(failing_command());
    let app = app_with(vec![failing], vec![entry("app-bin")]);
    let errs = run_update(&config, &app, &artifacts);

    assert!(errs.level_is_error());
    // The new content went live before the post-command, and the
    // displaced copy is left behind for inspection
    assert_eq!(fs::read(&target).unwrap(), b"version two");
    assert_eq!(fs::read(backup_of(&target)).unwrap(), b"version one");
    // But the cron configuration was not committed
    assert!(!config.cron_dir.join("demo").exists());
}

#[test]
fn test_invalid_cron_document_stops_the_run() {
    let (_root, config, artifacts, install) = setup();
    let target = install.join("app.bin");
    fs::write(&target, b"version one").unwrap();
    fs::write(artifacts.join("app-bin"), b"version two").unwrap();
    fs::write(
        artifacts.join(JOBS_KEY),
        br#"{"name": "tick", "command": "echo tick", "time": "often"}"#,
    )
    .unwrap();

    let app = app_with(vec![asset("app-bin", &target)], vec![entry("app-bin")]);
    let errs = run_update(&config, &app, &artifacts);

    assert_eq!(errs.len(), 1);
    assert!(errs.level_is_error());
    assert!(errs.iter().next().unwrap().message().contains("not a valid cronjob expr"));

    // Nothing was touched: no swap, no cron file
    assert_eq!(fs::read(&target).unwrap(), b"version one");
    assert!(!backup_of(&target).exists());
    assert!(!config.cron_dir.join("demo").exists());
}

#[test]
fn test_double_run_is_idempotent() {
    let (_root, config, artifacts, install) = setup();
    let target = install.join("app.bin");
    fs::write(&target, b"version one").unwrap();
    fs::write(artifacts.join("app-bin"), b"version two").unwrap();

    let app = app_with(vec![asset("app-bin", &target)], vec![entry("app-bin")]);

    let first = run_update(&config, &app, &artifacts);
    assert!(first.is_empty(), "unexpected faults: {}", first);
    let second = run_update(&config, &app, &artifacts);
    assert!(second.is_empty(), "unexpected faults: {}", second);

    assert_eq!(fs::read(&target).unwrap(), b"version two");
    assert!(!backup_of(&target).exists());
}

#[test]
fn test_order_mixes_concurrent_and_sequential_entries() {
    let (_root, config, artifacts, install) = setup();
    let targets: Vec<PathBuf> = ["a.bin", "b.bin", "c.bin"]
        .iter()
        .map(|name| install.join(name))
        .collect();
    for i in 0..targets.len() {
        fs::write(artifacts.join(format!("asset-{}", i)), format!("content {}", i)).unwrap();
    }

    let assets: Vec<Asset> = targets
        .iter()
        .enumerate()
        .map(|(i, target)| asset(&format!("asset-{}", i), target))
        .collect();
    let order = vec![
        OrderEntry {
            asset: "asset-0".to_string(),
            independent: true,
        },
        OrderEntry {
            asset: "asset-1".to_string(),
            independent: true,
        },
        entry("asset-2"),
    ];
    let app = app_with(assets, order);
    let errs = run_update(&config, &app, &artifacts);

    assert!(errs.is_empty(), "unexpected faults: {}", errs);
    for (i, target) in targets.iter().enumerate() {
        assert_eq!(fs::read(target).unwrap(), format!("content {}", i).into_bytes());
    }
}

#[cfg(unix)]
#[test]
fn test_failed_pre_action_still_updates_assets() {
    let (_root, config, artifacts, install) = setup();
    let target = install.join("app.bin");
    fs::write(&target, b"version one").unwrap();
    fs::write(artifacts.join("app-bin"), b"version two").unwrap();

    let mut app = app_with(vec![asset("app-bin", &target)], vec![entry("app-bin")]);
    app.pre_action = Some(failing_command());
    let errs = run_update(&config, &app, &artifacts);

    assert!(errs.level_is_error());
    assert!(errs.iter().any(|f| f.message().contains("pre-action failed")));
    // The failure is recorded but the assets still went through
    assert_eq!(fs::read(&target).unwrap(), b"version two");
}

#[cfg(unix)]
#[test]
fn test_failed_asset_pre_command_skips_swap() {
    let (_root, config, artifacts, install) = setup();
    let target = install.join("app.bin");
    fs::write(&target, b"version one").unwrap();
    fs::write(artifacts.join("app-bin"), b"version two").unwrap();

    let mut guarded = asset("app-bin", &target);
    guarded.pre_command = Some(failing_command());
    let app = app_with(vec![guarded], vec![entry("app-bin")]);
    let errs = run_update(&config, &app, &artifacts);

    assert!(errs.level_is_error());
    assert!(errs.iter().any(|f| f.message().contains("pre-command failed")));
    assert_eq!(fs::read(&target).unwrap(), b"version one");
    assert!(!backup_of(&target).exists());
}

#[test]
fn test_dry_run_leaves_filesystem_alone() {
    let (_root, config, artifacts, install) = setup();
    let target = install.join("app.bin");
    fs::write(&target, b"version one").unwrap();
    fs::write(artifacts.join("app-bin"), b"version two").unwrap();
    fs::write(
        artifacts.join(JOBS_KEY),
        br#"{"name": "tick", "command": "echo tick", "time": "* * * * *"}"#,
    )
    .unwrap();

    let app = app_with(vec![asset("app-bin", &target)], vec![entry("app-bin")]);
    let errs = AppUpdater::new(&config, &app)
        .with_data(DirData::new(&artifacts))
        .with_dry_run(true)
        .run();

    assert!(errs.is_empty(), "unexpected faults: {}", errs);
    assert_eq!(fs::read(&target).unwrap(), b"version one");
    assert!(!backup_of(&target).exists());
    assert!(!config.cron_dir.join("demo").exists());
}
