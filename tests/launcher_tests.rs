//! End-to-end scenarios driving the commands with the reference backend.

use modrun::commands::{self, Command, Execution, NullEffects};
use modrun::runtimes::StoreContainerFactory;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn execute(command: Command, args: &[String]) -> modrun::Result<()> {
    commands::execute(
        command,
        args,
        &StoreContainerFactory,
        &NullEffects,
        &Execution::new(),
    )
}

fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}

/// Prepares a bundle store with one source holding one bundle, plus the
/// property files, and returns their paths.
fn prepare_fixture(dir: &Path) -> (String, String, String) {
    let source = dir.join("store/testing");
    fs::create_dir_all(&source).unwrap();
    fs::write(source.join("testing-1.0.0.jar"), b"module bytes").unwrap();

    let framework = dir.join("framework.properties");
    fs::write(&framework, "container.startlevel.beginning=100\n").unwrap();

    let launching = dir.join("launching.properties");
    fs::write(&launching, "shutdown.timeout=5s\n").unwrap();

    (
        dir.join("store").display().to_string(),
        framework.display().to_string(),
        launching.display().to_string(),
    )
}

fn installed_units(instance: &Path) -> Vec<String> {
    let registry = fs::read_to_string(instance.join("data/units.properties")).unwrap_or_default();
    registry
        .lines()
        .filter(|line| line.contains(".location="))
        .map(String::from)
        .collect()
}

// =============================================================================
// Deploy Scenarios
// =============================================================================

#[test]
fn test_deploy_then_start_artifacts() {
    let dir = TempDir::new().unwrap();
    let (store, framework, launching) = prepare_fixture(dir.path());
    let instance = dir.path().join("instance");
    let instance_arg = instance.display().to_string();

    execute(
        Command::Deploy,
        &strings(&[
            "--framework-properties",
            &framework,
            "--launching-properties",
            &launching,
            "--bundle-store",
            &store,
            &instance_arg,
        ]),
    )
    .unwrap();

    // The effective properties must be persisted for the start phase
    for name in [
        "framework.properties",
        "launching.properties",
        "system.properties",
    ] {
        assert!(instance.join("etc").join(name).is_file(), "{name} missing");
    }

    let stored = fs::read_to_string(instance.join("etc/launching.properties")).unwrap();
    assert!(stored.contains("shutdown.timeout=5s"));

    // Exactly one non-root bundle must be installed
    assert_eq!(installed_units(&instance).len(), 1);
}

#[test]
fn test_deploy_uses_deployment_properties_of_source() {
    let dir = TempDir::new().unwrap();
    let (store, _, _) = prepare_fixture(dir.path());
    let instance = dir.path().join("instance");
    let instance_arg = instance.display().to_string();

    fs::write(
        dir.path().join("store/testing/deployment.properties"),
        "deployment.action=install\nstart.level=30\n",
    )
    .unwrap();

    execute(
        Command::Deploy,
        &strings(&["--bundle-store", &store, &instance_arg]),
    )
    .unwrap();

    let registry = fs::read_to_string(instance.join("data/units.properties")).unwrap();
    assert!(registry.contains("level=30"));
}

#[test]
fn test_concurrent_deploy_excluded() {
    let dir = TempDir::new().unwrap();
    let instance = dir.path().join("instance");

    // Hold the instance as a running deployment would
    let control = modrun::instance::InstanceControl::open(&instance).unwrap();
    assert!(control.acquired());

    let result = execute(
        Command::Deploy,
        &strings(&[instance.display().to_string().as_str()]),
    );

    match result {
        Err(modrun::Error::InstanceBusy(_)) => {}
        other => panic!("expected a busy instance, got {other:?}"),
    }
}

#[test]
fn test_delete_round_trip() {
    let dir = TempDir::new().unwrap();
    let (store, framework, launching) = prepare_fixture(dir.path());
    let instance = dir.path().join("instance");
    let instance_arg = instance.display().to_string();

    execute(
        Command::Deploy,
        &strings(&[
            "--framework-properties",
            &framework,
            "--launching-properties",
            &launching,
            "--bundle-store",
            &store,
            &instance_arg,
        ]),
    )
    .unwrap();
    assert!(instance.exists());

    execute(Command::Delete, &strings(&[instance_arg.as_str()])).unwrap();
    assert!(!instance.exists(), "delete must restore the pre-deploy state");

    // A second delete reports success for the missing instance
    execute(Command::Delete, &strings(&[instance_arg.as_str()])).unwrap();
}

// =============================================================================
// Start / Stop Scenarios
// =============================================================================

#[test]
fn test_start_and_stop_via_command_link() {
    let dir = TempDir::new().unwrap();
    let (store, framework, launching) = prepare_fixture(dir.path());
    let instance = dir.path().join("instance");
    let instance_arg = instance.display().to_string();

    execute(
        Command::Deploy,
        &strings(&[
            "--framework-properties",
            &framework,
            "--launching-properties",
            &launching,
            "--bundle-store",
            &store,
            &instance_arg,
        ]),
    )
    .unwrap();

    let link_file = instance.join("instance.link");
    let start_args = strings(&["--command-address", "localhost", "0", &instance_arg]);
    let running = std::thread::spawn(move || execute(Command::Start, &start_args));

    // The link file must appear with a resolved port and the secret
    assert!(
        wait_until(|| link_file.is_file()),
        "instance.link did not appear"
    );

    let link = fs::read_to_string(&link_file).unwrap();
    let lines: Vec<&str> = link.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_ne!(lines[1], "0", "the resolved port must be visible");
    assert!(!lines[2].is_empty());

    execute(Command::Stop, &strings(&[instance_arg.as_str()])).unwrap();

    running.join().unwrap().unwrap();
    assert!(!link_file.exists(), "the link file must be deleted");
}

#[test]
fn test_stop_requires_link_or_parameters() {
    let dir = TempDir::new().unwrap();
    let instance = dir.path().join("instance");
    fs::create_dir_all(instance.join("etc")).unwrap();

    let instance_arg = instance.display().to_string();
    let result = execute(Command::Stop, &strings(&[instance_arg.as_str()]));
    assert!(result.is_err(), "no command link is exposed");

    let result = execute(Command::Stop, &strings(&["host", "port", "secret", "extra"]));
    assert!(matches!(result, Err(modrun::Error::Syntax(_))));
}

// =============================================================================
// Launch Scenarios
// =============================================================================

#[test]
fn test_launch_with_skipped_start() {
    let dir = TempDir::new().unwrap();
    let (store, framework, launching) = prepare_fixture(dir.path());
    let instance = dir.path().join("instance");
    let instance_arg = instance.display().to_string();

    execute(
        Command::Launch,
        &strings(&[
            "--skip-start",
            "--framework-properties",
            &framework,
            "--launching-properties",
            &launching,
            "--bundle-store",
            &store,
            &instance_arg,
        ]),
    )
    .unwrap();

    assert_eq!(installed_units(&instance).len(), 1);
}

#[test]
fn test_launch_skip_deploy_skips_sources() {
    let dir = TempDir::new().unwrap();
    let (store, framework, launching) = prepare_fixture(dir.path());
    let instance = dir.path().join("instance");
    let instance_arg = instance.display().to_string();

    execute(
        Command::Launch,
        &strings(&[
            "--skip-deploy",
            "--skip-start",
            "--framework-properties",
            &framework,
            "--launching-properties",
            &launching,
            "--bundle-store",
            &store,
            &instance_arg,
        ]),
    )
    .unwrap();

    assert!(installed_units(&instance).is_empty());
}

#[test]
fn test_cancelled_execution_refuses_to_run() {
    let execution = Execution::new();
    execution.cancel();

    let result = commands::execute(
        Command::Help,
        &[],
        &StoreContainerFactory,
        &NullEffects,
        &execution,
    );

    assert!(matches!(result, Err(modrun::Error::Cancelled)));
}

// =============================================================================
// Configuration Tree Scenarios
// =============================================================================

#[test]
fn test_create_and_update_configuration() {
    let dir = TempDir::new().unwrap();
    let instance = dir.path().join("instance");
    let instance_arg = instance.display().to_string();

    let seed = dir.path().join("seed");
    fs::create_dir_all(&seed).unwrap();
    fs::write(seed.join("seeded.cfg"), "from seed").unwrap();

    let overlay = dir.path().join("overlay");
    fs::create_dir_all(&overlay).unwrap();
    fs::write(overlay.join("overlaid.cfg"), "from overlay").unwrap();

    let seed_arg = seed.display().to_string();
    let overlay_arg = overlay.display().to_string();

    execute(
        Command::Deploy,
        &strings(&[
            "--create-configuration",
            &seed_arg,
            "--update-configuration",
            &overlay_arg,
            &instance_arg,
        ]),
    )
    .unwrap();

    assert!(instance.join("conf/seeded.cfg").is_file());
    assert!(instance.join("conf/overlaid.cfg").is_file());

    // A second deploy must not seed again, but always overlays
    fs::remove_file(instance.join("conf/seeded.cfg")).unwrap();
    fs::write(overlay.join("overlaid.cfg"), "updated").unwrap();

    execute(
        Command::Deploy,
        &strings(&[
            "--create-configuration",
            &seed_arg,
            "--update-configuration",
            &overlay_arg,
            &instance_arg,
        ]),
    )
    .unwrap();

    assert!(!instance.join("conf/seeded.cfg").exists());
    assert_eq!(
        fs::read_to_string(instance.join("conf/overlaid.cfg")).unwrap(),
        "updated"
    );
}
