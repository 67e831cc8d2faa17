mod common;

use std::fs;

use common::{copy_fixture, fixture, natbind_cmd, read};
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

#[test]
fn smoke_help_and_version_commands() {
    natbind_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("USAGE:").and(contains("generate")));

    natbind_cmd()
        .args(["help", "check"])
        .assert()
        .success()
        .stdout(contains("natbind check - "));

    natbind_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains("natbind ").and(contains("commit:")));
}

#[test]
fn unknown_commands_fail_with_usage() {
    natbind_cmd()
        .arg("bind")
        .assert()
        .failure()
        .stderr(contains("error: unknown command 'bind'").and(contains("USAGE:")));
}

#[test]
fn generate_from_a_discovered_manifest_then_skip_unchanged_files() {
    let project = copy_fixture("openvr");
    natbind_cmd()
        .current_dir(project.path())
        .arg("generate")
        .assert()
        .success()
        .stdout(contains(
            "2 interface(s): 2 generated, 0 failed, 2 written, 0 unchanged",
        ));

    let generated = project.path().join("generated");
    let compositor = read(&generated.join("vr_compositor.rs"));
    assert!(compositor.contains("pub struct TrackedDevicePose_t {"));
    assert!(compositor.contains("#[link(name = \"openvr_api\")]"));
    let system = read(&generated.join("vr_system.rs"));
    assert!(system.contains("use super::vr_compositor::TrackedDevicePose_t;"));
    assert!(system.contains("pub const k_unMaxDevices: u32 = 64;"));

    natbind_cmd()
        .current_dir(project.path())
        .arg("generate")
        .assert()
        .success()
        .stdout(contains("0 written, 2 unchanged"));
}

#[test]
fn flags_override_the_manifest_language_and_output() {
    let project = copy_fixture("openvr");
    natbind_cmd()
        .current_dir(project.path())
        .args(["generate", "--lang", "c", "-o", "include", "-j", "2"])
        .assert()
        .success();
    let header = read(&project.path().join("include/VRSystem.h"));
    assert!(header.contains("#include \"VRCompositor.h\""));
    assert!(!project.path().join("generated").exists());
}

#[test]
fn check_reports_failures_and_exits_non_zero() {
    let project = copy_fixture("openvr");
    fs::write(
        project.path().join("descriptors/Broken.yaml"),
        "name: Broken\nconstants:\n  - { name: B, ref: k_missing }\n",
    )
    .unwrap();

    natbind_cmd()
        .current_dir(project.path())
        .args(["check", "--error-format", "short"])
        .assert()
        .failure()
        .stdout(contains("3 interface(s): 2 generated, 1 failed"))
        .stderr(
            contains("Broken: error[NB0004]")
                .and(contains("error: generation failed for 1 of 3 interface(s)")),
        );
    assert!(!project.path().join("generated").exists());
}

#[test]
fn json_errors_are_machine_readable() {
    let project = copy_fixture("openvr");
    let broken = project.path().join("broken.yaml");
    fs::write(&broken, "name: Broken\nlibrary: broken\nfunctions:\n  - { name: F, returns: NoSuchType }\n").unwrap();

    let output = natbind_cmd()
        .args(["check", "--no-manifest", "--error-format", "json"])
        .arg(&broken)
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let value: serde_json::Value = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(value["kind"], "UnknownType");
    assert_eq!(value["interface"], "Broken");
}

#[test]
fn json_logs_go_to_stderr() {
    natbind_cmd()
        .args(["check", "--no-manifest", "--log-format", "json", "--log-level", "info"])
        .arg(fixture("egl/EGL_KHR_fence_sync.yaml"))
        .assert()
        .success()
        .stdout(contains("1 interface(s): 1 generated, 0 failed"))
        .stderr(contains("\"stage\":\"run.start\"").and(contains("\"stage\":\"cli.run.footer\"")));
}

#[test]
fn invalid_manifests_are_reported_with_their_path() {
    let project = tempfile::tempdir().unwrap();
    fs::write(project.path().join("natbind.yaml"), "inputs: []\nlangauge: c\n").unwrap();
    natbind_cmd()
        .current_dir(project.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(contains("manifest error in").and(contains("unknown field `langauge`")));
}
