mod common;

use common::{copy_fixture, fixture, read};
use natbind::driver::{GenerateOptions, Input, Stage, WriteOutcome, generate};
use natbind::emit::TargetLanguage;
use natbind::manifest::{Manifest, expand_inputs};

fn manifest_run(name: &str, jobs: usize) -> (tempfile::TempDir, natbind::driver::Generation) {
    let project = copy_fixture(name);
    let manifest = Manifest::load(&project.path().join("natbind.yaml")).unwrap();
    let inputs: Vec<Input> = expand_inputs(manifest.inputs())
        .unwrap()
        .into_iter()
        .map(Input::File)
        .collect();
    let options = GenerateOptions {
        language: manifest.language().unwrap_or_default(),
        jobs,
        default_library: manifest.default_library().map(str::to_string),
        external_types: manifest.types().to_vec(),
        output: manifest.output().map(std::path::Path::to_path_buf),
        ..GenerateOptions::default()
    };
    let generation = generate(&inputs, &options).unwrap();
    (project, generation)
}

#[test]
fn vulkan_extension_header_uses_manifest_types() {
    let (project, generation) = manifest_run("vulkan", 2);
    assert!(generation.report.succeeded(), "{:?}", generation.report);
    let header = read(&project.path().join("generated/KHR_swapchain.h"));
    for needle in [
        "#ifndef NATBIND_KHR_SWAPCHAIN_H",
        "typedef uint64_t VkSwapchainKHR;",
        "#define VK_STRUCTURE_TYPE_SWAPCHAIN_CREATE_INFO_KHR ((VkStructureType)1000001000)",
        "#define VK_STRUCTURE_TYPE_PRESENT_INFO_KHR ((VkStructureType)1000001001)",
        "#define VK_ERROR_OUT_OF_DATE_KHR ((VkResult)-1000001004)",
        "#define VK_KHR_SWAPCHAIN_SPEC_VERSION 70",
        "#define VK_KHR_SWAPCHAIN_EXTENSION_NAME \"VK_KHR_swapchain\"",
        "vkGetSwapchainImagesKHR(VkDevice device, VkSwapchainKHR swapchain, uint32_t *pSwapchainImageCount);",
    ] {
        assert!(header.contains(needle), "missing {needle:?} in\n{header}");
    }
}

#[test]
fn dynamic_egl_binding_emits_a_function_table() {
    let generation = generate(
        &[Input::File(fixture("egl/EGL_KHR_fence_sync.yaml"))],
        &GenerateOptions::default(),
    )
    .unwrap();
    assert_eq!(generation.report.stage, Stage::Done);
    assert_eq!(generation.report.interfaces[0].write, Some(WriteOutcome::Skipped));
    let text = &generation.units[0].text;
    assert!(text.contains("pub type PFN_eglCreateSyncKHR = unsafe extern \"system\" fn("));
    assert!(text.contains("pub type PFN_eglDestroySyncKHR = unsafe extern \"system\" fn("));
    assert!(text.contains("pub struct EGL_KHR_fence_syncFns {"));
    assert!(text.contains("pub const EGL_SYNC_CONDITION_KHR: u32 = 0x30F8;"));
    assert!(!text.contains("#[link("));
}

#[test]
fn output_does_not_depend_on_worker_count() {
    let (_serial_dir, serial) = manifest_run("openvr", 1);
    let (_parallel_dir, parallel) = manifest_run("openvr", 8);
    assert!(serial.report.succeeded());
    assert_eq!(serial.units, parallel.units);
}

#[test]
fn banner_fingerprint_matches_the_report() {
    let (_project, generation) = manifest_run("openvr", 0);
    for (unit, interface) in generation.units.iter().zip(&generation.report.interfaces) {
        let fingerprint = interface.fingerprint.as_deref().unwrap();
        assert_eq!(fingerprint, unit.fingerprint);
        assert!(unit
            .text
            .lines()
            .take(3)
            .any(|line| line == format!("// fingerprint: blake3:{fingerprint}")));
    }
}

#[test]
fn rust_units_carry_layout_assertions() {
    let generation = generate(
        &[Input::File(fixture("openvr/descriptors/VRCompositor.yaml"))],
        &GenerateOptions {
            language: TargetLanguage::Rust,
            ..GenerateOptions::default()
        },
    )
    .unwrap();
    let text = &generation.units[0].text;
    assert!(text.contains("::core::mem::size_of::<TrackedDevicePose_t>() == 52"));
    assert!(text.contains("pub fn VRCompositor_GetLastPoses("));
    assert!(text.contains("pub const k_unMaxTrackedDeviceCount: u32 = 64;"));
}
