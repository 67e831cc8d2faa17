use super::*;
use crate::diagnostics::{Entity, ErrorKind};

fn load(text: &str) -> Result<InterfaceDescriptor, crate::diagnostics::ErrorSet> {
    load_interface(&DescriptorSource::inline("inline", text), &LoadOptions::default())
}

const VIEWPORT_ARRAY2: &str = r#"
name: NV_viewport_array2
prefix:
  constant: VK_
number: 130
documentation: |
  This extension adds support for the following SPIR-V extension in Vulkan:
  SPV_NV_viewport_array2
constants:
  - name: NV_VIEWPORT_ARRAY2_SPEC_VERSION
    doc: The extension specification version.
    int: 1
  - name: NV_VIEWPORT_ARRAY2_EXTENSION_NAME
    string: VK_NV_viewport_array2
  - name: NV_VIEWPORT_ARRAY_2_SPEC_VERSION
    ref: NV_VIEWPORT_ARRAY2_SPEC_VERSION
"#;

#[test]
fn loads_constant_only_interface_without_library() {
    let descriptor = load(VIEWPORT_ARRAY2).unwrap();
    assert_eq!(descriptor.name, "NV_viewport_array2");
    assert_eq!(descriptor.unit_name(), "NV_viewport_array2");
    assert!(descriptor.library.is_none());
    assert_eq!(descriptor.number, Some(130));
    assert_eq!(descriptor.constants.len(), 3);
    assert_eq!(
        descriptor.constants[0].value,
        ConstantValue::Int(IntLiteral::decimal(1))
    );
    assert_eq!(descriptor.constants[0].kind, Some(ConstantKind::Integer));
    assert_eq!(
        descriptor.constants[2].value,
        ConstantValue::Ref(ConstantRef::local("NV_VIEWPORT_ARRAY2_SPEC_VERSION"))
    );
    assert_eq!(descriptor.constants[2].kind, None);
    assert!(descriptor.documentation.ends_with("SPV_NV_viewport_array2"));
    assert_eq!(
        descriptor.native_constant_name("NV_VIEWPORT_ARRAY2_EXTENSION_NAME"),
        "VK_NV_VIEWPORT_ARRAY2_EXTENSION_NAME"
    );
}

#[test]
fn hex_literals_keep_their_spelling() {
    let descriptor = load(
        r#"
name: EGL_consts
constants:
  - name: DRM_BUFFER_FORMAT_MESA
    int: "0x31D0"
  - name: NEGATIVE
    int: "-0x10"
"#,
    )
    .unwrap();
    let ConstantValue::Int(literal) = descriptor.constants[0].value else {
        panic!("expected integer literal");
    };
    assert_eq!(literal.value, 0x31D0);
    assert_eq!(literal.to_string(), "0x31D0");
    let ConstantValue::Int(literal) = descriptor.constants[1].value else {
        panic!("expected integer literal");
    };
    assert_eq!(literal.value, -16);
    assert_eq!(literal.to_string(), "-0x10");
}

#[test]
fn sixty_four_bit_hex_patterns_load() {
    let descriptor = load(
        r#"
name: Flags64
constants:
  - { name: TOP_BIT, int: "0x8000000000000000" }
  - { name: ALL_BITS, int: "0xFFFFFFFFFFFFFFFF" }
  - { name: SMALL, int: "0x7FFFFFFFFFFFFFFF" }
"#,
    )
    .unwrap();
    let literals: Vec<IntLiteral> = descriptor
        .constants
        .iter()
        .map(|constant| match constant.value {
            ConstantValue::Int(literal) => literal,
            ref other => panic!("expected integer literal, got {other:?}"),
        })
        .collect();
    assert_eq!(literals[0].wide(), 0x8000_0000_0000_0000);
    assert_eq!(literals[0].to_string(), "0x8000000000000000");
    assert_eq!(literals[1].wide(), i128::from(u64::MAX));
    assert_eq!(literals[1].to_string(), "0xFFFFFFFFFFFFFFFF");
    assert!(!literals[2].wrapped);
    assert_eq!(literals[2].value, i64::MAX);

    assert_eq!(IntLiteral::parse("-0x8000000000000000"), None);
    assert_eq!(IntLiteral::parse("0x1_0000_0000_0000_0000"), None);
}

#[test]
fn functions_require_a_library_binding() {
    let text = r#"
name: MESA_drm_image
functions:
  - name: CreateDRMImageMESA
    returns: EGLImageKHR
    params:
      - name: dpy
        type: EGLDisplay
"#;
    let err = load(text).unwrap_err();
    assert_eq!(err.kinds(), vec![ErrorKind::MalformedDescriptor]);
    assert!(err.to_string().contains("no `library` binding"));

    let options = LoadOptions {
        default_library: Some("EGL".into()),
    };
    let descriptor = load_interface(&DescriptorSource::inline("inline", text), &options).unwrap();
    assert_eq!(descriptor.library.as_deref(), Some("EGL"));
}

#[test]
fn parameters_carry_modifiers_and_length_links() {
    let descriptor = load(
        r#"
name: VRCompositor
library: openvr_api
prefix:
  function: VRCompositor_
functions:
  - name: GetLastPoses
    returns: EVRCompositorError
    return_doc: the compositor error
    params:
      - name: pRenderPoseArray
        type: TrackedDevicePose_t *
        modifiers: [out, nullable]
        length: unRenderPoseArrayCount
      - name: unRenderPoseArrayCount
        type: uint32_t
        length_of: pRenderPoseArray
      - name: ppName
        type: const char **
"#,
    )
    .unwrap();
    let function = &descriptor.functions[0];
    assert_eq!(function.return_doc.as_deref(), Some("the compositor error"));
    assert_eq!(
        descriptor.native_function_name(&function.name),
        "VRCompositor_GetLastPoses"
    );

    let poses = function.param("pRenderPoseArray").unwrap();
    assert!(poses.modifiers.contains(
        ParamModifiers::OUTPUT | ParamModifiers::NULLABLE | ParamModifiers::ARRAY
    ));
    assert_eq!(poses.length.as_deref(), Some("unRenderPoseArrayCount"));

    let count = function.param("unRenderPoseArrayCount").unwrap();
    assert!(count.modifiers.contains(ParamModifiers::LENGTH_CARRIER));
    assert_eq!(count.length_of.as_deref(), Some("pRenderPoseArray"));

    let name = function.param("ppName").unwrap();
    assert!(name
        .modifiers
        .contains(ParamModifiers::CONST | ParamModifiers::POINTER_TO_POINTER));
}

#[test]
fn missing_returns_defaults_to_void() {
    let descriptor = load(
        r#"
name: Iface
library: lib
functions:
  - name: Flush
"#,
    )
    .unwrap();
    assert!(descriptor.functions[0].returns.is_void());
    assert!(descriptor.functions[0].params.is_empty());
}

#[test]
fn collects_every_problem_before_failing() {
    let err = load(
        r#"
name: Broken
constants:
  - name: A
    int: 1
  - name: A
    int: 2
  - name: 9LIVES
    int: 3
  - name: NOTHING
  - name: BOTH
    int: 1
    string: "one"
  - name: NUL
    string: "a\0b"
"#,
    )
    .unwrap_err();
    assert_eq!(err.len(), 5);
    assert!(err.iter().all(|error| error.kind == ErrorKind::MalformedDescriptor));
    assert!(err.iter().all(|error| error.interface == "Broken"));
    let entities: Vec<_> = err.iter().map(|error| error.entity.clone()).collect();
    assert!(entities.contains(&Entity::constant("A")));
    assert!(entities.contains(&Entity::constant("9LIVES")));
    assert!(entities.contains(&Entity::constant("NOTHING")));
    assert!(entities.contains(&Entity::constant("BOTH")));
    assert!(entities.contains(&Entity::constant("NUL")));
}

#[test]
fn missing_name_is_attributed_to_the_source_label() {
    let err = load_interface(
        &DescriptorSource::inline("fixtures/nameless.yaml", "constants: []\n"),
        &LoadOptions::default(),
    )
    .unwrap_err();
    let error = err.iter().next().unwrap();
    assert_eq!(error.kind, ErrorKind::MalformedDescriptor);
    assert_eq!(error.interface, "fixtures/nameless.yaml");
    assert_eq!(error.entity, Entity::Interface);
}

#[test]
fn invalid_yaml_and_unknown_keys_are_malformed() {
    assert!(load("name: [unclosed").unwrap_err().contains(ErrorKind::MalformedDescriptor));
    let err = load("name: X\nconstantz: []\n").unwrap_err();
    assert!(err.to_string().contains("invalid descriptor"));
}

#[test]
fn enum_offsets_need_a_registry_number() {
    let text = r#"
name: NV_corner_sampled_image
enums:
  - name: IMAGE_CREATE_CORNER_SAMPLED_BIT_NV
    extends: VkImageCreateFlagBits
    value: "0x00002000"
  - name: STRUCTURE_TYPE_PHYSICAL_DEVICE_CORNER_SAMPLED_IMAGE_FEATURES_NV
    extends: VkStructureType
    offset: 0
"#;
    let err = load(text).unwrap_err();
    assert_eq!(err.len(), 1);
    assert_eq!(
        err.iter().next().unwrap().entity,
        Entity::enum_entry("STRUCTURE_TYPE_PHYSICAL_DEVICE_CORNER_SAMPLED_IMAGE_FEATURES_NV")
    );

    let numbered = text.replacen("enums:", "number: 51\nenums:", 1);
    let descriptor = load(&numbered).unwrap();
    let offset = descriptor.enum_extensions[1].value;
    assert_eq!(offset.evaluate(descriptor.number), Some(1_000_050_000));
    let literal = descriptor.enum_extensions[0].value;
    assert_eq!(literal.evaluate(None), Some(0x2000));
}

#[test]
fn negative_offsets_are_negated() {
    let value = EnumExtensionValue::Offset {
        offset: 3,
        negative: true,
    };
    assert_eq!(value.evaluate(Some(2)), Some(-1_000_001_003));
    assert_eq!(value.evaluate(Some(0)), None);
}

#[test]
fn struct_types_validate_members() {
    let descriptor = load(
        r#"
name: openvr_types
types:
  - name: HmdColor_t
    kind: struct
    members:
      - { name: r, type: float }
      - { name: g, type: float }
      - { name: b, type: float }
      - { name: a, type: float }
  - name: HmdMatrix34_t
    kind: struct
    members:
      - { name: m, type: float, count: 12 }
  - name: VkInstance
    kind: handle
  - name: VkSemaphore
    kind: handle
    dispatchable: false
  - name: EVRCompositorError
    kind: enum
    values:
      - { name: VRCompositorError_None, value: 0 }
      - { name: VRCompositorError_RequestFailed, value: 1 }
"#,
    )
    .unwrap();
    assert_eq!(descriptor.types.len(), 5);
    let TypeDeclKind::Struct { members } = &descriptor.types[1].kind else {
        panic!("expected struct");
    };
    assert_eq!(members[0].array_len, Some(12));
    assert_eq!(
        descriptor.types[2].kind,
        TypeDeclKind::Handle { dispatchable: true }
    );
    assert_eq!(
        descriptor.types[3].kind,
        TypeDeclKind::Handle {
            dispatchable: false
        }
    );

    let err = load(
        r#"
name: bad_types
types:
  - name: Empty
    kind: struct
  - name: Mixed
    kind: enum
    members:
      - { name: x, type: int }
  - name: Weird
    kind: class
"#,
    )
    .unwrap_err();
    assert_eq!(err.len(), 3);
}

#[test]
fn conflicting_length_links_are_malformed() {
    let err = load(
        r#"
name: Iface
library: lib
functions:
  - name: Fill
    params:
      - name: data
        type: void *
        length: size
        length_of: size
      - name: size
        type: size_t
      - name: size
        type: size_t
"#,
    )
    .unwrap_err();
    assert_eq!(err.len(), 2);
    assert!(err
        .iter()
        .any(|error| error.entity == Entity::parameter("Fill", "data")));
    assert!(err
        .iter()
        .any(|error| error.entity == Entity::parameter("Fill", "size")));
}

#[test]
fn checked_and_returned_length_parameters_load() {
    let descriptor = load(
        r#"
name: VRCompositor
library: openvr_api
functions:
  - name: GetMirrorTexture
    returns: uint32_t
    params:
      - { name: ppTexture, type: void **, check: 1 }
      - name: pchName
        type: char *
        modifiers: [out, nullable]
        length: unNameSize
        returned_length: true
        includes_nul: true
      - { name: unNameSize, type: uint32_t, length_of: pchName }
"#,
    )
    .unwrap();
    let function = &descriptor.functions[0];
    let texture = function.param("ppTexture").unwrap();
    assert_eq!(texture.check, Some(1));
    assert_eq!(texture.returned_length, None);

    let name = function.param("pchName").unwrap();
    assert_eq!(name.returned_length, Some(ReturnedLength::IncludingNul));
    assert!(name
        .modifiers
        .contains(ParamModifiers::RETURNED_LENGTH | ParamModifiers::ARRAY));
    assert_eq!(name.check, None);
}

#[test]
fn misused_checks_and_returned_lengths_are_malformed() {
    let err = load(
        r#"
name: Iface
library: lib
functions:
  - name: Fill
    returns: uint32_t
    params:
      - { name: zero, type: int32_t *, check: 0 }
      - { name: scalar, type: int32_t, check: 2 }
      - { name: sized, type: int32_t *, check: 2, length: n }
      - { name: n, type: uint32_t }
      - { name: text, type: char *, includes_nul: true }
      - { name: count, type: uint32_t, returned_length: true }
"#,
    )
    .unwrap_err();
    assert!(err.iter().all(|error| error.kind == ErrorKind::MalformedDescriptor));
    let failed: Vec<_> = err.iter().map(|error| error.entity.clone()).collect();
    assert_eq!(
        failed,
        vec![
            Entity::parameter("Fill", "zero"),
            Entity::parameter("Fill", "scalar"),
            Entity::parameter("Fill", "sized"),
            Entity::parameter("Fill", "text"),
            Entity::parameter("Fill", "count"),
        ]
    );
}

#[test]
fn constant_ref_parses_qualified_names() {
    let reference = ConstantRef::parse("NV_viewport_array2.NV_VIEWPORT_ARRAY2_SPEC_VERSION");
    assert_eq!(reference.interface.as_deref(), Some("NV_viewport_array2"));
    assert_eq!(reference.name, "NV_VIEWPORT_ARRAY2_SPEC_VERSION");
    assert_eq!(
        reference.to_string(),
        "NV_viewport_array2.NV_VIEWPORT_ARRAY2_SPEC_VERSION"
    );
    assert_eq!(ConstantRef::parse(" A ").interface, None);
}
