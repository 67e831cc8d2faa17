//! Fixed table of native type names every run understands without a declaration.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use super::Scalar;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    Void,
    Scalar(Scalar),
    /// Platform typedef for an untyped pointer (`EGLDisplay`, `EGLClientBuffer`).
    Handle,
    /// Known native type without a portable fixed-size equivalent.
    Unmappable(&'static str),
}

const LONG_REASON: &str = "`long` is 32-bit on LLP64 and 64-bit on LP64 targets";

static BUILTINS: Lazy<HashMap<&'static str, Builtin>> = Lazy::new(|| {
    use Builtin::{Handle, Unmappable};
    use Scalar::*;

    let scalars: &[(&str, Scalar)] = &[
        // C
        ("bool", Bool),
        ("_Bool", Bool),
        ("char", Char),
        ("signed char", I8),
        ("unsigned char", U8),
        ("int8_t", I8),
        ("uint8_t", U8),
        ("int16_t", I16),
        ("uint16_t", U16),
        ("int32_t", I32),
        ("uint32_t", U32),
        ("int64_t", I64),
        ("uint64_t", U64),
        ("short", I16),
        ("short int", I16),
        ("signed short", I16),
        ("unsigned short", U16),
        ("unsigned short int", U16),
        ("int", I32),
        ("signed", I32),
        ("signed int", I32),
        ("unsigned", U32),
        ("unsigned int", U32),
        ("long long", I64),
        ("long long int", I64),
        ("signed long long", I64),
        ("unsigned long long", U64),
        ("unsigned long long int", U64),
        ("float", F32),
        ("double", F64),
        ("size_t", Usize),
        ("uintptr_t", Usize),
        ("ssize_t", Isize),
        ("intptr_t", Isize),
        ("ptrdiff_t", Isize),
        // EGL
        ("EGLint", I32),
        ("EGLBoolean", U32),
        ("EGLenum", U32),
        ("EGLAttrib", Isize),
        ("EGLAttribKHR", Isize),
        ("EGLTime", U64),
        ("EGLTimeKHR", U64),
        ("EGLuint64KHR", U64),
        ("EGLnsecsANDROID", I64),
        // Vulkan
        ("VkBool32", U32),
        ("VkFlags", U32),
        ("VkFlags64", U64),
        ("VkSampleMask", U32),
        ("VkDeviceSize", U64),
        ("VkDeviceAddress", U64),
        // OpenVR
        ("TrackedDeviceIndex_t", U32),
        ("VROverlayHandle_t", U64),
        ("PropertyContainerHandle_t", U64),
        ("PropertyTypeTag_t", U32),
        ("DriverHandle_t", U64),
        ("TrackedCameraHandle_t", U64),
        ("ScreenshotHandle_t", U32),
        ("SpatialAnchorHandle_t", U32),
        ("VRActionHandle_t", U64),
        ("VRActionSetHandle_t", U64),
        ("VRInputValueHandle_t", U64),
        ("VRNotificationId", U32),
        ("VRComponentProperties", U32),
        ("SharedTextureHandle_t", U64),
        ("TextureID_t", I32),
        ("WebConsoleHandle_t", U64),
        ("glInt_t", I32),
        ("glUInt_t", U32),
    ];
    let handles = [
        "EGLDisplay",
        "EGLConfig",
        "EGLSurface",
        "EGLContext",
        "EGLClientBuffer",
        "EGLImage",
        "EGLImageKHR",
        "EGLSync",
        "EGLSyncKHR",
        "EGLStreamKHR",
        "EGLNativeDisplayType",
        "EGLNativeWindowType",
        "EGLNativePixmapType",
        "glSharedTextureHandle_t",
    ];
    let unmappable: &[(&str, &str)] = &[
        ("long", LONG_REASON),
        ("long int", LONG_REASON),
        ("signed long", LONG_REASON),
        ("unsigned long", LONG_REASON),
        ("unsigned long int", LONG_REASON),
        ("long double", "no fixed representation across targets"),
        ("va_list", "variadic argument lists cannot cross the binding"),
    ];

    let mut table = HashMap::new();
    table.insert("void", Builtin::Void);
    for (name, scalar) in scalars {
        table.insert(*name, Builtin::Scalar(*scalar));
    }
    for name in handles {
        table.insert(name, Handle);
    }
    for (name, reason) in unmappable {
        table.insert(*name, Unmappable(*reason));
    }
    table
});

/// Look up a native base name.
#[must_use]
pub fn lookup(name: &str) -> Option<Builtin> {
    BUILTINS.get(name).copied()
}

/// Every builtin name, sorted; used by `natbind help types`.
#[must_use]
pub fn names() -> Vec<&'static str> {
    let mut names: Vec<_> = BUILTINS.keys().copied().collect();
    names.sort_unstable();
    names
}
