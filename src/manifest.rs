//! `natbind.yaml` project manifest.
//!
//! The manifest is optional. When present it names the descriptor inputs, the output
//! directory and generation defaults; every relative path inside it is resolved against the
//! directory holding the manifest. Command-line flags override whatever it sets.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use walkdir::WalkDir;

use crate::emit::TargetLanguage;
use crate::error::{Error, Result};
use crate::registry::{ExternalType, Registry};
use crate::types::PointerWidth;

pub const MANIFEST_BASENAME: &str = "natbind.yaml";

const DESCRIPTOR_EXTENSIONS: [&str; 2] = ["yaml", "yml"];

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    #[serde(default)]
    inputs: Vec<PathBuf>,
    #[serde(default)]
    output: Option<PathBuf>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    jobs: Option<usize>,
    #[serde(default)]
    pointer_width: Option<u32>,
    #[serde(default)]
    default_library: Option<String>,
    #[serde(default)]
    types: Vec<ExternalType>,
}

/// A parsed and validated manifest.
#[derive(Clone, Debug)]
pub struct Manifest {
    path: PathBuf,
    root: PathBuf,
    inputs: Vec<PathBuf>,
    output: Option<PathBuf>,
    language: Option<TargetLanguage>,
    jobs: Option<usize>,
    pointer_width: Option<PointerWidth>,
    default_library: Option<String>,
    types: Vec<ExternalType>,
}

impl Manifest {
    /// Read the manifest at `path`.
    ///
    /// # Errors
    /// Returns [`Error::Manifest`] when the file cannot be read, parsed or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|err| Error::manifest(path, format!("cannot read manifest: {err}")))?;
        Self::parse(path, &contents)
    }

    /// Walk upwards from `start` looking for `natbind.yaml`.
    ///
    /// Returns `Ok(None)` when no directory up to the filesystem root has one.
    ///
    /// # Errors
    /// Propagates [`Manifest::load`] failures for the first manifest found.
    pub fn discover(start: &Path) -> Result<Option<Self>> {
        let mut current = if start.is_file() {
            start.parent().map(Path::to_path_buf)
        } else {
            Some(start.to_path_buf())
        };
        while let Some(dir) = current {
            let candidate = dir.join(MANIFEST_BASENAME);
            if candidate.is_file() {
                tracing::debug!(
                    target: "pipeline",
                    stage = "manifest.discover",
                    path = %candidate.display()
                );
                return Self::load(&candidate).map(Some);
            }
            current = dir.parent().map(Path::to_path_buf);
        }
        Ok(None)
    }

    /// Parse manifest text; `path` anchors relative paths and error messages.
    ///
    /// # Errors
    /// Returns [`Error::Manifest`] for YAML errors, unknown keys, unsupported values and
    /// conflicting external types.
    pub fn parse(path: &Path, contents: &str) -> Result<Self> {
        let raw: RawManifest = if contents.trim().is_empty() {
            RawManifest::default()
        } else {
            serde_yaml::from_str(contents).map_err(|err| Error::manifest(path, err.to_string()))?
        };
        let root = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        let language = raw
            .language
            .as_deref()
            .map(|value| {
                TargetLanguage::parse(value).ok_or_else(|| {
                    Error::manifest(path, format!("unsupported language `{value}` (expected rust or c)"))
                })
            })
            .transpose()?;
        let pointer_width = raw
            .pointer_width
            .map(|bits| {
                PointerWidth::from_bits(bits).ok_or_else(|| {
                    Error::manifest(path, format!("unsupported pointer_width {bits} (expected 32 or 64)"))
                })
            })
            .transpose()?;
        if raw.jobs == Some(0) {
            return Err(Error::manifest(path, "jobs must be at least 1"));
        }
        if let Err(errors) = Registry::with_external_types(&raw.types) {
            let messages: Vec<String> = errors.iter().map(|error| error.message.clone()).collect();
            return Err(Error::manifest(path, messages.join("; ")));
        }

        Ok(Self {
            inputs: raw.inputs.iter().map(|input| root.join(input)).collect(),
            output: raw.output.map(|output| root.join(output)),
            language,
            jobs: raw.jobs,
            pointer_width,
            default_library: raw.default_library,
            types: raw.types,
            path: path.to_path_buf(),
            root,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory the manifest's relative paths are resolved against.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn inputs(&self) -> &[PathBuf] {
        &self.inputs
    }

    #[must_use]
    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    #[must_use]
    pub fn language(&self) -> Option<TargetLanguage> {
        self.language
    }

    #[must_use]
    pub fn jobs(&self) -> Option<usize> {
        self.jobs
    }

    #[must_use]
    pub fn pointer_width(&self) -> Option<PointerWidth> {
        self.pointer_width
    }

    #[must_use]
    pub fn default_library(&self) -> Option<&str> {
        self.default_library.as_deref()
    }

    #[must_use]
    pub fn types(&self) -> &[ExternalType] {
        &self.types
    }
}

/// Replace every directory in `paths` with the descriptor files beneath it.
///
/// Directories are walked recursively and yield `.yaml`/`.yml` files sorted by path, so the
/// input order (and with it duplicate resolution) does not depend on the filesystem. A
/// manifest found inside a walked directory is not a descriptor and is skipped. Plain file
/// paths are kept as given, even when missing; reading them is the loader's job.
///
/// # Errors
/// Returns an I/O error when a directory cannot be walked.
pub fn expand_inputs(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut expanded = Vec::new();
    for path in paths {
        if !path.is_dir() {
            expanded.push(path.clone());
            continue;
        }
        let mut found = Vec::new();
        for entry in WalkDir::new(path).follow_links(true) {
            let entry = entry.map_err(|err| {
                let message = err.to_string();
                err.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other(message))
            })?;
            if entry.file_type().is_file() && is_descriptor(entry.path()) {
                found.push(entry.into_path());
            }
        }
        found.sort();
        tracing::debug!(
            target: "pipeline",
            stage = "inputs.expand",
            dir = %path.display(),
            files = found.len()
        );
        expanded.extend(found);
    }
    Ok(expanded)
}

fn is_descriptor(path: &Path) -> bool {
    let has_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| DESCRIPTOR_EXTENSIONS.contains(&ext));
    has_extension && path.file_name().is_some_and(|name| name != MANIFEST_BASENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ExternalKind;
    use tempfile::tempdir;

    fn write_manifest(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join(MANIFEST_BASENAME);
        fs::write(&path, contents).expect("write manifest");
        path
    }

    #[test]
    fn discover_returns_none_when_missing() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).expect("mkdir");
        // The tempdir may itself sit below a stray manifest; only assert on our own tree.
        if let Some(found) = Manifest::discover(&nested).expect("discover") {
            assert!(!found.path().starts_with(dir.path()));
        }
    }

    #[test]
    fn discover_walks_up_and_resolves_paths_against_the_manifest() {
        let dir = tempdir().expect("tempdir");
        write_manifest(
            dir.path(),
            "inputs: [descriptors, extra/one.yaml]\noutput: gen\nlanguage: c\njobs: 2\npointer_width: 32\ndefault_library: openvr_api\n",
        );
        let nested = dir.path().join("descriptors/deep");
        fs::create_dir_all(&nested).expect("mkdir");

        let manifest = Manifest::discover(&nested).expect("discover").expect("found");
        assert_eq!(manifest.root(), dir.path());
        assert_eq!(
            manifest.inputs(),
            &[dir.path().join("descriptors"), dir.path().join("extra/one.yaml")]
        );
        assert_eq!(manifest.output(), Some(dir.path().join("gen").as_path()));
        assert_eq!(manifest.language(), Some(TargetLanguage::C));
        assert_eq!(manifest.jobs(), Some(2));
        assert_eq!(manifest.pointer_width(), Some(PointerWidth::W32));
        assert_eq!(manifest.default_library(), Some("openvr_api"));
    }

    #[test]
    fn parses_external_types() {
        let manifest = Manifest::parse(
            Path::new("natbind.yaml"),
            "types:\n  - { name: VkStructureType, kind: enum }\n  - { name: VkInstance, kind: handle }\n  - { name: VkDeviceSize, kind: alias, target: uint64_t }\n  - { name: VkExtent2D, kind: struct, size: 8, align: 4 }\n",
        )
        .expect("parse");
        assert_eq!(manifest.root(), Path::new("."));
        assert_eq!(
            manifest.types(),
            &[
                ExternalType::new("VkStructureType", ExternalKind::Enum),
                ExternalType::new("VkInstance", ExternalKind::Handle { dispatchable: true }),
                ExternalType::new(
                    "VkDeviceSize",
                    ExternalKind::Alias {
                        target: "uint64_t".into()
                    }
                ),
                ExternalType::new("VkExtent2D", ExternalKind::Struct { size: 8, align: 4 }),
            ]
        );
    }

    #[test]
    fn empty_manifest_uses_defaults() {
        let manifest = Manifest::parse(Path::new("/p/natbind.yaml"), "").expect("parse");
        assert!(manifest.inputs().is_empty());
        assert_eq!(manifest.language(), None);
        assert_eq!(manifest.output(), None);
    }

    #[test]
    fn rejects_invalid_manifests() {
        let path = Path::new("natbind.yaml");
        for (contents, needle) in [
            ("inptus: []\n", "unknown field"),
            ("language: go\n", "unsupported language `go`"),
            ("pointer_width: 16\n", "unsupported pointer_width 16"),
            ("jobs: 0\n", "jobs must be at least 1"),
            (
                "types:\n  - { name: GLenum, kind: enum }\n  - { name: GLenum, kind: opaque }\n",
                "GLenum",
            ),
            ("types:\n  - { name: int32_t, kind: enum }\n", "int32_t"),
        ] {
            match Manifest::parse(path, contents) {
                Err(Error::Manifest { message, .. }) => {
                    assert!(message.contains(needle), "{contents:?}: {message}");
                }
                other => panic!("{contents:?}: expected manifest error, got {other:?}"),
            }
        }
    }

    #[test]
    fn expands_directories_in_sorted_order() {
        let dir = tempdir().expect("tempdir");
        let root = dir.path();
        fs::create_dir_all(root.join("gl/ext")).expect("mkdir");
        for name in ["gl/b.yaml", "gl/a.yml", "gl/ext/c.yaml", "gl/notes.txt", "gl/natbind.yaml"] {
            fs::write(root.join(name), "name: X\n").expect("write");
        }
        let single = root.join("missing.yaml");
        let expanded = expand_inputs(&[single.clone(), root.join("gl")]).expect("expand");
        assert_eq!(
            expanded,
            vec![
                single,
                root.join("gl/a.yml"),
                root.join("gl/b.yaml"),
                root.join("gl/ext/c.yaml"),
            ]
        );
    }
}
