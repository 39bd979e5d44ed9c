//! Locating the entrypoint of a service template or a directory archive.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::debug;

use crate::error::ParserError;

pub const META_FILE: &str = "TOSCA-Metadata/TOSCA.meta";
pub const ENTRY_DEFINITIONS: &str = "Entry-Definitions";
const SUPPORTED_META_VERSION: &str = "1.1";
const ZIP_MAGIC: &[u8; 4] = b"PK\x03\x04";

/// Where parsing starts: a working directory and an entrypoint relative to it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub workdir: PathBuf,
    pub entrypoint: PathBuf,
}

impl Source {
    /// Classify `path` as a directory archive, a packaged archive (rejected)
    /// or a standalone service template
    pub fn locate(path: &Path) -> Result<Source, ParserError> {
        if path.is_dir() {
            let archive = DirectoryArchive::new(path);
            return Ok(Source {
                workdir: path.to_path_buf(),
                entrypoint: archive.entrypoint()?,
            });
        }

        if path.is_file() && is_zip_file(path)? {
            return Err(ParserError::Archive(format!(
                "Packaged archives are not supported: {}. Extract it and parse the directory instead.",
                path.display()
            )));
        }

        let entrypoint = path
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| ParserError::Archive(format!("Not a service template path: {}", path.display())))?;
        let workdir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        Ok(Source { workdir, entrypoint })
    }
}

/// Zip files are recognized by their local file header, whatever their name
fn is_zip_file(path: &Path) -> Result<bool, ParserError> {
    let mut file = File::open(path).map_err(|source| ParserError::io(path, source))?;
    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic) {
        Ok(()) => Ok(&magic == ZIP_MAGIC),
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(source) => Err(ParserError::io(path, source)),
    }
}

/// An unpacked cloud service archive
#[derive(Debug, Clone)]
pub struct DirectoryArchive {
    root: PathBuf,
}

impl DirectoryArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectoryArchive { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Key/value pairs of `TOSCA-Metadata/TOSCA.meta`, if the archive has one
    pub fn metadata(&self) -> Result<Option<IndexMap<String, String>>, ParserError> {
        let path = self.root.join(META_FILE);
        if !path.is_file() {
            return Ok(None);
        }

        let text = fs::read_to_string(&path).map_err(|source| ParserError::io(&path, source))?;
        let raw: IndexMap<String, serde_yaml::Value> = serde_yaml::from_str(&text)?;
        let metadata = raw
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_yaml::Value::String(s) => s,
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => serde_yaml::to_string(&other)?.trim().to_string(),
                };
                Ok((key, value))
            })
            .collect::<Result<IndexMap<_, _>, serde_yaml::Error>>()?;
        Ok(Some(metadata))
    }

    /// Entrypoint from `Entry-Definitions`, or else the only YAML file at the
    /// archive root
    pub fn entrypoint(&self) -> Result<PathBuf, ParserError> {
        match self.metadata()? {
            Some(metadata) => self.meta_entrypoint(&metadata),
            None => self.root_entrypoint(),
        }
    }

    fn meta_entrypoint(&self, metadata: &IndexMap<String, String>) -> Result<PathBuf, ParserError> {
        for key in ["TOSCA-Meta-File-Version", "CSAR-Version"] {
            if let Some(version) = metadata.get(key) {
                if version != SUPPORTED_META_VERSION {
                    return Err(ParserError::Archive(format!(
                        "{} in {} must be {}, found {}.",
                        key, META_FILE, SUPPORTED_META_VERSION, version
                    )));
                }
            }
        }

        let entry = metadata.get(ENTRY_DEFINITIONS).ok_or_else(|| {
            ParserError::Archive(format!("{} is missing the {} key.", META_FILE, ENTRY_DEFINITIONS))
        })?;
        let entrypoint = PathBuf::from(entry);
        if !self.root.join(&entrypoint).is_file() {
            return Err(ParserError::Archive(format!(
                "{} points at {}, which does not exist in the archive.",
                ENTRY_DEFINITIONS, entry
            )));
        }

        debug!(entrypoint = %entrypoint.display(), "Entrypoint from archive metadata");
        Ok(entrypoint)
    }

    fn root_entrypoint(&self) -> Result<PathBuf, ParserError> {
        let entries = fs::read_dir(&self.root).map_err(|source| ParserError::io(&self.root, source))?;
        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ParserError::io(&self.root, source))?;
            let path = entry.path();
            let is_yaml = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| ext == "yaml" || ext == "yml");
            if is_yaml && path.is_file() {
                candidates.push(PathBuf::from(entry.file_name()));
            }
        }
        candidates.sort();

        match candidates.len() {
            1 => Ok(candidates.remove(0)),
            0 => Err(ParserError::Archive(format!(
                "No service template (.yaml or .yml) found at the root of {}.",
                self.root.display()
            ))),
            _ => Err(ParserError::Archive(format!(
                "Several service templates found at the root of {}: {}. Add {} with an {} entry.",
                self.root.display(),
                candidates
                    .iter()
                    .map(|candidate| candidate.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
                META_FILE,
                ENTRY_DEFINITIONS
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(dir: &TempDir, path: &str, contents: &str) {
        let path = dir.path().join(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_single_root_yaml_is_the_entrypoint() {
        let dir = TempDir::new().unwrap();
        write(&dir, "service.yaml", "tosca_definitions_version: tosca_simple_yaml_1_3\n");
        write(&dir, "types/extra.yaml", "");

        let archive = DirectoryArchive::new(dir.path());
        assert_eq!(archive.entrypoint().unwrap(), PathBuf::from("service.yaml"));
    }

    #[test]
    fn test_meta_file_selects_entrypoint() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.yaml", "");
        write(&dir, "b.yaml", "");
        write(
            &dir,
            META_FILE,
            "TOSCA-Meta-File-Version: 1.1\nCSAR-Version: 1.1\nCreated-By: tests\nEntry-Definitions: b.yaml\n",
        );

        let archive = DirectoryArchive::new(dir.path());
        let metadata = archive.metadata().unwrap().unwrap();
        assert_eq!(metadata.get("CSAR-Version").map(String::as_str), Some("1.1"));
        assert_eq!(archive.entrypoint().unwrap(), PathBuf::from("b.yaml"));
    }

    #[test]
    fn test_ambiguous_and_empty_archives() {
        let dir = TempDir::new().unwrap();
        let err = DirectoryArchive::new(dir.path()).entrypoint().unwrap_err();
        assert_eq!(err.error_code(), "ERR_TOSCA_ARCHIVE");

        write(&dir, "a.yaml", "");
        write(&dir, "b.yml", "");
        let err = DirectoryArchive::new(dir.path()).entrypoint().unwrap_err();
        assert!(err.to_string().contains("a.yaml, b.yml"), "{}", err);
    }

    #[test]
    fn test_meta_entry_must_exist() {
        let dir = TempDir::new().unwrap();
        write(&dir, META_FILE, "Entry-Definitions: missing.yaml\n");
        let err = DirectoryArchive::new(dir.path()).entrypoint().unwrap_err();
        assert!(err.to_string().contains("missing.yaml"));
    }

    #[test]
    fn test_locate_classifies_paths() {
        let source = Source::locate(Path::new("service.yaml")).unwrap();
        assert_eq!(source.workdir, PathBuf::from("."));
        assert_eq!(source.entrypoint, PathBuf::from("service.yaml"));

        let source = Source::locate(Path::new("templates/web/service.yaml")).unwrap();
        assert_eq!(source.workdir, PathBuf::from("templates/web"));

    }

    #[test]
    fn test_zip_content_is_rejected_whatever_the_name() {
        let dir = TempDir::new().unwrap();
        let bundle = dir.path().join("bundle.yaml");
        fs::write(&bundle, b"PK\x03\x04\x14\x00\x00\x00").unwrap();
        let err = Source::locate(&bundle).unwrap_err();
        assert_eq!(err.error_code(), "ERR_TOSCA_ARCHIVE");

        let named_csar = dir.path().join("plain.csar");
        fs::write(&named_csar, "tosca_definitions_version: tosca_simple_yaml_1_3\n").unwrap();
        assert_eq!(Source::locate(&named_csar).unwrap().entrypoint, PathBuf::from("plain.csar"));

        let short = dir.path().join("short.yaml");
        fs::write(&short, "PK").unwrap();
        assert!(Source::locate(&short).is_ok());
    }
}
