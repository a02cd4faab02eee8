//! Debian source `.changes` manifests.
//!
//! A `.changes` file names the artifact set of one upload. Files are
//! listed in the `Checksums-Sha256` field; `Checksums-Sha1` and `Files`
//! are fallbacks for older tooling.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Errors loading or verifying a `.changes` file
#[derive(Debug, thiserror::Error)]
pub enum ChangesError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{0} lists no files")]
    NoFiles(PathBuf),

    #[error("Malformed file entry in {path}: '{line}'")]
    MalformedEntry { path: PathBuf, line: String },

    #[error("Listed file {0} is missing")]
    Missing(PathBuf),

    #[error("Size mismatch for {name}: expected {expected}, found {actual}")]
    SizeMismatch {
        name: String,
        expected: u64,
        actual: u64,
    },

    #[error("SHA-256 mismatch for {name}: expected {expected}, found {actual}")]
    DigestMismatch {
        name: String,
        expected: String,
        actual: String,
    },
}

/// One artifact named by a `.changes` file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangesEntry {
    pub name: String,
    pub size: u64,
    /// Present when the manifest carries `Checksums-Sha256`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Parsed `.changes` manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangesFile {
    pub path: PathBuf,
    pub source: Option<String>,
    pub version: Option<String>,
    pub entries: Vec<ChangesEntry>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Sha256,
    Sha1,
    Files,
}

impl ChangesFile {
    pub fn load(path: &Path) -> Result<Self, ChangesError> {
        let content = fs::read_to_string(path).map_err(|source| ChangesError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    pub fn parse(path: &Path, content: &str) -> Result<Self, ChangesError> {
        let mut source = None;
        let mut version = None;
        let mut sha256 = Vec::new();
        let mut sha1 = Vec::new();
        let mut files = Vec::new();
        let mut section = None;

        for line in content.lines() {
            // Continuation lines belong to the last field
            if line.starts_with(' ') || line.starts_with('\t') {
                let Some(section) = section else { continue };
                let tokens: Vec<&str> = line.split_whitespace().collect();
                if tokens.is_empty() {
                    continue;
                }
                let entry = parse_entry(path, line, &tokens, section)?;
                match section {
                    Section::Sha256 => sha256.push(entry),
                    Section::Sha1 => sha1.push(entry),
                    Section::Files => files.push(entry),
                }
                continue;
            }

            section = None;
            let Some((field, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match field {
                "Source" => source = Some(value.to_string()),
                "Version" => version = Some(value.to_string()),
                "Checksums-Sha256" => section = Some(Section::Sha256),
                "Checksums-Sha1" => section = Some(Section::Sha1),
                "Files" => section = Some(Section::Files),
                _ => {}
            }
        }

        let entries = [sha256, sha1, files]
            .into_iter()
            .find(|list| !list.is_empty())
            .ok_or_else(|| ChangesError::NoFiles(path.to_path_buf()))?;

        Ok(Self {
            path: path.to_path_buf(),
            source,
            version,
            entries,
        })
    }

    /// Directory the listed artifacts live in
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Manifest first, then every listed artifact
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files = vec![self.path.clone()];
        files.extend(self.entries.iter().map(|e| self.dir().join(&e.name)));
        files
    }

    /// Check every listed artifact exists with the declared size and digest
    pub fn verify(&self) -> Result<(), ChangesError> {
        for entry in &self.entries {
            let path = self.dir().join(&entry.name);
            let metadata = match fs::metadata(&path) {
                Ok(m) => m,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    return Err(ChangesError::Missing(path))
                }
                Err(source) => return Err(ChangesError::Io { path, source }),
            };
            if metadata.len() != entry.size {
                return Err(ChangesError::SizeMismatch {
                    name: entry.name.clone(),
                    expected: entry.size,
                    actual: metadata.len(),
                });
            }
            if let Some(expected) = &entry.sha256 {
                let actual = sha256_file(&path)?;
                if !actual.eq_ignore_ascii_case(expected) {
                    return Err(ChangesError::DigestMismatch {
                        name: entry.name.clone(),
                        expected: expected.clone(),
                        actual,
                    });
                }
            }
        }
        Ok(())
    }
}

fn parse_entry(
    path: &Path,
    line: &str,
    tokens: &[&str],
    section: Section,
) -> Result<ChangesEntry, ChangesError> {
    // checksum size [section priority] name
    let min = if section == Section::Files { 5 } else { 3 };
    let malformed = || ChangesError::MalformedEntry {
        path: path.to_path_buf(),
        line: line.trim().to_string(),
    };
    if tokens.len() < min {
        return Err(malformed());
    }
    let size = tokens[1].parse::<u64>().map_err(|_| malformed())?;
    let name = tokens[tokens.len() - 1];
    if name.contains('/') || name == ".." {
        return Err(malformed());
    }
    Ok(ChangesEntry {
        name: name.to_string(),
        size,
        sha256: (section == Section::Sha256).then(|| tokens[0].to_string()),
    })
}

fn sha256_file(path: &Path) -> Result<String, ChangesError> {
    let io_err = |source| ChangesError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = File::open(path).map_err(io_err)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(io_err)?;
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHANGES: &str = "\
Format: 1.8
Date: Tue, 27 Sep 2022 21:00:00 +0000
Source: linux-generic-5.19
Version: 5.19.11
Distribution: focal
Checksums-Sha1:
 1111111111111111111111111111111111111111 1024 linux-generic-5.19_5.19.11.dsc
 2222222222222222222222222222222222222222 2048 linux-generic-5.19_5.19.11.tar.xz
Checksums-Sha256:
 aaaa 1024 linux-generic-5.19_5.19.11.dsc
 bbbb 2048 linux-generic-5.19_5.19.11.tar.xz
Files:
 cccc 1024 kernel optional linux-generic-5.19_5.19.11.dsc
 dddd 2048 kernel optional linux-generic-5.19_5.19.11.tar.xz
";

    #[test]
    fn test_parse_prefers_sha256() {
        let changes = ChangesFile::parse(Path::new("/tmp/up/x_source.changes"), CHANGES).unwrap();
        assert_eq!(changes.source.as_deref(), Some("linux-generic-5.19"));
        assert_eq!(changes.version.as_deref(), Some("5.19.11"));
        assert_eq!(changes.entries.len(), 2);
        assert_eq!(changes.entries[0].sha256.as_deref(), Some("aaaa"));
        assert_eq!(changes.entries[1].size, 2048);
    }

    #[test]
    fn test_files_lists_manifest_first() {
        let changes = ChangesFile::parse(Path::new("/tmp/up/x_source.changes"), CHANGES).unwrap();
        let files = changes.files();
        assert_eq!(files[0], PathBuf::from("/tmp/up/x_source.changes"));
        assert_eq!(files[1], PathBuf::from("/tmp/up/linux-generic-5.19_5.19.11.dsc"));
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn test_falls_back_to_files_field() {
        let content = "Source: x\nFiles:\n cccc 10 misc optional x_1.dsc\n";
        let changes = ChangesFile::parse(Path::new("x.changes"), content).unwrap();
        assert_eq!(changes.entries.len(), 1);
        assert_eq!(changes.entries[0].name, "x_1.dsc");
        assert!(changes.entries[0].sha256.is_none());
    }

    #[test]
    fn test_no_files_is_error() {
        let err = ChangesFile::parse(Path::new("x.changes"), "Source: x\n").unwrap_err();
        assert!(matches!(err, ChangesError::NoFiles(_)));
    }

    #[test]
    fn test_rejects_path_components() {
        let content = "Checksums-Sha256:\n aaaa 10 ../escape.dsc\n";
        let err = ChangesFile::parse(Path::new("x.changes"), content).unwrap_err();
        assert!(matches!(err, ChangesError::MalformedEntry { .. }));
    }

    #[test]
    fn test_rejects_bad_size() {
        let content = "Checksums-Sha256:\n aaaa ten x.dsc\n";
        assert!(ChangesFile::parse(Path::new("x.changes"), content).is_err());
    }
}
