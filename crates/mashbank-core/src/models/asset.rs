use serde::{Deserialize, Serialize};

use crate::errors::{MashResult, ServiceError};

/// A content-addressed asset. Immutable once written; identified by its
/// 64-character lowercase hex content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Lowercase hex blake3 digest of the asset bytes. Primary key.
    pub hash: String,
    /// Filename as declared at upload time.
    pub original_filename: String,
    /// Lowercased extension without the dot; empty if none.
    pub extension: String,
    pub size_bytes: u64,
    /// Unix seconds.
    pub created_at: i64,
    /// Version lineage: hash of the asset this one supersedes.
    pub parent_hash: Option<String>,
    /// Container file (`NNN.dat`) holding the entry.
    pub container_name: String,
    /// Byte offset of the entry header within the container.
    pub byte_offset: u64,
}

impl Asset {
    /// Extract the lowercased extension from a filename. No dot → empty.
    pub fn extension_of(filename: &str) -> String {
        match filename.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext.to_ascii_lowercase(),
            _ => String::new(),
        }
    }

    /// Render the download filename in the requested format.
    pub fn download_filename(&self, format: FilenameFormat) -> String {
        let dot_ext = if self.extension.is_empty() {
            String::new()
        } else {
            format!(".{}", self.extension)
        };
        match format {
            FilenameFormat::Hash => format!("{}{}", self.hash, dot_ext),
            FilenameFormat::Original => self.original_filename.clone(),
            FilenameFormat::HashOriginal => format!("{}_{}", self.hash, self.original_filename),
        }
    }
}

/// Download filename rendering styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilenameFormat {
    Hash,
    Original,
    HashOriginal,
}

impl FilenameFormat {
    pub fn parse(s: &str) -> MashResult<Self> {
        match s {
            "hash" => Ok(FilenameFormat::Hash),
            "original" => Ok(FilenameFormat::Original),
            "hash_original" => Ok(FilenameFormat::HashOriginal),
            other => Err(ServiceError::InvalidFilenameFormat {
                format: other.to_string(),
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(Asset::extension_of("report.PDF"), "pdf");
        assert_eq!(Asset::extension_of("archive.tar.gz"), "gz");
        assert_eq!(Asset::extension_of("README"), "");
        assert_eq!(Asset::extension_of(".gitignore"), "");
        assert_eq!(Asset::extension_of("trailing."), "");
    }

    #[test]
    fn test_download_filename_formats() {
        let asset = Asset {
            hash: "ab".repeat(32),
            original_filename: "hello.txt".into(),
            extension: "txt".into(),
            size_bytes: 5,
            created_at: 0,
            parent_hash: None,
            container_name: "001.dat".into(),
            byte_offset: 0,
        };
        assert_eq!(
            asset.download_filename(FilenameFormat::Hash),
            format!("{}.txt", "ab".repeat(32))
        );
        assert_eq!(
            asset.download_filename(FilenameFormat::Original),
            "hello.txt"
        );
        assert_eq!(
            asset.download_filename(FilenameFormat::HashOriginal),
            format!("{}_hello.txt", "ab".repeat(32))
        );
        assert!(FilenameFormat::parse("nope").is_err());
    }
}
