//! Size-capped container rotation.

use std::path::{Path, PathBuf};

use mashbank_core::constants::{CONTAINER_EXT, ENTRY_HEADER_LEN};
use mashbank_core::errors::{ContainerError, MashResult};

/// The container an incoming entry should land in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerChoice {
    /// `NNN.dat`.
    pub name: String,
    pub path: PathBuf,
    /// True when the file does not exist yet.
    pub fresh: bool,
}

/// Render the canonical container filename for a number.
pub fn container_name(number: u32) -> String {
    format!("{number:03}.{CONTAINER_EXT}")
}

/// Parse `NNN.dat` back to its number; `None` for foreign files.
pub fn parse_container_name(name: &str) -> Option<u32> {
    let stem = name.strip_suffix(&format!(".{CONTAINER_EXT}"))?;
    if stem.len() < 3 || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

/// Pick the container for an incoming entry of `incoming_len` data bytes:
/// the highest-numbered existing container if the entry still fits under
/// `max_container_size`, otherwise the next number (001 if none exist).
pub fn select_container(
    topic_dir: &Path,
    incoming_len: u64,
    max_container_size: u64,
) -> MashResult<ContainerChoice> {
    let mut highest: Option<(u32, PathBuf, u64)> = None;
    for entry in std::fs::read_dir(topic_dir).map_err(ContainerError::Io)? {
        let entry = entry.map_err(ContainerError::Io)?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        let Some(number) = parse_container_name(name) else {
            continue;
        };
        if highest.as_ref().map_or(true, |(n, _, _)| number > *n) {
            let len = entry.metadata().map_err(ContainerError::Io)?.len();
            highest = Some((number, entry.path(), len));
        }
    }

    let entry_len = ENTRY_HEADER_LEN + incoming_len;
    match highest {
        Some((_, path, len)) if len + entry_len <= max_container_size => {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            Ok(ContainerChoice {
                name,
                path,
                fresh: false,
            })
        }
        Some((number, _, _)) => {
            let name = container_name(number + 1);
            Ok(ContainerChoice {
                path: topic_dir.join(&name),
                name,
                fresh: true,
            })
        }
        None => {
            let name = container_name(1);
            Ok(ContainerChoice {
                path: topic_dir.join(&name),
                name,
                fresh: true,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_names() {
        assert_eq!(container_name(1), "001.dat");
        assert_eq!(container_name(42), "042.dat");
        assert_eq!(container_name(1000), "1000.dat");
        assert_eq!(parse_container_name("001.dat"), Some(1));
        assert_eq!(parse_container_name("1000.dat"), Some(1000));
        assert_eq!(parse_container_name("01.dat"), None);
        assert_eq!(parse_container_name("abc.dat"), None);
        assert_eq!(parse_container_name("001.db"), None);
    }
}
