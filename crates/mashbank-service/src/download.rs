//! Single-asset downloads.

use serde::Serialize;

use mashbank_container::read_data;
use mashbank_core::errors::{MashResult, ServiceError};
use mashbank_core::hashing;
use mashbank_core::models::{Action, ActionContext, Asset, FilenameFormat, Identity};
use mashbank_storage::orchestrator::index_ops;
use mashbank_storage::topic::asset_ops;

use crate::bank::Bank;

/// A resolved download: bytes plus the headers a handler needs.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadReply {
    pub filename: String,
    pub content_type: String,
    pub size_bytes: u64,
    #[serde(skip)]
    pub data: Vec<u8>,
}

/// Minimal extension → MIME mapping; everything else streams as
/// application/octet-stream.
fn content_type_of(extension: &str) -> &'static str {
    match extension {
        "txt" | "log" | "md" => "text/plain",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "csv" => "text/csv",
        "json" => "application/json",
        "xml" => "application/xml",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        _ => "application/octet-stream",
    }
}

impl Bank {
    /// Look an asset up through the orchestrator, then read its bytes
    /// out of the owning topic's container.
    pub fn download(
        &self,
        identity: Option<&Identity>,
        hash: &str,
        format: FilenameFormat,
    ) -> MashResult<DownloadReply> {
        let hash = hashing::canonical_hash(hash)?;

        let (asset, topic_dir) = self.locate_asset(&hash)?;
        let topic = topic_dir
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();

        let ctx = ActionContext::for_download(&topic, asset.size_bytes);
        self.authorize(identity, Action::Download, &ctx)?;

        let container_path = topic_dir.join(&asset.container_name);
        let data = read_data(&container_path, asset.byte_offset, asset.size_bytes)?;

        if let Some(identity) = identity {
            self.note_success(identity, Action::Download, asset.size_bytes);
        }

        Ok(DownloadReply {
            filename: asset.download_filename(format),
            content_type: content_type_of(&asset.extension).to_string(),
            size_bytes: asset.size_bytes,
            data,
        })
    }

    /// Orchestrator lookup then topic-DB row. An index row whose topic
    /// or asset row is missing reads as not-found: the index insert is
    /// ordered last in ingest, so a gap here means "not yet visible".
    pub(crate) fn locate_asset(&self, hash: &str) -> MashResult<(Asset, std::path::PathBuf)> {
        let row = self
            .orchestrator
            .pool
            .with_reader(|conn| index_ops::check_hash(conn, hash))?
            .ok_or_else(|| ServiceError::AssetNotFound {
                hash: hash.to_string(),
            })?;

        // An index row whose topic has vanished (reconciliation pending)
        // also reads as not-found.
        let handle = self.registry.require(&row.topic).map_err(|_| {
            mashbank_core::errors::MashError::from(ServiceError::AssetNotFound {
                hash: hash.to_string(),
            })
        })?;
        let asset = handle
            .db
            .pool
            .with_reader(|conn| asset_ops::get_asset(conn, hash))?
            .ok_or_else(|| ServiceError::AssetNotFound {
                hash: hash.to_string(),
            })?;
        Ok((asset, handle.dir.clone()))
    }
}
