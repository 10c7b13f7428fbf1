//! Level-routed log files under `<workdir>/.internal/logs/`.
//!
//! One file per level per process start, named by the unix second the
//! writer was opened: `logs/{debug,info,warn,error}/<unix>.log`. Wired
//! into `tracing-subscriber` as the fmt layer's writer.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

use mashbank_core::constants::INTERNAL_DIR;
use mashbank_core::errors::MashResult;

const LEVEL_DIRS: [(&str, Level); 4] = [
    ("debug", Level::DEBUG),
    ("info", Level::INFO),
    ("warn", Level::WARN),
    ("error", Level::ERROR),
];

/// Routes each event to its level's file. TRACE shares the debug file.
pub struct LevelFileWriter {
    debug: Mutex<File>,
    info: Mutex<File>,
    warn: Mutex<File>,
    error: Mutex<File>,
}

impl LevelFileWriter {
    /// Open the four level files, creating the directory tree.
    pub fn open(workdir: &Path, unix_now: i64) -> MashResult<Self> {
        let logs = workdir.join(INTERNAL_DIR).join("logs");
        let mut files = Vec::with_capacity(LEVEL_DIRS.len());
        for (dir, _) in LEVEL_DIRS {
            let dir_path = logs.join(dir);
            std::fs::create_dir_all(&dir_path)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir_path.join(format!("{unix_now}.log")))?;
            files.push(Mutex::new(file));
        }
        let mut files = files.into_iter();
        Ok(Self {
            debug: files.next().expect("four files"),
            info: files.next().expect("four files"),
            warn: files.next().expect("four files"),
            error: files.next().expect("four files"),
        })
    }

    fn slot(&self, level: &Level) -> &Mutex<File> {
        match *level {
            Level::ERROR => &self.error,
            Level::WARN => &self.warn,
            Level::INFO => &self.info,
            _ => &self.debug,
        }
    }
}

/// A guard writing into one level's file.
pub struct LevelGuard<'a> {
    file: &'a Mutex<File>,
}

impl io::Write for LevelGuard<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut file = self.file.lock().unwrap_or_else(|e| e.into_inner());
        file.flush()
    }
}

impl<'a> MakeWriter<'a> for LevelFileWriter {
    type Writer = LevelGuard<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LevelGuard { file: &self.info }
    }

    fn make_writer_for(&'a self, meta: &tracing::Metadata<'_>) -> Self::Writer {
        LevelGuard {
            file: self.slot(meta.level()),
        }
    }
}

/// Install the global subscriber: env-filtered stderr plus the
/// level-routed files. Call once at startup, after the workdir is known.
pub fn init_logging(workdir: &Path, unix_now: i64) -> MashResult<()> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let files = LevelFileWriter::open(workdir, unix_now)?;
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(files);
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| {
            mashbank_core::errors::MashError::new(
                mashbank_core::errors::ErrorCode::InternalError,
                format!("init logging: {e}"),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_files_created_and_routed() {
        let dir = tempfile::tempdir().unwrap();
        let writer = LevelFileWriter::open(dir.path(), 1_700_000_000).unwrap();

        for (name, _) in LEVEL_DIRS {
            assert!(dir
                .path()
                .join(".internal/logs")
                .join(name)
                .join("1700000000.log")
                .exists());
        }

        // Route a line into the warn file and observe it there.
        {
            let meta_writer = writer.slot(&Level::WARN);
            let mut guard = LevelGuard { file: meta_writer };
            guard.write_all(b"warn line\n").unwrap();
            guard.flush().unwrap();
        }
        let warn_contents = std::fs::read_to_string(
            dir.path().join(".internal/logs/warn/1700000000.log"),
        )
        .unwrap();
        assert!(warn_contents.contains("warn line"));
        let info_contents = std::fs::read_to_string(
            dir.path().join(".internal/logs/info/1700000000.log"),
        )
        .unwrap();
        assert!(info_contents.is_empty());
    }
}
