//! Audit log follower: tails a single append-only text source, surviving
//! rotation and transient disappearance. Lines present before the follower
//! starts are skipped; the yielded sequence never ends.

use std::fs::{File, Metadata};
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Stable per-file identity token used to detect rotation. Device+inode on
/// Unix; creation time stands in on platforms without inode identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileIdentity(u64, u64);

impl FileIdentity {
    #[cfg(unix)]
    fn of(meta: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        FileIdentity(meta.dev(), meta.ino())
    }

    #[cfg(not(unix))]
    fn of(meta: &Metadata) -> Self {
        let created = meta
            .created()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        FileIdentity(created, 0)
    }
}

/// One read attempt against a stream of lines. `None` means "nothing new
/// yet" after a bounded idle sleep, never end-of-stream.
pub trait LineSource {
    fn poll(&mut self) -> Option<String>;
}

struct OpenFile {
    reader: BufReader<File>,
    identity: FileIdentity,
}

/// Follows one log file. All I/O happens in [`poll`](LogFollower::poll);
/// construction touches nothing, so the source may not exist yet.
pub struct LogFollower {
    path: PathBuf,
    idle: Duration,
    open: Option<OpenFile>,
    started: bool,
}

impl LogFollower {
    pub fn new(path: impl Into<PathBuf>, idle: Duration) -> Self {
        Self {
            path: path.into(),
            idle,
            open: None,
            started: false,
        }
    }

    fn open_file(&mut self, seek_end: bool) -> std::io::Result<()> {
        let file = File::open(&self.path)?;
        let identity = FileIdentity::of(&file.metadata()?);
        let mut reader = BufReader::new(file);
        if seek_end {
            reader.seek(SeekFrom::End(0))?;
        }
        self.open = Some(OpenFile { reader, identity });
        Ok(())
    }

    /// Re-stat the path after an empty read. A changed identity means the
    /// file was rotated: drop the old handle and resume from the new file's
    /// start. Lines appended to the old file after our last read are
    /// unrecoverable; that loss boundary is accepted, not worked around.
    fn check_rotation(&mut self) {
        let Some(current) = self.open.as_ref().map(|o| o.identity) else {
            return;
        };
        match std::fs::metadata(&self.path) {
            Ok(meta) => {
                if FileIdentity::of(&meta) != current {
                    info!(path = %self.path.display(), "log rotation detected, reopening");
                    self.open = None;
                    if let Err(e) = self.open_file(false) {
                        // File replaced again between stat and open; the next
                        // poll reopens from the new file's start.
                        debug!(error = %e, "reopen after rotation failed");
                    }
                }
            }
            // Source may briefly disappear mid-rotation; keep the handle and
            // retry on the next empty read.
            Err(_) => {}
        }
    }

    /// Single read attempt. Returns the next appended line, or `None` after a
    /// brief idle sleep when nothing new is available (source missing, empty
    /// read, or read error). The first successful open seeks to the current
    /// end, so pre-existing lines are skipped.
    pub fn poll(&mut self) -> Option<String> {
        if self.open.is_none() {
            let seek_end = !self.started;
            match self.open_file(seek_end) {
                Ok(()) => self.started = true,
                Err(_) => {
                    std::thread::sleep(self.idle);
                    return None;
                }
            }
        }
        let Some(open) = self.open.as_mut() else {
            return None;
        };
        let mut buf = String::new();
        match open.reader.read_line(&mut buf) {
            Ok(0) => {
                self.check_rotation();
                std::thread::sleep(self.idle);
                None
            }
            Ok(_) => {
                while buf.ends_with('\n') || buf.ends_with('\r') {
                    buf.pop();
                }
                Some(buf)
            }
            Err(e) => {
                debug!(error = %e, "read failed");
                self.check_rotation();
                std::thread::sleep(self.idle);
                None
            }
        }
    }
}

impl LineSource for LogFollower {
    fn poll(&mut self) -> Option<String> {
        LogFollower::poll(self)
    }
}

/// The lazy, infinite line sequence: blocks until the next line arrives.
impl Iterator for LogFollower {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            if let Some(line) = self.poll() {
                return Some(line);
            }
        }
    }
}
