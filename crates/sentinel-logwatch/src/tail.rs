//! Polling tail over one growing log file.
//!
//! Starts at the end of the file, returns complete lines only (a partial
//! line at EOF is buffered until its newline arrives), and starts over from
//! offset 0 when the file is truncated or replaced.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct LogTail {
    path: PathBuf,
    reader: BufReader<File>,
    /// Byte offset of the next unread byte.
    offset: u64,
    /// Inode of the open file (0 when unknown).
    inode: u64,
    /// Bytes of an unterminated line read at EOF.
    partial: Vec<u8>,
}

impl LogTail {
    /// Open `path` positioned at its current end.
    pub fn open(path: &Path) -> io::Result<Self> {
        let mut tail = Self::open_at_start(path)?;
        tail.offset = tail.reader.seek(SeekFrom::End(0))?;
        Ok(tail)
    }

    /// Open `path` positioned at offset 0.
    pub fn open_at_start(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let inode = inode_of(&file.metadata()?);
        Ok(Self {
            path: path.to_path_buf(),
            reader: BufReader::new(file),
            offset: 0,
            inode,
            partial: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Every complete line appended since the last poll, newline removed,
    /// in file order. An empty result means EOF with nothing new.
    pub fn poll_lines(&mut self) -> io::Result<Vec<String>> {
        self.detect_reset()?;

        let mut lines = Vec::new();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let n = self.reader.read_until(b'\n', &mut buf)?;
            if n == 0 {
                break;
            }
            self.offset += n as u64;
            if buf.last() == Some(&b'\n') {
                let mut bytes = std::mem::take(&mut self.partial);
                bytes.extend_from_slice(&buf);
                lines.push(decode_line(&bytes));
            } else {
                self.partial.extend_from_slice(&buf);
            }
        }
        Ok(lines)
    }

    /// Rewind when the file shrank under us, reopen when the path now
    /// names a different file. A missing path keeps the current handle.
    fn detect_reset(&mut self) -> io::Result<()> {
        if let Ok(meta) = fs::metadata(&self.path) {
            let inode = inode_of(&meta);
            if inode != 0 && self.inode != 0 && inode != self.inode {
                let path = self.path.clone();
                *self = Self::open_at_start(&path)?;
                return Ok(());
            }
        }
        let len = self.reader.get_ref().metadata()?.len();
        if len < self.offset {
            self.offset = self.reader.seek(SeekFrom::Start(0))?;
            self.partial.clear();
        }
        Ok(())
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let line = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line).into_owned()
}

#[cfg(unix)]
fn inode_of(meta: &fs::Metadata) -> u64 {
    use std::os::unix::fs::MetadataExt;
    meta.ino()
}

#[cfg(not(unix))]
fn inode_of(_meta: &fs::Metadata) -> u64 {
    0
}
