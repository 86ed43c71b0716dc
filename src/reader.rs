use anyhow::{Context, Result};
use std::{
    fs::File,
    io::{self, BufRead, BufReader, ErrorKind, Read},
    iter::FusedIterator,
    path::Path,
    process::{Child, Command, ExitStatus, Stdio},
};

pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum LogFileType {
    Plain,
    Gzip,
    Zstd,
    Xz,
}

impl LogFileType {
    pub fn deduce(filename: &str) -> Self {
        if filename.ends_with(".gz") {
            LogFileType::Gzip
        } else if filename.ends_with(".zst") {
            LogFileType::Zstd
        } else if filename.ends_with(".xz") {
            LogFileType::Xz
        } else {
            LogFileType::Plain
        }
    }

    fn decompressor(&self) -> Option<&'static str> {
        match self {
            LogFileType::Plain => None,
            LogFileType::Gzip => Some("zcat"),
            LogFileType::Zstd => Some("zstdcat"),
            LogFileType::Xz => Some("xzcat"),
        }
    }
}

/// Owns the decompressor process.
///
/// [`finish`](ChildGuard::finish) reaps it and turns a non-zero exit into an
/// error; a guard dropped before that kills the process first.
struct ChildGuard {
    prog: &'static str,
    child: Child,
    status: Option<ExitStatus>,
}

impl ChildGuard {
    fn finish(&mut self) -> io::Result<()> {
        let status = match self.status {
            Some(status) => status,
            None => {
                let status = self.child.wait()?;
                self.status = Some(status);
                status
            }
        };
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::new(
                ErrorKind::Other,
                format!("{} exited with {}", self.prog, status),
            ))
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if self.status.is_none() {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Raw bytes of a log file, decompressed if needed.
///
/// End of input from a decompressor only counts as EOF once the process has
/// exited successfully, so a truncated archive is a read error rather than a
/// short log. Field order matters: the pipe is closed before the child is
/// reaped.
pub struct LogSource {
    inner: Box<dyn Read>,
    child: Option<ChildGuard>,
}

impl Read for LogSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 && !buf.is_empty() {
            if let Some(child) = self.child.as_mut() {
                child.finish()?;
            }
        }
        Ok(n)
    }
}

pub fn open_log(path: &Path) -> Result<LogSource> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    // decide whether directly read the file, or use a decompressor
    match LogFileType::deduce(filename).decompressor() {
        None => {
            let file =
                File::open(path).with_context(|| format!("open {} failed", path.display()))?;
            Ok(LogSource {
                inner: Box::new(file),
                child: None,
            })
        }
        Some(prog) => {
            let mut child = Command::new(prog)
                .arg(path)
                .stdout(Stdio::piped())
                .spawn()
                .with_context(|| format!("spawn {} failed", prog))?;
            let stdout = child.stdout.take().context("get decompressor stdout failed")?;
            Ok(LogSource {
                inner: Box::new(stdout),
                child: Some(ChildGuard {
                    prog,
                    child,
                    status: None,
                }),
            })
        }
    }
}

/// Lazy sequence of line batches, at most `chunk_size` lines each.
///
/// Only one batch is held at a time. Once the input is exhausted or a read
/// fails the iterator stays exhausted.
pub struct ChunkedReader<R> {
    reader: R,
    chunk_size: usize,
    buf: Vec<u8>,
    done: bool,
}

impl ChunkedReader<BufReader<LogSource>> {
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self> {
        Ok(Self::new(BufReader::new(open_log(path)?), chunk_size))
    }
}

impl<R: BufRead> ChunkedReader<R> {
    pub fn new(reader: R, chunk_size: usize) -> Self {
        ChunkedReader {
            reader,
            chunk_size: chunk_size.max(1),
            buf: Vec::new(),
            done: false,
        }
    }
}

fn trim_newline(mut line: &[u8]) -> &[u8] {
    if let Some(rest) = line.strip_suffix(b"\n") {
        line = rest;
    }
    if let Some(rest) = line.strip_suffix(b"\r") {
        line = rest;
    }
    line
}

impl<R: BufRead> Iterator for ChunkedReader<R> {
    type Item = io::Result<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut chunk = Vec::with_capacity(self.chunk_size.min(4096));
        while chunk.len() < self.chunk_size {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    break;
                }
                Ok(_) => {
                    // nginx escapes most bytes, but do not abort on stray invalid UTF-8
                    let line = String::from_utf8_lossy(trim_newline(&self.buf)).into_owned();
                    chunk.push(line);
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        if chunk.is_empty() {
            None
        } else {
            Some(Ok(chunk))
        }
    }
}

impl<R: BufRead> FusedIterator for ChunkedReader<R> {}
