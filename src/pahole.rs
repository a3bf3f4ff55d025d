use anyhow::{Context, Result, bail};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStderr, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use crate::error::InspectError;
use crate::evaluate::{LayoutSource, MemberLines};

pub const PAHOLE_ENV: &str = "OBJSCAN_PAHOLE";

/// Handle on the pahole binary.
#[derive(Debug, Clone)]
pub struct Pahole {
    bin: PathBuf,
}

impl Pahole {
    pub fn new(bin: PathBuf) -> Self {
        Self { bin }
    }

    pub fn bin(&self) -> &Path {
        &self.bin
    }

    fn launch_error(&self, source: std::io::Error) -> InspectError {
        InspectError::Launch {
            bin: self.bin.clone(),
            source,
        }
    }

    /// Runs `pahole --sizes` into `out`.
    pub fn dump_sizes(&self, out: &Path) -> Result<()> {
        let file = File::create(out)
            .with_context(|| format!("Failed to create catalog file: {}", out.display()))?;

        let output = Command::new(&self.bin)
            .arg("--sizes")
            .stdin(Stdio::null())
            .stdout(file)
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| self.launch_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("pahole --sizes failed ({}): {}", output.status, stderr.trim());
        }
        Ok(())
    }
}

impl LayoutSource for Pahole {
    fn layout<'a>(&'a self, object: &str) -> Result<MemberLines<'a>, InspectError> {
        let mut child = Command::new(&self.bin)
            .arg("-E")
            .arg(object)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.launch_error(e))?;

        // stderr is drained concurrently so a chatty child cannot block on a
        // full pipe while stdout is still being read.
        let stderr = child.stderr.take().map(drain);

        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            join_stderr(stderr);
            return Err(InspectError::Read {
                object: object.to_string(),
                source: std::io::Error::other("stdout was not captured"),
            });
        };

        Ok(Box::new(LayoutStream {
            object: object.to_string(),
            child,
            reader: BufReader::new(stdout),
            buf: Vec::new(),
            stderr,
            finished: false,
        }))
    }
}

fn drain(mut pipe: ChildStderr) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut raw = Vec::new();
        let _ = pipe.read_to_end(&mut raw);
        String::from_utf8_lossy(&raw).into_owned()
    })
}

fn join_stderr(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Streams `pahole -E` output. Dropping it early kills the child.
struct LayoutStream {
    object: String,
    child: Child,
    reader: BufReader<ChildStdout>,
    buf: Vec<u8>,
    stderr: Option<JoinHandle<String>>,
    finished: bool,
}

impl LayoutStream {
    fn read_error(&self, source: std::io::Error) -> InspectError {
        InspectError::Read {
            object: self.object.clone(),
            source,
        }
    }

    fn finish(&mut self) -> Result<(), InspectError> {
        let status = self.child.wait();
        let stderr = join_stderr(self.stderr.take());
        let status = status.map_err(|e| self.read_error(e))?;
        if !status.success() {
            return Err(InspectError::Failed {
                object: self.object.clone(),
                status,
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(())
    }
}

impl Iterator for LayoutStream {
    type Item = Result<String, InspectError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => {
                self.finished = true;
                self.finish().err().map(Err)
            }
            Ok(_) => {
                while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
                    self.buf.pop();
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => {
                self.finished = true;
                let _ = self.child.kill();
                let _ = self.child.wait();
                join_stderr(self.stderr.take());
                Some(Err(self.read_error(e)))
            }
        }
    }
}

impl Drop for LayoutStream {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
            join_stderr(self.stderr.take());
        }
    }
}
