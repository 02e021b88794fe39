//! In-memory device used by the maintenance and app tests.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{Progress, Reporter};
use crate::remote::{ConnectParams, Connector, RemoteError, RemoteHost};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Shell(String),
    Read(String),
    Write(String),
    Stat(String),
    Upload { local: PathBuf, remote: String },
}

#[derive(Debug, Default)]
struct DeviceState {
    files: BTreeMap<String, Vec<u8>>,
    ops: Vec<Op>,
}

/// Hands out [`FakeHost`]s that share one device state.
#[derive(Debug, Default, Clone)]
pub struct FakeConnector {
    state: Arc<Mutex<DeviceState>>,
    connects: Arc<AtomicUsize>,
}

impl FakeConnector {
    pub fn put_file(&self, path: &str, contents: &[u8]) {
        self.lock().files.insert(path.to_string(), contents.to_vec());
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(path).cloned()
    }

    pub fn ops(&self) -> Vec<Op> {
        self.lock().ops.clone()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap()
    }
}

impl Connector for FakeConnector {
    fn connect(&self, _params: &ConnectParams) -> Result<Box<dyn RemoteHost>, RemoteError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeHost {
            state: Arc::clone(&self.state),
        }))
    }
}

pub struct FakeHost {
    state: Arc<Mutex<DeviceState>>,
}

impl RemoteHost for FakeHost {
    fn run_shell(&mut self, commands: &[String]) -> Result<String, RemoteError> {
        let mut state = self.state.lock().unwrap();
        for command in commands {
            state.ops.push(Op::Shell(command.clone()));

            let parts: Vec<&str> = command.split_whitespace().collect();
            if let ["mv", from, to] = parts.as_slice() {
                let contents = state.files.remove(*from).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::NotFound, format!("mv: {from}"))
                })?;
                state.files.insert((*to).to_string(), contents);
            }
        }
        Ok(String::new())
    }

    fn read_file(&mut self, path: &str) -> Result<Vec<u8>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::Read(path.to_string()));
        state
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()).into())
    }

    fn write_file(&mut self, path: &str, contents: &[u8]) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::Write(path.to_string()));
        state.files.insert(path.to_string(), contents.to_vec());
        Ok(())
    }

    fn exists(&mut self, path: &str) -> Result<bool, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::Stat(path.to_string()));
        Ok(state.files.contains_key(path))
    }

    fn upload(&mut self, local: &Path, remote: &str) -> Result<(), RemoteError> {
        let contents = std::fs::read(local)?;
        let mut state = self.state.lock().unwrap();
        state.ops.push(Op::Upload {
            local: local.to_path_buf(),
            remote: remote.to_string(),
        });
        state.files.insert(remote.to_string(), contents);
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingReporter {
    seen: Mutex<Vec<Progress>>,
}

impl RecordingReporter {
    pub fn seen(&self) -> Vec<Progress> {
        self.seen.lock().unwrap().clone()
    }
}

impl Reporter for RecordingReporter {
    fn progress(&self, progress: Progress) {
        self.seen.lock().unwrap().push(progress);
    }
}
