//! An in-process [`RemoteSession`] with FTP-like rules.

use std::collections::BTreeMap;
use std::io::Read;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use super::session::{EntryKind, RemoteEntry, RemoteError, RemoteSession};
use crate::VfsPath;

#[derive(Debug, Clone)]
enum Node {
    File { data: Vec<u8>, modified: SystemTime },
    Dir { modified: SystemTime },
}

impl Node {
    fn entry(&self, name: &str) -> RemoteEntry {
        match self {
            Node::File { data, modified } => RemoteEntry {
                name: name.to_owned(),
                kind: EntryKind::File,
                size: data.len() as u64,
                modified: *modified,
            },
            Node::Dir { modified } => RemoteEntry {
                name: name.to_owned(),
                kind: EntryKind::Folder,
                size: 0,
                modified: *modified,
            },
        }
    }
}

#[derive(Debug)]
struct State {
    nodes: BTreeMap<VfsPath, Node>,
    commands: Vec<String>,
    injected: Vec<(&'static str, RemoteError)>,
    quit: bool,
}

impl State {
    fn begin(&mut self, command: &'static str, arg: &str) -> Result<VfsPath, RemoteError> {
        self.commands.push(if arg.is_empty() {
            command.to_owned()
        } else {
            format!("{command} {arg}")
        });
        if self.quit {
            return Err(RemoteError::new(421, "service not available"));
        }
        if let Some(i) = self.injected.iter().position(|(c, _)| *c == command) {
            return Err(self.injected.remove(i).1);
        }
        Ok(VfsPath::new(arg).normalize())
    }

    fn is_dir(&self, path: &VfsPath) -> bool {
        matches!(self.nodes.get(path), Some(Node::Dir { .. }))
    }

    fn children(&self, path: &VfsPath) -> impl Iterator<Item = (&VfsPath, &Node)> {
        let depth = path.names().len() + 1;
        self.nodes
            .iter()
            .filter(move |(k, _)| k.names().len() == depth && k.starts_with(path))
    }
}

fn unavailable(message: &str) -> RemoteError {
    RemoteError::new(550, message)
}

/// A loopback session that keeps its tree in memory.
///
/// Clones share the same tree and command log, so a test can keep a handle
/// while a provider owns the session. Like a real FTP server it never
/// creates parents, refuses to rename onto an existing name, only removes
/// empty directories, and includes `.` and `..` in listings.
#[derive(Debug, Clone)]
pub struct LoopbackSession {
    state: Arc<Mutex<State>>,
}

impl LoopbackSession {
    /// A session over an empty tree.
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            VfsPath::root(),
            Node::Dir {
                modified: SystemTime::now(),
            },
        );
        Self {
            state: Arc::new(Mutex::new(State {
                nodes,
                commands: Vec::new(),
                injected: Vec::new(),
                quit: false,
            })),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every command received so far, as `"VERB /path"`.
    pub fn commands(&self) -> Vec<String> {
        self.state().commands.clone()
    }

    /// Returns `true` once `quit` has been received.
    pub fn is_quit(&self) -> bool {
        self.state().quit
    }

    /// Make the next `command` (`"LIST"`, `"RETR"`, `"STOR"`, `"DELE"`,
    /// `"RMD"`, `"RNFR"`, `"MKD"`, `"QUIT"`) fail with `error`.
    pub fn inject(&self, command: &'static str, error: RemoteError) {
        self.state().injected.push((command, error));
    }
}

impl Default for LoopbackSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteSession for LoopbackSession {
    fn list(&mut self, path: &str) -> Result<Vec<RemoteEntry>, RemoteError> {
        let mut state = self.state();
        let path = state.begin("LIST", path)?;
        match state.nodes.get(&path) {
            Some(dir @ Node::Dir { .. }) => {
                let parent = Node::Dir {
                    modified: SystemTime::UNIX_EPOCH,
                };
                let mut out = vec![dir.entry("."), parent.entry("..")];
                out.extend(state.children(&path).map(|(k, node)| node.entry(k.name())));
                Ok(out)
            }
            Some(Node::File { .. }) => Err(unavailable("not a directory")),
            None => Err(unavailable("no such file or directory")),
        }
    }

    fn retrieve(&mut self, path: &str) -> Result<Vec<u8>, RemoteError> {
        let mut state = self.state();
        let path = state.begin("RETR", path)?;
        match state.nodes.get(&path) {
            Some(Node::File { data, .. }) => Ok(data.clone()),
            _ => Err(unavailable("no such file")),
        }
    }

    fn store(&mut self, path: &str, data: &mut dyn Read) -> Result<(), RemoteError> {
        let mut state = self.state();
        let path = state.begin("STOR", path)?;
        if !state.is_dir(&path.parent()) {
            return Err(unavailable("no such directory"));
        }
        if state.is_dir(&path) {
            return Err(RemoteError::new(553, "could not create file"));
        }
        let mut bytes = Vec::new();
        data.read_to_end(&mut bytes)
            .map_err(|e| RemoteError::new(426, e.to_string()))?;
        state.nodes.insert(
            path,
            Node::File {
                data: bytes,
                modified: SystemTime::now(),
            },
        );
        Ok(())
    }

    fn delete(&mut self, path: &str) -> Result<(), RemoteError> {
        let mut state = self.state();
        let path = state.begin("DELE", path)?;
        match state.nodes.get(&path) {
            Some(Node::File { .. }) => {
                state.nodes.remove(&path);
                Ok(())
            }
            _ => Err(unavailable("no such file")),
        }
    }

    fn remove_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        let mut state = self.state();
        let path = state.begin("RMD", path)?;
        if path.is_root() || !state.is_dir(&path) {
            return Err(unavailable("no such directory"));
        }
        if state.children(&path).next().is_some() {
            return Err(unavailable("directory not empty"));
        }
        state.nodes.remove(&path);
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), RemoteError> {
        let mut state = self.state();
        let from = state.begin("RNFR", from)?;
        let to = VfsPath::new(to).normalize();
        state.commands.push(format!("RNTO {to}"));
        if from.is_root() || !state.nodes.contains_key(&from) {
            return Err(unavailable("no such file or directory"));
        }
        if state.nodes.contains_key(&to) {
            return Err(RemoteError::new(553, "target exists"));
        }
        if !state.is_dir(&to.parent()) || to.starts_with(&from) {
            return Err(unavailable("no such directory"));
        }
        let moved: Vec<VfsPath> = state
            .nodes
            .keys()
            .filter(|k| k.starts_with(&from))
            .cloned()
            .collect();
        for key in moved {
            if let Some(node) = state.nodes.remove(&key) {
                state.nodes.insert(to.join(&key.trim_prefix(&from)), node);
            }
        }
        Ok(())
    }

    fn make_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        let mut state = self.state();
        let path = state.begin("MKD", path)?;
        if state.nodes.contains_key(&path) {
            return Err(unavailable("file exists"));
        }
        if !state.is_dir(&path.parent()) {
            return Err(unavailable("no such directory"));
        }
        state.nodes.insert(
            path,
            Node::Dir {
                modified: SystemTime::now(),
            },
        );
        Ok(())
    }

    fn quit(&mut self) -> Result<(), RemoteError> {
        let mut state = self.state();
        state.begin("QUIT", "")?;
        state.quit = true;
        Ok(())
    }
}
