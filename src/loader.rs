//! Background session loading.
//!
//! Reading and building a session runs on a dedicated thread. The worker
//! reports progress and finally sends the finished [`DataStore`] over a
//! channel; the UI thread polls with [`SessionLoader::try_recv`] and applies
//! the payload itself. Dropping the loader cancels the worker and waits for
//! it.

use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};

use crate::model::DataStore;
use crate::session::{read_session, SessionError};

/// Shared cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Messages sent by the loading thread.
#[derive(Debug)]
pub enum LoadMessage {
    /// Human-readable progress step
    Progress(String),
    Loaded(DataStore),
    Failed(SessionError),
}

/// Handle on a loading thread.
pub struct SessionLoader {
    receiver: Receiver<LoadMessage>,
    cancel: CancelFlag,
    handle: Option<thread::JoinHandle<()>>,
    finished: bool,
}

impl SessionLoader {
    /// Spawns a thread that loads the session at `path`.
    pub fn spawn(path: PathBuf) -> io::Result<Self> {
        let (sender, receiver) = channel::unbounded();
        let cancel = CancelFlag::new();
        let worker_cancel = cancel.clone();

        let handle = thread::Builder::new()
            .name("session-loader".to_string())
            .spawn(move || Self::load(path, sender, worker_cancel))?;

        Ok(Self {
            receiver,
            cancel,
            handle: Some(handle),
            finished: false,
        })
    }

    fn load(path: PathBuf, sender: Sender<LoadMessage>, cancel: CancelFlag) {
        log::info!("loading session {:?}", path);
        // Send errors only mean the UI side is gone
        let _ = sender.send(LoadMessage::Progress(format!("Reading {}", path.display())));

        let result = read_session(&path).and_then(|session| {
            if cancel.is_cancelled() {
                return Err(SessionError::Cancelled);
            }
            let _ = sender.send(LoadMessage::Progress(format!(
                "Building {} sequences, {} tracks, {} regions",
                session.sequences.len(),
                session.tracks.len(),
                session.region_count()
            )));
            session.build_store(|| cancel.is_cancelled())
        });

        let message = match result {
            Ok(store) => {
                log::info!(
                    "loaded {:?}: {} sequences, {} regions",
                    path,
                    store.sequences().len(),
                    store.region_count()
                );
                LoadMessage::Loaded(store)
            }
            Err(e) => {
                log::warn!("loading {:?} failed: {}", path, e);
                LoadMessage::Failed(e)
            }
        };
        let _ = sender.send(message);
    }

    /// Returns the next message without blocking.
    pub fn try_recv(&mut self) -> Option<LoadMessage> {
        if self.finished {
            return None;
        }
        match self.receiver.try_recv() {
            Ok(message) => {
                if matches!(message, LoadMessage::Loaded(_) | LoadMessage::Failed(_)) {
                    self.finished = true;
                }
                Some(message)
            }
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.finished = true;
                None
            }
        }
    }

    /// Blocks until the loader finishes and returns its final message.
    pub fn wait(mut self) -> Option<LoadMessage> {
        while !self.finished {
            match self.receiver.recv() {
                Ok(LoadMessage::Progress(step)) => log::debug!("{}", step),
                Ok(message) => {
                    self.finished = true;
                    return Some(message);
                }
                Err(_) => self.finished = true,
            }
        }
        None
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for SessionLoader {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("session loader thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_cancelled());
        flag.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_load_in_background() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "sequences:\n  - {{ name: seq1, start: 0, end: 99 }}\ntracks:\n  - kind: region\n    name: motifs\n    regions:\n      seq1:\n        - {{ start: 1, end: 5, type: a }}\n"
        )
        .unwrap();

        let loader = SessionLoader::spawn(file.path().to_path_buf()).unwrap();
        match loader.wait() {
            Some(LoadMessage::Loaded(store)) => {
                assert_eq!(store.sequences().len(), 1);
                assert_eq!(store.region_count(), 1);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_failed_load() {
        let loader = SessionLoader::spawn(PathBuf::from("/nonexistent/session.yaml")).unwrap();
        assert!(matches!(loader.wait(), Some(LoadMessage::Failed(SessionError::Io { .. }))));
    }
}
