//! Pseudo-terminal for shell panes
//!
//! Owns the master side of a PTY pair and the shell running on the slave
//! side. Output is read on a background thread and handed over through a
//! channel so the UI loop never blocks on the child.

use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use portable_pty::{native_pty_system, Child, ChildKiller, CommandBuilder, MasterPty, PtySize};
use tracing::{debug, warn};

use super::{ContentError, Result};

/// Running shell attached to a PTY
pub struct PtyHandle {
    master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    child: Box<dyn Child + Send + Sync>,
    /// Cleared by the reader thread at EOF and on drop
    running: Arc<AtomicBool>,
    reader_thread: Option<JoinHandle<()>>,
}

impl PtyHandle {
    /// Spawn `program` on a new PTY; returns the handle and its output channel
    pub fn spawn(program: &str, cols: u16, rows: u16) -> Result<(Self, Receiver<Vec<u8>>)> {
        let spawn_error = |message: String| ContentError::Spawn {
            program: program.to_string(),
            message,
        };

        let pair = native_pty_system()
            .openpty(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| spawn_error(format!("failed to open PTY: {e}")))?;

        let mut cmd = CommandBuilder::new(program);
        // Transcript rendering understands line editing only
        cmd.env("TERM", "dumb");

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| spawn_error(e.to_string()))?;
        // The slave end must close here so the reader sees EOF when the shell exits
        drop(pair.slave);

        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| spawn_error(format!("failed to clone reader: {e}")))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| spawn_error(format!("failed to take writer: {e}")))?;

        let running = Arc::new(AtomicBool::new(true));
        let (tx, rx) = mpsc::channel::<Vec<u8>>();

        let flag = running.clone();
        let reader_thread = thread::spawn(move || {
            let mut buffer = vec![0u8; 4096];
            loop {
                if !flag.load(Ordering::SeqCst) {
                    break;
                }
                match reader.read(&mut buffer) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(buffer[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            }
            flag.store(false, Ordering::SeqCst);
        });

        debug!("Spawned {} on a {}x{} PTY", program, cols, rows);
        Ok((
            Self {
                master: pair.master,
                writer,
                child,
                running,
                reader_thread: Some(reader_thread),
            },
            rx,
        ))
    }

    /// Send raw bytes to the shell
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data).map_err(ContentError::Input)?;
        self.writer.flush().map_err(ContentError::Input)
    }

    pub fn resize(&self, cols: u16, rows: u16) {
        let size = PtySize {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        };
        if let Err(e) = self.master.resize(size) {
            warn!("PTY resize to {}x{} failed: {}", cols, rows, e);
        }
    }

    /// Exit code once the shell has terminated
    pub fn try_wait(&mut self) -> Option<u32> {
        match self.child.try_wait() {
            Ok(Some(status)) => Some(status.exit_code()),
            _ => None,
        }
    }
}

impl Drop for PtyHandle {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if self.try_wait().is_none() {
            if let Err(e) = self.child.kill() {
                debug!("Failed to kill shell: {}", e);
            }
        }
        // The reader ends at EOF once the child is gone; do not wait for it
        if let Some(handle) = self.reader_thread.take() {
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
    }
}
