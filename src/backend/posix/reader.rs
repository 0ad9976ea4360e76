//! Timed reads over a blocking tty.

use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

use super::stty::SttyRunner;
use crate::error::{Result, TtyError};
use crate::stream::{InputStream, ReadStatus};

/// Wakes a thread waiting in a timed [`PtyReader`] read.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    flag: Arc<AtomicBool>,
}

impl InterruptHandle {
    /// Make the current or next timed read fail with
    /// [`TtyError::Interrupted`].
    pub fn interrupt(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        self.flag.swap(false, Ordering::SeqCst)
    }
}

struct ReaderState {
    source: Box<dyn Read + Send>,
    pending: Option<u8>,
    polling: bool,
}

/// Byte reader over a tty device.
///
/// Holds at most one byte for [`peek`](InputStream::peek). The first read
/// with a timeout switches the device to `min 0 time 1`, after which every
/// device read returns within a tenth of a second and the reader polls
/// until data, the deadline or an interrupt.
pub struct PtyReader {
    state: Mutex<ReaderState>,
    interrupt: InterruptHandle,
    runner: Arc<dyn SttyRunner>,
}

impl PtyReader {
    /// Wrap `source`, using `runner` to switch the device into polling mode.
    pub fn new(source: Box<dyn Read + Send>, runner: Arc<dyn SttyRunner>) -> Self {
        Self {
            state: Mutex::new(ReaderState {
                source,
                pending: None,
                polling: false,
            }),
            interrupt: InterruptHandle::default(),
            runner,
        }
    }

    /// Handle for interrupting timed reads from another thread.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Forget the polling switch, e.g. after attributes were replaced.
    pub fn reset_mode(&self) -> Result<()> {
        self.lock()?.polling = false;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, ReaderState>> {
        self.state.lock().map_err(|_| TtyError::LockPoisoned)
    }

    fn next(&self, timeout: Option<Duration>, consume: bool) -> Result<ReadStatus> {
        let mut state = self.lock()?;
        if let Some(b) = state.pending {
            if consume {
                state.pending = None;
            }
            return Ok(ReadStatus::Byte(b));
        }

        let status = match timeout {
            None if !state.polling => read_blocking(&mut state.source)?,
            _ => {
                if !state.polling {
                    debug!("switching tty to polling reads");
                    self.runner
                        .run(&["min", "0", "time", "1"].map(String::from))?;
                    state.polling = true;
                }
                self.poll(&mut state.source, timeout)?
            }
        };

        if let (false, ReadStatus::Byte(b)) = (consume, status) {
            state.pending = Some(b);
        }
        Ok(status)
    }

    /// Poll a device in `min 0` mode, where a zero-length read means "no
    /// data yet".
    fn poll(
        &self,
        source: &mut Box<dyn Read + Send>,
        timeout: Option<Duration>,
    ) -> Result<ReadStatus> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut byte = [0u8; 1];
        loop {
            if self.interrupt.take() {
                return Err(TtyError::Interrupted);
            }
            match source.read(&mut byte) {
                Ok(1) => return Ok(ReadStatus::Byte(byte[0])),
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Ok(ReadStatus::Timeout);
            }
        }
    }
}

fn read_blocking(source: &mut Box<dyn Read + Send>) -> Result<ReadStatus> {
    let mut byte = [0u8; 1];
    loop {
        match source.read(&mut byte) {
            Ok(0) => return Ok(ReadStatus::Eof),
            Ok(_) => return Ok(ReadStatus::Byte(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

impl InputStream for PtyReader {
    fn read(&self, timeout: Option<Duration>) -> Result<ReadStatus> {
        self.next(timeout, true)
    }

    fn peek(&self, timeout: Option<Duration>) -> Result<ReadStatus> {
        self.next(timeout, false)
    }
}
