//! Scripted in-memory transport for tests and dependency injection.
//!
//! [`MockDriver`] hands out [`MockPort`]s that read from a preloaded
//! script and record everything written to a log shared with the driver,
//! so a test can open handles through the normal registry path and then
//! inspect what reached the "wire". Failures (open, purge, short writes,
//! close) are injectable per driver.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::driver::{BusDriver, BusPort, MiscOperation};

#[derive(Default)]
struct Shared {
    written: Mutex<Vec<u8>>,
    misc_ops: Mutex<Vec<MiscOperation>>,
    baud_rates: Mutex<Vec<u32>>,
    opens: AtomicUsize,
    closes: AtomicUsize,
    misc_failures: AtomicUsize,
}

/// Driver producing scripted in-memory ports.
///
/// Cheap to construct per test; builder methods configure the behavior of
/// every port it opens.
#[derive(Default)]
pub struct MockDriver {
    shared: Arc<Shared>,
    prefix: Option<&'static str>,
    rx_script: Vec<u8>,
    write_limit: Option<usize>,
    read_overreport: Option<usize>,
    fail_open: bool,
    fail_close: bool,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only claim device names starting with `prefix`, like a real
    /// driver's name convention.
    pub fn with_prefix(mut self, prefix: &'static str) -> Self {
        self.prefix = Some(prefix);
        self
    }

    /// Bytes each opened port will serve to `read`.
    pub fn with_rx(mut self, script: &[u8]) -> Self {
        self.rx_script = script.to_vec();
        self
    }

    /// Accept at most `limit` bytes per write call (a short write).
    pub fn with_write_limit(mut self, limit: usize) -> Self {
        self.write_limit = Some(limit);
        self
    }

    /// Make `read` claim `count` transferred bytes regardless of reality.
    pub fn with_read_overreport(mut self, count: usize) -> Self {
        self.read_overreport = Some(count);
        self
    }

    /// Every open attempt fails.
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// The first misc operation after open fails, which is the mandatory
    /// receive purge.
    pub fn failing_purge(self) -> Self {
        self.shared.misc_failures.store(1, Ordering::SeqCst);
        self
    }

    /// Port close calls report an error.
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Arm a failure for the next misc operation on any of this driver's
    /// ports.
    pub fn fail_next_misc(&self) {
        self.shared.misc_failures.fetch_add(1, Ordering::SeqCst);
    }

    /// Every byte written through any port of this driver, in order.
    pub fn written(&self) -> Vec<u8> {
        self.shared.written.lock().unwrap().clone()
    }

    /// Every misc operation seen by this driver's ports, in order.
    pub fn misc_ops(&self) -> Vec<MiscOperation> {
        self.shared.misc_ops.lock().unwrap().clone()
    }

    /// Baud rates passed to open, in order.
    pub fn baud_rates(&self) -> Vec<u32> {
        self.shared.baud_rates.lock().unwrap().clone()
    }

    pub fn open_count(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }
}

impl BusDriver for MockDriver {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn open(&self, device_name: &str, baud_rate: u32) -> io::Result<Box<dyn BusPort>> {
        if let Some(prefix) = self.prefix {
            if !device_name.starts_with(prefix) {
                return Err(io::Error::new(
                    io::ErrorKind::NotFound,
                    "device name does not match mock prefix",
                ));
            }
        }
        if self.fail_open {
            return Err(io::Error::other("injected open failure"));
        }

        self.shared.opens.fetch_add(1, Ordering::SeqCst);
        self.shared.baud_rates.lock().unwrap().push(baud_rate);
        Ok(Box::new(MockPort {
            shared: Arc::clone(&self.shared),
            rx: self.rx_script.iter().copied().collect(),
            write_limit: self.write_limit,
            read_overreport: self.read_overreport,
            fail_close: self.fail_close,
        }))
    }
}

/// One scripted connection handed out by [`MockDriver`].
pub struct MockPort {
    shared: Arc<Shared>,
    rx: VecDeque<u8>,
    write_limit: Option<usize>,
    read_overreport: Option<usize>,
    fail_close: bool,
}

impl BusPort for MockPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(count) = self.read_overreport {
            return Ok(count);
        }
        let mut n = 0;
        while n < buf.len() {
            match self.rx.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.write_limit.map_or(buf.len(), |l| l.min(buf.len()));
        self.shared.written.lock().unwrap().extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn misc_operation(&mut self, op: MiscOperation) -> io::Result<()> {
        self.shared.misc_ops.lock().unwrap().push(op);
        let armed = &self.shared.misc_failures;
        if armed
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(io::Error::other("injected misc failure"));
        }
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.shared.closes.fetch_add(1, Ordering::SeqCst);
        if self.fail_close {
            return Err(io::Error::other("injected close failure"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_serves_script_then_runs_dry() {
        let driver = MockDriver::new().with_rx(&[0x01, 0x02]);
        let mut port = driver.open("mock0", 460_800).unwrap();

        let mut buf = [0u8; 4];
        assert_eq!(port.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[0x01, 0x02]);
        assert_eq!(port.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn write_limit_produces_short_writes() {
        let driver = MockDriver::new().with_write_limit(1);
        let mut port = driver.open("mock0", 460_800).unwrap();
        assert_eq!(port.write(&[0xaa, 0xbb]).unwrap(), 1);
        assert_eq!(driver.written(), vec![0xaa]);
    }

    #[test]
    fn misc_failure_fires_once() {
        let driver = MockDriver::new();
        let mut port = driver.open("mock0", 460_800).unwrap();
        driver.fail_next_misc();
        assert!(port.misc_operation(MiscOperation::PurgeRx).is_err());
        assert!(port.misc_operation(MiscOperation::PurgeRx).is_ok());
    }
}
