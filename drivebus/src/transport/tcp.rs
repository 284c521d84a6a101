//! TCP client capability set.
//!
//! Second driver in the probe order, for drives behind serial-to-Ethernet
//! bridges. Claims names of the form `host:port`. The connection is made
//! with a bounded connect timeout; reads use the same bounded interval as
//! the serial driver and map a timeout to a 0-byte short read.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::driver::{BusDriver, BusPort, MiscOperation, READ_TIMEOUT_MS};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Built-in TCP transport driver.
pub struct TcpDriver;

/// Resolve `name` when it follows the `host:port` convention.
///
/// The port must parse as a number before any resolution happens, so
/// serial-style names never trigger a DNS lookup.
pub(crate) fn parse_name(name: &str) -> Option<SocketAddr> {
    let (host, port) = name.rsplit_once(':')?;
    if host.is_empty() || port.parse::<u16>().is_err() {
        return None;
    }
    if let Ok(addr) = name.parse::<SocketAddr>() {
        return Some(addr);
    }
    name.to_socket_addrs().ok()?.next()
}

impl BusDriver for TcpDriver {
    fn name(&self) -> &'static str {
        "tcp"
    }

    fn open(&self, device_name: &str, _baud_rate: u32) -> io::Result<Box<dyn BusPort>> {
        let Some(addr) = parse_name(device_name) else {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "not a host:port name",
            ));
        };

        let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)?;
        stream.set_read_timeout(Some(Duration::from_millis(READ_TIMEOUT_MS)))?;
        // single bytes must not sit in the Nagle queue
        stream.set_nodelay(true)?;
        Ok(Box::new(TcpBusPort { stream }))
    }
}

struct TcpBusPort {
    stream: TcpStream,
}

impl BusPort for TcpBusPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.stream.read(buf) {
            Ok(n) => Ok(n),
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::TimedOut =>
            {
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn misc_operation(&mut self, op: MiscOperation) -> io::Result<()> {
        match op {
            MiscOperation::PurgeRx => self.drain_pending(),
            // the kernel owns the send queue; nothing to drain here
            MiscOperation::FlushTx => self.stream.flush(),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Err(e) if e.kind() != io::ErrorKind::NotConnected => Err(e),
            _ => Ok(()),
        }
    }
}

impl TcpBusPort {
    /// Discard whatever the peer sent before now, without blocking.
    fn drain_pending(&mut self) -> io::Result<()> {
        self.stream.set_nonblocking(true)?;
        let mut scratch = [0u8; 256];
        let result = loop {
            match self.stream.read(&mut scratch) {
                // peer closed; nothing more to discard
                Ok(0) => break Ok(()),
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        self.stream.set_nonblocking(false)?;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("127.0.0.1:4001", true; "ip and port")]
    #[test_case("localhost:4001", true; "hostname and port")]
    #[test_case("[::1]:4001", true; "ipv6 and port")]
    #[test_case("127.0.0.1", false; "no port")]
    #[test_case("127.0.0.1:notaport", false; "bad port")]
    #[test_case("/dev/ttyUSB0", false; "serial path")]
    #[test_case(":4001", false; "empty host")]
    fn name_convention(name: &str, expected: bool) {
        assert_eq!(parse_name(name).is_some(), expected);
    }

    #[test]
    fn open_rejects_foreign_names_fast() {
        let err = TcpDriver
            .open("/dev/ttyUSB0", 460_800)
            .map(|_| ())
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
