//! Probe and session path over a real localhost TCP connection.
#![cfg(feature = "built-in-drivers")]

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;

use drivebus::{BusRegistry, MiscOperation};

#[test]
fn probe_opens_tcp_and_round_trips_bytes() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = [0u8; 3];
        stream.read_exact(&mut request).unwrap();
        stream.write_all(&[0x99]).unwrap();
        request
    });

    let mut registry = BusRegistry::new();
    // the serial driver declines host:port, the TCP driver claims it
    let bus = registry.open(&addr.to_string()).unwrap();

    for byte in [0x10, 0x20, 0x30] {
        registry.write_byte(bus, byte).unwrap();
    }
    registry.transmit(bus).unwrap();

    assert_eq!(registry.read_byte(bus).unwrap(), 0x99);

    registry.close(bus).unwrap();
    assert_eq!(server.join().unwrap(), [0x10, 0x20, 0x30]);
}

#[test]
fn purge_discards_bytes_sent_before_it() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut byte = [0u8; 1];
        // hello from the client, then stale noise, then the real reply
        stream.read_exact(&mut byte).unwrap();
        stream.write_all(&[0xde, 0xad]).unwrap();
        stream.read_exact(&mut byte).unwrap();
        stream.write_all(&[0x42]).unwrap();
        // hold the connection until the client is done reading
        let _ = stream.read(&mut byte);
    });

    let mut registry = BusRegistry::new();
    let bus = registry.open(&addr.to_string()).unwrap();

    registry.write_byte(bus, 0xaa).unwrap();
    registry.transmit(bus).unwrap();

    // wait for the noise to arrive, let it settle, then purge it away
    while registry.read_byte(bus).is_err() {}
    thread::sleep(std::time::Duration::from_millis(50));
    registry.misc_operation(bus, MiscOperation::PurgeRx).unwrap();

    registry.write_byte(bus, 0x01).unwrap();
    registry.transmit(bus).unwrap();

    assert_eq!(registry.read_byte(bus).unwrap(), 0x42);

    registry.close(bus).unwrap();
    server.join().unwrap();
}
