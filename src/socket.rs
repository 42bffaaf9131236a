//! Blocking transport (spec §4.1): a tagged [`Socket`] handle over plain
//! TCP, TLS, or UDP, with whole-message `read_exact`/`write_exact` and the
//! big-endian 8-byte size codec.
//!
//! Grounded in the teacher's `src/rust/netkit.rs` (`connect_tuned`: tuned
//! socket options via `socket2`, bounded connect) and in
//! `examples/other_examples/.../oasis-os__...tls_rustls.rs` for the
//! blocking `rustls::StreamOwned` read/write pattern this module uses
//! instead of the teacher's async `tokio-rustls` connector, per spec §4.1's
//! explicit "blocking socket I/O" requirement.

use std::io::{self, Read, Write};
use std::net::{Ipv4Addr, Shutdown, SocketAddr, SocketAddrV4, TcpStream, UdpSocket};
use std::sync::Arc;
use std::time::Duration;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, StreamOwned};
use socket2::{Domain, Socket as Socket2, TcpKeepalive, Type};

use crate::error::{ClipShareError, Result};

const CONNECT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
const DATA_TIMEOUT: Duration = Duration::from_millis(500);
const UDP_TIMEOUT: Duration = Duration::from_secs(2);
const CLOSE_AWAIT_TIMEOUT: Duration = Duration::from_millis(250);

/// Consecutive stalls (zero-progress reads/writes) tolerated before a
/// session fails (spec §4.1: "fail after 11 consecutive stalls").
const MAX_CONSECUTIVE_STALLS: u32 = 10;

/// One of {Invalid, Plain, Tls, Udp} -- exactly one is live at a time
/// (spec §3 "Socket Handle").
pub enum Socket {
    Invalid,
    Plain(TcpStream),
    Tls(Box<StreamOwned<ClientConnection, TcpStream>>),
    Udp(UdpSocket),
}

impl Socket {
    /// Connects to `addr:port`, optionally upgrading to TLS 1.2+ with
    /// mutual authentication. A single retry of the full connect (including
    /// the TLS handshake) is permitted on first failure (spec §4.1).
    pub fn connect(addr: Ipv4Addr, port: u16, tls_config: Option<Arc<ClientConfig>>) -> Result<Self> {
        match Self::connect_once(addr, port, tls_config.clone()) {
            Ok(sock) => Ok(sock),
            Err(first_err) => {
                tracing::warn!(%addr, port, error = %first_err, "connect failed, retrying once");
                Self::connect_once(addr, port, tls_config)
            }
        }
    }

    fn connect_once(addr: Ipv4Addr, port: u16, tls_config: Option<Arc<ClientConfig>>) -> Result<Self> {
        let sockaddr = SocketAddr::V4(SocketAddrV4::new(addr, port));
        let raw = Socket2::new(Domain::IPV4, Type::STREAM, None)
            .map_err(|e| ClipShareError::ConnectionFailure(format!("socket create: {e}")))?;
        raw.set_nodelay(true).ok();
        let keepalive = TcpKeepalive::new()
            .with_time(Duration::from_secs(30))
            .with_interval(Duration::from_secs(10));
        raw.set_tcp_keepalive(&keepalive).ok();
        raw.connect_timeout(&sockaddr.into(), CONNECT_HANDSHAKE_TIMEOUT)
            .map_err(|e| ClipShareError::ConnectionFailure(format!("connect: {e}")))?;
        raw.set_read_timeout(Some(CONNECT_HANDSHAKE_TIMEOUT)).ok();
        raw.set_write_timeout(Some(CONNECT_HANDSHAKE_TIMEOUT)).ok();
        let tcp: TcpStream = raw.into();

        let socket = match tls_config {
            None => Socket::Plain(tcp),
            Some(config) => {
                let server_name = ServerName::IpAddress(std::net::IpAddr::V4(addr).into());
                let conn = ClientConnection::new(config, server_name)
                    .map_err(|e| ClipShareError::ConnectionFailure(format!("TLS init: {e}")))?;
                let mut stream = StreamOwned::new(conn, tcp);
                stream
                    .conn
                    .complete_io(&mut stream.sock)
                    .map_err(|e| ClipShareError::ConnectionFailure(format!("TLS handshake: {e}")))?;
                Socket::Tls(Box::new(stream))
            }
        };

        socket.set_data_timeouts()?;
        Ok(socket)
    }

    /// Creates a broadcast-enabled UDP socket with the scanner's 2 s
    /// timeout (spec §4.1 `udp_socket`).
    pub fn udp() -> Result<Self> {
        let sock = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .map_err(|e| ClipShareError::ConnectionFailure(format!("udp bind: {e}")))?;
        sock.set_broadcast(true)
            .map_err(|e| ClipShareError::ConnectionFailure(format!("udp broadcast: {e}")))?;
        sock.set_read_timeout(Some(UDP_TIMEOUT)).ok();
        sock.set_write_timeout(Some(UDP_TIMEOUT)).ok();
        Ok(Socket::Udp(sock))
    }

    fn set_data_timeouts(&self) -> Result<()> {
        match self {
            Socket::Plain(s) => {
                s.set_read_timeout(Some(DATA_TIMEOUT)).ok();
                s.set_write_timeout(Some(DATA_TIMEOUT)).ok();
            }
            Socket::Tls(s) => {
                s.sock.set_read_timeout(Some(DATA_TIMEOUT)).ok();
                s.sock.set_write_timeout(Some(DATA_TIMEOUT)).ok();
            }
            Socket::Udp(_) | Socket::Invalid => {}
        }
        Ok(())
    }

    /// Reads exactly `buf.len()` bytes, retrying on transient stalls up to
    /// [`MAX_CONSECUTIVE_STALLS`] times and failing immediately on a fatal
    /// error class (spec §4.1).
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut total = 0usize;
        let mut stalls = 0u32;
        while total < buf.len() {
            let result = self.read_once(&mut buf[total..]);
            match result {
                Ok(0) => {
                    stalls += 1;
                    if stalls > MAX_CONSECUTIVE_STALLS {
                        return Err(ClipShareError::CommunicationFailure(io::Error::new(
                            io::ErrorKind::TimedOut,
                            "too many consecutive zero-progress reads",
                        )));
                    }
                }
                Ok(n) => {
                    total += n;
                    stalls = 0;
                }
                Err(e) if is_fatal(&e) => return Err(ClipShareError::CommunicationFailure(e)),
                Err(e) => {
                    stalls += 1;
                    if stalls > MAX_CONSECUTIVE_STALLS {
                        return Err(ClipShareError::CommunicationFailure(e));
                    }
                }
            }
        }
        Ok(())
    }

    /// Writes exactly `buf.len()` bytes with the same stall/fatal-error
    /// policy as [`Socket::read_exact`].
    pub fn write_exact(&mut self, buf: &[u8]) -> Result<()> {
        let mut total = 0usize;
        let mut stalls = 0u32;
        while total < buf.len() {
            let result = self.write_once(&buf[total..]);
            match result {
                Ok(0) => {
                    stalls += 1;
                    if stalls > MAX_CONSECUTIVE_STALLS {
                        return Err(ClipShareError::CommunicationFailure(io::Error::new(
                            io::ErrorKind::TimedOut,
                            "too many consecutive zero-progress writes",
                        )));
                    }
                }
                Ok(n) => {
                    total += n;
                    stalls = 0;
                }
                Err(e) if is_fatal(&e) => return Err(ClipShareError::CommunicationFailure(e)),
                Err(e) => {
                    stalls += 1;
                    if stalls > MAX_CONSECUTIVE_STALLS {
                        return Err(ClipShareError::CommunicationFailure(e));
                    }
                }
            }
        }
        Ok(())
    }

    fn read_once(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Socket::Plain(s) => s.read(buf),
            Socket::Tls(s) => s.read(buf),
            Socket::Udp(_) | Socket::Invalid => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "read_exact is not valid on this socket kind",
            )),
        }
    }

    fn write_once(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Socket::Plain(s) => s.write(buf),
            Socket::Tls(s) => s.write(buf),
            Socket::Udp(_) | Socket::Invalid => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "write_exact is not valid on this socket kind",
            )),
        }
    }

    /// Big-endian 8-byte signed length/sentinel codec (spec §4.1).
    pub fn write_size(&mut self, value: i64) -> Result<()> {
        self.write_exact(&value.to_be_bytes())
    }

    pub fn read_size(&mut self) -> Result<i64> {
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf)?;
        Ok(i64::from_be_bytes(buf))
    }

    /// Closes the socket, blocking briefly for one byte first so the peer
    /// can half-close cleanly (spec §3 "await" variant).
    pub fn close(&mut self) {
        match self {
            Socket::Plain(s) => {
                s.set_read_timeout(Some(CLOSE_AWAIT_TIMEOUT)).ok();
                let mut throwaway = [0u8; 1];
                let _ = s.read(&mut throwaway);
            }
            Socket::Tls(s) => {
                s.sock.set_read_timeout(Some(CLOSE_AWAIT_TIMEOUT)).ok();
                let mut throwaway = [0u8; 1];
                let _ = s.read(&mut throwaway);
            }
            Socket::Udp(_) | Socket::Invalid => {}
        }
        self.close_no_wait();
    }

    /// Closes immediately: best-effort TLS shutdown, then the underlying
    /// socket. Idempotent (spec §3).
    pub fn close_no_wait(&mut self) {
        match std::mem::replace(self, Socket::Invalid) {
            Socket::Plain(s) => {
                let _ = s.shutdown(Shutdown::Both);
            }
            Socket::Tls(mut s) => {
                let _ = s.conn.send_close_notify();
                let _ = s.conn.complete_io(&mut s.sock);
                let _ = s.sock.shutdown(Shutdown::Both);
            }
            Socket::Udp(_) | Socket::Invalid => {}
        }
    }
}

/// POSIX/WinSock/TLS error classes that abort a session immediately
/// without the stall-retry loop (spec §4.1).
fn is_fatal(e: &io::Error) -> bool {
    use io::ErrorKind::*;
    matches!(
        e.kind(),
        ConnectionReset
            | ConnectionAborted
            | NotConnected
            | BrokenPipe
            | AddrNotAvailable
            | PermissionDenied
            | UnexpectedEof
    )
}

impl Drop for Socket {
    fn drop(&mut self) {
        self.close_no_wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn plain_round_trip_write_size_read_size() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut sock = Socket::Plain(stream);
            let v = sock.read_size().unwrap();
            assert_eq!(v, 12345);
            sock.write_size(-1).unwrap();
        });

        let mut client = Socket::Plain(TcpStream::connect(addr).unwrap());
        client.write_size(12345).unwrap();
        assert_eq!(client.read_size().unwrap(), -1);
        server.join().unwrap();
    }

    #[test]
    fn write_exact_then_read_exact_matches_payload() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let payload = b"hello clipshare".to_vec();
        let expected = payload.clone();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut sock = Socket::Plain(stream);
            let mut buf = vec![0u8; expected.len()];
            sock.read_exact(&mut buf).unwrap();
            assert_eq!(buf, expected);
        });

        let mut client = Socket::Plain(TcpStream::connect(addr).unwrap());
        client.write_exact(&payload).unwrap();
        server.join().unwrap();
    }

    #[test]
    fn read_exact_fails_when_peer_closes_early() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            drop(stream);
        });

        let mut client = Socket::Plain(TcpStream::connect(addr).unwrap());
        let mut buf = [0u8; 16];
        let result = client.read_exact(&mut buf);
        assert!(result.is_err());
        server.join().unwrap();
    }
}
