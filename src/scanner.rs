//! UDP peer-discovery scanner (spec §4.5): one thread per non-loopback
//! IPv4 interface, each broadcasting the `"in"` probe and collecting
//! replies that match [`crate::wire::INFO_NAME`] exactly.

use std::collections::HashSet;
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{ClipShareError, Result};
use crate::wire::{INFO_NAME, UDP_PROBE};

const MAX_INTERFACES: usize = 16;
const MAX_REPLIES_PER_INTERFACE: usize = 256;
const POLL_INTERVAL: Duration = Duration::from_millis(50);
const FIRST_RESPONSE_WINDOW: Duration = Duration::from_secs(2);
const STRAGGLER_WINDOW: Duration = Duration::from_millis(200);

struct LocalInterface {
    addr: Ipv4Addr,
    broadcast: Ipv4Addr,
}

fn broadcast_of(addr: Ipv4Addr, netmask: Ipv4Addr) -> Ipv4Addr {
    let a = u32::from(addr);
    let m = u32::from(netmask);
    Ipv4Addr::from(a | !m)
}

fn enumerate_interfaces() -> Result<Vec<LocalInterface>> {
    let ifaces = if_addrs::get_if_addrs()
        .map_err(|e| ClipShareError::LocalError(format!("interface enumeration: {e}")))?;
    let mut out = Vec::new();
    for iface in ifaces {
        if iface.is_loopback() {
            continue;
        }
        if let if_addrs::IfAddr::V4(v4) = iface.addr {
            out.push(LocalInterface {
                addr: v4.ip,
                broadcast: broadcast_of(v4.ip, v4.netmask),
            });
        }
    }
    out.truncate(MAX_INTERFACES);
    Ok(out)
}

fn scan_one_interface(iface: &LocalInterface, udp_port: u16, results: &Arc<Mutex<Vec<Ipv4Addr>>>) {
    let sock = match UdpSocket::bind(SocketAddrV4::new(iface.addr, 0)) {
        Ok(s) => s,
        Err(_) => return,
    };
    if sock.set_broadcast(true).is_err() {
        return;
    }
    if sock.set_read_timeout(Some(POLL_INTERVAL)).is_err() {
        return;
    }

    let target = SocketAddrV4::new(iface.broadcast, udp_port);
    if sock.send_to(UDP_PROBE, target).is_err() {
        return;
    }

    let started = Instant::now();
    let mut got_first = false;
    let mut straggler_deadline = Instant::now();
    let mut reply_count = 0usize;
    let mut buf = [0u8; 64];

    loop {
        let now = Instant::now();
        if !got_first && now.duration_since(started) >= FIRST_RESPONSE_WINDOW {
            break;
        }
        if got_first && now >= straggler_deadline {
            break;
        }
        if reply_count >= MAX_REPLIES_PER_INTERFACE {
            break;
        }

        match sock.recv_from(&mut buf) {
            Ok((n, std::net::SocketAddr::V4(from))) => {
                reply_count += 1;
                if &buf[..n] == INFO_NAME.as_bytes() {
                    results.lock().unwrap().push(*from.ip());
                    if !got_first {
                        got_first = true;
                        straggler_deadline = Instant::now() + STRAGGLER_WINDOW;
                    }
                }
            }
            Ok((_, std::net::SocketAddr::V6(_))) => {}
            Err(_) => continue,
        }
    }
}

/// Scans all non-loopback IPv4 interfaces for ClipShare peers, removing
/// local addresses and duplicates from the result (spec §4.5).
pub fn scan(udp_port: u16) -> Result<Vec<Ipv4Addr>> {
    let interfaces = enumerate_interfaces()?;
    let local_addrs: HashSet<Ipv4Addr> = interfaces.iter().map(|i| i.addr).collect();
    let results = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = interfaces
        .iter()
        .map(|iface| {
            let results = Arc::clone(&results);
            let addr = iface.addr;
            let broadcast = iface.broadcast;
            thread::spawn(move || {
                let iface = LocalInterface { addr, broadcast };
                scan_one_interface(&iface, udp_port, &results);
            })
        })
        .collect();

    for handle in handles {
        let _ = handle.join();
    }

    let mut found = Arc::try_unwrap(results)
        .map(|m| m.into_inner().unwrap())
        .unwrap_or_default();
    found.retain(|ip| !local_addrs.contains(ip));
    found.sort();
    found.dedup();
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_computation_matches_slash_24() {
        let addr: Ipv4Addr = "192.168.1.42".parse().unwrap();
        let mask: Ipv4Addr = "255.255.255.0".parse().unwrap();
        assert_eq!(broadcast_of(addr, mask), "192.168.1.255".parse().unwrap());
    }

    #[test]
    fn dedup_and_local_exclusion() {
        let mut found = vec![
            "10.0.0.5".parse::<Ipv4Addr>().unwrap(),
            "10.0.0.2".parse().unwrap(),
            "10.0.0.6".parse().unwrap(),
            "10.0.0.5".parse().unwrap(),
        ];
        let local: HashSet<Ipv4Addr> = ["10.0.0.2".parse().unwrap()].into_iter().collect();
        found.retain(|ip| !local.contains(ip));
        found.sort();
        found.dedup();
        assert_eq!(
            found,
            vec!["10.0.0.5".parse::<Ipv4Addr>().unwrap(), "10.0.0.6".parse().unwrap()]
        );
    }
}
