use std::net::{IpAddr, Ipv4Addr};
use crossbeam_channel::bounded;
use regex::Regex;
use crate::error::Error;
use crate::flow::Host;
use super::{decode, Config};
use super::source::{ready, truncated};

const SERVER: [u8; 4] = [10, 0, 0, 5];
const CLIENT: [u8; 4] = [192, 168, 1, 20];

fn frame(vlan: bool, proto: u8, src: ([u8; 4], u16), dst: ([u8; 4], u16), payload: &[u8], pad: usize) -> Vec<u8> {
    let mut pkt = vec![0x02, 0, 0, 0, 0, 1, 0x02, 0, 0, 0, 0, 2];
    if vlan {
        pkt.extend_from_slice(&[0x81, 0x00, 0x00, 0x64]);
    }
    pkt.extend_from_slice(&[0x08, 0x00]);

    let total = (20 + 20 + payload.len()) as u16;
    pkt.extend_from_slice(&[0x45, 0x00]);
    pkt.extend_from_slice(&total.to_be_bytes());
    pkt.extend_from_slice(&[0x00, 0x00, 0x40, 0x00, 0x40, proto, 0x00, 0x00]);
    pkt.extend_from_slice(&src.0);
    pkt.extend_from_slice(&dst.0);

    pkt.extend_from_slice(&src.1.to_be_bytes());
    pkt.extend_from_slice(&dst.1.to_be_bytes());
    pkt.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 1, 0x50, 0x18, 0xFF, 0xFF, 0, 0, 0, 0]);

    pkt.extend_from_slice(payload);
    pkt.extend(std::iter::repeat(0).take(pad));
    pkt
}

fn target() -> IpAddr {
    IpAddr::V4(Ipv4Addr::from(SERVER))
}

#[test]
fn outgoing_tcp() {
    let data = frame(false, 6, (CLIENT, 50_000), (SERVER, 443), b"\x03\x01\x1c\x01", 0);
    let pkt  = decode(target(), &data).unwrap();

    assert!(pkt.outgoing);
    assert_eq!(Host::new(IpAddr::V4(Ipv4Addr::from(CLIENT)), 50_000), pkt.src);
    assert_eq!(Host::new(target(), 443), pkt.dst);
    assert_eq!(&b"\x03\x01\x1c\x01"[..], &pkt.payload[..]);
}

#[test]
fn incoming_tcp_ignores_padding() {
    let data = frame(false, 6, (SERVER, 443), (CLIENT, 50_000), b"\x01", 5);
    let pkt  = decode(target(), &data).unwrap();

    assert!(!pkt.outgoing);
    assert_eq!(&[0x01], &pkt.payload[..]);
}

#[test]
fn vlan_tagged() {
    let data = frame(true, 6, (CLIENT, 50_000), (SERVER, 443), b"abc", 0);
    let pkt  = decode(target(), &data).unwrap();
    assert_eq!(&b"abc"[..], &pkt.payload[..]);
}

#[test]
fn empty_segment() {
    let data = frame(false, 6, (SERVER, 443), (CLIENT, 50_000), b"", 6);
    let pkt  = decode(target(), &data).unwrap();
    assert!(pkt.payload.is_empty());
}

#[test]
fn non_tcp_dropped() {
    let udp = frame(false, 17, (CLIENT, 50_000), (SERVER, 443), b"abc", 0);
    assert_eq!(None, decode(target(), &udp));

    let mut ipv6 = frame(false, 6, (CLIENT, 50_000), (SERVER, 443), b"abc", 0);
    ipv6[12] = 0x86;
    ipv6[13] = 0xDD;
    assert_eq!(None, decode(target(), &ipv6));
}

#[test]
fn short_capture_is_truncated() {
    let err = Error::Truncated { dev: "eth0".into(), caplen: 96, len: 1514 };
    assert_eq!(Some(err), truncated("eth0", 96, 1514));
    assert_eq!(None, truncated("eth0", 1514, 1514));
}

#[test]
fn failing_links_are_skipped() {
    let open = |result: Option<Result<(), Error>>| {
        let (tx, rx) = bounded(1);
        if let Some(result) = result {
            tx.send(result).unwrap();
        }
        rx
    };

    let pending = vec![
        ("eth0".to_string(), open(Some(Ok(())))),
        ("eth1".to_string(), open(Some(Err(Error::Capture("no permission".into()))))),
        ("eth2".to_string(), open(None)),
        ("eth3".to_string(), open(Some(Ok(())))),
    ];

    assert_eq!(vec!["eth0", "eth3"], ready(target(), pending).unwrap());
}

#[test]
fn no_link_opened() {
    let (tx, rx) = bounded(1);
    tx.send(Err(Error::Capture("unsupported".into()))).unwrap();
    let pending = vec![("eth0".to_string(), rx)];

    assert_eq!(Err(Error::NoInterfaces(target())), ready(target(), pending));
}

#[test]
fn link_patterns() {
    let cfg = Config {
        capture: Some(Regex::new("^eth").unwrap()),
        exclude: Some(Regex::new("^eth9$").unwrap()),
        ..Default::default()
    };

    assert!(cfg.check("eth0"));
    assert!(!cfg.check("eth9"));
    assert!(!cfg.check("wlan0"));
    assert!(Config::default().check("wlan0"));
}
