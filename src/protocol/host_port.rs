//! RFC 959 host-port encoding
//!
//! `h1,h2,h3,h4,p1,p2` six-tuples used by PASV replies and PORT arguments,
//! where the port is `p1 * 256 + p2`.

use std::net::{Ipv4Addr, SocketAddrV4};

use crate::protocol::Reply;

/// Parses a bare `h1,h2,h3,h4,p1,p2` tuple.
pub fn parse_host_port(text: &str) -> Option<SocketAddrV4> {
    let fields: Vec<u8> = text
        .split(',')
        .map(|f| f.trim().parse::<u8>())
        .collect::<Result<_, _>>()
        .ok()?;
    if fields.len() != 6 {
        return None;
    }
    let ip = Ipv4Addr::new(fields[0], fields[1], fields[2], fields[3]);
    let port = (fields[4] as u16) * 256 + fields[5] as u16;
    Some(SocketAddrV4::new(ip, port))
}

pub fn encode_host_port(addr: &SocketAddrV4) -> String {
    let [h1, h2, h3, h4] = addr.ip().octets();
    let port = addr.port();
    format!("{},{},{},{},{},{}", h1, h2, h3, h4, port >> 8, port & 0xff)
}

/// Extracts the data endpoint from a `227 Entering Passive Mode (h1,...,p2)`
/// reply. The parentheses are optional; the first run of six comma separated
/// numbers is used.
pub fn parse_pasv_reply(reply: &Reply) -> Option<SocketAddrV4> {
    let text = reply.message();
    if let Some(start) = text.find('(') {
        let end = text[start..].find(')')? + start;
        return parse_host_port(&text[start + 1..end]);
    }

    let start = text.find(|c: char| c.is_ascii_digit())?;
    let tuple: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .collect();
    parse_host_port(&tuple)
}
