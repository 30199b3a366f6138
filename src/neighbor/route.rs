//! macOS neighbor table from a routing table dump.
//!
//! `sysctl(CTL_NET, PF_ROUTE, 0, AF_INET, NET_RT_FLAGS, RTF_LLINFO)` returns
//! a sequence of routing messages. Each is an `rt_msghdr` followed by a
//! `sockaddr_in` (the neighbor address) and a `sockaddr_dl` (its
//! link-layer address).

#![cfg_attr(not(target_os = "macos"), allow(dead_code))]

use pnet::util::MacAddr;
use std::net::{IpAddr, Ipv4Addr};

/// Address family of `sockaddr_in` on BSD-derived systems.
const AF_INET: u8 = 2;

/// Offsets inside `sockaddr_dl`.
const SDL_NLEN: usize = 5;
const SDL_ALEN: usize = 6;
const SDL_DATA: usize = 8;

/// Dump the ARP entries of the routing table and parse them.
#[cfg(target_os = "macos")]
pub fn read_table() -> std::io::Result<Vec<(IpAddr, MacAddr)>> {
    let buf = dump_routing_table()?;
    Ok(parse_dump(&buf, std::mem::size_of::<libc::rt_msghdr>()))
}

#[cfg(target_os = "macos")]
fn dump_routing_table() -> std::io::Result<Vec<u8>> {
    use std::io;
    use std::ptr;

    let mut mib = [
        libc::CTL_NET,
        libc::PF_ROUTE,
        0,
        libc::AF_INET,
        libc::NET_RT_FLAGS,
        libc::RTF_LLINFO,
    ];

    loop {
        let mut size: libc::size_t = 0;
        // SAFETY: a null output buffer asks the kernel for the required size only.
        let rc = unsafe {
            libc::sysctl(
                mib.as_mut_ptr(),
                mib.len() as libc::c_uint,
                ptr::null_mut(),
                &mut size,
                ptr::null_mut(),
                0,
            )
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        if size == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; size];
        // SAFETY: `buf` is valid for `size` bytes and the kernel writes at most that many.
        let rc = unsafe {
            libc::sysctl(
                mib.as_mut_ptr(),
                mib.len() as libc::c_uint,
                buf.as_mut_ptr().cast(),
                &mut size,
                ptr::null_mut(),
                0,
            )
        };
        if rc == 0 {
            buf.truncate(size);
            return Ok(buf);
        }
        let err = io::Error::last_os_error();
        // The table grew between the two calls.
        if err.raw_os_error() != Some(libc::ENOMEM) {
            return Err(err);
        }
    }
}

/// Walk a routing message dump. `header_len` is the size of `rt_msghdr`
/// on the running platform.
///
/// Messages that are not IPv4 or carry no 6-byte link-layer address are
/// skipped. Parsing stops at the first message whose length does not fit
/// the buffer.
pub fn parse_dump(buf: &[u8], header_len: usize) -> Vec<(IpAddr, MacAddr)> {
    let mut entries = Vec::new();
    let mut offset = 0;

    while offset + 2 <= buf.len() {
        let msg_len = u16::from_ne_bytes([buf[offset], buf[offset + 1]]) as usize;
        if msg_len == 0 || offset + msg_len > buf.len() {
            break;
        }
        if let Some(entry) = parse_message(&buf[offset..offset + msg_len], header_len) {
            entries.push(entry);
        }
        offset += msg_len;
    }

    entries
}

fn parse_message(msg: &[u8], header_len: usize) -> Option<(IpAddr, MacAddr)> {
    let sin = msg.get(header_len..)?;
    let sin_len = *sin.first()? as usize;
    if *sin.get(1)? != AF_INET {
        return None;
    }
    let octets: [u8; 4] = sin.get(4..8)?.try_into().ok()?;

    let sdl = sin.get(sin_len..)?;
    let nlen = *sdl.get(SDL_NLEN)? as usize;
    let alen = *sdl.get(SDL_ALEN)? as usize;
    if alen < 6 {
        return None;
    }
    let lladdr = sdl.get(SDL_DATA + nlen..SDL_DATA + nlen + 6)?;
    let mac = MacAddr::new(lladdr[0], lladdr[1], lladdr[2], lladdr[3], lladdr[4], lladdr[5]);

    Some((IpAddr::V4(Ipv4Addr::from(octets)), mac))
}
