//! 地址解析
//!
//! ARP 报文编解码与每接口缓存：表项 10 分钟过期，查询不返回过期项；
//! 进行中的解析去重，同一地址最多只有一个在途请求。

use crate::net::MacAddr;
use crate::sim::SimTime;
use crate::util::{ByteReader, ByteWriter, WireError};
use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;

/// 缓存表项寿命：10 分钟仿真时间。
pub const ARP_ENTRY_TTL: SimTime = SimTime(600_000_000_000);

/// ARP 报文（仿真内部格式）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpPacket {
    pub is_request: bool,
    pub sender_mac: MacAddr,
    pub sender_ip: Ipv4Addr,
    pub target_mac: MacAddr,
    pub target_ip: Ipv4Addr,
}

impl ArpPacket {
    /// 请求：目标 MAC 为广播地址。
    pub fn request(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> Self {
        Self {
            is_request: true,
            sender_mac,
            sender_ip,
            target_mac: MacAddr::BROADCAST,
            target_ip,
        }
    }

    pub fn reply(
        sender_mac: MacAddr,
        sender_ip: Ipv4Addr,
        target_mac: MacAddr,
        target_ip: Ipv4Addr,
    ) -> Self {
        Self {
            is_request: false,
            sender_mac,
            sender_ip,
            target_mac,
            target_ip,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(21);
        w.put_u8(self.is_request as u8);
        w.put_slice(&self.sender_mac.0);
        w.put_slice(&self.sender_ip.octets());
        w.put_slice(&self.target_mac.0);
        w.put_slice(&self.target_ip.octets());
        w.into_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<ArpPacket, WireError> {
        let mut r = ByteReader::new(bytes);
        let is_request = match r.u8()? {
            0 => false,
            1 => true,
            _ => return Err(WireError::BadValue("arp operation")),
        };
        let sender_mac = MacAddr(r.take(6)?.try_into().expect("6 bytes"));
        let sender_ip = Ipv4Addr::from(<[u8; 4]>::try_from(r.take(4)?).expect("4 bytes"));
        let target_mac = MacAddr(r.take(6)?.try_into().expect("6 bytes"));
        let target_ip = Ipv4Addr::from(<[u8; 4]>::try_from(r.take(4)?).expect("4 bytes"));
        Ok(ArpPacket {
            is_request,
            sender_mac,
            sender_ip,
            target_mac,
            target_ip,
        })
    }
}

/// 缓存表项。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpEntry {
    pub mac: MacAddr,
    pub expires_at: SimTime,
}

/// 单接口的 ARP 缓存。
#[derive(Debug, Default)]
pub struct ArpCache {
    entries: HashMap<Ipv4Addr, ArpEntry>,
    in_progress: HashSet<Ipv4Addr>,
}

impl ArpCache {
    /// 查询：仅返回未过期的表项（`now > expires_at` 视为失效）。
    pub fn lookup(&self, now: SimTime, ip: Ipv4Addr) -> Option<MacAddr> {
        let entry = self.entries.get(&ip)?;
        if now > entry.expires_at {
            return None;
        }
        Some(entry.mac)
    }

    pub fn insert(&mut self, now: SimTime, ip: Ipv4Addr, mac: MacAddr) {
        self.entries.insert(
            ip,
            ArpEntry {
                mac,
                expires_at: now.saturating_add(ARP_ENTRY_TTL),
            },
        );
    }

    /// 标记解析进行中。已在途则返回 false（请求去重）。
    pub fn mark_in_progress(&mut self, ip: Ipv4Addr) -> bool {
        self.in_progress.insert(ip)
    }

    pub fn clear_in_progress(&mut self, ip: Ipv4Addr) {
        self.in_progress.remove(&ip);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
