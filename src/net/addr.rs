//! 地址类型
//!
//! MAC-48 地址与 CIDR 前缀的解析、格式化和子网运算。
//! IPv4 地址直接使用 `std::net::Ipv4Addr`（其 FromStr 即严格的点分十进制）。

use rand::Rng;
use std::net::Ipv4Addr;
use std::str::FromStr;
use thiserror::Error;

/// 地址解析错误。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddrParseError {
    #[error("invalid MAC address: {0}")]
    InvalidMac(String),
    #[error("invalid CIDR notation: {0}")]
    InvalidCidr(String),
    #[error("prefix length out of range: {0}")]
    InvalidPrefixLen(u8),
}

/// MAC-48 地址。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xFF; 6]);

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }

    /// 生成一个本地管理的单播 MAC（首字节 0x02，其余随机）。
    pub fn generate<R: Rng>(rng: &mut R) -> MacAddr {
        let mut bytes = [0u8; 6];
        rng.fill(&mut bytes[1..]);
        bytes[0] = 0x02;
        MacAddr(bytes)
    }
}

impl FromStr for MacAddr {
    type Err = AddrParseError;

    // 接受 "XX:XX:XX:XX:XX:XX" 或 "XX-XX-XX-XX-XX-XX"，每组恰好两个十六进制数字。
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sep = if s.contains(':') { ':' } else { '-' };
        let mut bytes = [0u8; 6];
        let mut count = 0;
        for part in s.split(sep) {
            if count == 6 || part.len() != 2 {
                return Err(AddrParseError::InvalidMac(s.to_string()));
            }
            bytes[count] = u8::from_str_radix(part, 16)
                .map_err(|_| AddrParseError::InvalidMac(s.to_string()))?;
            count += 1;
        }
        if count != 6 {
            return Err(AddrParseError::InvalidMac(s.to_string()));
        }
        Ok(MacAddr(bytes))
    }
}

impl std::fmt::Display for MacAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

/// CIDR 前缀："A.B.C.D/N"，N ∈ [0, 32]。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cidr {
    pub address: Ipv4Addr,
    pub prefix_len: u8,
}

impl Cidr {
    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Result<Self, AddrParseError> {
        if prefix_len > 32 {
            return Err(AddrParseError::InvalidPrefixLen(prefix_len));
        }
        Ok(Self {
            address,
            prefix_len,
        })
    }

    /// 前缀对应的子网掩码（N 个前导 1）。
    pub fn netmask(&self) -> Ipv4Addr {
        netmask_from_prefix(self.prefix_len)
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        same_subnet(self.address, ip, self.netmask())
    }
}

impl FromStr for Cidr {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, len) = s
            .split_once('/')
            .ok_or_else(|| AddrParseError::InvalidCidr(s.to_string()))?;
        let address: Ipv4Addr = addr
            .parse()
            .map_err(|_| AddrParseError::InvalidCidr(s.to_string()))?;
        let prefix_len: u8 = len
            .parse()
            .map_err(|_| AddrParseError::InvalidCidr(s.to_string()))?;
        Cidr::new(address, prefix_len)
    }
}

impl std::fmt::Display for Cidr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

/// N 个前导 1 的子网掩码。
pub fn netmask_from_prefix(prefix_len: u8) -> Ipv4Addr {
    debug_assert!(prefix_len <= 32);
    let bits = if prefix_len == 0 {
        0
    } else {
        u32::MAX << (32 - prefix_len as u32)
    };
    Ipv4Addr::from(bits)
}

/// 掩码中前导 1 的个数。
pub fn prefix_len_of(netmask: Ipv4Addr) -> u32 {
    u32::from(netmask).count_ones()
}

/// 两个地址在给定掩码下是否同子网。
pub fn same_subnet(a: Ipv4Addr, b: Ipv4Addr, netmask: Ipv4Addr) -> bool {
    let m = u32::from(netmask);
    (u32::from(a) & m) == (u32::from(b) & m)
}
