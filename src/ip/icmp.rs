//! ICMP 编解码与差错报文构造
//!
//! 差错报文携带触发包的 IP 首部加前 8 个数据字节。
//! 校验和算法与 IP 首部相同（RFC 1071）。

use super::packet::{internet_checksum, IpPacket};
use crate::util::{ByteReader, ByteWriter, WireError};

/// ICMP 报文。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcmpPacket {
    pub icmp_type: u8,
    pub code: u8,
    pub data: Vec<u8>,
}

impl IcmpPacket {
    pub const TYPE_DESTINATION_UNREACHABLE: u8 = 3;
    pub const TYPE_SOURCE_QUENCH: u8 = 4;
    pub const TYPE_TIME_EXCEEDED: u8 = 11;

    pub const CODE_NETWORK_UNREACHABLE: u8 = 0;
    pub const CODE_FRAGMENTATION_REQUIRED: u8 = 4;

    /// TTL 耗尽。
    pub fn time_exceeded(original: &IpPacket) -> Self {
        Self {
            icmp_type: Self::TYPE_TIME_EXCEEDED,
            code: 0,
            data: quote(original),
        }
    }

    /// 路由表无匹配。
    pub fn destination_network_unreachable(original: &IpPacket) -> Self {
        Self {
            icmp_type: Self::TYPE_DESTINATION_UNREACHABLE,
            code: Self::CODE_NETWORK_UNREACHABLE,
            data: quote(original),
        }
    }

    /// 超过下一跳 MTU 且 DF 置位。
    pub fn fragmentation_required(original: &IpPacket) -> Self {
        Self {
            icmp_type: Self::TYPE_DESTINATION_UNREACHABLE,
            code: Self::CODE_FRAGMENTATION_REQUIRED,
            data: quote(original),
        }
    }

    /// 输入队列溢出。
    pub fn source_quench(original: &IpPacket) -> Self {
        Self {
            icmp_type: Self::TYPE_SOURCE_QUENCH,
            code: 0,
            data: quote(original),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(4 + self.data.len());
        w.put_u8(self.icmp_type);
        w.put_u8(self.code);
        w.put_u16(0);
        w.put_slice(&self.data);
        let mut bytes = w.into_bytes();
        let sum = internet_checksum(&bytes);
        bytes[2] = (sum >> 8) as u8;
        bytes[3] = (sum & 0xFF) as u8;
        bytes
    }

    /// 反序列化并校验；带字段求和非 0 返回 `BadChecksum`。
    pub fn from_bytes(bytes: &[u8]) -> Result<IcmpPacket, WireError> {
        if internet_checksum(bytes) != 0 {
            return Err(WireError::BadChecksum);
        }
        let mut r = ByteReader::new(bytes);
        let icmp_type = r.u8()?;
        let code = r.u8()?;
        let _checksum = r.u16()?;
        let data = r.take(r.remaining())?.to_vec();
        Ok(IcmpPacket {
            icmp_type,
            code,
            data,
        })
    }
}

/// 差错报文引用：IP 首部 + 触发包数据的前 8 字节。
fn quote(original: &IpPacket) -> Vec<u8> {
    let mut data = original.header_bytes();
    data.extend_from_slice(&original.data[..original.data.len().min(8)]);
    data
}
