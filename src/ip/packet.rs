//! IPv4 包编解码
//!
//! 首部 20 字节（无选项时）。保留原始实现的字段布局：
//! byte0 = (IHL<<4)|version，flagsAndOffset = (fragmentOffset<<3)|flags；
//! 校验和为 RFC 1071 的 16 位反码和，带字段重算结果必须为 0。

use crate::util::{ByteReader, ByteWriter, WireError};
use std::net::Ipv4Addr;

/// 无选项首部长度。
pub const IP_HEADER_LEN: usize = 20;
/// 新建包的默认 TTL。
pub const DEFAULT_TTL: u8 = 64;

const FLAG_MF: u16 = 0b001;
const FLAG_DF: u16 = 0b010;

/// 上层协议号。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum IpProtocol {
    Icmp = 1,
    Tcp = 6,
    Udp = 17,
}

impl TryFrom<u8> for IpProtocol {
    type Error = WireError;

    fn try_from(v: u8) -> Result<Self, WireError> {
        match v {
            1 => Ok(IpProtocol::Icmp),
            6 => Ok(IpProtocol::Tcp),
            17 => Ok(IpProtocol::Udp),
            _ => Err(WireError::BadValue("ip protocol")),
        }
    }
}

/// IPv4 包。
///
/// `checksum` 保存反序列化得到的线上值（转发路径上按 TTL 增量更新）；
/// 序列化时总是整体重算，线上包因此始终有效。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpPacket {
    pub version: u8,
    pub ihl: u8,
    pub dscp: u8,
    pub identification: u16,
    pub df: bool,
    pub mf: bool,
    /// 8 字节为单位的分片偏移
    pub fragment_offset: u16,
    pub ttl: u8,
    pub protocol: IpProtocol,
    pub checksum: u16,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub options: Vec<u8>,
    pub data: Vec<u8>,
}

impl IpPacket {
    /// 新建一个未分片的包：TTL 64，标识 0。
    pub fn fresh(src: Ipv4Addr, dst: Ipv4Addr, protocol: IpProtocol, data: Vec<u8>) -> Self {
        Self {
            version: 4,
            ihl: 5,
            dscp: 0,
            identification: 0,
            df: false,
            mf: false,
            fragment_offset: 0,
            ttl: DEFAULT_TTL,
            protocol,
            checksum: 0,
            src,
            dst,
            options: Vec::new(),
            data,
        }
    }

    /// MF 置位或偏移非零即为分片。
    pub fn is_fragment(&self) -> bool {
        self.mf || self.fragment_offset > 0
    }

    pub fn header_len(&self) -> usize {
        self.ihl as usize * 4
    }

    pub fn total_length(&self) -> u16 {
        (self.header_len() + self.data.len()) as u16
    }

    fn flags_and_offset(&self) -> u16 {
        let mut flags = 0u16;
        if self.mf {
            flags |= FLAG_MF;
        }
        if self.df {
            flags |= FLAG_DF;
        }
        (self.fragment_offset << 3) | flags
    }

    /// 首部字节（校验和为整体重算的有效值）。
    pub fn header_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(self.header_len());
        w.put_u8((self.ihl << 4) | self.version);
        w.put_u8(self.dscp);
        w.put_u16(self.total_length());
        w.put_u16(self.identification);
        w.put_u16(self.flags_and_offset());
        w.put_u8(self.ttl);
        w.put_u8(self.protocol as u8);
        w.put_u16(0);
        w.put_slice(&self.src.octets());
        w.put_slice(&self.dst.octets());
        w.put_slice(&self.options);
        let mut bytes = w.into_bytes();
        let sum = internet_checksum(&bytes);
        bytes[10] = (sum >> 8) as u8;
        bytes[11] = (sum & 0xFF) as u8;
        bytes
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = self.header_bytes();
        bytes.extend_from_slice(&self.data);
        bytes
    }

    /// 反序列化并校验首部和；带字段求和非 0 返回 `BadChecksum`。
    pub fn from_bytes(bytes: &[u8]) -> Result<IpPacket, WireError> {
        let mut r = ByteReader::new(bytes);
        let b0 = r.u8()?;
        let version = b0 & 0x0F;
        let ihl = b0 >> 4;
        if version != 4 {
            return Err(WireError::BadValue("ip version"));
        }
        if ihl < 5 {
            return Err(WireError::BadValue("ihl"));
        }
        let dscp = r.u8()?;
        let total_length = r.u16()? as usize;
        let identification = r.u16()?;
        let flags_and_offset = r.u16()?;
        let ttl = r.u8()?;
        let protocol = IpProtocol::try_from(r.u8()?)?;
        let checksum = r.u16()?;
        let src = Ipv4Addr::from(<[u8; 4]>::try_from(r.take(4)?).expect("4 bytes"));
        let dst = Ipv4Addr::from(<[u8; 4]>::try_from(r.take(4)?).expect("4 bytes"));
        let header_len = ihl as usize * 4;
        if total_length < header_len || total_length > bytes.len() {
            return Err(WireError::Truncated);
        }
        let options = r.take(header_len - IP_HEADER_LEN)?.to_vec();
        if internet_checksum(&bytes[..header_len]) != 0 {
            return Err(WireError::BadChecksum);
        }
        let data = r.take(total_length - header_len)?.to_vec();

        Ok(IpPacket {
            version,
            ihl,
            dscp,
            identification,
            df: flags_and_offset & FLAG_DF != 0,
            mf: flags_and_offset & FLAG_MF != 0,
            fragment_offset: flags_and_offset >> 3,
            ttl,
            protocol,
            checksum,
            src,
            dst,
            options,
            data,
        })
    }
}

/// RFC 1071 校验和：16 位分组求和、回卷进位、取反码。
pub fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum = 0u32;
    for chunk in data.chunks_exact(2) {
        sum += u16::from_be_bytes([chunk[0], chunk[1]]) as u32;
    }
    if data.len() % 2 != 0 {
        if let Some(&last) = data.last() {
            sum += (last as u32) << 8;
        }
    }
    while (sum >> 16) > 0 {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }
    !sum as u16
}
