//! 802.3 帧编解码
//!
//! 帧布局：dst(6) ‖ src(6) ‖ etherType(u16) ‖ payloadLength(u32) ‖
//! payload（零填充至最少 46 字节）‖ FCS(u32)。
//!
//! 介质层不建模起止定界，因此携带显式的载荷长度字段；FCS 为 CRC-32，
//! 覆盖 dst‖src‖etherType‖payload（未填充的逻辑载荷）。

use super::addr::MacAddr;
use crate::util::{ByteReader, ByteWriter, WireError};

/// 最小载荷（不足则零填充）。
pub const MIN_PAYLOAD: usize = 46;
/// 最大载荷。
pub const MAX_PAYLOAD: usize = 1500;

/// 以太类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum EtherType {
    Ipv4 = 0x0800,
    Arp = 0x0806,
}

impl TryFrom<u16> for EtherType {
    type Error = WireError;

    fn try_from(v: u16) -> Result<Self, WireError> {
        match v {
            0x0800 => Ok(EtherType::Ipv4),
            0x0806 => Ok(EtherType::Arp),
            _ => Err(WireError::BadValue("ether type")),
        }
    }
}

/// 802.3 帧。FCS 在序列化时计算、反序列化时校验，不保存在结构体中。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub ether_type: EtherType,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(
        dst: MacAddr,
        src: MacAddr,
        ether_type: EtherType,
        payload: Vec<u8>,
    ) -> Result<Self, WireError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(WireError::BadValue("payload too long"));
        }
        Ok(Self {
            dst,
            src,
            ether_type,
            payload,
        })
    }

    /// 帧校验序列：CRC-32 覆盖 dst‖src‖etherType‖payload。
    pub fn fcs(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.dst.0);
        hasher.update(&self.src.0);
        hasher.update(&(self.ether_type as u16).to_be_bytes());
        hasher.update(&self.payload);
        hasher.finalize()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let padded = self.payload.len().max(MIN_PAYLOAD);
        let mut w = ByteWriter::with_capacity(18 + padded + 4);
        w.put_slice(&self.dst.0);
        w.put_slice(&self.src.0);
        w.put_u16(self.ether_type as u16);
        w.put_u32(self.payload.len() as u32);
        w.put_slice(&self.payload);
        for _ in self.payload.len()..MIN_PAYLOAD {
            w.put_u8(0);
        }
        w.put_u32(self.fcs());
        w.into_bytes()
    }

    /// 反序列化并校验 FCS；不匹配返回 `WireError::BadFcs`。
    pub fn from_bytes(bytes: &[u8]) -> Result<Frame, WireError> {
        let mut r = ByteReader::new(bytes);
        let dst = MacAddr(r.take(6)?.try_into().expect("6 bytes"));
        let src = MacAddr(r.take(6)?.try_into().expect("6 bytes"));
        let ether_type = EtherType::try_from(r.u16()?)?;
        let payload_len = r.u32()? as usize;
        if payload_len > MAX_PAYLOAD {
            return Err(WireError::BadValue("payload length"));
        }
        let padded = payload_len.max(MIN_PAYLOAD);
        let payload = r.take(padded)?[..payload_len].to_vec();
        let fcs = r.u32()?;

        let frame = Frame {
            dst,
            src,
            ether_type,
            payload,
        };
        if frame.fcs() != fcs {
            return Err(WireError::BadFcs);
        }
        Ok(frame)
    }

    /// 在线缆上占用的字节数（决定传输时延）。
    pub fn wire_len(&self) -> usize {
        18 + self.payload.len().max(MIN_PAYLOAD) + 4
    }
}
