//! 分片重组
//!
//! 以 H(src‖dst‖protocol‖identification) 为键收集分片，在
//! [0, 65536) 的字节区间上维护并查集：每个分片把起止字节连通，
//! 再把末字节与后继位置连通；末片（MF 清零）确定原始长度。
//! 当 0 与原始长度连通时拼接交付。

use super::packet::IpPacket;
use crate::util::{mix64, UnionFind};
use std::collections::HashMap;
use tracing::trace;

/// IP 载荷的字节位置空间。
const SPACE: usize = 65536;

#[derive(Debug)]
struct Context {
    fragments: Vec<IpPacket>,
    coverage: UnionFind,
    total_len: Option<usize>,
}

/// 重组器：每个 (src, dst, protocol, ident) 一个上下文。
#[derive(Debug, Default)]
pub struct Reassembly {
    contexts: HashMap<u64, Context>,
}

impl Reassembly {
    /// 收下一个分片；凑齐后返回重组完成的包。
    pub fn add(&mut self, pkt: IpPacket) -> Option<IpPacket> {
        let key = frag_key(&pkt);
        let ctx = self.contexts.entry(key).or_insert_with(|| Context {
            fragments: Vec::new(),
            coverage: UnionFind::new(SPACE),
            total_len: None,
        });

        let from = pkt.fragment_offset as usize * 8;
        let len = pkt.data.len();
        if len > 0 {
            let to = from + len - 1;
            if to + 1 < SPACE {
                ctx.coverage.union(from, to);
                ctx.coverage.union(to, to + 1);
            }
        }
        if !pkt.mf {
            ctx.total_len = Some(from + len);
        }
        ctx.fragments.push(pkt);
        trace!(key, fragments = ctx.fragments.len(), total = ?ctx.total_len, "收到分片");

        let total = ctx.total_len?;
        if !ctx.coverage.connected(0, total) {
            return None;
        }

        // 完整：按偏移序拼接载荷
        let mut ctx = self.contexts.remove(&key).expect("context present");
        ctx.fragments.sort_by_key(|f| f.fragment_offset);
        ctx.fragments.dedup_by_key(|f| f.fragment_offset);

        let mut assembled = ctx.fragments.first().expect("at least one fragment").clone();
        let mut data = Vec::with_capacity(total);
        for f in &ctx.fragments {
            data.extend_from_slice(&f.data);
        }
        data.truncate(total);
        assembled.data = data;
        assembled.mf = false;
        assembled.fragment_offset = 0;
        Some(assembled)
    }

    /// 仍在等待分片的上下文数量。
    pub fn pending(&self) -> usize {
        self.contexts.len()
    }
}

fn frag_key(p: &IpPacket) -> u64 {
    let addrs = ((u32::from(p.src) as u64) << 32) | u32::from(p.dst) as u64;
    let proto_ident = ((p.protocol as u8 as u64) << 16) | p.identification as u64;
    mix64(addrs) ^ mix64(proto_ident.wrapping_mul(0x9E3779B97F4A7C15))
}
