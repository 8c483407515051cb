//! IPv4 引擎
//!
//! 每主机的网络层状态机。发送路径：按接口 MTU 切分载荷、ARP 门控
//! （未解析的包挂起等待）、接口输出队列逐帧排空；接收路径：TTL 处理与
//! ICMP 生成、本地交付（含分片重组）、按路由表转发（必要时再分片）。
//! 引擎不持有接口与路由表，由主机在每次调用时借入。

use super::arp::{ArpCache, ArpPacket};
use super::host::{HostTimer, HostTimerKind, Interface};
use super::icmp::IcmpPacket;
use super::packet::{IpPacket, IpProtocol, IP_HEADER_LEN};
use super::reassembly::Reassembly;
use super::routing::RoutingTable;
use crate::net::{same_subnet, DeviceId, EtherType, Frame, Lan, MacAddr};
use crate::queue::CappedQueue;
use crate::sim::{SimTime, Simulator};
use crate::trace::TraceEventKind;
use std::net::Ipv4Addr;
use tracing::{debug, info, trace, warn};

/// 接口输出队列承载的链路层载荷。
#[derive(Debug, Clone)]
pub enum L3Payload {
    Ip(IpPacket),
    Arp(ArpPacket),
}

impl L3Payload {
    pub fn ether_type(&self) -> EtherType {
        match self {
            L3Payload::Ip(_) => EtherType::Ipv4,
            L3Payload::Arp(_) => EtherType::Arp,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            L3Payload::Ip(pkt) => pkt.to_bytes(),
            L3Payload::Arp(pkt) => pkt.to_bytes(),
        }
    }
}

/// 交付给本机上层（传输层打桩）的数据报。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub protocol: IpProtocol,
    pub data: Vec<u8>,
}

/// 每主机的 IPv4 引擎。
pub struct Ipv4 {
    host: DeviceId,
    hostname: String,
    nodal_delay: SimTime,
    output_cap: usize,
    /// 每接口 ARP 缓存
    arp: Vec<ArpCache>,
    /// 每接口因 ARP 未解析而挂起的 (下一跳, 包)
    waiting: Vec<Vec<(Ipv4Addr, IpPacket)>>,
    /// 每接口输出队列
    out_q: Vec<CappedQueue<(MacAddr, L3Payload)>>,
    /// 全局输入队列：(包, 入接口)
    input_q: CappedQueue<(IpPacket, usize)>,
    reassembly: Reassembly,
    delivered: Vec<Delivery>,
}

impl Ipv4 {
    pub fn new(
        host: DeviceId,
        hostname: String,
        nodal_delay: SimTime,
        input_cap: usize,
        output_cap: usize,
    ) -> Self {
        Self {
            host,
            hostname,
            nodal_delay,
            output_cap,
            arp: Vec::new(),
            waiting: Vec::new(),
            out_q: Vec::new(),
            input_q: CappedQueue::new(input_cap),
            reassembly: Reassembly::default(),
            delivered: Vec::new(),
        }
    }

    fn ensure_ifc(&mut self, ifc: usize) {
        while self.arp.len() <= ifc {
            self.arp.push(ArpCache::default());
            self.waiting.push(Vec::new());
            self.out_q.push(CappedQueue::new(self.output_cap));
        }
    }

    // ---- 发送路径 ----

    /// 把应用载荷切分成不超过 MTU 的新鲜 IP 包并逐个发出。
    pub fn output(
        &mut self,
        sim: &mut Simulator,
        lan: &mut Lan,
        ifcs: &mut [Interface],
        ifc: usize,
        dst: Ipv4Addr,
        protocol: IpProtocol,
        data: &[u8],
    ) {
        self.ensure_ifc(ifc);
        let max_payload = (ifcs[ifc].mtu as usize).saturating_sub(IP_HEADER_LEN).max(1);
        let chunks: Vec<Vec<u8>> = if data.is_empty() {
            vec![Vec::new()]
        } else {
            data.chunks(max_payload).map(<[u8]>::to_vec).collect()
        };
        debug!(
            host = %self.hostname,
            ifc = %ifcs[ifc].name,
            dst = %dst,
            bytes = data.len(),
            packets = chunks.len(),
            "应用载荷进入发送路径"
        );
        for chunk in chunks {
            let pkt = IpPacket::fresh(ifcs[ifc].ip, dst, protocol, chunk);
            self.output_packet(sim, lan, ifcs, ifc, pkt);
        }
    }

    /// 按接口子网/网关选择下一跳后发出一个现成的包。
    pub fn output_packet(
        &mut self,
        sim: &mut Simulator,
        lan: &mut Lan,
        ifcs: &mut [Interface],
        ifc: usize,
        pkt: IpPacket,
    ) {
        self.ensure_ifc(ifc);
        let dst = pkt.dst;
        let next_hop = if same_subnet(dst, ifcs[ifc].ip, ifcs[ifc].netmask) {
            dst
        } else if let Some(gw) = ifcs[ifc].gateway {
            gw
        } else {
            warn!(host = %self.hostname, dst = %dst, "目的不在子网内且接口无网关，丢弃");
            lan.stats.packets_dropped += 1;
            lan.record(
                sim.now(),
                TraceEventKind::PacketDropped {
                    host: self.hostname.clone(),
                    reason: "no gateway".into(),
                },
            );
            return;
        };
        self.output_to_next_hop(sim, lan, ifcs, ifc, next_hop, pkt);
    }

    /// ARP 门控：命中直接入接口输出队列，未命中挂起并发起解析。
    pub fn output_to_next_hop(
        &mut self,
        sim: &mut Simulator,
        lan: &mut Lan,
        ifcs: &mut [Interface],
        ifc: usize,
        next_hop: Ipv4Addr,
        pkt: IpPacket,
    ) {
        self.ensure_ifc(ifc);
        // 下一跳是本接口地址：回流输入队列（自环路由的退化情形）
        if next_hop == ifcs[ifc].ip {
            self.enqueue_input(sim, lan, ifcs, ifc, pkt);
            return;
        }
        match self.arp[ifc].lookup(sim.now(), next_hop) {
            Some(mac) => self.enqueue_l2(sim, lan, ifc, mac, L3Payload::Ip(pkt)),
            None => {
                trace!(host = %self.hostname, next_hop = %next_hop, "ARP 未解析，包挂起");
                self.waiting[ifc].push((next_hop, pkt));
                self.resolve(sim, lan, ifcs, ifc, next_hop);
            }
        }
    }

    /// 发起一次解析；同一地址在途时去重为空操作。
    fn resolve(
        &mut self,
        sim: &mut Simulator,
        lan: &mut Lan,
        ifcs: &mut [Interface],
        ifc: usize,
        ip: Ipv4Addr,
    ) {
        if !self.arp[ifc].mark_in_progress(ip) {
            return;
        }
        debug!(host = %self.hostname, ifc = %ifcs[ifc].name, target = %ip, "发出 ARP 请求");
        lan.stats.arp_requests += 1;
        lan.record(
            sim.now(),
            TraceEventKind::ArpRequest {
                ifc: ifcs[ifc].name.clone(),
                target: ip.to_string(),
            },
        );
        let request = ArpPacket::request(ifcs[ifc].nic.mac(), ifcs[ifc].ip, ip);
        self.enqueue_l2(sim, lan, ifc, MacAddr::BROADCAST, L3Payload::Arp(request));
    }

    fn enqueue_l2(
        &mut self,
        sim: &mut Simulator,
        lan: &mut Lan,
        ifc: usize,
        dst_mac: MacAddr,
        payload: L3Payload,
    ) {
        let was_empty = self.out_q[ifc].is_empty();
        if self.out_q[ifc].enqueue((dst_mac, payload)).is_err() {
            debug!(host = %self.hostname, ifc, "接口输出队列满，丢弃");
            lan.stats.packets_dropped += 1;
            lan.record(
                sim.now(),
                TraceEventKind::QueueOverflow {
                    host: self.hostname.clone(),
                    queue: format!("output:{ifc}"),
                },
            );
            return;
        }
        if was_empty {
            sim.schedule_in(
                SimTime::ZERO,
                HostTimer {
                    device: self.host,
                    kind: HostTimerKind::EmptySendFifo(ifc),
                },
            );
        }
    }

    /// 把一个排队的链路层载荷交给网卡。每次网卡队列空再继续。
    pub(super) fn empty_send_fifo(
        &mut self,
        sim: &mut Simulator,
        lan: &mut Lan,
        ifcs: &mut [Interface],
        ifc: usize,
    ) {
        self.ensure_ifc(ifc);
        let Some((dst_mac, payload)) = self.out_q[ifc].dequeue() else {
            return;
        };
        let ether_type = payload.ether_type();
        let bytes = payload.to_bytes();
        if let Err(err) = ifcs[ifc].nic.output(sim, dst_mac, ether_type, bytes) {
            debug!(host = %self.hostname, %err, "网卡发送队列拒收，丢帧");
            lan.stats.frames_dropped += 1;
        }
    }

    /// 网卡发送队列已空：输出队列仍有积压则安排下一次排空。
    pub(super) fn on_available_to_send(&mut self, sim: &mut Simulator, ifc: usize) {
        self.ensure_ifc(ifc);
        if !self.out_q[ifc].is_empty() {
            sim.schedule_in(
                SimTime::ZERO,
                HostTimer {
                    device: self.host,
                    kind: HostTimerKind::EmptySendFifo(ifc),
                },
            );
        }
    }

    // ---- 接收路径 ----

    /// 链路层上行入口：按以太类型分派。
    pub(super) fn on_input(
        &mut self,
        sim: &mut Simulator,
        lan: &mut Lan,
        ifcs: &mut [Interface],
        ifc: usize,
        frame: Frame,
    ) {
        self.ensure_ifc(ifc);
        match frame.ether_type {
            EtherType::Arp => self.on_arp_input(sim, lan, ifcs, ifc, &frame.payload),
            EtherType::Ipv4 => self.on_ip_input(sim, lan, ifcs, ifc, &frame.payload),
        }
    }

    fn on_arp_input(
        &mut self,
        sim: &mut Simulator,
        lan: &mut Lan,
        ifcs: &mut [Interface],
        ifc: usize,
        bytes: &[u8],
    ) {
        let arp = match ArpPacket::from_bytes(bytes) {
            Ok(arp) => arp,
            Err(err) => {
                debug!(host = %self.hostname, %err, "ARP 报文格式错误，丢弃");
                return;
            }
        };
        // 自己的请求在介质上回放，忽略
        if arp.sender_mac == ifcs[ifc].nic.mac() {
            return;
        }
        self.arp[ifc].insert(sim.now(), arp.sender_ip, arp.sender_mac);
        self.arp[ifc].clear_in_progress(arp.sender_ip);
        trace!(host = %self.hostname, sender = %arp.sender_ip, mac = %arp.sender_mac, "学习 ARP 表项");

        // 解析完成：放行挂起的包
        let waiting = std::mem::take(&mut self.waiting[ifc]);
        let (ready, rest): (Vec<_>, Vec<_>) = waiting
            .into_iter()
            .partition(|(ip, _)| *ip == arp.sender_ip);
        self.waiting[ifc] = rest;
        for (next_hop, pkt) in ready {
            self.output_to_next_hop(sim, lan, ifcs, ifc, next_hop, pkt);
        }

        if arp.is_request && arp.target_ip == ifcs[ifc].ip {
            debug!(host = %self.hostname, requester = %arp.sender_ip, "应答 ARP 请求");
            lan.stats.arp_replies += 1;
            lan.record(
                sim.now(),
                TraceEventKind::ArpReply {
                    ifc: ifcs[ifc].name.clone(),
                    target: arp.sender_ip.to_string(),
                },
            );
            let reply = ArpPacket::reply(
                ifcs[ifc].nic.mac(),
                ifcs[ifc].ip,
                arp.sender_mac,
                arp.sender_ip,
            );
            self.enqueue_l2(sim, lan, ifc, arp.sender_mac, L3Payload::Arp(reply));
        }
    }

    fn on_ip_input(
        &mut self,
        sim: &mut Simulator,
        lan: &mut Lan,
        ifcs: &mut [Interface],
        ifc: usize,
        bytes: &[u8],
    ) {
        let pkt = match IpPacket::from_bytes(bytes) {
            Ok(pkt) => pkt,
            Err(err) => {
                debug!(host = %self.hostname, %err, "IP 包校验失败，丢弃");
                lan.stats.packets_dropped += 1;
                lan.record(
                    sim.now(),
                    TraceEventKind::PacketDropped {
                        host: self.hostname.clone(),
                        reason: err.to_string(),
                    },
                );
                return;
            }
        };
        self.enqueue_input(sim, lan, ifcs, ifc, pkt);
    }

    /// 入队输入队列；溢出则丢包并向源发 SourceQuench。
    fn enqueue_input(
        &mut self,
        sim: &mut Simulator,
        lan: &mut Lan,
        ifcs: &mut [Interface],
        ifc: usize,
        pkt: IpPacket,
    ) {
        let was_empty = self.input_q.is_empty();
        match self.input_q.enqueue((pkt, ifc)) {
            Ok(()) => {
                if was_empty {
                    sim.schedule_in(
                        self.nodal_delay,
                        HostTimer {
                            device: self.host,
                            kind: HostTimerKind::ProcessPackets,
                        },
                    );
                }
            }
            Err((pkt, _)) => {
                debug!(host = %self.hostname, src = %pkt.src, "输入队列满，丢包并抑制源");
                lan.stats.packets_dropped += 1;
                lan.record(
                    sim.now(),
                    TraceEventKind::QueueOverflow {
                        host: self.hostname.clone(),
                        queue: "input".into(),
                    },
                );
                let quench = IcmpPacket::source_quench(&pkt);
                self.send_icmp(sim, lan, ifcs, ifc, pkt.src, quench);
            }
        }
    }

    /// 每次处理一个包；队列未空则按节点处理时延续约。
    pub(super) fn process_packets(
        &mut self,
        sim: &mut Simulator,
        lan: &mut Lan,
        ifcs: &mut [Interface],
        routing: &RoutingTable,
    ) {
        let Some((mut pkt, ifc)) = self.input_q.dequeue() else {
            return;
        };
        if !self.input_q.is_empty() {
            sim.schedule_in(
                self.nodal_delay,
                HostTimer {
                    device: self.host,
                    kind: HostTimerKind::ProcessPackets,
                },
            );
        }

        pkt.ttl = pkt.ttl.saturating_sub(1);
        if pkt.ttl == 0 {
            debug!(host = %self.hostname, src = %pkt.src, dst = %pkt.dst, "TTL 耗尽，丢弃");
            if pkt.protocol != IpProtocol::Icmp {
                let icmp = IcmpPacket::time_exceeded(&pkt);
                self.send_icmp(sim, lan, ifcs, ifc, pkt.src, icmp);
            }
            lan.stats.packets_dropped += 1;
            lan.record(
                sim.now(),
                TraceEventKind::PacketDropped {
                    host: self.hostname.clone(),
                    reason: "ttl exceeded".into(),
                },
            );
            return;
        }
        // TTL 减一后的增量校验和更新（保留原实现的简化折叠；
        // 序列化路径总是整体重算，线上包不受影响）
        let sum = pkt.checksum as u32 + 1;
        pkt.checksum = (sum + (sum >> 16)) as u16;

        if ifcs.iter().any(|i| i.ip == pkt.dst) {
            if pkt.is_fragment() {
                if let Some(assembled) = self.reassembly.add(pkt) {
                    self.deliver(sim, lan, assembled);
                }
            } else {
                self.deliver(sim, lan, pkt);
            }
            return;
        }
        self.route(sim, lan, ifcs, routing, pkt, ifc);
    }

    /// 交付本机上层。ICMP 在本地解析并记日志。
    fn deliver(&mut self, sim: &mut Simulator, lan: &mut Lan, pkt: IpPacket) {
        if pkt.protocol == IpProtocol::Icmp {
            match IcmpPacket::from_bytes(&pkt.data) {
                Ok(icmp) => {
                    info!(
                        host = %self.hostname,
                        icmp_type = icmp.icmp_type,
                        code = icmp.code,
                        src = %pkt.src,
                        "收到 ICMP 报文"
                    );
                }
                Err(err) => {
                    debug!(host = %self.hostname, %err, "ICMP 校验失败，丢弃");
                    lan.stats.packets_dropped += 1;
                    return;
                }
            }
        }
        info!(host = %self.hostname, src = %pkt.src, bytes = pkt.data.len(), "📬 数据报交付上层");
        lan.stats.packets_delivered += 1;
        lan.record(
            sim.now(),
            TraceEventKind::PacketDelivered {
                host: self.hostname.clone(),
                src: pkt.src.to_string(),
                protocol: pkt.protocol as u8,
                len: pkt.data.len(),
            },
        );
        self.delivered.push(Delivery {
            src: pkt.src,
            dst: pkt.dst,
            protocol: pkt.protocol,
            data: pkt.data,
        });
    }

    /// 转发：最长前缀匹配选路，必要时分片，超 MTU 且 DF 置位则打回。
    fn route(
        &mut self,
        sim: &mut Simulator,
        lan: &mut Lan,
        ifcs: &mut [Interface],
        routing: &RoutingTable,
        pkt: IpPacket,
        ingress: usize,
    ) {
        let Some(route) = routing.best_match(pkt.dst) else {
            debug!(host = %self.hostname, dst = %pkt.dst, "无路由，回送网络不可达");
            let icmp = IcmpPacket::destination_network_unreachable(&pkt);
            self.send_icmp(sim, lan, ifcs, ingress, pkt.src, icmp);
            lan.stats.packets_dropped += 1;
            return;
        };
        let egress = route.interface;
        let gateway = route.gateway;
        let mtu = ifcs[egress].mtu as usize;

        if pkt.total_length() as usize > mtu {
            if pkt.df {
                debug!(host = %self.hostname, dst = %pkt.dst, mtu, "超 MTU 且 DF 置位，回送分片需求");
                let icmp = IcmpPacket::fragmentation_required(&pkt);
                self.send_icmp(sim, lan, ifcs, ingress, pkt.src, icmp);
                lan.stats.packets_dropped += 1;
                return;
            }
            for frag in fragment(&pkt, mtu, sim.now()) {
                let next_hop = gateway.unwrap_or(frag.dst);
                self.output_to_next_hop(sim, lan, ifcs, egress, next_hop, frag);
            }
            return;
        }
        let next_hop = gateway.unwrap_or(pkt.dst);
        self.output_to_next_hop(sim, lan, ifcs, egress, next_hop, pkt);
    }

    fn send_icmp(
        &mut self,
        sim: &mut Simulator,
        lan: &mut Lan,
        ifcs: &mut [Interface],
        ifc: usize,
        dst: Ipv4Addr,
        icmp: IcmpPacket,
    ) {
        debug!(
            host = %self.hostname,
            icmp_type = icmp.icmp_type,
            code = icmp.code,
            dst = %dst,
            "发出 ICMP 报文"
        );
        lan.stats.icmp_sent += 1;
        lan.record(
            sim.now(),
            TraceEventKind::IcmpSent {
                host: self.hostname.clone(),
                icmp_type: icmp.icmp_type,
                code: icmp.code,
                dst: dst.to_string(),
            },
        );
        let pkt = IpPacket::fresh(ifcs[ifc].ip, dst, IpProtocol::Icmp, icmp.to_bytes());
        let next_hop = if dst == ifcs[ifc].ip
            || same_subnet(dst, ifcs[ifc].ip, ifcs[ifc].netmask)
        {
            dst
        } else if let Some(gw) = ifcs[ifc].gateway {
            gw
        } else {
            debug!(host = %self.hostname, dst = %dst, "ICMP 无可用下一跳，丢弃");
            lan.stats.packets_dropped += 1;
            return;
        };
        self.output_to_next_hop(sim, lan, ifcs, ifc, next_hop, pkt);
    }

    // ---- 观察接口 ----

    pub fn delivered(&self) -> &[Delivery] {
        &self.delivered
    }

    pub fn arp_lookup(&self, now: SimTime, ifc: usize, ip: Ipv4Addr) -> Option<MacAddr> {
        self.arp.get(ifc)?.lookup(now, ip)
    }

    /// 预置一条 ARP 表项（测试与演示拓扑用）。
    pub fn seed_arp(&mut self, now: SimTime, ifc: usize, ip: Ipv4Addr, mac: MacAddr) {
        self.ensure_ifc(ifc);
        self.arp[ifc].insert(now, ip, mac);
    }

    pub fn output_queue_len(&self, ifc: usize) -> usize {
        self.out_q.get(ifc).map_or(0, CappedQueue::len)
    }

    pub fn waiting_len(&self, ifc: usize) -> usize {
        self.waiting.get(ifc).map_or(0, Vec::len)
    }
}

/// 把包按 MTU 切成分片：段长为 (MTU−20) 向下取整到 8 的倍数，
/// 标识取当前仿真时间模 65536，子分片偏移叠加父偏移，
/// 除最后一片外 MF 置位（分片的分片保留父 MF）。
pub fn fragment(pkt: &IpPacket, mtu: usize, now: SimTime) -> Vec<IpPacket> {
    let max_seg = (mtu.saturating_sub(IP_HEADER_LEN) & !7).max(8);
    let ident = (now.0 % 65_536) as u16;
    let total = pkt.data.len();
    let count = total.div_ceil(max_seg).max(1);
    let mut out = Vec::with_capacity(count);
    let mut offset = 0usize;
    for i in 0..count {
        let more = i < count - 1;
        let size = max_seg.min(total - offset);
        let mut frag = pkt.clone();
        frag.identification = ident;
        frag.mf = pkt.mf || more;
        frag.fragment_offset = pkt.fragment_offset + (offset / 8) as u16;
        frag.data = pkt.data[offset..offset + size].to_vec();
        out.push(frag);
        offset += max_seg;
    }
    out
}
