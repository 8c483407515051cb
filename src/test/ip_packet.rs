use crate::ip::{internet_checksum, ArpPacket, IcmpPacket, IpPacket, IpProtocol};
use crate::net::MacAddr;
use crate::util::WireError;
use std::net::Ipv4Addr;

fn sample_packet() -> IpPacket {
    IpPacket::fresh(
        Ipv4Addr::new(192, 168, 1, 2),
        Ipv4Addr::new(192, 168, 1, 3),
        IpProtocol::Udp,
        vec![1, 2, 3, 4, 5],
    )
}

#[test]
fn ip_packet_round_trips() {
    let pkt = sample_packet();
    let bytes = pkt.to_bytes();
    let back = IpPacket::from_bytes(&bytes).expect("round trip");

    assert_eq!(back.version, 4);
    assert_eq!(back.ihl, 5);
    assert_eq!(back.src, pkt.src);
    assert_eq!(back.dst, pkt.dst);
    assert_eq!(back.protocol, IpProtocol::Udp);
    assert_eq!(back.ttl, 64);
    assert_eq!(back.data, pkt.data);
    // 再序列化应逐字节一致
    assert_eq!(back.to_bytes(), bytes);
    // 反序列化后的结构体（校验和为线上值）严格等于自身的再解析
    assert_eq!(IpPacket::from_bytes(&back.to_bytes()).expect("again"), back);
}

#[test]
fn checksum_over_header_including_field_is_zero() {
    let pkt = sample_packet();
    assert_eq!(internet_checksum(&pkt.header_bytes()), 0);
}

#[test]
fn corrupted_header_fails_checksum() {
    let mut bytes = sample_packet().to_bytes();
    bytes[8] = bytes[8].wrapping_add(1); // TTL
    assert_eq!(IpPacket::from_bytes(&bytes), Err(WireError::BadChecksum));
}

#[test]
fn flags_and_fragment_offset_round_trip() {
    let mut pkt = sample_packet();
    pkt.df = true;
    pkt.mf = true;
    pkt.fragment_offset = 185;
    let back = IpPacket::from_bytes(&pkt.to_bytes()).expect("round trip");
    assert!(back.df);
    assert!(back.mf);
    assert_eq!(back.fragment_offset, 185);
    assert!(back.is_fragment());
}

#[test]
fn fragment_detection_covers_both_conditions() {
    let mut pkt = sample_packet();
    assert!(!pkt.is_fragment());
    pkt.mf = true;
    assert!(pkt.is_fragment());
    pkt.mf = false;
    pkt.fragment_offset = 1;
    assert!(pkt.is_fragment());
}

#[test]
fn unknown_protocol_is_rejected() {
    let mut bytes = sample_packet().to_bytes();
    bytes[9] = 99;
    // 协议号在校验和覆盖范围内，同步修正校验和以命中协议检查
    bytes[10] = 0;
    bytes[11] = 0;
    let sum = internet_checksum(&bytes[..20]);
    bytes[10] = (sum >> 8) as u8;
    bytes[11] = (sum & 0xFF) as u8;
    assert_eq!(
        IpPacket::from_bytes(&bytes),
        Err(WireError::BadValue("ip protocol"))
    );
}

#[test]
fn icmp_round_trips_and_validates_checksum() {
    let icmp = IcmpPacket {
        icmp_type: 11,
        code: 0,
        data: vec![1, 2, 3],
    };
    let bytes = icmp.to_bytes();
    assert_eq!(internet_checksum(&bytes), 0);
    assert_eq!(IcmpPacket::from_bytes(&bytes).expect("round trip"), icmp);

    let mut corrupt = bytes.clone();
    corrupt[0] = 3;
    assert_eq!(IcmpPacket::from_bytes(&corrupt), Err(WireError::BadChecksum));
}

#[test]
fn icmp_error_builders_quote_header_and_first_eight_bytes() {
    let pkt = IpPacket::fresh(
        Ipv4Addr::new(10, 0, 0, 1),
        Ipv4Addr::new(10, 0, 0, 2),
        IpProtocol::Tcp,
        (0..32).collect(),
    );
    let te = IcmpPacket::time_exceeded(&pkt);
    assert_eq!(te.icmp_type, IcmpPacket::TYPE_TIME_EXCEEDED);
    assert_eq!(te.code, 0);
    assert_eq!(te.data.len(), 20 + 8);
    assert_eq!(&te.data[20..], &[0, 1, 2, 3, 4, 5, 6, 7]);

    let unreachable = IcmpPacket::destination_network_unreachable(&pkt);
    assert_eq!(unreachable.icmp_type, IcmpPacket::TYPE_DESTINATION_UNREACHABLE);
    assert_eq!(unreachable.code, IcmpPacket::CODE_NETWORK_UNREACHABLE);

    let frag = IcmpPacket::fragmentation_required(&pkt);
    assert_eq!(frag.icmp_type, IcmpPacket::TYPE_DESTINATION_UNREACHABLE);
    assert_eq!(frag.code, IcmpPacket::CODE_FRAGMENTATION_REQUIRED);

    let quench = IcmpPacket::source_quench(&pkt);
    assert_eq!(quench.icmp_type, IcmpPacket::TYPE_SOURCE_QUENCH);
    assert_eq!(quench.code, 0);
}

#[test]
fn icmp_quote_handles_short_payloads() {
    let pkt = IpPacket::fresh(
        Ipv4Addr::new(10, 0, 0, 1),
        Ipv4Addr::new(10, 0, 0, 2),
        IpProtocol::Tcp,
        vec![42, 43],
    );
    let te = IcmpPacket::time_exceeded(&pkt);
    assert_eq!(te.data.len(), 20 + 2);
}

#[test]
fn arp_round_trips_and_requests_broadcast() {
    let sender: MacAddr = "AA:AA:AA:AA:AA:AA".parse().expect("mac");
    let request = ArpPacket::request(
        sender,
        Ipv4Addr::new(192, 168, 1, 2),
        Ipv4Addr::new(192, 168, 1, 3),
    );
    assert!(request.is_request);
    assert_eq!(request.target_mac, MacAddr::BROADCAST);

    let bytes = request.to_bytes();
    assert_eq!(bytes.len(), 21);
    assert_eq!(ArpPacket::from_bytes(&bytes).expect("round trip"), request);

    let reply = ArpPacket::reply(
        "BB:BB:BB:BB:BB:BB".parse().expect("mac"),
        Ipv4Addr::new(192, 168, 1, 3),
        sender,
        Ipv4Addr::new(192, 168, 1, 2),
    );
    assert!(!reply.is_request);
    assert_eq!(
        ArpPacket::from_bytes(&reply.to_bytes()).expect("round trip"),
        reply
    );
}

#[test]
fn arp_rejects_bad_operation_byte() {
    let request = ArpPacket::request(
        MacAddr([2, 0, 0, 0, 0, 1]),
        Ipv4Addr::new(10, 0, 0, 1),
        Ipv4Addr::new(10, 0, 0, 2),
    );
    let mut bytes = request.to_bytes();
    bytes[0] = 7;
    assert_eq!(
        ArpPacket::from_bytes(&bytes),
        Err(WireError::BadValue("arp operation"))
    );
}
