use crate::net::{EtherType, Frame, MAX_PAYLOAD};
use crate::util::WireError;

fn mac(last: u8) -> crate::net::MacAddr {
    crate::net::MacAddr([0x02, 0, 0, 0, 0, last])
}

#[test]
fn frame_round_trips_with_padding() {
    let frame = Frame::new(mac(1), mac(2), EtherType::Ipv4, vec![9, 8, 7]).expect("frame");
    let bytes = frame.to_bytes();
    // dst(6) + src(6) + etherType(2) + len(4) + 零填充到 46 + FCS(4)
    assert_eq!(bytes.len(), 18 + 46 + 4);
    assert_eq!(frame.wire_len(), bytes.len());

    let back = Frame::from_bytes(&bytes).expect("round trip");
    assert_eq!(back, frame);
    assert_eq!(back.payload, vec![9, 8, 7]);
}

#[test]
fn frame_round_trips_at_max_payload() {
    let frame =
        Frame::new(mac(1), mac(2), EtherType::Arp, vec![0xAB; MAX_PAYLOAD]).expect("frame");
    let bytes = frame.to_bytes();
    assert_eq!(bytes.len(), 18 + MAX_PAYLOAD + 4);
    assert_eq!(Frame::from_bytes(&bytes).expect("round trip"), frame);
}

#[test]
fn frame_rejects_oversized_payload() {
    assert!(Frame::new(mac(1), mac(2), EtherType::Ipv4, vec![0; MAX_PAYLOAD + 1]).is_err());
}

#[test]
fn corrupted_byte_fails_fcs_check() {
    let frame = Frame::new(mac(1), mac(2), EtherType::Ipv4, vec![1, 2, 3, 4]).expect("frame");
    let mut bytes = frame.to_bytes();
    bytes[20] ^= 0x40;
    assert_eq!(Frame::from_bytes(&bytes), Err(WireError::BadFcs));
}

#[test]
fn unknown_ether_type_is_rejected() {
    let frame = Frame::new(mac(1), mac(2), EtherType::Ipv4, vec![1]).expect("frame");
    let mut bytes = frame.to_bytes();
    // etherType 字段位于 dst+src 之后
    bytes[12] = 0x12;
    bytes[13] = 0x34;
    assert_eq!(
        Frame::from_bytes(&bytes),
        Err(WireError::BadValue("ether type"))
    );
}

#[test]
fn truncated_frame_is_rejected() {
    let frame = Frame::new(mac(1), mac(2), EtherType::Ipv4, vec![1, 2, 3]).expect("frame");
    let bytes = frame.to_bytes();
    assert_eq!(
        Frame::from_bytes(&bytes[..bytes.len() - 2]),
        Err(WireError::Truncated)
    );
}
