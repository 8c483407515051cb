//! 标识符类型
//!
//! 定义设备、电缆、连接器和端口的唯一标识符。

/// 设备标识符（主机/网桥/集线器在设备表中的下标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(pub usize);

/// 电缆标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CableId(pub usize);

/// 连接器标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectorId(pub usize);

/// 设备上的端口号（主机＝接口下标，网桥＝端口下标）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortNo(pub usize);
