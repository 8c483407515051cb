//! 设备 trait
//!
//! 挂在电缆上的设备（主机、网桥、集线器）的统一接口。
//! 信号事件通过 `Lan` 的设备表分发到这里。

use super::id::{ConnectorId, DeviceId, PortNo};
use super::lan::Lan;
use super::nic::NicTimerKind;
use crate::sim::Simulator;
use std::any::Any;

/// 设备接口。
pub trait Device: Send {
    /// 获取设备标识符
    fn id(&self) -> DeviceId;

    /// 获取设备名称
    fn name(&self) -> &str;

    /// 某端口感知到载波
    fn on_signal_sense(&mut self, port: PortNo, sim: &mut Simulator, lan: &mut Lan);

    /// 某端口上的信号结束。`data == None` 表示阻塞信号（jam）。
    fn on_signal_cease(
        &mut self,
        port: PortNo,
        sender: ConnectorId,
        data: Option<Vec<u8>>,
        sim: &mut Simulator,
        lan: &mut Lan,
    );

    /// 网卡定时器到期（发送排空、IFG 到期、退避重试）。集线器无网卡，默认忽略。
    fn on_nic_timer(
        &mut self,
        _port: PortNo,
        _kind: NicTimerKind,
        _sim: &mut Simulator,
        _lan: &mut Lan,
    ) {
    }

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
