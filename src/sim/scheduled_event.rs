//! 调度事件
//!
//! 定义调度事件结构及其优先级比较。

use super::event::Event;
use super::simulator::Simulator;
use super::time::SimTime;
use super::world::World;
use std::cmp::Ordering;

/// 调度事件，包含执行时间、序列号和事件对象。
pub struct ScheduledEvent {
    pub(crate) at: SimTime,
    pub(crate) seq: u64,
    pub(crate) ev: Box<dyn Event>,
}

impl ScheduledEvent {
    /// 事件的触发时间。
    pub fn at(&self) -> SimTime {
        self.at
    }

    /// 执行事件体。调用方必须先把仿真时钟推进到 `at()`。
    pub fn fire(self, sim: &mut Simulator, world: &mut dyn World) {
        self.ev.execute(sim, world);
    }
}

// BinaryHeap 是 max-heap；我们需要最小时间优先，因此反向比较。
// 排序只依赖 (at, seq)，因此 cancel_matching 重建堆后同刻 FIFO 次序不变。
impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.at.cmp(&other.at) {
            Ordering::Equal => self.seq.cmp(&other.seq),
            ord => ord,
        }
        .reverse()
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}
