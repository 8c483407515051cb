//! 仿真器
//!
//! 定义事件驱动仿真器，维护当前时间与事件队列。

use super::event::Event;
use super::scheduled_event::ScheduledEvent;
use super::time::SimTime;
use super::world::World;
use std::any::Any;
use std::collections::BinaryHeap;
use tracing::{debug, info, trace};

/// 事件驱动仿真器：维护当前时间与事件队列。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    q: BinaryHeap<ScheduledEvent>,
}

/// 通用回调事件：把一个闭包调度到未来某一时刻执行。
pub struct Callback {
    f: Box<dyn FnOnce(&mut Simulator, &mut dyn World) + Send>,
}

impl Event for Callback {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        (self.f)(sim, world);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 调度事件在指定时间执行
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) {
        let seq = self.next_seq;
        trace!(now = ?self.now, seq, at = ?at, "调度事件");

        self.next_seq = self.next_seq.wrapping_add(1);
        self.q.push(ScheduledEvent {
            at,
            seq,
            ev: Box::new(ev),
        });
    }

    /// 调度事件在 `now + delay` 时刻执行
    pub fn schedule_in<E: Event>(&mut self, delay: SimTime, ev: E) {
        self.schedule(self.now.saturating_add(delay), ev);
    }

    /// 调度一个回调闭包在 `now + delay` 时刻执行
    pub fn schedule_callback<F>(&mut self, delay: SimTime, f: F)
    where
        F: FnOnce(&mut Simulator, &mut dyn World) + Send + 'static,
    {
        self.schedule_in(delay, Callback { f: Box::new(f) });
    }

    /// 移除所有满足谓词的未触发事件，返回移除数量。
    ///
    /// 排序键 (at, seq) 不因重建而改变，同一时刻事件的 FIFO 次序得以保留。
    pub fn cancel_matching<F>(&mut self, pred: F) -> usize
    where
        F: Fn(&dyn Event) -> bool,
    {
        let items = std::mem::take(&mut self.q).into_vec();
        let before = items.len();
        let kept: Vec<ScheduledEvent> = items
            .into_iter()
            .filter(|item| !pred(item.ev.as_ref()))
            .collect();
        let removed = before - kept.len();
        self.q = BinaryHeap::from(kept);

        debug!(removed, queue_size = self.q.len(), "取消匹配事件");
        removed
    }

    /// 下一个事件的触发时间（若队列非空）。
    pub fn peek_next_at(&self) -> Option<SimTime> {
        self.q.peek().map(|item| item.at)
    }

    /// 弹出最早的事件，并把时钟推进到其触发时间。
    pub fn dequeue_next(&mut self) -> Option<ScheduledEvent> {
        let item = self.q.pop()?;
        self.now = item.at;
        Some(item)
    }

    /// 运行直到事件队列为空或到达 `until`。
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        while let Some(top) = self.q.peek() {
            if top.at > until {
                break;
            }
            let item = self.q.pop().expect("peek then pop");
            self.now = item.at;
            item.fire(self, world);
            world.on_tick(self);
        }
        self.now = self.now.max(until);
    }

    /// 运行所有事件直到队列为空。
    pub fn run(&mut self, world: &mut dyn World) {
        info!("▶️  开始运行仿真");
        debug!(now = ?self.now, queue_size = self.q.len(), "初始状态");

        let mut event_count = 0u64;
        while let Some(item) = self.q.pop() {
            event_count += 1;
            self.now = item.at;

            trace!(
                event_num = event_count,
                now = ?self.now,
                seq = item.seq,
                remaining_queue = self.q.len(),
                "执行事件"
            );

            item.fire(self, world);
            world.on_tick(self);
        }

        info!(
            total_events = event_count,
            final_time = ?self.now,
            "✅ 仿真完成"
        );
    }
}
