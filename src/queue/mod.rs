//! 队列类型
//!
//! 提供容量受限的 FIFO（CappedQueue）：入队满则失败而不是阻塞，
//! 网卡发送 FIFO、网桥端口队列与 IP 输入队列都建立在它之上。

use std::collections::VecDeque;

/// 容量受限的 FIFO 队列。
///
/// 入队失败时把元素原样返还给调用方，由上层决定丢弃策略。
#[derive(Debug)]
pub struct CappedQueue<T> {
    cap: usize,
    q: VecDeque<T>,
}

impl<T> CappedQueue<T> {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            q: VecDeque::new(),
        }
    }

    /// 入队：成功返回 Ok；队列已满则返回 Err(item)
    pub fn enqueue(&mut self, item: T) -> Result<(), T> {
        if self.q.len() >= self.cap {
            return Err(item);
        }
        self.q.push_back(item);
        Ok(())
    }

    /// 出队：按 FIFO 次序返回队头元素
    pub fn dequeue(&mut self) -> Option<T> {
        self.q.pop_front()
    }

    pub fn len(&self) -> usize {
        self.q.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.q.iter()
    }
}
