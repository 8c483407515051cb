//! 运行轨迹记录（用于确定性对比与离线回放）
//!
//! 设计目标：
//! - **结构化**：用 JSON 事件而不是解析文本日志
//! - **可对比**：相同种子的两次运行产生逐字节相同的轨迹
//! - **可回放**：支持时间轴播放、单步、过滤

mod types;

pub use types::{TraceEvent, TraceEventKind, TraceLogger};
