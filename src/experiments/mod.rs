//! 实验与演示
//!
//! 标准拓扑构建函数与注入事件。

pub mod demo;
