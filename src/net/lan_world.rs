//! 局域网世界实现
//!
//! 定义网络仿真的世界（World）实现，持有局域网拓扑。

use super::lan::Lan;
use crate::sim::World;
use std::any::Any;

/// 一个默认的局域网世界实现：持有 Lan。
#[derive(Default)]
pub struct LanWorld {
    pub lan: Lan,
}

impl LanWorld {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            lan: Lan::new(seed),
        }
    }
}

impl World for LanWorld {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
