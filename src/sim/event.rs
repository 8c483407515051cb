//! 事件 trait
//!
//! 定义仿真事件接口。

use super::simulator::Simulator;
use super::world::World;
use std::any::Any;

/// 事件：可被调度执行。使用 `self: Box<Self>` 以支持 move/所有权转移。
///
/// `as_any` 供 `Simulator::cancel_matching` 的谓词向下转型检查具体事件类型，
/// 与 `World::as_any_mut` 的用法一致。
pub trait Event: Send + 'static {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World);

    fn as_any(&self) -> &dyn Any;
}
