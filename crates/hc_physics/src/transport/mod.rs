// crates/hc_physics/src/transport/mod.rs

//! 子域间通信
//!
//! 核心把通信视为不透明的同步调用：`exchange` 返回时本地 ghost 已持有
//! 相邻子域的已提交值；`reduce_min` 每步执行一次。所有 rank 必须以相同顺序
//! 调用集合操作。

pub mod local;
pub mod serial;

pub use local::{LocalCluster, LocalTransport};
pub use serial::SerialTransport;

use crate::error::PhysicsResult;
use crate::grid::HaloPlan;

/// 通信提供者
pub trait Transport: Send + Sync {
    /// 本子域编号
    fn rank(&self) -> usize;

    /// 子域总数
    fn size(&self) -> usize;

    /// halo 交换
    fn exchange(&self, field: &mut [f64], plan: &HaloPlan) -> PhysicsResult<()>;

    /// 全局最小值
    fn reduce_min(&self, value: f64) -> PhysicsResult<f64>;

    /// 全局求和
    fn reduce_sum(&self, value: f64) -> PhysicsResult<f64>;

    /// 从 `root` 广播
    fn broadcast(&self, value: f64, root: usize) -> PhysicsResult<f64>;

    /// 全局最大值
    fn reduce_max(&self, value: f64) -> PhysicsResult<f64> {
        Ok(-self.reduce_min(-value)?)
    }

    /// 是否为根
    fn is_root(&self) -> bool {
        self.rank() == 0
    }
}
