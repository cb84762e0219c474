// crates/hc_physics/src/transport/serial.rs

//! 单子域通信（全部为恒等操作）

use super::Transport;
use crate::error::PhysicsResult;
use crate::grid::HaloPlan;

/// 串行通信
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialTransport;

impl Transport for SerialTransport {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn exchange(&self, _field: &mut [f64], _plan: &HaloPlan) -> PhysicsResult<()> {
        Ok(())
    }

    fn reduce_min(&self, value: f64) -> PhysicsResult<f64> {
        Ok(value)
    }

    fn reduce_sum(&self, value: f64) -> PhysicsResult<f64> {
        Ok(value)
    }

    fn broadcast(&self, value: f64, _root: usize) -> PhysicsResult<f64> {
        Ok(value)
    }
}
