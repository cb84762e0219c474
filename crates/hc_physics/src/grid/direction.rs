// crates/hc_physics/src/grid/direction.rs

//! 六邻域方向
//!
//! 层号自上而下递增，因此 `ZPlus` 指向下一层（更深），`ZMinus` 指向上一层。
//! 地表二维网格只使用 [`Direction::LATERAL`]。

use serde::{Deserialize, Serialize};

/// 坐标轴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// x 轴
    X,
    /// y 轴
    Y,
    /// z 轴（向下）
    Z,
}

impl Axis {
    /// 该轴的正、负方向
    #[inline]
    pub fn directions(self) -> (Direction, Direction) {
        match self {
            Axis::X => (Direction::XPlus, Direction::XMinus),
            Axis::Y => (Direction::YPlus, Direction::YMinus),
            Axis::Z => (Direction::ZPlus, Direction::ZMinus),
        }
    }
}

/// 邻居方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Direction {
    /// +x
    XPlus = 0,
    /// -x
    XMinus = 1,
    /// +y
    YPlus = 2,
    /// -y
    YMinus = 3,
    /// 下一层
    ZPlus = 4,
    /// 上一层
    ZMinus = 5,
}

impl Direction {
    /// 全部六个方向
    pub const ALL: [Direction; 6] = [
        Direction::XPlus,
        Direction::XMinus,
        Direction::YPlus,
        Direction::YMinus,
        Direction::ZPlus,
        Direction::ZMinus,
    ];

    /// 水平四个方向
    pub const LATERAL: [Direction; 4] = [
        Direction::XPlus,
        Direction::XMinus,
        Direction::YPlus,
        Direction::YMinus,
    ];

    /// 反方向
    #[inline]
    pub fn opposite(self) -> Self {
        match self {
            Direction::XPlus => Direction::XMinus,
            Direction::XMinus => Direction::XPlus,
            Direction::YPlus => Direction::YMinus,
            Direction::YMinus => Direction::YPlus,
            Direction::ZPlus => Direction::ZMinus,
            Direction::ZMinus => Direction::ZPlus,
        }
    }

    /// 所属坐标轴
    #[inline]
    pub fn axis(self) -> Axis {
        match self {
            Direction::XPlus | Direction::XMinus => Axis::X,
            Direction::YPlus | Direction::YMinus => Axis::Y,
            Direction::ZPlus | Direction::ZMinus => Axis::Z,
        }
    }

    /// 是否为正方向
    #[inline]
    pub fn is_plus(self) -> bool {
        matches!(self, Direction::XPlus | Direction::YPlus | Direction::ZPlus)
    }

    /// 是否为垂向
    #[inline]
    pub fn is_vertical(self) -> bool {
        self.axis() == Axis::Z
    }

    /// 数组下标（0..6）
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// (di, dj, dk) 偏移
    #[inline]
    pub fn offset(self) -> (isize, isize, isize) {
        match self {
            Direction::XPlus => (1, 0, 0),
            Direction::XMinus => (-1, 0, 0),
            Direction::YPlus => (0, 1, 0),
            Direction::YMinus => (0, -1, 0),
            Direction::ZPlus => (0, 0, 1),
            Direction::ZMinus => (0, 0, -1),
        }
    }
}
