// crates/hc_physics/src/grid/partition.rs

//! 子域划分与 halo 交换计划
//!
//! 全局网格按 `npx × npy` 均匀切块，rank = py * npx + px。
//! 每个子域持有一层 ghost；垂向不切分，因此 ±Z 永远是物理边界。

use hc_config::GridConfig;

use super::direction::Direction;
use crate::error::{PhysicsError, PhysicsResult};

/// 子域在分区中的位置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subdomain {
    /// 子域编号
    pub rank: usize,
    /// x 方向子域数
    pub npx: usize,
    /// y 方向子域数
    pub npy: usize,
    /// x 方向分区坐标
    pub px: usize,
    /// y 方向分区坐标
    pub py: usize,
    /// 本地 x 单元数
    pub nx: usize,
    /// 本地 y 单元数
    pub ny: usize,
    /// 本地第一列的全局 i
    pub i0: usize,
    /// 本地第一行的全局 j
    pub j0: usize,
}

impl Subdomain {
    /// 按配置构造第 `rank` 个子域
    pub fn new(config: &GridConfig, rank: usize) -> PhysicsResult<Self> {
        let (npx, npy) = (config.npx.max(1), config.npy.max(1));
        if rank >= npx * npy {
            return Err(PhysicsError::invalid_grid(format!(
                "rank {} 超出子域总数 {}",
                rank,
                npx * npy
            )));
        }
        if config.nx % npx != 0 || config.ny % npy != 0 {
            return Err(PhysicsError::invalid_grid(format!(
                "{}x{} 无法被 {}x{} 子域整除",
                config.nx, config.ny, npx, npy
            )));
        }
        let nx = config.nx / npx;
        let ny = config.ny / npy;
        let px = rank % npx;
        let py = rank / npx;
        Ok(Self {
            rank,
            npx,
            npy,
            px,
            py,
            nx,
            ny,
            i0: px * nx,
            j0: py * ny,
        })
    }

    /// 单子域（串行）
    pub fn serial(config: &GridConfig) -> Self {
        Self {
            rank: 0,
            npx: 1,
            npy: 1,
            px: 0,
            py: 0,
            nx: config.nx,
            ny: config.ny,
            i0: 0,
            j0: 0,
        }
    }

    /// 该侧是否为物理边界（非子域间边界）
    pub fn is_physical(&self, side: Direction) -> bool {
        match side {
            Direction::XPlus => self.px + 1 == self.npx,
            Direction::XMinus => self.px == 0,
            Direction::YPlus => self.py + 1 == self.npy,
            Direction::YMinus => self.py == 0,
            Direction::ZPlus | Direction::ZMinus => true,
        }
    }

    /// 该侧相邻子域的 rank
    pub fn neighbor_rank(&self, side: Direction) -> Option<usize> {
        if self.is_physical(side) {
            return None;
        }
        let (px, py) = match side {
            Direction::XPlus => (self.px + 1, self.py),
            Direction::XMinus => (self.px - 1, self.py),
            Direction::YPlus => (self.px, self.py + 1),
            Direction::YMinus => (self.px, self.py - 1),
            Direction::ZPlus | Direction::ZMinus => return None,
        };
        Some(py * self.npx + px)
    }

    /// 本地 ghost 坐标 (pi, pj) 对应的全局坐标（可能为 -1 或越过全局边界）
    #[inline]
    pub fn global_of(&self, pi: usize, pj: usize) -> (isize, isize) {
        (
            self.i0 as isize + pi as isize - 1,
            self.j0 as isize + pj as isize - 1,
        )
    }

    /// 全局坐标 (gi, gj) 在本子域内的填充坐标；不属于本子域时为 None
    pub fn local_of(&self, gi: usize, gj: usize) -> Option<(usize, usize)> {
        let inside = (self.i0..self.i0 + self.nx).contains(&gi)
            && (self.j0..self.j0 + self.ny).contains(&gj);
        inside.then(|| (gi - self.i0 + 1, gj - self.j0 + 1))
    }
}

/// 与一个相邻子域的数据交换
#[derive(Debug, Clone)]
pub struct HaloLink {
    /// 本子域所在侧
    pub side: Direction,
    /// 对端 rank
    pub peer: usize,
    /// 发送的内部单元（填充索引）
    pub send: Vec<usize>,
    /// 接收的 ghost 单元（填充索引）
    pub recv: Vec<usize>,
}

/// halo 交换计划
///
/// 每条链路沿 pj（或 pi）再沿 pk 遍历面条带，双方顺序一致；不交换角点。
#[derive(Debug, Clone, Default)]
pub struct HaloPlan {
    /// 链路列表
    pub links: Vec<HaloLink>,
}

impl HaloPlan {
    /// 空计划（串行）
    pub fn empty() -> Self {
        Self::default()
    }

    /// 是否无需交换
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// 根据填充尺寸 (px, py, pz) 与索引函数构造
    pub(crate) fn build(
        sub: &Subdomain,
        dims: (usize, usize, usize),
        index: impl Fn(usize, usize, usize) -> usize,
    ) -> Self {
        let (px, py, pz) = dims;
        let mut links = Vec::new();
        for side in Direction::LATERAL {
            let Some(peer) = sub.neighbor_rank(side) else {
                continue;
            };
            let mut send = Vec::new();
            let mut recv = Vec::new();
            match side {
                Direction::XPlus | Direction::XMinus => {
                    let (si, ri) = if side == Direction::XPlus {
                        (px - 2, px - 1)
                    } else {
                        (1, 0)
                    };
                    for pj in 1..py - 1 {
                        for pk in 0..pz {
                            send.push(index(si, pj, pk));
                            recv.push(index(ri, pj, pk));
                        }
                    }
                }
                _ => {
                    let (sj, rj) = if side == Direction::YPlus {
                        (py - 2, py - 1)
                    } else {
                        (1, 0)
                    };
                    for pi in 1..px - 1 {
                        for pk in 0..pz {
                            send.push(index(pi, sj, pk));
                            recv.push(index(pi, rj, pk));
                        }
                    }
                }
            }
            links.push(HaloLink {
                side,
                peer,
                send,
                recv,
            });
        }
        Self { links }
    }
}
