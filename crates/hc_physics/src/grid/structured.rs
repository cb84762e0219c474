// crates/hc_physics/src/grid/structured.rs

//! 结构化网格与拓扑接口
//!
//! 所有场量存放在带一层 ghost 的填充数组中：
//!
//! ```text
//! 3D: id = (pj * px + pi) * pz + pk     pk = 0 为顶部 ghost，pk = 1 为第一层
//! 2D: id =  pj * px + pi                与 3D 的列号一致
//! ```
//!
//! 物理边界外的 ghost 镜像相邻内部单元的激活状态；子域间 ghost 取相邻子域的真实状态。

use hc_config::GridConfig;

use super::direction::Direction;
use super::partition::{HaloPlan, Subdomain};
use crate::error::{PhysicsError, PhysicsResult};

/// 单元标识（填充数组下标）
pub type CellId = usize;

/// 网格拓扑提供者
///
/// 各计算阶段只读消费：邻居查询、激活状态、层厚、柱顶标记与行编号。
pub trait GridTopology {
    /// 填充数组长度（含 ghost）
    fn n_cells(&self) -> usize;

    /// 矩阵行数（内部单元数，含非激活单元）
    fn n_rows(&self) -> usize;

    /// 指定方向的邻居（越出填充数组时为 None）
    fn neighbor(&self, cell: CellId, dir: Direction) -> Option<CellId>;

    /// 是否激活
    fn is_active(&self, cell: CellId) -> bool;

    /// 是否为内部（非 ghost）单元
    fn is_interior(&self, cell: CellId) -> bool;

    /// 是否为柱顶（最上层激活单元）
    fn is_top(&self, cell: CellId) -> bool;

    /// 层厚（二维网格为 0）
    fn dz(&self, cell: CellId) -> f64;

    /// 所属柱（即二维填充下标）
    fn column(&self, cell: CellId) -> usize;

    /// 单元对应的矩阵行
    fn row_of(&self, cell: CellId) -> Option<usize>;

    /// 矩阵行对应的单元
    fn cell_of_row(&self, row: usize) -> CellId;

    /// 内部且激活的邻居
    #[inline]
    fn active_interior_neighbor(&self, cell: CellId, dir: Direction) -> Option<CellId> {
        self.neighbor(cell, dir)
            .filter(|&n| self.is_interior(n) && self.is_active(n))
    }
}

// ============================================================
// 三维地下网格
// ============================================================

/// 三维结构化网格（单个子域）
#[derive(Debug, Clone)]
pub struct StructuredGrid3D {
    /// 本地 x 单元数
    pub nx: usize,
    /// 本地 y 单元数
    pub ny: usize,
    /// 层数
    pub nz: usize,
    /// 填充后 x 尺寸
    pub px: usize,
    /// 填充后 y 尺寸
    pub py: usize,
    /// 填充后 z 尺寸
    pub pz: usize,
    /// x 间距 [m]
    pub dx: f64,
    /// y 间距 [m]
    pub dy: f64,
    /// 子域信息
    pub sub: Subdomain,
    /// 各填充层厚度
    dz: Vec<f64>,
    /// 本层中心到下一层中心的距离
    dzf: Vec<f64>,
    active: Vec<bool>,
    top: Vec<bool>,
    top_of_column: Vec<Option<CellId>>,
    rows: Vec<Option<usize>>,
    cells: Vec<CellId>,
}

impl StructuredGrid3D {
    /// 全部激活的网格
    pub fn new(config: &GridConfig, sub: Subdomain) -> PhysicsResult<Self> {
        Self::with_mask(config, sub, |_, _, _| true)
    }

    /// 使用全局激活掩码 `mask(gi, gj, k)` 构造
    pub fn with_mask(
        config: &GridConfig,
        sub: Subdomain,
        mask: impl Fn(usize, usize, usize) -> bool,
    ) -> PhysicsResult<Self> {
        if config.dz.len() != config.nz || config.nz == 0 {
            return Err(PhysicsError::invalid_grid(format!(
                "层厚数组长度 {} 与层数 {} 不符",
                config.dz.len(),
                config.nz
            )));
        }
        if sub.nx == 0 || sub.ny == 0 {
            return Err(PhysicsError::invalid_grid("子域为空"));
        }
        let (nx, ny, nz) = (sub.nx, sub.ny, config.nz);
        let (px, py, pz) = (nx + 2, ny + 2, nz + 2);
        let n = px * py * pz;

        let dz: Vec<f64> = (0..pz)
            .map(|pk| config.dz[pk.saturating_sub(1).min(nz - 1)])
            .collect();
        let dzf: Vec<f64> = (0..pz)
            .map(|pk| {
                if pk + 1 < pz {
                    0.5 * (dz[pk] + dz[pk + 1])
                } else {
                    dz[pk]
                }
            })
            .collect();

        let gmax_i = config.nx as isize - 1;
        let gmax_j = config.ny as isize - 1;
        let mut active = vec![false; n];
        for pj in 0..py {
            for pi in 0..px {
                let (gi, gj) = sub.global_of(pi, pj);
                let gi = gi.clamp(0, gmax_i) as usize;
                let gj = gj.clamp(0, gmax_j) as usize;
                for pk in 0..pz {
                    let k = pk.saturating_sub(1).min(nz - 1);
                    active[(pj * px + pi) * pz + pk] = mask(gi, gj, k);
                }
            }
        }

        let mut top = vec![false; n];
        let mut top_of_column = vec![None; px * py];
        for col in 0..px * py {
            if let Some(pk) = (1..=nz).find(|&pk| active[col * pz + pk]) {
                top[col * pz + pk] = true;
                top_of_column[col] = Some(col * pz + pk);
            }
        }

        let mut rows = vec![None; n];
        let mut cells = Vec::with_capacity(nx * ny * nz);
        for pj in 1..=ny {
            for pi in 1..=nx {
                for pk in 1..=nz {
                    let id = (pj * px + pi) * pz + pk;
                    rows[id] = Some(cells.len());
                    cells.push(id);
                }
            }
        }

        Ok(Self {
            nx,
            ny,
            nz,
            px,
            py,
            pz,
            dx: config.dx,
            dy: config.dy,
            sub,
            dz,
            dzf,
            active,
            top,
            top_of_column,
            rows,
            cells,
        })
    }

    /// 由填充坐标计算下标
    #[inline]
    pub fn index(&self, pi: usize, pj: usize, pk: usize) -> CellId {
        (pj * self.px + pi) * self.pz + pk
    }

    /// 填充坐标
    #[inline]
    pub fn coords(&self, cell: CellId) -> (usize, usize, usize) {
        let pk = cell % self.pz;
        let col = cell / self.pz;
        (col % self.px, col / self.px, pk)
    }

    /// 柱顶单元
    #[inline]
    pub fn top_cell(&self, column: usize) -> Option<CellId> {
        self.top_of_column.get(column).copied().flatten()
    }

    /// 是否为最底层
    #[inline]
    pub fn is_bottom(&self, cell: CellId) -> bool {
        cell % self.pz == self.nz
    }

    /// 本层中心到下一层中心的距离
    #[inline]
    pub fn dzf(&self, cell: CellId) -> f64 {
        self.dzf[cell % self.pz]
    }

    /// 单元体积
    #[inline]
    pub fn volume(&self, cell: CellId) -> f64 {
        self.dx * self.dy * self.dz(cell)
    }

    /// 单元水平面积
    #[inline]
    pub fn area_z(&self) -> f64 {
        self.dx * self.dy
    }

    /// 按行序遍历的内部单元
    #[inline]
    pub fn interior_cells(&self) -> &[CellId] {
        &self.cells
    }

    /// 内部柱（二维填充下标）
    pub fn interior_columns(&self) -> impl Iterator<Item = usize> + '_ {
        (1..=self.ny).flat_map(move |pj| (1..=self.nx).map(move |pi| pj * self.px + pi))
    }

    /// 单元所在的物理边界侧（侧向）
    pub fn physical_sides(&self, cell: CellId) -> impl Iterator<Item = Direction> + '_ {
        let (pi, pj, _) = self.coords(cell);
        Direction::LATERAL.into_iter().filter(move |&d| {
            self.sub.is_physical(d)
                && match d {
                    Direction::XPlus => pi == self.nx,
                    Direction::XMinus => pi == 1,
                    Direction::YPlus => pj == self.ny,
                    _ => pj == 1,
                }
        })
    }

    /// halo 交换计划
    pub fn halo_plan(&self) -> HaloPlan {
        let (px, pz) = (self.px, self.pz);
        HaloPlan::build(&self.sub, (self.px, self.py, self.pz), move |i, j, k| {
            (j * px + i) * pz + k
        })
    }

    /// 激活的内部单元数
    pub fn n_active(&self) -> usize {
        self.cells.iter().filter(|&&c| self.active[c]).count()
    }
}

impl GridTopology for StructuredGrid3D {
    #[inline]
    fn n_cells(&self) -> usize {
        self.active.len()
    }

    #[inline]
    fn n_rows(&self) -> usize {
        self.cells.len()
    }

    fn neighbor(&self, cell: CellId, dir: Direction) -> Option<CellId> {
        let (pi, pj, pk) = self.coords(cell);
        let (di, dj, dk) = dir.offset();
        let ni = pi.checked_add_signed(di).filter(|&v| v < self.px)?;
        let nj = pj.checked_add_signed(dj).filter(|&v| v < self.py)?;
        let nk = pk.checked_add_signed(dk).filter(|&v| v < self.pz)?;
        Some(self.index(ni, nj, nk))
    }

    #[inline]
    fn is_active(&self, cell: CellId) -> bool {
        self.active[cell]
    }

    #[inline]
    fn is_interior(&self, cell: CellId) -> bool {
        self.rows[cell].is_some()
    }

    #[inline]
    fn is_top(&self, cell: CellId) -> bool {
        self.top[cell]
    }

    #[inline]
    fn dz(&self, cell: CellId) -> f64 {
        self.dz[cell % self.pz]
    }

    #[inline]
    fn column(&self, cell: CellId) -> usize {
        cell / self.pz
    }

    #[inline]
    fn row_of(&self, cell: CellId) -> Option<usize> {
        self.rows[cell]
    }

    #[inline]
    fn cell_of_row(&self, row: usize) -> CellId {
        self.cells[row]
    }
}

// ============================================================
// 二维地表网格
// ============================================================

/// 二维结构化网格（单个子域，全部激活）
#[derive(Debug, Clone)]
pub struct StructuredGrid2D {
    /// 本地 x 单元数
    pub nx: usize,
    /// 本地 y 单元数
    pub ny: usize,
    /// 填充后 x 尺寸
    pub px: usize,
    /// 填充后 y 尺寸
    pub py: usize,
    /// x 间距 [m]
    pub dx: f64,
    /// y 间距 [m]
    pub dy: f64,
    /// 子域信息
    pub sub: Subdomain,
    rows: Vec<Option<usize>>,
    cells: Vec<CellId>,
}

impl StructuredGrid2D {
    /// 构造
    pub fn new(config: &GridConfig, sub: Subdomain) -> PhysicsResult<Self> {
        if sub.nx == 0 || sub.ny == 0 {
            return Err(PhysicsError::invalid_grid("子域为空"));
        }
        let (nx, ny) = (sub.nx, sub.ny);
        let (px, py) = (nx + 2, ny + 2);
        let mut rows = vec![None; px * py];
        let mut cells = Vec::with_capacity(nx * ny);
        for pj in 1..=ny {
            for pi in 1..=nx {
                let id = pj * px + pi;
                rows[id] = Some(cells.len());
                cells.push(id);
            }
        }
        Ok(Self {
            nx,
            ny,
            px,
            py,
            dx: config.dx,
            dy: config.dy,
            sub,
            rows,
            cells,
        })
    }

    /// 由填充坐标计算下标
    #[inline]
    pub fn index(&self, pi: usize, pj: usize) -> CellId {
        pj * self.px + pi
    }

    /// 填充坐标
    #[inline]
    pub fn coords(&self, cell: CellId) -> (usize, usize) {
        (cell % self.px, cell / self.px)
    }

    /// 按行序遍历的内部单元
    #[inline]
    pub fn interior_cells(&self) -> &[CellId] {
        &self.cells
    }

    /// 单元平面面积
    #[inline]
    pub fn area(&self) -> f64 {
        self.dx * self.dy
    }

    /// 内部单元在 `side` 侧是否紧邻物理边界
    pub fn on_physical_side(&self, cell: CellId, side: Direction) -> bool {
        let (pi, pj) = self.coords(cell);
        self.sub.is_physical(side)
            && match side {
                Direction::XPlus => pi == self.nx,
                Direction::XMinus => pi == 1,
                Direction::YPlus => pj == self.ny,
                Direction::YMinus => pj == 1,
                Direction::ZPlus | Direction::ZMinus => false,
            }
    }

    /// 是否紧邻任一物理边界
    pub fn is_physical_edge(&self, cell: CellId) -> bool {
        Direction::LATERAL
            .iter()
            .any(|&side| self.on_physical_side(cell, side))
    }

    /// 物理边界上的 (ghost, 内部) 单元对
    pub fn physical_ghosts(&self, side: Direction) -> Vec<(CellId, CellId)> {
        if !self.sub.is_physical(side) {
            return Vec::new();
        }
        match side {
            Direction::XPlus => (1..=self.ny)
                .map(|pj| (self.index(self.nx + 1, pj), self.index(self.nx, pj)))
                .collect(),
            Direction::XMinus => (1..=self.ny)
                .map(|pj| (self.index(0, pj), self.index(1, pj)))
                .collect(),
            Direction::YPlus => (1..=self.nx)
                .map(|pi| (self.index(pi, self.ny + 1), self.index(pi, self.ny)))
                .collect(),
            Direction::YMinus => (1..=self.nx)
                .map(|pi| (self.index(pi, 0), self.index(pi, 1)))
                .collect(),
            Direction::ZPlus | Direction::ZMinus => Vec::new(),
        }
    }

    /// halo 交换计划
    pub fn halo_plan(&self) -> HaloPlan {
        let px = self.px;
        HaloPlan::build(&self.sub, (self.px, self.py, 1), move |i, j, _| j * px + i)
    }
}

impl GridTopology for StructuredGrid2D {
    #[inline]
    fn n_cells(&self) -> usize {
        self.px * self.py
    }

    #[inline]
    fn n_rows(&self) -> usize {
        self.cells.len()
    }

    fn neighbor(&self, cell: CellId, dir: Direction) -> Option<CellId> {
        if dir.is_vertical() {
            return None;
        }
        let (pi, pj) = self.coords(cell);
        let (di, dj, _) = dir.offset();
        let ni = pi.checked_add_signed(di).filter(|&v| v < self.px)?;
        let nj = pj.checked_add_signed(dj).filter(|&v| v < self.py)?;
        Some(self.index(ni, nj))
    }

    #[inline]
    fn is_active(&self, _cell: CellId) -> bool {
        true
    }

    #[inline]
    fn is_interior(&self, cell: CellId) -> bool {
        self.rows[cell].is_some()
    }

    #[inline]
    fn is_top(&self, cell: CellId) -> bool {
        self.is_interior(cell)
    }

    #[inline]
    fn dz(&self, _cell: CellId) -> f64 {
        0.0
    }

    #[inline]
    fn column(&self, cell: CellId) -> usize {
        cell
    }

    #[inline]
    fn row_of(&self, cell: CellId) -> Option<usize> {
        self.rows[cell]
    }

    #[inline]
    fn cell_of_row(&self, row: usize) -> CellId {
        self.cells[row]
    }
}
