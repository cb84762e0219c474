// crates/hc_physics/src/transport/local.rs

//! 进程内多子域通信
//!
//! 每个 rank 运行在独立线程上，通过共享邮箱与栅栏实现点对点交换和归约。
//! 用于在测试和单机多线程运行中复现分布式语义。

use std::collections::HashMap;
use std::sync::{Arc, Barrier};

use parking_lot::Mutex;

use super::Transport;
use crate::error::{PhysicsError, PhysicsResult};
use crate::grid::HaloPlan;

/// (发送方, 接收方, 发送侧)
type MailKey = (usize, usize, u8);

struct Shared {
    size: usize,
    mailbox: Mutex<HashMap<MailKey, Vec<f64>>>,
    slots: Mutex<Vec<f64>>,
    barrier: Barrier,
}

/// 进程内集群
pub struct LocalCluster;

impl LocalCluster {
    /// 创建 `size` 个互联的通信端点
    pub fn new(size: usize) -> Vec<LocalTransport> {
        let size = size.max(1);
        let shared = Arc::new(Shared {
            size,
            mailbox: Mutex::new(HashMap::new()),
            slots: Mutex::new(vec![0.0; size]),
            barrier: Barrier::new(size),
        });
        (0..size)
            .map(|rank| LocalTransport {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect()
    }
}

/// 单个 rank 的通信端点
pub struct LocalTransport {
    rank: usize,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for LocalTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTransport")
            .field("rank", &self.rank)
            .field("size", &self.shared.size)
            .finish()
    }
}

impl LocalTransport {
    fn gather(&self, value: f64) -> Vec<f64> {
        self.shared.slots.lock()[self.rank] = value;
        self.shared.barrier.wait();
        let values = self.shared.slots.lock().clone();
        self.shared.barrier.wait();
        values
    }
}

impl Transport for LocalTransport {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn exchange(&self, field: &mut [f64], plan: &HaloPlan) -> PhysicsResult<()> {
        // 出错时仍须走完两道栅栏，否则其余 rank 永久阻塞
        let mut result = Ok(());
        {
            let mut mailbox = self.shared.mailbox.lock();
            for link in &plan.links {
                let payload: Option<Vec<f64>> =
                    link.send.iter().map(|&cell| field.get(cell).copied()).collect();
                match payload {
                    Some(payload) => {
                        mailbox.insert((self.rank, link.peer, link.side as u8), payload);
                    }
                    None => {
                        result = Err(PhysicsError::transport(format!(
                            "rank {} 发往 {} 的发送下标越界",
                            self.rank, link.peer
                        )));
                    }
                }
            }
        }
        self.shared.barrier.wait();

        {
            let mut mailbox = self.shared.mailbox.lock();
            for link in &plan.links {
                let key = (link.peer, self.rank, link.side.opposite() as u8);
                match mailbox.remove(&key) {
                    Some(payload) if payload.len() == link.recv.len() => {
                        for (&cell, value) in link.recv.iter().zip(payload) {
                            match field.get_mut(cell) {
                                Some(slot) => *slot = value,
                                None => {
                                    result = Err(PhysicsError::transport(format!(
                                        "rank {} 接收下标 {} 越界",
                                        self.rank, cell
                                    )));
                                }
                            }
                        }
                    }
                    Some(payload) => {
                        result = Err(PhysicsError::transport(format!(
                            "rank {} 从 {} 收到 {} 个值，期望 {}",
                            self.rank,
                            link.peer,
                            payload.len(),
                            link.recv.len()
                        )));
                    }
                    None => {
                        result = Err(PhysicsError::transport(format!(
                            "rank {} 未收到来自 {} 的 halo 数据",
                            self.rank, link.peer
                        )));
                    }
                }
            }
        }
        // 所有 rank 读取完毕后才能开始下一轮发送
        self.shared.barrier.wait();
        result
    }

    fn reduce_min(&self, value: f64) -> PhysicsResult<f64> {
        Ok(self.gather(value).into_iter().fold(f64::INFINITY, f64::min))
    }

    fn reduce_sum(&self, value: f64) -> PhysicsResult<f64> {
        Ok(self.gather(value).into_iter().sum())
    }

    fn broadcast(&self, value: f64, root: usize) -> PhysicsResult<f64> {
        if root >= self.shared.size {
            return Err(PhysicsError::transport(format!(
                "广播根 {} 超出子域数 {}",
                root, self.shared.size
            )));
        }
        Ok(self.gather(value)[root])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Direction, HaloLink};

    #[test]
    fn test_reduce_min_and_broadcast() {
        let endpoints = LocalCluster::new(4);
        let results: Vec<(f64, f64, f64)> = std::thread::scope(|s| {
            let handles: Vec<_> = endpoints
                .iter()
                .map(|t| {
                    s.spawn(move || {
                        let local = 10.0 - t.rank() as f64;
                        let min = t.reduce_min(local).unwrap();
                        let sum = t.reduce_sum(1.0).unwrap();
                        let b = t.broadcast(t.rank() as f64 * 2.0, 1).unwrap();
                        (min, sum, b)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for (min, sum, b) in results {
            assert_eq!(min, 7.0);
            assert_eq!(sum, 4.0);
            assert_eq!(b, 2.0);
        }
    }

    #[test]
    fn test_exchange_pair() {
        let endpoints = LocalCluster::new(2);
        // rank 0 的 +x 与 rank 1 的 -x 相邻：field = [ghost_l, a, b, ghost_r]
        let plans = [
            HaloPlan {
                links: vec![HaloLink {
                    side: Direction::XPlus,
                    peer: 1,
                    send: vec![2],
                    recv: vec![3],
                }],
            },
            HaloPlan {
                links: vec![HaloLink {
                    side: Direction::XMinus,
                    peer: 0,
                    send: vec![1],
                    recv: vec![0],
                }],
            },
        ];
        let fields: Vec<Vec<f64>> = std::thread::scope(|s| {
            let handles: Vec<_> = endpoints
                .iter()
                .zip(plans.iter())
                .map(|(t, plan)| {
                    s.spawn(move || {
                        let base = 10.0 * (t.rank() + 1) as f64;
                        let mut field = vec![0.0, base + 1.0, base + 2.0, 0.0];
                        t.exchange(&mut field, plan).unwrap();
                        field
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(fields[0][3], 21.0);
        assert_eq!(fields[1][0], 12.0);
    }

    #[test]
    fn test_exchange_error_does_not_block_peers() {
        let endpoints = LocalCluster::new(2);
        // rank 0 的发送下标越界：两侧都应返回错误而不是互相等待
        let plans = [
            HaloPlan {
                links: vec![HaloLink {
                    side: Direction::XPlus,
                    peer: 1,
                    send: vec![99],
                    recv: vec![3],
                }],
            },
            HaloPlan {
                links: vec![HaloLink {
                    side: Direction::XMinus,
                    peer: 0,
                    send: vec![1],
                    recv: vec![0],
                }],
            },
        ];
        let results: Vec<(bool, f64)> = std::thread::scope(|s| {
            let handles: Vec<_> = endpoints
                .iter()
                .zip(plans.iter())
                .map(|(t, plan)| {
                    s.spawn(move || {
                        let mut field = vec![0.0, 1.0, 2.0, 0.0];
                        let failed = t.exchange(&mut field, plan).is_err();
                        // 之后的集体操作仍能正常配对
                        let sum = t.reduce_sum(1.0).unwrap();
                        (failed, sum)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(results[0].0, "越界的一侧报告错误");
        assert!(results[1].0, "缺少数据的一侧报告错误");
        for (_, sum) in results {
            assert_eq!(sum, 2.0);
        }
    }
}
