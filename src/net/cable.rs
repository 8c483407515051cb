//! 共享介质（电缆）
//!
//! 电缆知道各连接器的安装位置、比特率与传播速度，把一次发送
//! 变成每个连接器上按传播时延错开的 signal-sense / signal-cease 事件。
//! 事件调度本身在 `Lan` 中完成，这里只负责参数校验与时延/失真计算。

use super::id::ConnectorId;
use crate::sim::SimTime;
use rand::Rng;
use thiserror::Error;

/// 真空光速（m/s）。
const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// 电缆构造参数错误。
#[derive(Debug, Error, PartialEq)]
pub enum CableError {
    #[error("cable length must be positive, got {0}")]
    BadLength(f64),
    #[error("bitrate must be positive")]
    BadBitrate,
    #[error("velocity factor must be in (0, 1], got {0}")]
    BadVelocityFactor(f64),
    #[error("bit error rate must be in [0, 1], got {0}")]
    BadBitErrorRate(f64),
    #[error("burst length range is inverted: {min} > {max}")]
    BadBurstRange { min: u32, max: u32 },
}

/// 连接器安装错误。
#[derive(Debug, Error, PartialEq)]
pub enum AttachError {
    #[error("connector is already attached to a cable")]
    AlreadyAttached,
    #[error("position {0} m is outside the cable (length {1} m)")]
    OutOfRange(f64, f64),
    #[error("position {0} m is not on the {1} m installation grid")]
    OffGrid(f64, f64),
    #[error("position {0} m is already occupied")]
    PositionTaken(f64),
}

/// 突发误码模型：以 `bit_error_rate` 的概率在某比特处开始一个
/// 长度均匀抽取于 [min, max] 的突发，突发内比特替换为随机比特。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BurstErrorModel {
    pub bit_error_rate: f64,
    pub min_burst_len: u32,
    pub max_burst_len: u32,
}

/// 电缆参数。
#[derive(Debug, Clone)]
pub struct CableConfig {
    pub length_m: f64,
    pub bitrate_bps: u64,
    pub velocity_factor: f64,
    pub full_duplex: bool,
    /// 安装栅格（米）。0 表示不限制安装位置。
    pub grid_m: f64,
    pub error_model: Option<BurstErrorModel>,
}

impl CableConfig {
    /// 10BASE5 粗缆：10 Mbit/s，速度因子 0.66，2.5 m 栅格。
    pub fn ten_base5(length_m: f64) -> Self {
        Self {
            length_m,
            bitrate_bps: 10_000_000,
            velocity_factor: 0.66,
            full_duplex: false,
            grid_m: 2.5,
            error_model: None,
        }
    }

    /// 10BASE2 细缆：10 Mbit/s，速度因子 0.65，0.5 m 栅格。
    pub fn ten_base2(length_m: f64) -> Self {
        Self {
            length_m,
            bitrate_bps: 10_000_000,
            velocity_factor: 0.65,
            full_duplex: false,
            grid_m: 0.5,
            error_model: None,
        }
    }
}

/// 一段共享介质。
///
/// 连接器→位置的映射以插入序保存在 Vec 中，保证事件调度次序跨运行稳定。
#[derive(Debug)]
pub struct Cable {
    length_m: f64,
    bitrate_bps: u64,
    velocity_factor: f64,
    full_duplex: bool,
    grid_m: f64,
    error_model: Option<BurstErrorModel>,
    attachments: Vec<(ConnectorId, f64)>,
}

impl Cable {
    pub fn new(cfg: CableConfig) -> Result<Self, CableError> {
        if !(cfg.length_m > 0.0) {
            return Err(CableError::BadLength(cfg.length_m));
        }
        if cfg.bitrate_bps == 0 {
            return Err(CableError::BadBitrate);
        }
        if !(cfg.velocity_factor > 0.0 && cfg.velocity_factor <= 1.0) {
            return Err(CableError::BadVelocityFactor(cfg.velocity_factor));
        }
        if let Some(m) = cfg.error_model {
            if !(0.0..=1.0).contains(&m.bit_error_rate) {
                return Err(CableError::BadBitErrorRate(m.bit_error_rate));
            }
            if m.min_burst_len > m.max_burst_len {
                return Err(CableError::BadBurstRange {
                    min: m.min_burst_len,
                    max: m.max_burst_len,
                });
            }
        }
        Ok(Self {
            length_m: cfg.length_m,
            bitrate_bps: cfg.bitrate_bps,
            velocity_factor: cfg.velocity_factor,
            full_duplex: cfg.full_duplex,
            grid_m: cfg.grid_m,
            error_model: cfg.error_model,
            attachments: Vec::new(),
        })
    }

    pub fn bitrate_bps(&self) -> u64 {
        self.bitrate_bps
    }

    pub fn full_duplex(&self) -> bool {
        self.full_duplex
    }

    pub(crate) fn attach(&mut self, conn: ConnectorId, pos_m: f64) -> Result<(), AttachError> {
        if self.attachments.iter().any(|&(c, _)| c == conn) {
            return Err(AttachError::AlreadyAttached);
        }
        if !(0.0..=self.length_m).contains(&pos_m) {
            return Err(AttachError::OutOfRange(pos_m, self.length_m));
        }
        if self.grid_m > 0.0 {
            let snapped = (pos_m / self.grid_m).round() * self.grid_m;
            if (snapped - pos_m).abs() > 1e-6 {
                return Err(AttachError::OffGrid(pos_m, self.grid_m));
            }
        }
        if self.attachments.iter().any(|&(_, p)| (p - pos_m).abs() < 1e-9) {
            return Err(AttachError::PositionTaken(pos_m));
        }
        self.attachments.push((conn, pos_m));
        Ok(())
    }

    pub(crate) fn attachments(&self) -> &[(ConnectorId, f64)] {
        &self.attachments
    }

    pub(crate) fn position_of(&self, conn: ConnectorId) -> Option<f64> {
        self.attachments
            .iter()
            .find(|&&(c, _)| c == conn)
            .map(|&(_, p)| p)
    }

    /// 发送 `bytes` 字节所需的时间。
    pub(crate) fn tx_time(&self, bytes: usize) -> SimTime {
        self.tx_time_bits((bytes as u64).saturating_mul(8))
    }

    /// 发送 `bits` 比特所需的时间（向上取整到纳秒）。
    pub(crate) fn tx_time_bits(&self, bits: u64) -> SimTime {
        let nanos = ((bits as u128).saturating_mul(1_000_000_000u128)
            + (self.bitrate_bps as u128 - 1))
            / self.bitrate_bps as u128;
        SimTime(nanos.min(u64::MAX as u128) as u64)
    }

    /// 两个安装位置之间的传播时延。
    pub(crate) fn prop_delay(&self, a_m: f64, b_m: f64) -> SimTime {
        let speed = SPEED_OF_LIGHT * self.velocity_factor;
        SimTime(((a_m - b_m).abs() * 1e9 / speed).round() as u64)
    }

    /// 把送达某个监听者的字节流通过突发误码模型。无误码模型时原样复制。
    pub(crate) fn distort<R: Rng>(&self, bytes: &[u8], rng: &mut R) -> Vec<u8> {
        let mut out = bytes.to_vec();
        let Some(model) = self.error_model else {
            return out;
        };
        if model.bit_error_rate <= 0.0 {
            return out;
        }
        let total_bits = out.len() * 8;
        let mut i = 0usize;
        while i < total_bits {
            if rng.gen_bool(model.bit_error_rate) {
                let burst = rng.gen_range(model.min_burst_len..=model.max_burst_len) as usize;
                for j in i..(i + burst).min(total_bits) {
                    let mask = 1u8 << (7 - (j % 8));
                    if rng.gen_bool(0.5) {
                        out[j / 8] |= mask;
                    } else {
                        out[j / 8] &= !mask;
                    }
                }
                i += burst.max(1);
            } else {
                i += 1;
            }
        }
        out
    }
}
