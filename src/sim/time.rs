//! 仿真时间类型
//!
//! 定义仿真时间及其单位转换与文本解析。

use thiserror::Error;

/// 仿真时间（纳秒）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct SimTime(pub u64);

/// 时间标记解析错误（`RunTo 5ms` 风格的后缀时间）。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimeParseError {
    #[error("empty time token")]
    Empty,
    #[error("invalid number in time token: {0}")]
    BadNumber(String),
    #[error("unknown time unit: {0}")]
    BadUnit(String),
}

impl SimTime {
    pub const ZERO: SimTime = SimTime(0);

    pub fn from_micros(us: u64) -> SimTime {
        SimTime(us.saturating_mul(1_000))
    }
    pub fn from_millis(ms: u64) -> SimTime {
        SimTime(ms.saturating_mul(1_000_000))
    }
    pub fn from_secs(s: u64) -> SimTime {
        SimTime(s.saturating_mul(1_000_000_000))
    }

    pub fn saturating_add(self, rhs: SimTime) -> SimTime {
        SimTime(self.0.saturating_add(rhs.0))
    }

    /// 解析带单位后缀的时间标记：`<int><ns|us|µs|ms|s>`。
    pub fn parse(token: &str) -> Result<SimTime, TimeParseError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(TimeParseError::Empty);
        }
        let split = token
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| TimeParseError::BadUnit(String::new()))?;
        let (digits, unit) = token.split_at(split);
        let value: u64 = digits
            .parse()
            .map_err(|_| TimeParseError::BadNumber(digits.to_string()))?;
        match unit {
            "ns" => Ok(SimTime(value)),
            "us" | "µs" => Ok(SimTime::from_micros(value)),
            "ms" => Ok(SimTime::from_millis(value)),
            "s" => Ok(SimTime::from_secs(value)),
            other => Err(TimeParseError::BadUnit(other.to_string())),
        }
    }
}

impl std::fmt::Display for SimTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ns", self.0)
    }
}
