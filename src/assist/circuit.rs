//! 熔断状态存储
//!
//! 两个带过期时间的窗口值：
//! - 失败计数：每次失败 +1，最后一次失败 10 分钟后过期，成功时立即清除
//! - 打开截止时间：失败计数达到阈值时设为 now + 60s，到期自然失效，成功时立即清除
//!
//! 所有时间读取都经过注入的 [`Clock`]。

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use serde::Serialize;

/// 时钟抽象
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 熔断状态存储接口
pub trait CircuitStore: Send + Sync {
    /// 熔断器是否处于打开状态
    fn is_open(&self) -> bool;
    /// 记录一次失败，返回新的失败计数
    fn record_failure(&self) -> u32;
    /// 记录一次成功，清除全部状态
    fn record_success(&self);
    /// 当前状态快照
    fn snapshot(&self) -> CircuitSnapshot;
}

/// 熔断状态快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitSnapshot {
    pub open: bool,
    pub failure_count: u32,
    /// RFC3339
    pub open_until: Option<String>,
}

/// 熔断策略参数
#[derive(Debug, Clone, Copy)]
pub struct CircuitPolicy {
    /// 打开熔断所需失败次数
    pub failure_threshold: u32,
    /// 失败计数窗口（自最后一次失败起算）
    pub failure_window: TimeDelta,
    /// 打开持续时间
    pub open_duration: TimeDelta,
}

impl Default for CircuitPolicy {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            failure_window: TimeDelta::minutes(10),
            open_duration: TimeDelta::seconds(60),
        }
    }
}

#[derive(Debug, Default)]
struct Windows {
    /// (计数, 过期时间)
    failures: Option<(u32, DateTime<Utc>)>,
    open_until: Option<DateTime<Utc>>,
}

impl Windows {
    fn failure_count(&self, now: DateTime<Utc>) -> u32 {
        match self.failures {
            Some((count, expires_at)) if expires_at > now => count,
            _ => 0,
        }
    }

    fn open_until(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.open_until.filter(|until| *until > now)
    }
}

/// 进程内熔断状态存储
pub struct InMemoryCircuit {
    policy: CircuitPolicy,
    clock: Arc<dyn Clock>,
    windows: Mutex<Windows>,
}

impl InMemoryCircuit {
    pub fn new(policy: CircuitPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            policy,
            clock,
            windows: Mutex::new(Windows::default()),
        }
    }

    /// 默认策略 + 系统时钟
    pub fn with_defaults() -> Self {
        Self::new(CircuitPolicy::default(), Arc::new(SystemClock))
    }
}

impl CircuitStore for InMemoryCircuit {
    fn is_open(&self) -> bool {
        let now = self.clock.now();
        self.windows.lock().open_until(now).is_some()
    }

    fn record_failure(&self) -> u32 {
        let now = self.clock.now();
        let mut windows = self.windows.lock();

        // 计数递增与阈值判断在同一临界区内完成
        let count = windows.failure_count(now).saturating_add(1);
        windows.failures = Some((count, now + self.policy.failure_window));

        if count >= self.policy.failure_threshold {
            let until = now + self.policy.open_duration;
            windows.open_until = Some(until);
            tracing::warn!(
                failure_count = count,
                open_until = %until.to_rfc3339(),
                "AI 熔断器打开"
            );
        }

        count
    }

    fn record_success(&self) {
        let mut windows = self.windows.lock();
        if windows.failures.is_some() || windows.open_until.is_some() {
            tracing::info!("AI 熔断状态已清除");
        }
        *windows = Windows::default();
    }

    fn snapshot(&self) -> CircuitSnapshot {
        let now = self.clock.now();
        let windows = self.windows.lock();
        let open_until = windows.open_until(now);
        CircuitSnapshot {
            open: open_until.is_some(),
            failure_count: windows.failure_count(now),
            open_until: open_until.map(|t| t.to_rfc3339()),
        }
    }
}

/// 可手动推进的测试时钟
#[cfg(test)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(
                DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
                    .unwrap()
                    .with_timezone(&Utc),
            ),
        }
    }

    pub fn advance(&self, delta: TimeDelta) {
        *self.now.lock() += delta;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circuit() -> (Arc<ManualClock>, InMemoryCircuit) {
        let clock = Arc::new(ManualClock::new());
        let circuit = InMemoryCircuit::new(CircuitPolicy::default(), clock.clone());
        (clock, circuit)
    }

    #[test]
    fn test_opens_on_third_failure() {
        let (_clock, circuit) = circuit();
        assert_eq!(circuit.record_failure(), 1);
        assert_eq!(circuit.record_failure(), 2);
        assert!(!circuit.is_open());
        assert_eq!(circuit.record_failure(), 3);
        assert!(circuit.is_open());
    }

    #[test]
    fn test_open_window_expires_after_60s() {
        let (clock, circuit) = circuit();
        for _ in 0..3 {
            circuit.record_failure();
        }
        clock.advance(TimeDelta::seconds(59));
        assert!(circuit.is_open());
        clock.advance(TimeDelta::seconds(1));
        assert!(!circuit.is_open());
        // 失败计数仍在 10 分钟窗口内
        assert_eq!(circuit.snapshot().failure_count, 3);
    }

    #[test]
    fn test_failure_count_expires_after_window() {
        let (clock, circuit) = circuit();
        circuit.record_failure();
        circuit.record_failure();
        clock.advance(TimeDelta::minutes(10));
        assert_eq!(circuit.snapshot().failure_count, 0);
        assert_eq!(circuit.record_failure(), 1);
        assert!(!circuit.is_open());
    }

    #[test]
    fn test_each_failure_slides_window() {
        let (clock, circuit) = circuit();
        circuit.record_failure();
        clock.advance(TimeDelta::minutes(9));
        circuit.record_failure();
        clock.advance(TimeDelta::minutes(9));
        assert_eq!(circuit.record_failure(), 3);
        assert!(circuit.is_open());
    }

    #[test]
    fn test_success_clears_both_keys() {
        let (_clock, circuit) = circuit();
        for _ in 0..3 {
            circuit.record_failure();
        }
        circuit.record_success();
        assert!(!circuit.is_open());
        assert_eq!(
            circuit.snapshot(),
            CircuitSnapshot {
                open: false,
                failure_count: 0,
                open_until: None,
            }
        );
        assert_eq!(circuit.record_failure(), 1);
    }

    #[test]
    fn test_failure_while_open_extends_window() {
        let (clock, circuit) = circuit();
        for _ in 0..3 {
            circuit.record_failure();
        }
        clock.advance(TimeDelta::seconds(30));
        assert_eq!(circuit.record_failure(), 4);
        clock.advance(TimeDelta::seconds(45));
        assert!(circuit.is_open());
    }

    #[test]
    fn test_snapshot_reports_open_until() {
        let (_clock, circuit) = circuit();
        for _ in 0..3 {
            circuit.record_failure();
        }
        let snapshot = circuit.snapshot();
        assert!(snapshot.open);
        assert_eq!(
            snapshot.open_until.as_deref(),
            Some("2026-01-01T00:01:00+00:00")
        );
    }

    #[test]
    fn test_concurrent_failures_not_lost() {
        let circuit = Arc::new(InMemoryCircuit::new(
            CircuitPolicy {
                failure_threshold: 1000,
                ..CircuitPolicy::default()
            },
            Arc::new(SystemClock),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let circuit = circuit.clone();
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        circuit.record_failure();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(circuit.snapshot().failure_count, 400);
        assert!(!circuit.is_open());
    }
}
