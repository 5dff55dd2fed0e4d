//! 进度统计
//!
//! 每收到一个结果计数加一，并在时间窗口满0.5秒或最后一个结果到达时
//! 计算窗口内的速率。本模块不做任何渲染，采样交给 [`ProgressReporter`]。

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::model::ProgressSample;

/// 速率采样窗口
pub const SAMPLE_WINDOW: Duration = Duration::from_millis(500);

/// 进度展示接口，由外部实现（终端进度条等）
pub trait ProgressReporter: Send + Sync {
    fn on_progress(&self, sample: &ProgressSample);
}

#[derive(Debug)]
struct Window {
    started: Instant,
    completed_at_start: usize,
    completed: usize,
    rate: f64,
}

pub struct ProgressTracker {
    total: usize,
    window: Mutex<Window>,
    reporter: Option<Arc<dyn ProgressReporter>>,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self::starting_at(total, Instant::now())
    }

    pub fn starting_at(total: usize, started: Instant) -> Self {
        ProgressTracker {
            total,
            window: Mutex::new(Window {
                started,
                completed_at_start: 0,
                completed: 0,
                rate: 0.0,
            }),
            reporter: None,
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    /// 记录一个完成的结果
    pub fn record(&self) -> ProgressSample {
        self.record_at(Instant::now())
    }

    pub fn record_at(&self, now: Instant) -> ProgressSample {
        let sample = {
            let mut window = self.window.lock().unwrap_or_else(|e| e.into_inner());
            window.completed += 1;

            let elapsed = now.saturating_duration_since(window.started);
            if elapsed >= SAMPLE_WINDOW || window.completed >= self.total {
                let secs = elapsed.as_secs_f64();
                let done = window.completed - window.completed_at_start;
                window.rate = if secs > 0.0 { done as f64 / secs } else { 0.0 };
                window.started = now;
                window.completed_at_start = window.completed;
            }

            ProgressSample {
                completed: window.completed,
                total: self.total,
                rate: window.rate,
            }
        };

        if let Some(reporter) = &self.reporter {
            reporter.on_progress(&sample);
        }
        sample
    }

    /// 最近一次的 (已完成, 总数, 速率)
    pub fn snapshot(&self) -> ProgressSample {
        let window = self.window.lock().unwrap_or_else(|e| e.into_inner());
        ProgressSample {
            completed: window.completed,
            total: self.total,
            rate: window.rate,
        }
    }
}
