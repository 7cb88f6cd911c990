//! 构建各阶段的计时，结果写入日志。

use std::time::Instant;

use chrono::{DateTime, Local};

pub struct PhaseTimer {
    started: Instant,
    phase: String,
    phase_started: Instant,
    wallclock: DateTime<Local>,
}

impl PhaseTimer {
    pub fn start(phase: impl Into<String>) -> Self {
        let phase = phase.into();
        let wallclock = Local::now();
        log::info!("[{}] {}", wallclock.format("%H:%M:%S"), phase);
        let now = Instant::now();
        Self {
            started: now,
            phase,
            phase_started: now,
            wallclock,
        }
    }

    /// 结束当前阶段并开始下一阶段
    pub fn next_phase(&mut self, phase: impl Into<String>) {
        self.log_phase();
        self.phase = phase.into();
        self.phase_started = Instant::now();
        log::info!("[{}] {}", Local::now().format("%H:%M:%S"), self.phase);
    }

    fn log_phase(&self) {
        log::debug!("{} took {:.3}s", self.phase, self.phase_started.elapsed().as_secs_f64());
    }

    pub fn finish(self) -> f64 {
        self.log_phase();
        let total = self.started.elapsed().as_secs_f64();
        log::info!("overall {:.3}s (started {})", total, self.wallclock.to_rfc3339());
        total
    }
}
