#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use std::time::Instant;
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Logs elapsed time and resident memory after each pipeline stage.
#[cfg(feature = "cli")]
pub struct StageMonitor {
    state: Option<Mutex<MonitorState>>,
}

#[cfg(feature = "cli")]
struct MonitorState {
    system: System,
    pid: Pid,
    started: Instant,
    last_stage: Instant,
    peak_memory_mb: u64,
}

#[cfg(feature = "cli")]
impl StageMonitor {
    pub fn new(enabled: bool) -> Self {
        let state = enabled
            .then(|| match sysinfo::get_current_pid() {
                Ok(pid) => Some(pid),
                Err(e) => {
                    tracing::warn!("System monitoring disabled: {}", e);
                    None
                }
            })
            .flatten()
            .map(|pid| {
                let now = Instant::now();
                Mutex::new(MonitorState {
                    system: System::new(),
                    pid,
                    started: now,
                    last_stage: now,
                    peak_memory_mb: 0,
                })
            });
        Self { state }
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_some()
    }

    pub fn log_stats(&self, stage: &str) {
        let Some(mut state) = self.state.as_ref().and_then(|s| s.lock().ok()) else {
            return;
        };
        let memory_mb = state.sample_memory_mb();
        let stage_time = state.last_stage.elapsed();
        state.last_stage = Instant::now();
        tracing::info!(
            "📊 {} - Memory: {}MB, Peak: {}MB, Stage time: {:?}",
            stage,
            memory_mb,
            state.peak_memory_mb,
            stage_time
        );
    }

    pub fn log_final_stats(&self) {
        let Some(mut state) = self.state.as_ref().and_then(|s| s.lock().ok()) else {
            return;
        };
        state.sample_memory_mb();
        tracing::info!(
            "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
            state.started.elapsed(),
            state.peak_memory_mb
        );
    }
}

#[cfg(feature = "cli")]
impl MonitorState {
    fn sample_memory_mb(&mut self) -> u64 {
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);
        let memory_mb = self
            .system
            .process(self.pid)
            .map(|p| p.memory() / 1024 / 1024)
            .unwrap_or(0);
        self.peak_memory_mb = self.peak_memory_mb.max(memory_mb);
        memory_mb
    }
}

// No-op without the cli feature.
#[cfg(not(feature = "cli"))]
pub struct StageMonitor;

#[cfg(not(feature = "cli"))]
impl StageMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn is_enabled(&self) -> bool {
        false
    }

    pub fn log_stats(&self, _stage: &str) {}

    pub fn log_final_stats(&self) {}
}
