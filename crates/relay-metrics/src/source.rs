use std::process::Stdio;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use relay_common::{Error, Result};
use serde::Deserialize;
use sysinfo::{MINIMUM_CPU_UPDATE_INTERVAL, System};
use tokio::process::Command;

/// CPU and memory utilisation, both as percentages.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Reading {
    pub cpu: f64,
    pub memory: f64,
}

impl Reading {
    pub fn validate(self) -> Result<Self> {
        for (name, value) in [("cpu", self.cpu), ("memory", self.memory)] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(Error::Metrics(format!(
                    "{name} reading out of range: {value}"
                )));
            }
        }
        Ok(self)
    }
}

/// Something that can report current system load.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    fn name(&self) -> &str;
    async fn read(&self) -> Result<Reading>;
}

/// In-process sampling through `sysinfo`.
///
/// CPU usage is a delta between two refreshes, so a read that comes sooner
/// than [`sysinfo::MINIMUM_CPU_UPDATE_INTERVAL`] after the previous refresh
/// waits out the remainder first.
pub struct SystemSource {
    state: Mutex<SystemState>,
}

struct SystemState {
    system: System,
    cpu_refreshed_at: Instant,
}

impl SystemSource {
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_usage();
        system.refresh_memory();
        Self {
            state: Mutex::new(SystemState {
                system,
                cpu_refreshed_at: Instant::now(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SystemState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for SystemSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsSource for SystemSource {
    fn name(&self) -> &str {
        "sysinfo"
    }

    async fn read(&self) -> Result<Reading> {
        let wait = MINIMUM_CPU_UPDATE_INTERVAL.saturating_sub(self.lock().cpu_refreshed_at.elapsed());
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }

        let mut state = self.lock();
        state.system.refresh_cpu_usage();
        state.system.refresh_memory();
        state.cpu_refreshed_at = Instant::now();

        let system = &state.system;
        let total = system.total_memory();
        if total == 0 {
            return Err(Error::Metrics("total memory reported as zero".into()));
        }

        Reading {
            cpu: f64::from(system.global_cpu_usage()).clamp(0.0, 100.0),
            memory: system.used_memory() as f64 / total as f64 * 100.0,
        }
        .validate()
    }
}

/// Shells out to an external program that prints
/// `{"cpu": <percent>, "memory": <percent>}`.
pub struct CommandSource {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandSource {
    pub fn new(program: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            args,
            timeout,
        }
    }

    /// Build from a `[program, args...]` list.
    pub fn from_argv(argv: &[String], timeout: Duration) -> Result<Self> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| Error::Config("metrics command cannot be empty".into()))?;
        Ok(Self::new(program.clone(), args.to_vec(), timeout))
    }
}

#[async_trait]
impl MetricsSource for CommandSource {
    fn name(&self) -> &str {
        &self.program
    }

    async fn read(&self) -> Result<Reading> {
        let output = tokio::time::timeout(
            self.timeout,
            Command::new(&self.program)
                .args(&self.args)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| {
            Error::Metrics(format!(
                "{} timed out after {:?}",
                self.program, self.timeout
            ))
        })??;

        if !output.status.success() {
            return Err(Error::Metrics(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let reading: Reading = serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::Metrics(format!("malformed metrics output: {e}")))?;
        reading.validate()
    }
}
