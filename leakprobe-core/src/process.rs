//! Process-level memory figures, read through `sysinfo`.

use parking_lot::Mutex;
use sysinfo::{Pid, System};

use crate::error::SampleError;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Raw memory figures of this process, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessMemory {
    pub resident_bytes: u64,
    pub virtual_bytes: u64,
    pub host_total_bytes: u64,
}

impl ProcessMemory {
    pub fn resident_mb(&self) -> f64 {
        round2(self.resident_bytes as f64 / BYTES_PER_MB)
    }

    pub fn virtual_mb(&self) -> f64 {
        round2(self.virtual_bytes as f64 / BYTES_PER_MB)
    }

    /// Resident memory as a percentage of host memory.
    pub fn percent_of_host(&self) -> f64 {
        if self.host_total_bytes == 0 {
            return 0.0;
        }
        round2(self.resident_bytes as f64 * 100.0 / self.host_total_bytes as f64)
    }
}

#[inline]
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Samples the current process. Keeps one `System` around so repeated
/// scrapes reuse its buffers.
pub struct ProcessSampler {
    pid: Pid,
    system: Mutex<System>,
}

impl ProcessSampler {
    pub fn new() -> Result<Self, SampleError> {
        let pid = sysinfo::get_current_pid().map_err(|e| SampleError::Pid(e.to_string()))?;
        Ok(Self {
            pid,
            system: Mutex::new(System::new()),
        })
    }

    pub fn sample(&self) -> Result<ProcessMemory, SampleError> {
        let mut system = self.system.lock();
        system.refresh_memory();
        if !system.refresh_process(self.pid) {
            return Err(SampleError::ProcessNotFound(self.pid.as_u32()));
        }
        let process = system
            .process(self.pid)
            .ok_or(SampleError::ProcessNotFound(self.pid.as_u32()))?;

        Ok(ProcessMemory {
            resident_bytes: process.memory(),
            virtual_bytes: process.virtual_memory(),
            host_total_bytes: system.total_memory(),
        })
    }
}
