//! Best-effort host resource gate.
use soak_core::HealthConfig;
use std::path::{Path, PathBuf};
use sysinfo::{Disks, System};
use tokio_util::sync::CancellationToken;
#[allow(unused)]
use tracing::{debug, error, info, trace, warn};

/// Point-in-time view of host resources. `None` means the value could not be sampled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resources {
    pub free_disk: Option<u64>,
    pub available_memory: Option<u64>,
}

pub trait ResourceProbe: Send + Sync {
    fn sample(&mut self) -> Resources;
}

/// Samples the disk holding `path` and system memory through `sysinfo`.
pub struct SystemProbe {
    system: System,
    path: PathBuf,
}

impl SystemProbe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            system: System::new(),
            path: path.into(),
        }
    }
}

impl ResourceProbe for SystemProbe {
    fn sample(&mut self) -> Resources {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Resources::default();
        }

        self.system.refresh_memory();
        let available_memory = Some(self.system.available_memory()).filter(|mem| *mem > 0);

        let path = self
            .path
            .canonicalize()
            .unwrap_or_else(|_| PathBuf::from("/"));
        let disks = Disks::new_with_refreshed_list();
        let free_disk = disks
            .list()
            .iter()
            .filter(|disk| path.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .map(|disk| disk.available_space());

        Resources {
            free_disk,
            available_memory,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Ok,
    LowDisk(u64),
    LowMemory(u64),
}

pub struct HealthGate {
    config: HealthConfig,
    probe: Box<dyn ResourceProbe>,
}

impl HealthGate {
    pub fn new(config: HealthConfig, probe: Box<dyn ResourceProbe>) -> Self {
        Self { config, probe }
    }

    pub fn system(config: HealthConfig, path: &Path) -> Self {
        Self::new(config, Box::new(SystemProbe::new(path)))
    }

    pub fn due(&self, batch: u64) -> bool {
        self.config.every_batches > 0 && batch % self.config.every_batches == 0
    }

    /// Missing samples count as healthy.
    pub fn check(&mut self) -> Health {
        let resources = self.probe.sample();
        trace!("Sampled resources: {resources:?}");

        match resources {
            Resources {
                free_disk: Some(disk),
                ..
            } if disk < self.config.min_free_disk => Health::LowDisk(disk),
            Resources {
                available_memory: Some(mem),
                ..
            } if mem < self.config.min_available_memory => Health::LowMemory(mem),
            _ => Health::Ok,
        }
    }

    /// Checks resources and, if they are low, pauses for the configured time or until cancelled.
    /// Returns the health that was observed.
    pub async fn wait_if_unhealthy(&mut self, token: &CancellationToken) -> Health {
        let health = self.check();
        match health {
            Health::Ok => return health,
            Health::LowDisk(bytes) => warn!("Low free disk space: {:.2} GiB", gib(bytes)),
            Health::LowMemory(bytes) => warn!("Low available memory: {:.2} GiB", gib(bytes)),
        }

        warn!(
            "Health check failed, pausing for {}",
            humantime::format_duration(self.config.pause)
        );
        tokio::select! {
            _ = tokio::time::sleep(self.config.pause) => {}
            _ = token.cancelled() => {}
        }
        health
    }
}

fn gib(bytes: u64) -> f64 {
    bytes as f64 / (1024. * 1024. * 1024.)
}
