use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// Device-level hooks the automation depends on.
pub trait SystemServices: Send + Sync {
    /// Asks for the accessibility-equivalent access the upload automation
    /// needs. `false` blocks the poll loop from starting.
    fn request_accessibility_permission(&self) -> bool;

    fn register_boot_start(&self);

    fn unregister_boot_start(&self);

    fn set_battery_optimization(&self, enabled: bool);
}

/// Logs each hook and answers permission requests from configuration.
#[derive(Debug)]
pub struct SimulatedSystem {
    grant_permission: bool,
    boot_registered: AtomicBool,
    battery_optimized: AtomicBool,
}

impl SimulatedSystem {
    pub fn new(grant_permission: bool) -> Self {
        Self {
            grant_permission,
            boot_registered: AtomicBool::new(false),
            battery_optimized: AtomicBool::new(false),
        }
    }

    pub fn is_boot_registered(&self) -> bool {
        self.boot_registered.load(Ordering::SeqCst)
    }

    pub fn is_battery_optimized(&self) -> bool {
        self.battery_optimized.load(Ordering::SeqCst)
    }
}

impl SystemServices for SimulatedSystem {
    fn request_accessibility_permission(&self) -> bool {
        info!(
            "Requesting accessibility permission: {}",
            if self.grant_permission { "granted" } else { "denied" }
        );
        self.grant_permission
    }

    fn register_boot_start(&self) {
        info!("Registered to start on boot");
        self.boot_registered.store(true, Ordering::SeqCst);
    }

    fn unregister_boot_start(&self) {
        info!("Unregistered start on boot");
        self.boot_registered.store(false, Ordering::SeqCst);
    }

    fn set_battery_optimization(&self, enabled: bool) {
        info!("Setting battery optimization: {}", enabled);
        self.battery_optimized.store(enabled, Ordering::SeqCst);
    }
}
