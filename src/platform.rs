//! Platform hooks for the producer.
//!
//! The camera device exposes two binary facilities the streamer drives:
//! a visual indicator (an LED in the reference hardware) used as a
//! capture heartbeat and as a fault pattern, and a reset line that
//! returns the device to its boot state. Hosts without either install
//! the null implementations.

use tracing::warn;

/// Binary on/off status output.
///
/// Briefly on while a frame is being captured; blinked in a fixed
/// pattern when the streamer hits memory pressure.
pub trait StatusIndicator: Send + Sync {
    /// Turn the indicator on or off.
    fn set_active(&self, on: bool);
}

/// Full device restart hook.
///
/// Invoked exactly once when the streamer escalates an allocation
/// failure; a fresh boot is the only recovery that guarantees a clean
/// heap on the target.
pub trait DeviceReset: Send + Sync {
    /// Request a restart. On real hardware this does not return.
    fn restart(&self);
}

/// Indicator that goes nowhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullIndicator;

impl StatusIndicator for NullIndicator {
    fn set_active(&self, _on: bool) {}
}

/// Reset hook for hosts that cannot restart themselves.
///
/// Logs the request so a supervising process manager can act on it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReset;

impl DeviceReset for NullReset {
    fn restart(&self) {
        warn!("Device restart requested, but no reset hook is installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_impls_are_callable() {
        NullIndicator.set_active(true);
        NullIndicator.set_active(false);
        NullReset.restart();
    }
}
