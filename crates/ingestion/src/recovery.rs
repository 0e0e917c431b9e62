//! Sensor recovery
//!
//! Escalates sustained sync loss into a hardware reboot cycle: close the bus,
//! reboot the sensor, wait for it to settle and reopen the bus.

use std::time::Duration;

use contracts::{PacketSource, SensorRegisters, SyncState};
use tracing::{error, info, instrument, warn};

use crate::error::{AcquisitionError, Result};
use crate::sync::ResyncHandler;

/// Recovery options
#[derive(Debug, Clone, Copy)]
pub struct RecoveryOptions {
    /// Consecutive resyncs that trigger a reboot
    pub threshold: u32,
    /// Wait between reboot and reopen
    pub settle_delay: Duration,
    /// Reboot cycles without a valid pass before failing (0 = unlimited)
    pub max_consecutive_reboots: u32,
}

impl Default for RecoveryOptions {
    fn default() -> Self {
        Self {
            threshold: 750,
            settle_delay: Duration::from_millis(750),
            max_consecutive_reboots: 0,
        }
    }
}

/// Recovery controller
///
/// Owns the register interface for the lifetime of the acquisition loop.
pub struct RecoveryController {
    registers: Box<dyn SensorRegisters>,
    options: RecoveryOptions,
    reboots: u64,
    reboots_since_valid: u32,
}

impl RecoveryController {
    pub fn new(registers: Box<dyn SensorRegisters>, options: RecoveryOptions) -> Self {
        Self {
            registers,
            options,
            reboots: 0,
            reboots_since_valid: 0,
        }
    }

    /// Reboot cycles performed
    pub fn reboots(&self) -> u64 {
        self.reboots
    }

    /// A pass was validated; the sensor is delivering again
    pub fn on_valid_pass(&mut self) {
        self.reboots_since_valid = 0;
    }

    /// Run flat-field correction, logging failures
    pub fn perform_ffc(&mut self) -> bool {
        match self.registers.perform_ffc() {
            Ok(()) => {
                info!("flat-field correction done");
                observability::record_ffc(true);
                true
            }
            Err(e) => {
                warn!(error = %e, "flat-field correction failed");
                observability::record_ffc(false);
                false
            }
        }
    }

    #[instrument(
        name = "recovery_reboot_cycle",
        skip(self, bus, state),
        fields(bus = %bus.name(), resets = state.resets)
    )]
    fn reboot_cycle(&mut self, bus: &mut dyn PacketSource, state: &mut SyncState) -> Result<()> {
        warn!(resets = state.resets, "sync lost, rebooting sensor");
        bus.close();

        let command_ok = match self.registers.reboot() {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "reboot command failed, continuing");
                false
            }
        };
        observability::record_reboot(command_ok);

        state.resets = 0;
        state.clear_fault_counters();
        self.reboots += 1;
        self.reboots_since_valid += 1;

        let limit = self.options.max_consecutive_reboots;
        if limit > 0 && self.reboots_since_valid >= limit {
            error!(reboots = self.reboots_since_valid, "sensor did not recover");
            return Err(AcquisitionError::PersistentDesync {
                reboots: self.reboots_since_valid,
            });
        }

        if !self.options.settle_delay.is_zero() {
            std::thread::sleep(self.options.settle_delay);
        }

        bus.open()
            .map_err(|source| AcquisitionError::Reopen { source })?;
        info!(reboots = self.reboots, "bus reopened after reboot");
        Ok(())
    }
}

impl ResyncHandler for RecoveryController {
    fn on_resync(&mut self, bus: &mut dyn PacketSource, state: &mut SyncState) -> Result<()> {
        if state.resets >= self.options.threshold {
            self.reboot_cycle(bus, state)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::{PassOutcome, SyncController, SyncOptions};
    use contracts::SensorVariant;
    use device::{
        mismatched_packets, uniform_pass, MockRegisters, RegisterCall, RegisterFailures,
        ScriptedBus,
    };

    fn options(max_consecutive_reboots: u32) -> RecoveryOptions {
        RecoveryOptions {
            threshold: 750,
            settle_delay: Duration::ZERO,
            max_consecutive_reboots,
        }
    }

    fn sync() -> SyncController {
        SyncController::new(SyncOptions {
            resync_delay: Duration::ZERO,
            ..Default::default()
        })
    }

    #[test]
    fn test_below_threshold_no_reboot() {
        let mut packets = mismatched_packets(749);
        packets.extend(uniform_pass(None, 30000));
        let mut bus = ScriptedBus::new(packets);
        bus.open().unwrap();
        let counters = bus.counters();
        let registers = MockRegisters::new();
        let log = registers.log();
        let mut recovery = RecoveryController::new(Box::new(registers), options(0));
        let mut state = SyncState::default();

        let report = sync()
            .read_pass(SensorVariant::Lepton2, &mut bus, &mut state, &mut recovery)
            .unwrap();
        assert_eq!(report.outcome, PassOutcome::Complete { segment: 1 });
        assert_eq!(report.resyncs, 749);
        assert_eq!(log.reboots(), 0);
        assert_eq!(recovery.reboots(), 0);
        assert_eq!(counters.closes(), 0);
        assert_eq!(state.resets, 0);
    }

    #[test]
    fn test_threshold_triggers_one_reboot_cycle() {
        let mut packets = mismatched_packets(750);
        packets.extend(uniform_pass(None, 30000));
        let mut bus = ScriptedBus::new(packets);
        bus.open().unwrap();
        let counters = bus.counters();
        let registers = MockRegisters::new();
        let log = registers.log();
        let mut recovery = RecoveryController::new(Box::new(registers), options(0));
        let mut state = SyncState {
            wrong_segments: 4,
            zero_drops: 9,
            ..Default::default()
        };

        let report = sync()
            .read_pass(SensorVariant::Lepton2, &mut bus, &mut state, &mut recovery)
            .unwrap();
        assert_eq!(report.outcome, PassOutcome::Complete { segment: 1 });
        assert_eq!(log.reboots(), 1);
        assert_eq!(recovery.reboots(), 1);
        assert_eq!(counters.closes(), 1);
        assert_eq!(counters.opens(), 2);
        assert_eq!(state.resets, 0);
        assert_eq!(state.wrong_segments, 0);
        assert_eq!(state.zero_drops, 0);
    }

    #[test]
    fn test_reboot_failure_is_not_fatal() {
        let mut packets = mismatched_packets(750);
        packets.extend(uniform_pass(None, 30000));
        let mut bus = ScriptedBus::new(packets);
        bus.open().unwrap();
        let registers = MockRegisters::new().with_failures(RegisterFailures {
            reboot: true,
            ..Default::default()
        });
        let log = registers.log();
        let mut recovery = RecoveryController::new(Box::new(registers), options(0));
        let mut state = SyncState::default();

        let report = sync()
            .read_pass(SensorVariant::Lepton2, &mut bus, &mut state, &mut recovery)
            .unwrap();
        assert_eq!(report.outcome, PassOutcome::Complete { segment: 1 });
        assert_eq!(log.calls(), vec![RegisterCall::Reboot]);
        assert!(bus.is_open());
    }

    #[test]
    fn test_reopen_failure_is_fatal() {
        let mut bus = ScriptedBus::new(mismatched_packets(750)).with_open_limit(1);
        bus.open().unwrap();
        let mut recovery = RecoveryController::new(Box::new(MockRegisters::new()), options(0));
        let mut state = SyncState::default();

        let err = sync()
            .read_pass(SensorVariant::Lepton2, &mut bus, &mut state, &mut recovery)
            .unwrap_err();
        assert!(matches!(err, AcquisitionError::Reopen { .. }));
        assert!(!bus.is_open());
    }

    #[test]
    fn test_reboot_guard() {
        let mut bus = ScriptedBus::new(mismatched_packets(1500));
        bus.open().unwrap();
        let mut recovery = RecoveryController::new(Box::new(MockRegisters::new()), options(2));
        let mut state = SyncState::default();

        let err = sync()
            .read_pass(SensorVariant::Lepton2, &mut bus, &mut state, &mut recovery)
            .unwrap_err();
        assert!(matches!(
            err,
            AcquisitionError::PersistentDesync { reboots: 2 }
        ));
        assert_eq!(recovery.reboots(), 2);
    }

    #[test]
    fn test_valid_pass_resets_guard() {
        let mut packets = mismatched_packets(750);
        packets.extend(uniform_pass(None, 1));
        packets.extend(mismatched_packets(750));
        packets.extend(uniform_pass(None, 1));
        let mut bus = ScriptedBus::new(packets);
        bus.open().unwrap();
        let mut recovery = RecoveryController::new(Box::new(MockRegisters::new()), options(2));
        let mut state = SyncState::default();
        let mut sync = sync();

        for _ in 0..2 {
            sync.read_pass(SensorVariant::Lepton2, &mut bus, &mut state, &mut recovery)
                .unwrap();
            recovery.on_valid_pass();
        }
        assert_eq!(recovery.reboots(), 2);
    }

    #[test]
    fn test_ffc_outcome() {
        let registers = MockRegisters::new().with_failures(RegisterFailures {
            ffc: true,
            ..Default::default()
        });
        let log = registers.log();
        let mut recovery = RecoveryController::new(Box::new(registers), options(0));
        assert!(!recovery.perform_ffc());
        assert_eq!(log.ffcs(), 1);

        let mut recovery = RecoveryController::new(Box::new(MockRegisters::new()), options(0));
        assert!(recovery.perform_ffc());
    }
}
