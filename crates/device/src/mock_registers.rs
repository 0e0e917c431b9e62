//! Recording register interface
//!
//! Used by the synthetic and replay transports (no hardware to command) and
//! by tests that assert on reboot/FFC behavior.

use std::sync::{Arc, Mutex, PoisonError};

use contracts::{ContractError, SensorRegisters};
use tracing::debug;

/// One register command as seen by the mock
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RegisterCall {
    EnableRadiometry,
    LinearCorrection { offset: f32, slope: f32 },
    Reboot,
    Ffc,
}

/// Shared call log
#[derive(Debug, Clone, Default)]
pub struct RegisterLog {
    calls: Arc<Mutex<Vec<RegisterCall>>>,
}

impl RegisterLog {
    fn push(&self, call: RegisterCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    /// All calls so far, in order
    pub fn calls(&self) -> Vec<RegisterCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of reboot commands
    pub fn reboots(&self) -> usize {
        self.count(|c| matches!(c, RegisterCall::Reboot))
    }

    /// Number of FFC commands
    pub fn ffcs(&self) -> usize {
        self.count(|c| matches!(c, RegisterCall::Ffc))
    }

    fn count(&self, predicate: impl Fn(&RegisterCall) -> bool) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|c| predicate(c))
            .count()
    }
}

/// Commands the mock should fail
#[derive(Debug, Clone, Copy, Default)]
pub struct RegisterFailures {
    pub radiometry: bool,
    pub correction: bool,
    pub reboot: bool,
    pub ffc: bool,
}

/// Register interface that records every call
#[derive(Debug, Default)]
pub struct MockRegisters {
    log: RegisterLog,
    failures: RegisterFailures,
}

impl MockRegisters {
    /// Create a mock with a fresh log
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the selected commands (calls are still recorded)
    pub fn with_failures(mut self, failures: RegisterFailures) -> Self {
        self.failures = failures;
        self
    }

    /// Handle to the call log
    pub fn log(&self) -> RegisterLog {
        self.log.clone()
    }

    fn record(&self, call: RegisterCall, fail: bool, command: &str) -> Result<(), ContractError> {
        debug!(?call, "register command");
        self.log.push(call);
        if fail {
            return Err(ContractError::register(command, "injected failure"));
        }
        Ok(())
    }
}

impl SensorRegisters for MockRegisters {
    fn enable_radiometry(&mut self) -> Result<(), ContractError> {
        self.record(
            RegisterCall::EnableRadiometry,
            self.failures.radiometry,
            "rad_enable",
        )
    }

    fn set_linear_correction(&mut self, offset: f32, slope: f32) -> Result<(), ContractError> {
        self.record(
            RegisterCall::LinearCorrection { offset, slope },
            self.failures.correction,
            "rad_linear_correction",
        )
    }

    fn reboot(&mut self) -> Result<(), ContractError> {
        self.record(RegisterCall::Reboot, self.failures.reboot, "oem_reboot")
    }

    fn perform_ffc(&mut self) -> Result<(), ContractError> {
        self.record(RegisterCall::Ffc, self.failures.ffc, "sys_run_ffc")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calls_are_recorded_in_order() {
        let mut registers = MockRegisters::new();
        let log = registers.log();
        registers.enable_radiometry().unwrap();
        registers.set_linear_correction(0.0, 1.0).unwrap();
        registers.reboot().unwrap();
        assert_eq!(
            log.calls(),
            vec![
                RegisterCall::EnableRadiometry,
                RegisterCall::LinearCorrection {
                    offset: 0.0,
                    slope: 1.0
                },
                RegisterCall::Reboot,
            ]
        );
        assert_eq!(log.reboots(), 1);
        assert_eq!(log.ffcs(), 0);
    }

    #[test]
    fn test_injected_failure_still_recorded() {
        let mut registers = MockRegisters::new().with_failures(RegisterFailures {
            reboot: true,
            ..Default::default()
        });
        assert!(registers.reboot().is_err());
        assert_eq!(registers.log().reboots(), 1);
    }
}
