pub mod bus;
pub mod config;
pub mod info;
pub mod prepare;
pub mod run;
pub mod storage;

use busprobe_core::{BusprobeError, StorageOutcome, StorageReport};

/// Turn a non-clean storage outcome into the error that picks the exit code
pub(crate) fn outcome_result(report: &StorageReport) -> anyhow::Result<()> {
    match &report.outcome {
        StorageOutcome::CompletedFully | StorageOutcome::Stopped => Ok(()),
        StorageOutcome::StoppedOnMismatch(violation) => {
            Err(BusprobeError::Integrity(violation.clone()).into())
        }
        StorageOutcome::OpenFailed { reason } => Err(BusprobeError::Open(reason.clone()).into()),
    }
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use busprobe_core::{IntegrityViolation, StorageStats};

    #[test]
    fn test_mismatch_maps_to_integrity_error() {
        let violation = IntegrityViolation::compare(3, 3072, &[1, 2, 3], &[1, 2, 4]).unwrap();
        let report = StorageReport {
            outcome: StorageOutcome::StoppedOnMismatch(violation),
            stats: StorageStats::default(),
        };

        let err = outcome_result(&report).unwrap_err();
        let err = err.downcast_ref::<BusprobeError>().unwrap();
        assert!(err.is_integrity_violation());
    }

    #[test]
    fn test_open_failure_maps_to_open_error() {
        let err = outcome_result(&StorageReport::open_failed("missing")).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BusprobeError>(),
            Some(BusprobeError::Open(_))
        ));
    }

    #[test]
    fn test_stopped_is_ok() {
        let report = StorageReport {
            outcome: StorageOutcome::Stopped,
            stats: StorageStats::default(),
        };
        assert!(outcome_result(&report).is_ok());
    }
}
