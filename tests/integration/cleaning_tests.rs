//! Cleaning cycle and single-pump flush through `MachineService`.

use crate::mock_hw::{MockActuator, NoDelay, RecordingSink, service_with_pumps};
use cocktailbot::adapters::nvs::NvsAdapter;
use cocktailbot::app::events::AppEvent;
use cocktailbot::error::{ActuatorError, Error, ValidationError};
use cocktailbot::safety::Operation;
use cocktailbot::sequencer::CleaningState;

#[test]
fn full_cycle_flushes_every_pump_in_id_order() {
    let nvs = NvsAdapter::default();
    let mut svc = service_with_pumps(&nvs, 5);
    let (mut hw, mut delay, mut sink) = (MockActuator::new(), NoDelay::default(), RecordingSink::new());

    let report = svc.clean_all(&mut hw, &mut delay, &mut sink).unwrap();

    assert_eq!(report.flushed, [1, 2, 3, 4, 5]);
    assert!(!report.cancelled);
    assert!(hw.calls.iter().all(|a| a.duration_ms == 10_000));
    assert_eq!(delay.total_ms, 2_000);
    assert_eq!(svc.cleaning_state(), CleaningState::Complete);

    let percents: Vec<u8> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::PumpFlushed { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect();
    assert_eq!(percents, [20, 40, 60, 80, 100]);
}

#[test]
fn cancel_after_second_pump_leaves_third_untouched() {
    let nvs = NvsAdapter::default();
    let mut svc = service_with_pumps(&nvs, 5);
    let mut hw = MockActuator {
        cancel_after: Some((2, svc.cancel_token())),
        ..MockActuator::default()
    };

    let report = svc
        .clean_all(&mut hw, &mut NoDelay::default(), &mut RecordingSink::new())
        .unwrap();

    assert_eq!(report.flushed, [1, 2]);
    assert!(report.cancelled);
    assert_eq!(hw.pumps(), [1, 2]);
    assert_eq!(svc.cleaning_state(), CleaningState::Cancelled);
    assert!(!svc.is_busy());
}

#[test]
fn stale_cancel_does_not_abort_the_next_cycle() {
    let nvs = NvsAdapter::default();
    let mut svc = service_with_pumps(&nvs, 3);
    svc.cancel_token().cancel();

    let report = svc
        .clean_all(&mut MockActuator::new(), &mut NoDelay::default(), &mut RecordingSink::new())
        .unwrap();
    assert_eq!(report.flushed, [1, 2, 3]);
}

#[test]
fn failed_pump_is_reported_and_cycle_continues() {
    let nvs = NvsAdapter::default();
    let mut svc = service_with_pumps(&nvs, 4);
    let mut hw = MockActuator::failing_on(2);
    let mut sink = RecordingSink::new();

    let report = svc.clean_all(&mut hw, &mut NoDelay::default(), &mut sink).unwrap();

    assert_eq!(report.flushed, [1, 3, 4]);
    assert_eq!(report.failed, [(2, ActuatorError::Timeout(2))]);
    assert!(sink.contains(&AppEvent::FlushFailed {
        pump: 2,
        reason: ActuatorError::Timeout(2).to_string()
    }));
}

#[test]
fn single_pump_flush() {
    let nvs = NvsAdapter::default();
    let mut svc = service_with_pumps(&nvs, 3);
    let mut hw = MockActuator::new();

    svc.clean_pump(2, &mut hw, &mut RecordingSink::new()).unwrap();
    assert_eq!(hw.pumps(), [2]);
    assert_eq!(hw.calls[0].duration_ms, 10_000);

    assert_eq!(
        svc.clean_pump(9, &mut hw, &mut RecordingSink::new()),
        Err(Error::Validation(ValidationError::UnknownPump(9)))
    );
}

#[test]
fn flush_shares_the_machine_interlock() {
    let nvs = NvsAdapter::default();
    let mut svc = service_with_pumps(&nvs, 3);
    let _held = svc.interlock().try_acquire(Operation::Dispense).unwrap();
    let mut hw = MockActuator::new();

    assert_eq!(
        svc.clean_pump(1, &mut hw, &mut RecordingSink::new()),
        Err(Error::Busy)
    );
    assert_eq!(
        svc.clean_all(&mut hw, &mut NoDelay::default(), &mut RecordingSink::new())
            .map(|r| r.flushed),
        Err(Error::Busy)
    );
    assert!(hw.calls.is_empty());
}
