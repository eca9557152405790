//! Flow-rate calibration through `MachineService`.

use crate::mock_hw::{MockActuator, RecordingSink, RecordingUsage, factory_service, screwdriver};
use cocktailbot::adapters::nvs::NvsAdapter;
use cocktailbot::app::events::AppEvent;
use cocktailbot::app::ports::PumpStore;
use cocktailbot::error::{CalibrationError, Error, ValidationError};
use cocktailbot::safety::Operation;

fn flow_of(nvs: &NvsAdapter, pump: u8) -> f32 {
    nvs.load_pumps()
        .unwrap()
        .into_iter()
        .find(|p| p.id == pump)
        .map(|p| p.flow_rate_ml_s)
        .unwrap()
}

#[test]
fn pulse_then_measure_stores_the_new_rate() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    let (mut hw, mut sink) = (MockActuator::new(), RecordingSink::new());

    let session = svc.begin_calibration(1, &mut hw, &mut sink).unwrap();
    assert_eq!(session.reference_ms, 2000);
    assert_eq!(hw.calls[0].duration_ms, 2000);
    assert_eq!(svc.pending_calibration(), Some(session));

    let rate = svc.finish_calibration(1, 40.0, &mut sink).unwrap();
    assert!((rate - 20.0).abs() < 1e-6);
    assert!((svc.registry().get(1).unwrap().flow_rate_ml_s - 20.0).abs() < 1e-6);
    assert!((flow_of(&nvs, 1) - 20.0).abs() < 1e-6);
    assert!(svc.pending_calibration().is_none());
    assert!(sink.contains(&AppEvent::CalibrationPulse {
        pump: 1,
        duration_ms: 2000
    }));
    assert!(!svc.is_busy());
}

#[test]
fn new_rate_changes_dispense_durations() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    let mut sink = RecordingSink::new();
    svc.begin_calibration(1, &mut MockActuator::new(), &mut sink).unwrap();
    svc.finish_calibration(1, 40.0, &mut sink).unwrap();

    let mut hw = MockActuator::new();
    svc.make_cocktail(&screwdriver(), 300, &mut hw, &mut sink, &mut RecordingUsage::default())
        .unwrap();
    // 75 ml at 20 mL/s, 225 ml at the untouched 25 mL/s.
    assert_eq!(hw.calls[0].duration_ms, 3750);
    assert_eq!(hw.calls[1].duration_ms, 9000);
}

#[test]
fn rejected_measurement_keeps_rate_and_session() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    let mut sink = RecordingSink::new();
    svc.begin_calibration(3, &mut MockActuator::new(), &mut sink).unwrap();

    assert_eq!(
        svc.finish_calibration(3, 0.0, &mut sink),
        Err(Error::Calibration(CalibrationError::NonPositiveVolume(0.0)))
    );
    assert!((svc.registry().get(3).unwrap().flow_rate_ml_s - 25.0).abs() < 1e-6);
    assert!(svc.pending_calibration().is_some());

    let rate = svc.finish_calibration(3, 55.0, &mut sink).unwrap();
    assert!((rate - 27.5).abs() < 1e-5);
}

#[test]
fn measurement_for_another_pump_is_refused() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    let mut sink = RecordingSink::new();
    svc.begin_calibration(2, &mut MockActuator::new(), &mut sink).unwrap();

    assert_eq!(
        svc.finish_calibration(4, 50.0, &mut sink),
        Err(Error::Calibration(CalibrationError::PumpMismatch {
            expected: 2,
            got: 4
        }))
    );
}

#[test]
fn measure_without_pulse_fails() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    assert_eq!(
        svc.finish_calibration(1, 50.0, &mut RecordingSink::new()),
        Err(Error::Calibration(CalibrationError::NoPulse))
    );
}

#[test]
fn unknown_or_busy_pump_is_not_pulsed() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    let mut hw = MockActuator::new();

    assert_eq!(
        svc.begin_calibration(99, &mut hw, &mut RecordingSink::new()),
        Err(Error::Validation(ValidationError::UnknownPump(99)))
    );

    let _held = svc.interlock().try_acquire(Operation::Cleaning).unwrap();
    assert_eq!(
        svc.begin_calibration(1, &mut hw, &mut RecordingSink::new()),
        Err(Error::Busy)
    );
    assert!(hw.calls.is_empty());
}

#[test]
fn pour_between_pulse_and_measurement_voids_the_pulse() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    let mut sink = RecordingSink::new();
    svc.begin_calibration(1, &mut MockActuator::new(), &mut sink).unwrap();

    svc.make_cocktail(&screwdriver(), 200, &mut MockActuator::new(), &mut sink, &mut RecordingUsage::default())
        .unwrap();

    assert!(svc.pending_calibration().is_none());
    assert_eq!(
        svc.finish_calibration(1, 50.0, &mut sink),
        Err(Error::Calibration(CalibrationError::NoPulse))
    );
    assert!((svc.registry().get(1).unwrap().flow_rate_ml_s - 25.0).abs() < 1e-6);
}

#[test]
fn flush_between_pulse_and_measurement_voids_the_pulse() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    let mut sink = RecordingSink::new();
    svc.begin_calibration(2, &mut MockActuator::new(), &mut sink).unwrap();

    svc.clean_pump(2, &mut MockActuator::new(), &mut sink).unwrap();
    assert!(svc.pending_calibration().is_none());
}

#[test]
fn refused_pour_keeps_the_pulse() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    let mut sink = RecordingSink::new();
    svc.begin_calibration(1, &mut MockActuator::new(), &mut sink).unwrap();

    let _held = svc.interlock().try_acquire(Operation::Cleaning).unwrap();
    assert!(svc.make_shot("vodka", 20, &mut MockActuator::new(), &mut sink).is_err());
    assert!(svc.pending_calibration().is_some());
}
