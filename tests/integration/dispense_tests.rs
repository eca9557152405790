//! Dispense flows through `MachineService` against mock adapters.

use crate::mock_hw::{
    MockActuator, RecordingSink, RecordingUsage, factory_service, ice_only, screwdriver,
};
use cocktailbot::adapters::nvs::NvsAdapter;
use cocktailbot::app::events::AppEvent;
use cocktailbot::error::{ActuatorError, Error, ValidationError};
use cocktailbot::safety::Operation;
use cocktailbot::sequencer::DispenseState;

#[test]
fn screwdriver_at_300_pours_scaled_amounts() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    let (mut hw, mut sink, mut usage) = (MockActuator::new(), RecordingSink::new(), RecordingUsage::default());

    let report = svc
        .make_cocktail(&screwdriver(), 300, &mut hw, &mut sink, &mut usage)
        .unwrap();

    let amounts: Vec<u32> = report.recipe.items.iter().map(|i| i.amount_ml).collect();
    assert_eq!(amounts, [75, 225]);
    assert!((report.recipe.scale_factor - 1.875).abs() < 1e-9);
    assert_eq!(hw.pumps(), [1, 12]);
    assert_eq!(hw.calls[0].duration_ms, 3000);
    assert_eq!(hw.calls[1].duration_ms, 9000);
    assert_eq!(svc.ledger().peek("vodka").unwrap().current_ml, 625);
    assert_eq!(svc.ledger().peek("orange-juice").unwrap().current_ml, 475);
    assert_eq!(svc.dispense_state(), DispenseState::Completed);
    assert_eq!(usage.records, [("screwdriver".to_string(), "Screwdriver".to_string())]);
}

#[test]
fn progress_only_moves_after_actuations() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    let (mut hw, mut sink) = (MockActuator::new(), RecordingSink::new());

    svc.make_cocktail(&screwdriver(), 300, &mut hw, &mut sink, &mut RecordingUsage::default())
        .unwrap();

    let progress = sink.progress();
    assert_eq!(progress, [25, 100, 100]);
    assert!(progress.windows(2).all(|w| w[0] <= w[1]));
    assert!(sink.contains(&AppEvent::DispenseCompleted {
        cocktail: "Screwdriver".into(),
        size_ml: 300
    }));
}

#[test]
fn short_vodka_rejects_with_zero_actuations() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    svc.set_level("vodka", 50, None);
    let (mut hw, mut sink, mut usage) = (MockActuator::new(), RecordingSink::new(), RecordingUsage::default());

    let err = svc
        .make_cocktail(&screwdriver(), 300, &mut hw, &mut sink, &mut usage)
        .unwrap_err();

    assert_eq!(err.error, Error::InsufficientInventory(vec!["vodka".into()]));
    assert!(hw.calls.is_empty());
    assert!(usage.records.is_empty());
    assert_eq!(svc.ledger().peek("vodka").unwrap().current_ml, 50);
    assert_eq!(svc.ledger().peek("orange-juice").unwrap().current_ml, 700);
    assert_eq!(svc.dispense_state(), DispenseState::Failed);
}

#[test]
fn manual_only_completes_at_100_without_pumping() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    let (mut hw, mut sink, mut usage) = (MockActuator::new(), RecordingSink::new(), RecordingUsage::default());

    let report = svc
        .make_cocktail(&ice_only(), 400, &mut hw, &mut sink, &mut usage)
        .unwrap();

    assert!(hw.calls.is_empty());
    assert_eq!(report.actuations, 0);
    assert_eq!(sink.progress(), [100]);
    assert_eq!(usage.records.len(), 1);
}

#[test]
fn actuator_fault_stops_without_rollback_or_usage() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    let mut hw = MockActuator::failing_on(12);
    let (mut sink, mut usage) = (RecordingSink::new(), RecordingUsage::default());

    let err = svc
        .make_cocktail(&screwdriver(), 300, &mut hw, &mut sink, &mut usage)
        .unwrap_err();

    assert_eq!(err.error, Error::Actuator(ActuatorError::Timeout(12)));
    assert_eq!((err.progress, err.items_completed), (25, 1));
    assert_eq!(svc.ledger().peek("vodka").unwrap().current_ml, 625);
    assert!(usage.records.is_empty());
    assert!(sink.contains(&AppEvent::DispenseFailed {
        reason: err.error.to_string(),
        percent: 25
    }));
    assert!(!svc.is_busy(), "interlock must be released on failure");
}

#[test]
fn unbound_ingredient_is_a_validation_error() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    svc.rebind_pump(1, None).unwrap();
    let mut hw = MockActuator::new();

    let err = svc
        .make_cocktail(
            &screwdriver(),
            200,
            &mut hw,
            &mut RecordingSink::new(),
            &mut RecordingUsage::default(),
        )
        .unwrap_err();

    assert_eq!(
        err.error,
        Error::Validation(ValidationError::MissingPumpBinding("vodka".into()))
    );
    assert!(hw.calls.is_empty());
}

#[test]
fn unsupported_size_is_rejected() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    let err = svc
        .make_cocktail(
            &screwdriver(),
            250,
            &mut MockActuator::new(),
            &mut RecordingSink::new(),
            &mut RecordingUsage::default(),
        )
        .unwrap_err();
    assert_eq!(err.error, Error::Validation(ValidationError::UnsupportedSize(250)));
}

#[test]
fn busy_machine_refuses_a_second_dispense() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    let held = svc.interlock().try_acquire(Operation::Cleaning).unwrap();
    let mut hw = MockActuator::new();

    let err = svc
        .make_cocktail(
            &screwdriver(),
            300,
            &mut hw,
            &mut RecordingSink::new(),
            &mut RecordingUsage::default(),
        )
        .unwrap_err();

    assert_eq!(err.error, Error::Busy);
    assert!(hw.calls.is_empty());
    drop(held);
    assert!(!svc.is_busy());
}

#[test]
fn shot_pours_one_ingredient() {
    let nvs = NvsAdapter::default();
    let mut svc = factory_service(&nvs);
    let mut hw = MockActuator::new();

    let report = svc
        .make_shot("tequila", 40, &mut hw, &mut RecordingSink::new())
        .unwrap();

    assert_eq!(report.dispensed_ml, 40);
    assert_eq!(hw.pumps(), [5]);
    assert_eq!(hw.calls[0].duration_ms, 1600);
    assert_eq!(svc.ledger().peek("tequila").unwrap().current_ml, 660);

    let err = svc
        .make_shot("tequila", 30, &mut hw, &mut RecordingSink::new())
        .unwrap_err();
    assert_eq!(err.error, Error::Validation(ValidationError::UnsupportedSize(30)));
}

#[test]
fn ledger_outage_does_not_block_dispensing() {
    use crate::mock_hw::{BrokenLevelStore, ReadOnlyPumpStore};
    use cocktailbot::adapters::time::FixedClock;
    use cocktailbot::app::service::MachineService;
    use cocktailbot::config::MachineConfig;

    let mut svc = MachineService::boot(
        MachineConfig::default(),
        BrokenLevelStore,
        FixedClock(0),
        ReadOnlyPumpStore,
    );
    let mut hw = MockActuator::new();
    svc.make_cocktail(
        &screwdriver(),
        200,
        &mut hw,
        &mut RecordingSink::new(),
        &mut RecordingUsage::default(),
    )
    .unwrap();

    assert_eq!(hw.calls.len(), 2);
    assert_eq!(svc.ledger().peek("vodka").unwrap().current_ml, 650);
}
