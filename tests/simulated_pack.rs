use battery_obi::constants::{CLEAR_SETTLE_MS, ENABLE_SETTLE_MS, MODE_SWITCH_SETTLE_MS};
use battery_obi::{
    unlock, BatterySnapshot, Identity, Obi, PresenceEvent, PresenceMonitor, PresenceState,
    SimulatedPack, Telemetry, UnlockOutcome,
};

type Op = fn(&mut Obi<SimulatedPack>) -> battery_obi::Result<()>;

fn read_model(obi: &mut Obi<SimulatedPack>) -> battery_obi::Result<()> {
    obi.read_model().map(|_| ())
}

fn read_identity(obi: &mut Obi<SimulatedPack>) -> battery_obi::Result<()> {
    obi.read_identity(&mut BatterySnapshot::default())
}

fn read_telemetry(obi: &mut Obi<SimulatedPack>) -> battery_obi::Result<()> {
    obi.read_telemetry(&mut BatterySnapshot::default())
}

fn operations() -> Vec<(&'static str, Op)> {
    vec![
        ("read_model", read_model as Op),
        ("read_identity", read_identity as Op),
        ("read_telemetry", read_telemetry as Op),
        ("leds_on", Obi::leds_on as Op),
        ("leds_off", Obi::leds_off as Op),
        ("clear_faults", Obi::clear_faults as Op),
    ]
}

#[test]
fn enable_line_released_exactly_once_on_success() {
    for (name, op) in operations() {
        let mut obi = Obi::new(SimulatedPack::new());
        op(&mut obi).unwrap_or_else(|e| panic!("{} failed: {}", name, e));
        assert_eq!(obi.link().enable_history(), &[true, false], "{}", name);
        assert!(!obi.link().is_enabled(), "{}", name);
    }
}

#[test]
fn enable_line_released_exactly_once_on_failure() {
    for (name, op) in operations() {
        let mut pack = SimulatedPack::new();
        pack.set_present(false);
        let mut obi = Obi::new(pack);
        assert!(op(&mut obi).is_err(), "{} should fail without a pack", name);
        assert_eq!(obi.link().enable_history(), &[true, false], "{}", name);
        assert!(!obi.last_error().is_empty(), "{}", name);
    }
}

#[test]
fn adapter_failure_mid_exchange_still_releases() {
    let mut pack = SimulatedPack::new();
    pack.set_io_failure(true);
    let mut obi = Obi::new(pack);

    let err = obi.read_telemetry(&mut BatterySnapshot::default()).unwrap_err();
    assert_eq!(err.action(), Some("Failed to read battery data"));
    assert_eq!(obi.link().enable_history(), &[true, false]);
}

#[test]
fn last_error_names_the_failing_step() {
    let mut pack = SimulatedPack::new();
    pack.set_present(false);
    let mut obi = Obi::new(pack);

    assert!(obi.read_model().is_err());
    assert!(obi.last_error().starts_with("Failed to read model"));

    assert!(obi.leds_on().is_err());
    assert!(obi.last_error().starts_with("Failed to enter test mode"));

    assert!(obi.read_identity(&mut BatterySnapshot::default()).is_err());
    assert!(obi.last_error().starts_with("Failed to read battery info"));

    // a success leaves the previous message in place
    obi.link_mut().set_present(true);
    obi.read_model().unwrap();
    assert!(obi.last_error().starts_with("Failed to read battery info"));
    obi.clear_last_error();
    assert_eq!(obi.last_error(), "");
}

#[test]
fn leds_toggle_through_test_mode() {
    let mut obi = Obi::new(SimulatedPack::new());
    obi.leds_on().unwrap();
    assert!(obi.link().leds_on());
    obi.leds_off().unwrap();
    assert!(!obi.link().leds_on());

    let waits = obi.link().waits_ms();
    assert_eq!(
        waits,
        &[
            ENABLE_SETTLE_MS,
            MODE_SWITCH_SETTLE_MS,
            ENABLE_SETTLE_MS,
            MODE_SWITCH_SETTLE_MS
        ]
    );
}

#[test]
fn snapshot_merges_across_operations() {
    let identity = Identity {
        rom_id: [0xA1, 0xB2, 0xC3, 0xD4, 0xE5, 0xF6, 0x07, 0x18],
        charge_count: 0x0234,
        status_code: 0x11,
        capacity: 30,
        battery_type: 0x0E,
        ..Default::default()
    };
    let telemetry = Telemetry {
        pack_voltage_mv: 10_000,
        cell_voltages_mv: [2000, 2001, 1999, 2000, 2000],
        temperatures_cc: [-10, 0],
    };
    let mut obi = Obi::new(
        SimulatedPack::new()
            .with_model("BL1430")
            .with_identity(&identity)
            .with_telemetry(&telemetry),
    );

    let mut snapshot = BatterySnapshot::default();
    obi.read_telemetry(&mut snapshot).unwrap();
    assert_eq!(snapshot.identity, None);
    obi.read_identity(&mut snapshot).unwrap();

    assert_eq!(snapshot.identity, Some(identity));
    assert_eq!(snapshot.telemetry, Some(telemetry));
    assert_eq!(obi.read_model().unwrap(), "BL1430");
}

#[test]
fn locked_pack_clears_and_verifies() {
    let seeded = Identity {
        status_code: 0x0C,
        ..Default::default()
    };
    let mut pack = SimulatedPack::new().with_identity(&seeded);
    pack.set_lock_status(0x05);
    let mut obi = Obi::new(pack);

    let mut snapshot = BatterySnapshot::default();
    obi.read_identity(&mut snapshot).unwrap();
    let identity = snapshot.identity.unwrap();
    assert!(identity.is_locked);
    assert_eq!(identity.status_code, 0x0C);

    assert_eq!(unlock(&mut obi).unwrap(), UnlockOutcome::Unlocked);
    assert_eq!(obi.link().lock_status(), 0x00);
    assert!(obi.link().waits_ms().contains(&CLEAR_SETTLE_MS));
}

#[test]
fn monitor_offers_clear_for_locked_pack() {
    let mut pack = SimulatedPack::new();
    pack.set_lock_status(0x05);
    let mut obi = Obi::new(pack);
    let mut monitor = PresenceMonitor::default();

    match monitor.poll(&mut obi) {
        Some(PresenceEvent::Connected(snapshot)) => {
            assert!(snapshot.is_locked());
            assert_eq!(snapshot.model.as_deref(), Some("BL1850B"));
            assert!(snapshot.telemetry.is_some());
        }
        other => panic!("unexpected event {:?}", other),
    }
    assert!(monitor.clear_offer_pending());

    let outcome = monitor.resolve_clear_offer(&mut obi, true).unwrap();
    assert_eq!(outcome, Some(UnlockOutcome::Unlocked));
    assert!(!monitor.clear_offer_pending());
}

#[test]
fn failed_clear_keeps_offer_open() {
    let mut pack = SimulatedPack::new();
    pack.set_lock_status(0x02);
    let mut obi = Obi::new(pack);
    let mut monitor = PresenceMonitor::default();
    monitor.poll(&mut obi);

    obi.link_mut().set_io_failure(true);
    assert!(monitor.resolve_clear_offer(&mut obi, true).is_err());
    assert!(monitor.clear_offer_pending());
    assert!(obi.last_error().starts_with("Failed to enter test mode"));
}

#[test]
fn disconnect_reported_once_until_reconnect() {
    let mut obi = Obi::new(SimulatedPack::new());
    let mut monitor = PresenceMonitor::default();

    assert!(matches!(monitor.poll(&mut obi), Some(PresenceEvent::Connected(_))));
    assert_eq!(monitor.poll(&mut obi), None);
    assert_eq!(monitor.state(), PresenceState::Connected);

    obi.link_mut().set_present(false);
    assert_eq!(monitor.poll(&mut obi), Some(PresenceEvent::Disconnected));
    assert_eq!(monitor.state(), PresenceState::Disconnected);
    assert_eq!(monitor.poll(&mut obi), None);
    assert_eq!(monitor.poll(&mut obi), None);

    obi.link_mut().set_present(true);
    assert!(matches!(monitor.poll(&mut obi), Some(PresenceEvent::Connected(_))));
    assert_eq!(monitor.state(), PresenceState::Connected);
}

#[test]
fn disconnect_drops_pending_offer() {
    let mut pack = SimulatedPack::new();
    pack.set_lock_status(0x01);
    let mut obi = Obi::new(pack);
    let mut monitor = PresenceMonitor::default();

    monitor.poll(&mut obi);
    assert!(monitor.clear_offer_pending());

    obi.link_mut().set_present(false);
    monitor.poll(&mut obi);
    assert!(!monitor.clear_offer_pending());
}
