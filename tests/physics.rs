use std::sync::Arc;

use flight_optimizer::config::{load_aircraft, load_airports, load_optimizer};
use flight_optimizer::core::atmosphere;
use flight_optimizer::core::geo::{GeoPoint, LocalProjection, haversine_m};
use flight_optimizer::core::units::{ft_to_m, kt_to_ms};
use flight_optimizer::field::WindField;
use flight_optimizer::planner::dynamics::{Control, DynamicsModel, InfeasibleInputError, State};
use flight_optimizer::planner::performance::{self, AircraftError, EnvelopeFlag};

fn a320() -> performance::Aircraft {
    let configs = load_aircraft("configs/aircraft").expect("aircraft catalog");
    performance::select(&configs, Some("a320")).expect("A320 in catalog")
}

fn cruise_state() -> (State, Control) {
    (
        State {
            x_m: 0.0,
            y_m: 0.0,
            altitude_m: ft_to_m(35_000.0),
            mass_kg: 70_000.0,
            time_s: 0.0,
        },
        Control {
            mach: 0.78,
            vertical_rate_m_s: 0.0,
            heading_rad: std::f64::consts::FRAC_PI_2,
        },
    )
}

fn dynamics(aircraft: &performance::Aircraft) -> DynamicsModel {
    DynamicsModel::new(
        aircraft.performance.clone(),
        LocalProjection::new(GeoPoint::new(5.0, 50.0)),
    )
}

#[test]
fn isa_sea_level_and_tropopause() {
    assert!((atmosphere::temperature(0.0, 0.0) - 288.15).abs() < 1e-9);
    assert!((atmosphere::pressure(0.0) - 101_325.0).abs() < 1e-6);
    assert!((atmosphere::density(0.0, 0.0) - 1.225).abs() < 1e-3);
    assert!((atmosphere::speed_of_sound(0.0, 0.0) - 340.29).abs() < 0.05);

    let t11 = atmosphere::temperature(11_000.0, 0.0);
    assert!((t11 - 216.65).abs() < 1e-9);
    assert_eq!(atmosphere::temperature(15_000.0, 0.0), t11, "isothermal above the tropopause");
    assert!((atmosphere::pressure(11_000.0) - 22_632.0).abs() < 5.0);
    assert!(atmosphere::pressure(15_000.0) < atmosphere::pressure(11_000.0));
}

#[test]
fn isa_deviation_shifts_temperature_only() {
    let h = 8_000.0;
    assert!((atmosphere::temperature(h, 10.0) - atmosphere::temperature(h, 0.0) - 10.0).abs() < 1e-9);
    assert!(atmosphere::density(h, 10.0) < atmosphere::density(h, 0.0));
    assert!(atmosphere::speed_of_sound(h, 10.0) > atmosphere::speed_of_sound(h, 0.0));
}

#[test]
fn airspeed_conversions_are_consistent() {
    let v = 150.0;
    assert!((atmosphere::tas_to_cas(v, 0.0, 0.0) - v).abs() < 1e-6, "CAS equals TAS at ISA sea level");

    for h in [3_000.0, 10_000.0, 12_000.0] {
        let cas = atmosphere::tas_to_cas(230.0, h, 0.0);
        assert!(cas < 230.0, "CAS below TAS at altitude {h}");
        let back = atmosphere::cas_to_tas(cas, h, 0.0);
        assert!((back - 230.0).abs() < 1e-6, "round trip at {h} m gave {back}");
    }
    let tas = atmosphere::mach_to_tas(0.78, 10_000.0, 0.0);
    assert!((atmosphere::tas_to_mach(tas, 10_000.0, 0.0) - 0.78).abs() < 1e-12);
}

#[test]
fn great_circle_distance_and_projection() {
    let ams = GeoPoint::new(4.7639, 52.3086);
    let cdg = GeoPoint::new(2.5479, 49.0097);
    let d = haversine_m(ams, cdg);
    assert!((d - 398_000.0).abs() < 5_000.0, "EHAM-LFPG is about 398 km, got {d}");

    let projection = LocalProjection::for_route(ams, cdg);
    let (x, y) = projection.project(cdg);
    let back = projection.unproject(x, y);
    assert!((back.longitude - cdg.longitude).abs() < 1e-9);
    assert!((back.latitude - cdg.latitude).abs() < 1e-9);
}

#[test]
fn catalogs_load_from_configs() {
    let aircraft = load_aircraft("configs/aircraft").expect("aircraft catalog");
    assert!(aircraft.iter().any(|a| a.type_code == "A320"));
    assert!(aircraft.iter().any(|a| a.type_code == "B738"));

    let airports = load_airports("configs/airports.yaml").expect("airports");
    let eham = airports.iter().find(|a| a.icao == "EHAM").expect("EHAM listed");
    assert!((eham.latitude - 52.3086).abs() < 1e-6);

    let optimizer = load_optimizer("configs/optimizer.toml").expect("optimizer defaults");
    assert!(optimizer.cruise_nodes >= 2);
    assert!(optimizer.tolerance > 0.0);
}

#[test]
fn invalid_aircraft_files_are_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let source = std::fs::read_to_string("configs/aircraft/a320.toml").expect("a320 config");
    let broken = source.replace("oew_kg = 42600.0", "oew_kg = 90000.0");
    std::fs::write(dir.path().join("broken.toml"), broken).expect("write config");

    let err = load_aircraft(dir.path()).expect_err("OEW above MTOW");
    assert!(err.to_string().contains("mtow_kg"), "unexpected error: {err}");
}

#[test]
fn aircraft_selection_by_code_or_name() {
    let configs = load_aircraft("configs/aircraft").expect("aircraft catalog");
    let by_code = performance::select(&configs, Some("b738")).expect("B738");
    assert_eq!(by_code.type_code, "B738");
    let by_name = performance::select(&configs, Some(&by_code.name)).expect("by name");
    assert_eq!(by_name.type_code, "B738");
    assert!(matches!(
        performance::select(&configs, Some("concorde")),
        Err(AircraftError::NotFound(_))
    ));
    assert!(matches!(performance::select(&[], None), Err(AircraftError::EmptyCatalog)));
}

#[test]
fn cruise_fuel_flow_is_plausible() {
    let aircraft = a320();
    let model = dynamics(&aircraft);
    let (state, control) = cruise_state();
    let node = model.evaluate(&state, &control);
    assert!(
        node.fuel_flow_kg_s > 0.4 && node.fuel_flow_kg_s < 1.2,
        "A320 cruise fuel flow {} kg/s",
        node.fuel_flow_kg_s
    );
    assert!(node.thrust_required_n < node.thrust_max_n);
    assert!(model.envelope_flags(&state, &control, &node).is_empty());

    let heavier = State {
        mass_kg: 76_000.0,
        ..state
    };
    assert!(model.evaluate(&heavier, &control).fuel_flow_kg_s > node.fuel_flow_kg_s);
}

#[test]
fn mass_always_decreases_even_at_idle() {
    let aircraft = a320();
    let model = dynamics(&aircraft);
    let (state, mut control) = cruise_state();
    for vs in [-15.0, -5.0, 0.0, 5.0, 12.0] {
        control.vertical_rate_m_s = vs;
        let rate = model.derivative(&state, &control);
        assert!(rate.mass_kg_s < 0.0, "vertical rate {vs} gave mass rate {}", rate.mass_kg_s);
        assert_eq!(rate.altitude_m_s, vs);
        assert_eq!(rate.time, 1.0);
    }
}

#[test]
fn wind_adds_to_ground_velocity() {
    let aircraft = a320();
    let (state, control) = cruise_state();
    let calm = dynamics(&aircraft).derivative(&state, &control);
    let windy = dynamics(&aircraft)
        .with_wind(Some(Arc::new(WindField::uniform(20.0, -10.0).expect("uniform wind"))))
        .derivative(&state, &control);

    let tas = atmosphere::mach_to_tas(0.78, state.altitude_m, 0.0);
    assert!((calm.x_m_s - tas).abs() < 1e-6, "eastbound x rate equals TAS");
    assert!(calm.y_m_s.abs() < 1e-9);
    assert!((windy.x_m_s - calm.x_m_s - 20.0).abs() < 1e-9);
    assert!((windy.y_m_s - calm.y_m_s + 10.0).abs() < 1e-9);
    assert_eq!(windy.mass_kg_s, calm.mass_kg_s, "wind does not change airspeed or fuel flow");
}

#[test]
fn checked_derivative_rejects_infeasible_inputs() {
    let aircraft = a320();
    let model = dynamics(&aircraft);
    let (state, control) = cruise_state();
    assert!(model.checked_derivative(&state, &control).is_ok());

    let nan = State {
        altitude_m: f64::NAN,
        ..state
    };
    assert_eq!(
        model.checked_derivative(&nan, &control),
        Err(InfeasibleInputError::NonFinite { quantity: "altitude" })
    );

    let steep = Control {
        vertical_rate_m_s: 400.0,
        ..control
    };
    assert!(matches!(
        model.checked_derivative(&state, &steep),
        Err(InfeasibleInputError::VerticalRateExceedsAirspeed { .. })
    ));

    let fast = Control { mach: 0.9, ..control };
    match model.checked_derivative(&state, &fast) {
        Err(InfeasibleInputError::OutsideEnvelope { flags }) => {
            assert!(flags.contains(&EnvelopeFlag::MachAboveMmo), "flags: {flags:?}")
        }
        other => panic!("expected an envelope violation, got {other:?}"),
    }

    let light = State {
        mass_kg: aircraft.oew_kg() - 500.0,
        ..state
    };
    match model.checked_derivative(&light, &control) {
        Err(InfeasibleInputError::OutsideEnvelope { flags }) => {
            assert!(flags.contains(&EnvelopeFlag::MassBelowOew), "flags: {flags:?}")
        }
        other => panic!("expected an envelope violation, got {other:?}"),
    }
}

#[test]
fn slow_flight_is_flagged_below_minimum_cas() {
    let aircraft = a320();
    let model = dynamics(&aircraft);
    let (state, _) = cruise_state();
    let low = State {
        altitude_m: 1_000.0,
        ..state
    };
    let crawl = Control {
        mach: 0.15,
        vertical_rate_m_s: 0.0,
        heading_rad: 0.0,
    };
    let node = model.evaluate(&low, &crawl);
    assert!(node.cas_m_s < kt_to_ms(130.0));
    let flags = model.envelope_flags(&low, &crawl, &node);
    assert!(flags.contains(&EnvelopeFlag::CasBelowMinimum), "flags: {flags:?}");
}
