mod common;

use serde_json::Value;
use tdoa_locator::projection::{GeoPoint, PlanarPoint};
use tdoa_locator::tdoa_errors::ErrorKind;
use tdoa_locator::{LocateRequest, TdoaError, TdoaLocator};

use crate::common::{parse, Scenario};

fn error_message(doc: &Value) -> &str {
    let obj = doc.as_object().unwrap();
    assert_eq!(obj.len(), 1, "error document must only carry 'error': {doc}");
    obj["error"].as_str().unwrap()
}

#[test]
fn test_wrong_argument_count() {
    let locator = TdoaLocator::default();
    let mut args = Scenario::reference().args();
    args.pop();

    let doc = parse(&locator.run_to_json(&args, false));
    assert_eq!(error_message(&doc), "Expected 12 or 13 arguments, got 11");

    args.extend(["20", "21", "22"].map(String::from));
    let doc = parse(&locator.run_to_json(&args, false));
    assert_eq!(error_message(&doc), "Expected 12 or 13 arguments, got 14");

    let none: [&str; 0] = [];
    let doc = parse(&locator.run_to_json(&none, false));
    assert_eq!(error_message(&doc), "Expected 12 or 13 arguments, got 0");
}

#[test]
fn test_non_numeric_and_non_finite_values() {
    let locator = TdoaLocator::default();

    let mut args = Scenario::reference().args();
    args[4] = "north".into();
    let doc = parse(&locator.run_to_json(&args, false));
    assert!(error_message(&doc).starts_with("Argument 5 is not a number"));

    let mut args = Scenario::reference().args();
    args[9] = "NaN".into();
    let doc = parse(&locator.run_to_json(&args, false));
    assert!(error_message(&doc).starts_with("Argument 10 is not finite"));

    let err = locator.locate_args(&args).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Input);
}

#[test]
fn test_out_of_range_station() {
    let mut args = Scenario::reference().args();
    args[2] = "91.5".into();
    let err = TdoaLocator::default().locate_args(&args).unwrap_err();
    assert!(matches!(err, TdoaError::InvalidStationCoordinate { station: 1, .. }));
    assert_eq!(err.kind(), ErrorKind::Input);
}

#[test]
fn test_absurd_temperature_is_rejected() {
    let mut args = Scenario::reference().args();
    args.push("-600".into());
    let doc = parse(&TdoaLocator::default().run_to_json(&args, false));
    assert!(error_message(&doc).starts_with("Argument 13 is not finite"));
}

#[test]
fn test_equal_delays_give_a_valid_document() {
    let scenario = Scenario::reference();
    let request = LocateRequest::new(scenario.stations(), [2.0; 4], None).unwrap();
    let report = TdoaLocator::default().locate(&request).unwrap();
    assert_eq!(report.degenerate_count(), 5);

    let doc = parse(&report.to_json(false).unwrap());
    assert!(doc.get("error").is_none());
    assert_eq!(doc["omit_solutions"].as_array().unwrap().len(), 4);
    assert_eq!(doc["hyperbolas"].as_array().unwrap().len(), 6);

    let centroid = scenario.to_planar(&doc["global_solution"]);
    assert!((centroid - PlanarPoint::new(50.0, 50.0)).norm() < 1e-6);
}

#[test]
fn test_collinear_stations_give_a_valid_document() {
    let anchor = GeoPoint::new(52.52, 13.405);
    let scenario = Scenario::square(anchor, 100.0, PlanarPoint::new(40.0, 70.0), 343.0);
    let east: Vec<GeoPoint> = (0..4)
        .map(|k| scenario.frame.planar_to_geodetic(100.0 * k as f64, 0.0))
        .collect();
    let delays = [0.1, 0.2, 0.35, 0.6];
    let request = LocateRequest::new(east.try_into().unwrap(), delays, None).unwrap();

    let report = TdoaLocator::default().locate(&request).unwrap();
    assert!(report.global_diagnostics().is_degenerate());
    let doc = parse(&report.to_json(true).unwrap());
    assert!(doc["global_solution"]["lat"].is_f64());
}

#[test]
fn test_coincident_stations_do_not_crash() {
    let args: Vec<String> = [
        "10.0", "20.0", "10.0", "20.0", "10.0", "20.0", "10.0", "20.0", "0.1", "0.2", "0.3",
        "0.4",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    let doc = parse(&TdoaLocator::default().run_to_json(&args, false));
    assert!(doc.get("error").is_none(), "{doc}");
    assert_eq!(doc["stations"].as_array().unwrap().len(), 4);
}

#[test]
fn test_negative_coordinates_are_numbers() {
    let scenario = Scenario::square(
        GeoPoint::new(-22.9, -43.2),
        100.0,
        PlanarPoint::new(60.0, 10.0),
        343.0,
    );
    let doc = parse(&TdoaLocator::default().run_to_json(&scenario.args(), false));
    assert!(doc.get("error").is_none(), "{doc}");
}
