// Feature-level round trip: JSON Lines in, linearized JSON Lines out
use base64::{engine::general_purpose, Engine as _};
use curve_linearizer::{
    linearize_features, read_features, read_wkb, write_features, BatchOptions, Coord, Dimension, Geometry,
    GeometryKind, Linearizer, SkipReason,
};

fn encode(geometry: &Geometry) -> String {
    general_purpose::STANDARD.encode(geometry.to_wkb())
}

fn curved_road() -> Geometry {
    let arc = Geometry::circular_string(
        Dimension::Xy,
        vec![Coord::xy(0.0, 0.0), Coord::xy(50.0, 50.0), Coord::xy(100.0, 0.0)],
    );
    Geometry::aggregate(GeometryKind::MultiCurve, Dimension::Xy, vec![arc]).unwrap()
}

#[test]
fn test_jsonl_round_trip_keeps_attributes() {
    let broken = Geometry::circular_string(Dimension::Xy, vec![Coord::xy(0.0, 0.0), Coord::xy(1.0, 0.0)]);
    let input = format!(
        "{}\n{}\n{}\n",
        format_args!(r#"{{"id": 10, "geometry": "{}", "properties": {{"name": "ring road", "lanes": 4}}}}"#, encode(&curved_road())),
        r#"{"id": 11, "geometry": null, "properties": {"name": "no shape"}}"#,
        format_args!(r#"{{"id": 12, "geometry": "{}", "properties": {{}}}}"#, encode(&broken)),
    );

    let features = read_features(input.as_bytes()).unwrap();
    assert_eq!(features.len(), 3);

    let linearizer = Linearizer::new(2.0).unwrap();
    let output = linearize_features(features, &linearizer, &BatchOptions::default());
    assert_eq!(output.report.written, 1);
    assert_eq!(output.report.without_geometry, 1);
    assert_eq!(output.report.skipped.len(), 1);
    assert_eq!(output.report.skipped[0].reason, SkipReason::NotLinearizable);
    assert_eq!(output.report.to_string(), "1 of 3 features written, 1 skipped, 1 without geometry");

    let mut buffer = Vec::new();
    write_features(&mut buffer, &output.features).unwrap();
    let written = read_features(buffer.as_slice()).unwrap();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].id, 10);
    assert_eq!(written[0].properties["name"], "ring road");
    assert_eq!(written[0].properties["lanes"], 4);

    let geometry = read_wkb(written[0].geometry.as_deref().unwrap()).unwrap();
    assert_eq!(geometry.kind(), GeometryKind::MultiLineString);
    assert_eq!(geometry.parts().len(), 1);
    assert!(!geometry.has_curves());
}

#[test]
fn test_parallel_and_sequential_agree() {
    let features: Vec<_> = (0..64)
        .map(|i| curve_linearizer::Feature::new(i, Some(curved_road().to_wkb())).with_property("n", i))
        .collect();
    let linearizer = Linearizer::new(0.25).unwrap();

    let parallel = linearize_features(features.clone(), &linearizer, &BatchOptions::default());
    let sequential = linearize_features(
        features,
        &linearizer,
        &BatchOptions { parallel: false, ..BatchOptions::default() },
    );
    assert_eq!(parallel.report, sequential.report);
    assert_eq!(parallel.features, sequential.features);
    assert_eq!(parallel.features[63].id, 63);
}
