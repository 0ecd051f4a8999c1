//! Per-feature batch driver
//!
//! Runs the linearizer once per feature. A feature whose geometry cannot be
//! decoded or linearized is logged and skipped; the batch always runs to
//! completion unless it is cancelled. Features are processed in parallel
//! with rayon and come back in input order.

use crate::feature::{id_label, Feature};
use crate::geometry::{read_wkb, write_wkb, WkbByteOrder};
use crate::linearize::Linearizer;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Knobs for [`linearize_features`]
pub struct BatchOptions<'a> {
    /// Byte order of the WKB written back into features
    pub byte_order: WkbByteOrder,
    /// Process features on the rayon thread pool
    pub parallel: bool,
    /// Checked before each feature; once set, remaining features are dropped
    pub cancel: Option<&'a AtomicBool>,
    /// Called with (processed, total) after each feature
    pub progress: Option<&'a (dyn Fn(usize, usize) + Sync)>,
}

impl Default for BatchOptions<'_> {
    fn default() -> Self {
        BatchOptions {
            byte_order: WkbByteOrder::LittleEndian,
            parallel: true,
            cancel: None,
            progress: None,
        }
    }
}

/// Why a feature was left out of the output
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SkipReason {
    /// The WKB payload could not be decoded
    InvalidGeometry(String),
    /// The geometry could not be made curve-free
    NotLinearizable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InvalidGeometry(err) => write!(f, "invalid geometry: {}", err),
            SkipReason::NotLinearizable => f.write_str("could not linearize geometry"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedFeature {
    /// Position of the feature in the input
    pub index: usize,
    pub id: Value,
    pub reason: SkipReason,
}

/// Counts for one batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub total: usize,
    pub written: usize,
    pub without_geometry: usize,
    pub skipped: Vec<SkippedFeature>,
    pub cancelled: bool,
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} features written, {} skipped, {} without geometry",
            self.written,
            self.total,
            self.skipped.len(),
            self.without_geometry
        )?;
        if self.cancelled {
            f.write_str(" (cancelled)")?;
        }
        Ok(())
    }
}

pub struct BatchOutput {
    pub features: Vec<Feature>,
    pub report: BatchReport,
}

enum Outcome {
    Written(Feature),
    WithoutGeometry,
    Skipped(SkippedFeature),
    Cancelled,
}

fn process_feature(index: usize, feature: Feature, linearizer: &Linearizer, byte_order: WkbByteOrder) -> Outcome {
    let Some(wkb) = feature.geometry.as_deref() else {
        return Outcome::WithoutGeometry;
    };

    let geometry = match read_wkb(wkb) {
        Ok(geometry) => geometry,
        Err(err) => {
            return Outcome::Skipped(SkippedFeature {
                index,
                id: feature.id,
                reason: SkipReason::InvalidGeometry(err.to_string()),
            })
        }
    };

    match linearizer.linearize(Some(&geometry)) {
        Some(linear) => Outcome::Written(Feature {
            geometry: Some(write_wkb(&linear, byte_order)),
            ..feature
        }),
        None => Outcome::Skipped(SkippedFeature {
            index,
            id: feature.id,
            reason: SkipReason::NotLinearizable,
        }),
    }
}

/// Linearize the geometry of every feature, keeping attributes untouched
pub fn linearize_features(features: Vec<Feature>, linearizer: &Linearizer, options: &BatchOptions) -> BatchOutput {
    let total = features.len();
    let processed = AtomicUsize::new(0);

    let run = |(index, feature): (usize, Feature)| {
        if options.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Outcome::Cancelled;
        }
        let outcome = process_feature(index, feature, linearizer, options.byte_order);
        let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(progress) = options.progress {
            progress(done, total);
        }
        outcome
    };

    let outcomes: Vec<Outcome> = if options.parallel {
        features.into_par_iter().enumerate().map(run).collect()
    } else {
        features.into_iter().enumerate().map(run).collect()
    };

    let mut report = BatchReport { total, ..BatchReport::default() };
    let mut written = Vec::with_capacity(total);
    for outcome in outcomes {
        match outcome {
            Outcome::Written(feature) => written.push(feature),
            Outcome::WithoutGeometry => report.without_geometry += 1,
            Outcome::Skipped(skipped) => {
                tracing::warn!("Skipping feature {} - {}", id_label(&skipped.id), skipped.reason);
                report.skipped.push(skipped);
            }
            Outcome::Cancelled => report.cancelled = true,
        }
    }
    report.written = written.len();
    tracing::info!("{}", report);

    BatchOutput { features: written, report }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Coord, Dimension, Geometry, GeometryKind};

    fn arc_wkb() -> Vec<u8> {
        Geometry::circular_string(
            Dimension::Xy,
            vec![Coord::xy(0.0, 0.0), Coord::xy(1.0, 1.0), Coord::xy(2.0, 0.0)],
        )
        .to_wkb()
    }

    #[test]
    fn test_skips_without_aborting() {
        let malformed = Geometry::circular_string(Dimension::Xy, vec![Coord::xy(0.0, 0.0), Coord::xy(1.0, 1.0)]).to_wkb();
        let features = vec![
            Feature::new(1, Some(arc_wkb())).with_property("name", "first"),
            Feature::new(2, None),
            Feature::new(3, Some(vec![1, 99, 0])),
            Feature::new(4, Some(malformed)),
            Feature::new(5, Some(arc_wkb())),
        ];

        let output = linearize_features(features, &Linearizer::new(0.1).unwrap(), &BatchOptions::default());
        let report = &output.report;
        assert_eq!(report.total, 5);
        assert_eq!(report.written, 2);
        assert_eq!(report.without_geometry, 1);
        assert_eq!(report.skipped.len(), 2);
        assert!(matches!(report.skipped[0].reason, SkipReason::InvalidGeometry(_)));
        assert_eq!(report.skipped[1].reason, SkipReason::NotLinearizable);
        assert_eq!(report.skipped[1].index, 3);

        let ids: Vec<_> = output.features.iter().map(|f| f.id.clone()).collect();
        assert_eq!(ids, vec![Value::from(1), Value::from(5)]);
        assert_eq!(output.features[0].properties["name"], "first");

        let geometry = read_wkb(output.features[0].geometry.as_ref().unwrap()).unwrap();
        assert_eq!(geometry.kind(), GeometryKind::LineString);
    }

    #[test]
    fn test_cancelled_batch_writes_nothing() {
        let cancel = AtomicBool::new(true);
        let options = BatchOptions { cancel: Some(&cancel), ..BatchOptions::default() };
        let output = linearize_features(vec![Feature::new(1, Some(arc_wkb()))], &Linearizer::default(), &options);
        assert!(output.report.cancelled);
        assert!(output.features.is_empty());
    }

    #[test]
    fn test_progress_reaches_total() {
        let last = AtomicUsize::new(0);
        let record = |done: usize, total: usize| {
            assert_eq!(total, 3);
            last.fetch_max(done, Ordering::Relaxed);
        };
        let options = BatchOptions { parallel: false, progress: Some(&record), ..BatchOptions::default() };
        let features = (0..3).map(|i| Feature::new(i, Some(arc_wkb()))).collect();
        linearize_features(features, &Linearizer::default(), &options);
        assert_eq!(last.load(Ordering::Relaxed), 3);
    }
}
