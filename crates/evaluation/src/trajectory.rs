//! Trajectory error metrics and per-class aggregation

use contracts::{MetricRow, ObstacleClass, Point2, TimestampKey};
use serde::Serialize;

use crate::{rows, EvalError};

/// Errors of one predicted trajectory against its ground truth
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TrajectoryScore {
    /// Mean squared Euclidean distance
    pub msd: f64,
    /// Average displacement error (mean Manhattan distance)
    pub ade: f64,
    /// Final displacement error (Manhattan distance of the most recent pair)
    pub fde: f64,
}

/// Score `predicted` against `ground`, both oldest first.
///
/// # Errors
/// - `EmptyTrajectory` if either is empty
/// - `LengthMismatch` if the lengths differ
pub fn score(predicted: &[Point2], ground: &[Point2]) -> Result<TrajectoryScore, EvalError> {
    let (Some(last_predicted), Some(last_ground)) = (predicted.last(), ground.last()) else {
        return Err(EvalError::EmptyTrajectory);
    };
    if predicted.len() != ground.len() {
        return Err(EvalError::LengthMismatch {
            predicted: predicted.len(),
            ground: ground.len(),
        });
    }

    let n = predicted.len() as f64;
    let (squared, manhattan) = predicted
        .iter()
        .rev()
        .zip(ground.iter().rev())
        .fold((0.0, 0.0), |(sq, l1), (p, g)| {
            (sq + p.squared_distance(g), l1 + p.manhattan_distance(g))
        });

    Ok(TrajectoryScore {
        msd: squared / n,
        ade: manhattan / n,
        fde: last_predicted.manhattan_distance(last_ground),
    })
}

#[derive(Debug, Clone, Copy, Default)]
struct ClassSums {
    msd: f64,
    ade: f64,
    fde: f64,
    count: u64,
}

impl ClassSums {
    fn add(&mut self, score: &TrajectoryScore) {
        self.msd += score.msd;
        self.ade += score.ade;
        self.fde += score.fde;
        self.count += 1;
    }

    fn merge(&self, other: &ClassSums) -> ClassSums {
        ClassSums {
            msd: self.msd + other.msd,
            ade: self.ade + other.ade,
            fde: self.fde + other.fde,
            count: self.count + other.count,
        }
    }

    fn mean(&self) -> Option<TrajectoryScore> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some(TrajectoryScore {
            msd: self.msd / n,
            ade: self.ade / n,
            fde: self.fde / n,
        })
    }
}

/// Running per-class sums of trajectory scores
///
/// Sums persist across reports until [`MetricAggregator::reset`].
#[derive(Debug, Clone)]
pub struct MetricAggregator {
    metric_name: String,
    vehicle: ClassSums,
    person: ClassSums,
}

impl MetricAggregator {
    pub fn new(metric_name: impl Into<String>) -> Self {
        Self {
            metric_name: metric_name.into(),
            vehicle: ClassSums::default(),
            person: ClassSums::default(),
        }
    }

    /// Classify `label` and add `score` to its class
    ///
    /// # Errors
    /// `UnknownClass` for labels outside vehicle / person.
    pub fn record(&mut self, label: &str, score: &TrajectoryScore) -> Result<ObstacleClass, EvalError> {
        let class = ObstacleClass::from_label(label).ok_or_else(|| EvalError::UnknownClass {
            label: label.to_string(),
        })?;
        self.record_class(class, score);
        Ok(class)
    }

    pub fn record_class(&mut self, class: ObstacleClass, score: &TrajectoryScore) {
        self.sums_mut(class).add(score);
    }

    pub fn count(&self, class: ObstacleClass) -> u64 {
        self.sums(class).count
    }

    pub fn total_count(&self) -> u64 {
        self.vehicle.count + self.person.count
    }

    /// Mean score of one class, `None` before any record
    pub fn mean(&self, class: ObstacleClass) -> Option<TrajectoryScore> {
        self.sums(class).mean()
    }

    /// Mean score over all classes
    pub fn overall_mean(&self) -> Option<TrajectoryScore> {
        self.vehicle.merge(&self.person).mean()
    }

    /// Summary rows for `key`; does not clear the sums
    ///
    /// All-class rows (`MSD`, `ADE`, `FDE`) come first, then per class
    /// (`person-MSD`, ..., `vehicle-FDE`). Classes without records are omitted.
    pub fn report(&self, key: &TimestampKey) -> Vec<MetricRow> {
        let mut out = Vec::new();
        if let Some(mean) = self.overall_mean() {
            self.push_rows(&mut out, key, None, &mean);
        }
        for class in [ObstacleClass::Person, ObstacleClass::Vehicle] {
            if let Some(mean) = self.mean(class) {
                self.push_rows(&mut out, key, Some(class), &mean);
            }
        }
        out
    }

    /// Add every sum of `other` into this aggregator
    pub fn merge(&mut self, other: &MetricAggregator) {
        self.vehicle = self.vehicle.merge(&other.vehicle);
        self.person = self.person.merge(&other.person);
    }

    pub fn reset(&mut self) {
        self.vehicle = ClassSums::default();
        self.person = ClassSums::default();
    }

    fn push_rows(
        &self,
        out: &mut Vec<MetricRow>,
        key: &TimestampKey,
        class: Option<ObstacleClass>,
        mean: &TrajectoryScore,
    ) {
        for (name, value) in [("MSD", mean.msd), ("ADE", mean.ade), ("FDE", mean.fde)] {
            let scope = match class {
                Some(class) => format!("{}-{}", class.as_str(), name),
                None => name.to_string(),
            };
            out.push(rows::metric_row(key, &self.metric_name, scope, value));
        }
    }

    fn sums(&self, class: ObstacleClass) -> &ClassSums {
        match class {
            ObstacleClass::Vehicle => &self.vehicle,
            ObstacleClass::Person => &self.person,
        }
    }

    fn sums_mut(&mut self, class: ObstacleClass) -> &mut ClassSums {
        match class {
            ObstacleClass::Vehicle => &mut self.vehicle,
            ObstacleClass::Person => &mut self.person,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(offset_x: f64, offset_y: f64) -> Vec<Point2> {
        (0..5)
            .map(|i| Point2::new(i as f64 + offset_x, 2.0 * i as f64 + offset_y))
            .collect()
    }

    #[test]
    fn test_identical_trajectories() {
        let t = line(0.0, 0.0);
        assert_eq!(score(&t, &t).unwrap(), TrajectoryScore::default());
    }

    #[test]
    fn test_constant_offset() {
        let predicted = line(3.0, -4.0);
        let ground = line(0.0, 0.0);
        let s = score(&predicted, &ground).unwrap();
        assert!((s.msd - 25.0).abs() < 1e-12);
        assert!((s.ade - 7.0).abs() < 1e-12);
        assert!((s.fde - 7.0).abs() < 1e-12);
    }

    #[test]
    fn test_fde_uses_most_recent_point() {
        let ground = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)];
        let predicted = vec![Point2::new(0.0, 0.0), Point2::new(3.0, 0.0)];
        let s = score(&predicted, &ground).unwrap();
        assert_eq!(s.fde, 2.0);
        assert_eq!(s.ade, 1.0);
        assert_eq!(s.msd, 2.0);
    }

    #[test]
    fn test_length_and_empty_errors() {
        assert!(matches!(
            score(&line(0.0, 0.0), &line(0.0, 0.0)[1..]),
            Err(EvalError::LengthMismatch {
                predicted: 5,
                ground: 4
            })
        ));
        assert!(matches!(score(&[], &[]), Err(EvalError::EmptyTrajectory)));
        let origin = [Point2::new(0.0, 0.0)];
        assert!(matches!(score(&[], &origin), Err(EvalError::EmptyTrajectory)));
        assert!(matches!(score(&origin, &[]), Err(EvalError::EmptyTrajectory)));
    }

    #[test]
    fn test_aggregator_classifies_labels() {
        let mut aggregator = MetricAggregator::new("prediction");
        let s = TrajectoryScore {
            msd: 4.0,
            ade: 2.0,
            fde: 1.0,
        };

        assert_eq!(aggregator.record("truck", &s).unwrap(), ObstacleClass::Vehicle);
        assert_eq!(aggregator.record("person", &s).unwrap(), ObstacleClass::Person);
        assert!(matches!(
            aggregator.record("dog", &s),
            Err(EvalError::UnknownClass { .. })
        ));
        assert_eq!(aggregator.count(ObstacleClass::Vehicle), 1);
        assert_eq!(aggregator.total_count(), 2);
    }

    #[test]
    fn test_report_rows() {
        let mut aggregator = MetricAggregator::new("prediction");
        aggregator.record_class(
            ObstacleClass::Person,
            &TrajectoryScore {
                msd: 2.0,
                ade: 1.0,
                fde: 1.0,
            },
        );
        aggregator.record_class(
            ObstacleClass::Person,
            &TrajectoryScore {
                msd: 4.0,
                ade: 3.0,
                fde: 5.0,
            },
        );

        let rows = aggregator.report(&TimestampKey::from_millis(700));
        let scopes: Vec<&str> = rows.iter().map(|r| r.scope.as_str()).collect();
        assert_eq!(
            scopes,
            vec!["MSD", "ADE", "FDE", "person-MSD", "person-ADE", "person-FDE"]
        );
        assert_eq!(rows[0].value, 3.0);
        assert_eq!(rows[5].value, 3.0);
        assert!(rows.iter().all(|r| r.sim_key == 700 && r.metric_name == "prediction"));

        // reporting does not clear
        assert_eq!(aggregator.report(&TimestampKey::from_millis(800)).len(), 6);
        aggregator.reset();
        assert!(aggregator.report(&TimestampKey::from_millis(900)).is_empty());
    }
}
