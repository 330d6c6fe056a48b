//! Analytics summary over the event log.

use labtrack_core::time;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::tracker::LabProgress;

/// Aggregate view of a session's analytics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    /// Events recorded
    pub total_events: usize,
    /// Seconds between the first and last event
    pub session_duration: Option<f64>,
    /// Completed steps
    pub steps_completed: usize,
    /// Total steps
    pub total_steps: usize,
    /// Completed percentage
    pub completion_rate: f64,
    /// Mean score of scored completed steps
    pub average_score: Option<f64>,
    /// Attempts over all steps
    pub total_attempts: u64,
    /// Event count per `event_type`
    pub event_types: BTreeMap<String, usize>,
    /// One row per step, in registry order; serialized as a map keyed by step name
    #[serde(with = "by_step_name")]
    pub step_analytics: Vec<StepAnalytics>,
}

/// Per-step breakdown in an [`AnalyticsSummary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepAnalytics {
    /// Step name, the map key when serialized
    #[serde(skip)]
    pub step_name: String,
    /// Whether the step is done
    pub completed: bool,
    /// Attempts recorded
    pub attempts: u32,
    /// Score
    pub score: Option<f64>,
    /// Events naming this step
    pub total_events: usize,
    /// Seconds from first start to completion; only for completed steps with a start time
    pub time_spent: Option<f64>,
}

mod by_step_name {
    use super::StepAnalytics;
    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S: Serializer>(rows: &[StepAnalytics], s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(rows.len()))?;
        for row in rows {
            map.serialize_entry(&row.step_name, row)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<StepAnalytics>, D::Error> {
        struct RowsVisitor;

        impl<'de> Visitor<'de> for RowsVisitor {
            type Value = Vec<StepAnalytics>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of step name to step analytics")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut rows = Vec::new();
                while let Some((step_name, mut row)) =
                    access.next_entry::<String, StepAnalytics>()?
                {
                    row.step_name = step_name;
                    rows.push(row);
                }
                Ok(rows)
            }
        }

        d.deserialize_map(RowsVisitor)
    }
}

impl LabProgress {
    /// Summarize the analytics log, or `None` if nothing was recorded.
    pub fn get_analytics_summary(&self) -> Option<AnalyticsSummary> {
        let first = self.analytics.first()?;
        let last = self.analytics.last()?;

        let mut event_types: BTreeMap<String, usize> = BTreeMap::new();
        for event in &self.analytics {
            *event_types.entry(event.event_type().to_string()).or_default() += 1;
        }

        let step_analytics = self
            .steps
            .iter()
            .map(|(name, state)| {
                let total_events = self
                    .analytics
                    .iter()
                    .filter(|e| e.step_name.as_deref() == Some(name))
                    .count();
                let time_spent = match (self.step_start_times.get(name), state.timestamp) {
                    (Some(start), Some(end)) if state.completed => {
                        Some(time::seconds_between(start, &end))
                    }
                    _ => None,
                };
                StepAnalytics {
                    step_name: name.to_string(),
                    completed: state.completed,
                    attempts: state.attempts,
                    score: state.score,
                    total_events,
                    time_spent,
                }
            })
            .collect();

        Some(AnalyticsSummary {
            total_events: self.analytics.len(),
            session_duration: Some(time::seconds_between(&first.timestamp, &last.timestamp)),
            steps_completed: self.steps.completed_count(),
            total_steps: self.steps.len(),
            completion_rate: self.completion_rate(),
            average_score: self.average_score(),
            total_attempts: self.steps.total_attempts(),
            event_types,
            step_analytics,
        })
    }
}
