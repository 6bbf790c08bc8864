//! Grouping and reduction of parsed observations.
//!
//! This module provides the filtering step that drops unparseable records
//! and the engine that reduces the survivors per time key.

use crate::models::{AggregateTable, Reducer, TimeKey};
use std::collections::BTreeMap;
use tracing::debug;

/// Observations that survived parsing, plus how many did not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Retained {
    pub pairs: Vec<(TimeKey, f64)>,
    pub dropped: usize,
}

/// Drop every observation whose key or measurement failed to parse.
pub fn retain_parsed<I>(observations: I) -> Retained
where
    I: IntoIterator<Item = (Option<TimeKey>, Option<f64>)>,
{
    let mut retained = Retained::default();

    for observation in observations {
        match observation {
            (Some(key), Some(value)) => retained.pairs.push((key, value)),
            _ => retained.dropped += 1,
        }
    }

    retained
}

#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    sum: f64,
    count: usize,
}

impl Accumulator {
    fn finish(self, reducer: Reducer) -> f64 {
        match reducer {
            Reducer::Sum => self.sum,
            Reducer::Mean => self.sum / self.count as f64,
        }
    }
}

/// Reduce already-filtered pairs, one output row per distinct key.
pub fn reduce_by_key<I>(pairs: I, reducer: Reducer, label: impl Into<String>) -> AggregateTable
where
    I: IntoIterator<Item = (TimeKey, f64)>,
{
    let mut groups: BTreeMap<TimeKey, Accumulator> = BTreeMap::new();

    for (key, value) in pairs {
        let acc = groups.entry(key).or_default();
        acc.sum += value;
        acc.count += 1;
    }

    let reduced = groups
        .into_iter()
        .map(|(key, acc)| (key, acc.finish(reducer)))
        .collect();

    AggregateTable::from_map(label, reduced)
}

/// Filter, partition and reduce in one pass.
///
/// Returns the table together with the number of observations dropped.
pub fn aggregate<I>(observations: I, reducer: Reducer, label: impl Into<String>) -> (AggregateTable, Retained)
where
    I: IntoIterator<Item = (Option<TimeKey>, Option<f64>)>,
{
    let label = label.into();
    let retained = retain_parsed(observations);
    let table = reduce_by_key(retained.pairs.iter().copied(), reducer, label.as_str());

    debug!(
        "Aggregated '{}' with {}: {} kept, {} dropped, {} keys",
        label,
        reducer,
        retained.pairs.len(),
        retained.dropped,
        table.len()
    );

    (table, retained)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn year(y: i32) -> Option<TimeKey> {
        Some(TimeKey::Year(y))
    }

    #[test]
    fn test_retain_parsed_drops_failures() {
        let retained = retain_parsed(vec![
            (year(2019), Some(1.0)),
            (None, Some(2.0)),
            (year(2020), None),
            (None, None),
            (year(2020), Some(3.0)),
        ]);
        assert_eq!(retained.dropped, 3);
        assert_eq!(
            retained.pairs,
            vec![(TimeKey::Year(2019), 1.0), (TimeKey::Year(2020), 3.0)]
        );
    }

    #[test]
    fn test_mean_per_year() {
        let (table, _) = aggregate(
            vec![
                (year(2019), Some(10.0)),
                (year(2019), Some(20.0)),
                (year(2020), Some(5.0)),
            ],
            Reducer::Mean,
            "SUM",
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(&TimeKey::Year(2019)), Some(15.0));
        assert_eq!(table.get(&TimeKey::Year(2020)), Some(5.0));
    }

    #[test]
    fn test_failed_measurement_is_not_zero() {
        let (table, retained) = aggregate(
            vec![(year(2019), Some(10.0)), (year(2019), None)],
            Reducer::Mean,
            "SUM",
        );
        assert_eq!(table.get(&TimeKey::Year(2019)), Some(10.0));
        assert_eq!(retained.dropped, 1);
    }

    #[test]
    fn test_sum_preserves_total_and_key_count() {
        let observations = vec![
            (year(2019), Some(1.5)),
            (year(2021), Some(4.0)),
            (year(2019), Some(2.5)),
            (None, Some(100.0)),
            (year(2020), Some(7.0)),
            (year(2021), None),
            (year(2021), Some(0.25)),
        ];
        let (table, retained) = aggregate(observations, Reducer::Sum, "SUM");

        let surviving_total: f64 = retained.pairs.iter().map(|(_, v)| v).sum();
        assert!((table.total() - surviving_total).abs() < 1e-9);

        let mut distinct: Vec<_> = retained.pairs.iter().map(|(k, _)| *k).collect();
        distinct.sort();
        distinct.dedup();
        assert_eq!(table.len(), distinct.len());
    }

    #[test]
    fn test_empty_input_yields_empty_table() {
        let (table, retained) = aggregate(Vec::<(Option<TimeKey>, Option<f64>)>::new(), Reducer::Sum, "SUM");
        assert!(table.is_empty());
        assert_eq!(retained.dropped, 0);
    }

    #[test]
    fn test_month_of_year_pools_years() {
        let observations = vec![
            (Some(TimeKey::MonthOfYear(1)), Some(100.0)),
            (Some(TimeKey::MonthOfYear(1)), Some(300.0)),
            (Some(TimeKey::MonthOfYear(2)), Some(50.0)),
        ];
        let (table, _) = aggregate(observations, Reducer::Mean, "SUM");
        assert_eq!(table.get(&TimeKey::MonthOfYear(1)), Some(200.0));
        assert_eq!(table.rows()[1].key, TimeKey::MonthOfYear(2));
    }
}
