//! Per-source annual series for a single entity.

use crate::core::RawRecord;
use crate::resolve::NameMapping;
use std::collections::BTreeMap;

/// How several same-year values from one source are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Aggregation {
    /// Add the values (water volumes reported per sector).
    Sum,
    /// Average the values (duplicated temperature or population rows).
    #[default]
    Mean,
}

impl Aggregation {
    /// Combine values independently of their order.
    fn combine(&self, mut values: Vec<f64>) -> f64 {
        values.sort_by(f64::total_cmp);
        let sum: f64 = values.iter().sum();
        match self {
            Aggregation::Sum => sum,
            Aggregation::Mean => sum / values.len() as f64,
        }
    }
}

/// Year -> value map of one variable for one entity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnualSeries {
    values: BTreeMap<i32, f64>,
}

impl AnnualSeries {
    /// Build a series from (year, value) pairs, combining duplicates.
    pub fn from_pairs<I>(pairs: I, aggregation: Aggregation) -> Self
    where
        I: IntoIterator<Item = (i32, f64)>,
    {
        let mut grouped: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
        for (year, value) in pairs {
            grouped.entry(year).or_default().push(value);
        }
        let values = grouped
            .into_iter()
            .map(|(year, vals)| (year, aggregation.combine(vals)))
            .collect();
        Self { values }
    }

    /// Build the series of `entity_id` from raw records.
    ///
    /// A record belongs to the entity when its label, passed through
    /// `mapping` if one is given, equals `entity_id`.
    pub fn from_records<'a, I>(
        records: I,
        entity_id: &str,
        mapping: Option<&NameMapping>,
        aggregation: Aggregation,
    ) -> Self
    where
        I: IntoIterator<Item = &'a RawRecord>,
    {
        let pairs = records
            .into_iter()
            .filter(|r| {
                let label = r.entity_label.as_str();
                match mapping {
                    Some(m) => m.canonical_for(label) == entity_id,
                    None => label == entity_id,
                }
            })
            .map(|r| (r.year, r.value));
        Self::from_pairs(pairs, aggregation)
    }

    pub fn get(&self, year: i32) -> Option<f64> {
        self.values.get(&year).copied()
    }

    /// Iterate over (year, value) in ascending year order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.values.iter().map(|(y, v)| (*y, *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
