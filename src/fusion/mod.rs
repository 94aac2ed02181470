//! Temporal join of per-entity annual series from several sources.
//!
//! Temperature is the anchor: a year appears in the fused output only when
//! water and population also have a finite value for it.

mod series;

pub use series::{Aggregation, AnnualSeries};

use crate::config::PipelineConfig;
use crate::core::{FusedRecord, NumericPolicy, RawRecord, SourceTag, WaterKind};
use crate::resolve::NameMapping;
use tracing::{debug, trace};

/// Raw input records grouped by source.
#[derive(Debug, Clone, Default)]
pub struct RawDatasets {
    pub temperature: Vec<RawRecord>,
    /// Water records of both kinds; the run selects one.
    pub water: Vec<RawRecord>,
    pub population: Vec<RawRecord>,
    /// Canonical labels to align raw labels against. Empty means labels
    /// are taken as already canonical.
    pub canonical_labels: Vec<String>,
}

impl RawDatasets {
    pub fn new(
        temperature: Vec<RawRecord>,
        water: Vec<RawRecord>,
        population: Vec<RawRecord>,
    ) -> Self {
        Self {
            temperature,
            water,
            population,
            canonical_labels: Vec::new(),
        }
    }

    /// Split a flat record list by source tag.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = RawRecord>,
    {
        let mut datasets = Self::default();
        for record in records {
            datasets.push(record);
        }
        datasets
    }

    /// Route one record to the dataset matching its source tag.
    pub fn push(&mut self, record: RawRecord) {
        match record.source {
            SourceTag::Temperature => self.temperature.push(record),
            SourceTag::Population => self.population.push(record),
            SourceTag::Usage | SourceTag::Resource => self.water.push(record),
        }
    }

    /// Parse a textual value under `policy` and route the record.
    ///
    /// Returns `false` when the policy rejects the value and nothing was
    /// added.
    pub fn push_parsed(
        &mut self,
        entity_label: &str,
        year: i32,
        raw_value: &str,
        source: SourceTag,
        policy: NumericPolicy,
    ) -> bool {
        match RawRecord::parse(entity_label, year, raw_value, source, policy) {
            Some(record) => {
                self.push(record);
                true
            }
            None => {
                trace!(entity_label, year, raw_value, %source, "value rejected");
                false
            }
        }
    }

    /// Parse and route one text value under the run's configured
    /// [`NumericPolicy`].
    pub fn push_text(
        &mut self,
        entity_label: &str,
        year: i32,
        raw_value: &str,
        source: SourceTag,
        config: &PipelineConfig,
    ) -> bool {
        self.push_parsed(entity_label, year, raw_value, source, config.numeric_policy)
    }

    /// Set the canonical labels used for name resolution.
    pub fn with_canonical_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.canonical_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Whether labels must be aligned before fusion.
    pub fn needs_alignment(&self) -> bool {
        !self.canonical_labels.is_empty()
    }

    /// Distinct raw labels across all sources, in first-seen order.
    pub fn raw_labels(&self) -> Vec<&str> {
        let mut seen = std::collections::HashSet::new();
        self.temperature
            .iter()
            .chain(&self.water)
            .chain(&self.population)
            .map(|r| r.entity_label.as_str())
            .filter(|label| seen.insert(*label))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.temperature.is_empty() && self.water.is_empty() && self.population.is_empty()
    }
}

/// The three annual series of one entity, ready to fuse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntitySeries {
    pub temperature: AnnualSeries,
    pub water: AnnualSeries,
    pub population: AnnualSeries,
}

/// Joins per-source series into [`FusedRecord`]s.
#[derive(Debug, Clone, Default)]
pub struct DatasetFuser {
    water_kind: WaterKind,
}

impl DatasetFuser {
    pub fn new(water_kind: WaterKind) -> Self {
        Self { water_kind }
    }

    pub fn water_kind(&self) -> WaterKind {
        self.water_kind
    }

    /// Extract the entity's series from raw datasets.
    ///
    /// Water records of the selected kind are summed per year; duplicated
    /// temperature or population years are averaged.
    pub fn collect(
        &self,
        entity_id: &str,
        datasets: &RawDatasets,
        mapping: Option<&NameMapping>,
    ) -> EntitySeries {
        let water_tag = self.water_kind.tag();
        let series = EntitySeries {
            temperature: AnnualSeries::from_records(
                datasets
                    .temperature
                    .iter()
                    .filter(|r| r.source == SourceTag::Temperature),
                entity_id,
                mapping,
                Aggregation::Mean,
            ),
            water: AnnualSeries::from_records(
                datasets.water.iter().filter(|r| r.source == water_tag),
                entity_id,
                mapping,
                Aggregation::Sum,
            ),
            population: AnnualSeries::from_records(
                datasets
                    .population
                    .iter()
                    .filter(|r| r.source == SourceTag::Population),
                entity_id,
                mapping,
                Aggregation::Mean,
            ),
        };
        debug!(
            entity_id,
            temperature_years = series.temperature.len(),
            water_years = series.water.len(),
            population_years = series.population.len(),
            "collected entity series"
        );
        series
    }

    /// Join three series on year, anchored on temperature.
    ///
    /// The output is ascending by year and may contain gaps. Zero
    /// overlapping years yields an empty vector.
    pub fn fuse(
        entity_id: &str,
        temperature: &AnnualSeries,
        water: &AnnualSeries,
        population: &AnnualSeries,
    ) -> Vec<FusedRecord> {
        temperature
            .iter()
            .filter_map(|(year, temp)| {
                let water = water.get(year)?;
                let pop = population.get(year)?;
                if !(temp.is_finite() && water.is_finite() && pop.is_finite()) {
                    return None;
                }
                Some(FusedRecord {
                    entity_id: entity_id.to_string(),
                    year,
                    temperature: temp,
                    water,
                    population: pop,
                })
            })
            .collect()
    }

    /// Collect and fuse in one step.
    pub fn fuse_datasets(
        &self,
        entity_id: &str,
        datasets: &RawDatasets,
        mapping: Option<&NameMapping>,
    ) -> Vec<FusedRecord> {
        let series = self.collect(entity_id, datasets, mapping);
        let fused = Self::fuse(
            entity_id,
            &series.temperature,
            &series.water,
            &series.population,
        );
        debug!(entity_id, fused_years = fused.len(), "fused entity series");
        fused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::{rngs::StdRng, SeedableRng};

    fn rec(label: &str, year: i32, value: f64, source: SourceTag) -> RawRecord {
        RawRecord::new(label, year, value, source)
    }

    fn chad_datasets() -> RawDatasets {
        let temperature = (1990..2000)
            .map(|y| rec("Chad", y, 27.0 + (y - 1990) as f64 * 0.1, SourceTag::Temperature))
            .collect();
        let water = (1992..2002)
            .flat_map(|y| {
                vec![
                    rec("Chad", y, 100.0 + y as f64, SourceTag::Usage),
                    rec("Chad", y, 5.0, SourceTag::Usage),
                    rec("Chad", y, 9000.0, SourceTag::Resource),
                ]
            })
            .collect();
        let population = (1985..1998)
            .filter(|y| *y != 1995)
            .map(|y| rec("Chad", y, 1e6 + y as f64, SourceTag::Population))
            .collect();
        RawDatasets::new(temperature, water, population)
    }

    #[test]
    fn fuses_only_years_present_in_all_sources() {
        let fused = DatasetFuser::default().fuse_datasets("Chad", &chad_datasets(), None);
        let years: Vec<i32> = fused.iter().map(|r| r.year).collect();
        // temperature 1990..2000, water 1992..2002, population 1985..1998 minus 1995
        assert_eq!(years, vec![1992, 1993, 1994, 1996, 1997]);
        assert!(fused.windows(2).all(|w| w[0].year < w[1].year));
    }

    #[test]
    fn water_of_selected_kind_is_summed() {
        let fused =
            DatasetFuser::new(WaterKind::Usage).fuse_datasets("Chad", &chad_datasets(), None);
        assert_eq!(fused[0].water, 100.0 + 1992.0 + 5.0);

        let fused =
            DatasetFuser::new(WaterKind::Resource).fuse_datasets("Chad", &chad_datasets(), None);
        assert_eq!(fused[0].water, 9000.0);
    }

    #[test]
    fn zero_overlap_yields_empty_output() {
        let temperature = AnnualSeries::from_pairs(vec![(2000, 1.0)], Aggregation::Mean);
        let water = AnnualSeries::from_pairs(vec![(2001, 1.0)], Aggregation::Sum);
        let population = AnnualSeries::from_pairs(vec![(2000, 1.0)], Aggregation::Mean);
        assert!(DatasetFuser::fuse("X", &temperature, &water, &population).is_empty());
    }

    #[test]
    fn non_finite_values_drop_the_year() {
        let temperature =
            AnnualSeries::from_pairs(vec![(2000, 1.0), (2001, 2.0)], Aggregation::Mean);
        let water =
            AnnualSeries::from_pairs(vec![(2000, f64::NAN), (2001, 3.0)], Aggregation::Sum);
        let population =
            AnnualSeries::from_pairs(vec![(2000, 1.0), (2001, 4.0)], Aggregation::Mean);
        let fused = DatasetFuser::fuse("X", &temperature, &water, &population);
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].year, 2001);
    }

    #[test]
    fn fusion_is_invariant_to_record_order() {
        let original = chad_datasets();
        let expected = DatasetFuser::default().fuse_datasets("Chad", &original, None);

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..5 {
            let mut shuffled = original.clone();
            shuffled.temperature.shuffle(&mut rng);
            shuffled.water.shuffle(&mut rng);
            shuffled.population.shuffle(&mut rng);
            assert_eq!(
                DatasetFuser::default().fuse_datasets("Chad", &shuffled, None),
                expected
            );
        }
    }

    #[test]
    fn from_records_routes_by_tag() {
        let datasets = RawDatasets::from_records(vec![
            rec("A", 2000, 1.0, SourceTag::Temperature),
            rec("A", 2000, 2.0, SourceTag::Usage),
            rec("B", 2000, 3.0, SourceTag::Resource),
            rec("A", 2000, 4.0, SourceTag::Population),
        ]);
        assert_eq!(datasets.temperature.len(), 1);
        assert_eq!(datasets.water.len(), 2);
        assert_eq!(datasets.population.len(), 1);
        assert_eq!(datasets.raw_labels(), vec!["A", "B"]);
        assert!(!datasets.needs_alignment());
    }

    #[test]
    fn mismatched_tags_are_ignored() {
        let datasets = RawDatasets::new(
            vec![rec("A", 2000, 1.0, SourceTag::Population)],
            vec![rec("A", 2000, 2.0, SourceTag::Usage)],
            vec![rec("A", 2000, 4.0, SourceTag::Population)],
        );
        assert!(DatasetFuser::default()
            .fuse_datasets("A", &datasets, None)
            .is_empty());
    }

    #[test]
    fn push_parsed_applies_numeric_policy() {
        let mut datasets = RawDatasets::default();
        let substitute = NumericPolicy::default();
        let reject = NumericPolicy::Reject;
        assert!(datasets.push_parsed("A", 2000, "n/a", SourceTag::Usage, substitute));
        assert!(!datasets.push_parsed("A", 2001, "n/a", SourceTag::Usage, reject));
        assert!(datasets.push_parsed("A", 2001, " 12.5 ", SourceTag::Temperature, reject));

        assert_eq!(datasets.water.len(), 1);
        assert_eq!(datasets.water[0].value, 0.0);
        assert_eq!(datasets.temperature[0].value, 12.5);
    }

    #[test]
    fn push_text_follows_configured_policy() {
        let lenient = PipelineConfig::default();
        let strict = PipelineConfig {
            numeric_policy: NumericPolicy::Reject,
            ..PipelineConfig::default()
        };

        let mut datasets = RawDatasets::default();
        assert!(datasets.push_text("A", 2000, "..", SourceTag::Population, &lenient));
        assert!(!datasets.push_text("A", 2001, "..", SourceTag::Population, &strict));
        assert!(datasets.push_text("A", 2002, "7", SourceTag::Population, &strict));

        let values: Vec<(i32, f64)> =
            datasets.population.iter().map(|r| (r.year, r.value)).collect();
        assert_eq!(values, vec![(2000, 0.0), (2002, 7.0)]);
    }
}
