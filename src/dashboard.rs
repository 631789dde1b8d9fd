use std::collections::BTreeMap;

use crate::histogram::{bin_distribution, HistogramBin, Thresholds};
use crate::model::{LabelDistribution, StatsEntry, ValueDistribution};

/// Stat domain: values are floor-binned integers in 0..=100, so the bin
/// domain upper bound is 101.
pub const STAT_UPPER_BOUND: u32 = 101;
pub const STAT_BIN_WIDTH: u32 = 10;

/// Behavioral thresholds mirrored from the simulation: a critter starts
/// resting under 30 energy and is critical under 10; foraging starts at 50
/// hunger (critical 80) and drinking at 40 thirst (critical 75).
pub fn energy_thresholds() -> Thresholds {
    Thresholds::low_is_bad(30.0, 10.0)
}

pub fn hunger_thresholds() -> Thresholds {
    Thresholds::high_is_bad(50.0, 80.0)
}

pub fn thirst_thresholds() -> Thresholds {
    Thresholds::high_is_bad(40.0, 75.0)
}

/// Chart payload variants for the three panel shapes the dashboard draws.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    /// Time series: shared tick labels, one or more named series.
    Series {
        labels: Vec<String>,
        series: Vec<(String, Vec<u64>)>,
    },
    /// Classified histogram bins.
    Bins(Vec<HistogramBin>),
    /// Label -> count breakdown, sorted by descending count.
    Breakdown(Vec<(String, u64)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub title: String,
    pub data: ChartData,
}

/// One chart object per metric family, updated idempotently: a refresh
/// mutates the existing chart's arrays in place rather than destroying and
/// recreating it, and constructs it on first use.
#[derive(Debug, Clone, Default)]
pub struct Dashboard {
    charts: BTreeMap<String, Chart>,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chart(&self, id: &str) -> Option<&Chart> {
        self.charts.get(id)
    }

    pub fn chart_ids(&self) -> impl Iterator<Item = &str> {
        self.charts.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }

    /// Creates the chart on first use, otherwise replaces its payload in
    /// place. The single entry point keeps construction and refresh from
    /// diverging.
    pub fn upsert(&mut self, id: &str, title: &str, data: ChartData) {
        match self.charts.get_mut(id) {
            Some(chart) => {
                chart.data = data;
            }
            None => {
                self.charts.insert(
                    id.to_string(),
                    Chart {
                        title: title.to_string(),
                        data,
                    },
                );
            }
        }
    }

    /// Rebuilds every history-derived chart from a fresh `/api/stats/history`
    /// response. An empty history means "nothing to draw yet": existing
    /// charts are left as they are.
    pub fn apply_history(&mut self, entries: &[StatsEntry]) {
        let Some(latest) = entries.last() else {
            return;
        };

        let labels: Vec<String> = entries.iter().map(|e| e.tick.to_string()).collect();
        self.upsert(
            "population",
            "Population",
            ChartData::Series {
                labels,
                series: vec![
                    (
                        "total".into(),
                        entries.iter().map(|e| e.population).collect(),
                    ),
                    (
                        "herbivores".into(),
                        entries.iter().map(|e| e.herbivore_population).collect(),
                    ),
                    (
                        "carnivores".into(),
                        entries.iter().map(|e| e.carnivore_population).collect(),
                    ),
                ],
            },
        );

        self.upsert_histogram(
            "herbivore_energy",
            "Herbivore energy",
            &latest.herbivore_energy_distribution,
            Some(energy_thresholds()),
        );
        self.upsert_histogram(
            "carnivore_energy",
            "Carnivore energy",
            &latest.carnivore_energy_distribution,
            Some(energy_thresholds()),
        );
        self.upsert_histogram(
            "herbivore_hunger",
            "Herbivore hunger",
            &latest.herbivore_hunger_distribution,
            Some(hunger_thresholds()),
        );
        self.upsert_histogram(
            "carnivore_hunger",
            "Carnivore hunger",
            &latest.carnivore_hunger_distribution,
            Some(hunger_thresholds()),
        );
        self.upsert_histogram(
            "herbivore_thirst",
            "Herbivore thirst",
            &latest.herbivore_thirst_distribution,
            Some(thirst_thresholds()),
        );
        self.upsert_histogram(
            "carnivore_thirst",
            "Carnivore thirst",
            &latest.carnivore_thirst_distribution,
            Some(thirst_thresholds()),
        );
        self.upsert_histogram(
            "herbivore_age",
            "Herbivore age",
            &latest.herbivore_age_distribution,
            None,
        );
        self.upsert_histogram(
            "carnivore_age",
            "Carnivore age",
            &latest.carnivore_age_distribution,
            None,
        );

        self.upsert_breakdown(
            "herbivore_health",
            "Herbivore health",
            &latest.herbivore_health_distribution,
        );
        self.upsert_breakdown(
            "carnivore_health",
            "Carnivore health",
            &latest.carnivore_health_distribution,
        );
        self.upsert_breakdown("goals", "Current goals", &latest.goal_distribution);
    }

    /// Rebuilds the cause-of-death chart; fetched and refreshed on its own
    /// schedule, independent of the history charts.
    pub fn apply_deaths(&mut self, counts: &LabelDistribution) {
        self.upsert_breakdown("deaths", "Causes of death", counts);
    }

    fn upsert_histogram(
        &mut self,
        id: &str,
        title: &str,
        distribution: &ValueDistribution,
        thresholds: Option<Thresholds>,
    ) {
        let bins = bin_distribution(distribution, STAT_BIN_WIDTH, STAT_UPPER_BOUND, thresholds);
        self.upsert(id, title, ChartData::Bins(bins));
    }

    fn upsert_breakdown(&mut self, id: &str, title: &str, counts: &LabelDistribution) {
        let mut rows: Vec<(String, u64)> =
            counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
        rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        self.upsert(id, title, ChartData::Breakdown(rows));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(tick: u64, population: u64) -> StatsEntry {
        StatsEntry {
            tick,
            population,
            herbivore_population: population / 2,
            carnivore_population: population - population / 2,
            herbivore_energy_distribution: [(5, 2), (55, 3)].into_iter().collect(),
            goal_distribution: [("wander".to_string(), population)].into_iter().collect(),
            ..StatsEntry::default()
        }
    }

    #[test]
    fn upsert_constructs_then_mutates_in_place() {
        let mut dashboard = Dashboard::new();
        dashboard.upsert("deaths", "Causes of death", ChartData::Breakdown(vec![]));
        assert_eq!(dashboard.chart_ids().count(), 1);

        dashboard.upsert(
            "deaths",
            "ignored on refresh",
            ChartData::Breakdown(vec![("starvation".into(), 3)]),
        );
        assert_eq!(dashboard.chart_ids().count(), 1);
        let chart = dashboard.chart("deaths").unwrap();
        assert_eq!(chart.title, "Causes of death");
        assert_eq!(
            chart.data,
            ChartData::Breakdown(vec![("starvation".into(), 3)])
        );
    }

    #[test]
    fn history_builds_every_metric_family() {
        let mut dashboard = Dashboard::new();
        dashboard.apply_history(&[entry(1, 10), entry(2, 12)]);
        for id in [
            "population",
            "herbivore_energy",
            "carnivore_energy",
            "herbivore_hunger",
            "carnivore_hunger",
            "herbivore_thirst",
            "carnivore_thirst",
            "herbivore_age",
            "carnivore_age",
            "herbivore_health",
            "carnivore_health",
            "goals",
        ] {
            assert!(dashboard.chart(id).is_some(), "missing chart '{id}'");
        }

        let ChartData::Series { labels, series } = &dashboard.chart("population").unwrap().data
        else {
            panic!("population chart must be a series");
        };
        assert_eq!(labels, &vec!["1".to_string(), "2".to_string()]);
        assert_eq!(series[0].1, vec![10, 12]);
    }

    #[test]
    fn empty_history_leaves_existing_charts_untouched() {
        let mut dashboard = Dashboard::new();
        dashboard.apply_history(&[entry(1, 10)]);
        let before = dashboard.chart("population").cloned();
        dashboard.apply_history(&[]);
        assert_eq!(dashboard.chart("population").cloned(), before);
    }

    #[test]
    fn deaths_refresh_independently() {
        let mut dashboard = Dashboard::new();
        let counts: LabelDistribution = [("predation".to_string(), 4), ("thirst".to_string(), 9)]
            .into_iter()
            .collect();
        dashboard.apply_deaths(&counts);
        let ChartData::Breakdown(rows) = &dashboard.chart("deaths").unwrap().data else {
            panic!("deaths chart must be a breakdown");
        };
        assert_eq!(rows[0], ("thirst".to_string(), 9));
        assert_eq!(rows[1], ("predation".to_string(), 4));
    }
}
