//! Named report views.
//!
//! Each view fixes its grouping and per-indicator reductions in one place,
//! so the report never decides between sum, mean and max at the call site.

use crate::analysis::aggregator::{
    aggregate, AggregateTable, GroupBy, Reduction, ReductionSpec, SortOrder,
};
use crate::analysis::reconcile::{crisis_daily, crisis_profile};
use crate::error::Result;
use crate::models::{Dataset, Indicator};

/// Headcounts and loss summed, hydrological peaks as maxima.
pub fn impact_and_peak_reductions() -> ReductionSpec {
    ReductionSpec::from([
        (Indicator::Deaths, Reduction::Sum),
        (Indicator::Injured, Reduction::Sum),
        (Indicator::Displaced, Reduction::Sum),
        (Indicator::LossMillions, Reduction::Sum),
        (Indicator::RiverHeightM, Reduction::Max),
        (Indicator::Rain24hMm, Reduction::Max),
    ])
}

/// Yearly evolution of impacts.
pub fn annual_view(dataset: &Dataset) -> Result<AggregateTable> {
    aggregate(dataset, GroupBy::Year, &impact_and_peak_reductions())
}

/// Average impact per calendar month, all years folded together.
pub fn seasonal_view(dataset: &Dataset) -> Result<AggregateTable> {
    let reductions = ReductionSpec::from([
        (Indicator::Deaths, Reduction::Mean),
        (Indicator::Injured, Reduction::Mean),
        (Indicator::Displaced, Reduction::Mean),
        (Indicator::LossMillions, Reduction::Mean),
        (Indicator::RiverHeightM, Reduction::Mean),
    ]);
    aggregate(dataset, GroupBy::Month, &reductions)
}

/// Impacts per region, with average hydrological conditions.
pub fn regional_view(dataset: &Dataset) -> Result<AggregateTable> {
    let reductions = ReductionSpec::from([
        (Indicator::Deaths, Reduction::Sum),
        (Indicator::Injured, Reduction::Sum),
        (Indicator::Displaced, Reduction::Sum),
        (Indicator::LossMillions, Reduction::Sum),
        (Indicator::RiverHeightM, Reduction::Mean),
        (Indicator::Rain24hMm, Reduction::Mean),
    ]);
    aggregate(dataset, GroupBy::Region, &reductions)
}

/// Cities ranked by a summed indicator, descending.
pub fn city_view(dataset: &Dataset, rank_by: Indicator) -> Result<AggregateTable> {
    aggregate(dataset, GroupBy::City, &impact_and_peak_reductions())?
        .sorted_by(rank_by, SortOrder::Descending)
}

/// Peak impact per crisis city: injured summed, everything else at its maximum.
pub fn crisis_view(crisis: &Dataset, rank_by: Indicator) -> Result<AggregateTable> {
    let reductions = ReductionSpec::from([
        (Indicator::Injured, Reduction::Sum),
        (Indicator::Displaced, Reduction::Max),
        (Indicator::LossMillions, Reduction::Max),
        (Indicator::RiverHeightM, Reduction::Max),
        (Indicator::Rain24hMm, Reduction::Max),
    ]);
    crisis_profile(crisis, &reductions, rank_by)
}

/// Daily totals over the crisis window. Deaths are included when tracked.
pub fn crisis_daily_view(crisis: &Dataset) -> Result<AggregateTable> {
    let mut reductions = ReductionSpec::from([
        (Indicator::Injured, Reduction::Sum),
        (Indicator::Displaced, Reduction::Sum),
        (Indicator::LossMillions, Reduction::Sum),
    ]);
    if crisis.has_indicator(Indicator::Deaths) {
        reductions.insert(Indicator::Deaths, Reduction::Sum);
    }
    crisis_daily(crisis, &reductions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregator::GroupKey;
    use crate::models::testing::*;
    use crate::models::{DatasetKind, EventRecord, IndicatorValues};

    #[test]
    fn test_annual_view_uses_max_for_peaks() {
        let dataset = primary(vec![
            record("2024-05-01", "A", "R", [1.0, 0.0, 10.0, 1.0, 4.0, 100.0]),
            record("2024-06-01", "B", "R", [1.0, 0.0, 20.0, 1.0, 6.5, 80.0]),
        ]);

        let table = annual_view(&dataset).unwrap();
        let year = GroupKey::Year(2024);

        assert_eq!(table.value(&year, Indicator::Displaced), Some(30.0));
        assert_eq!(table.value(&year, Indicator::RiverHeightM), Some(6.5));
        assert_eq!(table.value(&year, Indicator::Rain24hMm), Some(100.0));
    }

    #[test]
    fn test_city_view_ranks_by_loss() {
        let dataset = primary(vec![
            record("2024-05-01", "Small", "R", [0.0, 0.0, 10.0, 1.0, 1.0, 1.0]),
            record("2024-05-01", "Large", "R", [0.0, 0.0, 10.0, 90.0, 1.0, 1.0]),
            record("2024-06-01", "Small", "R", [0.0, 0.0, 10.0, 2.0, 1.0, 1.0]),
        ]);

        let table = city_view(&dataset, Indicator::LossMillions).unwrap();

        assert_eq!(table.rows()[0].key, GroupKey::Name("Large".to_string()));
        assert_eq!(table.rows()[1].values[3], 3.0);
    }

    #[test]
    fn test_crisis_daily_view_skips_untracked_deaths() {
        let mut values = IndicatorValues::default();
        for indicator in [Indicator::Injured, Indicator::Displaced, Indicator::LossMillions] {
            values.set(indicator, 1.0);
        }
        let dataset = Dataset::new(
            DatasetKind::Crisis,
            "crisis.csv",
            false,
            [Indicator::Injured, Indicator::Displaced, Indicator::LossMillions]
                .into_iter()
                .collect(),
            vec![EventRecord {
                date: date("2024-05-01"),
                city: "Canoas".to_string(),
                region: None,
                values,
            }],
        );

        let table = crisis_daily_view(&dataset).unwrap();

        assert_eq!(table.columns().len(), 3);
        assert!(table.column_index(Indicator::Deaths).is_none());
    }
}
