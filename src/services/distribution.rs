//! Categorical breakdowns for pie and bar charts.
//!
//! Slices are sorted descending by value (ties keep first-seen order) and
//! colored by their position in the sorted output. Top-N truncation drops the
//! tail outright rather than folding it into an "Other" slice, so a truncated
//! chart shows less than the full total.

use std::collections::HashMap;

use crate::models::analytics::{DistributionSlice, PALETTE};
use crate::models::record::Record;

/// What a slice measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceValue<'a> {
    Count,
    Sum(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributionOptions<'a> {
    pub value: SliceValue<'a>,
    /// Label for rows with a missing or blank category. `None` skips such rows.
    pub fallback: Option<&'a str>,
    pub top_n: Option<usize>,
    /// Pie charts hide empty wedges; bar charts and tables keep them.
    pub drop_zero: bool,
}

impl Default for DistributionOptions<'_> {
    fn default() -> Self {
        Self {
            value: SliceValue::Count,
            fallback: None,
            top_n: None,
            drop_zero: false,
        }
    }
}

impl<'a> DistributionOptions<'a> {
    pub fn pie(fallback: &'a str, top_n: usize) -> Self {
        Self {
            fallback: Some(fallback),
            top_n: Some(top_n),
            drop_zero: true,
            ..Self::default()
        }
    }

    pub fn bar(fallback: &'a str, top_n: usize) -> Self {
        Self {
            fallback: Some(fallback),
            top_n: Some(top_n),
            ..Self::default()
        }
    }

    pub fn summing(mut self, field: &'a str) -> Self {
        self.value = SliceValue::Sum(field);
        self
    }
}

/// Group rows by `field` into colored slices.
pub fn build_distribution(
    rows: &[Record],
    field: &str,
    options: &DistributionOptions<'_>,
) -> Vec<DistributionSlice> {
    let mut order: Vec<(String, f64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let Some(name) = row
            .get_category(field)
            .or_else(|| options.fallback.map(str::to_string))
        else {
            continue;
        };
        let value = match options.value {
            SliceValue::Count => 1.0,
            SliceValue::Sum(amount_field) => row.amount(amount_field),
        };
        match index.get(&name) {
            Some(&idx) => order[idx].1 += value,
            None => {
                index.insert(name.clone(), order.len());
                order.push((name, value));
            }
        }
    }

    // Stable sort: equal values stay in first-seen order.
    order.sort_by(|a, b| b.1.total_cmp(&a.1));
    if options.drop_zero {
        order.retain(|(_, value)| *value != 0.0);
    }
    if let Some(n) = options.top_n {
        order.truncate(n);
    }

    order
        .into_iter()
        .enumerate()
        .map(|(position, (name, value))| DistributionSlice {
            name,
            value,
            color: PALETTE[position % PALETTE.len()],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn rows_of(categories: &[(&str, usize)]) -> Vec<Record> {
        categories
            .iter()
            .flat_map(|(name, n)| (0..*n).map(move |_| Record::new().with("kind", *name)))
            .collect()
    }

    #[test]
    fn top_two_drops_tail_without_merging() {
        let rows = rows_of(&[("A", 5), ("B", 5), ("C", 1)]);
        let options = DistributionOptions {
            top_n: Some(2),
            ..DistributionOptions::default()
        };
        let slices = build_distribution(&rows, "kind", &options);
        let pairs: Vec<(&str, f64)> = slices.iter().map(|s| (s.name.as_str(), s.value)).collect();
        assert_eq!(pairs, [("A", 5.0), ("B", 5.0)]);
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let rows = rows_of(&[("B", 2), ("A", 2), ("C", 3)]);
        let slices = build_distribution(&rows, "kind", &DistributionOptions::default());
        let names: Vec<&str> = slices.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["C", "B", "A"]);
    }

    #[test]
    fn colors_follow_sorted_position() {
        let rows = rows_of(&[("small", 1), ("large", 4)]);
        let slices = build_distribution(&rows, "kind", &DistributionOptions::default());
        assert_eq!(slices[0].name, "large");
        assert_eq!(slices[0].color, PALETTE[0]);
        assert_eq!(slices[1].color, PALETTE[1]);
    }

    #[test]
    fn palette_cycles() {
        let rows: Vec<Record> = (0..10)
            .map(|i| Record::new().with("kind", format!("k{i}")))
            .collect();
        let slices = build_distribution(&rows, "kind", &DistributionOptions::default());
        assert_eq!(slices[8].color, PALETTE[0]);
        assert_eq!(slices[9].color, PALETTE[1]);
    }

    #[test]
    fn missing_category_uses_fallback_label() {
        let rows = vec![
            Record::from(json!({"kind": "Mining"})),
            Record::from(json!({"kind": ""})),
            Record::from(json!({"kind": null})),
            Record::from(json!({})),
        ];
        let slices = build_distribution(&rows, "kind", &DistributionOptions::pie("Unspecified", 6));
        assert_eq!(slices[0].name, "Unspecified");
        assert_eq!(slices[0].value, 3.0);

        let skipped = build_distribution(&rows, "kind", &DistributionOptions::default());
        assert_eq!(skipped.len(), 1);
    }

    #[test]
    fn zero_slices_only_dropped_for_pies() {
        let rows = vec![
            Record::from(json!({"method": "card", "amount": 100})),
            Record::from(json!({"method": "cash", "amount": 0})),
        ];
        let pie_options = DistributionOptions::pie("Other", 7).summing("amount");
        let pie = build_distribution(&rows, "method", &pie_options);
        assert_eq!(pie.len(), 1);

        let bar_options = DistributionOptions::bar("Other", 7).summing("amount");
        let bar = build_distribution(&rows, "method", &bar_options);
        assert_eq!(bar.len(), 2);
        assert_eq!(bar[1].value, 0.0);
    }

    fn category_strategy() -> impl Strategy<Value = Option<&'static str>> {
        prop_oneof![
            Just(Some("Mining")),
            Just(Some("Forestry")),
            Just(Some("Fisheries")),
            Just(Some("")),
            Just(None),
        ]
    }

    proptest! {
        #[test]
        fn untruncated_mass_equals_categorized_rows(
            cats in prop::collection::vec(category_strategy(), 0..64)
        ) {
            let rows: Vec<Record> = cats
                .iter()
                .map(|c| match c {
                    Some(c) => Record::new().with("kind", *c),
                    None => Record::new(),
                })
                .collect();
            let categorized = rows.iter().filter(|r| r.get_category("kind").is_some()).count();
            let slices = build_distribution(&rows, "kind", &DistributionOptions::default());
            let mass: f64 = slices.iter().map(|s| s.value).sum();
            prop_assert_eq!(mass, categorized as f64);
        }

        #[test]
        fn output_is_sorted_and_deterministic(
            cats in prop::collection::vec(category_strategy(), 0..64)
        ) {
            let rows: Vec<Record> = cats
                .iter()
                .flatten()
                .map(|c| Record::new().with("kind", *c))
                .collect();
            let options = DistributionOptions::bar("Unspecified", 2);
            let first = build_distribution(&rows, "kind", &options);
            prop_assert_eq!(&first, &build_distribution(&rows, "kind", &options));
            prop_assert!(first.len() <= 2);
            for pair in first.windows(2) {
                prop_assert!(pair[0].value >= pair[1].value);
            }
        }
    }
}
