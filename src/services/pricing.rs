use std::collections::HashSet;

use crate::models::domain::Subject;

pub const BUNDLE_DISCOUNT: f64 = 50.0;

const BUNDLE_SUBJECT_IDS: [i64; 3] = [1, 2, 4];

const BUNDLE_SUBJECT_NAMES: [&str; 3] = [
    "أساسيات تمريض (عملي)",
    "أساسيات تمريض (نظري)",
    "ميكروبيولوجي",
];

#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub total_amount: f64,
    pub discount_applied: bool,
    pub discount_amount: f64,
}

/// Folds Arabic letter variants and whitespace so names compare by meaning.
pub fn normalize_name(name: &str) -> String {
    let folded: String = name
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| *c != 'ـ')
        .map(|c| match c {
            'أ' | 'إ' | 'آ' => 'ا',
            'ى' => 'ي',
            'ة' => 'ه',
            other => other,
        })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn qualifies_for_bundle(subjects: &[Subject]) -> bool {
    let ids: HashSet<i64> = subjects.iter().map(|s| s.id).collect();
    if BUNDLE_SUBJECT_IDS.iter().all(|id| ids.contains(id)) {
        return true;
    }

    let names: HashSet<String> = subjects.iter().map(|s| normalize_name(&s.name)).collect();
    BUNDLE_SUBJECT_NAMES
        .iter()
        .all(|name| names.contains(&normalize_name(name)))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Sum of the selected prices, less the bundle discount when it applies, never below zero.
pub fn quote(subjects: &[Subject]) -> PriceQuote {
    let subtotal: f64 = subjects.iter().map(|s| s.price).sum();
    let discount_applied = qualifies_for_bundle(subjects);
    let discount_amount = if discount_applied { BUNDLE_DISCOUNT } else { 0.0 };

    PriceQuote {
        total_amount: round2((subtotal - discount_amount).max(0.0)),
        discount_applied,
        discount_amount,
    }
}
