//! Label to column-name normalization.
//!
//! Clinical labels ("Sodium Chloride 0.9%  Flush", "O2 sat/pulseox") become
//! column identifiers of the aligned tables. [`clean_column_name`] is the pure
//! normalization; [`ColumnNamer`] layers collision handling on top of it.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// Maximum identifier length, in characters.
pub const DEFAULT_MAX_NAME_LEN: usize = 50;

static DOSAGE_DECIMALS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\.\d)\d+").expect("static dosage pattern"));
static REPEATED_UNDERSCORES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_{2,}").expect("static underscore pattern"));

/// Normalize a raw label into a column identifier.
///
/// Trims, replaces spaces, slashes and hyphens with underscores, cuts embedded
/// decimal dosages to one digit, collapses repeated underscores and truncates
/// to `max_len` characters. Total and deterministic; distinct labels may map
/// to the same identifier (see [`ColumnNamer`]).
///
/// # Examples
///
/// ```
/// use cts_common::clean_column_name;
///
/// assert_eq!(clean_column_name("Heart Rate", 50), "Heart_Rate");
/// assert_eq!(clean_column_name("Heparin 0.125 mg/hr", 50), "Heparin_0.1_mg_hr");
/// assert_eq!(clean_column_name(" NBP - Systolic ", 50), "NBP_Systolic");
/// ```
pub fn clean_column_name(label: &str, max_len: usize) -> String {
    let replaced: String = label
        .trim()
        .chars()
        .map(|ch| match ch {
            ' ' | '/' | '-' => '_',
            other => other,
        })
        .collect();
    let rounded = DOSAGE_DECIMALS.replace_all(&replaced, "$1");
    let collapsed = REPEATED_UNDERSCORES.replace_all(&rounded, "_");
    collapsed.chars().take(max_len).collect()
}

/// Assigns unique column names to labels within one output table.
///
/// Collision policy: the first label to claim an identifier keeps it; later
/// distinct labels that normalize to the same identifier get `_2`, `_3`, ...
/// appended. Labels that normalize to nothing become `unlabelled`; the
/// alignment projectors never reach this since they drop blank labels as
/// missing. Callers feed labels in sorted order so the assignment does not
/// depend on row order.
#[derive(Debug, Clone)]
pub struct ColumnNamer {
    taken: BTreeSet<String>,
    max_len: usize,
}

impl ColumnNamer {
    /// Create a namer with names that are already used by the table.
    pub fn new<I, S>(reserved: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            taken: reserved.into_iter().map(Into::into).collect(),
            max_len: DEFAULT_MAX_NAME_LEN,
        }
    }

    #[must_use]
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Claim a column name for `label`.
    pub fn assign(&mut self, label: &str) -> String {
        self.assign_with_suffixes(label, &[])
    }

    /// Claim a base name for `label` such that the base and every
    /// `base + suffix` are all unused, and reserve all of them.
    pub fn assign_with_suffixes(&mut self, label: &str, suffixes: &[&str]) -> String {
        let mut base = clean_column_name(label, self.max_len);
        if base.is_empty() {
            base = "unlabelled".to_string();
        }
        let mut candidate = base.clone();
        let mut counter = 1usize;
        while !self.is_free(&candidate, suffixes) {
            counter += 1;
            candidate = format!("{base}_{counter}");
        }
        for suffix in suffixes {
            self.taken.insert(format!("{candidate}{suffix}"));
        }
        self.taken.insert(candidate.clone());
        candidate
    }

    fn is_free(&self, candidate: &str, suffixes: &[&str]) -> bool {
        !self.taken.contains(candidate)
            && suffixes
                .iter()
                .all(|suffix| !self.taken.contains(&format!("{candidate}{suffix}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn replaces_separators_and_collapses() {
        assert_eq!(
            clean_column_name("Arterial BP / Systolic", 50),
            "Arterial_BP_Systolic"
        );
        assert_eq!(clean_column_name("a--b", 50), "a_b");
    }

    #[test]
    fn cuts_dosage_decimals() {
        assert_eq!(
            clean_column_name("Metoprolol 12.55 mg", 50),
            "Metoprolol_12.5_mg"
        );
        assert_eq!(clean_column_name("KCl 20 mEq", 50), "KCl_20_mEq");
    }

    #[test]
    fn truncates_by_characters() {
        let long = "x".repeat(80);
        assert_eq!(clean_column_name(&long, 50).chars().count(), 50);
        assert_eq!(clean_column_name("Glucosé level", 7), "Glucosé");
    }

    #[test]
    fn namer_suffixes_collisions() {
        let mut namer = ColumnNamer::new(["time_point", "hours_from_admission"]);
        assert_eq!(namer.assign("Heart Rate"), "Heart_Rate");
        assert_eq!(namer.assign("Heart-Rate"), "Heart_Rate_2");
        assert_eq!(namer.assign("Heart/Rate"), "Heart_Rate_3");
        assert_eq!(namer.assign("time point"), "time_point_2");
    }

    #[test]
    fn namer_reserves_suffixed_names() {
        let mut namer = ColumnNamer::new(["Glucose_present"]);
        assert_eq!(
            namer.assign_with_suffixes("Glucose", &["_present"]),
            "Glucose_2"
        );
        assert_eq!(namer.assign("Glucose 2 present"), "Glucose_2_present_2");
    }

    #[test]
    fn namer_names_blank_labels() {
        let mut namer = ColumnNamer::new(Vec::<String>::new());
        assert_eq!(namer.assign("   "), "unlabelled");
        assert_eq!(namer.assign(""), "unlabelled_2");
    }

    proptest! {
        #[test]
        fn clean_name_is_bounded_and_separator_free(label in ".{0,120}") {
            let once = clean_column_name(&label, DEFAULT_MAX_NAME_LEN);
            prop_assert!(once.chars().count() <= DEFAULT_MAX_NAME_LEN);
            prop_assert!(!once.contains("__"));
            prop_assert!(!once.contains(' ') && !once.contains('/'));
        }

        #[test]
        fn namer_never_repeats(labels in proptest::collection::vec("[a-c -]{0,4}", 0..20)) {
            let mut namer = ColumnNamer::new(Vec::<String>::new());
            let mut seen = BTreeSet::new();
            for label in &labels {
                prop_assert!(seen.insert(namer.assign(label)));
            }
        }
    }
}
