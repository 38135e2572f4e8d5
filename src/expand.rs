//! One-hot expansion of categorical device observations.
//!
//! RAID tools report a device state as a single symbolic name and device
//! flags as a whitespace-separated set of names. Dashboards want one 0/1
//! gauge series per possible symbol instead, so a single observed value is
//! expanded over the whole universe of legal symbols.

use crate::metric::{Labels, Metric, MetricDesc};

/// Fixed, ordered set of legal values for one state or flag axis.
/// Defined as compile-time constants, one per device kind and axis.
pub type SymbolUniverse = &'static [&'static str];

/// Expands one observed state over `universe`: one observation per symbol,
/// value 1 where the symbol equals the observed state (ASCII case-insensitive)
/// and 0 elsewhere. The emitted `state` label carries the canonical symbol
/// name, not the captured spelling.
pub fn expand_state(
    desc: &'static MetricDesc,
    base: &Labels,
    universe: SymbolUniverse,
    observed: &str,
) -> Vec<Metric> {
    let observed = observed.trim();
    universe
        .iter()
        .map(|symbol| {
            let mut labels = base.clone();
            labels.insert("state".to_string(), (*symbol).to_string());
            let value = if symbol.eq_ignore_ascii_case(observed) { "1" } else { "0" };
            Metric::new(desc, labels, value)
        })
        .collect()
}

/// Expands an observed flag set over `universe`: one observation per symbol,
/// value 1 where the symbol occurs among the observed tokens. Tokens outside
/// the universe are ignored; they are vendor noise, not errors.
pub fn expand_flags(
    desc: &'static MetricDesc,
    base: &Labels,
    universe: SymbolUniverse,
    observed: &[String],
) -> Vec<Metric> {
    universe
        .iter()
        .map(|symbol| {
            let mut labels = base.clone();
            labels.insert("flag".to_string(), (*symbol).to_string());
            let present = observed
                .iter()
                .any(|token| token.eq_ignore_ascii_case(symbol));
            Metric::new(desc, labels, if present { "1" } else { "0" })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::labels;

    static STATE: MetricDesc = MetricDesc::gauge("dev_state", "device state");
    static FLAG: MetricDesc = MetricDesc::gauge("dev_flag", "device flags");

    const STATES: SymbolUniverse = &["OPTIMAL", "DEGRADED", "FAILED", "UNKNOWN"];
    const FLAGS: SymbolUniverse = &["ENABLED", "QUIESCED", "RESYNC_IN_PROGRESS"];

    fn ones(metrics: &[Metric]) -> Vec<&Metric> {
        metrics.iter().filter(|m| m.value == "1").collect()
    }

    #[test]
    fn test_state_expansion_is_exhaustive_and_exclusive() {
        let base = labels(&[("id", "3")]);
        let metrics = expand_state(&STATE, &base, STATES, " DEGRADED ");

        assert_eq!(metrics.len(), STATES.len());
        let hot = ones(&metrics);
        assert_eq!(hot.len(), 1);
        assert_eq!(hot[0].labels["state"], "DEGRADED");
        // Base labels are carried on every series.
        assert!(metrics.iter().all(|m| m.labels["id"] == "3"));
    }

    #[test]
    fn test_state_matching_ignores_case_but_emits_canonical_symbol() {
        let metrics = expand_state(&STATE, &Labels::new(), STATES, "optimal");
        let hot = ones(&metrics);
        assert_eq!(hot.len(), 1);
        assert_eq!(hot[0].labels["state"], "OPTIMAL");
    }

    #[test]
    fn test_flags_count_matches_recognized_tokens() {
        let observed = vec!["ENABLED".to_string(), "RESYNC_IN_PROGRESS".to_string()];
        let metrics = expand_flags(&FLAG, &Labels::new(), FLAGS, &observed);

        assert_eq!(metrics.len(), FLAGS.len());
        assert_eq!(ones(&metrics).len(), 2);
    }

    #[test]
    fn test_unrecognized_flag_tokens_are_ignored() {
        let observed = vec!["NONE".to_string(), "BOGUS_FLAG".to_string()];
        let metrics = expand_flags(&FLAG, &Labels::new(), FLAGS, &observed);

        assert_eq!(metrics.len(), FLAGS.len());
        assert!(ones(&metrics).is_empty());
        // No extra series appear for the unknown tokens.
        assert!(metrics.iter().all(|m| FLAGS.contains(&m.labels["flag"].as_str())));
    }
}
