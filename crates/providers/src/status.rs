//! Provider status vocabularies and their canonical mapping.
//!
//! All raw status strings live in one table keyed by
//! `(vocabulary, raw)`, so a provider renaming a status is a data edit here
//! rather than a new branch somewhere else.

use forge_core::generation::{Provider, TaskState};

/// A family of providers that report status with the same strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vocabulary {
    /// The shared jobs API (`waiting`, `queuing`, `generating`, `success`, `fail`).
    Jobs,
    /// The record-info API, with mixed-case terminal values.
    Record,
}

impl Vocabulary {
    /// Vocabulary spoken by `provider`.
    pub fn of(provider: Provider) -> Self {
        match provider {
            Provider::NanoBanana | Provider::Seedream | Provider::Imagen => Self::Jobs,
            Provider::GptImage => Self::Record,
        }
    }
}

/// Every known `(vocabulary, raw status) -> canonical state` pair.
const STATUS_TABLE: &[(Vocabulary, &str, TaskState)] = &[
    (Vocabulary::Jobs, "waiting", TaskState::Queued),
    (Vocabulary::Jobs, "queuing", TaskState::Queued),
    (Vocabulary::Jobs, "generating", TaskState::Processing),
    (Vocabulary::Jobs, "success", TaskState::Succeeded),
    (Vocabulary::Jobs, "fail", TaskState::Failed),
    (Vocabulary::Record, "pending", TaskState::Queued),
    (Vocabulary::Record, "processing", TaskState::Processing),
    (Vocabulary::Record, "completed", TaskState::Succeeded),
    (Vocabulary::Record, "SUCCESS", TaskState::Succeeded),
    (Vocabulary::Record, "failed", TaskState::Failed),
    (Vocabulary::Record, "FAILED", TaskState::Failed),
];

/// Look up a raw status without applying the fallback.
pub fn lookup(vocabulary: Vocabulary, raw: &str) -> Option<TaskState> {
    STATUS_TABLE
        .iter()
        .find(|(v, r, _)| *v == vocabulary && *r == raw)
        .map(|(_, _, state)| *state)
}

/// Map a provider's raw status to a canonical state.
///
/// Unrecognized values map to `Queued` so the task keeps being polled. This
/// can hide a new failure status behind an apparently running task, so each
/// occurrence is logged at `warn` for alerting.
pub fn normalize(provider: Provider, raw: &str) -> TaskState {
    match lookup(Vocabulary::of(provider), raw) {
        Some(state) => state,
        None => {
            tracing::warn!(
                provider = %provider,
                raw_status = %raw,
                "Unrecognized provider status, treating as queued",
            );
            TaskState::Queued
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOBS_PROVIDERS: [Provider; 3] = [Provider::NanoBanana, Provider::Seedream, Provider::Imagen];

    #[test]
    fn jobs_vocabulary_maps_per_table() {
        let expected = [
            ("waiting", TaskState::Queued),
            ("queuing", TaskState::Queued),
            ("generating", TaskState::Processing),
            ("success", TaskState::Succeeded),
            ("fail", TaskState::Failed),
        ];
        for provider in JOBS_PROVIDERS {
            for (raw, state) in expected {
                assert_eq!(normalize(provider, raw), state, "{provider} {raw}");
            }
        }
    }

    #[test]
    fn record_vocabulary_maps_per_table() {
        let expected = [
            ("pending", TaskState::Queued),
            ("processing", TaskState::Processing),
            ("completed", TaskState::Succeeded),
            ("SUCCESS", TaskState::Succeeded),
            ("failed", TaskState::Failed),
            ("FAILED", TaskState::Failed),
        ];
        for (raw, state) in expected {
            assert_eq!(normalize(Provider::GptImage, raw), state, "{raw}");
        }
    }

    #[test]
    fn unknown_value_defaults_to_queued() {
        assert_eq!(normalize(Provider::Imagen, "exploded"), TaskState::Queued);
        assert_eq!(normalize(Provider::GptImage, "GENERATING"), TaskState::Queued);
    }

    #[test]
    fn vocabularies_do_not_leak_into_each_other() {
        assert_eq!(lookup(Vocabulary::Jobs, "completed"), None);
        assert_eq!(lookup(Vocabulary::Record, "success"), None);
    }

    #[test]
    fn mapping_is_deterministic() {
        for provider in Provider::ALL {
            for raw in [
                "waiting", "queuing", "generating", "success", "fail", "pending", "processing",
                "completed", "failed", "SUCCESS", "FAILED",
            ] {
                assert_eq!(normalize(provider, raw), normalize(provider, raw));
            }
        }
    }

    #[test]
    fn table_has_no_conflicting_entries() {
        for (i, (v, r, s)) in STATUS_TABLE.iter().enumerate() {
            for (v2, r2, s2) in &STATUS_TABLE[i + 1..] {
                if v == v2 && r == r2 {
                    assert_eq!(s, s2, "conflicting mapping for {r}");
                }
            }
        }
    }
}
