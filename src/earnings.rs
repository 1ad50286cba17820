//! Month-to-date earnings estimate.
//!
//! Locally claimed word counts are combined with the portal's metered volume
//! for each quality tier. Each tier's combined count is rounded *up* to one
//! decimal place before its multiplier is applied, and the tier amounts are
//! then summed; rounding after the sum gives different results.

use crate::api::client::{FetchError, PortalApi};
use crate::jobs::JobRecord;
use chrono::{Datelike, NaiveDate};
use futures::future::try_join_all;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// A pay tier: lowercase quality label plus its per-word multiplier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityTier {
    pub label: &'static str,
    pub multiplier: f64,
}

/// Closed tier table. Labels outside it earn nothing.
pub const QUALITY_TIERS: [QualityTier; 2] = [
    QualityTier {
        label: "standard",
        multiplier: 0.787,
    },
    QualityTier {
        label: "high",
        multiplier: 1.036,
    },
];

/// Response of the metered volume endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MeteredVolume {
    #[serde(rename = "processedWords", default, deserialize_with = "number_or_zero")]
    pub processed_words: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TierEarnings {
    pub label: &'static str,
    pub multiplier: f64,
    pub local_words: f64,
    pub metered_words: f64,
    /// `local_words + metered_words`, rounded up to one decimal place.
    pub billable_words: f64,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EarningsEstimate {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub tiers: Vec<TierEarnings>,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EarningsError {
    /// One tier's metering request failed; no partial total is produced.
    PartialMeterFailure { tier: String, source: FetchError },
}

impl fmt::Display for EarningsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EarningsError::PartialMeterFailure { tier, source } => {
                write!(f, "metered volume for tier {tier} unavailable: {source}")
            }
        }
    }
}

impl std::error::Error for EarningsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EarningsError::PartialMeterFailure { source, .. } => Some(source),
        }
    }
}

/// First day of `today`'s month through `today`, inclusive.
pub fn month_to_date(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = today.with_day(1).unwrap_or(today);
    (first, today)
}

/// Ceiling at the tenths digit: `1.01 -> 1.1`, `1.0 -> 1.0`.
pub fn ceil_tenths(value: f64) -> f64 {
    (value * 10.0).ceil() / 10.0
}

/// Sums local word counts per tier, matching quality labels case-insensitively.
pub fn local_word_totals(jobs: &[JobRecord], tiers: &[QualityTier]) -> Vec<f64> {
    tiers
        .iter()
        .map(|tier| {
            jobs.iter()
                .filter(|job| {
                    job.quality_name
                        .as_deref()
                        .is_some_and(|name| name.eq_ignore_ascii_case(tier.label))
                })
                .map(|job| job.word_count)
                .sum()
        })
        .collect()
}

/// Pure combination step: `local` and `metered` are indexed like `tiers`.
pub fn combine(
    tiers: &[QualityTier],
    local: &[f64],
    metered: &[f64],
    from: NaiveDate,
    to: NaiveDate,
) -> EarningsEstimate {
    let tiers: Vec<TierEarnings> = tiers
        .iter()
        .enumerate()
        .map(|(idx, tier)| {
            let local_words = local.get(idx).copied().unwrap_or_default();
            let metered_words = metered.get(idx).copied().unwrap_or_default();
            let billable_words = ceil_tenths(local_words + metered_words);
            TierEarnings {
                label: tier.label,
                multiplier: tier.multiplier,
                local_words,
                metered_words,
                billable_words,
                amount: billable_words * tier.multiplier,
            }
        })
        .collect();

    let total = tiers.iter().map(|tier| tier.amount).sum();

    EarningsEstimate {
        from,
        to,
        tiers,
        total,
    }
}

/// Estimates month-to-date earnings for `jobs` as of `today`.
///
/// One metering request per tier is issued concurrently. If any of them fails
/// the whole estimate fails.
pub async fn estimate(
    api: &dyn PortalApi,
    jobs: &[JobRecord],
    today: NaiveDate,
) -> Result<EarningsEstimate, EarningsError> {
    let (from, to) = month_to_date(today);
    let local = local_word_totals(jobs, &QUALITY_TIERS);

    let metered = try_join_all(QUALITY_TIERS.iter().map(|tier| async move {
        api.metered_volume(from, to, tier.label)
            .await
            .map(|volume| volume.processed_words)
            .map_err(|source| {
                tracing::warn!(tier = tier.label, error = %source, "metered volume fetch failed");
                EarningsError::PartialMeterFailure {
                    tier: tier.label.to_owned(),
                    source,
                }
            })
    }))
    .await?;

    let estimate = combine(&QUALITY_TIERS, &local, &metered, from, to);
    tracing::info!(
        from = %estimate.from,
        to = %estimate.to,
        total = %format!("{:.2}", estimate.total),
        "estimated month-to-date earnings"
    );
    Ok(estimate)
}

fn number_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}
