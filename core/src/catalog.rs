//! Tier names, damage multipliers, and the cue sheet.

use thiserror::Error;

use reforge_config::{SfxConfig, TiersConfig};
use reforge_types::{FeedbackCue, MAX_TIER, Tier};

const TIER_COUNT: usize = MAX_TIER as usize + 1;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("expected {expected} tier {what}, found {found}")]
    WrongLength {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("damage multiplier at tier 0 must be 1.0, found {0}")]
    BaseMultiplier(f64),
    #[error("damage multiplier at tier {tier} ({value}) is below the previous tier")]
    Decreasing { tier: usize, value: f64 },
}

/// Per-tier presentation and combat metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct TierCatalog {
    names: [String; TIER_COUNT],
    multipliers: [f64; TIER_COUNT],
}

impl TierCatalog {
    pub fn new(names: Vec<String>, multipliers: Vec<f64>) -> Result<Self, CatalogError> {
        let names: [String; TIER_COUNT] =
            names
                .try_into()
                .map_err(|names: Vec<String>| CatalogError::WrongLength {
                    what: "names",
                    expected: TIER_COUNT,
                    found: names.len(),
                })?;
        let multipliers: [f64; TIER_COUNT] =
            multipliers
                .try_into()
                .map_err(|m: Vec<f64>| CatalogError::WrongLength {
                    what: "damage multipliers",
                    expected: TIER_COUNT,
                    found: m.len(),
                })?;

        if (multipliers[0] - 1.0).abs() > f64::EPSILON {
            return Err(CatalogError::BaseMultiplier(multipliers[0]));
        }
        for (tier, pair) in multipliers.windows(2).enumerate() {
            if pair[1].is_nan() || pair[1] < pair[0] {
                return Err(CatalogError::Decreasing {
                    tier: tier + 1,
                    value: pair[1],
                });
            }
        }
        Ok(Self { names, multipliers })
    }

    pub fn from_config(config: &TiersConfig) -> Result<Self, CatalogError> {
        Self::new(config.names.clone(), config.damage_multipliers.clone())
    }

    /// Display name; empty at tier 0.
    #[must_use]
    pub fn display(&self, tier: Tier) -> &str {
        &self.names[tier.index()]
    }

    #[must_use]
    pub fn damage_multiplier(&self, tier: Tier) -> f64 {
        self.multipliers[tier.index()]
    }

    /// Bonus over base damage in whole percent, e.g. 25 for 1.25.
    #[must_use]
    pub fn damage_bonus_percent(&self, tier: Tier) -> i64 {
        ((self.damage_multiplier(tier) - 1.0) * 100.0).round() as i64
    }

    /// `[+N] Name base` for upgraded tiers, the bare base name at tier 0.
    ///
    /// Any label this catalog produced earlier is stripped from `base` first,
    /// so relabeling an already labeled item does not stack prefixes.
    #[must_use]
    pub fn label(&self, tier: Tier, base: &str) -> String {
        let base = self.strip_label(base);
        if tier.is_base() {
            return base.to_string();
        }
        match self.display(tier) {
            "" => format!("[{tier}] {base}"),
            name => format!("[{tier}] {name} {base}"),
        }
    }

    fn strip_label<'a>(&self, label: &'a str) -> &'a str {
        let mut rest = label;
        if let Some(after) = rest.strip_prefix("[+")
            && let Some((digits, tail)) = after.split_once("] ")
            && !digits.is_empty()
            && digits.bytes().all(|b| b.is_ascii_digit())
        {
            rest = tail;
        }
        for name in self.names.iter().filter(|n| !n.is_empty()) {
            if let Some(tail) = rest
                .strip_prefix(name.as_str())
                .and_then(|t| t.strip_prefix(' '))
            {
                return tail;
            }
        }
        rest
    }

    /// `[++ ]`: one `+` per tier reached, padded to the maximum.
    #[must_use]
    pub fn progress_bar(tier: Tier) -> String {
        let filled = tier.index();
        format!(
            "[{}{}]",
            "+".repeat(filled),
            " ".repeat(Tier::MAX.index() - filled)
        )
    }
}

impl Default for TierCatalog {
    fn default() -> Self {
        let defaults = TiersConfig::default();
        Self {
            names: [0, 1, 2, 3].map(|i| defaults.names[i].clone()),
            multipliers: [1.0, 1.10, 1.15, 1.25],
        }
    }
}

/// Sound id played for each feedback cue.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CueSheet {
    sfx: SfxConfig,
}

impl CueSheet {
    #[must_use]
    pub fn new(sfx: SfxConfig) -> Self {
        Self { sfx }
    }

    /// `None` when the cue is disabled (empty id).
    #[must_use]
    pub fn sound(&self, cue: FeedbackCue) -> Option<&str> {
        let id = match cue {
            FeedbackCue::Start => &self.sfx.start,
            FeedbackCue::Degrade => &self.sfx.fail,
            FeedbackCue::Same => &self.sfx.no_change,
            FeedbackCue::Upgrade => &self.sfx.success,
            FeedbackCue::Jackpot => &self.sfx.jackpot,
            FeedbackCue::Destroy => &self.sfx.shatter,
        };
        (!id.is_empty()).then_some(id.as_str())
    }
}
