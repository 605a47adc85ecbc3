use crate::Tier;

/// Bucket selected by an outcome roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Degrade,
    Same,
    Upgrade,
    Jackpot,
}

impl OutcomeKind {
    /// Draw order used when walking the cumulative distribution.
    pub const ORDER: [OutcomeKind; 4] = [
        OutcomeKind::Degrade,
        OutcomeKind::Same,
        OutcomeKind::Upgrade,
        OutcomeKind::Jackpot,
    ];

    #[must_use]
    pub const fn delta(self) -> i8 {
        match self {
            Self::Degrade => -1,
            Self::Same => 0,
            Self::Upgrade => 1,
            Self::Jackpot => 2,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Degrade => "degrade",
            Self::Same => "same",
            Self::Upgrade => "upgrade",
            Self::Jackpot => "jackpot",
        }
    }

    #[must_use]
    pub const fn cue(self) -> FeedbackCue {
        match self {
            Self::Degrade => FeedbackCue::Degrade,
            Self::Same => FeedbackCue::Same,
            Self::Upgrade => FeedbackCue::Upgrade,
            Self::Jackpot => FeedbackCue::Jackpot,
        }
    }
}

/// A resolved transition: the bucket drawn plus the clamped tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub kind: OutcomeKind,
    pub from: Tier,
    pub to: Tier,
}

impl Outcome {
    #[must_use]
    pub fn new(kind: OutcomeKind, from: Tier) -> Self {
        Self {
            kind,
            from,
            to: from.shifted(kind.delta()),
        }
    }

    #[must_use]
    pub const fn delta(&self) -> i8 {
        self.kind.delta()
    }
}

/// Decision returned by the outcome engine for the caller to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollResult {
    /// The destruction roll succeeded; no outcome roll was made.
    Destroyed { from: Tier },
    Transition(Outcome),
}

impl RollResult {
    #[must_use]
    pub fn cue(&self) -> FeedbackCue {
        match self {
            Self::Destroyed { .. } => FeedbackCue::Destroy,
            Self::Transition(outcome) => outcome.kind.cue(),
        }
    }

    /// Tier after applying the decision; `None` when the item is gone.
    #[must_use]
    pub fn resulting_tier(&self) -> Option<Tier> {
        match self {
            Self::Destroyed { .. } => None,
            Self::Transition(outcome) => Some(outcome.to),
        }
    }
}

/// Audio/visual feedback requested from the presentation collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedbackCue {
    Start,
    Degrade,
    Same,
    Upgrade,
    Jackpot,
    Destroy,
}

impl FeedbackCue {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Degrade => "degrade",
            Self::Same => "same",
            Self::Upgrade => "upgrade",
            Self::Jackpot => "jackpot",
            Self::Destroy => "destroy",
        }
    }
}
