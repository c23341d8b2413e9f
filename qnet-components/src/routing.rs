//! Static routes through the network.

use std::fmt;

/// A station on a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hop {
    Input,
    Pipeline,
    InterStage,
    Transfer,
    SegmentedTransfer,
    Output,
    Pacing,
}

impl Hop {
    pub const ALL: [Hop; 7] = [
        Hop::Input,
        Hop::Pipeline,
        Hop::InterStage,
        Hop::Transfer,
        Hop::SegmentedTransfer,
        Hop::Output,
        Hop::Pacing,
    ];

    /// Station name, also the configuration key.
    pub fn label(self) -> &'static str {
        match self {
            Hop::Input => "input",
            Hop::Pipeline => "pipeline",
            Hop::InterStage => "inter_stage",
            Hop::Transfer => "transfer",
            Hop::SegmentedTransfer => "segmented_transfer",
            Hop::Output => "output",
            Hop::Pacing => "pacing",
        }
    }
}

impl fmt::Display for Hop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Standard and Premium users: the whole file in one pass.
pub const WHOLE_FILE_ROUTE: &[Hop] = &[
    Hop::Input,
    Hop::Pipeline,
    Hop::InterStage,
    Hop::Transfer,
    Hop::Output,
];

/// VIP users, once per segment.
pub const SEGMENT_ROUTE: &[Hop] = &[
    Hop::Input,
    Hop::Pipeline,
    Hop::InterStage,
    Hop::SegmentedTransfer,
    Hop::Output,
    Hop::Pacing,
];
