//! Test fixtures: identity document pairs used by the batch and document tests

#![allow(dead_code)]

/// Holder name the fake provider recognizes on the front side.
pub const HOLDER_NAME: &str = "李四";

/// ID number the fake provider returns alongside the holder name.
pub const HOLDER_ID: &str = "11010519491231002X";

/// One front/back pair, described by pixel sizes of generated images.
#[derive(Debug, Clone)]
pub struct PairFixture {
    pub front: (u32, u32),
    /// `None` models an upload that lost its back image.
    pub back: Option<(u32, u32)>,
    pub file_name: &'static str,
    pub description: &'static str,
}

/// Three pairs where the second one has no back image.
pub const BATCH_FIXTURES: &[PairFixture] = &[
    PairFixture {
        front: (86, 54),
        back: Some((86, 54)),
        file_name: "first",
        description: "Landscape card scan, both sides",
    },
    PairFixture {
        front: (86, 54),
        back: None,
        file_name: "second",
        description: "Front only; the back upload is missing",
    },
    PairFixture {
        front: (40, 60),
        back: Some((80, 60)),
        file_name: "third",
        description: "Mixed orientation pair that needs shrinking",
    },
];
