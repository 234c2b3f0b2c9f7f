use serde::{Deserialize, Serialize};

/// Page geometry, in one consistent linear unit (millimetres by default).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageConfig {
    pub page_width: f64,
    pub page_height: f64,
    pub margin: f64,
    pub image_gap: f64,
}

impl Default for PageConfig {
    /// A4 portrait, 20 mm margin, 10 mm gap between the two images.
    fn default() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            margin: 20.0,
            image_gap: 10.0,
        }
    }
}

impl PageConfig {
    /// Printable width inside the side margins.
    pub fn available_width(&self) -> f64 {
        self.page_width - 2.0 * self.margin
    }

    /// Height of each of the two stacked image slots.
    pub fn slot_height(&self) -> f64 {
        (self.page_height - 2.0 * self.margin - self.image_gap) / 2.0
    }

    /// Reject geometry that leaves no printable area.
    pub fn validate(&self) -> Result<(), LayoutError> {
        let values = [self.page_width, self.page_height, self.margin, self.image_gap];
        if values.iter().any(|v| !v.is_finite())
            || self.margin < 0.0
            || self.image_gap < 0.0
            || self.available_width() <= 0.0
            || self.slot_height() <= 0.0
        {
            return Err(LayoutError::NoPrintableArea {
                page_width: self.page_width,
                page_height: self.page_height,
                margin: self.margin,
                image_gap: self.image_gap,
            });
        }
        Ok(())
    }
}

/// Pixel dimensions of a decoded source image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImageDescriptor {
    pixel_width: u32,
    pixel_height: u32,
    aspect_ratio: f64,
}

impl ImageDescriptor {
    /// Both dimensions must be positive.
    pub fn new(pixel_width: u32, pixel_height: u32) -> Result<Self, LayoutError> {
        if pixel_width == 0 || pixel_height == 0 {
            return Err(LayoutError::InvalidDimensions {
                width: pixel_width,
                height: pixel_height,
            });
        }
        Ok(Self {
            pixel_width,
            pixel_height,
            aspect_ratio: pixel_width as f64 / pixel_height as f64,
        })
    }

    pub fn pixel_width(&self) -> u32 {
        self.pixel_width
    }

    pub fn pixel_height(&self) -> u32 {
        self.pixel_height
    }

    /// width / height
    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }
}

/// Position and size of one image on the page (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Placement {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// How the unified size was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitStrategy {
    /// Full available width; the taller scaled image fits its slot.
    FitWidth,
    /// Full slot height; the wider scaled image fits the available width.
    FitHeight,
    /// Both candidates overflowed; the fit-by-height candidate was shrunk to the width.
    ShrunkToWidth,
    /// Both candidates overflowed; the fit-by-width candidate was shrunk to the slot.
    ShrunkToHeight,
}

/// Placements for the front (top slot) and back (bottom slot) images.
///
/// Both placements always share the same width and height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageLayout {
    pub front: Placement,
    pub back: Placement,
    pub strategy: FitStrategy,
}

impl PageLayout {
    pub fn unified_width(&self) -> f64 {
        self.front.width
    }

    pub fn unified_height(&self) -> f64 {
        self.front.height
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("Invalid image dimensions {width}x{height}: both must be positive")]
    InvalidDimensions { width: u32, height: u32 },

    #[error(
        "Page {page_width}x{page_height} with margin {margin} and gap {image_gap} leaves no printable area"
    )]
    NoPrintableArea {
        page_width: f64,
        page_height: f64,
        margin: f64,
        image_gap: f64,
    },
}
