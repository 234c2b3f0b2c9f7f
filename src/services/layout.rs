//! Two-image page layout.
//!
//! Places a front and a back image in two stacked slots of a fixed page. Both
//! images get the same on-page size, centred in their slot, and never leave
//! the printable area.

use crate::models::layout::{FitStrategy, ImageDescriptor, PageConfig, PageLayout, Placement};

/// Compute congruent placements for a front/back pair.
///
/// Pure and deterministic. Descriptors are valid by construction; the page
/// config is assumed to have passed [`PageConfig::validate`].
pub fn compute_layout(
    front: &ImageDescriptor,
    back: &ImageDescriptor,
    page: &PageConfig,
) -> PageLayout {
    let available_width = page.available_width();
    let slot_height = page.slot_height();
    let front_aspect = front.aspect_ratio();
    let back_aspect = back.aspect_ratio();

    // Candidate A: full width, height of the taller scaled image.
    let width_fit_height = (available_width / front_aspect).max(available_width / back_aspect);
    // Candidate B: full slot height, width of the wider scaled image.
    let height_fit_width = (slot_height * front_aspect).max(slot_height * back_aspect);

    let (width, height, strategy) = if width_fit_height <= slot_height {
        (available_width, width_fit_height, FitStrategy::FitWidth)
    } else if height_fit_width <= available_width {
        (height_fit_width, slot_height, FitStrategy::FitHeight)
    } else {
        let width_scale = available_width / height_fit_width;
        let height_scale = slot_height / width_fit_height;

        // Keep whichever candidate needs the smaller extra shrink.
        if width_scale >= height_scale {
            (available_width, slot_height * width_scale, FitStrategy::ShrunkToWidth)
        } else {
            (available_width * height_scale, slot_height, FitStrategy::ShrunkToHeight)
        }
    };

    let x = page.margin + (available_width - width) / 2.0;
    let slot_padding = (slot_height - height) / 2.0;
    let front_y = page.margin + slot_padding;
    let back_y = page.margin + slot_height + page.image_gap + slot_padding;

    PageLayout {
        front: Placement {
            x,
            y: front_y,
            width,
            height,
        },
        back: Placement {
            x,
            y: back_y,
            width,
            height,
        },
        strategy,
    }
}
