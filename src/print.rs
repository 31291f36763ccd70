//! Print Layout
//!
//! Places the rasterized card on a physical page for PDF export.

use serde::{Deserialize, Serialize};

pub const MM_PER_INCH: f64 = 25.4;
pub const POINTS_PER_INCH: f64 = 72.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    #[default]
    Landscape,
}

/// Paper size in portrait orientation, millimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PaperSize {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl PaperSize {
    pub const A4: Self = Self { width_mm: 210.0, height_mm: 297.0 };

    pub fn oriented(self, orientation: Orientation) -> (f64, f64) {
        match orientation {
            Orientation::Portrait => (self.width_mm, self.height_mm),
            Orientation::Landscape => (self.height_mm, self.width_mm),
        }
    }
}

pub fn mm_to_points(mm: f64) -> f64 {
    mm / MM_PER_INCH * POINTS_PER_INCH
}

/// Page dimensions and image placement, all in millimetres from the
/// top-left corner of the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrintLayout {
    pub page_width_mm: f64,
    pub page_height_mm: f64,
    pub image_x_mm: f64,
    pub image_y_mm: f64,
    pub image_width_mm: f64,
    pub image_height_mm: f64,
}

impl PrintLayout {
    /// Scale an image of `image_width` x `image_height` (any unit) to the full
    /// page width, keeping its aspect ratio, centred vertically.
    pub fn fit_width(
        paper: PaperSize,
        orientation: Orientation,
        image_width: f64,
        image_height: f64,
    ) -> Result<Self, &'static str> {
        if !(image_width > 0.0 && image_height > 0.0) {
            return Err("Image dimensions must be positive");
        }
        let (page_w, page_h) = paper.oriented(orientation);
        let w = page_w;
        let h = image_height * page_w / image_width;
        if h > page_h {
            return Err("Image is too tall for the page at full width");
        }
        Ok(Self {
            page_width_mm: page_w,
            page_height_mm: page_h,
            image_x_mm: 0.0,
            image_y_mm: (page_h - h) / 2.0,
            image_width_mm: w,
            image_height_mm: h,
        })
    }

    /// The export default: A4 landscape.
    pub fn a4_landscape(image_width: f64, image_height: f64) -> Result<Self, &'static str> {
        Self::fit_width(PaperSize::A4, Orientation::Landscape, image_width, image_height)
    }

    pub fn page_points(&self) -> (f64, f64) {
        (mm_to_points(self.page_width_mm), mm_to_points(self.page_height_mm))
    }

    /// Image rectangle in PDF user space (origin bottom-left): `(x, y, w, h)`.
    pub fn image_rect_points(&self) -> (f64, f64, f64, f64) {
        let w = mm_to_points(self.image_width_mm);
        let h = mm_to_points(self.image_height_mm);
        let x = mm_to_points(self.image_x_mm);
        let y = mm_to_points(self.page_height_mm - self.image_y_mm) - h;
        (x, y, w, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn card_fills_a4_width_and_is_centred() {
        let layout = PrintLayout::a4_landscape(643.0, 383.0).unwrap();
        assert_eq!(layout.page_width_mm, 297.0);
        assert_eq!(layout.page_height_mm, 210.0);
        assert!(approx(layout.image_height_mm, 383.0 * 297.0 / 643.0));
        assert!(approx(
            layout.image_y_mm * 2.0 + layout.image_height_mm,
            layout.page_height_mm
        ));
    }

    #[test]
    fn points_conversion() {
        let layout = PrintLayout::a4_landscape(643.0, 383.0).unwrap();
        let (pw, ph) = layout.page_points();
        assert!(approx(pw, 297.0 / 25.4 * 72.0));
        assert!(approx(ph, 210.0 / 25.4 * 72.0));

        let (x, y, w, h) = layout.image_rect_points();
        assert_eq!(x, 0.0);
        assert!(approx(w, pw));
        assert!(approx(y * 2.0 + h, ph));
    }

    #[test]
    fn degenerate_images_are_rejected() {
        assert!(PrintLayout::a4_landscape(0.0, 10.0).is_err());
        assert!(PrintLayout::a4_landscape(10.0, 1000.0).is_err());
    }
}
