//! Screen-space to PDF page-space mapping.

use inkseal_core::models::{PdfRect, ScreenPlacement};

use super::PdfError;

/// Page box in PDF points, including the lower-left corner of the MediaBox.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub origin_x: f64,
    pub origin_y: f64,
    pub width: f64,
    pub height: f64,
}

impl PageGeometry {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            origin_x: 0.0,
            origin_y: 0.0,
            width,
            height,
        }
    }
}

fn positive(value: f64, what: &str) -> Result<(), PdfError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PdfError::InvalidPlacement(format!(
            "{} must be a positive number",
            what
        )))
    }
}

/// Map a top-left-origin pixel rectangle on the rendered page to a bottom-left-origin
/// rectangle in page points.
///
/// With `scale_x = page.width / rendered_width` and `scale_y = page.height / rendered_height`:
/// `x = px * scale_x`, `y = page.height - py * scale_y - ph * scale_y`,
/// `width = pw * scale_x`, `height = ph * scale_y`, then shifted by the MediaBox origin.
pub fn map_to_page_space(
    screen: &ScreenPlacement,
    page: &PageGeometry,
) -> Result<PdfRect, PdfError> {
    positive(screen.rendered_width, "renderedWidth")?;
    positive(screen.rendered_height, "renderedHeight")?;
    positive(screen.width, "width")?;
    positive(screen.height, "height")?;
    positive(page.width, "page width")?;
    positive(page.height, "page height")?;
    if !(screen.x.is_finite() && screen.y.is_finite()) {
        return Err(PdfError::InvalidPlacement(
            "x and y must be finite numbers".to_string(),
        ));
    }

    // Multiply before dividing so exact inputs stay exact in floating point.
    let to_points_x = |px: f64| px * page.width / screen.rendered_width;
    let to_points_y = |px: f64| px * page.height / screen.rendered_height;

    let width = to_points_x(screen.width);
    let height = to_points_y(screen.height);
    let x = to_points_x(screen.x);
    let y = page.height - to_points_y(screen.y) - height;

    Ok(PdfRect {
        x: page.origin_x + x,
        y: page.origin_y + y,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screen(px: f64, py: f64, pw: f64, ph: f64) -> ScreenPlacement {
        ScreenPlacement {
            rendered_width: 600.0,
            rendered_height: 800.0,
            x: px,
            y: py,
            width: pw,
            height: ph,
        }
    }

    #[test]
    fn test_letter_page_mapping_is_exact() {
        let rect = map_to_page_space(
            &screen(100.0, 100.0, 200.0, 100.0),
            &PageGeometry::new(612.0, 792.0),
        )
        .unwrap();
        assert_eq!(rect.x, 102.0);
        assert_eq!(rect.y, 594.0);
        assert_eq!(rect.width, 204.0);
        assert_eq!(rect.height, 99.0);
    }

    #[test]
    fn test_vertical_axis_is_flipped() {
        let page = PageGeometry::new(600.0, 800.0);
        // Flush with the top edge on screen means the rectangle's top touches page.height.
        let top = map_to_page_space(&screen(0.0, 0.0, 100.0, 50.0), &page).unwrap();
        assert_eq!(top.y + top.height, 800.0);
        // Flush with the bottom edge on screen means y = 0.
        let bottom = map_to_page_space(&screen(0.0, 750.0, 100.0, 50.0), &page).unwrap();
        assert_eq!(bottom.y, 0.0);
    }

    #[test]
    fn test_mediabox_origin_offsets_result() {
        let page = PageGeometry {
            origin_x: 10.0,
            origin_y: 20.0,
            width: 612.0,
            height: 792.0,
        };
        let rect = map_to_page_space(&screen(100.0, 100.0, 200.0, 100.0), &page).unwrap();
        assert_eq!(rect.x, 112.0);
        assert_eq!(rect.y, 614.0);
    }

    #[test]
    fn test_non_positive_dimensions_rejected() {
        let page = PageGeometry::new(612.0, 792.0);
        let mut bad = screen(0.0, 0.0, 200.0, 100.0);
        bad.rendered_width = 0.0;
        assert!(matches!(
            map_to_page_space(&bad, &page),
            Err(PdfError::InvalidPlacement(_))
        ));

        let bad = screen(0.0, 0.0, -1.0, 100.0);
        assert!(map_to_page_space(&bad, &page).is_err());

        let bad = screen(f64::NAN, 0.0, 1.0, 1.0);
        assert!(map_to_page_space(&bad, &page).is_err());
    }
}
