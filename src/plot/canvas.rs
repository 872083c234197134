use super::{PlotError, PlotStyle};
use image::RgbImage;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

/// Drawing area over a figure's pixel buffer.
pub(crate) type Root<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// An owned raster figure rendered with a [`PlotStyle`].
pub struct Figure {
    image: RgbImage,
    style: PlotStyle,
}

impl Figure {
    /// A blank figure filled with the theme background.
    pub fn new(style: &PlotStyle) -> Self {
        let (width, height) = style.pixel_size();
        let background = style.theme.background;
        Self {
            image: RgbImage::from_pixel(
                width,
                height,
                image::Rgb([background.0, background.1, background.2]),
            ),
            style: style.clone(),
        }
    }

    /// Renders a figure by running `draw` on a background-filled drawing
    /// area sized from `style`.
    pub(crate) fn render<F>(style: &PlotStyle, draw: F) -> Result<Figure, PlotError>
    where
        F: FnOnce(&Root<'_>) -> Result<(), PlotError>,
    {
        style.validate()?;
        let mut figure = Figure::new(style);
        let size = (figure.image.width(), figure.image.height());
        {
            let root = BitMapBackend::with_buffer(&mut figure.image, size).into_drawing_area();
            draw(&root)?;
            root.present()?;
        }
        Ok(figure)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn style(&self) -> &PlotStyle {
        &self.style
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Writes the figure as a PNG file.
    pub fn save(&self, path: &Path) -> Result<(), PlotError> {
        self.image.save_with_format(path, image::ImageFormat::Png)?;
        Ok(())
    }
}
