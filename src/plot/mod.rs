//! Raster figures and the policy routing them to disk or to the screen.
//!
//! Charts are drawn with `plotters` on an in-memory bitmap. Every rendering
//! function takes an explicit [`PlotStyle`] and returns an owned [`Figure`].
//! The figure is handed to an [`OutputPolicy`], which either writes it to the
//! output directory or shows it and waits for the user. Dropping the figure
//! releases it.

mod canvas;
mod charts;
mod network;
mod topics;

pub use canvas::Figure;
pub use charts::{plot_histogram, plot_word_distribution};
pub use network::plot_cocitation_network;
pub use topics::{plot_topic_clouds, plot_topic_embedding};

use plotters::drawing::DrawingAreaErrorKind;
use plotters::prelude::*;
use plotters::style::{FontStyle, register_font};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Font family every figure draws its text with.
pub(crate) const FONT_FAMILY: &str = "sans-serif";

/// Fonts tried when no font path is configured.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/Library/Fonts/Arial.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Font registered with `plotters`, once per process
static REGISTERED_FONT: OnceLock<PathBuf> = OnceLock::new();

/// Error types for figure rendering and output
#[derive(Debug, Error)]
pub enum PlotError {
    #[error("Nothing to plot: {0}")]
    NoData(String),

    #[error("Invalid style: {0}")]
    InvalidStyle(String),

    #[error("Drawing error: {0}")]
    Drawing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl<E> From<DrawingAreaErrorKind<E>> for PlotError
where
    E: std::error::Error + Send + Sync,
{
    fn from(error: DrawingAreaErrorKind<E>) -> Self {
        PlotError::Drawing(error.to_string())
    }
}

/// Colors of the non-data elements of a figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub background: RGBColor,
    pub foreground: RGBColor,
    pub grid: RGBColor,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: RGBColor(255, 255, 255),
            foreground: RGBColor(38, 38, 38),
            grid: RGBColor(225, 225, 225),
        }
    }
}

/// Categorical palette (tab10).
pub const PALETTE: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

/// Figure size, resolution and colors shared by all renderings.
#[derive(Debug, Clone, PartialEq)]
pub struct PlotStyle {
    /// Figure width in inches
    pub width: f32,
    /// Figure height in inches
    pub height: f32,
    /// Dots per inch; one point is `dpi / 72` pixels
    pub dpi: u32,
    pub theme: Theme,
    pub palette: Vec<RGBColor>,
    /// Whether a font is registered; without one figures carry no text
    pub text: bool,
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 12.0,
            height: 8.0,
            dpi: 100,
            theme: Theme::default(),
            palette: PALETTE.to_vec(),
            text: false,
        }
    }
}

impl PlotStyle {
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_dpi(mut self, dpi: u32) -> Self {
        self.dpi = dpi;
        self
    }

    /// Enables text, normally with the result of [`load_font`].
    pub fn with_text(mut self, text: bool) -> Self {
        self.text = text;
        self
    }

    /// Canvas size in pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            (self.width * self.dpi as f32).round().max(1.0) as u32,
            (self.height * self.dpi as f32).round().max(1.0) as u32,
        )
    }

    /// Color of the `index`-th series.
    pub fn color(&self, index: usize) -> RGBColor {
        if self.palette.is_empty() {
            return self.theme.foreground;
        }
        self.palette[index % self.palette.len()]
    }

    /// Length of `points` typographic points in pixels.
    pub(crate) fn px(&self, points: f64) -> u32 {
        (points * self.dpi as f64 / 72.0).round().max(1.0) as u32
    }

    pub(crate) fn text_style(&self, points: f64) -> TextStyle<'static> {
        (FONT_FAMILY, self.px(points) as f64)
            .into_font()
            .color(&self.theme.foreground)
    }

    pub(crate) fn validate(&self) -> Result<(), PlotError> {
        if !(self.width > 0.0 && self.height > 0.0) || self.dpi == 0 {
            return Err(PlotError::InvalidStyle(format!(
                "{}x{} inches at {} dpi",
                self.width, self.height, self.dpi
            )));
        }
        Ok(())
    }
}

/// Registers the font at `path`, or the first available system font, as
/// the figure font. Returns whether a font is available.
///
/// The first font registered stays in use for the rest of the process.
/// Logs a warning when no font can be loaded.
pub fn load_font(path: Option<&Path>) -> bool {
    if let Some(registered) = REGISTERED_FONT.get() {
        debug!("Font {} already registered", registered.display());
        return true;
    }

    let candidates: Vec<PathBuf> = match path {
        Some(path) => vec![path.to_path_buf()],
        None => SYSTEM_FONTS.iter().map(PathBuf::from).collect(),
    };

    for candidate in candidates {
        let Ok(bytes) = std::fs::read(&candidate) else {
            continue;
        };
        // plotters keeps registered font data for the process lifetime
        let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
        match register_font(FONT_FAMILY, FontStyle::Normal, bytes) {
            Ok(()) => {
                debug!("Using font {}", candidate.display());
                let _ = REGISTERED_FONT.set(candidate);
                return true;
            }
            Err(_) => warn!("Cannot use font {}: invalid font data", candidate.display()),
        }
    }

    warn!("No usable font found; figures will be drawn without text (use --font)");
    false
}

/// What happened to a figure handed to an [`OutputPolicy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactStatus {
    /// Written to this path
    Saved(PathBuf),
    /// Shown to the user
    Displayed,
    /// The figure could not be written
    SaveFailed(String),
}

/// Where finished figures go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputPolicy {
    /// Write `<dir>/<filename>`
    Save { dir: PathBuf },
    /// Show each figure and wait for Enter
    Display,
}

impl OutputPolicy {
    pub fn is_save(&self) -> bool {
        matches!(self, OutputPolicy::Save { .. })
    }

    /// Routes `figure` to its destination; the figure is released afterwards
    /// in every case.
    pub fn emit(&self, figure: Figure, filename: &str) -> ArtifactStatus {
        match self {
            OutputPolicy::Save { dir } => save(figure, &dir.join(filename)),
            OutputPolicy::Display => display(figure, filename, &mut std::io::stdin().lock()),
        }
    }
}

fn save(figure: Figure, path: &Path) -> ArtifactStatus {
    match figure.save(path) {
        Ok(()) => {
            info!("Saved {}", path.display());
            ArtifactStatus::Saved(path.to_path_buf())
        }
        Err(e) => {
            error!("Failed to save {}: {}", path.display(), e);
            ArtifactStatus::SaveFailed(e.to_string())
        }
    }
}

/// Shows `figure` through a temporary PNG and blocks until a line is read.
fn display(figure: Figure, filename: &str, input: &mut dyn BufRead) -> ArtifactStatus {
    let file = match tempfile::Builder::new()
        .prefix("litreview-")
        .suffix(".png")
        .tempfile()
    {
        Ok(file) => file,
        Err(e) => {
            error!("Cannot create a temporary file for {}: {}", filename, e);
            return ArtifactStatus::SaveFailed(e.to_string());
        }
    };

    if let Err(e) = figure.save(file.path()) {
        error!("Failed to render {}: {}", filename, e);
        return ArtifactStatus::SaveFailed(e.to_string());
    }
    drop(figure);

    info!(
        "Figure {} is at {}; press Enter to continue",
        filename,
        file.path().display()
    );
    let mut line = String::new();
    if let Err(e) = input.read_line(&mut line) {
        warn!("Could not wait for input: {}", e);
    }
    ArtifactStatus::Displayed
}

/// Whether `figure` has at least one pixel of `color`.
#[cfg(test)]
pub(crate) fn contains_color(figure: &Figure, color: RGBColor) -> bool {
    let pixel = image::Rgb([color.0, color.1, color.2]);
    figure.image().pixels().any(|p| *p == pixel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn small_style() -> PlotStyle {
        PlotStyle::default().with_size(2.0, 1.0).with_dpi(50)
    }

    #[test]
    fn test_pixel_size() {
        assert_eq!(PlotStyle::default().with_dpi(300).pixel_size(), (3600, 2400));
        assert_eq!(small_style().pixel_size(), (100, 50));
    }

    #[test]
    fn test_invalid_style() {
        let style = PlotStyle::default().with_dpi(0);
        assert!(matches!(style.validate(), Err(PlotError::InvalidStyle(_))));
    }

    #[test]
    fn test_save_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let policy = OutputPolicy::Save {
            dir: dir.path().to_path_buf(),
        };
        let status = policy.emit(Figure::new(&small_style()), "figure.png");

        let expected = dir.path().join("figure.png");
        assert_eq!(status, ArtifactStatus::Saved(expected.clone()));
        let image = image::open(&expected).unwrap();
        assert_eq!((image.width(), image.height()), (100, 50));
    }

    #[test]
    fn test_save_failure_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let policy = OutputPolicy::Save {
            dir: dir.path().join("missing"),
        };
        let status = policy.emit(Figure::new(&small_style()), "figure.png");
        assert!(matches!(status, ArtifactStatus::SaveFailed(_)));
    }

    #[test]
    fn test_display_waits_for_input() {
        let mut input = Cursor::new("\n");
        let status = display(Figure::new(&small_style()), "figure.png", &mut input);
        assert_eq!(status, ArtifactStatus::Displayed);
        assert_eq!(input.position(), 1);
    }

    #[test]
    fn test_text_size_scales_with_dpi() {
        assert_eq!(PlotStyle::default().with_dpi(72).px(10.0), 10);
        assert_eq!(PlotStyle::default().with_dpi(144).px(10.0), 20);
        assert_eq!(PlotStyle::default().with_dpi(1).px(10.0), 1);
    }
}
