//! Bar charts: histograms and the word distribution.

use super::canvas::Root;
use super::{Figure, PlotError, PlotStyle};
use crate::stats::{Histogram, HistogramOrder};
use compact_str::CompactString;
use plotters::prelude::*;
use plotters::style::FontTransform;

pub(super) const TITLE_SIZE: f64 = 14.0;
pub(super) const LABEL_SIZE: f64 = 9.0;
pub(super) const TICK_SIZE: f64 = 8.0;
/// Most category labels written under a vertical bar chart
const MAX_VERTICAL_LABELS: usize = 40;

/// Renders a histogram: chronological histograms as vertical bars, ranked
/// ones as horizontal bars with the largest on top. Groups are stacked.
///
/// # Errors
///
/// Returns `PlotError::NoData` for an empty histogram.
pub fn plot_histogram(histogram: &Histogram, style: &PlotStyle) -> Result<Figure, PlotError> {
    if histogram.is_empty() {
        return Err(PlotError::NoData(histogram.title.clone()));
    }

    let chart = BarChart {
        title: &histogram.title,
        labels: &histogram.labels,
        series: &histogram.counts,
        groups: &histogram.groups,
        axis_label: &histogram.field,
        rotate_labels: false,
    };
    Figure::render(style, |root| match histogram.order {
        HistogramOrder::ByYear => chart.draw_vertical(root, style),
        HistogramOrder::ByCount => chart.draw_horizontal(root, style),
    })
}

/// Renders token document frequencies as vertical bars with rotated labels.
///
/// # Errors
///
/// Returns `PlotError::NoData` when `words` is empty.
pub fn plot_word_distribution(
    words: &[(CompactString, usize)],
    style: &PlotStyle,
) -> Result<Figure, PlotError> {
    if words.is_empty() {
        return Err(PlotError::NoData("word distribution".to_string()));
    }

    let labels: Vec<String> = words.iter().map(|(w, _)| w.to_string()).collect();
    let series = vec![words.iter().map(|(_, c)| *c).collect::<Vec<_>>()];
    let chart = BarChart {
        title: "Top words",
        labels: &labels,
        series: &series,
        groups: &[],
        axis_label: "Word",
        rotate_labels: true,
    };
    Figure::render(style, |root| chart.draw_vertical(root, style))
}

/// A chart builder with the figure margin and, when text is enabled, the
/// title.
pub(super) fn chart_builder<'a, 'b>(
    root: &'a Root<'b>,
    style: &PlotStyle,
    title: &str,
) -> ChartBuilder<'a, 'static, BitMapBackend<'b>> {
    let mut builder = ChartBuilder::on(root);
    builder.margin(style.px(10.0));
    if style.text {
        builder.caption(title, style.text_style(TITLE_SIZE));
    }
    builder
}

/// Label of the category at `value`; only bar centers are labeled.
fn category_label(labels: &[String], value: &SegmentValue<i32>) -> String {
    match value {
        SegmentValue::CenterOf(i) => labels.get(*i as usize).cloned().unwrap_or_default(),
        _ => String::new(),
    }
}

struct BarChart<'a> {
    title: &'a str,
    labels: &'a [String],
    /// One series per group, aligned with `labels`
    series: &'a [Vec<usize>],
    groups: &'a [String],
    axis_label: &'a str,
    rotate_labels: bool,
}

impl BarChart<'_> {
    fn value_range(&self) -> f64 {
        let max = (0..self.labels.len())
            .map(|i| {
                self.series
                    .iter()
                    .map(|s| s.get(i).copied().unwrap_or(0))
                    .sum::<usize>()
            })
            .max()
            .unwrap_or(0);
        (max as f64 * 1.1).max(1.0)
    }

    /// Stacked bar segments of one group as `(category, base, top)`.
    fn segments(&self, group: usize) -> Vec<(i32, f64, f64)> {
        (0..self.labels.len())
            .filter_map(|i| {
                let base: usize = self.series[..group]
                    .iter()
                    .map(|s| s.get(i).copied().unwrap_or(0))
                    .sum();
                let count = self.series[group].get(i).copied().unwrap_or(0);
                (count > 0).then_some((i as i32, base as f64, (base + count) as f64))
            })
            .collect()
    }

    fn draw_vertical(&self, root: &Root<'_>, style: &PlotStyle) -> Result<(), PlotError> {
        let n = self.labels.len() as i32;
        let mut builder = chart_builder(root, style, self.title);
        if style.text {
            let ticks = if self.rotate_labels { 8.0 } else { 2.5 };
            builder
                .x_label_area_size(style.px(TICK_SIZE * ticks + LABEL_SIZE * 2.0))
                .y_label_area_size(style.px(40.0));
        }
        let mut chart =
            builder.build_cartesian_2d((0..n).into_segmented(), 0f64..self.value_range())?;

        if style.text {
            let labels = |v: &SegmentValue<i32>| category_label(self.labels, v);
            let counts = |v: &f64| format!("{:.0}", v);
            let mut ticks = style.text_style(TICK_SIZE);
            if self.rotate_labels {
                ticks = ticks.transform(FontTransform::Rotate90);
            }
            chart
                .configure_mesh()
                .disable_x_mesh()
                .light_line_style(&style.theme.grid)
                .bold_line_style(&style.theme.grid)
                .x_labels(self.labels.len().min(MAX_VERTICAL_LABELS))
                .x_label_formatter(&labels)
                .y_label_formatter(&counts)
                .x_label_style(ticks)
                .y_label_style(style.text_style(TICK_SIZE))
                .x_desc(self.axis_label)
                .y_desc("Documents")
                .axis_desc_style(style.text_style(LABEL_SIZE))
                .draw()?;
        }

        let gap = style.px(2.0);
        for group in 0..self.series.len() {
            let color = style.color(group);
            let bars = self.segments(group).into_iter().map(|(i, base, top)| {
                let mut bar = Rectangle::new(
                    [
                        (SegmentValue::Exact(i), base),
                        (SegmentValue::Exact(i + 1), top),
                    ],
                    color.filled(),
                );
                bar.set_margin(0, 0, gap, gap);
                bar
            });
            let series = chart.draw_series(bars)?;
            if let Some(name) = self.groups.get(group) {
                series.label(name.clone()).legend(move |(x, y)| {
                    Rectangle::new([(x - 5, y - 5), (x + 5, y + 5)], color.filled())
                });
            }
        }

        if style.text && !self.groups.is_empty() {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(&style.theme.background.mix(0.9))
                .border_style(&style.theme.foreground)
                .label_font(style.text_style(LABEL_SIZE))
                .draw()?;
        }
        Ok(())
    }

    /// Ranked bars, the first label on top.
    fn draw_horizontal(&self, root: &Root<'_>, style: &PlotStyle) -> Result<(), PlotError> {
        let n = self.labels.len() as i32;
        let (width, _) = style.pixel_size();
        let mut builder = chart_builder(root, style, self.title);
        if style.text {
            builder
                .x_label_area_size(style.px(TICK_SIZE * 2.5 + LABEL_SIZE * 2.0))
                .y_label_area_size(width / 3);
        }
        let mut chart =
            builder.build_cartesian_2d(0f64..self.value_range(), (0..n).into_segmented())?;

        // Category i sits at row n - 1 - i
        let row = |i: i32| n - 1 - i;

        if style.text {
            let labels = |v: &SegmentValue<i32>| match v {
                SegmentValue::CenterOf(p) => {
                    category_label(self.labels, &SegmentValue::CenterOf(row(*p)))
                }
                _ => String::new(),
            };
            let counts = |v: &f64| format!("{:.0}", v);
            chart
                .configure_mesh()
                .disable_y_mesh()
                .light_line_style(&style.theme.grid)
                .bold_line_style(&style.theme.grid)
                .y_labels(self.labels.len())
                .y_label_formatter(&labels)
                .x_label_formatter(&counts)
                .label_style(style.text_style(TICK_SIZE))
                .x_desc("Documents")
                .axis_desc_style(style.text_style(LABEL_SIZE))
                .draw()?;
        }

        let gap = style.px(2.0);
        for group in 0..self.series.len() {
            let color = style.color(group);
            let bars = self.segments(group).into_iter().map(|(i, base, top)| {
                let mut bar = Rectangle::new(
                    [
                        (base, SegmentValue::Exact(row(i))),
                        (top, SegmentValue::Exact(row(i) + 1)),
                    ],
                    color.filled(),
                );
                bar.set_margin(gap, gap, 0, 0);
                bar
            });
            let series = chart.draw_series(bars)?;
            if let Some(name) = self.groups.get(group) {
                series.label(name.clone()).legend(move |(x, y)| {
                    Rectangle::new([(x - 5, y - 5), (x + 5, y + 5)], color.filled())
                });
            }
        }

        if style.text && !self.groups.is_empty() {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::LowerRight)
                .background_style(&style.theme.background.mix(0.9))
                .border_style(&style.theme.foreground)
                .label_font(style.text_style(LABEL_SIZE))
                .draw()?;
        }
        Ok(())
    }
}
