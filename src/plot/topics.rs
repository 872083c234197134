//! Topic model figures.

use super::charts::{LABEL_SIZE, TICK_SIZE, TITLE_SIZE, chart_builder};
use super::{Figure, PlotError, PlotStyle};
use crate::topic::{TopicModel, project_2d};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

const MIN_WORD_SIZE: f64 = 7.0;
const MAX_WORD_SIZE: f64 = 16.0;

/// Renders one panel per topic, laid out in `columns` columns, listing the
/// heaviest `words` tokens with font size and bar length proportional to
/// their weight.
///
/// # Errors
///
/// Returns `PlotError::NoData` for a model without topics or vocabulary.
pub fn plot_topic_clouds(
    model: &TopicModel,
    style: &PlotStyle,
    columns: usize,
    words: usize,
) -> Result<Figure, PlotError> {
    let num_topics = model.num_topics();
    if num_topics == 0 || model.topic2token().ncols() == 0 {
        return Err(PlotError::NoData("topic model".to_string()));
    }

    let columns = columns.clamp(1, num_topics);
    let rows = num_topics.div_ceil(columns);
    let words = words.max(1);

    Figure::render(style, |root| {
        let area = if style.text {
            root.titled("Topics", style.text_style(TITLE_SIZE))?
        } else {
            root.clone()
        };
        let panels = area.split_evenly((rows, columns));

        for (topic, panel) in panels.iter().enumerate().take(num_topics) {
            let tokens = model.best_tokens_for_topic(topic, words);
            let Some(max_weight) = tokens.first().map(|(_, w)| *w).filter(|w| *w > 0.0) else {
                continue;
            };

            let title = format!("Topic {}", topic + 1);
            let mut chart = chart_builder(panel, style, &title)
                .build_cartesian_2d(0f64..1f64, (0..words as i32).into_segmented())?;

            // Largest word size that fits a row, in points
            let (_, height) = panel.dim_in_pixel();
            let row_points = height as f64 / words as f64 * 72.0 / style.dpi as f64;
            let color = style.color(topic);
            let row = |rank: usize| (words - 1 - rank) as i32;

            chart.draw_series(tokens.iter().enumerate().map(|(rank, (_, weight))| {
                let share = *weight / max_weight;
                Rectangle::new(
                    [
                        (0.0, SegmentValue::Exact(row(rank))),
                        (share * 0.95, SegmentValue::Exact(row(rank) + 1)),
                    ],
                    color.mix(0.25 + 0.5 * share).filled(),
                )
            }))?;

            if style.text {
                let anchor = Pos::new(HPos::Left, VPos::Center);
                chart.draw_series(tokens.iter().enumerate().map(|(rank, (token, weight))| {
                    let share = *weight / max_weight;
                    let size = (MIN_WORD_SIZE + (MAX_WORD_SIZE - MIN_WORD_SIZE) * share)
                        .min(row_points * 0.9);
                    Text::new(
                        token.to_string(),
                        (0.02, SegmentValue::CenterOf(row(rank))),
                        style.text_style(size).pos(anchor),
                    )
                }))?;
            }
        }
        Ok(())
    })
}

/// Renders a 2D PCA projection of the documents' topic weights, colored by
/// each document's dominant topic.
///
/// # Errors
///
/// Returns `PlotError::NoData` for a model without documents.
pub fn plot_topic_embedding(model: &TopicModel, style: &PlotStyle) -> Result<Figure, PlotError> {
    if model.num_documents() == 0 {
        return Err(PlotError::NoData("topic embedding".to_string()));
    }

    let points = project_2d(model.doc2topic());
    let dominant = model.dominant_topics();
    let bounds = |column: usize| {
        let values = points.column(column);
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let span = if max - min > 1e-12 { max - min } else { 1.0 };
        (min - span * 0.05)..(min + span * 1.05)
    };

    Figure::render(style, |root| {
        let mut builder = chart_builder(root, style, "Documents by topic");
        if style.text {
            builder
                .x_label_area_size(style.px(TICK_SIZE * 2.5 + LABEL_SIZE * 2.0))
                .y_label_area_size(style.px(40.0));
        }
        let mut chart = builder.build_cartesian_2d(bounds(0), bounds(1))?;

        if style.text {
            chart
                .configure_mesh()
                .light_line_style(&style.theme.grid)
                .bold_line_style(&style.theme.grid)
                .label_style(style.text_style(TICK_SIZE))
                .x_desc("Component 1")
                .y_desc("Component 2")
                .axis_desc_style(style.text_style(LABEL_SIZE))
                .draw()?;
        }

        let radius = style.px(3.0).max(2);
        for topic in 0..model.num_topics() {
            let color = style.color(topic);
            let members = points
                .rows()
                .into_iter()
                .zip(&dominant)
                .filter(|(_, t)| **t == topic)
                .map(|(point, _)| Circle::new((point[0], point[1]), radius, color.filled()));
            chart
                .draw_series(members)?
                .label(format!("Topic {}", topic + 1))
                .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
        }

        if style.text {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(&style.theme.background.mix(0.9))
                .border_style(&style.theme.foreground)
                .label_font(style.text_style(LABEL_SIZE))
                .draw()?;
        }
        Ok(())
    })
}
