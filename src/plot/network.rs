//! Co-citation network figure.

use super::charts::chart_builder;
use super::{Figure, PlotError, PlotStyle};
use crate::network::CoCitationNetwork;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::f64::consts::TAU;

/// Number of most connected nodes that get a label
const LABELED_NODES: usize = 10;
const NODE_LABEL_SIZE: f64 = 7.0;

/// Renders `network` with nodes on a circle ordered by degree, the most
/// connected node on top.
///
/// Node size grows with degree; edge width and opacity grow with weight.
///
/// # Errors
///
/// Returns `PlotError::NoData` for a network without edges.
pub fn plot_cocitation_network(
    network: &CoCitationNetwork,
    style: &PlotStyle,
) -> Result<Figure, PlotError> {
    if network.edges.is_empty() {
        return Err(PlotError::NoData("co-citation network".to_string()));
    }

    let order = network.nodes_by_degree();
    let mut positions = vec![(0.0, 0.0); network.node_count()];
    for (rank, &node) in order.iter().enumerate() {
        let angle = TAU / 4.0 - TAU * rank as f64 / order.len() as f64;
        positions[node] = (angle.cos(), angle.sin());
    }

    Figure::render(style, |root| {
        let mut chart = chart_builder(root, style, "Co-citation network")
            .build_cartesian_2d(-1.4f64..1.4f64, -1.15f64..1.15f64)?;

        let max_weight = network.edges.iter().map(|e| e.weight).max().unwrap_or(1) as f64;
        let edge_color = style.color(7);
        let mut edges = network.edges.clone();
        edges.sort_by_key(|e| e.weight);
        chart.draw_series(edges.iter().map(|edge| {
            let share = edge.weight as f64 / max_weight;
            let width = style.px(0.5 + 2.5 * share);
            PathElement::new(
                vec![positions[edge.source], positions[edge.target]],
                edge_color.mix(0.2 + 0.8 * share).stroke_width(width),
            )
        }))?;

        let max_degree = network.nodes.iter().map(|n| n.degree).max().unwrap_or(1).max(1) as f64;
        let node_color = style.color(0);
        chart.draw_series(order.iter().rev().map(|&node| {
            let share = network.nodes[node].degree as f64 / max_degree;
            let size = style.px(2.0 + 6.0 * share.sqrt()).max(2);
            Circle::new(positions[node], size, node_color.filled())
        }))?;

        if style.text {
            chart.draw_series(order.iter().take(LABELED_NODES).map(|&node| {
                let (x, y) = positions[node];
                let (offset, side) = if x >= 0.0 {
                    (0.06, HPos::Left)
                } else {
                    (-0.06, HPos::Right)
                };
                Text::new(
                    network.nodes[node].label.clone(),
                    (x + offset, y),
                    style
                        .text_style(NODE_LABEL_SIZE)
                        .pos(Pos::new(side, VPos::Center)),
                )
            }))?;
        }
        Ok(())
    })
}
