use std::ops::RangeInclusive;

use chrono::{DateTime, Duration, Utc};
use egui::{Color32, Ui};
use egui_plot::{AxisHints, GridMark, HPlacement, Legend, Line, Plot, PlotPoints, Polygon};

use tridash::chart::{AxisSide, ChartData};
use tridash::i18n::Locale;
use tridash::model::Dimension;
use tridash::race::{RaceWindow, SegmentColor};

use super::PALETTE_ORANGE;

fn seconds_since(origin: DateTime<Utc>, ts: DateTime<Utc>) -> f64 {
    (ts - origin).num_milliseconds() as f64 / 1000.
}

fn series_color(dimension: Dimension) -> Color32 {
    match dimension {
        Dimension::SkinTemperature => PALETTE_ORANGE,
        Dimension::CoreTemperature => Color32::from_rgb(231, 76, 60),
        Dimension::Wbgt => Color32::from_rgb(241, 196, 15),
        Dimension::HeartRate => Color32::from_rgb(155, 89, 182),
    }
}

fn segment_fill(color: SegmentColor) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r, color.g, color.b, color.a)
}

/// Sensor series over time, with race legs shaded behind them when a window is given.
///
/// egui_plot has a single Y scale, so heart rate is projected onto the temperature axis and a
/// second axis on the right labels it in bpm.
pub(crate) fn sensor_plot(
    ui: &mut Ui,
    id: &str,
    chart: &ChartData,
    window: Option<&RaceWindow>,
    origin: DateTime<Utc>,
    locale: Locale,
) {
    let temperature_axis = chart.temperature_axis.clone();
    let heart_rate_axis = chart.heart_rate_axis.clone();
    let (right_from, right_to) = (temperature_axis.clone(), heart_rate_axis.clone());

    let mut plot = Plot::new(id)
        .legend(Legend::default())
        .show_background(false)
        .x_axis_formatter(move |mark: GridMark, _range: &RangeInclusive<f64>| {
            let ts = origin + Duration::milliseconds((mark.value * 1000.) as i64);
            ts.format("%H:%M").to_string()
        })
        .custom_y_axes(vec![
            AxisHints::new_y().label(temperature_axis.label.clone()),
            AxisHints::new_y()
                .label(heart_rate_axis.label.clone())
                .placement(HPlacement::Right)
                .formatter(move |mark: GridMark, _range: &RangeInclusive<f64>| {
                    format!("{:.0}", right_from.project_onto(&right_to, mark.value))
                }),
        ])
        .include_y(temperature_axis.suggested_min)
        .include_y(temperature_axis.suggested_max);

    if let Some(range) = window.and_then(|w| w.range) {
        plot = plot
            .include_x(seconds_since(origin, range.start))
            .include_x(seconds_since(origin, range.end));
    }

    plot.show(ui, |plot_ui| {
        if let Some(window) = window {
            for segment in &window.segments {
                let (x0, x1) = (
                    seconds_since(origin, segment.start),
                    seconds_since(origin, segment.end),
                );
                let (y0, y1) = (temperature_axis.suggested_min, temperature_axis.suggested_max);
                plot_ui.polygon(
                    Polygon::new(
                        locale.text(segment.kind.label()),
                        PlotPoints::new(vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1]]),
                    )
                    .fill_color(segment_fill(segment.color)),
                );
            }
        }

        for series in &chart.series {
            let mut points = series.plot_points(origin);
            if series.axis == AxisSide::Right {
                for point in points.iter_mut() {
                    point[1] = heart_rate_axis.project_onto(&temperature_axis, point[1]);
                }
            }
            plot_ui.line(
                Line::new(series.label.clone(), PlotPoints::new(points))
                    .color(series_color(series.dimension)),
            );
        }
    });
}
