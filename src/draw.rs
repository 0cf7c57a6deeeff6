use crate::figure::{
    BarPanel, ChartArtifact, Dashboard, DonutPanel, Figure, MetricCard, Scale, Status,
    TablePanel, TimelinePanel,
};
use crate::reference::group_thousands;
use crate::style::{ColorRole, Style};
use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontStyle;
use std::f64::consts::{FRAC_PI_2, TAU};

// Layout tuning
const MARGIN: u32 = 15;
const X_LABEL_AREA_SIZE: u32 = 60;
const Y_LABEL_AREA_SIZE: u32 = 80;
const BAR_WIDTH: f64 = 0.6;
/// Angular step used to approximate donut arcs
const ARC_STEP: f64 = 0.04;
/// Average glyph width relative to the font size
const GLYPH_WIDTH: f64 = 0.6;

fn text_style(family: &'static str, size: u32, color: RGBColor, pos: Pos) -> TextStyle<'static> {
    (family, size).into_font().color(&color).pos(pos)
}

fn bold_style(family: &'static str, size: u32, color: RGBColor, pos: Pos) -> TextStyle<'static> {
    (family, size)
        .into_font()
        .style(FontStyle::Bold)
        .color(&color)
        .pos(pos)
}

fn centered() -> Pos {
    Pos::new(HPos::Center, VPos::Center)
}

/// Label for a category axis: only integral positions get the bar's label.
fn category_label<S: AsRef<str>>(labels: &[S], x: f64) -> String {
    let idx = x.round();
    if idx < 0.0 || (x - idx).abs() >= 0.3 {
        return String::new();
    }
    labels
        .get(idx as usize)
        .map(|s| s.as_ref().to_string())
        .unwrap_or_default()
}

fn text_width(text: &str, font_px: u32) -> f64 {
    text.chars().count() as f64 * font_px as f64 * GLYPH_WIDTH
}

/// Shorten `label` to `max_chars`: its first word if that fits, otherwise a
/// prefix ending in '.'.
fn fit_label(label: &str, max_chars: usize) -> String {
    if label.chars().count() <= max_chars {
        return label.to_string();
    }
    if let Some(word) = label.split_whitespace().next() {
        if word.chars().count() <= max_chars {
            return word.to_string();
        }
    }
    let mut short: String = label.chars().take(max_chars.saturating_sub(1).max(1)).collect();
    short.push('.');
    short
}

/// Whether `text` fits along the arc of a wedge at `radius`
fn fits_in_wedge(sweep: f64, radius: f64, text: &str, font_px: u32) -> bool {
    sweep * radius >= text_width(text, font_px)
}

/// Label for a value-axis tick. On log axes only powers of 10 are labeled.
fn axis_tick(scale: &Scale, y: f64) -> String {
    match scale {
        Scale::Linear { .. } => {
            if (y - y.round()).abs() < 1e-9 {
                format!("{:.0}", y)
            } else {
                format!("{:.1}", y)
            }
        }
        Scale::Log { .. } => {
            let exponent = y.round();
            if (y - exponent).abs() > 1e-6 {
                String::new()
            } else if exponent >= 0.0 {
                group_thousands(10f64.powi(exponent as i32).round() as u64)
            } else {
                format!("{}", 10f64.powi(exponent as i32))
            }
        }
    }
}

/// Points of a ring segment between `inner` and `outer` radius, in pixels.
fn ring_segment(center: (f64, f64), inner: f64, outer: f64, start: f64, sweep: f64) -> Vec<(i32, i32)> {
    let steps = ((sweep / ARC_STEP).ceil() as usize).max(2);
    let arc = |radius: f64| {
        (0..=steps).map(move |i| polar(center, radius, start + sweep * i as f64 / steps as f64))
    };

    let mut points: Vec<(i32, i32)> = arc(outer).collect();
    let mut inner_points: Vec<(i32, i32)> = arc(inner).collect();
    inner_points.reverse();
    points.extend(inner_points);
    points
}

fn polar(center: (f64, f64), radius: f64, angle: f64) -> (i32, i32) {
    (
        (center.0 + radius * angle.cos()).round() as i32,
        (center.1 + radius * angle.sin()).round() as i32,
    )
}

/// Draw a complete artifact onto `root`. The caller presents the area.
pub fn draw_artifact<DB>(root: &DrawingArea<DB, Shift>, artifact: &ChartArtifact) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let style = &artifact.style;
    root.fill(&style.color(ColorRole::Background))?;

    let area = match &artifact.title {
        Some(title) => root.titled(
            title,
            bold_style(
                style.font_family(),
                style.fonts.title,
                style.color(ColorRole::Text),
                Pos::new(HPos::Left, VPos::Top),
            ),
        )?,
        None => root.clone(),
    };

    match &artifact.figure {
        Figure::LatencyDistribution(panel) => draw_bar_panel(&area, panel, style)?,
        Figure::TransactionMix { shares, success } => {
            let cells = area.split_evenly((1, 2));
            draw_donut(&cells[0], shares, style)?;
            draw_bar_panel(&cells[1], success, style)?;
        }
        Figure::PlatformComparison {
            trust_premium,
            throughput,
        } => {
            let cells = area.split_evenly((1, 2));
            draw_bar_panel(&cells[0], trust_premium, style)?;
            draw_bar_panel(&cells[1], throughput, style)?;
        }
        Figure::Dashboard(dashboard) => draw_dashboard(&area, dashboard, style)?,
        Figure::Timeline(panel) => draw_timeline(&area, panel, style)?,
    }

    Ok(())
}

fn draw_dashboard<DB>(area: &DrawingArea<DB, Shift>, dashboard: &Dashboard, style: &Style) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (width, height) = area.dim_in_pixel();
    let (top, bottom) = area.split_vertically((height * 2 / 9) as i32);

    for (cell, card) in top.split_evenly((1, 4)).iter().zip(&dashboard.cards) {
        draw_metric_card(cell, card, style)?;
    }

    let (_, bottom_height) = bottom.dim_in_pixel();
    let (upper, lower) = bottom.split_vertically((bottom_height / 2) as i32);

    let panels = upper.split_evenly((1, 3));
    draw_bar_panel(&panels[0], &dashboard.latency, style)?;
    draw_donut(&panels[1], &dashboard.mix, style)?;
    draw_bar_panel(&panels[2], &dashboard.platforms, style)?;

    let (transactions, table) = lower.split_horizontally((width / 3) as i32);
    draw_bar_panel(&transactions, &dashboard.transactions, style)?;
    draw_table(&table, &dashboard.table, style)?;

    Ok(())
}

/// Bar chart with per-bar annotations and optional horizontal reference lines
fn draw_bar_panel<DB>(area: &DrawingArea<DB, Shift>, panel: &BarPanel, style: &Style) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    if panel.bars.is_empty() {
        return Ok(());
    }

    let family = style.font_family();
    let text_color = style.color(ColorRole::Text);
    let num_bars = panel.bars.len();
    let scale = panel.scale;
    let y_range = scale.axis_range();
    let span = y_range.end - y_range.start;

    // Keep category labels inside their slot on narrow panels
    let (width, _) = area.dim_in_pixel();
    let slot = width.saturating_sub(Y_LABEL_AREA_SIZE + 2 * MARGIN) as f64 / num_bars as f64;
    let max_chars = (slot / (style.fonts.tick_label as f64 * GLYPH_WIDTH)).floor() as usize;
    let labels: Vec<String> = panel
        .bars
        .iter()
        .map(|b| fit_label(&b.label, max_chars.max(3)))
        .collect();

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, (family, style.fonts.panel_title))
        .margin(MARGIN)
        .x_label_area_size(X_LABEL_AREA_SIZE)
        .y_label_area_size(Y_LABEL_AREA_SIZE)
        .build_cartesian_2d(-0.5..(num_bars as f64 - 0.5), y_range)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(num_bars)
        .x_label_formatter(&|x| category_label(&labels, *x))
        .y_labels(10)
        .y_label_formatter(&|y| axis_tick(&scale, *y))
        .y_desc(&panel.y_desc)
        .x_desc(&panel.x_desc)
        .label_style((family, style.fonts.tick_label))
        .axis_desc_style((family, style.fonts.axis_label))
        .draw()?;

    let base = scale.base();
    let annotation = text_style(
        family,
        style.fonts.data_label,
        text_color,
        Pos::new(HPos::Center, VPos::Bottom),
    );

    for (idx, bar) in panel.bars.iter().enumerate() {
        let x_center = idx as f64;
        let x_left = x_center - BAR_WIDTH / 2.0;
        let x_right = x_center + BAR_WIDTH / 2.0;
        let top = scale.project(bar.value);
        let outline = if bar.emphasized { 3 } else { 1 };

        chart.draw_series(std::iter::once(Rectangle::new(
            [(x_left, base), (x_right, top)],
            bar.color.filled(),
        )))?;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x_left, base), (x_right, top)],
            text_color.stroke_width(outline),
        )))?;

        chart.draw_series(std::iter::once(Text::new(
            bar.annotation.clone(),
            (x_center, top + span * 0.015),
            annotation.clone(),
        )))?;

        if let Some(note) = &bar.note {
            chart.draw_series(std::iter::once(Text::new(
                note.clone(),
                (x_center, top + span * 0.075),
                bold_style(
                    family,
                    style.fonts.data_label,
                    bar.color,
                    Pos::new(HPos::Center, VPos::Bottom),
                ),
            )))?;
        }
    }

    for line in &panel.reference_lines {
        let y = scale.project(line.value);
        let color = line.color;
        chart
            .draw_series(std::iter::once(PathElement::new(
                vec![(-0.5, y), (num_bars as f64 - 0.5, y)],
                color.stroke_width(2),
            )))?
            .label(line.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    if !panel.reference_lines.is_empty() {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(style.color(ColorRole::Background).mix(0.85))
            .border_style(text_color)
            .label_font((family, style.fonts.legend))
            .draw()?;
    }

    Ok(())
}

fn draw_donut<DB>(area: &DrawingArea<DB, Shift>, panel: &DonutPanel, style: &Style) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let family = style.font_family();
    let text_color = style.color(ColorRole::Text);
    let background = style.color(ColorRole::Background);

    let area = area.titled(
        &panel.title,
        text_style(family, style.fonts.panel_title, text_color, Pos::new(HPos::Left, VPos::Top)),
    )?;

    let total: f64 = panel.wedges.iter().map(|w| w.value).sum();
    if total <= 0.0 {
        return Ok(());
    }

    let font = style.fonts.data_label;
    let (width, height) = area.dim_in_pixel();
    let (w, h) = (width as i32, height as i32);

    // Legend rows under the ring carry every label and percentage
    let row_height = (font as f64 * 1.6).round() as i32;
    let legend_height = row_height * panel.wedges.len() as i32 + 10;
    let ring_height = (h - legend_height).max(h / 2);

    let center = (w as f64 / 2.0, ring_height as f64 / 2.0);
    let radius = (w.min(ring_height) as f64 * 0.42).max(1.0);
    let inner = radius * panel.hole_ratio;
    let mid_radius = (inner + radius) / 2.0;

    // Start at 12 o'clock, clockwise
    let mut start = -FRAC_PI_2;
    for wedge in &panel.wedges {
        let sweep = TAU * wedge.value / total;
        let mid = start + sweep / 2.0;
        let shift = radius * wedge.explode;
        let origin = (center.0 + shift * mid.cos(), center.1 + shift * mid.sin());

        let points = ring_segment(origin, inner, radius, start, sweep);
        let mut outline = points.clone();
        outline.push(points[0]);
        area.draw(&Polygon::new(points, wedge.color.filled()))?;
        area.draw(&PathElement::new(outline, background.stroke_width(2)))?;

        if fits_in_wedge(sweep, mid_radius, &wedge.annotation, font) {
            area.draw(&Text::new(
                wedge.annotation.as_str(),
                polar(origin, mid_radius, mid),
                text_style(family, font, text_color, centered()),
            ))?;
        }

        start += sweep;
    }

    let swatch = (font as i32 / 2).max(4);
    let legend_x = w / 6;
    for (i, wedge) in panel.wedges.iter().enumerate() {
        let y = ring_height + 5 + row_height * i as i32 + row_height / 2;
        area.draw(&Rectangle::new(
            [(legend_x, y - swatch), (legend_x + 2 * swatch, y + swatch)],
            wedge.color.filled(),
        ))?;
        area.draw(&Text::new(
            format!("{}  {}", wedge.label, wedge.annotation),
            (legend_x + 3 * swatch, y),
            text_style(family, font, text_color, Pos::new(HPos::Left, VPos::Center)),
        ))?;
    }

    Ok(())
}

fn draw_metric_card<DB>(area: &DrawingArea<DB, Shift>, card: &MetricCard, style: &Style) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let family = style.font_family();
    let (width, height) = area.dim_in_pixel();
    let (w, h) = (width as i32, height as i32);
    let inset = 10;

    area.draw(&Rectangle::new(
        [(inset, inset), (w - inset, h - inset)],
        card.color.stroke_width(4),
    ))?;
    area.draw(&Text::new(
        card.title.as_str(),
        (w / 2, h / 5),
        bold_style(family, style.fonts.panel_title, style.color(ColorRole::Text), centered()),
    ))?;
    area.draw(&Text::new(
        card.value.as_str(),
        (w / 2, h / 2),
        bold_style(family, style.fonts.card_value, card.color, centered()),
    ))?;
    area.draw(&Text::new(
        card.label.as_str(),
        (w / 2, h * 4 / 5),
        text_style(family, style.fonts.card_label, style.color(ColorRole::Muted), centered()),
    ))?;

    Ok(())
}

fn status_color(style: &Style, status: Status) -> RGBColor {
    match status {
        Status::Ok => style.color(ColorRole::Success),
        Status::Warn => style.color(ColorRole::Warning),
        Status::Bad => style.color(ColorRole::Danger),
    }
}

fn draw_table<DB>(area: &DrawingArea<DB, Shift>, panel: &TablePanel, style: &Style) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let family = style.font_family();
    let text_color = style.color(ColorRole::Text);
    let header_text = style.color(ColorRole::Background);

    let area = area.titled(
        &panel.title,
        text_style(family, style.fonts.panel_title, text_color, Pos::new(HPos::Left, VPos::Top)),
    )?;

    let (width, height) = area.dim_in_pixel();
    let (w, h) = (width as i32, height as i32);
    let row_height = ((h - 20) / (panel.rows.len() as i32 + 1)).clamp(20, 48);
    let (left, right) = (w / 20, w - w / 20);
    let value_x = w * 70 / 100;
    let status_x = w * 85 / 100;
    let font = style.fonts.data_label;

    let left_text = |color| text_style(family, font, color, Pos::new(HPos::Left, VPos::Center));
    let right_text = |color| text_style(family, font, color, Pos::new(HPos::Right, VPos::Center));

    // Header
    area.draw(&Rectangle::new(
        [(left, 0), (right, row_height)],
        style.color(ColorRole::Primary).filled(),
    ))?;
    let header_y = row_height / 2;
    area.draw(&Text::new("Metric", (left + 8, header_y), left_text(header_text)))?;
    area.draw(&Text::new("Value", (value_x, header_y), right_text(header_text)))?;
    area.draw(&Text::new(
        "Status",
        (status_x, header_y),
        text_style(family, font, header_text, centered()),
    ))?;

    let indicator = (row_height / 5).clamp(4, 10);
    for (i, row) in panel.rows.iter().enumerate() {
        let y0 = row_height * (i as i32 + 1);
        let y_mid = y0 + row_height / 2;

        if i % 2 == 1 {
            area.draw(&Rectangle::new(
                [(left, y0), (right, y0 + row_height)],
                style.color(ColorRole::Muted).mix(0.1).filled(),
            ))?;
        }

        area.draw(&Text::new(row.metric.as_str(), (left + 8, y_mid), left_text(text_color)))?;
        area.draw(&Text::new(row.value.as_str(), (value_x, y_mid), right_text(text_color)))?;
        area.draw(&Circle::new(
            (status_x, y_mid),
            indicator,
            status_color(style, row.status).filled(),
        ))?;
    }

    let bottom = row_height * (panel.rows.len() as i32 + 1);
    area.draw(&PathElement::new(
        vec![(left, bottom), (right, bottom)],
        text_color.stroke_width(1),
    ))?;

    Ok(())
}

fn draw_timeline<DB>(area: &DrawingArea<DB, Shift>, panel: &TimelinePanel, style: &Style) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let family = style.font_family();
    let text_color = style.color(ColorRole::Text);

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, (family, style.fonts.title))
        .margin(MARGIN)
        .x_label_area_size(X_LABEL_AREA_SIZE)
        .y_label_area_size(Y_LABEL_AREA_SIZE)
        .build_cartesian_2d(0.0..panel.duration_secs, 0.0..panel.y_max)?;

    chart
        .configure_mesh()
        .x_desc("Time (s)")
        .y_desc("Throughput (TPS)")
        .label_style((family, style.fonts.tick_label))
        .axis_desc_style((family, style.fonts.axis_label))
        .draw()?;

    let shade = style.color(ColorRole::Muted).mix(0.2);
    chart
        .draw_series(std::iter::once(Rectangle::new(
            [(0.0, 0.0), (panel.warmup_secs, panel.y_max)],
            shade.filled(),
        )))?
        .label("Warmup (excluded)")
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], shade.filled()));

    let line_color = style.color(ColorRole::Primary);
    chart
        .draw_series(LineSeries::new(
            panel.points.iter().copied(),
            line_color.stroke_width(2),
        ))?
        .label("Throughput")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], line_color.stroke_width(2)));

    let mean_color = style.color(ColorRole::Danger);
    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![
                (panel.warmup_secs, panel.steady_mean),
                (panel.duration_secs, panel.steady_mean),
            ],
            mean_color.stroke_width(2),
        )))?
        .label(format!("Steady-state mean: {:.1} TPS", panel.steady_mean))
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], mean_color.stroke_width(2)));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(style.color(ColorRole::Background).mix(0.85))
        .border_style(text_color)
        .label_font((family, style.fonts.legend))
        .draw()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::FigureKind;
    use crate::report::Report;
    use crate::reference;
    use crate::render::Renderer;

    fn svg_for(kind: FigureKind) -> String {
        let report = Report::new(
            &reference::benchmark_result().unwrap(),
            reference::platform_comparison().unwrap(),
            Renderer::new(Style::default()),
        );
        let artifact = report.render(kind).unwrap();

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, artifact.size()).into_drawing_area();
            draw_artifact(&root, &artifact).unwrap();
            root.present().unwrap();
        }
        assert!(svg.starts_with("<svg"), "{kind}");
        svg
    }

    fn assert_contains_all(svg: &str, expected: &[&str]) {
        for text in expected {
            assert!(svg.contains(text), "missing {text:?}");
        }
    }

    #[test]
    fn test_draws_latency_distribution() {
        let svg = svg_for(FigureKind::LatencyDistribution);
        assert_contains_all(&svg, &["227ms", "Mean: 117.0ms", "p99.9", "Latency (ms)"]);
    }

    #[test]
    fn test_draws_transaction_mix() {
        let svg = svg_for(FigureKind::TransactionMix);
        assert_contains_all(
            &svg,
            &["44.8%", "STOCK_LEVEL", "ORDER_STATUS", "Overall: 99.89%", "TPC-C Transaction Mix"],
        );
    }

    #[test]
    fn test_draws_platform_comparison() {
        let svg = svg_for(FigureKind::PlatformComparison);
        assert_contains_all(
            &svg,
            &[
                "Preferred",
                "58.5x",
                "GridTokenX",
                "Required: 11 TPS for 10,000 households",
            ],
        );
    }

    #[test]
    fn test_draws_dashboard() {
        let svg = svg_for(FigureKind::BenchmarkSummary);
        assert_contains_all(
            &svg,
            &[
                "2,076",
                "99.89%",
                "Transaction Summary",
                "4,637",
                "Additional Metrics",
                "MVCC Conflicts",
                "Preferred",
            ],
        );
        // Platform names are shortened to fit the narrow panel
        assert!(!svg.contains("Hyperledger Fabric"));
    }

    #[test]
    fn test_draws_timeline() {
        let svg = svg_for(FigureKind::ThroughputTimeline);
        assert_contains_all(
            &svg,
            &["Steady-state mean", "Warmup (excluded)", "Throughput (TPS)"],
        );
    }

    #[test]
    fn test_fit_label() {
        assert_eq!(fit_label("GridTokenX", 12), "GridTokenX");
        assert_eq!(fit_label("Hyperledger Fabric", 12), "Hyperledger");
        assert_eq!(fit_label("Hyperledger Fabric", 6), "Hyper.");
        assert_eq!(fit_label("PostgreSQL", 1), "P.");
    }

    #[test]
    fn test_small_wedges_skip_inner_label() {
        assert!(fits_in_wedge(TAU * 0.448, 100.0, "44.8%", 12));
        assert!(!fits_in_wedge(TAU * 0.038, 100.0, "3.8%", 12));
    }

    #[test]
    fn test_category_label() {
        let labels = ["Min", "p50", "Max"];
        assert_eq!(category_label(&labels, 0.0), "Min");
        assert_eq!(category_label(&labels, 2.1), "Max");
        assert_eq!(category_label(&labels, 0.5), "");
        assert_eq!(category_label(&labels, -0.4), "");
        assert_eq!(category_label(&labels, 3.0), "");
    }

    #[test]
    fn test_log_ticks_only_on_powers_of_ten() {
        let scale = Scale::Log {
            min: 0.5,
            max: 30_000.0,
        };
        assert_eq!(axis_tick(&scale, 0.0), "1");
        assert_eq!(axis_tick(&scale, 3.0), "1,000");
        assert_eq!(axis_tick(&scale, -1.0), "0.1");
        assert_eq!(axis_tick(&scale, 2.5), "");
    }

    #[test]
    fn test_linear_ticks() {
        let scale = Scale::Linear {
            min: 0.0,
            max: 300.0,
        };
        assert_eq!(axis_tick(&scale, 50.0), "50");
        assert_eq!(axis_tick(&scale, 99.5), "99.5");
    }

    #[test]
    fn test_ring_segment_is_closed_band() {
        let points = ring_segment((100.0, 100.0), 25.0, 50.0, -FRAC_PI_2, TAU / 4.0);
        // Outer arc starts at 12 o'clock, inner arc ends there
        assert_eq!(points[0], (100, 50));
        assert_eq!(*points.last().unwrap(), (100, 75));
        assert!(points.len() >= 6);
    }
}
