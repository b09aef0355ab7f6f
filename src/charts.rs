//! SVG charts drawn from aggregation snapshots.

use std::{
    f64::consts::PI,
    fs,
    path::{Path as FsPath, PathBuf},
};

use rust_decimal::{prelude::ToPrimitive, Decimal};
use spendbook_core::{CategoryTotals, DailyTotals, DateRange, MonthlyTotals};
use svg::{
    node::element::{path::Data, Circle, Line, Path, Rectangle, Text},
    node::Text as TextNode,
    Document,
};

use crate::reports::{money, ReportError};

const WIDTH: f64 = 1000.0;
const HEIGHT: f64 = 600.0;
const MARGIN: f64 = 70.0;
const FONT_SIZE: f64 = 14.0;

const COLORS: &[&str] = &[
    "#8dd3c7", "#ffffb3", "#bebada", "#fb8072", "#80b1d3", "#fdb462", "#b3de69", "#fccde5",
    "#d9d9d9", "#bc80bd", "#ccebc5", "#ffed6f",
];

fn to_f64(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or(0.0)
}

fn label(x: f64, y: f64, content: impl Into<String>) -> Text {
    Text::new()
        .set("x", x)
        .set("y", y)
        .set("font-size", FONT_SIZE)
        .set("font-family", "sans-serif")
        .set("text-anchor", "middle")
        .add(TextNode::new(content))
}

fn title(content: &str) -> Text {
    label(WIDTH / 2.0, MARGIN / 2.0, content)
        .set("font-size", FONT_SIZE * 1.5)
        .set("font-weight", "bold")
}

fn axes() -> (Line, Line) {
    let bottom = HEIGHT - MARGIN;
    let x_axis = Line::new()
        .set("x1", MARGIN)
        .set("x2", WIDTH - MARGIN)
        .set("y1", bottom)
        .set("y2", bottom)
        .set("stroke", "black")
        .set("stroke-width", 1.5);
    let y_axis = Line::new()
        .set("x1", MARGIN)
        .set("x2", MARGIN)
        .set("y1", MARGIN)
        .set("y2", bottom)
        .set("stroke", "black")
        .set("stroke-width", 1.5);
    (x_axis, y_axis)
}

fn canvas() -> Document {
    Document::new()
        .set("viewBox", (0.0, 0.0, WIDTH, HEIGHT))
        .set("width", WIDTH)
        .set("height", HEIGHT)
        .add(
            Rectangle::new()
                .set("width", WIDTH)
                .set("height", HEIGHT)
                .set("fill", "white"),
        )
}

/// Vertical bars with the amount above each bar and the label below.
fn bar_chart(heading: &str, bars: &[(String, Decimal)], fill: &str, stroke: &str) -> Document {
    let plot_width = WIDTH - 2.0 * MARGIN;
    let plot_height = HEIGHT - 2.0 * MARGIN;
    let bottom = HEIGHT - MARGIN;
    let max = bars
        .iter()
        .map(|(_, amount)| to_f64(*amount))
        .fold(0.0_f64, f64::max);
    let slot = plot_width / bars.len() as f64;
    let bar_width = slot * 0.6;

    let (x_axis, y_axis) = axes();
    let mut document = canvas().add(title(heading));

    for (i, (name, amount)) in bars.iter().enumerate() {
        let height = if max > 0.0 { to_f64(*amount) / max * plot_height } else { 0.0 };
        let x = MARGIN + i as f64 * slot + (slot - bar_width) / 2.0;
        let centre = x + bar_width / 2.0;
        let top = bottom - height;

        document = document
            .add(
                Rectangle::new()
                    .set("x", x)
                    .set("y", top)
                    .set("width", bar_width)
                    .set("height", height)
                    .set("fill", fill)
                    .set("stroke", stroke)
                    .set("fill-opacity", 0.8),
            )
            .add(label(centre, top - 6.0, money(*amount)).set("font-weight", "bold"))
            .add(
                label(centre, bottom + 20.0, name.as_str())
                    .set("text-anchor", "end")
                    .set("transform", format!("rotate(-30 {} {})", centre, bottom + 20.0)),
            );
    }

    document.add(x_axis).add(y_axis)
}

/// Writes charts into a directory, one SVG file per chart.
pub struct ChartRenderer {
    output_dir: PathBuf,
}

impl ChartRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &FsPath {
        &self.output_dir
    }

    fn save(&self, file_name: &str, document: &Document) -> Result<PathBuf, ReportError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(file_name);
        svg::save(&path, document)?;
        tracing::info!(path = %path.display(), "chart written");
        Ok(path)
    }

    pub fn category_bar_chart(&self, totals: &CategoryTotals) -> Result<PathBuf, ReportError> {
        if totals.is_empty() {
            return Err(ReportError::NoData("category chart"));
        }
        let bars: Vec<_> = totals
            .iter()
            .map(|(category, amount)| (category.to_string(), *amount))
            .collect();
        let document = bar_chart("Expenses by Category", &bars, "skyblue", "navy");
        self.save("category_bar.svg", &document)
    }

    pub fn monthly_bar_chart(&self, totals: &MonthlyTotals) -> Result<PathBuf, ReportError> {
        if totals.is_empty() {
            return Err(ReportError::NoData("monthly chart"));
        }
        let bars: Vec<_> = totals
            .iter()
            .map(|(month, amount)| (month.to_string(), *amount))
            .collect();
        let document = bar_chart("Monthly Expenses", &bars, "lightcoral", "darkred");
        self.save("monthly_bar.svg", &document)
    }

    pub fn category_pie_chart(&self, totals: &CategoryTotals) -> Result<PathBuf, ReportError> {
        if totals.is_empty() {
            return Err(ReportError::NoData("pie chart"));
        }

        let total: f64 = totals.values().map(|a| to_f64(*a)).sum();
        let radius = (HEIGHT - 2.0 * MARGIN) / 2.0;
        let (cx, cy) = (MARGIN + radius + 40.0, HEIGHT / 2.0 + 10.0);
        let legend_x = cx + radius + 80.0;

        let mut document = canvas().add(title("Expense Distribution by Category"));
        let mut start = -PI / 2.0;

        for (i, (category, amount)) in totals.iter().enumerate() {
            let share = if total > 0.0 { to_f64(*amount) / total } else { 0.0 };
            let sweep = share * 2.0 * PI;
            let end = start + sweep;
            let color = COLORS[i % COLORS.len()];

            if totals.len() == 1 {
                document = document.add(
                    Circle::new()
                        .set("cx", cx)
                        .set("cy", cy)
                        .set("r", radius)
                        .set("fill", color)
                        .set("stroke", "white"),
                );
            } else {
                let large_arc = if sweep > PI { 1 } else { 0 };
                let d = format!(
                    "M {cx} {cy} L {} {} A {radius} {radius} 0 {large_arc} 1 {} {} Z",
                    cx + radius * start.cos(),
                    cy + radius * start.sin(),
                    cx + radius * end.cos(),
                    cy + radius * end.sin(),
                );
                document = document.add(
                    Path::new()
                        .set("d", d)
                        .set("fill", color)
                        .set("stroke", "white")
                        .set("stroke-width", 2.0),
                );
            }

            let mid = start + sweep / 2.0;
            document = document
                .add(
                    label(
                        cx + radius * 0.65 * mid.cos(),
                        cy + radius * 0.65 * mid.sin(),
                        format!("{:.1}%", share * 100.0),
                    )
                    .set("font-weight", "bold"),
                )
                .add(
                    Rectangle::new()
                        .set("x", legend_x)
                        .set("y", MARGIN + i as f64 * 24.0)
                        .set("width", 16.0)
                        .set("height", 16.0)
                        .set("fill", color),
                )
                .add(
                    label(legend_x + 24.0, MARGIN + i as f64 * 24.0 + 13.0, category.to_string())
                        .set("text-anchor", "start"),
                );
            start = end;
        }

        self.save("category_pie.svg", &document)
    }

    /// Line chart of per-day spending inside `range`.
    pub fn trend_chart(&self, daily: &DailyTotals, range: &DateRange) -> Result<PathBuf, ReportError> {
        if daily.is_empty() {
            return Err(ReportError::NoData("trend chart"));
        }

        let plot_width = WIDTH - 2.0 * MARGIN;
        let plot_height = HEIGHT - 2.0 * MARGIN;
        let bottom = HEIGHT - MARGIN;
        let span = (range.end() - range.start()).whole_days().max(1) as f64;
        let max = daily.values().map(|a| to_f64(*a)).fold(0.0_f64, f64::max);
        let label_every = (daily.len() / 10).max(1);
        let days = (range.end() - range.start()).whole_days() + 1;

        let (x_axis, y_axis) = axes();
        let mut document = canvas().add(title(&format!("Daily Expense Trend (Last {} Days)", days)));
        let mut line = Data::new();

        for (i, (date, amount)) in daily.iter().enumerate() {
            let offset = (*date - range.start()).whole_days() as f64;
            let x = MARGIN + offset / span * plot_width;
            let y = if max > 0.0 { bottom - to_f64(*amount) / max * plot_height } else { bottom };

            line = if i == 0 { line.move_to((x, y)) } else { line.line_to((x, y)) };
            document = document.add(
                Circle::new()
                    .set("cx", x)
                    .set("cy", y)
                    .set("r", 5.0)
                    .set("fill", "green"),
            );
            if i % label_every == 0 {
                document = document.add(label(
                    x,
                    bottom + 20.0,
                    format!("{:02}-{:02}", u8::from(date.month()), date.day()),
                ));
            }
        }

        let document = document
            .add(
                Path::new()
                    .set("d", line)
                    .set("fill", "none")
                    .set("stroke", "green")
                    .set("stroke-width", 2.0),
            )
            .add(x_axis)
            .add(y_axis);
        self.save(&format!("trend_{}d.svg", days), &document)
    }
}
