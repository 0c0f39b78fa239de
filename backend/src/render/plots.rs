//! Drawing routines, one per chart kind.
//!
//! Every routine receives null-free data and draws into the plot area of a
//! framed canvas.

use super::canvas::{Canvas, PlotArea, Scale, AXIS, GRID};
use super::color::{diverging, generate_palette, with_alpha, ACCENT};
use crate::stats::describe::{self, quantile};

/// Values of one axis after null removal.
#[derive(Debug, Clone)]
pub enum AxisData {
    Numeric(Vec<f64>),
    /// Categories in first-seen order and each row's category index.
    Categorical { labels: Vec<String>, positions: Vec<f64> },
}

impl AxisData {
    pub fn categorical(keys: Vec<String>) -> Self {
        let mut labels: Vec<String> = Vec::new();
        let positions = keys
            .into_iter()
            .map(|key| match labels.iter().position(|l| *l == key) {
                Some(i) => i as f64,
                None => {
                    labels.push(key);
                    (labels.len() - 1) as f64
                }
            })
            .collect();
        AxisData::Categorical { labels, positions }
    }

    pub fn values(&self) -> &[f64] {
        match self {
            AxisData::Numeric(values) => values,
            AxisData::Categorical { positions, .. } => positions,
        }
    }

    pub fn scale(&self) -> Scale {
        match self {
            AxisData::Numeric(values) => Scale::padded(values.iter().copied()),
            AxisData::Categorical { labels, .. } => Scale::discrete(labels.len()),
        }
    }

    pub fn labels(&self) -> &[String] {
        match self {
            AxisData::Numeric(_) => &[],
            AxisData::Categorical { labels, .. } => labels,
        }
    }
}

// =============================================================================
// Single numeric column
// =============================================================================

/// Returns the bin labels.
pub fn histogram(canvas: &mut Canvas, area: &PlotArea, values: &[f64], bins: usize) -> Vec<String> {
    let Some(h) = crate::stats::histogram::histogram(values, bins) else {
        return Vec::new();
    };
    let max = h.max_count().max(1) as f64;
    let slot = area.width() / h.bins() as f64;

    for (i, &count) in h.counts.iter().enumerate() {
        let x0 = area.left + slot * i as f64;
        let top = area.py(count as f64 / max * 0.95);
        canvas.fill_rect(x0 + 1.0, top, x0 + slot - 1.0, area.bottom, ACCENT);
    }
    h.labels
}

struct BoxStats {
    q1: f64,
    median: f64,
    q3: f64,
    whisker_lo: f64,
    whisker_hi: f64,
    outliers: Vec<f64>,
}

fn box_stats(values: &[f64]) -> Option<BoxStats> {
    let q1 = quantile(values, 0.25)?;
    let median = describe::median(values)?;
    let q3 = quantile(values, 0.75)?;
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let fence = 1.5 * (q3 - q1);
    let inside: Vec<f64> = sorted
        .iter()
        .copied()
        .filter(|v| *v >= q1 - fence && *v <= q3 + fence)
        .collect();

    Some(BoxStats {
        q1,
        median,
        q3,
        whisker_lo: inside.first().copied().unwrap_or(q1),
        whisker_hi: inside.last().copied().unwrap_or(q3),
        outliers: sorted
            .iter()
            .copied()
            .filter(|v| *v < q1 - fence || *v > q3 + fence)
            .collect(),
    })
}

pub fn box_plot(canvas: &mut Canvas, area: &PlotArea, values: &[f64]) {
    let Some(stats) = box_stats(values) else {
        return;
    };
    let scale = Scale::padded(values.iter().copied());
    let y = |v: f64| area.py(scale.fraction(v));
    let (cx, half) = (area.px(0.5), area.width() * 0.15);

    canvas.line(cx, y(stats.whisker_lo), cx, y(stats.q1), AXIS);
    canvas.line(cx, y(stats.q3), cx, y(stats.whisker_hi), AXIS);
    for w in [stats.whisker_lo, stats.whisker_hi] {
        canvas.line(cx - half / 2.0, y(w), cx + half / 2.0, y(w), AXIS);
    }
    canvas.fill_rect(cx - half, y(stats.q3), cx + half, y(stats.q1), with_alpha(ACCENT, 170));
    canvas.stroke(cx - half, y(stats.median), cx + half, y(stats.median), 3.0, AXIS);
    for v in stats.outliers {
        canvas.fill_circle(cx, y(v), 3.0, AXIS);
    }
}

/// Gaussian kernel density mirrored around the centre line.
pub fn violin(canvas: &mut Canvas, area: &PlotArea, values: &[f64]) {
    const STEPS: usize = 120;

    let scale = Scale::padded(values.iter().copied());
    let bandwidth = silverman_bandwidth(values).unwrap_or((scale.hi - scale.lo) * 0.05);
    let n = values.len() as f64;
    let norm = 1.0 / (n * bandwidth * (2.0 * std::f64::consts::PI).sqrt());

    let density: Vec<(f64, f64)> = (0..=STEPS)
        .map(|i| {
            let v = scale.lo + (scale.hi - scale.lo) * i as f64 / STEPS as f64;
            let d: f64 = values
                .iter()
                .map(|x| (-0.5 * ((v - x) / bandwidth).powi(2)).exp())
                .sum::<f64>()
                * norm;
            (v, d)
        })
        .collect();

    let peak = density.iter().map(|p| p.1).fold(0.0, f64::max);
    if peak <= 0.0 {
        return;
    }

    let (cx, half) = (area.px(0.5), area.width() * 0.3);
    let fill = with_alpha(ACCENT, 190);
    for pair in density.windows(2) {
        let (v0, d0) = pair[0];
        let (v1, d1) = pair[1];
        let w = half * (d0 + d1) / 2.0 / peak;
        canvas.fill_rect(
            cx - w,
            area.py(scale.fraction(v1)),
            cx + w,
            area.py(scale.fraction(v0)),
            fill,
        );
    }

    if let Some(median) = describe::median(values) {
        let y = area.py(scale.fraction(median));
        canvas.stroke(cx - half * 0.2, y, cx + half * 0.2, y, 3.0, AXIS);
    }
}

fn silverman_bandwidth(values: &[f64]) -> Option<f64> {
    let std = describe::sample_std(values)?;
    let iqr = quantile(values, 0.75)? - quantile(values, 0.25)?;
    let spread = if iqr > 0.0 { std.min(iqr / 1.34) } else { std };
    let h = 0.9 * spread * (values.len() as f64).powf(-0.2);
    (h > 0.0).then_some(h)
}

// =============================================================================
// Single categorical column
// =============================================================================

/// `counts` must already be sorted and truncated.
pub fn bar(canvas: &mut Canvas, area: &PlotArea, counts: &[(String, usize)]) {
    if counts.is_empty() {
        return;
    }
    let colors = generate_palette(counts.len());
    let max = counts.iter().map(|c| c.1).max().unwrap_or(1).max(1) as f64;
    let slot = area.width() / counts.len() as f64;

    for (i, ((_, count), color)) in counts.iter().zip(colors).enumerate() {
        let x0 = area.left + slot * i as f64;
        let top = area.py(*count as f64 / max * 0.95);
        canvas.fill_rect(x0 + slot * 0.1, top, x0 + slot * 0.9, area.bottom, color);
    }
}

pub fn pie(canvas: &mut Canvas, counts: &[(String, usize)]) {
    let total: usize = counts.iter().map(|c| c.1).sum();
    if total == 0 {
        return;
    }
    let colors = generate_palette(counts.len());
    let (w, h) = (canvas.width() as f64, canvas.height() as f64);
    let (cx, cy, radius) = (w / 2.0, h / 2.0, w.min(h) * 0.4);

    let mut start = 0.0;
    for ((_, count), color) in counts.iter().zip(colors) {
        let sweep = *count as f64 / total as f64 * std::f64::consts::TAU;
        canvas.fill_wedge(cx, cy, radius, start, start + sweep, color);
        start += sweep;
    }
}

// =============================================================================
// Column pairs
// =============================================================================

pub fn scatter(canvas: &mut Canvas, area: &PlotArea, x: &AxisData, y: &AxisData) {
    let (sx, sy) = (x.scale(), y.scale());
    let color = with_alpha(ACCENT, 160);
    for (&xv, &yv) in x.values().iter().zip(y.values()) {
        canvas.fill_circle(area.px(sx.fraction(xv)), area.py(sy.fraction(yv)), 3.5, color);
    }
}

/// Polyline through the points sorted by x; a categorical x is reduced to
/// the mean y per category.
pub fn line(canvas: &mut Canvas, area: &PlotArea, x: &AxisData, y: &AxisData) {
    let points = line_points(x, y);
    let sx = match x {
        AxisData::Numeric(_) => Scale::padded(points.iter().map(|p| p.0)),
        AxisData::Categorical { labels, .. } => Scale::discrete(labels.len()),
    };
    let sy = match y {
        AxisData::Numeric(_) => Scale::padded(points.iter().map(|p| p.1)),
        AxisData::Categorical { labels, .. } => Scale::discrete(labels.len()),
    };
    let pixel = |p: &(f64, f64)| (area.px(sx.fraction(p.0)), area.py(sy.fraction(p.1)));

    for pair in points.windows(2) {
        let (x0, y0) = pixel(&pair[0]);
        let (x1, y1) = pixel(&pair[1]);
        canvas.stroke(x0, y0, x1, y1, 2.0, ACCENT);
    }
    for p in &points {
        let (px, py) = pixel(p);
        canvas.fill_circle(px, py, 3.0, ACCENT);
    }
}

// =============================================================================
// Analysis results
// =============================================================================

/// Square matrix drawn as a grid of cells on the diverging scale, row 0 at
/// the top. Undefined entries are grey.
pub fn heatmap(canvas: &mut Canvas, area: &PlotArea, values: &[Vec<Option<f64>>]) {
    let n = values.len();
    if n == 0 {
        return;
    }
    let (cell_w, cell_h) = (area.width() / n as f64, area.height() / n as f64);
    for (i, row) in values.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            let x0 = area.left + cell_w * j as f64;
            let y0 = area.top + cell_h * i as f64;
            let color = value.map(diverging).unwrap_or(GRID);
            canvas.fill_rect(x0 + 1.0, y0 + 1.0, x0 + cell_w - 1.0, y0 + cell_h - 1.0, color);
        }
    }
}

/// Projected scores with zero lines through the origin.
pub fn projection(canvas: &mut Canvas, area: &PlotArea, points: &[(f64, f64)]) {
    let sx = Scale::padded(points.iter().map(|p| p.0).chain([0.0]));
    let sy = Scale::padded(points.iter().map(|p| p.1).chain([0.0]));
    let (x0, y0) = (area.px(sx.fraction(0.0)), area.py(sy.fraction(0.0)));
    canvas.line(x0, area.top, x0, area.bottom, GRID);
    canvas.line(area.left, y0, area.right, y0, GRID);

    let color = with_alpha(ACCENT, 160);
    for &(xv, yv) in points {
        canvas.fill_circle(area.px(sx.fraction(xv)), area.py(sy.fraction(yv)), 3.5, color);
    }
}

pub(crate) fn line_points(x: &AxisData, y: &AxisData) -> Vec<(f64, f64)> {
    match x {
        AxisData::Categorical { labels, positions } => {
            let mut sums = vec![(0.0, 0usize); labels.len()];
            for (&p, &v) in positions.iter().zip(y.values()) {
                let slot = &mut sums[p as usize];
                slot.0 += v;
                slot.1 += 1;
            }
            sums.iter()
                .enumerate()
                .filter(|(_, s)| s.1 > 0)
                .map(|(i, s)| (i as f64, s.0 / s.1 as f64))
                .collect()
        }
        AxisData::Numeric(xs) => {
            let mut points: Vec<(f64, f64)> = xs.iter().copied().zip(y.values().iter().copied()).collect();
            points.sort_by(|a, b| a.0.total_cmp(&b.0));
            points
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_stats_outliers() {
        let stats = box_stats(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.outliers, vec![100.0]);
        assert_eq!(stats.whisker_hi, 4.0);
        assert_eq!(stats.whisker_lo, 1.0);
    }

    #[test]
    fn test_heatmap_cells() {
        let mut canvas = Canvas::new(100, 100);
        let area = PlotArea {
            left: 0.0,
            top: 0.0,
            right: 100.0,
            bottom: 100.0,
        };
        let values = vec![vec![Some(1.0), None], vec![None, Some(-1.0)]];
        heatmap(&mut canvas, &area, &values);
        assert_eq!(canvas.pixel(25, 25), diverging(1.0));
        assert_eq!(canvas.pixel(75, 25), GRID);
        assert_eq!(canvas.pixel(75, 75), diverging(-1.0));
    }

    #[test]
    fn test_categorical_axis_first_seen() {
        let axis = AxisData::categorical(vec!["b".into(), "a".into(), "b".into()]);
        assert_eq!(axis.labels(), &["b".to_string(), "a".to_string()]);
        assert_eq!(axis.values(), &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_line_points_mean_per_category() {
        let x = AxisData::categorical(vec!["a".into(), "b".into(), "a".into()]);
        let y = AxisData::Numeric(vec![1.0, 5.0, 3.0]);
        assert_eq!(line_points(&x, &y), vec![(0.0, 2.0), (1.0, 5.0)]);

        let x = AxisData::Numeric(vec![3.0, 1.0, 2.0]);
        let y = AxisData::Numeric(vec![30.0, 10.0, 20.0]);
        assert_eq!(line_points(&x, &y), vec![(1.0, 10.0), (2.0, 20.0), (3.0, 30.0)]);
    }
}
