//! Colours, page geometry and chart sizes used by the report.

/// Physical page size in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl PageSize {
    /// ISO A4, portrait.
    pub const A4_PORTRAIT: PageSize = PageSize {
        width_mm: 210.0,
        height_mm: 297.0,
    };
}

/// Pixel size of one chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartSize {
    pub width: u32,
    pub height: u32,
}

/// Complete palette carrying every colour the report uses.
#[derive(Debug, Clone)]
pub struct Palette {
    // ── Text ─────────────────────────────────────────────────────────────────
    pub title: &'static str,
    pub section: &'static str,
    pub text: &'static str,
    pub muted: &'static str,

    // ── Status ───────────────────────────────────────────────────────────────
    pub critical: &'static str,
    pub positive: &'static str,

    // ── Table ────────────────────────────────────────────────────────────────
    pub table_header: &'static str,
    pub table_border: &'static str,
    pub table_row_alt: &'static str,

    // ── Charts ───────────────────────────────────────────────────────────────
    pub grid: &'static str,
    pub axis: &'static str,
    pub trend: &'static str,
    /// Categorical colours, cycled per series.
    pub series: &'static [&'static str],
    /// Light colours for pie slices and their table swatches.
    pub pastel: &'static [&'static str],
}

const SERIES: &[&str] = &[
    "#2980B9", "#E67E22", "#27AE60", "#C0392B", "#8E44AD", "#16A085", "#D35400", "#7F8C8D",
    "#F1C40F", "#2C3E50",
];

const PASTEL: &[&str] = &[
    "#A1C9F4", "#FFB482", "#8DE5A1", "#FF9F9B", "#D0BBFF", "#DEBB9B", "#FAB0E4", "#CFCFCF",
];

impl Default for Palette {
    fn default() -> Self {
        Self {
            title: "#2C3E50",
            section: "#2980B9",
            text: "#2C3E50",
            muted: "#7F8C8D",
            critical: "#C0392B",
            positive: "#27AE60",
            table_header: "#BDC3C7",
            table_border: "#BDC3C7",
            table_row_alt: "#F7F9F9",
            grid: "#E5E8E8",
            axis: "#566573",
            trend: "#E74C3C",
            series: SERIES,
            pastel: PASTEL,
        }
    }
}

impl Palette {
    /// Colour of the `index`-th series, cycling through the palette.
    pub fn series_color(&self, index: usize) -> &'static str {
        self.series[index % self.series.len()]
    }

    pub fn pastel_color(&self, index: usize) -> &'static str {
        self.pastel[index % self.pastel.len()]
    }
}

/// Everything that controls how a report looks.
///
/// Passed explicitly to every page builder; there is no global style state.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub page: PageSize,
    pub palette: Palette,
    /// Column width insight lines are wrapped at.
    pub wrap_width: usize,
    /// Size of a chart that fills the page body.
    pub chart: ChartSize,
    pub font_family: &'static str,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            page: PageSize::A4_PORTRAIT,
            palette: Palette::default(),
            wrap_width: 80,
            chart: ChartSize {
                width: 720,
                height: 460,
            },
            font_family: "Helvetica, Arial, sans-serif",
        }
    }
}

impl ReportConfig {
    /// Size of a chart sharing the page with another one.
    pub fn half_chart(&self) -> ChartSize {
        ChartSize {
            width: self.chart.width,
            height: self.chart.height * 3 / 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_a4_portrait() {
        let config = ReportConfig::default();
        assert_eq!(config.page, PageSize::A4_PORTRAIT);
        assert_eq!(config.wrap_width, 80);
        assert!(config.half_chart().height < config.chart.height);
    }

    #[test]
    fn test_series_colors_cycle() {
        let palette = Palette::default();
        assert_eq!(palette.series_color(0), palette.series_color(SERIES.len()));
        assert_ne!(palette.series_color(0), palette.series_color(1));
    }
}
