//! Choropleth colour bands for the French-program ratio.

/// One of the five legend buckets. Upper bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorBand {
    NoData,
    /// ratio <= 0.25
    Low,
    /// ratio <= 0.50
    MidLow,
    /// ratio <= 0.75
    MidHigh,
    /// ratio > 0.75
    High,
}

impl ColorBand {
    /// Legend order.
    pub const ALL: [ColorBand; 5] = [
        ColorBand::NoData,
        ColorBand::Low,
        ColorBand::MidLow,
        ColorBand::MidHigh,
        ColorBand::High,
    ];

    /// NaN is treated the same as a missing ratio.
    pub fn for_ratio(ratio: Option<f64>) -> Self {
        match ratio {
            None => ColorBand::NoData,
            Some(r) if r.is_nan() => ColorBand::NoData,
            Some(r) if r <= 0.25 => ColorBand::Low,
            Some(r) if r <= 0.50 => ColorBand::MidLow,
            Some(r) if r <= 0.75 => ColorBand::MidHigh,
            Some(_) => ColorBand::High,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            ColorBand::NoData => "#888888",
            ColorBand::Low => "#cb6b33",
            ColorBand::MidLow => "#c2bb5e",
            ColorBand::MidHigh => "#7dca50",
            ColorBand::High => "#0c5603",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ColorBand::NoData => "No data",
            ColorBand::Low => "0–25%",
            ColorBand::MidLow => "26–50%",
            ColorBand::MidHigh => "51–75%",
            ColorBand::High => "76–100%",
        }
    }
}

/// Fill colour for a municipality ratio.
pub fn choropleth_color(ratio: Option<f64>) -> &'static str {
    ColorBand::for_ratio(ratio).color()
}
