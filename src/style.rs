use plotters::style::RGBColor;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Severity limits (ms) used when nothing else is configured: excellent below
/// 50, good below 150, warning up to 200, critical above.
pub const DEFAULT_BAND_LIMITS: [f64; 3] = [50.0, 150.0, 200.0];

pub const DEFAULT_VALUE_LABEL_FORMAT: &str = "{:.0}ms";

const MAX_LABEL_PRECISION: usize = 6;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StyleError {
    #[error("unknown color role {0:?} (expected one of: {roles})", roles = ColorRole::names().join(", "))]
    UnknownColorRole(String),
    #[error("color for {role}: {value:?} is not a #rrggbb hex color")]
    InvalidColor { role: ColorRole, value: String },
    #[error("severity band limits must be {expected} strictly ascending positive values, got {limits:?}", expected = DEFAULT_BAND_LIMITS.len())]
    BandLimits { limits: Vec<f64> },
    #[error("value label format {0:?} must contain exactly one `{{}}` or `{{:.N}}` placeholder (N <= 6)")]
    InvalidLabelFormat(String),
}

/// Visual variant of every figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StyleProfile {
    /// Serif typography and the flat UI palette
    #[default]
    Classic,
    /// Sans-serif typography and a higher-contrast palette
    Modern,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorRole {
    Primary,
    Success,
    Warning,
    Danger,
    Accent,
    Muted,
    Text,
    Background,
}

impl ColorRole {
    pub fn all() -> &'static [ColorRole] {
        &[
            ColorRole::Primary,
            ColorRole::Success,
            ColorRole::Warning,
            ColorRole::Danger,
            ColorRole::Accent,
            ColorRole::Muted,
            ColorRole::Text,
            ColorRole::Background,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ColorRole::Primary => "primary",
            ColorRole::Success => "success",
            ColorRole::Warning => "warning",
            ColorRole::Danger => "danger",
            ColorRole::Accent => "accent",
            ColorRole::Muted => "muted",
            ColorRole::Text => "text",
            ColorRole::Background => "background",
        }
    }

    fn names() -> Vec<&'static str> {
        Self::all().iter().map(|r| r.name()).collect()
    }
}

impl fmt::Display for ColorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorRole {
    type Err = StyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Self::all()
            .iter()
            .copied()
            .find(|r| r.name() == key)
            .ok_or_else(|| StyleError::UnknownColorRole(s.to_string()))
    }
}

/// Latency severity buckets used to color percentile bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Excellent,
    Good,
    Warning,
    Critical,
}

impl Severity {
    pub fn role(&self) -> ColorRole {
        match self {
            Severity::Excellent => ColorRole::Success,
            Severity::Good => ColorRole::Primary,
            Severity::Warning => ColorRole::Warning,
            Severity::Critical => ColorRole::Danger,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Severity::Excellent => "excellent",
            Severity::Good => "good",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

/// Parse `#rrggbb` (the `#` is optional).
pub fn parse_hex_color(value: &str) -> Option<RGBColor> {
    let hex = value.trim().strip_prefix('#').unwrap_or(value.trim());
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}

/// A numeric label template such as `{:.0}ms` or `{:.1}x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFormat {
    prefix: String,
    precision: Option<usize>,
    suffix: String,
}

impl LabelFormat {
    pub fn with_precision(precision: usize, suffix: &str) -> Self {
        Self {
            prefix: String::new(),
            precision: Some(precision),
            suffix: suffix.to_string(),
        }
    }

    pub fn format(&self, value: f64) -> String {
        match self.precision {
            Some(p) => format!("{}{:.*}{}", self.prefix, p, value, self.suffix),
            None => format!("{}{}{}", self.prefix, value, self.suffix),
        }
    }
}

impl FromStr for LabelFormat {
    type Err = StyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StyleError::InvalidLabelFormat(s.to_string());

        let open = s.find('{').ok_or_else(invalid)?;
        let close = open + s[open..].find('}').ok_or_else(invalid)?;
        let (prefix, spec, suffix) = (&s[..open], &s[open + 1..close], &s[close + 1..]);

        if [prefix, suffix]
            .iter()
            .any(|part| part.contains('{') || part.contains('}'))
        {
            return Err(invalid());
        }

        let precision = if spec.is_empty() {
            None
        } else {
            let digits = spec.strip_prefix(":.").ok_or_else(invalid)?;
            let precision: usize = digits.parse().map_err(|_| invalid())?;
            if precision > MAX_LABEL_PRECISION {
                return Err(invalid());
            }
            Some(precision)
        };

        Ok(Self {
            prefix: prefix.to_string(),
            precision,
            suffix: suffix.to_string(),
        })
    }
}

impl fmt::Display for LabelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.precision {
            Some(p) => write!(f, "{}{{:.{}}}{}", self.prefix, p, self.suffix),
            None => write!(f, "{}{{}}{}", self.prefix, self.suffix),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontSizes {
    pub title: u32,
    pub panel_title: u32,
    pub axis_label: u32,
    pub tick_label: u32,
    pub data_label: u32,
    pub legend: u32,
    pub card_value: u32,
    pub card_label: u32,
}

#[derive(Debug, Clone, PartialEq)]
struct Palette {
    colors: [RGBColor; 8],
}

impl Palette {
    fn for_profile(profile: StyleProfile) -> Self {
        let colors = match profile {
            StyleProfile::Classic => [
                RGBColor(0x34, 0x98, 0xdb), // primary
                RGBColor(0x2e, 0xcc, 0x71), // success
                RGBColor(0xf3, 0x9c, 0x12), // warning
                RGBColor(0xe7, 0x4c, 0x3c), // danger
                RGBColor(0x9b, 0x59, 0xb6), // accent
                RGBColor(0x66, 0x66, 0x66), // muted
                RGBColor(0x00, 0x00, 0x00), // text
                RGBColor(0xff, 0xff, 0xff), // background
            ],
            StyleProfile::Modern => [
                RGBColor(0x25, 0x63, 0xeb),
                RGBColor(0x16, 0xa3, 0x4a),
                RGBColor(0xd9, 0x77, 0x06),
                RGBColor(0xdc, 0x26, 0x26),
                RGBColor(0x7c, 0x3a, 0xed),
                RGBColor(0x6b, 0x72, 0x80),
                RGBColor(0x11, 0x18, 0x27),
                RGBColor(0xf9, 0xfa, 0xfb),
            ],
        };
        Self { colors }
    }

    fn index(role: ColorRole) -> usize {
        ColorRole::all()
            .iter()
            .position(|&r| r == role)
            .unwrap_or_default()
    }

    fn get(&self, role: ColorRole) -> RGBColor {
        self.colors[Self::index(role)]
    }

    fn set(&mut self, role: ColorRole, color: RGBColor) {
        self.colors[Self::index(role)] = color;
    }
}

/// Fully validated figure styling. Built with [`StyleBuilder`].
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    profile: StyleProfile,
    palette: Palette,
    band_limits: [f64; 3],
    log_scale: bool,
    value_label: LabelFormat,
    pub fonts: FontSizes,
}

impl Style {
    pub fn builder(profile: StyleProfile) -> StyleBuilder {
        StyleBuilder::new(profile)
    }

    pub fn profile(&self) -> StyleProfile {
        self.profile
    }

    pub fn font_family(&self) -> &'static str {
        match self.profile {
            StyleProfile::Classic => "serif",
            StyleProfile::Modern => "sans-serif",
        }
    }

    pub fn color(&self, role: ColorRole) -> RGBColor {
        self.palette.get(role)
    }

    pub fn log_scale(&self) -> bool {
        self.log_scale
    }

    pub fn value_label(&self) -> &LabelFormat {
        &self.value_label
    }

    pub fn band_limits(&self) -> [f64; 3] {
        self.band_limits
    }

    pub fn severity(&self, millis: f64) -> Severity {
        let [excellent, good, warning] = self.band_limits;
        if millis < excellent {
            Severity::Excellent
        } else if millis < good {
            Severity::Good
        } else if millis <= warning {
            Severity::Warning
        } else {
            Severity::Critical
        }
    }

    pub fn severity_color(&self, severity: Severity) -> RGBColor {
        self.color(severity.role())
    }

    /// Fixed 5-color cycle for transaction categories.
    pub fn category_color(&self, index: usize) -> RGBColor {
        const CYCLE: [ColorRole; 5] = [
            ColorRole::Primary,
            ColorRole::Success,
            ColorRole::Warning,
            ColorRole::Danger,
            ColorRole::Accent,
        ];
        self.color(CYCLE[index % CYCLE.len()])
    }

    pub fn platform_color(&self, index: usize) -> RGBColor {
        const CYCLE: [ColorRole; 4] = [
            ColorRole::Primary,
            ColorRole::Danger,
            ColorRole::Warning,
            ColorRole::Success,
        ];
        self.color(CYCLE[index % CYCLE.len()])
    }
}

impl Default for Style {
    fn default() -> Self {
        Self::for_profile(StyleProfile::default())
    }
}

impl Style {
    fn for_profile(profile: StyleProfile) -> Self {
        let fonts = match profile {
            StyleProfile::Classic => FontSizes {
                title: 30,
                panel_title: 24,
                axis_label: 20,
                tick_label: 16,
                data_label: 15,
                legend: 16,
                card_value: 60,
                card_label: 22,
            },
            StyleProfile::Modern => FontSizes {
                title: 34,
                panel_title: 24,
                axis_label: 20,
                tick_label: 17,
                data_label: 16,
                legend: 17,
                card_value: 64,
                card_label: 20,
            },
        };

        Self {
            profile,
            palette: Palette::for_profile(profile),
            band_limits: DEFAULT_BAND_LIMITS,
            log_scale: true,
            value_label: LabelFormat::with_precision(0, "ms"),
            fonts,
        }
    }
}

/// Collects raw style options and validates them all in [`StyleBuilder::build`].
#[derive(Debug, Clone)]
pub struct StyleBuilder {
    profile: StyleProfile,
    colors: Vec<(String, String)>,
    band_limits: Option<Vec<f64>>,
    log_scale: Option<bool>,
    value_label_format: Option<String>,
}

impl StyleBuilder {
    pub fn new(profile: StyleProfile) -> Self {
        Self {
            profile,
            colors: Vec::new(),
            band_limits: None,
            log_scale: None,
            value_label_format: None,
        }
    }

    /// Override the color of a role, e.g. `color("danger", "#c0392b")`.
    pub fn color(mut self, role: impl Into<String>, hex: impl Into<String>) -> Self {
        self.colors.push((role.into(), hex.into()));
        self
    }

    pub fn band_limits(mut self, limits: impl Into<Vec<f64>>) -> Self {
        self.band_limits = Some(limits.into());
        self
    }

    pub fn log_scale(mut self, enabled: bool) -> Self {
        self.log_scale = Some(enabled);
        self
    }

    pub fn value_label_format(mut self, format: impl Into<String>) -> Self {
        self.value_label_format = Some(format.into());
        self
    }

    pub fn build(self) -> Result<Style, StyleError> {
        let mut style = Style::for_profile(self.profile);

        for (key, hex) in &self.colors {
            let role: ColorRole = key.parse()?;
            let color = parse_hex_color(hex).ok_or_else(|| StyleError::InvalidColor {
                role,
                value: hex.clone(),
            })?;
            style.palette.set(role, color);
        }

        if let Some(limits) = self.band_limits {
            let valid = limits.len() == DEFAULT_BAND_LIMITS.len()
                && limits.iter().all(|l| l.is_finite() && *l > 0.0)
                && limits.windows(2).all(|w| w[0] < w[1]);
            if !valid {
                return Err(StyleError::BandLimits { limits });
            }
            style.band_limits = [limits[0], limits[1], limits[2]];
        }

        if let Some(enabled) = self.log_scale {
            style.log_scale = enabled;
        }

        if let Some(format) = self.value_label_format {
            style.value_label = format.parse()?;
        }

        Ok(style)
    }
}
