use once_cell::sync::Lazy;
use regex::Regex;

// "[download]  45.2% of ~ 10.00MiB at  1.21MiB/s ETA 00:07"
static PROGRESS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\[download\]\s+(\d{1,3}(?:\.\d+)?)%").expect("valid regex"));
static SPEED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bat\s+(\S+/s)").expect("valid regex"));
static ETA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bETA\s+(\S+)").expect("valid regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressLine {
    /// 0.0 - 1.0
    pub fraction: f32,
    pub speed: Option<String>,
    pub eta: Option<String>,
}

/// Fraction complete reported by a `[download]` status line.
pub fn parse(line: &str) -> Option<f32> {
    let caps = PROGRESS_RE.captures(line)?;
    let percent = caps.get(1)?.as_str().parse::<f32>().ok()?;
    Some((percent / 100.0).clamp(0.0, 1.0))
}

pub fn parse_details(line: &str) -> Option<ProgressLine> {
    let fraction = parse(line)?;
    let capture = |re: &Regex| {
        re.captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
            .filter(|value| !value.starts_with("Unknown"))
    };

    Some(ProgressLine {
        fraction,
        speed: capture(&SPEED_RE),
        eta: capture(&ETA_RE),
    })
}
