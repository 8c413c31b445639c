//! Context-window usage: ceiling per model, percentage, and its gauge.

use crate::render::{COLOR_GRAY, COLOR_RESET};

/// Bar width in segments.
const BAR_WIDTH: u64 = 10;

/// Context-window size implied by the model's display name.
pub fn context_ceiling(model: &str) -> u64 {
    let model = model.to_lowercase();
    if model.contains("1m") {
        1_000_000
    } else if model.contains("500k") {
        500_000
    } else {
        200_000
    }
}

/// Rounded share of the ceiling in use, clamped to 100.
pub fn context_percentage(tokens: u64, ceiling: u64) -> u64 {
    if ceiling == 0 {
        return 100;
    }
    let pct = (tokens.saturating_mul(100) + ceiling / 2) / ceiling;
    pct.min(100)
}

/// Five-level severity of context usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextBand {
    Safe,
    Good,
    Caution,
    Warning,
    Danger,
}

impl ContextBand {
    pub fn from_percentage(pct: u64) -> Self {
        match pct {
            0..=39 => ContextBand::Safe,
            40..=59 => ContextBand::Good,
            60..=74 => ContextBand::Caution,
            75..=89 => ContextBand::Warning,
            _ => ContextBand::Danger,
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            ContextBand::Safe => "\x1b[38;2;152;195;121m",
            ContextBand::Good => "\x1b[38;2;108;167;185m",
            ContextBand::Caution => "\x1b[38;2;229;192;123m",
            ContextBand::Warning => "\x1b[38;2;224;139;71m",
            ContextBand::Danger => "\x1b[38;2;224;108;117m",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            ContextBand::Safe => "💧",
            ContextBand::Good => "💦",
            ContextBand::Caution => "🌊",
            ContextBand::Warning => "⚠️",
            ContextBand::Danger => "🔥",
        }
    }
}

/// Snapshot of context usage for one render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextUsage {
    pub tokens: u64,
    pub ceiling: u64,
}

impl ContextUsage {
    pub fn new(tokens: u64, model: &str) -> Self {
        Self {
            tokens,
            ceiling: context_ceiling(model),
        }
    }

    pub fn percentage(&self) -> u64 {
        context_percentage(self.tokens, self.ceiling)
    }

    pub fn band(&self) -> ContextBand {
        ContextBand::from_percentage(self.percentage())
    }

    /// ` | 💧 ██░░░░░░░░ 20% 40k/200k`
    pub fn display(&self) -> String {
        let pct = self.percentage();
        let band = self.band();
        format!(
            " | {} {} {}{}% {}/{}{}",
            band.icon(),
            progress_bar(pct),
            band.color(),
            pct,
            format_tokens(self.tokens),
            format_tokens(self.ceiling),
            COLOR_RESET
        )
    }
}

/// Ten-segment gauge, filled part in the band colour.
pub fn progress_bar(pct: u64) -> String {
    let filled = (pct * BAR_WIDTH / 100).min(BAR_WIDTH) as usize;
    let empty = BAR_WIDTH as usize - filled;
    let color = ContextBand::from_percentage(pct).color();

    let mut bar = String::new();
    if filled > 0 {
        bar.push_str(color);
        bar.push_str(&"█".repeat(filled));
        bar.push_str(COLOR_RESET);
    }
    if empty > 0 {
        bar.push_str(COLOR_GRAY);
        bar.push_str(&"░".repeat(empty));
        bar.push_str(COLOR_RESET);
    }
    bar
}

/// `--` for zero, `Nk` from a thousand up.
pub fn format_tokens(tokens: u64) -> String {
    match tokens {
        0 => "--".to_string(),
        t if t >= 1000 => format!("{}k", t / 1000),
        t => t.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_ceiling_by_model_name() {
        assert_eq!(context_ceiling("Opus 4.1 (1M context)"), 1_000_000);
        assert_eq!(context_ceiling("sonnet [1m]"), 1_000_000);
        assert_eq!(context_ceiling("Custom 500K"), 500_000);
        assert_eq!(context_ceiling("model[500k]"), 500_000);
        assert_eq!(context_ceiling("Sonnet 4"), 200_000);
        assert_eq!(context_ceiling(""), 200_000);
    }

    #[test]
    fn test_context_percentage_rounds_and_clamps() {
        assert_eq!(context_percentage(0, 200_000), 0);
        assert_eq!(context_percentage(1_000, 200_000), 1); // 0.5 rounds up
        assert_eq!(context_percentage(998, 200_000), 0);
        assert_eq!(context_percentage(100_000, 200_000), 50);
        assert_eq!(context_percentage(200_000, 200_000), 100);
        assert_eq!(context_percentage(900_000, 200_000), 100);
    }

    #[test]
    fn test_context_percentage_is_monotonic() {
        let mut previous = 0;
        for tokens in (0..=250_000).step_by(777) {
            let pct = context_percentage(tokens, 200_000);
            assert!(pct >= previous);
            assert!(pct <= 100);
            previous = pct;
        }
    }

    #[test]
    fn test_band_thresholds() {
        assert_eq!(ContextBand::from_percentage(0), ContextBand::Safe);
        assert_eq!(ContextBand::from_percentage(39), ContextBand::Safe);
        assert_eq!(ContextBand::from_percentage(40), ContextBand::Good);
        assert_eq!(ContextBand::from_percentage(60), ContextBand::Caution);
        assert_eq!(ContextBand::from_percentage(75), ContextBand::Warning);
        assert_eq!(ContextBand::from_percentage(89), ContextBand::Warning);
        assert_eq!(ContextBand::from_percentage(90), ContextBand::Danger);
        assert_eq!(ContextBand::from_percentage(100), ContextBand::Danger);
    }

    #[test]
    fn test_progress_bar_segments() {
        let bar = progress_bar(35);
        assert_eq!(bar.matches('█').count(), 3);
        assert_eq!(bar.matches('░').count(), 7);

        let full = progress_bar(100);
        assert_eq!(full.matches('█').count(), 10);
        assert!(!full.contains('░'));

        let empty = progress_bar(0);
        assert_eq!(empty.matches('░').count(), 10);
    }

    #[test]
    fn test_format_tokens() {
        assert_eq!(format_tokens(0), "--");
        assert_eq!(format_tokens(999), "999");
        assert_eq!(format_tokens(45_678), "45k");
        assert_eq!(format_tokens(1_000_000), "1000k");
    }

    #[test]
    fn test_display() {
        let usage = ContextUsage::new(100_000, "Sonnet 4");
        let text = usage.display();
        assert!(text.starts_with(" | 💦 "));
        assert!(text.contains("50% 100k/200k"));

        let idle = ContextUsage::new(0, "Opus 4.1 (1M context)");
        assert!(idle.display().contains("0% --/1000k"));
    }
}
