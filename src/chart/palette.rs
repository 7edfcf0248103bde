//! Stable target colors shared by the summary table and the chart.

/// Color names understood by the markup parser, in assignment order.
pub const PALETTE: [&str; 14] = [
    "green",
    "yellow",
    "blue",
    "magenta",
    "cyan",
    "red",
    "orange",
    "purple",
    "lime",
    "pink",
    "darkcyan",
    "darkgreen",
    "darkblue",
    "darkmagenta",
];

/// Color for targets outside the supplied list.
pub const FALLBACK: &str = "white";

/// Assigns each target the palette entry at its position in the supplied
/// target list, so colors never depend on sort or arrival order.
#[derive(Debug, Clone, Default)]
pub struct Palette {
    targets: Vec<String>,
}

impl Palette {
    pub fn new(targets: &[String]) -> Self {
        Self {
            targets: targets.to_vec(),
        }
    }

    /// Append a target first seen at runtime; earlier colors are unaffected.
    pub fn register(&mut self, target: &str) -> bool {
        if self.targets.iter().any(|t| t == target) {
            return false;
        }
        self.targets.push(target.to_string());
        true
    }

    /// Targets in color order.
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn color_for(&self, target: &str) -> &'static str {
        self.targets
            .iter()
            .position(|t| t == target)
            .map(|index| PALETTE[index % PALETTE.len()])
            .unwrap_or(FALLBACK)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn color_follows_supplied_position() {
        let palette = Palette::new(&targets(&["a", "b", "c"]));
        assert_eq!(palette.color_for("a"), "green");
        assert_eq!(palette.color_for("b"), "yellow");
        assert_eq!(palette.color_for("c"), "blue");
        assert_eq!(palette.color_for("zzz"), FALLBACK);
    }

    #[test]
    fn colors_wrap_after_palette_is_exhausted() {
        let names: Vec<String> = (0..16).map(|i| format!("t{i}")).collect();
        let palette = Palette::new(&names);
        assert_eq!(palette.color_for("t14"), palette.color_for("t0"));
        assert_eq!(palette.color_for("t15"), palette.color_for("t1"));
    }

    #[test]
    fn late_targets_do_not_shift_colors() {
        let mut palette = Palette::new(&targets(&["a", "b"]));
        assert!(palette.register("late"));
        assert!(!palette.register("a"));
        assert_eq!(palette.color_for("a"), "green");
        assert_eq!(palette.color_for("b"), "yellow");
        assert_eq!(palette.color_for("late"), "blue");
        assert_eq!(palette.targets().len(), 3);
    }

    #[test]
    fn colors_stable_across_lookups() {
        let palette = Palette::new(&targets(&["x", "y"]));
        let first: Vec<&str> = ["y", "x"].iter().map(|t| palette.color_for(t)).collect();
        for _ in 0..100 {
            let again: Vec<&str> = ["y", "x"].iter().map(|t| palette.color_for(t)).collect();
            assert_eq!(first, again);
        }
    }
}
