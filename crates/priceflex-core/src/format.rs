//! Display formatting helpers.

const UNITS: [&str; 4] = ["K", "M", "B", "T"];

/// Format a count in compact notation: `1200` becomes `1.2K`, `5000` becomes `5K`.
///
/// Values below ten in their unit keep one decimal; larger values are rounded
/// to whole units. Rounding may carry into the next unit (`999_999` is `1M`).
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_compact_number(number: u64) -> String {
    if number < 1_000 {
        return number.to_string();
    }

    let mut scaled = number as f64;
    let mut unit = 0;
    while scaled >= 1_000.0 && unit < UNITS.len() {
        scaled /= 1_000.0;
        unit += 1;
    }

    let mut rounded = round_for_display(scaled);
    if rounded >= 1_000.0 && unit < UNITS.len() {
        rounded = round_for_display(rounded / 1_000.0);
        unit += 1;
    }

    let text = if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        format!("{rounded:.1}")
    };
    format!("{text}{}", UNITS[unit - 1])
}

fn round_for_display(value: f64) -> f64 {
    if value < 10.0 {
        (value * 10.0).round() / 10.0
    } else {
        value.round()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_numbers_are_unchanged() {
        assert_eq!(format_compact_number(0), "0");
        assert_eq!(format_compact_number(999), "999");
    }

    #[test]
    fn thousands() {
        assert_eq!(format_compact_number(1_000), "1K");
        assert_eq!(format_compact_number(1_200), "1.2K");
        assert_eq!(format_compact_number(5_000), "5K");
        assert_eq!(format_compact_number(12_345), "12K");
        assert_eq!(format_compact_number(100_000), "100K");
    }

    #[test]
    fn millions_and_carry() {
        assert_eq!(format_compact_number(1_000_000), "1M");
        assert_eq!(format_compact_number(1_500_000), "1.5M");
        assert_eq!(format_compact_number(999_999), "1M");
        assert_eq!(format_compact_number(9_960), "10K");
    }
}
