//! `HH:MM:SS` timecode parsing and formatting.
//!
//! Checkpoint authoring accepts offsets in the editor-friendly `HH:MM:SS`
//! form; playback works in seconds throughout.

use crate::error::CoreError;

/// Parse an `HH:MM:SS` string into total seconds.
pub fn parse_timecode(s: &str) -> Result<u32, CoreError> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 3 {
        return Err(CoreError::Validation(format!(
            "Timecode must be HH:MM:SS, got '{s}'"
        )));
    }
    let field = |part: &str, name: &str| -> Result<u32, CoreError> {
        part.parse::<u32>().map_err(|_| {
            CoreError::Validation(format!("Timecode {name} must be numeric, got '{part}'"))
        })
    };
    let hours = field(parts[0], "hours")?;
    let minutes = field(parts[1], "minutes")?;
    let seconds = field(parts[2], "seconds")?;
    if minutes > 59 || seconds > 59 {
        return Err(CoreError::Validation(format!(
            "Timecode minutes/seconds must be below 60, got '{s}'"
        )));
    }
    hours
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes * 60 + seconds))
        .ok_or_else(|| CoreError::Validation(format!("Timecode '{s}' is out of range")))
}

/// Format total seconds as `HH:MM:SS` with zero padding.
pub fn format_timecode(total_seconds: u32) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_fields() {
        assert_eq!(parse_timecode("01:23:45").unwrap(), 5025);
    }

    #[test]
    fn parses_zero() {
        assert_eq!(parse_timecode("00:00:00").unwrap(), 0);
    }

    #[test]
    fn rejects_missing_fields() {
        assert!(parse_timecode("23:45").is_err());
    }

    #[test]
    fn rejects_non_numeric() {
        assert!(parse_timecode("aa:bb:cc").is_err());
    }

    #[test]
    fn rejects_out_of_range_minutes() {
        assert!(parse_timecode("00:61:00").is_err());
    }

    #[test]
    fn rejects_hours_past_u32_range() {
        // 2_000_000 * 3600 does not fit in u32.
        let err = parse_timecode("2000000:00:00").unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
        assert!(parse_timecode("4294967295:59:59").is_err());
    }

    #[test]
    fn formats_with_padding() {
        assert_eq!(format_timecode(5025), "01:23:45");
        assert_eq!(format_timecode(0), "00:00:00");
    }

    #[test]
    fn round_trips() {
        for secs in [0, 59, 60, 3599, 3600, 5025, 86399] {
            assert_eq!(parse_timecode(&format_timecode(secs)).unwrap(), secs);
        }
    }
}
