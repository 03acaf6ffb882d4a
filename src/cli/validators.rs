//! CLI argument validators.

use crate::constants::confidence;

/// Parse and validate confidence value (0.0-1.0).
pub fn parse_confidence(s: &str) -> Result<f32, String> {
    let value: f32 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if !(confidence::MIN..=confidence::MAX).contains(&value) {
        return Err(format!(
            "confidence must be between {} and {}, got {value}",
            confidence::MIN,
            confidence::MAX
        ));
    }

    Ok(value)
}
