use anyhow::{anyhow, Result};

pub fn validate_rating_scale(min: f64, max: f64) -> Result<()> {
    if !min.is_finite() || !max.is_finite() {
        return Err(anyhow!("Rating scale bounds must be finite"));
    }

    if min >= max {
        return Err(anyhow!("Rating scale minimum ({}) must be below maximum ({})", min, max));
    }

    Ok(())
}

pub fn validate_holdout_fraction(fraction: f64) -> Result<()> {
    if !(fraction > 0.0 && fraction < 1.0) {
        return Err(anyhow!("Hold-out fraction must be in (0, 1), got {}", fraction));
    }
    Ok(())
}

/// Single ASCII character, as the CSV reader expects one byte.
pub fn validate_delimiter(delimiter: &str) -> Result<u8> {
    match delimiter.as_bytes() {
        [byte] if byte.is_ascii() && *byte != b'"' && *byte != b'\n' && *byte != b'\r' => Ok(*byte),
        _ => Err(anyhow!("Delimiter must be a single ASCII character, got {:?}", delimiter)),
    }
}

pub fn validate_workers(workers: usize) -> Result<()> {
    if workers > 1024 {
        return Err(anyhow!("Too many workers: {} (max 1024)", workers));
    }
    Ok(())
}

/// Parses a rating cell. `None` for a blank cell, error for anything that is
/// not a finite number.
pub fn parse_rating(raw: &str) -> Result<Option<f64>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value: f64 = trimmed
        .parse()
        .map_err(|_| anyhow!("Invalid rating value: {:?}", raw))?;

    if !value.is_finite() {
        return Err(anyhow!("Rating value is not finite: {:?}", raw));
    }

    Ok(Some(value))
}

pub fn sanitize_id(input: &str) -> String {
    input.trim().to_string()
}
