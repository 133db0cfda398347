//! Textual rendering of sample values.
//!
//! Values are carried as strings so that `+Inf`, `-Inf` and `NaN` survive JSON encoding.
//! The layout follows the conventional shortest `%g` rendering: decimal notation while the
//! decimal exponent is in `[-4, 6)`, scientific notation with a signed two-digit exponent otherwise.

/// Exponent at which scientific notation takes over for large magnitudes.
const EXP_UPPER: i32 = 6;
/// Smallest exponent still rendered in decimal notation.
const EXP_LOWER: i32 = -4;

/// Format a float using the shortest representation that round-trips.
///
/// # Examples
/// ```
/// use promjson_model::format_float;
///
/// assert_eq!(format_float(1.0), "1");
/// assert_eq!(format_float(250000.0), "250000");
/// assert_eq!(format_float(1e6), "1e+06");
/// assert_eq!(format_float(f64::INFINITY), "+Inf");
/// assert_eq!(format_float(f64::NAN), "NaN");
/// ```
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    if v == 0.0 {
        return if v.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // `{:e}` yields the shortest round-trip digits, e.g. "1.234567e6" or "-5e-1".
    let sci = format!("{v:e}");
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let Ok(exp) = exp.parse::<i32>() else {
        return sci;
    };

    if (EXP_LOWER..EXP_UPPER).contains(&exp) {
        format!("{v}")
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
    }
}

/// Format an unsigned sample or bucket count.
#[inline]
pub fn format_count(v: u64) -> String {
    v.to_string()
}
