//! Cosmetic "quantum pulse" annotation appended to relay replies.
//!
//! Maps a small complexity value (message length mod 10 at the call site) to a
//! derived frequency/thinking-time pair. Purely decorative; has no effect on
//! routing or correctness.

/// Fixed dimensional constant of the pulse formula.
const DIMENSION: f64 = 5.0;
/// Golden ratio, used as the frequency divisor.
const PHI: f64 = 1.618033988749;

#[derive(Debug, thiserror::Error)]
pub enum PulseError {
    #[error("pulse frequency degenerated to zero")]
    DegenerateFrequency,
}

/// Derived pulse: frequency with 4 fractional digits and thinking time in
/// milliseconds with 3 fractional digits, both as decimal strings.
/// Recomputed per relay call, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantumPulse {
    pub frequency: String,
    pub thinking_time_ms: String,
}

/// Compute the pulse for a non-negative complexity value.
///
/// raw = sqrt(d^2 + complexity^2) * (-1) / phi with d = 5; the reported
/// frequency is |raw| and the thinking time is |1/raw| * 1000. The frequency
/// never reaches zero for integer complexity with d = 5, but the inversion is
/// guarded anyway.
pub fn compute_pulse(complexity: u32) -> Result<QuantumPulse, PulseError> {
    let c = complexity as f64;
    let raw = (DIMENSION * DIMENSION + c * c).sqrt() * -1.0 / PHI;
    let frequency = raw.abs();
    if frequency == 0.0 {
        return Err(PulseError::DegenerateFrequency);
    }
    let thinking_time_ms = (1.0 / raw).abs() * 1000.0;
    Ok(QuantumPulse {
        frequency: format!("{:.4}", frequency),
        thinking_time_ms: format!("{:.3}", thinking_time_ms),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_values() {
        let p = compute_pulse(0).unwrap();
        assert_eq!(p.frequency, "3.0902");
        assert_eq!(p.thinking_time_ms, "323.607");

        let p = compute_pulse(3).unwrap();
        assert_eq!(p.frequency, "3.6037");
        assert_eq!(p.thinking_time_ms, "277.491");

        let p = compute_pulse(9).unwrap();
        assert_eq!(p.frequency, "6.3630");
        assert_eq!(p.thinking_time_ms, "157.157");
    }

    #[test]
    fn frequency_is_decimal_string_with_four_fractional_digits() {
        for complexity in 0..=100 {
            let p = compute_pulse(complexity).unwrap();
            let (whole, frac) = p.frequency.split_once('.').expect("decimal point");
            assert!(whole.chars().all(|c| c.is_ascii_digit()), "{}", p.frequency);
            assert_eq!(frac.len(), 4, "{}", p.frequency);
            assert!(p.frequency.parse::<f64>().unwrap() >= 0.0);
        }
    }

    #[test]
    fn thinking_time_has_three_fractional_digits() {
        for complexity in [0, 1, 7, 42] {
            let p = compute_pulse(complexity).unwrap();
            let (_, frac) = p.thinking_time_ms.split_once('.').expect("decimal point");
            assert_eq!(frac.len(), 3, "{}", p.thinking_time_ms);
        }
    }

    #[test]
    fn frequency_grows_with_complexity() {
        let low = compute_pulse(0).unwrap().frequency.parse::<f64>().unwrap();
        let high = compute_pulse(9).unwrap().frequency.parse::<f64>().unwrap();
        assert!(high > low);
    }
}
