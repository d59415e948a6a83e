//! Vehicle range model.
//!
//! Pure conversions between SOC, current range, full range, and post-charge
//! range. The safety buffer only gates the go/no-go feasibility decision;
//! reported remaining range and SOC always use the actual range.

/// Charge target after a stop, as an SOC percentage. Manufacturers
/// recommend stopping at 90% for battery health.
pub const CHARGE_TARGET_PERCENT: f64 = 90.0;

/// Estimated range at 100% SOC. `soc` must be positive.
pub fn full_range(current_range_miles: f64, soc: f64) -> f64 {
    current_range_miles / (soc / 100.0)
}

/// Range usable for feasibility decisions after holding back the buffer.
pub fn effective_range(current_range_miles: f64, buffer_percent: f64) -> f64 {
    current_range_miles * (1.0 - buffer_percent)
}

/// Range available after charging to the 90% target.
pub fn post_charge_range(full_range_miles: f64) -> f64 {
    full_range_miles * (CHARGE_TARGET_PERCENT / 100.0)
}

/// SOC percentage after travelling `distance_miles` starting from
/// `start_range_miles` of range. Clamped at zero.
pub fn final_soc(start_range_miles: f64, distance_miles: f64, full_range_miles: f64) -> f64 {
    let remaining = start_range_miles - distance_miles;
    (remaining / full_range_miles * 100.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_range_scales_by_soc() {
        // 100 miles left at 50% means 200 at full charge.
        assert!((full_range(100.0, 50.0) - 200.0).abs() < 1e-9);
        assert!((full_range(150.0, 100.0) - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_effective_range_holds_back_buffer() {
        assert!((effective_range(450.0, 0.30) - 315.0).abs() < 1e-9);
        assert!((effective_range(150.0, 0.0) - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_effective_range_is_below_actual_for_positive_buffer() {
        for buffer in [0.05, 0.30, 0.75] {
            assert!(effective_range(200.0, buffer) < 200.0);
        }
    }

    #[test]
    fn test_post_charge_range_targets_ninety_percent() {
        assert!((post_charge_range(200.0) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_final_soc_never_negative() {
        assert_eq!(final_soc(50.0, 400.0, 200.0), 0.0);
        assert!((final_soc(150.0, 100.0, 150.0) - 33.333333333333336).abs() < 1e-9);
    }
}
