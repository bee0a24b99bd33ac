/// Returns true for 1, 2, 4, 8, ...
pub fn is_power_of_two(value: u32) -> bool {
    value.is_power_of_two()
}

/// Smallest power of two that is `>= value`. Zero maps to 1.
pub fn ceil_power_of_two(value: u32) -> u32 {
    value.max(1).next_power_of_two()
}

/// `2^exponent` as f32.
pub fn pow2_f32(exponent: u32) -> f32 {
    2f32.powi(exponent as i32)
}

/// `2^exponent` as f64.
pub fn pow2_f64(exponent: u32) -> f64 {
    2f64.powi(exponent as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ceil_power_of_two() {
        assert_eq!(ceil_power_of_two(0), 1);
        assert_eq!(ceil_power_of_two(1), 1);
        assert_eq!(ceil_power_of_two(200), 256);
        assert_eq!(ceil_power_of_two(256), 256);
    }

    #[test]
    fn test_pow2() {
        assert!(is_power_of_two(64));
        assert!(!is_power_of_two(0));
        assert!(!is_power_of_two(96));
        assert_eq!(pow2_f32(0), 1.0);
        assert_eq!(pow2_f64(8), 256.0);
    }
}
