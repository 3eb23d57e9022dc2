//! ADC normalization.

use contracts::ADC_MAX;

/// Clamp an (FPN-corrected) ADC value into `[0, ADC_MAX]`.
///
/// Saturating: values above the range map to `ADC_MAX`, negative values to 0.
#[inline]
pub fn normalize_adc(value: i32) -> u16 {
    value.clamp(0, ADC_MAX as i32) as u16
}

/// 12-bit ADC to 8-bit gray
#[inline]
pub fn adc_to_gray(adc: u16) -> u8 {
    (adc.min(ADC_MAX) >> 4) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_saturates() {
        assert_eq!(normalize_adc(-3), 0);
        assert_eq!(normalize_adc(0), 0);
        assert_eq!(normalize_adc(2048), 2048);
        assert_eq!(normalize_adc(4095), 4095);
        assert_eq!(normalize_adc(4096), 4095);
        assert_eq!(normalize_adc(i32::MAX), 4095);
        assert_eq!(normalize_adc(i32::MIN), 0);
    }

    #[test]
    fn test_normalize_range_sweep() {
        for value in (-70_000..70_000).step_by(97) {
            let out = normalize_adc(value);
            assert!(out <= ADC_MAX);
            if value > ADC_MAX as i32 {
                assert_eq!(out, ADC_MAX);
            }
        }
    }

    #[test]
    fn test_gray_mapping() {
        assert_eq!(adc_to_gray(0), 0);
        assert_eq!(adc_to_gray(4095), 255);
        assert_eq!(adc_to_gray(u16::MAX), 255);
        assert_eq!(adc_to_gray(0x7F0), 0x7F);
    }
}
