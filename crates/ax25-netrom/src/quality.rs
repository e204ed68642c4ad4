/// Combine two EWMA quality values using the canonical NET/ROM formula
/// (spec §4.8): `q = ((a·b) + 128) / 256`. Used both to fold a fresh
/// observation into a stored quality and, for inferred routes, to
/// combine the quality of a hop with the quality already on file.
pub fn combine_quality(a: u8, b: u8) -> u8 {
    (((a as u16) * (b as u16) + 128) / 256) as u8
}

/// Maps a classification weight (spec §9, `FrameClass::quality_weight`)
/// onto the `[0,255]` quality sample this table observes.
pub fn weight_to_sample(weight: f64) -> u8 {
    (weight.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combining_with_max_quality_is_near_identity() {
        assert_eq!(combine_quality(255, 255), 254);
    }

    #[test]
    fn combining_with_zero_collapses_to_zero() {
        assert_eq!(combine_quality(200, 0), 0);
    }

    #[test]
    fn weight_one_is_full_scale() {
        assert_eq!(weight_to_sample(1.0), 255);
    }

    #[test]
    fn weight_quarter_scales_down() {
        assert_eq!(weight_to_sample(0.25), 64);
    }
}
