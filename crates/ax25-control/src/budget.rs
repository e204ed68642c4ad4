/// Joint paclen/window policy (spec §9 open question): the single
/// source of truth both C5's outbound pump and C7's chunk scheduler
/// consult so the two adaptive layers never independently believe they
/// have more in-flight capacity than the link affords.
///
/// `effective in-flight bytes <= effective_paclen * effective_window`.
pub fn link_budget(effective_paclen: u32, effective_window: u32) -> usize {
    effective_paclen as usize * effective_window as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_is_the_simple_product() {
        assert_eq!(link_budget(128, 4), 512);
        assert_eq!(link_budget(0, 4), 0);
    }
}
