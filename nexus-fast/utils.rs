//! Bit helpers for the 16-pixel Bresenham circle used by FAST

/// True when `mask` holds at least `min_len` set bits in a row, wrapping around
/// the end of the circle
pub fn has_contiguous_arc(mask: u16, min_len: usize) -> bool {
    if min_len == 0 || min_len > 16 {
        return false;
    }
    if mask == u16::MAX {
        return true;
    }

    // AND the mask with its rotations; a surviving bit starts a long enough run
    let mut run = mask;
    for i in 1..min_len {
        run &= mask.rotate_right(i as u32);
        if run == 0 {
            return false;
        }
    }
    run != 0
}
