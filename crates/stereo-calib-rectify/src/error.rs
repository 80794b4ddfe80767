use stereo_calib_core::CoreError;

/// Which side of the stereo pair an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RectifyError {
    #[error(
        "{side} image is {actual_w}x{actual_h} but the rectification maps \
         were built for {expected_w}x{expected_h}"
    )]
    ResolutionMismatch {
        side: Side,
        expected_w: u32,
        expected_h: u32,
        actual_w: u32,
        actual_h: u32,
    },

    #[error("balance parameter alpha={0} outside [0, 1]")]
    InvalidAlpha(f64),

    #[error(transparent)]
    Core(#[from] CoreError),
}
