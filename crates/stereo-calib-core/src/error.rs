/// Validation errors for the core image and map types.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("invalid grayscale image buffer length (expected {expected} bytes, got {got})")]
    InvalidBufferLength { expected: usize, got: usize },

    #[error("invalid image dimensions (width={width}, height={height})")]
    InvalidDimensions { width: usize, height: usize },

    #[error("remap table planes disagree with {width}x{height} (map_x={map_x_len}, map_y={map_y_len})")]
    MapShapeMismatch {
        width: usize,
        height: usize,
        map_x_len: usize,
        map_y_len: usize,
    },

    #[error("invalid chessboard geometry ({inner_cols}x{inner_rows} inner corners, square {square_size_m} m)")]
    InvalidBoard {
        inner_cols: u32,
        inner_rows: u32,
        square_size_m: f64,
    },
}
