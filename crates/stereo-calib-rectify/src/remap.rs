use serde::{Deserialize, Serialize};
use stereo_calib_core::{GrayImage, GrayImageView, RemapTable};

/// Resampling kernel of the remap operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterpolationMode {
    Nearest,
    Bilinear,
    /// Catmull-Rom cubic convolution (a = -0.5).
    Bicubic,
}

/// Resample `src` through a remap table.
///
/// The output has the table's resolution. Destination pixels whose
/// source coordinate falls outside the source bounds are filled with
/// `border_value`; in-bounds kernels clamp their outer taps at the
/// frame edge.
pub fn remap(
    src: &GrayImageView<'_>,
    table: &RemapTable,
    mode: InterpolationMode,
    border_value: u8,
) -> GrayImage {
    let mut data = vec![0u8; table.width * table.height];

    let max_x = (src.width - 1) as f32;
    let max_y = (src.height - 1) as f32;

    for y in 0..table.height {
        for x in 0..table.width {
            let (sx, sy) = table.source_of(x, y);
            let value = if sx < 0.0 || sy < 0.0 || sx > max_x || sy > max_y {
                border_value
            } else {
                match mode {
                    InterpolationMode::Nearest => sample_nearest(src, sx, sy),
                    InterpolationMode::Bilinear => sample_bilinear_clamped(src, sx, sy),
                    InterpolationMode::Bicubic => sample_bicubic(src, sx, sy),
                }
            };
            data[y * table.width + x] = value;
        }
    }

    GrayImage {
        width: table.width,
        height: table.height,
        data,
    }
}

#[inline]
fn tap(src: &GrayImageView<'_>, x: i64, y: i64) -> f32 {
    let x = x.clamp(0, src.width as i64 - 1) as usize;
    let y = y.clamp(0, src.height as i64 - 1) as usize;
    src.data[y * src.width + x] as f32
}

#[inline]
fn sample_nearest(src: &GrayImageView<'_>, x: f32, y: f32) -> u8 {
    tap(src, x.round() as i64, y.round() as i64) as u8
}

#[inline]
fn sample_bilinear_clamped(src: &GrayImageView<'_>, x: f32, y: f32) -> u8 {
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = tap(src, x0, y0);
    let p10 = tap(src, x0 + 1, y0);
    let p01 = tap(src, x0, y0 + 1);
    let p11 = tap(src, x0 + 1, y0 + 1);

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    (a + fy * (b - a)).clamp(0.0, 255.0) as u8
}

/// Catmull-Rom cubic convolution weight (a = -0.5).
#[inline]
fn cubic_weight(t: f32) -> f32 {
    const A: f32 = -0.5;
    let t = t.abs();
    if t <= 1.0 {
        ((A + 2.0) * t - (A + 3.0)) * t * t + 1.0
    } else if t < 2.0 {
        ((A * t - 5.0 * A) * t + 8.0 * A) * t - 4.0 * A
    } else {
        0.0
    }
}

#[inline]
fn sample_bicubic(src: &GrayImageView<'_>, x: f32, y: f32) -> u8 {
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let wx = [
        cubic_weight(fx + 1.0),
        cubic_weight(fx),
        cubic_weight(fx - 1.0),
        cubic_weight(fx - 2.0),
    ];
    let wy = [
        cubic_weight(fy + 1.0),
        cubic_weight(fy),
        cubic_weight(fy - 1.0),
        cubic_weight(fy - 2.0),
    ];

    let mut acc = 0.0f32;
    for (j, &wyj) in wy.iter().enumerate() {
        let row_y = y0 + j as i64 - 1;
        let mut row = 0.0f32;
        for (i, &wxi) in wx.iter().enumerate() {
            row += wxi * tap(src, x0 + i as i64 - 1, row_y);
        }
        acc += wyj * row;
    }
    acc.clamp(0.0, 255.0) as u8
}
