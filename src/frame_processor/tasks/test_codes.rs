// SPDX-License-Identifier: GPL-3.0-only

//! QR fixtures rendered into camera frames

use crate::backends::camera::{CameraFrame, PixelFormat, SensorRotation};

/// Version 1 QR code (level M) holding "hi"
const HI_MODULES: [&str; 21] = [
    "#######..####.#######",
    "#.....#..##.#.#.....#",
    "#.###.#.##.##.#.###.#",
    "#.###.#.##..#.#.###.#",
    "#.###.#.#..##.#.###.#",
    "#.....#.##..#.#.....#",
    "#######.#.#.#.#######",
    "........#.###........",
    "#.#####.....#.#####..",
    ".###.#.#..#.#..#....#",
    "..##..##.#.#.#..####.",
    "###.#....#.....##.#..",
    "###.#.#....#.#..#.#.#",
    "........#..####..#..#",
    "#######...#.#.##...#.",
    "#.....#.#######..#..#",
    "#.###.#.#...#..#..#..",
    "#.###.#.###.#..#..#..",
    "#.###.#.#..#.#..###..",
    "#.....#..##....##.#..",
    "#######.#.##.#..####.",
];

pub const HI_VALUE: &str = "hi";
pub const MODULE_PX: u32 = 3;
pub const HI_SIZE_PX: u32 = HI_MODULES.len() as u32 * MODULE_PX;

/// Gray8 sensor frame whose upright image is `upright_width` x `upright_height`
/// with the "hi" code's top-left module at `origin`
pub fn hi_code_frame(
    upright_width: u32,
    upright_height: u32,
    origin: (u32, u32),
    rotation: SensorRotation,
) -> CameraFrame {
    let mut upright = vec![255u8; (upright_width * upright_height) as usize];
    for (row, line) in HI_MODULES.iter().enumerate() {
        for (col, module) in line.bytes().enumerate() {
            if module != b'#' {
                continue;
            }
            let x0 = origin.0 + col as u32 * MODULE_PX;
            let y0 = origin.1 + row as u32 * MODULE_PX;
            for y in y0..y0 + MODULE_PX {
                for x in x0..x0 + MODULE_PX {
                    upright[(y * upright_width + x) as usize] = 0;
                }
            }
        }
    }

    let (width, height) = if rotation.swaps_dimensions() {
        (upright_height, upright_width)
    } else {
        (upright_width, upright_height)
    };
    let mut sensor = Vec::with_capacity(upright.len());
    for y in 0..height {
        for x in 0..width {
            let (ux, uy) = rotation.to_upright(x as f32 + 0.5, y as f32 + 0.5, width, height);
            sensor.push(upright[(uy as u32 * upright_width + ux as u32) as usize]);
        }
    }

    CameraFrame::new(width, height, PixelFormat::Gray8, sensor).with_rotation(rotation)
}
