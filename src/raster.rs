//! Expected-image rasterization
//!
//! Reference fixtures are PNGs produced from small per-variant drawing
//! snippets. The generator core only needs the [`Rasterizer`] seam: give
//! it drawing code and a surface size, get back an image. The built-in
//! implementation interprets a line-oriented command set sufficient for
//! fixture generation; richer backends can be plugged in behind the
//! trait.

use std::path::Path;

use image::{Rgba, RgbaImage};

use crate::error::{DefinitionError, GenError};

/// Turns a drawing snippet into an RGBA image of the requested size.
pub trait Rasterizer {
    fn rasterize(
        &self,
        code: &str,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, DefinitionError>;
}

/// Built-in rasterizer for a small line-oriented drawing language:
///
/// - `fill R G B A` — flood the whole surface
/// - `rect X Y W H R G B A` — fill an axis-aligned rectangle
/// - blank lines and `#` comments are ignored
///
/// Anything else is a [`DefinitionError::RasterCommand`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRasterizer;

impl Rasterizer for CommandRasterizer {
    fn rasterize(
        &self,
        code: &str,
        width: u32,
        height: u32,
    ) -> Result<RgbaImage, DefinitionError> {
        let mut image = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
        for line in code.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            match fields.as_slice() {
                ["fill", r, g, b, a] => {
                    let color = parse_color(r, g, b, a, line)?;
                    for pixel in image.pixels_mut() {
                        *pixel = color;
                    }
                }
                ["rect", x, y, w, h, r, g, b, a] => {
                    let color = parse_color(r, g, b, a, line)?;
                    let (x, y) = (parse_u32(x, line)?, parse_u32(y, line)?);
                    let (w, h) = (parse_u32(w, line)?, parse_u32(h, line)?);
                    for py in y..(y + h).min(height) {
                        for px in x..(x + w).min(width) {
                            image.put_pixel(px, py, color);
                        }
                    }
                }
                _ => {
                    return Err(DefinitionError::RasterCommand {
                        line: line.to_string(),
                    })
                }
            }
        }
        Ok(image)
    }
}

fn parse_u32(field: &str, line: &str) -> Result<u32, DefinitionError> {
    field.parse().map_err(|_| DefinitionError::RasterCommand {
        line: line.to_string(),
    })
}

fn parse_color(
    r: &str,
    g: &str,
    b: &str,
    a: &str,
    line: &str,
) -> Result<Rgba<u8>, DefinitionError> {
    Ok(Rgba([
        parse_u32(r, line)? as u8,
        parse_u32(g, line)? as u8,
        parse_u32(b, line)? as u8,
        parse_u32(a, line)? as u8,
    ]))
}

/// Composite per-variant cell images into one grid image, row-major.
///
/// Cell `i` lands at column `i % grid_width`, row `i / grid_width`. The
/// output surface is `grid_width` cells wide and as tall as needed.
pub fn composite_grid(
    cells: &[RgbaImage],
    cell_width: u32,
    cell_height: u32,
    grid_width: usize,
) -> RgbaImage {
    let rows = cells.len().div_ceil(grid_width);
    let mut surface = RgbaImage::from_pixel(
        cell_width * grid_width as u32,
        cell_height * rows as u32,
        Rgba([0, 0, 0, 0]),
    );
    for (i, cell) in cells.iter().enumerate() {
        let x = (i % grid_width) as i64 * cell_width as i64;
        let y = (i / grid_width) as i64 * cell_height as i64;
        image::imageops::overlay(&mut surface, cell, x, y);
    }
    surface
}

/// Save an RGBA image as PNG, creating parent directories if needed.
pub fn save_png(image: &RgbaImage, path: &Path) -> Result<(), GenError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    image.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_command() {
        let image = CommandRasterizer.rasterize("fill 0 255 0 255", 4, 2).unwrap();
        assert_eq!(image.dimensions(), (4, 2));
        assert_eq!(*image.get_pixel(3, 1), Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn test_rect_command_clips_to_surface() {
        let code = "# background stays clear\nrect 1 0 10 1 255 0 0 255";
        let image = CommandRasterizer.rasterize(code, 4, 2).unwrap();
        assert_eq!(*image.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(*image.get_pixel(1, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*image.get_pixel(3, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*image.get_pixel(1, 1), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_unknown_command_is_an_error() {
        let err = CommandRasterizer.rasterize("circle 1 1 5", 4, 4).unwrap_err();
        assert!(matches!(err, DefinitionError::RasterCommand { line } if line.starts_with("circle")));
    }

    #[test]
    fn test_composite_grid_row_major() {
        let red = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]));
        let green = RgbaImage::from_pixel(2, 2, Rgba([0, 255, 0, 255]));
        let blue = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 255, 255]));

        let surface = composite_grid(&[red, green, blue], 2, 2, 2);
        assert_eq!(surface.dimensions(), (4, 4));
        assert_eq!(*surface.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*surface.get_pixel(2, 0), Rgba([0, 255, 0, 255]));
        assert_eq!(*surface.get_pixel(0, 2), Rgba([0, 0, 255, 255]));
        // Unoccupied cell stays transparent.
        assert_eq!(*surface.get_pixel(2, 2), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_save_png_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.png");
        let image = RgbaImage::from_pixel(1, 1, Rgba([1, 2, 3, 4]));
        save_png(&image, &path).unwrap();
        assert!(path.exists());
    }
}
