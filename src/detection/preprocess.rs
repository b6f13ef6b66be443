use super::BoundingBox;
use image::{DynamicImage, Rgb, RgbImage, imageops::FilterType};
use ndarray::Array4;

const PAD_VALUE: u8 = 114;

/// How an image was placed on the square model canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub orig_width: u32,
    pub orig_height: u32,
}

impl Letterbox {
    pub fn new(orig_width: u32, orig_height: u32, target: u32) -> Self {
        let scale = (target as f32 / orig_width as f32).min(target as f32 / orig_height as f32);
        let new_w = (orig_width as f32 * scale).round();
        let new_h = (orig_height as f32 * scale).round();

        Self {
            scale,
            pad_x: ((target as f32 - new_w) / 2.0).floor(),
            pad_y: ((target as f32 - new_h) / 2.0).floor(),
            orig_width,
            orig_height,
        }
    }

    fn resized_dims(&self) -> (u32, u32) {
        (
            ((self.orig_width as f32 * self.scale).round() as u32).max(1),
            ((self.orig_height as f32 * self.scale).round() as u32).max(1),
        )
    }

    /// Maps a box from canvas coordinates back onto the original image.
    pub fn restore(&self, bbox: BoundingBox) -> BoundingBox {
        BoundingBox {
            x1: (bbox.x1 - self.pad_x) / self.scale,
            y1: (bbox.y1 - self.pad_y) / self.scale,
            x2: (bbox.x2 - self.pad_x) / self.scale,
            y2: (bbox.y2 - self.pad_y) / self.scale,
        }
        .clamp(self.orig_width as f32, self.orig_height as f32)
    }
}

/// Letterboxes `image` into a `size`x`size` canvas and returns the NCHW
/// tensor scaled to `[0, 1]`.
pub fn letterbox(image: &DynamicImage, size: u32) -> (Array4<f32>, Letterbox) {
    let rgb = image.to_rgb8();
    let geometry = Letterbox::new(rgb.width(), rgb.height(), size);
    let (new_w, new_h) = geometry.resized_dims();

    let resized = image::imageops::resize(&rgb, new_w, new_h, FilterType::Triangle);
    let mut canvas = RgbImage::from_pixel(size, size, Rgb([PAD_VALUE; 3]));
    image::imageops::overlay(
        &mut canvas,
        &resized,
        geometry.pad_x as i64,
        geometry.pad_y as i64,
    );

    let side = size as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, side, side));
    for (x, y, pixel) in canvas.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    (tensor, geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_letterbox_geometry_landscape() {
        let lb = Letterbox::new(1280, 720, 640);

        assert_eq!(lb.scale, 0.5);
        assert_eq!(lb.pad_x, 0.0);
        assert_eq!(lb.pad_y, 140.0);
    }

    #[test]
    fn test_letterbox_geometry_portrait() {
        let lb = Letterbox::new(300, 600, 640);

        assert!((lb.scale - 640.0 / 600.0).abs() < 1e-6);
        assert_eq!(lb.pad_x, 160.0);
        assert_eq!(lb.pad_y, 0.0);
    }

    #[test]
    fn test_restore_undoes_letterbox() {
        let lb = Letterbox::new(1280, 720, 640);
        let restored = lb.restore(BoundingBox::new(100.0, 190.0, 200.0, 290.0));

        assert_eq!(restored, BoundingBox::new(200.0, 100.0, 400.0, 300.0));
    }

    #[test]
    fn test_restore_clamps_to_image() {
        let lb = Letterbox::new(1280, 720, 640);
        let restored = lb.restore(BoundingBox::new(-10.0, 100.0, 700.0, 600.0));

        assert_eq!(restored.to_array(), [0.0, 0.0, 1280.0, 720.0]);
    }

    #[test]
    fn test_letterbox_tensor_layout() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 2, Rgb([255, 0, 0])));
        let (tensor, lb) = letterbox(&img, 8);

        assert_eq!(tensor.shape(), &[1, 3, 8, 8]);
        assert_eq!(lb.pad_x, 0.0);
        assert_eq!(lb.pad_y, 2.0);

        // padding rows are gray
        let gray = PAD_VALUE as f32 / 255.0;
        assert_eq!(tensor[[0, 0, 0, 0]], gray);
        assert_eq!(tensor[[0, 1, 7, 7]], gray);

        // image rows carry the red source
        assert!(tensor[[0, 0, 4, 3]] > 0.99);
        assert!(tensor[[0, 1, 4, 3]] < 0.01);
        assert!(tensor[[0, 2, 4, 3]] < 0.01);
    }
}
