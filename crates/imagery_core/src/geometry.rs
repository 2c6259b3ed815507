//! Box-fitting arithmetic.

/// Dimensions of an image scaled to fit inside a box, keeping its aspect ratio.
///
/// The image is never enlarged. It is first scaled down to the box width if it
/// is wider, then scaled down again to the box height if it is still taller.
/// Results are truncated toward zero.
///
/// # Examples
///
/// ```
/// use imagery_core::image_contain_size;
///
/// assert_eq!(image_contain_size(200, 50, 100, 100), (100, 25));
/// assert_eq!(image_contain_size(40, 30, 100, 100), (40, 30));
/// ```
pub fn image_contain_size(
    image_width: u32,
    image_height: u32,
    box_width: u32,
    box_height: u32,
) -> (u32, u32) {
    let mut x = f64::from(image_width);
    let mut y = f64::from(image_height);

    if image_width > box_width {
        let scale = f64::from(box_width) / f64::from(image_width);
        x *= scale;
        y *= scale;
    }
    if y > f64::from(box_height) {
        let scale = f64::from(box_height) / y;
        x *= scale;
        y *= scale;
    }

    (x as u32, y as u32)
}
