use image::Rgba;
use palette::{Hsl, IntoColor, LinSrgb, Mix, Srgb};

/// Primary series colour.
pub const ACCENT: Rgba<u8> = Rgba([31, 119, 180, 255]);

/// Ends of the diverging scale.
const COLD: (f32, f32, f32) = (0.23, 0.30, 0.75);
const WARM: (f32, f32, f32) = (0.71, 0.02, 0.15);

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Rgba<u8>> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Rgba([
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
                255,
            ])
        })
        .collect()
}

/// Diverging blue-white-red colour for a value in [-1, 1].
///
/// Interpolates in linear RGB so the midpoint stays neutral.
pub fn diverging(value: f64) -> Rgba<u8> {
    let t = value.clamp(-1.0, 1.0) as f32;
    let end = if t < 0.0 { COLD } else { WARM };
    let white: LinSrgb = Srgb::new(1.0f32, 1.0, 1.0).into_linear();
    let end: LinSrgb = Srgb::new(end.0, end.1, end.2).into_linear();
    let rgb: Srgb = Srgb::from_linear(white.mix(end, t.abs()));
    Rgba([
        (rgb.red * 255.0).round() as u8,
        (rgb.green * 255.0).round() as u8,
        (rgb.blue * 255.0).round() as u8,
        255,
    ])
}

/// Same colour with a new alpha.
pub fn with_alpha(color: Rgba<u8>, alpha: u8) -> Rgba<u8> {
    Rgba([color[0], color[1], color[2], alpha])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_is_distinct() {
        let colors = generate_palette(6);
        assert_eq!(colors.len(), 6);
        for (i, a) in colors.iter().enumerate() {
            for b in &colors[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn test_diverging_ends() {
        assert_eq!(diverging(0.0), Rgba([255, 255, 255, 255]));
        let cold = diverging(-1.0);
        let warm = diverging(1.0);
        assert!(cold[2] > cold[0]);
        assert!(warm[0] > warm[2]);
        // clamped
        assert_eq!(diverging(5.0), warm);
    }
}
