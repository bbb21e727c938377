pub mod errors;
pub mod validation;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    Blur,
    Rotate,
    Resize,
    Crop,
    Grayscale,
    ToPdf,
    SuperResolution,
    Draw,
    ImageCaptioning,
    BackgroundRemoval,
    ObjectDetection,
}

impl Operation {
    pub const ALL: [Self; 11] = [
        Self::Blur,
        Self::Rotate,
        Self::Resize,
        Self::Crop,
        Self::Grayscale,
        Self::ToPdf,
        Self::SuperResolution,
        Self::Draw,
        Self::ImageCaptioning,
        Self::BackgroundRemoval,
        Self::ObjectDetection,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blur => "blur",
            Self::Rotate => "rotate",
            Self::Resize => "resize",
            Self::Crop => "crop",
            Self::Grayscale => "grayscale",
            Self::ToPdf => "to_pdf",
            Self::SuperResolution => "super_resolution",
            Self::Draw => "draw",
            Self::ImageCaptioning => "image_captioning",
            Self::BackgroundRemoval => "background_removal",
            Self::ObjectDetection => "object_detection",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        let token = token.trim();
        Self::ALL.into_iter().find(|op| op.as_str() == token)
    }

    /// Operations answered by an external API instead of a local transform.
    pub fn is_remote(self) -> bool {
        matches!(
            self,
            Self::ImageCaptioning | Self::BackgroundRemoval | Self::ObjectDetection
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Counter-clockwise rotation in whole degrees, `0..=360`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationAngle(u16);

impl RotationAngle {
    pub const MAX: i64 = 360;

    pub fn new(degrees: i64) -> Option<Self> {
        if (0..=Self::MAX).contains(&degrees) {
            u16::try_from(degrees).ok().map(Self)
        } else {
            None
        }
    }

    pub fn degrees(self) -> u16 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlurIntensity(u8);

impl BlurIntensity {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 55;
    pub const DEFAULT: Self = Self(15);

    pub fn new(value: i64) -> Option<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            u8::try_from(value).ok().map(Self)
        } else {
            None
        }
    }

    /// The value as submitted, before odd promotion.
    pub fn value(self) -> u8 {
        self.0
    }

    /// Gaussian radius actually applied: even values move up to the next odd
    /// one. `MAX` is odd, so the promoted radius never exceeds it.
    pub fn kernel_radius(self) -> u8 {
        if self.0 % 2 == 0 {
            self.0 + 1
        } else {
            self.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleFactor {
    Half,
    Original,
    OneAndHalf,
    Double,
    Triple,
}

impl ScaleFactor {
    pub const ALL: [Self; 5] = [
        Self::Half,
        Self::Original,
        Self::OneAndHalf,
        Self::Double,
        Self::Triple,
    ];

    pub fn percent(self) -> u32 {
        match self {
            Self::Half => 50,
            Self::Original => 100,
            Self::OneAndHalf => 150,
            Self::Double => 200,
            Self::Triple => 300,
        }
    }

    pub fn from_percent(percent: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|scale| scale.percent() == percent)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub top: u32,
    pub left: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// True when the rectangle lies fully inside a `width x height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        u64::from(self.left) + u64::from(self.width) <= u64::from(width)
            && u64::from(self.top) + u64::from(self.height) <= u64::from(height)
    }
}

/// A validated request. Each variant carries only the parameters its
/// operation reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationRequest {
    Blur { intensity: BlurIntensity },
    Rotate { angle: RotationAngle },
    Resize { scale: ScaleFactor },
    Crop(CropRect),
    Grayscale,
    ToPdf,
    SuperResolution,
    Draw,
    ImageCaptioning,
    BackgroundRemoval,
    ObjectDetection,
}

impl OperationRequest {
    pub fn operation(&self) -> Operation {
        match self {
            Self::Blur { .. } => Operation::Blur,
            Self::Rotate { .. } => Operation::Rotate,
            Self::Resize { .. } => Operation::Resize,
            Self::Crop(_) => Operation::Crop,
            Self::Grayscale => Operation::Grayscale,
            Self::ToPdf => Operation::ToPdf,
            Self::SuperResolution => Operation::SuperResolution,
            Self::Draw => Operation::Draw,
            Self::ImageCaptioning => Operation::ImageCaptioning,
            Self::BackgroundRemoval => Operation::BackgroundRemoval,
            Self::ObjectDetection => Operation::ObjectDetection,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_operation_token_round_trips() {
        for op in Operation::ALL {
            assert_eq!(Operation::parse(op.as_str()), Some(op));
        }
        assert_eq!(Operation::parse(" crop "), Some(Operation::Crop));
        assert_eq!(Operation::parse("sharpen"), None);
        assert_eq!(Operation::parse("Crop"), None);
    }

    #[test]
    fn only_ai_operations_are_remote() {
        let remote = Operation::ALL
            .into_iter()
            .filter(|op| op.is_remote())
            .collect::<Vec<_>>();
        assert_eq!(
            remote,
            vec![
                Operation::ImageCaptioning,
                Operation::BackgroundRemoval,
                Operation::ObjectDetection
            ]
        );
    }

    #[test]
    fn blur_radius_promotes_even_values_without_exceeding_max() {
        assert_eq!(BlurIntensity::new(10).map(BlurIntensity::kernel_radius), Some(11));
        assert_eq!(BlurIntensity::new(11).map(BlurIntensity::kernel_radius), Some(11));
        assert_eq!(BlurIntensity::new(54).map(BlurIntensity::kernel_radius), Some(55));
        assert_eq!(BlurIntensity::new(55).map(BlurIntensity::kernel_radius), Some(55));
        assert_eq!(BlurIntensity::new(0), None);
        assert_eq!(BlurIntensity::new(56), None);
    }

    #[test]
    fn rotation_angle_accepts_inclusive_range() {
        assert_eq!(RotationAngle::new(0).map(RotationAngle::degrees), Some(0));
        assert_eq!(RotationAngle::new(360).map(RotationAngle::degrees), Some(360));
        assert_eq!(RotationAngle::new(-1), None);
        assert_eq!(RotationAngle::new(450), None);
    }

    #[test]
    fn crop_containment_uses_wide_arithmetic() {
        let rect = CropRect {
            top: 0,
            left: u32::MAX,
            width: 2,
            height: 1,
        };
        assert!(!rect.fits_within(u32::MAX, 10));

        let full = CropRect {
            top: 0,
            left: 0,
            width: 40,
            height: 30,
        };
        assert!(full.fits_within(40, 30));
        assert!(!full.fits_within(39, 30));
    }
}
