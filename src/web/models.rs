// Allow-lists for the upscaler's model identifiers and output scales

use std::fmt;

use serde::Serialize;

use super::error::AppError;

/// Models the external tool is known to ship weights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpscaleModel {
    RealEsrganX4Plus,
    RealEsrnetX4Plus,
    RealEsrganX4PlusAnime6B,
    RealEsrganX2Plus,
    RealEsrAnimeVideoV3,
    RealEsrGeneralX4V3,
}

/// Output scale factor accepted by the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    X2,
    X4,
}

impl UpscaleModel {
    pub const ALL: [UpscaleModel; 6] = [
        UpscaleModel::RealEsrganX4Plus,
        UpscaleModel::RealEsrnetX4Plus,
        UpscaleModel::RealEsrganX4PlusAnime6B,
        UpscaleModel::RealEsrganX2Plus,
        UpscaleModel::RealEsrAnimeVideoV3,
        UpscaleModel::RealEsrGeneralX4V3,
    ];

    pub const DEFAULT: UpscaleModel = UpscaleModel::RealEsrganX4Plus;

    /// Identifier passed to the tool's `-n` flag.
    pub fn id(self) -> &'static str {
        match self {
            UpscaleModel::RealEsrganX4Plus => "RealESRGAN_x4plus",
            UpscaleModel::RealEsrnetX4Plus => "RealESRNet_x4plus",
            UpscaleModel::RealEsrganX4PlusAnime6B => "RealESRGAN_x4plus_anime_6B",
            UpscaleModel::RealEsrganX2Plus => "RealESRGAN_x2plus",
            UpscaleModel::RealEsrAnimeVideoV3 => "realesr-animevideov3",
            UpscaleModel::RealEsrGeneralX4V3 => "realesr-general-x4v3",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UpscaleModel::RealEsrganX4Plus => "General photos (x4)",
            UpscaleModel::RealEsrnetX4Plus => "General photos, less sharpening (x4)",
            UpscaleModel::RealEsrganX4PlusAnime6B => "Anime / illustrations (x4)",
            UpscaleModel::RealEsrganX2Plus => "General photos (x2)",
            UpscaleModel::RealEsrAnimeVideoV3 => "Anime video frames (x4)",
            UpscaleModel::RealEsrGeneralX4V3 => "General photos, small model (x4)",
        }
    }

    pub fn default_scale(self) -> Resolution {
        match self {
            UpscaleModel::RealEsrganX2Plus => Resolution::X2,
            _ => Resolution::X4,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|model| model.id() == value)
    }
}

impl fmt::Display for UpscaleModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl Resolution {
    pub const ALL: [Resolution; 2] = [Resolution::X2, Resolution::X4];

    pub fn factor(self) -> u8 {
        match self {
            Resolution::X2 => 2,
            Resolution::X4 => 4,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|resolution| resolution.factor().to_string() == value)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.factor())
    }
}

/// Validated model/scale pair for one upscale job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpscaleOptions {
    pub model: UpscaleModel,
    pub resolution: Resolution,
}

impl UpscaleOptions {
    /// Check the raw `model` / `resolution` form fields against the allow-lists.
    ///
    /// Blank fields fall back to the default model and that model's default scale.
    pub fn from_form(model: Option<&str>, resolution: Option<&str>) -> Result<Self, AppError> {
        let model = match model.map(str::trim).filter(|m| !m.is_empty()) {
            Some(raw) => UpscaleModel::parse(raw)
                .ok_or_else(|| AppError::invalid(format!("Unsupported model: {raw}")))?,
            None => UpscaleModel::DEFAULT,
        };
        let resolution = match resolution.map(str::trim).filter(|r| !r.is_empty()) {
            Some(raw) => Resolution::parse(raw)
                .ok_or_else(|| AppError::invalid(format!("Unsupported resolution: {raw}")))?,
            None => model.default_scale(),
        };
        Ok(Self { model, resolution })
    }
}

/// Form `<option>` entry for the index page.
#[derive(Debug, Serialize)]
pub struct ModelOption {
    pub id: &'static str,
    pub label: &'static str,
    pub scale: u8,
}

pub fn model_options() -> Vec<ModelOption> {
    UpscaleModel::ALL
        .into_iter()
        .map(|model| ModelOption {
            id: model.id(),
            label: model.label(),
            scale: model.default_scale().factor(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_allowed_pair_validates() {
        for model in UpscaleModel::ALL {
            for resolution in Resolution::ALL {
                let options = UpscaleOptions::from_form(
                    Some(model.id()),
                    Some(&resolution.factor().to_string()),
                )
                .unwrap();
                assert_eq!(options.model, model);
                assert_eq!(options.resolution, resolution);
            }
        }
    }

    #[test]
    fn test_unknown_values_rejected() {
        for (model, resolution) in [
            (Some("RealESRGAN_x8plus"), Some("4")),
            (Some("realesrgan_x4plus"), Some("4")),
            (Some("RealESRGAN_x4plus"), Some("3")),
            (Some("RealESRGAN_x4plus"), Some("8")),
            (Some("RealESRGAN_x4plus"), Some("four")),
            (Some("../../bin/sh"), None),
        ] {
            let err = UpscaleOptions::from_form(model, resolution).unwrap_err();
            assert_eq!(err.status(), hyper::StatusCode::BAD_REQUEST, "{model:?} {resolution:?}");
        }
    }

    #[test]
    fn test_blank_fields_use_defaults() {
        let options = UpscaleOptions::from_form(None, Some("")).unwrap();
        assert_eq!(options.model, UpscaleModel::RealEsrganX4Plus);
        assert_eq!(options.resolution, Resolution::X4);

        let options = UpscaleOptions::from_form(Some("RealESRGAN_x2plus"), None).unwrap();
        assert_eq!(options.resolution, Resolution::X2);
    }

    #[test]
    fn test_model_options_cover_catalog() {
        let options = model_options();
        assert_eq!(options.len(), UpscaleModel::ALL.len());
        assert_eq!(options[0].id, "RealESRGAN_x4plus");
        assert!(options.iter().all(|o| o.scale == 2 || o.scale == 4));
    }
}
