//! Window/level presets and VOI LUT extraction.

use pacs_dictionary_std::tags;
use pacs_object::InMemObject;

/// A named window center/width pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowPreset {
    pub name: &'static str,
    pub center: f64,
    pub width: f64,
}

/// CT presets, in Hounsfield units.
pub static CT_PRESETS: &[WindowPreset] = &[
    WindowPreset {
        name: "Lung",
        center: -600.0,
        width: 1500.0,
    },
    WindowPreset {
        name: "Bone",
        center: 300.0,
        width: 1500.0,
    },
    WindowPreset {
        name: "Abdomen",
        center: 40.0,
        width: 400.0,
    },
    WindowPreset {
        name: "Brain",
        center: 40.0,
        width: 80.0,
    },
    WindowPreset {
        name: "Mediastinum",
        center: 50.0,
        width: 350.0,
    },
];

/// MR presets; MR scaling is relative, so one generic entry.
pub static MR_PRESETS: &[WindowPreset] = &[WindowPreset {
    name: "Default",
    center: 500.0,
    width: 1000.0,
}];

/// X-ray style presets shared by CR/DX/MG/XA.
pub static XRAY_PRESETS: &[WindowPreset] = &[WindowPreset {
    name: "Default",
    center: 2048.0,
    width: 4096.0,
}];

/// The compile-time window presets of a modality.
/// Unknown modalities have none.
pub fn presets_for_modality(modality: &str) -> &'static [WindowPreset] {
    match modality.trim() {
        "CT" => CT_PRESETS,
        "MR" => MR_PRESETS,
        "CR" | "DX" | "MG" | "XA" => XRAY_PRESETS,
        _ => &[],
    }
}

/// The VOI LUT attributes of one object.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VoiLut {
    /// `(0028,1050)` window centers
    pub centers: Vec<f64>,
    /// `(0028,1051)` window widths
    pub widths: Vec<f64>,
    /// `(0028,1055)` window explanations
    pub explanations: Vec<String>,
    /// `(0028,1052)` rescale intercept, default 0
    pub rescale_intercept: f64,
    /// `(0028,1053)` rescale slope, default 1
    pub rescale_slope: f64,
}

/// Extract the VOI LUT attributes from a dataset,
/// or `None` when it has no window values at all.
pub fn voi_lut_of(dataset: &InMemObject) -> Option<VoiLut> {
    let centers = dataset
        .get(tags::WINDOW_CENTER)
        .and_then(|e| e.to_multi_f64().ok())
        .unwrap_or_default();
    let widths = dataset
        .get(tags::WINDOW_WIDTH)
        .and_then(|e| e.to_multi_f64().ok())
        .unwrap_or_default();
    if centers.is_empty() && widths.is_empty() {
        return None;
    }

    let explanations = dataset
        .get(tags::WINDOW_CENTER_WIDTH_EXPLANATION)
        .and_then(|e| e.to_str().ok())
        .map(|s| s.split('\\').map(str::to_owned).collect())
        .unwrap_or_default();

    Some(VoiLut {
        centers,
        widths,
        explanations,
        rescale_intercept: dataset
            .get(tags::RESCALE_INTERCEPT)
            .and_then(|e| e.to_f64().ok())
            .unwrap_or(0.0),
        rescale_slope: dataset
            .get(tags::RESCALE_SLOPE)
            .and_then(|e| e.to_f64().ok())
            .unwrap_or(1.0),
    })
}

#[cfg(test)]
mod tests {
    use super::{presets_for_modality, voi_lut_of};
    use pacs_core::{PrimitiveValue, VR};
    use pacs_dictionary_std::tags;
    use pacs_object::{DataElement, InMemObject};

    #[test]
    fn ct_presets_contain_lung() {
        let presets = presets_for_modality("CT");
        let lung = presets.iter().find(|p| p.name == "Lung").unwrap();
        assert_eq!(lung.center, -600.0);
        assert_eq!(lung.width, 1500.0);
        assert!(presets_for_modality("US").is_empty());
    }

    #[test]
    fn voi_lut_extraction() {
        let mut obj = InMemObject::new_empty();
        obj.put(DataElement::new(
            tags::WINDOW_CENTER,
            VR::DS,
            PrimitiveValue::from(vec!["40".to_owned(), "-600".to_owned()]),
        ));
        obj.put(DataElement::new(
            tags::WINDOW_WIDTH,
            VR::DS,
            PrimitiveValue::from(vec!["400".to_owned(), "1500".to_owned()]),
        ));
        obj.put_str(tags::RESCALE_INTERCEPT, VR::DS, "-1024");

        let voi = voi_lut_of(&obj).unwrap();
        assert_eq!(voi.centers, vec![40.0, -600.0]);
        assert_eq!(voi.widths, vec![400.0, 1500.0]);
        assert_eq!(voi.rescale_intercept, -1024.0);
        assert_eq!(voi.rescale_slope, 1.0);
    }

    #[test]
    fn no_window_values_yields_none() {
        let obj = InMemObject::new_empty();
        assert!(voi_lut_of(&obj).is_none());
    }
}
