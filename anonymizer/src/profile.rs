//! The supported de-identification profiles.

use std::fmt;
use std::str::FromStr;

/// A de-identification profile, selecting a table of tag actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnonymizationProfile {
    /// Remove or replace direct identifiers; remap UIDs.
    Basic,
    /// Basic, with a warning on pixel data that may carry
    /// burned-in annotations (the pixels are not modified here).
    CleanPixel,
    /// Basic, plus emptying of free-text description fields.
    CleanDescriptions,
    /// Basic, with dates shifted instead of removed so temporal
    /// relationships survive.
    RetainLongitudinal,
    /// Basic, keeping demographic characteristics
    /// (sex, age, size, weight).
    RetainPatientCharacteristics,
    /// HIPAA Safe Harbor: the 18 identifier categories
    /// of 45 CFR 164.514(b)(2).
    HipaaSafeHarbor,
    /// GDPR-style pseudonymization: hashed identifiers that stay
    /// linkable through a separately held mapping.
    GdprCompliant,
}

impl AnonymizationProfile {
    /// The configuration name of this profile.
    pub fn name(self) -> &'static str {
        use AnonymizationProfile::*;
        match self {
            Basic => "basic",
            CleanPixel => "clean_pixel",
            CleanDescriptions => "clean_descriptions",
            RetainLongitudinal => "retain_longitudinal",
            RetainPatientCharacteristics => "retain_patient_characteristics",
            HipaaSafeHarbor => "hipaa_safe_harbor",
            GdprCompliant => "gdpr_compliant",
        }
    }
}

impl FromStr for AnonymizationProfile {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use AnonymizationProfile::*;
        match s {
            "basic" => Ok(Basic),
            "clean_pixel" => Ok(CleanPixel),
            "clean_descriptions" => Ok(CleanDescriptions),
            "retain_longitudinal" => Ok(RetainLongitudinal),
            "retain_patient_characteristics" => Ok(RetainPatientCharacteristics),
            "hipaa_safe_harbor" => Ok(HipaaSafeHarbor),
            "gdpr_compliant" => Ok(GdprCompliant),
            _ => Err("no such anonymization profile"),
        }
    }
}

impl fmt::Display for AnonymizationProfile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::AnonymizationProfile;

    #[test]
    fn names_round_trip() {
        for &profile in &[
            AnonymizationProfile::Basic,
            AnonymizationProfile::CleanPixel,
            AnonymizationProfile::HipaaSafeHarbor,
            AnonymizationProfile::GdprCompliant,
        ] {
            assert_eq!(profile.name().parse::<AnonymizationProfile>(), Ok(profile));
        }
        assert!("bogus".parse::<AnonymizationProfile>().is_err());
    }
}
