//! Squad templates and age group codes.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::CatalogError;

/// Birth years that play in eleven-a-side squads.
pub const ELEVEN_A_SIDE_YEARS: RangeInclusive<i32> = 2006..=2013;

/// Birth years that play in eight-a-side squads.
pub const EIGHT_A_SIDE_YEARS: RangeInclusive<i32> = 2014..=2018;

/// The fixed shape a squad follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Template {
    EightASide,
    ElevenASide,
}

impl Template {
    pub const ALL: [Template; 2] = [Template::EightASide, Template::ElevenASide];

    /// Stable storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Template::EightASide => "eight_a_side",
            Template::ElevenASide => "eleven_a_side",
        }
    }

    /// Short label used in squad display names.
    pub fn label(&self) -> &'static str {
        match self {
            Template::EightASide => "8v8",
            Template::ElevenASide => "11v11",
        }
    }

    /// Number of slots in a squad of this template.
    pub fn capacity(&self) -> usize {
        crate::positions_for_template(*self).len()
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Template {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "eight_a_side" => Ok(Template::EightASide),
            "eleven_a_side" => Ok(Template::ElevenASide),
            other => Err(format!("unknown template '{other}'")),
        }
    }
}

/// Selects the template for a birth year.
///
/// Years outside both ranges are rejected; there is no fallback template.
pub fn template_for_birth_year(year: i32) -> Result<Template, CatalogError> {
    if ELEVEN_A_SIDE_YEARS.contains(&year) {
        Ok(Template::ElevenASide)
    } else if EIGHT_A_SIDE_YEARS.contains(&year) {
        Ok(Template::EightASide)
    } else {
        Err(CatalogError::UnsupportedBirthYear { year })
    }
}

/// Partition key for squads and assignments, `U{birth_year}`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgeGroupCode(String);

impl AgeGroupCode {
    /// Formats the code for a birth year. The year is not validated here.
    pub fn for_birth_year(year: i32) -> Self {
        Self(format!("U{year}"))
    }

    /// Wraps a code read back from storage.
    pub fn from_stored(code: String) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AgeGroupCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case(2006, Template::ElevenASide)]
    #[case(2010, Template::ElevenASide)]
    #[case(2013, Template::ElevenASide)]
    #[case(2014, Template::EightASide)]
    #[case(2018, Template::EightASide)]
    fn test_template_for_birth_year(#[case] year: i32, #[case] expected: Template) {
        assert_eq!(template_for_birth_year(year).unwrap(), expected);
    }

    #[rstest]
    #[case(2005)]
    #[case(2019)]
    #[case(0)]
    fn test_template_for_birth_year_out_of_range(#[case] year: i32) {
        assert_eq!(
            template_for_birth_year(year).unwrap_err(),
            CatalogError::UnsupportedBirthYear { year }
        );
    }

    #[test]
    fn test_age_group_code_format() {
        assert_eq!(AgeGroupCode::for_birth_year(2015).as_str(), "U2015");
    }

    #[test]
    fn test_template_string_roundtrip() {
        for template in Template::ALL {
            assert_eq!(template.as_str().parse::<Template>().unwrap(), template);
            let json = serde_json::to_string(&template).unwrap();
            assert_eq!(json, format!("\"{}\"", template.as_str()));
        }
    }

    #[test]
    fn test_capacity_matches_slot_tables() {
        assert_eq!(Template::EightASide.capacity(), 8);
        assert_eq!(Template::ElevenASide.capacity(), 11);
    }

    proptest! {
        #[test]
        fn prop_supported_years_have_unique_jerseys(
            year in prop_oneof![ELEVEN_A_SIDE_YEARS, EIGHT_A_SIDE_YEARS]
        ) {
            let template = template_for_birth_year(year).unwrap();
            let slots = crate::positions_for_template(template);
            prop_assert!(!slots.is_empty());
            let jerseys: std::collections::HashSet<_> =
                slots.iter().map(|s| s.jersey_number).collect();
            prop_assert_eq!(jerseys.len(), slots.len());
        }

        #[test]
        fn prop_unsupported_years_fail(
            year in prop_oneof![i32::MIN..2006, 2019..i32::MAX]
        ) {
            prop_assert_eq!(
                template_for_birth_year(year),
                Err(CatalogError::UnsupportedBirthYear { year })
            );
        }
    }
}
