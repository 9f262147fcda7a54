//! Human label resolution.
//!
//! Labels arrive as free text from registration forms: mixed case, Turkish
//! or English, with or without diacritics. [`fold_label`] reduces a label to
//! a comparison form and [`ALIASES`] maps folded labels to canonical keys.
//! Anything that matches neither an alias nor a canonical key is rejected.

use crate::{CatalogError, PositionKey, Template};

/// A human label that resolves to a canonical key.
///
/// A scoped alias applies only to one template and wins over a global alias
/// with the same label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alias {
    pub label: &'static str,
    pub scope: Option<Template>,
    pub key: PositionKey,
}

const fn global(label: &'static str, key: PositionKey) -> Alias {
    Alias {
        label,
        scope: None,
        key,
    }
}

const fn scoped(label: &'static str, template: Template, key: PositionKey) -> Alias {
    Alias {
        label,
        scope: Some(template),
        key,
    }
}

/// Alias table. Labels are stored in folded form.
pub static ALIASES: &[Alias] = &[
    // Goalkeeper
    global("kaleci", PositionKey::Kaleci),
    global("kale", PositionKey::Kaleci),
    global("goalkeeper", PositionKey::Kaleci),
    global("keeper", PositionKey::Kaleci),
    global("gk", PositionKey::Kaleci),
    // Full backs
    global("sag_bek", PositionKey::SagDef),
    global("sag_defans", PositionKey::SagDef),
    global("right_back", PositionKey::SagDef),
    global("rb", PositionKey::SagDef),
    global("sol_bek", PositionKey::SolDef),
    global("sol_defans", PositionKey::SolDef),
    global("left_back", PositionKey::SolDef),
    global("lb", PositionKey::SolDef),
    // Centre backs
    scoped("stoper", Template::EightASide, PositionKey::Stoper),
    scoped("defans", Template::EightASide, PositionKey::Stoper),
    scoped("centre_back", Template::EightASide, PositionKey::Stoper),
    scoped("center_back", Template::EightASide, PositionKey::Stoper),
    scoped("cb", Template::EightASide, PositionKey::Stoper),
    global("sag_stoper", PositionKey::SagStoper),
    global("right_centre_back", PositionKey::SagStoper),
    global("rcb", PositionKey::SagStoper),
    global("sol_stoper", PositionKey::SolStoper),
    global("left_centre_back", PositionKey::SolStoper),
    global("lcb", PositionKey::SolStoper),
    // Midfield
    global("libero", PositionKey::OnLibero),
    global("on_libero", PositionKey::OnLibero),
    global("defansif_orta_saha", PositionKey::OnLibero),
    global("cdm", PositionKey::OnLibero),
    scoped("orta_saha", Template::EightASide, PositionKey::OrtaSaha),
    scoped("ortasaha", Template::EightASide, PositionKey::OrtaSaha),
    scoped("midfielder", Template::EightASide, PositionKey::OrtaSaha),
    scoped("cm", Template::EightASide, PositionKey::OrtaSaha),
    scoped("orta_saha", Template::ElevenASide, PositionKey::MerkezOrtaSaha),
    scoped("ortasaha", Template::ElevenASide, PositionKey::MerkezOrtaSaha),
    scoped("midfielder", Template::ElevenASide, PositionKey::MerkezOrtaSaha),
    scoped("cm", Template::ElevenASide, PositionKey::MerkezOrtaSaha),
    global("merkez_orta_saha", PositionKey::MerkezOrtaSaha),
    global("on_numara", PositionKey::OnNumara),
    global("10_numara", PositionKey::OnNumara),
    global("ofansif_orta_saha", PositionKey::OnNumara),
    global("cam", PositionKey::OnNumara),
    // Wings
    global("sag_kanat", PositionKey::SagKanat),
    global("sag_acik", PositionKey::SagKanat),
    global("right_wing", PositionKey::SagKanat),
    global("rw", PositionKey::SagKanat),
    global("sol_kanat", PositionKey::SolKanat),
    global("sol_acik", PositionKey::SolKanat),
    global("left_wing", PositionKey::SolKanat),
    global("lw", PositionKey::SolKanat),
    // Forwards
    global("santrfor", PositionKey::Santrfor),
    global("santrafor", PositionKey::Santrfor),
    global("forvet", PositionKey::Santrfor),
    global("striker", PositionKey::Santrfor),
    global("st", PositionKey::Santrfor),
];

/// Reduces a label to its comparison form.
///
/// Trims, lowercases, maps Turkish letters to their ASCII base, drops the
/// combining dot above, and joins words with a single `_`.
pub fn fold_label(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut separator = false;

    for c in raw.trim().chars() {
        if c.is_whitespace() || matches!(c, '-' | '_' | '.' | '/') {
            separator = true;
            continue;
        }

        let base = match c {
            '\u{0307}' => continue,
            'ç' | 'Ç' => 'c',
            'ğ' | 'Ğ' => 'g',
            'ı' | 'İ' | 'î' | 'Î' => 'i',
            'ö' | 'Ö' => 'o',
            'ş' | 'Ş' => 's',
            'ü' | 'Ü' | 'û' | 'Û' => 'u',
            'â' | 'Â' => 'a',
            other => other,
        };

        if separator && !out.is_empty() {
            out.push('_');
        }
        separator = false;
        out.extend(base.to_lowercase());
    }

    out
}

/// Resolves a raw label to a canonical key.
///
/// Resolution order: a template-scoped alias, a global alias, then the input
/// read as a canonical key. The result is not checked against `template`;
/// callers decide what an illegal-for-template key means for them via
/// [`crate::validate_position_for_template`].
pub fn normalize_position_key(raw: &str, template: Template) -> Result<PositionKey, CatalogError> {
    let folded = fold_label(raw);

    if !folded.is_empty() {
        let alias = ALIASES
            .iter()
            .find(|a| a.label == folded && a.scope == Some(template))
            .or_else(|| {
                ALIASES
                    .iter()
                    .find(|a| a.label == folded && a.scope.is_none())
            });
        if let Some(alias) = alias {
            return Ok(alias.key);
        }

        if let Some(key) = PositionKey::from_canonical(&raw.trim().to_uppercase()) {
            return Ok(key);
        }

        if let Some(key) = PositionKey::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(&folded))
        {
            return Ok(key);
        }
    }

    Err(CatalogError::InvalidPosition {
        input: raw.to_string(),
        template,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::{positions_for_template, validate_position_for_template};
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("Kaleci", "kaleci")]
    #[case("  KALECİ ", "kaleci")]
    #[case("kaleci\u{0307}", "kaleci")]
    #[case("Sağ Bek", "sag_bek")]
    #[case("sol-açık", "sol_acik")]
    #[case("Ofansif  Orta Saha", "ofansif_orta_saha")]
    #[case("SAĞ_STOPER", "sag_stoper")]
    #[case("   ", "")]
    fn test_fold_label(#[case] raw: &str, #[case] folded: &str) {
        assert_eq!(fold_label(raw), folded);
    }

    #[rstest]
    #[case("kaleci", Template::EightASide, PositionKey::Kaleci)]
    #[case("KALECİ", Template::ElevenASide, PositionKey::Kaleci)]
    #[case("kaleci̇", Template::EightASide, PositionKey::Kaleci)]
    #[case("Sağ Bek", Template::ElevenASide, PositionKey::SagDef)]
    #[case("sag_def", Template::EightASide, PositionKey::SagDef)]
    #[case("Orta Saha", Template::EightASide, PositionKey::OrtaSaha)]
    #[case("Orta Saha", Template::ElevenASide, PositionKey::MerkezOrtaSaha)]
    #[case("stoper", Template::EightASide, PositionKey::Stoper)]
    #[case("stoper", Template::ElevenASide, PositionKey::Stoper)]
    #[case("Santrafor", Template::EightASide, PositionKey::Santrfor)]
    #[case("10 Numara", Template::ElevenASide, PositionKey::OnNumara)]
    #[case("GK", Template::ElevenASide, PositionKey::Kaleci)]
    fn test_normalize_labels(
        #[case] raw: &str,
        #[case] template: Template,
        #[case] expected: PositionKey,
    ) {
        assert_eq!(normalize_position_key(raw, template).unwrap(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("pivot")]
    #[case("KALECI_2")]
    #[case("sag")]
    fn test_normalize_rejects_unknown(#[case] raw: &str) {
        for template in Template::ALL {
            assert_eq!(
                normalize_position_key(raw, template).unwrap_err(),
                CatalogError::InvalidPosition {
                    input: raw.to_string(),
                    template,
                }
            );
        }
    }

    #[test]
    fn test_normalize_other_template_key_is_not_an_error() {
        // Legality is checked separately so the caller can fall back.
        let key = normalize_position_key("ON_LIBERO", Template::EightASide).unwrap();
        assert_eq!(key, PositionKey::OnLibero);
        assert!(!validate_position_for_template(key, Template::EightASide));
    }

    #[test]
    fn test_alias_labels_are_folded() {
        for alias in ALIASES {
            assert_eq!(fold_label(alias.label), alias.label, "{alias:?}");
        }
    }

    #[test]
    fn test_alias_labels_unique_per_scope() {
        let mut seen = HashSet::new();
        for alias in ALIASES {
            assert!(seen.insert((alias.label, alias.scope)), "duplicate {alias:?}");
        }
    }

    #[test]
    fn test_scoped_aliases_target_legal_keys() {
        for alias in ALIASES {
            if let Some(template) = alias.scope {
                assert!(
                    validate_position_for_template(alias.key, template),
                    "{alias:?} points outside its template"
                );
            }
        }
    }

    #[test]
    fn test_canonical_keys_normalize_to_themselves() {
        for template in Template::ALL {
            for slot in positions_for_template(template) {
                let key = slot.position;
                assert_eq!(normalize_position_key(key.as_str(), template).unwrap(), key);
                assert_eq!(
                    normalize_position_key(&key.as_str().to_lowercase(), template).unwrap(),
                    key
                );
            }
        }
    }

    proptest! {
        #[test]
        fn prop_normalize_idempotent_on_canonical(
            template in prop_oneof![Just(Template::EightASide), Just(Template::ElevenASide)],
            index in 0usize..11,
            padding in " {0,3}",
        ) {
            let slots = positions_for_template(template);
            let key = slots[index % slots.len()].position;
            let raw = format!("{padding}{}{padding}", key.as_str());
            prop_assert_eq!(normalize_position_key(&raw, template).unwrap(), key);
        }

        #[test]
        fn prop_normalize_is_total(raw in "\\PC{0,24}") {
            for template in Template::ALL {
                match normalize_position_key(&raw, template) {
                    Ok(key) => prop_assert!(PositionKey::ALL.contains(&key)),
                    Err(CatalogError::InvalidPosition { input, .. }) => prop_assert_eq!(input, raw.clone()),
                    Err(other) => prop_assert!(false, "unexpected error {other:?}"),
                }
            }
        }
    }
}
