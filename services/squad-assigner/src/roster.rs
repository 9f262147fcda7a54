//! Squad creation rules.
//!
//! New squads take the letter after the highest existing instance in their
//! partition. Two writers that compute the same letter are separated by the
//! `(age_group_code, template, instance)` unique constraint; the loser gets
//! [`StoreError::RosterInstanceConflict`] and restarts its placement.

use squad_catalog::{AgeGroupCode, Template};

use crate::db::{StoreError, StoreResult};

/// First instance letter of a partition.
pub const FIRST_INSTANCE: char = 'A';

/// Last instance letter of a partition.
pub const LAST_INSTANCE: char = 'Z';

/// Computes the instance letter after `highest`.
///
/// Past `Z` there is no defined successor and the partition is reported as
/// exhausted.
pub fn next_instance(
    highest: Option<char>,
    age_group: &AgeGroupCode,
    template: Template,
) -> StoreResult<char> {
    let exhausted = || StoreError::RosterInstancesExhausted {
        age_group: age_group.clone(),
        template,
    };

    match highest {
        None => Ok(FIRST_INSTANCE),
        Some(LAST_INSTANCE) => Err(exhausted()),
        Some(c) if c.is_ascii_uppercase() => Ok((c as u8 + 1) as char),
        Some(c) => Err(StoreError::corrupt(
            "squads",
            format!("instance '{c}' is not an uppercase letter"),
        )),
    }
}

/// Display name of a squad, e.g. `U2015 8v8 A`.
pub fn roster_name(age_group: &AgeGroupCode, template: Template, instance: char) -> String {
    format!("{} {} {}", age_group, template.label(), instance)
}

/// Picks the highest instance letter among existing squads.
pub fn highest_instance<I>(instances: I) -> Option<char>
where
    I: IntoIterator<Item = char>,
{
    instances.into_iter().max()
}
