//! Request resolution before any storage access.

use squad_catalog::{
    jersey_number_for, normalize_position_key, template_for_birth_year, AgeGroupCode, PositionKey,
    Template,
};

use super::{AssignError, PlacementReason, PlacementRequest};

/// One position to try, with the jersey number it occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub position: PositionKey,
    pub jersey_number: u8,
    pub reason: PlacementReason,
}

/// A request with its template, age group and legal positions resolved.
///
/// Only [`PlacementPlan::resolve`] builds one, so there is always at least
/// one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementPlan {
    template: Template,
    age_group: AgeGroupCode,
    first: Candidate,
    fallback: Option<Candidate>,
}

impl PlacementPlan {
    /// Resolves template, age group and positions.
    ///
    /// Keys that exist in the catalog but not in this template are dropped,
    /// so a secondary position can stand in for a primary that only makes
    /// sense in the other template. Fails when no legal key remains.
    pub fn resolve(request: &PlacementRequest) -> Result<Self, AssignError> {
        let template = template_for_birth_year(request.birth_year)?;
        let age_group = AgeGroupCode::for_birth_year(request.birth_year);

        let primary = normalize_position_key(&request.primary_position, template)?;
        let secondary = request
            .secondary_position
            .as_deref()
            .map(|raw| normalize_position_key(raw, template))
            .transpose()?;

        let requested = std::iter::once((primary, PlacementReason::Primary))
            .chain(secondary.map(|key| (key, PlacementReason::Secondary)));

        let mut legal = requested.filter_map(|(position, reason)| {
            jersey_number_for(template, position).map(|jersey_number| Candidate {
                position,
                jersey_number,
                reason,
            })
        });

        let Some(first) = legal.next() else {
            return Err(AssignError::PositionTemplateMismatch {
                template,
                positions: std::iter::once(primary).chain(secondary).collect(),
            });
        };
        let fallback = legal.find(|c| c.position != first.position);

        Ok(Self {
            template,
            age_group,
            first,
            fallback,
        })
    }

    pub fn template(&self) -> Template {
        self.template
    }

    pub fn age_group(&self) -> &AgeGroupCode {
        &self.age_group
    }

    /// Scan order: primary first, then secondary.
    pub fn candidates(&self) -> impl Iterator<Item = &Candidate> {
        std::iter::once(&self.first).chain(self.fallback.as_ref())
    }

    /// Position used when a new squad has to be opened.
    pub fn new_roster_candidate(&self) -> &Candidate {
        &self.first
    }
}
