//! Skill-based project matching.
//!
//! A project matches a user when any of its role slots requires at least
//! one skill the user knows. Comparison is exact, case-sensitive string
//! equality on skill names. Results keep the caller's scan order; there is
//! no relevance ranking (a deliberate limitation of the matching model).

use std::collections::HashSet;

use crate::models::{RoleSlot, Skill, has_open_role};

/// Collect the names of a user's known skills, dropping empty names.
pub fn known_skill_names(skills: &[Skill]) -> HashSet<String> {
    skills
        .iter()
        .filter(|s| !s.name.is_empty())
        .map(|s| s.name.clone())
        .collect()
}

/// Whether any role's required skills intersect the known-skill set.
/// Role-level OR, skill-level OR: a single shared name anywhere qualifies
/// the whole project.
pub fn project_matches(roles: &[RoleSlot], known: &HashSet<String>) -> bool {
    roles
        .iter()
        .any(|role| role.required_skills.iter().any(|s| known.contains(s)))
}

/// A project is a match candidate iff it still has an open role and at
/// least one role's required skills overlap the user's known skills.
pub fn is_candidate(roles: &[RoleSlot], known: &HashSet<String>) -> bool {
    has_open_role(roles) && project_matches(roles, known)
}
