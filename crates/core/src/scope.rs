//! Access-scoped queries.
//!
//! List endpoints never run per-record authorization; instead the actor is
//! reduced to a [`Scope`] and the store filters by it. The scope must agree
//! with [`authorize`](crate::authz::authorize): a record is visible in a
//! scoped list exactly when a read of that record would be allowed. The
//! consistency test at the bottom of this file checks that directly.

use crate::authz::Actor;
use crate::model::Role;
use std::collections::HashSet;
use uuid::Uuid;

/// The set of patients whose records an actor may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Every record (admin).
    All,
    /// Records of the actor's own PatientProfile.
    Own(Uuid),
    /// Records of the patients in a doctor's assignment set.
    Assigned(HashSet<Uuid>),
    /// No records: the actor has no profile to anchor visibility.
    Empty,
}

impl Scope {
    /// Whether records owned by `patient_id` fall inside this scope.
    pub fn contains(&self, patient_id: Uuid) -> bool {
        match self {
            Scope::All => true,
            Scope::Own(own) => *own == patient_id,
            Scope::Assigned(assigned) => assigned.contains(&patient_id),
            Scope::Empty => false,
        }
    }
}

/// Reduce an actor to its visibility scope.
pub fn scope_for(actor: &Actor) -> Scope {
    match actor.role {
        Role::Admin => Scope::All,
        Role::Patient => match actor.patient_profile {
            Some(profile_id) => Scope::Own(profile_id),
            None => Scope::Empty,
        },
        Role::Doctor => match &actor.assigned_patients {
            Some(assigned) => Scope::Assigned(assigned.clone()),
            None => Scope::Empty,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::{authorize, Action, Decision, PatientRef, Resource};

    struct SamplePatient {
        profile_id: Uuid,
        user_id: Uuid,
    }

    fn sample_patients() -> Vec<SamplePatient> {
        (0..4)
            .map(|_| SamplePatient {
                profile_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
            })
            .collect()
    }

    fn sample_actors(patients: &[SamplePatient]) -> Vec<Actor> {
        vec![
            // admin
            Actor {
                user_id: Uuid::new_v4(),
                role: Role::Admin,
                patient_profile: None,
                assigned_patients: None,
            },
            // patient owning patients[0]
            Actor {
                user_id: patients[0].user_id,
                role: Role::Patient,
                patient_profile: Some(patients[0].profile_id),
                assigned_patients: None,
            },
            // patient-role user without a profile
            Actor {
                user_id: Uuid::new_v4(),
                role: Role::Patient,
                patient_profile: None,
                assigned_patients: None,
            },
            // doctor assigned to patients[1] and patients[2]
            Actor {
                user_id: Uuid::new_v4(),
                role: Role::Doctor,
                patient_profile: None,
                assigned_patients: Some(
                    [patients[1].profile_id, patients[2].profile_id]
                        .into_iter()
                        .collect(),
                ),
            },
            // doctor without a profile
            Actor {
                user_id: Uuid::new_v4(),
                role: Role::Doctor,
                patient_profile: None,
                assigned_patients: None,
            },
        ]
    }

    #[test]
    fn scope_agrees_with_authorize_for_every_role() {
        let patients = sample_patients();
        for actor in sample_actors(&patients) {
            let scope = scope_for(&actor);
            for patient in &patients {
                let reference = PatientRef {
                    profile_id: patient.profile_id,
                    user_id: patient.user_id,
                };
                let in_scope = scope.contains(patient.profile_id);
                let allowed = authorize(&actor, Action::Read, &Resource::Schedule(reference))
                    == Decision::Allow;
                assert_eq!(
                    in_scope, allowed,
                    "scope and authorize disagree for role {:?} on patient {}",
                    actor.role, patient.profile_id
                );
            }
        }
    }

    #[test]
    fn doctor_without_profile_sees_nothing() {
        let actor = Actor {
            user_id: Uuid::new_v4(),
            role: Role::Doctor,
            patient_profile: None,
            assigned_patients: None,
        };
        assert_eq!(scope_for(&actor), Scope::Empty);
        assert!(!scope_for(&actor).contains(Uuid::new_v4()));
    }

    #[test]
    fn admin_sees_everything() {
        let actor = Actor {
            user_id: Uuid::new_v4(),
            role: Role::Admin,
            patient_profile: None,
            assigned_patients: None,
        };
        assert_eq!(scope_for(&actor), Scope::All);
        assert!(scope_for(&actor).contains(Uuid::new_v4()));
    }
}
