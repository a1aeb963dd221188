//! Role-based authorization decisions.
//!
//! `authorize` is a pure function over plain data: the caller resolves the
//! resource's owning patient through the entity store and passes it in, so
//! no storage lookups happen inside the decision. Every rule is an
//! exhaustive match over [`Role`]; there is no default case.

use crate::model::Role;
use std::collections::HashSet;
use uuid::Uuid;

/// The authenticated identity making a request.
///
/// Profile existence is modelled explicitly: a doctor-role user without a
/// `DoctorProfile` carries `assigned_patients: None` and is denied access
/// to patient resources rather than treated as an error.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: Role,
    /// PatientProfile id, when the actor is a patient with a profile.
    pub patient_profile: Option<Uuid>,
    /// Assignment set of PatientProfile ids, when the actor is a doctor
    /// with a profile.
    pub assigned_patients: Option<HashSet<Uuid>>,
}

/// What the actor is trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

/// The patient a resource resolves to: its profile id plus the owning
/// user's id, so ownership can be checked without another lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatientRef {
    pub profile_id: Uuid,
    pub user_id: Uuid,
}

/// The resource an action targets, resolved to plain data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Schedule(PatientRef),
    Activity(PatientRef),
    Adherence(PatientRef),
    Notification(PatientRef),
    /// A single user record.
    User(Uuid),
    /// The user-management collection (create/list administration).
    Users,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// Decide whether `actor` may perform `action` on `resource`.
pub fn authorize(actor: &Actor, action: Action, resource: &Resource) -> Decision {
    match resource {
        Resource::Schedule(patient)
        | Resource::Adherence(patient)
        | Resource::Notification(patient) => patient_rule(actor, patient),
        Resource::Activity(patient) => {
            // Only the patient or an admin corrects dose logs; doctors may
            // create and read activity but never mutate or remove it.
            if actor.role == Role::Doctor && matches!(action, Action::Update | Action::Delete) {
                return Decision::Deny;
            }
            patient_rule(actor, patient)
        }
        Resource::User(target) => match actor.role {
            Role::Admin => Decision::Allow,
            Role::Patient | Role::Doctor => {
                if *target == actor.user_id && matches!(action, Action::Read | Action::Update) {
                    Decision::Allow
                } else {
                    Decision::Deny
                }
            }
        },
        Resource::Users => match actor.role {
            Role::Admin => Decision::Allow,
            Role::Patient | Role::Doctor => Decision::Deny,
        },
    }
}

fn patient_rule(actor: &Actor, patient: &PatientRef) -> Decision {
    match actor.role {
        Role::Admin => Decision::Allow,
        Role::Patient => {
            if patient.user_id == actor.user_id {
                Decision::Allow
            } else {
                Decision::Deny
            }
        }
        Role::Doctor => match &actor.assigned_patients {
            Some(assigned) if assigned.contains(&patient.profile_id) => Decision::Allow,
            _ => Decision::Deny,
        },
    }
}
