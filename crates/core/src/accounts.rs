//! Account registration, login, and profile self-service.
//!
//! Registration creates a User plus exactly one profile matching the
//! declared role; admins get no profile. Role is fixed at creation —
//! there is no migration path between roles.

use crate::error::{AdherenceError, AdherenceResult};
use crate::model::{DoctorProfile, PatientProfile, Role, User};
use crate::store::EntityStore;
use crate::tokens::TokenService;
use crate::{EmailAddress, NonEmptyText};
use chrono::NaiveDate;
use uuid::Uuid;

/// Input for registering a new account. Role-conditional fields are
/// ignored when they don't match the declared role.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: NonEmptyText,
    pub email: EmailAddress,
    pub password: String,
    pub role: Role,
    pub date_of_birth: Option<NaiveDate>,
    pub medical_history: Option<String>,
    pub specialization: Option<String>,
}

/// Fields a user may change on their own account and role profile.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub email: Option<EmailAddress>,
    pub date_of_birth: Option<NaiveDate>,
    pub medical_history: Option<String>,
    pub specialization: Option<String>,
    /// Replacement assignment set for a doctor profile.
    pub patients: Option<Vec<Uuid>>,
}

/// Creates a user and its role profile. Returns the stored user.
pub fn register(
    store: &EntityStore,
    tokens: &TokenService,
    account: NewAccount,
) -> AdherenceResult<User> {
    if account.password.trim().is_empty() {
        return Err(AdherenceError::Validation("password is required".into()));
    }

    let user = User {
        id: Uuid::new_v4(),
        username: account.username.as_str().to_owned(),
        email: account.email,
        password_hash: tokens.hash_password(&account.password)?,
        role: account.role,
    };
    store.insert_user(user.clone())?;

    match account.role {
        Role::Patient => {
            store.insert_patient_profile(PatientProfile {
                id: Uuid::new_v4(),
                user_id: user.id,
                date_of_birth: account.date_of_birth,
                medical_history: account.medical_history.unwrap_or_default(),
            })?;
        }
        Role::Doctor => {
            store.insert_doctor_profile(DoctorProfile {
                id: Uuid::new_v4(),
                user_id: user.id,
                specialization: account.specialization.unwrap_or_default(),
                patients: Vec::new(),
            })?;
        }
        Role::Admin => {}
    }

    Ok(user)
}

/// Checks credentials and returns the user on success.
pub fn authenticate(
    store: &EntityStore,
    tokens: &TokenService,
    username: &str,
    password: &str,
) -> AdherenceResult<User> {
    let user = store
        .user_by_username(username)
        .ok_or_else(|| AdherenceError::Auth("invalid credentials".into()))?;
    if !tokens.verify_password(password, &user.password_hash) {
        return Err(AdherenceError::Auth("invalid credentials".into()));
    }
    Ok(user)
}

/// Applies an account and role-profile update for `user_id` and returns
/// the updated user. Used both for self-service and by admin user
/// management.
///
/// Role-conditional fields only apply to the matching profile; a patient
/// sending `specialization` simply has it ignored, as does a doctor
/// sending patient fields.
pub fn update_profile(
    store: &EntityStore,
    user_id: Uuid,
    update: ProfileUpdate,
) -> AdherenceResult<User> {
    let mut user = store
        .user(user_id)
        .ok_or_else(|| AdherenceError::NotFound("user not found".into()))?;

    if let Some(email) = update.email {
        user.email = email;
        store.update_user(user.clone())?;
    }

    match user.role {
        Role::Patient => {
            if let Some(mut profile) = store.patient_profile_for_user(user.id) {
                if let Some(dob) = update.date_of_birth {
                    profile.date_of_birth = Some(dob);
                }
                if let Some(history) = update.medical_history {
                    profile.medical_history = history;
                }
                store.update_patient_profile(profile)?;
            }
        }
        Role::Doctor => {
            if let Some(mut profile) = store.doctor_profile_for_user(user.id) {
                if let Some(specialization) = update.specialization {
                    profile.specialization = specialization;
                }
                if let Some(patients) = update.patients {
                    profile.patients = patients;
                }
                store.update_doctor_profile(profile)?;
            }
        }
        Role::Admin => {}
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use tempfile::TempDir;

    fn fixtures() -> (EntityStore, TokenService, TempDir) {
        let dir = TempDir::new().unwrap();
        let cfg = CoreConfig::new(
            dir.path().to_path_buf(),
            NonEmptyText::new("test-secret").unwrap(),
            3600,
            604800,
        )
        .unwrap();
        let store = EntityStore::open(&cfg).unwrap();
        let tokens = TokenService::new(&cfg);
        (store, tokens, dir)
    }

    fn account(username: &str, role: Role) -> NewAccount {
        NewAccount {
            username: NonEmptyText::new(username).unwrap(),
            email: EmailAddress::parse(format!("{username}@example.com")).unwrap(),
            password: "hunter2hunter2".into(),
            role,
            date_of_birth: None,
            medical_history: None,
            specialization: None,
        }
    }

    #[test]
    fn registering_a_patient_creates_exactly_a_patient_profile() {
        let (store, tokens, _dir) = fixtures();
        let user = register(&store, &tokens, account("alice", Role::Patient)).unwrap();

        assert!(store.patient_profile_for_user(user.id).is_some());
        assert!(store.doctor_profile_for_user(user.id).is_none());
    }

    #[test]
    fn registering_a_doctor_creates_exactly_a_doctor_profile() {
        let (store, tokens, _dir) = fixtures();
        let mut input = account("bob", Role::Doctor);
        input.specialization = Some("cardiology".into());
        let user = register(&store, &tokens, input).unwrap();

        let profile = store.doctor_profile_for_user(user.id).unwrap();
        assert_eq!(profile.specialization, "cardiology");
        assert!(profile.patients.is_empty());
        assert!(store.patient_profile_for_user(user.id).is_none());
    }

    #[test]
    fn registering_an_admin_creates_no_profile() {
        let (store, tokens, _dir) = fixtures();
        let user = register(&store, &tokens, account("root", Role::Admin)).unwrap();

        assert!(store.patient_profile_for_user(user.id).is_none());
        assert!(store.doctor_profile_for_user(user.id).is_none());
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let (store, tokens, _dir) = fixtures();
        register(&store, &tokens, account("alice", Role::Patient)).unwrap();

        let err = register(&store, &tokens, account("alice", Role::Doctor))
            .expect_err("duplicate username should fail");
        assert!(matches!(err, AdherenceError::Validation(_)));
    }

    #[test]
    fn blank_password_is_rejected() {
        let (store, tokens, _dir) = fixtures();
        let mut input = account("alice", Role::Patient);
        input.password = "   ".into();

        let err = register(&store, &tokens, input).expect_err("blank password should fail");
        assert!(matches!(err, AdherenceError::Validation(_)));
    }

    #[test]
    fn authenticate_checks_password() {
        let (store, tokens, _dir) = fixtures();
        register(&store, &tokens, account("alice", Role::Patient)).unwrap();

        assert!(authenticate(&store, &tokens, "alice", "hunter2hunter2").is_ok());
        let err = authenticate(&store, &tokens, "alice", "wrong")
            .expect_err("wrong password should fail");
        assert!(matches!(err, AdherenceError::Auth(_)));
        let err = authenticate(&store, &tokens, "nobody", "hunter2hunter2")
            .expect_err("unknown user should fail");
        assert!(matches!(err, AdherenceError::Auth(_)));
    }

    #[test]
    fn profile_update_applies_role_matching_fields() {
        let (store, tokens, _dir) = fixtures();
        let patient = register(&store, &tokens, account("alice", Role::Patient)).unwrap();

        let updated = update_profile(
            &store,
            patient.id,
            ProfileUpdate {
                email: Some(EmailAddress::parse("new@example.com").unwrap()),
                medical_history: Some("hypertension".into()),
                // Ignored: patients don't have a specialization.
                specialization: Some("cardiology".into()),
                ..ProfileUpdate::default()
            },
        )
        .unwrap();

        assert_eq!(updated.email.as_str(), "new@example.com");
        let profile = store.patient_profile_for_user(patient.id).unwrap();
        assert_eq!(profile.medical_history, "hypertension");
    }

    #[test]
    fn doctor_assignment_set_must_reference_existing_patients() {
        let (store, tokens, _dir) = fixtures();
        let doctor = register(&store, &tokens, account("bob", Role::Doctor)).unwrap();

        let err = update_profile(
            &store,
            doctor.id,
            ProfileUpdate {
                patients: Some(vec![Uuid::new_v4()]),
                ..ProfileUpdate::default()
            },
        )
        .expect_err("unknown patient id should fail");
        assert!(matches!(err, AdherenceError::Validation(_)));

        let patient = register(&store, &tokens, account("alice", Role::Patient)).unwrap();
        let patient_profile = store.patient_profile_for_user(patient.id).unwrap();

        update_profile(
            &store,
            doctor.id,
            ProfileUpdate {
                patients: Some(vec![patient_profile.id]),
                ..ProfileUpdate::default()
            },
        )
        .unwrap();

        let profile = store.doctor_profile_for_user(doctor.id).unwrap();
        assert_eq!(profile.patients, vec![patient_profile.id]);
    }
}
