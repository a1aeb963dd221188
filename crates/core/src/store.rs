//! File-backed entity store.
//!
//! All persisted records live in a single JSON snapshot under the
//! configured data directory. The snapshot is loaded once when the store is
//! opened and rewritten after every mutation, while the write lock is held,
//! so each single-entity write is atomic with respect to other requests.
//! There are no multi-entity transactions.
//!
//! Relationships are explicit foreign keys. The store resolves them to
//! plain data (`schedule -> patient`, `activity -> schedule -> patient`)
//! for the authorization engine and analytics, which never touch storage
//! themselves.

use crate::authz::{Actor, PatientRef};
use crate::config::CoreConfig;
use crate::error::{AdherenceError, AdherenceResult};
use crate::model::{
    Activity, DoctorProfile, MedicationSchedule, Notification, PatientProfile, User,
};
use crate::scope::Scope;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Snapshot file name inside the data directory.
pub const STORE_FILE_NAME: &str = "adherence.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreState {
    users: HashMap<Uuid, User>,
    patient_profiles: HashMap<Uuid, PatientProfile>,
    doctor_profiles: HashMap<Uuid, DoctorProfile>,
    schedules: HashMap<Uuid, MedicationSchedule>,
    activities: HashMap<Uuid, Activity>,
    notifications: HashMap<Uuid, Notification>,
    /// `jti` claims of revoked refresh tokens.
    revoked_jtis: HashSet<String>,
}

/// The persisted entity store shared across request handlers.
#[derive(Debug)]
pub struct EntityStore {
    path: PathBuf,
    state: RwLock<StoreState>,
}

impl EntityStore {
    /// Opens the store under the configured data directory, creating the
    /// directory if needed and loading an existing snapshot when present.
    pub fn open(cfg: &CoreConfig) -> AdherenceResult<Self> {
        fs::create_dir_all(cfg.data_dir()).map_err(AdherenceError::StorageDirCreation)?;
        let path = cfg.data_dir().join(STORE_FILE_NAME);

        let state = if path.is_file() {
            let contents = fs::read_to_string(&path).map_err(AdherenceError::FileRead)?;
            let state: StoreState =
                serde_json::from_str(&contents).map_err(AdherenceError::Deserialization)?;
            tracing::debug!(
                "loaded entity store snapshot with {} users from {}",
                state.users.len(),
                path.display()
            );
            state
        } else {
            StoreState::default()
        };

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    // A poisoned lock means another request panicked mid-operation; the
    // snapshot on disk is still consistent, so recover the guard.
    fn read_state(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, state: &StoreState) -> AdherenceResult<()> {
        let json = serde_json::to_string_pretty(state).map_err(AdherenceError::Serialization)?;
        fs::write(&self.path, json).map_err(AdherenceError::FileWrite)
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Inserts a new user. Usernames are unique across the store.
    pub fn insert_user(&self, user: User) -> AdherenceResult<()> {
        let mut state = self.write_state();
        if state.users.values().any(|u| u.username == user.username) {
            return Err(AdherenceError::Validation(format!(
                "username '{}' is already taken",
                user.username
            )));
        }
        state.users.insert(user.id, user);
        self.persist(&state)
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.read_state().users.get(&id).cloned()
    }

    pub fn user_by_username(&self, username: &str) -> Option<User> {
        self.read_state()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned()
    }

    pub fn list_users(&self) -> Vec<User> {
        let state = self.read_state();
        let mut users: Vec<_> = state.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users
    }

    /// Replaces an existing user record.
    pub fn update_user(&self, user: User) -> AdherenceResult<()> {
        let mut state = self.write_state();
        if !state.users.contains_key(&user.id) {
            return Err(AdherenceError::NotFound("user not found".into()));
        }
        if state
            .users
            .values()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(AdherenceError::Validation(format!(
                "username '{}' is already taken",
                user.username
            )));
        }
        state.users.insert(user.id, user);
        self.persist(&state)
    }

    /// Deletes a user and cascades through its profile, schedules,
    /// activities, and notifications. A deleted patient also disappears
    /// from every doctor's assignment set.
    pub fn delete_user(&self, user_id: Uuid) -> AdherenceResult<()> {
        let mut state = self.write_state();
        if state.users.remove(&user_id).is_none() {
            return Err(AdherenceError::NotFound("user not found".into()));
        }

        let patient_profile_id = state
            .patient_profiles
            .values()
            .find(|p| p.user_id == user_id)
            .map(|p| p.id);
        if let Some(profile_id) = patient_profile_id {
            remove_patient_profile(&mut state, profile_id);
        }
        state.doctor_profiles.retain(|_, d| d.user_id != user_id);

        self.persist(&state)
    }

    // ------------------------------------------------------------------
    // Profiles
    // ------------------------------------------------------------------

    pub fn insert_patient_profile(&self, profile: PatientProfile) -> AdherenceResult<()> {
        let mut state = self.write_state();
        state.patient_profiles.insert(profile.id, profile);
        self.persist(&state)
    }

    pub fn insert_doctor_profile(&self, profile: DoctorProfile) -> AdherenceResult<()> {
        let mut state = self.write_state();
        state.doctor_profiles.insert(profile.id, profile);
        self.persist(&state)
    }

    pub fn patient_profile(&self, id: Uuid) -> Option<PatientProfile> {
        self.read_state().patient_profiles.get(&id).cloned()
    }

    pub fn patient_profile_for_user(&self, user_id: Uuid) -> Option<PatientProfile> {
        self.read_state()
            .patient_profiles
            .values()
            .find(|p| p.user_id == user_id)
            .cloned()
    }

    pub fn doctor_profile_for_user(&self, user_id: Uuid) -> Option<DoctorProfile> {
        self.read_state()
            .doctor_profiles
            .values()
            .find(|d| d.user_id == user_id)
            .cloned()
    }

    pub fn update_patient_profile(&self, profile: PatientProfile) -> AdherenceResult<()> {
        let mut state = self.write_state();
        if !state.patient_profiles.contains_key(&profile.id) {
            return Err(AdherenceError::NotFound("patient profile not found".into()));
        }
        state.patient_profiles.insert(profile.id, profile);
        self.persist(&state)
    }

    /// Replaces a doctor profile. Every id in the assignment set must
    /// refer to an existing patient profile.
    pub fn update_doctor_profile(&self, profile: DoctorProfile) -> AdherenceResult<()> {
        let mut state = self.write_state();
        if !state.doctor_profiles.contains_key(&profile.id) {
            return Err(AdherenceError::NotFound("doctor profile not found".into()));
        }
        for patient_id in &profile.patients {
            if !state.patient_profiles.contains_key(patient_id) {
                return Err(AdherenceError::Validation(format!(
                    "unknown patient '{patient_id}' in assignment set"
                )));
            }
        }
        state.doctor_profiles.insert(profile.id, profile);
        self.persist(&state)
    }

    // ------------------------------------------------------------------
    // Schedules
    // ------------------------------------------------------------------

    pub fn insert_schedule(&self, schedule: MedicationSchedule) -> AdherenceResult<()> {
        schedule.validate()?;
        let mut state = self.write_state();
        if !state.patient_profiles.contains_key(&schedule.patient_id) {
            return Err(AdherenceError::NotFound("patient not found".into()));
        }
        state.schedules.insert(schedule.id, schedule);
        self.persist(&state)
    }

    pub fn schedule(&self, id: Uuid) -> Option<MedicationSchedule> {
        self.read_state().schedules.get(&id).cloned()
    }

    pub fn update_schedule(&self, schedule: MedicationSchedule) -> AdherenceResult<()> {
        schedule.validate()?;
        let mut state = self.write_state();
        if !state.schedules.contains_key(&schedule.id) {
            return Err(AdherenceError::NotFound("schedule not found".into()));
        }
        state.schedules.insert(schedule.id, schedule);
        self.persist(&state)
    }

    /// Deletes a schedule and its activities.
    pub fn delete_schedule(&self, id: Uuid) -> AdherenceResult<()> {
        let mut state = self.write_state();
        if state.schedules.remove(&id).is_none() {
            return Err(AdherenceError::NotFound("schedule not found".into()));
        }
        state.activities.retain(|_, a| a.schedule_id != id);
        self.persist(&state)
    }

    pub fn schedules_in_scope(&self, scope: &Scope) -> Vec<MedicationSchedule> {
        let state = self.read_state();
        let mut schedules: Vec<_> = state
            .schedules
            .values()
            .filter(|s| scope.contains(s.patient_id))
            .cloned()
            .collect();
        schedules.sort_by(|a, b| a.start_date.cmp(&b.start_date).then_with(|| a.id.cmp(&b.id)));
        schedules
    }

    // ------------------------------------------------------------------
    // Activities
    // ------------------------------------------------------------------

    pub fn insert_activity(&self, activity: Activity) -> AdherenceResult<()> {
        let mut state = self.write_state();
        if !state.schedules.contains_key(&activity.schedule_id) {
            return Err(AdherenceError::NotFound("schedule not found".into()));
        }
        state.activities.insert(activity.id, activity);
        self.persist(&state)
    }

    pub fn activity(&self, id: Uuid) -> Option<Activity> {
        self.read_state().activities.get(&id).cloned()
    }

    pub fn update_activity(&self, activity: Activity) -> AdherenceResult<()> {
        let mut state = self.write_state();
        if !state.activities.contains_key(&activity.id) {
            return Err(AdherenceError::NotFound("activity not found".into()));
        }
        if !state.schedules.contains_key(&activity.schedule_id) {
            return Err(AdherenceError::NotFound("schedule not found".into()));
        }
        state.activities.insert(activity.id, activity);
        self.persist(&state)
    }

    pub fn delete_activity(&self, id: Uuid) -> AdherenceResult<()> {
        let mut state = self.write_state();
        if state.activities.remove(&id).is_none() {
            return Err(AdherenceError::NotFound("activity not found".into()));
        }
        self.persist(&state)
    }

    pub fn activities_in_scope(&self, scope: &Scope) -> Vec<Activity> {
        let state = self.read_state();
        let mut activities: Vec<_> = state
            .activities
            .values()
            .filter(|a| {
                patient_of_schedule(&state, a.schedule_id)
                    .is_some_and(|patient_id| scope.contains(patient_id))
            })
            .cloned()
            .collect();
        activities.sort_by(|a, b| b.date_time.cmp(&a.date_time));
        activities
    }

    /// All activities under schedules belonging to `patient_id`, in no
    /// particular order. Analytics applies its own windowing and ordering.
    pub fn activities_for_patient(&self, patient_id: Uuid) -> Vec<Activity> {
        let state = self.read_state();
        state
            .activities
            .values()
            .filter(|a| patient_of_schedule(&state, a.schedule_id) == Some(patient_id))
            .cloned()
            .collect()
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    pub fn insert_notification(&self, notification: Notification) -> AdherenceResult<()> {
        let mut state = self.write_state();
        if !state.patient_profiles.contains_key(&notification.patient_id) {
            return Err(AdherenceError::NotFound("patient not found".into()));
        }
        state.notifications.insert(notification.id, notification);
        self.persist(&state)
    }

    pub fn notifications_in_scope(&self, scope: &Scope) -> Vec<Notification> {
        let state = self.read_state();
        let mut notifications: Vec<_> = state
            .notifications
            .values()
            .filter(|n| scope.contains(n.patient_id))
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        notifications
    }

    // ------------------------------------------------------------------
    // Revoked refresh tokens
    // ------------------------------------------------------------------

    /// Records a refresh token's `jti` as revoked. Revoking an already
    /// revoked token is an auth error, not a crash.
    pub fn revoke_jti(&self, jti: &str) -> AdherenceResult<()> {
        let mut state = self.write_state();
        if !state.revoked_jtis.insert(jti.to_owned()) {
            return Err(AdherenceError::Auth("token is already revoked".into()));
        }
        self.persist(&state)
    }

    pub fn is_jti_revoked(&self, jti: &str) -> bool {
        self.read_state().revoked_jtis.contains(jti)
    }

    // ------------------------------------------------------------------
    // Relationship resolution
    // ------------------------------------------------------------------

    /// Resolves a patient profile id to the reference the authorization
    /// engine consumes.
    pub fn patient_ref(&self, profile_id: Uuid) -> Option<PatientRef> {
        let state = self.read_state();
        state.patient_profiles.get(&profile_id).map(|p| PatientRef {
            profile_id: p.id,
            user_id: p.user_id,
        })
    }

    pub fn patient_ref_for_schedule(&self, schedule_id: Uuid) -> Option<PatientRef> {
        let state = self.read_state();
        let schedule = state.schedules.get(&schedule_id)?;
        state
            .patient_profiles
            .get(&schedule.patient_id)
            .map(|p| PatientRef {
                profile_id: p.id,
                user_id: p.user_id,
            })
    }

    pub fn patient_ref_for_activity(&self, activity_id: Uuid) -> Option<PatientRef> {
        let state = self.read_state();
        let activity = state.activities.get(&activity_id)?;
        let schedule = state.schedules.get(&activity.schedule_id)?;
        state
            .patient_profiles
            .get(&schedule.patient_id)
            .map(|p| PatientRef {
                profile_id: p.id,
                user_id: p.user_id,
            })
    }

    /// Builds the authorization actor for a user, resolving profile
    /// existence explicitly.
    pub fn actor_for(&self, user: &User) -> Actor {
        let state = self.read_state();
        let patient_profile = state
            .patient_profiles
            .values()
            .find(|p| p.user_id == user.id)
            .map(|p| p.id);
        let assigned_patients = state
            .doctor_profiles
            .values()
            .find(|d| d.user_id == user.id)
            .map(|d| d.patients.iter().copied().collect());

        Actor {
            user_id: user.id,
            role: user.role,
            patient_profile,
            assigned_patients,
        }
    }
}

fn patient_of_schedule(state: &StoreState, schedule_id: Uuid) -> Option<Uuid> {
    state.schedules.get(&schedule_id).map(|s| s.patient_id)
}

fn remove_patient_profile(state: &mut StoreState, profile_id: Uuid) {
    state.patient_profiles.remove(&profile_id);

    let schedule_ids: Vec<Uuid> = state
        .schedules
        .values()
        .filter(|s| s.patient_id == profile_id)
        .map(|s| s.id)
        .collect();
    for schedule_id in schedule_ids {
        state.schedules.remove(&schedule_id);
        state.activities.retain(|_, a| a.schedule_id != schedule_id);
    }

    state.notifications.retain(|_, n| n.patient_id != profile_id);
    for doctor in state.doctor_profiles.values_mut() {
        doctor.patients.retain(|p| *p != profile_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActivityStatus, Role};
    use crate::{EmailAddress, NonEmptyText};
    use chrono::{NaiveDate, TimeZone, Utc};
    use tempfile::TempDir;

    fn test_cfg(dir: &TempDir) -> CoreConfig {
        CoreConfig::new(
            dir.path().to_path_buf(),
            NonEmptyText::new("test-secret").unwrap(),
            3600,
            604800,
        )
        .unwrap()
    }

    fn test_user(username: &str, role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            username: username.into(),
            email: EmailAddress::parse(format!("{username}@example.com")).unwrap(),
            password_hash: "hash".into(),
            role,
        }
    }

    fn patient_with_profile(store: &EntityStore, username: &str) -> (User, PatientProfile) {
        let user = test_user(username, Role::Patient);
        store.insert_user(user.clone()).unwrap();
        let profile = PatientProfile {
            id: Uuid::new_v4(),
            user_id: user.id,
            date_of_birth: None,
            medical_history: String::new(),
        };
        store.insert_patient_profile(profile.clone()).unwrap();
        (user, profile)
    }

    fn schedule_for(patient_id: Uuid) -> MedicationSchedule {
        MedicationSchedule {
            id: Uuid::new_v4(),
            patient_id,
            medication_name: "Lisinopril".into(),
            dosage: "10mg".into(),
            frequency: "once daily".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        }
    }

    #[test]
    fn usernames_are_unique() {
        let dir = TempDir::new().unwrap();
        let store = EntityStore::open(&test_cfg(&dir)).unwrap();

        store.insert_user(test_user("alice", Role::Patient)).unwrap();
        let err = store
            .insert_user(test_user("alice", Role::Doctor))
            .expect_err("duplicate username should be rejected");
        assert!(matches!(err, AdherenceError::Validation(_)));
    }

    #[test]
    fn schedule_write_rejects_inverted_dates_regardless_of_payload() {
        let dir = TempDir::new().unwrap();
        let store = EntityStore::open(&test_cfg(&dir)).unwrap();
        let (_, profile) = patient_with_profile(&store, "alice");

        let mut schedule = schedule_for(profile.id);
        schedule.start_date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        schedule.end_date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();

        let err = store.insert_schedule(schedule).expect_err("should reject");
        assert!(matches!(err, AdherenceError::Validation(_)));
    }

    #[test]
    fn schedule_requires_existing_patient() {
        let dir = TempDir::new().unwrap();
        let store = EntityStore::open(&test_cfg(&dir)).unwrap();

        let err = store
            .insert_schedule(schedule_for(Uuid::new_v4()))
            .expect_err("missing patient should be a not-found error");
        assert!(matches!(err, AdherenceError::NotFound(_)));
    }

    #[test]
    fn activity_requires_existing_schedule() {
        let dir = TempDir::new().unwrap();
        let store = EntityStore::open(&test_cfg(&dir)).unwrap();

        let activity = Activity {
            id: Uuid::new_v4(),
            schedule_id: Uuid::new_v4(),
            date_time: Utc::now(),
            status: ActivityStatus::Taken,
            notes: String::new(),
            blood_pressure: None,
        };
        let err = store
            .insert_activity(activity)
            .expect_err("missing schedule should be a not-found error");
        assert!(matches!(err, AdherenceError::NotFound(_)));
    }

    #[test]
    fn deleting_a_user_cascades_through_owned_records() {
        let dir = TempDir::new().unwrap();
        let store = EntityStore::open(&test_cfg(&dir)).unwrap();
        let (patient_user, profile) = patient_with_profile(&store, "alice");

        let schedule = schedule_for(profile.id);
        store.insert_schedule(schedule.clone()).unwrap();
        let activity = Activity {
            id: Uuid::new_v4(),
            schedule_id: schedule.id,
            date_time: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
            status: ActivityStatus::Taken,
            notes: String::new(),
            blood_pressure: None,
        };
        store.insert_activity(activity.clone()).unwrap();
        store
            .insert_notification(Notification {
                id: Uuid::new_v4(),
                patient_id: profile.id,
                message: NonEmptyText::new("time for your dose").unwrap(),
                sent_at: Utc::now(),
            })
            .unwrap();

        let doctor = test_user("bob", Role::Doctor);
        store.insert_user(doctor.clone()).unwrap();
        store
            .insert_doctor_profile(DoctorProfile {
                id: Uuid::new_v4(),
                user_id: doctor.id,
                specialization: "cardiology".into(),
                patients: vec![profile.id],
            })
            .unwrap();

        store.delete_user(patient_user.id).unwrap();

        assert!(store.patient_profile(profile.id).is_none());
        assert!(store.schedule(schedule.id).is_none());
        assert!(store.activity(activity.id).is_none());
        assert!(store.notifications_in_scope(&Scope::All).is_empty());
        let doctor_profile = store.doctor_profile_for_user(doctor.id).unwrap();
        assert!(
            doctor_profile.patients.is_empty(),
            "deleted patient should leave every assignment set"
        );
    }

    #[test]
    fn snapshot_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let cfg = test_cfg(&dir);
        let (user, profile) = {
            let store = EntityStore::open(&cfg).unwrap();
            let pair = patient_with_profile(&store, "alice");
            store.insert_schedule(schedule_for(pair.1.id)).unwrap();
            store.revoke_jti("some-jti").unwrap();
            pair
        };

        let reopened = EntityStore::open(&cfg).unwrap();
        assert_eq!(reopened.user(user.id).unwrap().username, "alice");
        assert!(reopened.patient_profile(profile.id).is_some());
        assert_eq!(reopened.schedules_in_scope(&Scope::All).len(), 1);
        assert!(reopened.is_jti_revoked("some-jti"));
    }

    #[test]
    fn revoking_twice_is_an_auth_error() {
        let dir = TempDir::new().unwrap();
        let store = EntityStore::open(&test_cfg(&dir)).unwrap();

        store.revoke_jti("jti-1").unwrap();
        let err = store
            .revoke_jti("jti-1")
            .expect_err("second revocation should fail");
        assert!(matches!(err, AdherenceError::Auth(_)));
    }

    #[test]
    fn scoped_lists_filter_by_patient() {
        let dir = TempDir::new().unwrap();
        let store = EntityStore::open(&test_cfg(&dir)).unwrap();
        let (_, alice) = patient_with_profile(&store, "alice");
        let (_, bob) = patient_with_profile(&store, "bob");

        store.insert_schedule(schedule_for(alice.id)).unwrap();
        store.insert_schedule(schedule_for(bob.id)).unwrap();

        assert_eq!(store.schedules_in_scope(&Scope::All).len(), 2);
        assert_eq!(store.schedules_in_scope(&Scope::Own(alice.id)).len(), 1);
        assert_eq!(
            store
                .schedules_in_scope(&Scope::Assigned([bob.id].into_iter().collect()))
                .len(),
            1
        );
        assert!(store.schedules_in_scope(&Scope::Empty).is_empty());
    }

    #[test]
    fn actor_reflects_profile_presence() {
        let dir = TempDir::new().unwrap();
        let store = EntityStore::open(&test_cfg(&dir)).unwrap();
        let (user, profile) = patient_with_profile(&store, "alice");

        let actor = store.actor_for(&user);
        assert_eq!(actor.patient_profile, Some(profile.id));
        assert!(actor.assigned_patients.is_none());

        let doctor_without_profile = test_user("carol", Role::Doctor);
        store.insert_user(doctor_without_profile.clone()).unwrap();
        let actor = store.actor_for(&doctor_without_profile);
        assert!(actor.patient_profile.is_none());
        assert!(actor.assigned_patients.is_none());
    }
}
