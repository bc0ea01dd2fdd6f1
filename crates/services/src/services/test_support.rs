//! Shared fixtures for service tests.

use std::sync::{
    Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use db::{
    DBService,
    models::{
        client::{Client, CreateClient},
        recurring_task::{CreateRecurringTask, RecurringTask},
        skill::{CreateSkill, Skill},
        staff::{CreateStaff, Staff},
    },
};
use uuid::Uuid;

use super::skill_cache::SkillStore;

pub fn skill(id: Uuid, name: &str) -> Skill {
    Skill {
        id,
        name: name.to_string(),
        category: None,
        proficiency_level: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

/// Skill store that counts calls. `unlisted` skills are only visible to point queries,
/// standing in for rows added after the last full load.
#[derive(Default)]
pub struct FakeSkillStore {
    listed: Mutex<Vec<Skill>>,
    unlisted: Mutex<Vec<Skill>>,
    load_calls: AtomicUsize,
    find_calls: AtomicUsize,
    fail_loads: AtomicBool,
    fail_finds: AtomicBool,
}

impl FakeSkillStore {
    pub fn with_skills(skills: Vec<Skill>) -> Self {
        Self {
            listed: Mutex::new(skills),
            ..Default::default()
        }
    }

    pub fn with_unlisted(self, skills: Vec<Skill>) -> Self {
        *self.unlisted.lock().unwrap() = skills;
        self
    }

    pub fn fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_finds(&self, fail: bool) {
        self.fail_finds.store(fail, Ordering::SeqCst);
    }

    pub fn load_calls(&self) -> usize {
        self.load_calls.load(Ordering::SeqCst)
    }

    pub fn find_calls(&self) -> usize {
        self.find_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SkillStore for FakeSkillStore {
    async fn load_skills(&self) -> Result<Vec<Skill>, sqlx::Error> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        Ok(self.listed.lock().unwrap().clone())
    }

    async fn find_skill(&self, id: Uuid) -> Result<Option<Skill>, sqlx::Error> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_finds.load(Ordering::SeqCst) {
            return Err(sqlx::Error::PoolTimedOut);
        }
        let listed = self.listed.lock().unwrap();
        let unlisted = self.unlisted.lock().unwrap();
        Ok(listed
            .iter()
            .chain(unlisted.iter())
            .find(|skill| skill.id == id)
            .cloned())
    }
}

pub async fn seed_skill(db: &DBService, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    Skill::create(&db.pool, &CreateSkill::named(name), id)
        .await
        .unwrap();
    id
}

pub async fn seed_client(db: &DBService, legal_name: &str) -> Uuid {
    let id = Uuid::new_v4();
    Client::create(&db.pool, &CreateClient::named(legal_name), id)
        .await
        .unwrap();
    id
}

pub async fn seed_staff(db: &DBService, full_name: &str, skills: &[&str], weekly_hours: f64) -> Uuid {
    let id = Uuid::new_v4();
    let data = CreateStaff {
        full_name: full_name.to_string(),
        assigned_skills: skills.iter().map(|s| s.to_string()).collect(),
        cost_per_hour: None,
        weekly_capacity_hours: Some(weekly_hours),
    };
    Staff::create(&db.pool, &data, id).await.unwrap();
    id
}

pub async fn seed_task(db: &DBService, data: CreateRecurringTask) -> Uuid {
    let id = Uuid::new_v4();
    RecurringTask::create(&db.pool, &data, id).await.unwrap();
    id
}
