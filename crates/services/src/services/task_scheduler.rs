use db::{
    DBService,
    models::{
        recurring_task::RecurringTask,
        task_instance::{CreateTaskInstance, TaskInstance},
    },
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use super::{period::Month, recurrence::occurrence_dates};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleSummary {
    pub month: Month,
    pub created: Vec<TaskInstance>,
    pub already_scheduled: usize,
}

/// Materializes recurring tasks into dated task instances
#[derive(Clone)]
pub struct TaskSchedulerService {
    db: DBService,
}

impl TaskSchedulerService {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    /// One instance per active task occurrence in `month`. Safe to run
    /// repeatedly; existing instances are left alone.
    pub async fn generate_instances(&self, month: Month) -> Result<ScheduleSummary, SchedulerError> {
        let tasks = RecurringTask::find_active(&self.db.pool).await?;
        let mut created = Vec::new();
        let mut already_scheduled = 0;

        for task in &tasks {
            for due_date in occurrence_dates(task.recurrence_type, task.recurrence_anchor, month) {
                let data = CreateTaskInstance {
                    recurring_task_id: Some(task.id),
                    client_id: task.client_id,
                    name: task.name.clone(),
                    required_skills: task.required_skills.clone(),
                    estimated_hours: task.estimated_hours,
                    due_date,
                    assigned_staff_id: task.preferred_staff_id,
                };
                match TaskInstance::create_if_absent(&self.db.pool, &data, Uuid::new_v4()).await? {
                    Some(instance) => created.push(instance),
                    None => {
                        debug!(task_id = %task.id, %due_date, "Instance already scheduled");
                        already_scheduled += 1;
                    }
                }
            }
        }

        info!(
            %month,
            tasks = tasks.len(),
            created = created.len(),
            already_scheduled,
            "Generated task instances"
        );

        Ok(ScheduleSummary {
            month,
            created,
            already_scheduled,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use db::models::recurring_task::{CreateRecurringTask, RecurrenceType};

    use super::*;
    use crate::services::test_support::{seed_client, seed_staff, seed_task};

    #[tokio::test]
    async fn test_generation_is_idempotent() {
        let db = DBService::new_in_memory().await.unwrap();
        let client = seed_client(&db, "Acme LLC").await;
        let ada = seed_staff(&db, "Ada", &["Junior"], 40.0).await;
        let mut weekly = CreateRecurringTask::monthly(client, "Bank feeds", vec!["Junior".into()], 1.5);
        weekly.recurrence_type = Some(RecurrenceType::Weekly);
        weekly.preferred_staff_id = Some(ada);
        let weekly_id = seed_task(&db, weekly).await;
        seed_task(&db, CreateRecurringTask::monthly(client, "Close", vec!["Senior".into()], 8.0)).await;

        let scheduler = TaskSchedulerService::new(db.clone());
        let january = Month::new(2024, 1).unwrap();

        let first = scheduler.generate_instances(january).await.unwrap();
        assert_eq!(first.created.len(), 6);
        assert_eq!(first.already_scheduled, 0);

        let second = scheduler.generate_instances(january).await.unwrap();
        assert!(second.created.is_empty());
        assert_eq!(second.already_scheduled, 6);

        let weekly_instances = TaskInstance::find_by_recurring_task_id(&db.pool, weekly_id)
            .await
            .unwrap();
        assert_eq!(weekly_instances.len(), 5);
        assert!(weekly_instances.iter().all(|i| i.assigned_staff_id == Some(ada)));
        assert_eq!(
            weekly_instances[0].due_date,
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
    }

    #[tokio::test]
    async fn test_inactive_tasks_are_not_scheduled() {
        let db = DBService::new_in_memory().await.unwrap();
        let client = seed_client(&db, "Acme LLC").await;
        let task = seed_task(&db, CreateRecurringTask::monthly(client, "Close", vec![], 8.0)).await;
        RecurringTask::set_active(&db.pool, task, false).await.unwrap();

        let summary = TaskSchedulerService::new(db)
            .generate_instances(Month::new(2024, 3).unwrap())
            .await
            .unwrap();
        assert!(summary.created.is_empty());
    }
}
