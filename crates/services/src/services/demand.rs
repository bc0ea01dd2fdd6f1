//! Demand side of the forecasting matrix.
//!
//! Recurring tasks are bucketed into a month x skill grid. A cell exists only
//! when at least one task needs that skill in that month; empty cells are
//! absent rather than zero. Rollups are always recomputed from the cells, so
//! filtering a matrix never leaves stale totals behind.

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    sync::Arc,
};

use chrono::{DateTime, NaiveDate, Utc};
use db::{
    DBService,
    models::{client::ClientRevenueRecord, recurring_task::{RecurrenceType, RecurringTask}},
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::{
    client_resolution::{ClientResolutionService, unknown_client_placeholder},
    events::{PipelineEvent, PipelineObserver, TracingObserver},
    period::{Month, TimeHorizon},
    recurrence::occurrences_in_month,
    skill_mapping::normalize_skill_name,
    skill_resolver::{ReferenceKind, SkillResolution, SkillResolver},
    staff_filter::StaffFilterMode,
};

#[derive(Debug, Error)]
pub enum DemandForecastError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Data-quality issues found while building a forecast. Returned with the
/// result so callers can surface them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    MalformedSkillReference {
        task_id: Uuid,
        value: String,
    },
    UnresolvedSkill {
        task_id: Uuid,
        reference: String,
        display_name: String,
    },
    SkillNotInCatalog {
        task_id: Uuid,
        reference: String,
    },
    TaskWithoutSkills {
        task_id: Uuid,
    },
    UnresolvedClient {
        client_id: Uuid,
    },
    ClientLookupFailed {
        error: String,
    },
}

/// One task's contribution to a cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRef {
    pub task_id: Uuid,
    pub task_name: String,
    pub client_id: Uuid,
    pub client_name: String,
    pub preferred_staff_id: Option<Uuid>,
    pub estimated_hours: f64,
    pub occurrences: u32,
    pub hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandDataPoint {
    pub skill_type: String,
    pub month: Month,
    pub month_label: String,
    pub demand_hours: f64,
    pub task_count: usize,
    pub client_count: usize,
    pub task_breakdown: Vec<TaskRef>,
}

impl DemandDataPoint {
    /// `None` when nothing contributes to the cell
    pub fn from_breakdown(skill_type: String, month: Month, task_breakdown: Vec<TaskRef>) -> Option<Self> {
        if task_breakdown.is_empty() {
            return None;
        }
        let demand_hours = task_breakdown.iter().map(|task| task.hours).sum();
        let task_count = task_breakdown
            .iter()
            .map(|task| task.task_id)
            .collect::<HashSet<_>>()
            .len();
        let client_count = task_breakdown
            .iter()
            .map(|task| task.client_id)
            .collect::<HashSet<_>>()
            .len();
        Some(Self {
            skill_type,
            month,
            month_label: month.label(),
            demand_hours,
            task_count,
            client_count,
            task_breakdown,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillSummary {
    pub skill_type: String,
    pub demand_hours: f64,
    pub task_count: usize,
    pub client_count: usize,
}

/// Per-client rollup, keyed by id. Each task-month counts once even when the
/// task spans several skills.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientDemandTotal {
    pub client_id: Uuid,
    pub client_name: String,
    pub demand_hours: f64,
    pub task_count: usize,
    pub expected_monthly_revenue: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DemandMatrix {
    pub months: Vec<Month>,
    pub skills: Vec<String>,
    pub data_points: Vec<DemandDataPoint>,
    pub skill_summaries: Vec<SkillSummary>,
    pub client_totals: Vec<ClientDemandTotal>,
    pub total_demand_hours: f64,
    pub warnings: Vec<DataQualityWarning>,
    pub generated_at: DateTime<Utc>,
    #[serde(skip)]
    client_revenue: HashMap<Uuid, f64>,
}

impl DemandMatrix {
    pub fn data_point(&self, month: Month, skill_type: &str) -> Option<&DemandDataPoint> {
        self.data_points
            .iter()
            .find(|point| point.month == month && point.skill_type == skill_type)
    }

    pub fn skill_summary(&self, skill_type: &str) -> Option<&SkillSummary> {
        self.skill_summaries
            .iter()
            .find(|summary| summary.skill_type == skill_type)
    }

    pub fn client_total(&self, client_id: Uuid) -> Option<&ClientDemandTotal> {
        self.client_totals
            .iter()
            .find(|total| total.client_id == client_id)
    }

    /// Distinct tasks that contribute to any cell
    pub fn task_ids(&self) -> BTreeSet<Uuid> {
        self.data_points
            .iter()
            .flat_map(|point| point.task_breakdown.iter().map(|task| task.task_id))
            .collect()
    }

    /// Keep only the task contributions matching `keep`, then rebuild cells and rollups
    pub fn retain_tasks(&mut self, keep: impl Fn(&TaskRef) -> bool) {
        let data_points = std::mem::take(&mut self.data_points);
        self.data_points = data_points
            .into_iter()
            .filter_map(|point| {
                let breakdown: Vec<TaskRef> =
                    point.task_breakdown.into_iter().filter(|task| keep(task)).collect();
                DemandDataPoint::from_breakdown(point.skill_type, point.month, breakdown)
            })
            .collect();
        self.recompute_rollups();
    }

    pub fn retain_skills(&mut self, keep: impl Fn(&str) -> bool) {
        self.skills.retain(|skill| keep(skill));
        self.data_points.retain(|point| keep(&point.skill_type));
        self.recompute_rollups();
    }

    fn recompute_rollups(&mut self) {
        let mut skill_summaries = Vec::new();
        for skill in &self.skills {
            let cells: Vec<&DemandDataPoint> = self
                .data_points
                .iter()
                .filter(|point| &point.skill_type == skill)
                .collect();
            if cells.is_empty() {
                continue;
            }
            let tasks: HashSet<Uuid> = cells
                .iter()
                .flat_map(|cell| cell.task_breakdown.iter().map(|task| task.task_id))
                .collect();
            let clients: HashSet<Uuid> = cells
                .iter()
                .flat_map(|cell| cell.task_breakdown.iter().map(|task| task.client_id))
                .collect();
            skill_summaries.push(SkillSummary {
                skill_type: skill.clone(),
                demand_hours: cells.iter().map(|cell| cell.demand_hours).sum(),
                task_count: tasks.len(),
                client_count: clients.len(),
            });
        }

        // (task, month) -> contribution, so multi-skill tasks count once per month
        let mut task_months: HashMap<(Uuid, Month), &TaskRef> = HashMap::new();
        for point in &self.data_points {
            for task in &point.task_breakdown {
                task_months.entry((task.task_id, point.month)).or_insert(task);
            }
        }
        let mut by_client: HashMap<Uuid, (String, f64, HashSet<Uuid>)> = HashMap::new();
        for task in task_months.values() {
            let entry = by_client
                .entry(task.client_id)
                .or_insert_with(|| (task.client_name.clone(), 0.0, HashSet::new()));
            entry.1 += task.hours;
            entry.2.insert(task.task_id);
        }
        let mut client_totals: Vec<ClientDemandTotal> = by_client
            .into_iter()
            .map(|(client_id, (client_name, demand_hours, tasks))| ClientDemandTotal {
                client_id,
                client_name,
                demand_hours,
                task_count: tasks.len(),
                expected_monthly_revenue: self.client_revenue.get(&client_id).copied(),
            })
            .collect();
        client_totals.sort_by(|a, b| {
            b.demand_hours
                .total_cmp(&a.demand_hours)
                .then_with(|| a.client_name.cmp(&b.client_name))
                .then_with(|| a.client_id.cmp(&b.client_id))
        });

        self.total_demand_hours = self.data_points.iter().map(|point| point.demand_hours).sum();
        self.skill_summaries = skill_summaries;
        self.client_totals = client_totals;
    }
}

/// A recurring task with its skills resolved and its client named
#[derive(Debug, Clone)]
pub struct DemandTask {
    pub task_id: Uuid,
    pub task_name: String,
    pub client_id: Uuid,
    pub client_name: String,
    pub preferred_staff_id: Option<Uuid>,
    pub estimated_hours: f64,
    pub recurrence_type: RecurrenceType,
    pub recurrence_anchor: Option<NaiveDate>,
    /// Canonical skill names, deduplicated
    pub skills: Vec<String>,
}

impl DemandTask {
    fn contribution(&self, month: Month) -> Option<TaskRef> {
        let occurrences = occurrences_in_month(self.recurrence_type, self.recurrence_anchor, month);
        (occurrences > 0).then(|| TaskRef {
            task_id: self.task_id,
            task_name: self.task_name.clone(),
            client_id: self.client_id,
            client_name: self.client_name.clone(),
            preferred_staff_id: self.preferred_staff_id,
            estimated_hours: self.estimated_hours,
            occurrences,
            hours: self.estimated_hours * f64::from(occurrences),
        })
    }
}

/// Bucket `tasks` into a month x skill grid and compute the rollups
pub fn build_demand_matrix(
    months: &[Month],
    tasks: &[DemandTask],
    client_revenue: HashMap<Uuid, f64>,
) -> DemandMatrix {
    let skills: BTreeSet<String> = tasks
        .iter()
        .flat_map(|task| task.skills.iter().cloned())
        .collect();

    let mut data_points = Vec::new();
    for month in months {
        for skill in &skills {
            let breakdown: Vec<TaskRef> = tasks
                .iter()
                .filter(|task| task.skills.contains(skill))
                .filter_map(|task| task.contribution(*month))
                .collect();
            if let Some(point) = DemandDataPoint::from_breakdown(skill.clone(), *month, breakdown) {
                data_points.push(point);
            }
        }
    }

    let mut matrix = DemandMatrix {
        months: months.to_vec(),
        skills: skills.into_iter().collect(),
        data_points,
        skill_summaries: Vec::new(),
        client_totals: Vec::new(),
        total_demand_hours: 0.0,
        warnings: Vec::new(),
        generated_at: Utc::now(),
        client_revenue,
    };
    matrix.recompute_rollups();
    matrix
}

#[derive(Debug, Clone, Default)]
pub struct DemandFilters {
    pub include_inactive: bool,
    /// Skill names to keep; matched after normalization. `None` keeps all.
    pub skills: Option<BTreeSet<String>>,
    pub client_ids: Option<HashSet<Uuid>>,
    pub staff: StaffFilterMode,
}

pub struct DemandDataService {
    db: DBService,
    resolver: Arc<SkillResolver>,
    clients: ClientResolutionService,
    observer: Arc<dyn PipelineObserver>,
}

impl DemandDataService {
    pub fn new(db: DBService, resolver: Arc<SkillResolver>, clients: ClientResolutionService) -> Self {
        Self {
            db,
            resolver,
            clients,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub async fn generate_demand_forecast(
        &self,
        horizon: &TimeHorizon,
        filters: &DemandFilters,
    ) -> Result<DemandMatrix, DemandForecastError> {
        let started = std::time::Instant::now();

        let tasks = if filters.include_inactive {
            RecurringTask::find_all(&self.db.pool).await?
        } else {
            RecurringTask::find_active(&self.db.pool).await?
        };
        let months = horizon.months();
        let mut warnings = Vec::new();

        let task_skills = self.resolve_task_skills(&tasks, &mut warnings).await;
        let clients = self.resolve_clients(&tasks, &mut warnings).await;

        let demand_tasks: Vec<DemandTask> = tasks
            .iter()
            .map(|task| DemandTask {
                task_id: task.id,
                task_name: task.name.clone(),
                client_id: task.client_id,
                client_name: clients
                    .get(&task.client_id)
                    .map(|client| client.legal_name.clone())
                    .unwrap_or_else(|| unknown_client_placeholder(task.client_id)),
                preferred_staff_id: task.preferred_staff_id,
                estimated_hours: task.estimated_hours,
                recurrence_type: task.recurrence_type,
                recurrence_anchor: task.recurrence_anchor,
                skills: task_skills.get(&task.id).cloned().unwrap_or_default(),
            })
            .collect();
        let client_revenue = clients
            .values()
            .map(|client| (client.id, client.expected_monthly_revenue))
            .collect();

        let mut matrix = build_demand_matrix(&months, &demand_tasks, client_revenue);
        matrix.warnings = warnings;

        if let Some(client_ids) = &filters.client_ids {
            matrix.retain_tasks(|task| client_ids.contains(&task.client_id));
        }
        filters.staff.apply(&mut matrix);
        if let Some(skills) = &filters.skills {
            let wanted: HashSet<String> = skills.iter().map(|s| normalize_skill_name(s)).collect();
            matrix.retain_skills(|skill| wanted.contains(skill));
        }

        self.observer.record(&PipelineEvent::DemandForecastGenerated {
            months: matrix.months.len(),
            skills: matrix.skills.len(),
            data_points: matrix.data_points.len(),
            tasks: matrix.task_ids().len(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        });

        Ok(matrix)
    }

    /// Canonical skill names per task id. Every distinct reference is resolved once.
    pub async fn resolve_task_skills(
        &self,
        tasks: &[RecurringTask],
        warnings: &mut Vec<DataQualityWarning>,
    ) -> HashMap<Uuid, Vec<String>> {
        let mut per_task: Vec<(Uuid, Vec<String>)> = Vec::with_capacity(tasks.len());
        let mut unique: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for task in tasks {
            let parsed = task.skill_references();
            for value in parsed.rejected {
                self.observer.record(&PipelineEvent::MalformedSkillReference {
                    task_id: task.id,
                    value: value.clone(),
                });
                warnings.push(DataQualityWarning::MalformedSkillReference {
                    task_id: task.id,
                    value,
                });
            }
            for reference in &parsed.references {
                if seen.insert(reference.clone()) {
                    unique.push(reference.clone());
                }
            }
            per_task.push((task.id, parsed.references));
        }

        let resolutions = self.resolver.resolve(&unique).await;
        let by_reference: HashMap<&str, &SkillResolution> = unique
            .iter()
            .map(String::as_str)
            .zip(resolutions.iter())
            .collect();

        let mut skills_by_task = HashMap::with_capacity(per_task.len());
        for (task_id, references) in per_task {
            let mut skills: BTreeSet<String> = BTreeSet::new();
            for reference in &references {
                let Some(resolution) = by_reference.get(reference.as_str()) else {
                    continue;
                };
                let display_name = resolution.display_name();
                match resolution {
                    SkillResolution::Unresolved {
                        kind: ReferenceKind::Name,
                        ..
                    } => warnings.push(DataQualityWarning::SkillNotInCatalog {
                        task_id,
                        reference: reference.clone(),
                    }),
                    SkillResolution::Unresolved { .. } => {
                        warnings.push(DataQualityWarning::UnresolvedSkill {
                            task_id,
                            reference: reference.clone(),
                            display_name: display_name.clone(),
                        })
                    }
                    SkillResolution::Resolved { .. } => {}
                }
                skills.insert(normalize_skill_name(&display_name));
            }
            if skills.is_empty() {
                warnings.push(DataQualityWarning::TaskWithoutSkills { task_id });
            }
            skills_by_task.insert(task_id, skills.into_iter().collect());
        }

        skills_by_task
    }

    async fn resolve_clients(
        &self,
        tasks: &[RecurringTask],
        warnings: &mut Vec<DataQualityWarning>,
    ) -> HashMap<Uuid, ClientRevenueRecord> {
        let client_ids: Vec<Uuid> = tasks
            .iter()
            .map(|task| task.client_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let clients = match self.clients.resolve(&client_ids).await {
            Ok(clients) => clients,
            Err(e) => {
                self.observer.record(&PipelineEvent::ClientResolutionFailed {
                    error: e.to_string(),
                });
                warnings.push(DataQualityWarning::ClientLookupFailed {
                    error: e.to_string(),
                });
                return HashMap::new();
            }
        };

        for client_id in client_ids.iter().filter(|id| !clients.contains_key(id)) {
            self.observer
                .record(&PipelineEvent::ClientUnresolved { client_id: *client_id });
            warnings.push(DataQualityWarning::UnresolvedClient {
                client_id: *client_id,
            });
        }

        clients
    }
}

#[cfg(test)]
mod tests {
    use db::models::recurring_task::CreateRecurringTask;

    use super::*;
    use crate::services::{
        events::RecordingObserver,
        skill_cache::SkillCacheManager,
        test_support::{seed_client, seed_skill, seed_staff, seed_task},
    };

    fn month(y: i32, m: u32) -> Month {
        Month::new(y, m).unwrap()
    }

    fn demand_task(name: &str, client_id: Uuid, skills: &[&str], hours: f64) -> DemandTask {
        DemandTask {
            task_id: Uuid::new_v4(),
            task_name: name.to_string(),
            client_id,
            client_name: "Client".to_string(),
            preferred_staff_id: None,
            estimated_hours: hours,
            recurrence_type: RecurrenceType::Monthly,
            recurrence_anchor: None,
            skills: skills.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn service(db: &DBService) -> DemandDataService {
        let cache = Arc::new(SkillCacheManager::new(Arc::new(db.clone())));
        let resolver = Arc::new(SkillResolver::new(cache));
        DemandDataService::new(db.clone(), resolver, ClientResolutionService::new(db.clone()))
    }

    fn january_2024() -> TimeHorizon {
        TimeHorizon::from_months(month(2024, 1), month(2024, 1)).unwrap()
    }

    #[test]
    fn test_two_senior_tasks_sum_into_one_cell() {
        let client = Uuid::new_v4();
        let tasks = vec![
            demand_task("Monthly close", client, &["Senior"], 10.0),
            demand_task("Payroll review", client, &["Senior"], 5.0),
        ];
        let matrix = build_demand_matrix(&[month(2024, 1)], &tasks, HashMap::new());

        let cell = matrix.data_point(month(2024, 1), "Senior").unwrap();
        assert_eq!(cell.demand_hours, 15.0);
        assert_eq!(cell.task_count, 2);
        assert_eq!(cell.client_count, 1);
        assert_eq!(cell.month_label, "Jan 2024");
    }

    #[test]
    fn test_cells_without_tasks_are_absent() {
        let client = Uuid::new_v4();
        let mut annual = demand_task("Year-end audit", client, &["Audit"], 40.0);
        annual.recurrence_type = RecurrenceType::Annually;
        annual.recurrence_anchor = NaiveDate::from_ymd_opt(2024, 3, 31);
        let matrix = build_demand_matrix(&[month(2024, 2), month(2024, 3)], &[annual], HashMap::new());

        assert!(matrix.data_point(month(2024, 2), "Audit").is_none());
        assert_eq!(matrix.data_point(month(2024, 3), "Audit").unwrap().demand_hours, 40.0);
        assert_eq!(matrix.data_points.len(), 1);
    }

    #[test]
    fn test_skill_summary_equals_sum_of_cells() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut weekly = demand_task("Weekly bookkeeping", b, &["Bookkeeping", "Junior"], 2.5);
        weekly.recurrence_type = RecurrenceType::Weekly;
        let tasks = vec![
            demand_task("Close", a, &["Senior", "CPA"], 7.25),
            demand_task("Reconcile", b, &["Junior"], 3.5),
            weekly,
        ];
        let months: Vec<Month> = (1..=6).map(|m| month(2024, m)).collect();
        let matrix = build_demand_matrix(&months, &tasks, HashMap::new());

        for summary in &matrix.skill_summaries {
            let cell_total: f64 = matrix
                .data_points
                .iter()
                .filter(|point| point.skill_type == summary.skill_type)
                .map(|point| point.demand_hours)
                .sum();
            assert_eq!(summary.demand_hours, cell_total, "{}", summary.skill_type);
        }
        let junior = matrix.skill_summary("Junior").unwrap();
        assert_eq!(junior.task_count, 2);
        assert_eq!(junior.client_count, 1);
    }

    #[test]
    fn test_multi_skill_task_counts_once_in_client_totals() {
        let client = Uuid::new_v4();
        let tasks = vec![demand_task("Tax return", client, &["CPA", "Tax Preparation"], 8.0)];
        let revenue = HashMap::from([(client, 1200.0)]);
        let matrix = build_demand_matrix(&[month(2024, 1), month(2024, 2)], &tasks, revenue);

        assert_eq!(matrix.total_demand_hours, 32.0);
        let total = matrix.client_total(client).unwrap();
        assert_eq!(total.demand_hours, 16.0);
        assert_eq!(total.task_count, 1);
        assert_eq!(total.expected_monthly_revenue, Some(1200.0));
    }

    #[test]
    fn test_retain_tasks_rebuilds_cells_and_rollups() {
        let keep_client = Uuid::new_v4();
        let drop_client = Uuid::new_v4();
        let tasks = vec![
            demand_task("Keep", keep_client, &["Senior"], 4.0),
            demand_task("Drop", drop_client, &["Senior", "Audit"], 6.0),
        ];
        let mut matrix = build_demand_matrix(&[month(2024, 1)], &tasks, HashMap::new());
        matrix.retain_tasks(|task| task.client_id == keep_client);

        assert_eq!(matrix.data_points.len(), 1);
        assert_eq!(matrix.data_point(month(2024, 1), "Senior").unwrap().demand_hours, 4.0);
        assert!(matrix.skill_summary("Audit").is_none());
        assert_eq!(matrix.total_demand_hours, 4.0);
        assert!(matrix.client_total(drop_client).is_none());
    }

    #[tokio::test]
    async fn test_generate_forecast_from_database() {
        let db = DBService::new_in_memory().await.unwrap();
        let senior_id = seed_skill(&db, "Senior Staff").await;
        seed_skill(&db, "CPA").await;
        let client = seed_client(&db, "Acme LLC").await;

        seed_task(
            &db,
            CreateRecurringTask::monthly(client, "Monthly close", vec![senior_id.to_string()], 10.0),
        )
        .await;
        seed_task(
            &db,
            CreateRecurringTask::monthly(client, "Payroll review", vec!["senior ".to_string()], 5.0),
        )
        .await;
        seed_task(
            &db,
            CreateRecurringTask::monthly(client, "Tax planning", vec!["cpa".to_string()], 3.0),
        )
        .await;

        let matrix = service(&db)
            .generate_demand_forecast(&january_2024(), &DemandFilters::default())
            .await
            .unwrap();

        assert_eq!(matrix.skills, vec!["CPA".to_string(), "Senior".to_string()]);
        let senior = matrix.data_point(month(2024, 1), "Senior").unwrap();
        assert_eq!(senior.demand_hours, 15.0);
        assert_eq!(senior.task_count, 2);
        assert_eq!(senior.task_breakdown[0].client_name, "Acme LLC");
        assert_eq!(matrix.client_total(client).unwrap().demand_hours, 18.0);
    }

    #[tokio::test]
    async fn test_same_named_clients_are_not_merged() {
        let db = DBService::new_in_memory().await.unwrap();
        let first = seed_client(&db, "Smith & Co").await;
        let second = seed_client(&db, "Smith & Co").await;
        for client in [first, second] {
            seed_task(
                &db,
                CreateRecurringTask::monthly(client, "Bookkeeping", vec!["Bookkeeping".into()], 6.0),
            )
            .await;
        }

        let matrix = service(&db)
            .generate_demand_forecast(&january_2024(), &DemandFilters::default())
            .await
            .unwrap();

        assert_eq!(matrix.client_totals.len(), 2);
        assert_eq!(matrix.client_total(first).unwrap().demand_hours, 6.0);
        assert_eq!(matrix.client_total(second).unwrap().demand_hours, 6.0);
        assert_eq!(matrix.data_point(month(2024, 1), "Bookkeeping").unwrap().client_count, 2);
    }

    #[tokio::test]
    async fn test_inactive_tasks_only_with_include_inactive() {
        let db = DBService::new_in_memory().await.unwrap();
        let client = seed_client(&db, "Acme LLC").await;
        let retired = seed_task(
            &db,
            CreateRecurringTask::monthly(client, "Old engagement", vec!["Audit".into()], 9.0),
        )
        .await;
        RecurringTask::set_active(&db.pool, retired, false).await.unwrap();
        let service = service(&db);

        let active_only = service
            .generate_demand_forecast(&january_2024(), &DemandFilters::default())
            .await
            .unwrap();
        assert!(active_only.data_points.is_empty());

        let filters = DemandFilters {
            include_inactive: true,
            ..Default::default()
        };
        let everything = service
            .generate_demand_forecast(&january_2024(), &filters)
            .await
            .unwrap();
        assert_eq!(everything.total_demand_hours, 9.0);
    }

    #[tokio::test]
    async fn test_data_quality_issues_are_returned_as_warnings() {
        let db = DBService::new_in_memory().await.unwrap();
        let client = seed_client(&db, "Acme LLC").await;
        let task = seed_task(&db, CreateRecurringTask::monthly(client, "Advisory call", vec![], 2.0)).await;
        sqlx::query("UPDATE recurring_tasks SET required_skills = $2 WHERE id = $1")
            .bind(task)
            .bind(format!(r#"["Forensics", 7, "{}"]"#, Uuid::new_v4()))
            .execute(&db.pool)
            .await
            .unwrap();
        let observer = Arc::new(RecordingObserver::default());
        let service = service(&db).with_observer(observer.clone());

        let matrix = service
            .generate_demand_forecast(&january_2024(), &DemandFilters::default())
            .await
            .unwrap();

        assert!(matrix.warnings.contains(&DataQualityWarning::MalformedSkillReference {
            task_id: task,
            value: "7".to_string(),
        }));
        assert!(matrix.warnings.contains(&DataQualityWarning::SkillNotInCatalog {
            task_id: task,
            reference: "Forensics".to_string(),
        }));
        assert!(
            matrix
                .warnings
                .iter()
                .any(|w| matches!(w, DataQualityWarning::UnresolvedSkill { .. }))
        );
        assert!(matrix.skills.iter().any(|s| s.starts_with("Unknown Skill (")));
        assert!(matrix.skills.contains(&"Forensics".to_string()));
        assert_eq!(
            observer.count(|e| matches!(e, PipelineEvent::DemandForecastGenerated { .. })),
            1
        );
    }

    #[tokio::test]
    async fn test_filters_compose() {
        let db = DBService::new_in_memory().await.unwrap();
        let ada = seed_staff(&db, "Ada", &["Senior"], 40.0).await;
        let acme = seed_client(&db, "Acme LLC").await;
        let globex = seed_client(&db, "Globex").await;
        let mut assigned = CreateRecurringTask::monthly(acme, "Close", vec!["Senior".into()], 10.0);
        assigned.preferred_staff_id = Some(ada);
        seed_task(&db, assigned).await;
        seed_task(&db, CreateRecurringTask::monthly(acme, "Audit prep", vec!["Audit".into()], 4.0)).await;
        seed_task(&db, CreateRecurringTask::monthly(globex, "Close", vec!["Senior".into()], 7.0)).await;
        let service = service(&db);

        let filters = DemandFilters {
            client_ids: Some(HashSet::from([acme])),
            skills: Some(BTreeSet::from(["senior".to_string()])),
            ..Default::default()
        };
        let matrix = service
            .generate_demand_forecast(&january_2024(), &filters)
            .await
            .unwrap();
        assert_eq!(matrix.skills, vec!["Senior".to_string()]);
        assert_eq!(matrix.total_demand_hours, 10.0);

        let filters = DemandFilters {
            staff: StaffFilterMode::Unassigned,
            ..Default::default()
        };
        let matrix = service
            .generate_demand_forecast(&january_2024(), &filters)
            .await
            .unwrap();
        assert_eq!(matrix.total_demand_hours, 11.0);
    }
}
