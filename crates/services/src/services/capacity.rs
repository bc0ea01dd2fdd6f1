//! Staff capacity per skill and month, and the demand-vs-capacity forecast built from it.
//!
//! A staff member's monthly hours are their weekly capacity scaled by the
//! month's weekdays (`weekly * weekdays / 5`), split evenly across the skills
//! they hold.

use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use db::{DBService, models::staff::Staff};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use super::{
    demand::DemandMatrix,
    period::{Month, TimeHorizon},
    skill_mapping::normalize_skill_name,
    skill_resolver::SkillResolver,
    staff_filter::StaffFilterMode,
};

const WORKDAYS_PER_WEEK: f64 = 5.0;

#[derive(Debug, Error)]
pub enum CapacityError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaffCapacity {
    pub staff_id: Uuid,
    pub full_name: String,
    pub weekly_capacity_hours: f64,
    /// Canonical skill names, deduplicated
    pub skills: Vec<String>,
}

impl StaffCapacity {
    pub fn monthly_hours(&self, month: Month) -> f64 {
        self.weekly_capacity_hours * f64::from(month.weekday_count()) / WORKDAYS_PER_WEEK
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CapacityDataPoint {
    pub skill_type: String,
    pub month: Month,
    pub capacity_hours: f64,
    pub staff_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CapacityMatrix {
    pub months: Vec<Month>,
    pub skills: Vec<String>,
    pub data_points: Vec<CapacityDataPoint>,
    pub total_capacity_hours: f64,
}

impl CapacityMatrix {
    pub fn data_point(&self, month: Month, skill_type: &str) -> Option<&CapacityDataPoint> {
        self.data_points
            .iter()
            .find(|point| point.month == month && point.skill_type == skill_type)
    }
}

pub fn build_capacity_matrix(months: &[Month], staff: &[StaffCapacity]) -> CapacityMatrix {
    let skills: BTreeSet<String> = staff
        .iter()
        .flat_map(|member| member.skills.iter().cloned())
        .collect();

    let mut data_points = Vec::new();
    for month in months {
        for skill in &skills {
            let holders: Vec<&StaffCapacity> = staff
                .iter()
                .filter(|member| member.skills.contains(skill))
                .collect();
            let capacity_hours: f64 = holders
                .iter()
                .map(|member| member.monthly_hours(*month) / member.skills.len() as f64)
                .sum();
            if capacity_hours > 0.0 {
                data_points.push(CapacityDataPoint {
                    skill_type: skill.clone(),
                    month: *month,
                    capacity_hours,
                    staff_count: holders.len(),
                });
            }
        }
    }

    CapacityMatrix {
        months: months.to_vec(),
        skills: skills.into_iter().collect(),
        total_capacity_hours: data_points.iter().map(|point| point.capacity_hours).sum(),
        data_points,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastCell {
    pub skill_type: String,
    pub month: Month,
    pub demand_hours: f64,
    pub capacity_hours: f64,
    /// Capacity minus demand; negative means a shortfall
    pub gap_hours: f64,
    /// Demand over capacity; `None` without capacity
    pub utilization: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ForecastMatrix {
    pub months: Vec<Month>,
    pub skills: Vec<String>,
    pub cells: Vec<ForecastCell>,
    pub total_demand_hours: f64,
    pub total_capacity_hours: f64,
    pub generated_at: DateTime<Utc>,
}

impl ForecastMatrix {
    pub fn cell(&self, month: Month, skill_type: &str) -> Option<&ForecastCell> {
        self.cells
            .iter()
            .find(|cell| cell.month == month && cell.skill_type == skill_type)
    }

    /// Cells where demand exceeds capacity
    pub fn shortfalls(&self) -> impl Iterator<Item = &ForecastCell> {
        self.cells.iter().filter(|cell| cell.gap_hours < 0.0)
    }
}

/// Joins both grids on (month, skill). Cells absent from both sides stay absent.
pub fn build_forecast_matrix(demand: &DemandMatrix, capacity: &CapacityMatrix) -> ForecastMatrix {
    let skills: BTreeSet<String> = demand
        .skills
        .iter()
        .chain(capacity.skills.iter())
        .cloned()
        .collect();
    let demand_by_cell: HashMap<(Month, &str), f64> = demand
        .data_points
        .iter()
        .map(|point| ((point.month, point.skill_type.as_str()), point.demand_hours))
        .collect();
    let capacity_by_cell: HashMap<(Month, &str), f64> = capacity
        .data_points
        .iter()
        .map(|point| ((point.month, point.skill_type.as_str()), point.capacity_hours))
        .collect();

    let mut cells = Vec::new();
    for month in &demand.months {
        for skill in &skills {
            let key = (*month, skill.as_str());
            let demand_hours = demand_by_cell.get(&key).copied();
            let capacity_hours = capacity_by_cell.get(&key).copied();
            if demand_hours.is_none() && capacity_hours.is_none() {
                continue;
            }
            let demand_hours = demand_hours.unwrap_or(0.0);
            let capacity_hours = capacity_hours.unwrap_or(0.0);
            cells.push(ForecastCell {
                skill_type: skill.clone(),
                month: *month,
                demand_hours,
                capacity_hours,
                gap_hours: capacity_hours - demand_hours,
                utilization: (capacity_hours > 0.0).then(|| demand_hours / capacity_hours),
            });
        }
    }

    ForecastMatrix {
        months: demand.months.clone(),
        skills: skills.into_iter().collect(),
        total_demand_hours: cells.iter().map(|cell| cell.demand_hours).sum(),
        total_capacity_hours: cells.iter().map(|cell| cell.capacity_hours).sum(),
        cells,
        generated_at: Utc::now(),
    }
}

pub struct CapacityService {
    db: DBService,
    resolver: Arc<SkillResolver>,
}

impl CapacityService {
    pub fn new(db: DBService, resolver: Arc<SkillResolver>) -> Self {
        Self { db, resolver }
    }

    /// Active staff with skills resolved. `Specific` narrows to the listed
    /// staff; the other modes keep everyone.
    pub async fn staff_capacity(
        &self,
        staff_filter: &StaffFilterMode,
    ) -> Result<Vec<StaffCapacity>, CapacityError> {
        let staff = Staff::find_active(&self.db.pool).await?;
        let mut capacities = Vec::with_capacity(staff.len());

        for member in staff {
            if let StaffFilterMode::Specific(ids) = staff_filter {
                if !ids.contains(&member.id) {
                    continue;
                }
            }
            let references = member.skill_references().references;
            let skills: BTreeSet<String> = self
                .resolver
                .get_skill_names(&references)
                .await
                .iter()
                .map(|name| normalize_skill_name(name))
                .collect();
            if skills.is_empty() {
                debug!(staff_id = %member.id, "Staff member has no skills; no capacity counted");
            }
            capacities.push(StaffCapacity {
                staff_id: member.id,
                full_name: member.full_name,
                weekly_capacity_hours: member.weekly_capacity_hours,
                skills: skills.into_iter().collect(),
            });
        }

        Ok(capacities)
    }

    pub async fn generate_capacity(
        &self,
        horizon: &TimeHorizon,
        staff_filter: &StaffFilterMode,
    ) -> Result<CapacityMatrix, CapacityError> {
        let staff = self.staff_capacity(staff_filter).await?;
        Ok(build_capacity_matrix(&horizon.months(), &staff))
    }
}

#[cfg(test)]
mod tests {
    use db::models::staff::StaffStatus;

    use super::*;
    use crate::services::{
        demand::{DemandTask, build_demand_matrix},
        skill_cache::SkillCacheManager,
        test_support::{seed_skill, seed_staff},
    };

    fn month(y: i32, m: u32) -> Month {
        Month::new(y, m).unwrap()
    }

    fn member(skills: &[&str], weekly: f64) -> StaffCapacity {
        StaffCapacity {
            staff_id: Uuid::new_v4(),
            full_name: "Staff".to_string(),
            weekly_capacity_hours: weekly,
            skills: skills.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_capacity_scales_by_weekdays_and_splits_across_skills() {
        // January 2024 has 23 weekdays: 40h/week -> 184h
        let staff = vec![member(&["Senior"], 40.0), member(&["Senior", "CPA"], 40.0)];
        let matrix = build_capacity_matrix(&[month(2024, 1)], &staff);

        let senior = matrix.data_point(month(2024, 1), "Senior").unwrap();
        assert_eq!(senior.capacity_hours, 184.0 + 92.0);
        assert_eq!(senior.staff_count, 2);
        assert_eq!(matrix.data_point(month(2024, 1), "CPA").unwrap().capacity_hours, 92.0);
        assert_eq!(matrix.total_capacity_hours, 368.0);
    }

    #[test]
    fn test_forecast_reports_gap_and_utilization() {
        let demand = build_demand_matrix(
            &[month(2024, 1)],
            &[DemandTask {
                task_id: Uuid::new_v4(),
                task_name: "Audit fieldwork".to_string(),
                client_id: Uuid::new_v4(),
                client_name: "Acme LLC".to_string(),
                preferred_staff_id: None,
                estimated_hours: 46.0,
                recurrence_type: Default::default(),
                recurrence_anchor: None,
                skills: vec!["Audit".to_string(), "Manager".to_string()],
            }],
            HashMap::new(),
        );
        let capacity = build_capacity_matrix(&[month(2024, 1)], &[member(&["Audit"], 10.0)]);
        let forecast = build_forecast_matrix(&demand, &capacity);

        let audit = forecast.cell(month(2024, 1), "Audit").unwrap();
        assert_eq!(audit.capacity_hours, 46.0);
        assert_eq!(audit.gap_hours, 0.0);
        assert_eq!(audit.utilization, Some(1.0));

        let manager = forecast.cell(month(2024, 1), "Manager").unwrap();
        assert_eq!(manager.gap_hours, -46.0);
        assert_eq!(manager.utilization, None);
        assert_eq!(forecast.shortfalls().count(), 1);
    }

    #[tokio::test]
    async fn test_staff_capacity_from_database() {
        let db = DBService::new_in_memory().await.unwrap();
        let cpa = seed_skill(&db, "CPA").await;
        let ada = seed_staff(&db, "Ada", &[&cpa.to_string(), "Senior Staff"], 30.0).await;
        let grace = seed_staff(&db, "Grace", &["Junior"], 40.0).await;
        let retired = seed_staff(&db, "Retired", &["Partner"], 40.0).await;
        Staff::update_status(&db.pool, retired, StaffStatus::Inactive)
            .await
            .unwrap();

        let cache = Arc::new(SkillCacheManager::new(Arc::new(db.clone())));
        let service = CapacityService::new(db.clone(), Arc::new(SkillResolver::new(cache)));

        let everyone = service.staff_capacity(&StaffFilterMode::All).await.unwrap();
        assert_eq!(everyone.len(), 2);
        let ada_capacity = everyone.iter().find(|s| s.staff_id == ada).unwrap();
        assert_eq!(ada_capacity.skills, vec!["CPA".to_string(), "Senior".to_string()]);

        let only_grace = service
            .staff_capacity(&StaffFilterMode::Specific(BTreeSet::from([grace])))
            .await
            .unwrap();
        assert_eq!(only_grace.len(), 1);
        assert_eq!(only_grace[0].skills, vec!["Junior".to_string()]);
    }
}
