//! CSV and JSON renderings of a demand matrix.

use std::fmt::Write as _;

use serde::Serialize;
use strum_macros::{Display, EnumString};
use thiserror::Error;

use super::demand::{ClientDemandTotal, DemandMatrix};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize forecast: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }

    pub fn file_extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

const MATRIX_HEADER: &str = "Skill,Month,Demand Hours,Task Count,Client Count";
const CLIENT_HEADER: &str = "Client ID,Client,Demand Hours,Task Count,Expected Monthly Revenue";

/// One row per populated cell, ordered by skill then month
pub fn export_csv(matrix: &DemandMatrix) -> String {
    let mut points: Vec<_> = matrix.data_points.iter().collect();
    points.sort_by(|a, b| a.skill_type.cmp(&b.skill_type).then(a.month.cmp(&b.month)));

    let mut out = String::from(MATRIX_HEADER);
    out.push('\n');
    for point in points {
        let _ = writeln!(
            out,
            "{},{},{:.1},{},{}",
            csv_field(&point.skill_type),
            point.month,
            point.demand_hours,
            point.task_count,
            point.client_count
        );
    }
    out
}

pub fn export_client_totals_csv(totals: &[ClientDemandTotal]) -> String {
    let mut out = String::from(CLIENT_HEADER);
    out.push('\n');
    for total in totals {
        let revenue = total
            .expected_monthly_revenue
            .map(|revenue| format!("{revenue:.2}"))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{},{},{:.2},{},{}",
            total.client_id,
            csv_field(&total.client_name),
            total.demand_hours,
            total.task_count,
            revenue
        );
    }
    out
}

#[derive(Serialize)]
struct MatrixExport<'a> {
    format_version: u32,
    #[serde(flatten)]
    matrix: &'a DemandMatrix,
}

pub fn export_json(matrix: &DemandMatrix) -> Result<String, ExportError> {
    Ok(serde_json::to_string_pretty(&MatrixExport {
        format_version: 1,
        matrix,
    })?)
}

pub fn export(matrix: &DemandMatrix, format: ExportFormat) -> Result<String, ExportError> {
    match format {
        ExportFormat::Csv => Ok(export_csv(matrix)),
        ExportFormat::Json => export_json(matrix),
    }
}

/// Quotes a field when it holds a comma, quote or line break
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
