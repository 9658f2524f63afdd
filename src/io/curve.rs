//! Read/write fit JSON files.
//!
//! Fit JSON is the "portable" representation of a magnetization fit:
//! - model kind + parameters (with names and standard errors)
//! - status, SSE and iteration count
//! - a precomputed fitted grid for quick plotting (converged fits only)
//!
//! The schema is defined by `domain::FitFile`.

use std::fs::File;
use std::path::Path;

use chrono::Utc;

use crate::domain::{CurveGrid, CurveGridSpec, FitFile, FitResult, SizeKey};
use crate::error::AppError;
use crate::models::curve_grid;

/// Write a fit JSON file.
pub fn write_fit_json(
    path: &Path,
    size: Option<SizeKey>,
    fit: &FitResult,
    grid: &CurveGridSpec,
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create fit JSON '{}': {e}", path.display())))?;

    let grid = if fit.is_converged() {
        let (temperature, magnetization) = curve_grid(fit.model, &fit.params, grid);
        CurveGrid {
            temperature,
            magnetization,
        }
    } else {
        CurveGrid::default()
    };

    let saved = FitFile {
        tool: "ising".to_string(),
        generated: Utc::now(),
        size,
        model: fit.model,
        param_names: fit.model.param_names().iter().map(|s| s.to_string()).collect(),
        params: fit.params.clone(),
        std_errors: fit.std_errors(),
        covariance: fit
            .covariance
            .as_ref()
            .map(|cov| cov.row_iter().map(|row| row.iter().copied().collect()).collect()),
        status: fit.status.clone(),
        sse: fit.sse.is_finite().then_some(fit.sse),
        iterations: fit.iterations,
        n_points: fit.n_points,
        grid,
    };

    serde_json::to_writer_pretty(file, &saved)
        .map_err(|e| AppError::new(2, format!("Failed to write fit JSON: {e}")))?;

    log::info!("wrote {}", path.display());
    Ok(())
}

/// Read a fit JSON file.
pub fn read_fit_json(path: &Path) -> Result<FitFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open fit JSON '{}': {e}", path.display())))?;
    let saved: FitFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid fit JSON: {e}")))?;
    Ok(saved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FailureReason, FitStatus, ModelKind};
    use nalgebra::DMatrix;

    fn fit(status: FitStatus) -> FitResult {
        FitResult {
            model: ModelKind::TanhStep,
            params: vec![1.2, 2.8, 0.5, 0.5],
            covariance: status
                .eq(&FitStatus::Converged)
                .then(|| DMatrix::from_diagonal_element(4, 4, 1e-6)),
            status,
            sse: 2.5e-4,
            iterations: 9,
            n_points: 46,
        }
    }

    #[test]
    fn converged_fit_round_trips_with_grid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fit.json");
        write_fit_json(&path, Some(SizeKey(32)), &fit(FitStatus::Converged), &CurveGridSpec::default()).unwrap();

        let saved = read_fit_json(&path).unwrap();
        assert_eq!(saved.status, FitStatus::Converged);
        assert_eq!(saved.size, Some(SizeKey(32)));
        assert_eq!(saved.params, vec![1.2, 2.8, 0.5, 0.5]);
        assert_eq!(saved.param_names, vec!["A", "B", "C", "D"]);
        assert_eq!(saved.covariance.as_ref().map(|c| c.len()), Some(4));
        assert!(!saved.grid.temperature.is_empty());
        assert_eq!(saved.grid.temperature.len(), saved.grid.magnetization.len());
    }

    #[test]
    fn failed_fit_keeps_status_and_has_no_grid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fit.json");
        let status = FitStatus::FailedToConverge(FailureReason::SingularJacobian);
        write_fit_json(&path, None, &fit(status.clone()), &CurveGridSpec::default()).unwrap();

        let saved = read_fit_json(&path).unwrap();
        assert_eq!(saved.status, status);
        assert!(saved.std_errors.is_none());
        assert!(saved.grid.temperature.is_empty());
    }

    #[test]
    fn missing_file_is_input_error() {
        let err = read_fit_json(Path::new("/nonexistent/fit.json")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
