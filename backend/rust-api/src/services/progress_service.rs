use crate::models::plan::{LearningPlan, ModuleStatus, Priority};
use crate::models::ProgressReport;
use crate::utils::time::{parse_estimated_minutes, round_tenths};

fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u32
}

/// Completion and time figures for a plan. Without a plan everything is zero.
pub fn compute_progress(plan: Option<&LearningPlan>) -> ProgressReport {
    let modules = match plan {
        Some(plan) if plan.is_present() => &plan.modules,
        _ => {
            return ProgressReport {
                total_modules: 0,
                completed_modules: 0,
                critical_modules: 0,
                completed_critical_modules: 0,
                completion_percentage: 0,
                critical_completion_percentage: 0,
                time_spent_hours: 0.0,
                time_remaining_hours: 0.0,
                total_time_hours: 0.0,
            }
        }
    };

    let total_modules = modules.len();
    let completed_modules = modules
        .iter()
        .filter(|m| m.status == ModuleStatus::Completed)
        .count();
    let critical_modules = modules
        .iter()
        .filter(|m| m.priority == Priority::Critical)
        .count();
    let completed_critical_modules = modules
        .iter()
        .filter(|m| m.priority == Priority::Critical && m.status == ModuleStatus::Completed)
        .count();

    let (total_minutes, remaining_minutes) =
        modules.iter().fold((0.0, 0.0), |(total, remaining), m| {
            let minutes = parse_estimated_minutes(&m.estimated_time);
            let remaining = if m.status == ModuleStatus::Completed {
                remaining
            } else {
                remaining + minutes
            };
            (total + minutes, remaining)
        });

    // vacuously complete when nothing is critical
    let critical_completion_percentage = if critical_modules == 0 {
        100
    } else {
        percentage(completed_critical_modules, critical_modules)
    };

    ProgressReport {
        total_modules,
        completed_modules,
        critical_modules,
        completed_critical_modules,
        completion_percentage: percentage(completed_modules, total_modules),
        critical_completion_percentage,
        time_spent_hours: round_tenths((total_minutes - remaining_minutes) / 60.0),
        time_remaining_hours: round_tenths(remaining_minutes / 60.0),
        total_time_hours: round_tenths(total_minutes / 60.0),
    }
}
