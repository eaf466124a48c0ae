//! Human-readable rendering of resolutions and the registry

use crate::cli::args::Verbosity;
use crate::errors::ResolveError;
use crate::postprocess::Decision;
use crate::registry::DatabaseRegistry;
use crate::resolver::Resolution;
use crate::search::OutcomeStatus;
use colored::{ColoredString, Colorize};
use std::fmt::Write;

fn status_label(status: OutcomeStatus) -> ColoredString {
    match status {
        OutcomeStatus::Ok => status.as_str().green(),
        OutcomeStatus::Relaxed => status.as_str().yellow(),
        OutcomeStatus::Empty => status.as_str().dimmed(),
        OutcomeStatus::Error | OutcomeStatus::Timeout => status.as_str().red(),
    }
}

/// Render a resolution for the terminal
pub fn render_resolution(resolution: &Resolution, verbosity: Verbosity) -> String {
    let mut out = String::new();
    let response = &resolution.response;

    let _ = writeln!(out, "{} {}", "Query:".bold(), resolution.query_used);
    let _ = writeln!(
        out,
        "{} {} found, {} returned",
        "Results:".bold(),
        response.n_found,
        response.returned
    );

    match &resolution.decision {
        Decision::ServePartial => {}
        Decision::ServeEmptyWithReason { reason } => {
            let _ = writeln!(out, "{} {}", "No results:".yellow().bold(), reason);
        }
        Decision::Escalate { fault, reason } => {
            let _ = writeln!(
                out,
                "{} {} ({})",
                "Failed:".red().bold(),
                reason,
                fault
            );
        }
    }

    for (rank, entry) in response.results.iter().enumerate() {
        let result = &entry.result;
        let _ = writeln!(
            out,
            "\n{:>2}. {}  {}",
            rank + 1,
            result.label().bold(),
            format!("[{}] score {:.3}", result.source, entry.score).dimmed()
        );
        if let Some(sg) = result.space_group {
            let _ = writeln!(out, "    space group {}", sg);
        }
        if let Some(gap) = result.band_gap {
            let _ = writeln!(out, "    band gap {:.2} eV", gap);
        }
        if let Some(energy) = result.formation_energy {
            let _ = writeln!(out, "    formation energy {:.3} eV/atom", energy);
        }
        if let Some(file) = &result.structure_file {
            let _ = writeln!(out, "    {}", file.cyan());
        }
        if !entry.also_found_in.is_empty() {
            let _ = writeln!(out, "    also in {}", entry.also_found_in.join(", "));
        }
    }

    if verbosity.show_backends() {
        let _ = writeln!(out, "\n{}", "Backends:".bold());
        for backend in &response.backends {
            let _ = write!(
                out,
                "  {:<14} {:<8} {} result(s)",
                backend.backend_id,
                status_label(backend.status),
                backend.result_count
            );
            if backend.relaxation_steps > 0 {
                let _ = write!(out, ", {} relaxation step(s)", backend.relaxation_steps);
            }
            if let Some(message) = &backend.message {
                let _ = write!(out, "  {}", message.dimmed());
            }
            out.push('\n');
        }
    }

    out
}

/// Render the registered databases
pub fn render_registry(registry: &DatabaseRegistry) -> String {
    let mut out = String::new();
    for descriptor in registry.iter() {
        let filters: Vec<&str> = descriptor
            .supported_filters
            .iter()
            .map(|k| k.as_str())
            .collect();
        let materials: Vec<&str> = descriptor
            .material_types
            .iter()
            .map(|m| m.as_str())
            .collect();

        let _ = writeln!(
            out,
            "{} ({})",
            descriptor.id.bold(),
            descriptor.name
        );
        if !descriptor.description.is_empty() {
            let _ = writeln!(out, "  {}", descriptor.description);
        }
        let _ = writeln!(out, "  filters:   {}", filters.join(", "));
        let _ = writeln!(out, "  materials: {}", materials.join(", "));
        if !descriptor.domains.is_empty() {
            let _ = writeln!(out, "  domains:   {}", descriptor.domains.join(", "));
        }
        let _ = writeln!(
            out,
            "  cost {}  priority {}",
            descriptor.cost, descriptor.priority
        );
    }
    out
}

/// One-line error for stderr
pub fn render_error(error: &ResolveError) -> String {
    format!("{} {}", "Error:".red().bold(), error)
}
