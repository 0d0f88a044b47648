//! Report Writer (spec §4.8, §6): renders the final coverage report as JSON
//! once the Tracer Orchestrator has torn down the pipeline.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use crate::ack_set::AcknowledgementSet;
use crate::error::CoreError;
use crate::tracee::Tracee;

/// The on-disk coverage report. Field names and shape match the external
/// contract in spec §6 exactly: `traced`/`acknowledged` are unordered name
/// lists (clients must treat them as sets, per spec §3), `cov_by_func` is
/// the percentage as a float.
#[derive(Debug, Serialize)]
pub struct CoverageReport {
    pub funcs_traced: Vec<String>,
    pub funcs_ack: Vec<String>,
    pub cov_by_func: f64,
    pub exe_path: String,
}

impl CoverageReport {
    /// Builds the report from the Tracee's function table and the final
    /// Acknowledgement Set snapshot. `cov_by_func = 100 * |acknowledged| /
    /// |traced|` (spec §3).
    pub fn build(tracee: &Tracee, ack: &AcknowledgementSet) -> Self {
        let acknowledged_cookies: HashSet<_> = ack.snapshot().into_iter().collect();
        let funcs_traced: Vec<String> = tracee.function_table().values().map(|f| f.name.clone()).collect();
        let funcs_ack: Vec<String> = tracee
            .function_table()
            .values()
            .filter(|f| acknowledged_cookies.contains(&f.cookie))
            .map(|f| f.name.clone())
            .collect();

        let cov_by_func = if funcs_traced.is_empty() {
            0.0
        } else {
            100.0 * funcs_ack.len() as f64 / funcs_traced.len() as f64
        };

        Self {
            funcs_traced,
            funcs_ack,
            cov_by_func,
            exe_path: tracee.exe_path().display().to_string(),
        }
    }

    /// Serialises the report as pretty-printed JSON and writes it to
    /// `path`, replacing any existing file at that path.
    pub fn write_to(&self, path: &Path) -> Result<(), CoreError> {
        let json = serde_json::to_string_pretty(self).map_err(CoreError::Report)?;
        std::fs::write(path, json).map_err(CoreError::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::SymbolFilter;
    use std::collections::HashMap;

    fn tracee_with(names: &[&str]) -> Tracee {
        // Tracee::load requires a real ELF, so we build the equivalent
        // in-memory state through its public surface is not possible here;
        // instead exercise CoverageReport::build against a hand-built
        // function table via the same shape tracee.rs produces.
        let _ = SymbolFilter::builder().build().unwrap();
        let mut functions = HashMap::new();
        for name in names {
            let cookie = xcover_common::fnv1a_64(name);
            functions.insert(
                cookie,
                crate::tracee::FunctionRecord {
                    name: name.to_string(),
                    binding: xcover_common::Binding::Global,
                    file_offset: 0,
                    cookie,
                },
            );
        }
        Tracee::from_parts("/bin/true".into(), functions)
    }

    #[test]
    fn report_marks_acknowledged_functions_covered() {
        let tracee = tracee_with(&["alpha", "beta"]);
        let ack = AcknowledgementSet::new();
        ack.insert_if_absent(xcover_common::fnv1a_64("alpha"));

        let report = CoverageReport::build(&tracee, &ack);
        assert_eq!(report.funcs_traced.len(), 2);
        assert_eq!(report.funcs_ack, vec!["alpha".to_string()]);
        assert!((report.cov_by_func - 50.0).abs() < f64::EPSILON);
        assert_eq!(report.exe_path, "/bin/true");
    }

    #[test]
    fn report_ack_is_subset_of_traced() {
        let tracee = tracee_with(&["alpha", "beta", "gamma"]);
        let ack = AcknowledgementSet::new();
        ack.insert_if_absent(xcover_common::fnv1a_64("alpha"));
        ack.insert_if_absent(xcover_common::fnv1a_64("gamma"));

        let report = CoverageReport::build(&tracee, &ack);
        let traced: HashSet<_> = report.funcs_traced.iter().collect();
        assert!(report.funcs_ack.iter().all(|name| traced.contains(name)));
        assert!((report.cov_by_func - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn empty_traced_set_yields_zero_coverage() {
        let tracee = tracee_with(&[]);
        let ack = AcknowledgementSet::new();
        let report = CoverageReport::build(&tracee, &ack);
        assert_eq!(report.cov_by_func, 0.0);
    }

    #[test]
    fn report_serializes_with_spec_field_names() {
        let tracee = tracee_with(&["alpha"]);
        let ack = AcknowledgementSet::new();
        let report = CoverageReport::build(&tracee, &ack);
        let json = serde_json::to_string(&report).unwrap();
        for key in ["funcs_traced", "funcs_ack", "cov_by_func", "exe_path"] {
            assert!(json.contains(key), "missing field {key} in {json}");
        }
    }
}
