//! Analysis result records.
//!
//! These are the values written to and read back from result files, so every
//! record derives serde. Optional parts are omitted from the output when
//! absent.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::algebra::{Relation, Scalar};
use crate::bound::{Bound, MwpBound};
use crate::choice::Choices;

/// Statistics about the analyzed source file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramInfo {
    /// File name without directory or extension
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub n_lines: usize,
    /// Every function definition, analyzed or not
    pub n_func: usize,
    /// Every loop, analyzed or not
    pub n_loops: usize,
    #[serde(default)]
    pub n_func_vars: usize,
    #[serde(default)]
    pub n_loop_vars: usize,
}

// ============================================================================
// Function results
// ============================================================================

/// Result of analyzing one function.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FuncResult {
    pub name: String,
    /// No choice yields a polynomial bound
    #[serde(rename = "infinity")]
    pub infinite: bool,
    /// Number of choice indices the analysis consumed
    pub index: usize,
    pub variables: Vec<String>,
    /// Omitted when the analysis stopped early on an infinite result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<Relation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Choices>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound: Option<Bound>,
    /// Flows responsible for an infinite result, `x ➔ y ‖ …`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inf_flows: Option<String>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl FuncResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Number of choice vectors yielding a bound.
    pub fn n_bounds(&self) -> u128 {
        self.choices.as_ref().map_or(0, Choices::n_bounds)
    }
}

impl fmt::Display for FuncResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "function: {} • time: {} ms", self.name, self.duration_ms)?;
        write!(f, "variables: {}", self.variables.len())?;
        if self.infinite {
            write!(f, " • num-bounds: 0 (infinite)")?;
            if let Some(flows) = self.inf_flows.as_ref().filter(|s| !s.is_empty()) {
                write!(f, "\nproblematic flows: {}", flows)?;
            }
        } else if !self.variables.is_empty() {
            write!(f, " • num-bounds: {}", self.n_bounds())?;
            if let Some(bound) = &self.bound {
                write!(f, "\n{}", bound.show(true, true))?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Loop results
// ============================================================================

/// Result for one variable of a loop.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VResult {
    pub name: String,
    /// Least scalar class that admits a bound (`m`, `w` or `p`); `None` when
    /// the variable may grow beyond any polynomial
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub growth: Option<Scalar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bound: Option<MwpBound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Choices>,
}

impl VResult {
    /// A variable without a known bound.
    pub fn unbounded(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_m(&self) -> bool {
        self.growth == Some(Scalar::M)
    }

    pub fn is_w(&self) -> bool {
        matches!(self.growth, Some(Scalar::M | Scalar::W))
    }

    pub fn is_p(&self) -> bool {
        self.growth.is_some()
    }

    pub fn is_unbounded(&self) -> bool {
        !self.is_p()
    }
}

/// Result of analyzing one loop in isolation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoopResult {
    /// The loop, printed as C
    pub code: String,
    pub variables: IndexMap<String, VResult>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl LoopResult {
    /// Variables with a linear (`m`) bound.
    pub fn linear(&self) -> Vec<&str> {
        self.select(VResult::is_m)
    }

    /// Variables with a weak polynomial bound but no linear one.
    pub fn weak(&self) -> Vec<&str> {
        self.select(|r| r.is_w() && !r.is_m())
    }

    /// Variables with a polynomial bound but no weak one.
    pub fn poly(&self) -> Vec<&str> {
        self.select(|r| r.is_p() && !r.is_w())
    }

    pub fn unbounded(&self) -> Vec<&str> {
        self.select(VResult::is_unbounded)
    }

    fn select(&self, pred: impl Fn(&VResult) -> bool) -> Vec<&str> {
        self.variables
            .iter()
            .filter(|entry| pred(entry.1))
            .map(|(v, _)| v.as_str())
            .collect()
    }

    /// Bounds of the bounded variables, sorted by name.
    pub fn as_bound(&self) -> Bound {
        let mut bounded: Vec<(String, MwpBound)> = self
            .variables
            .iter()
            .filter_map(|(v, r)| r.bound.clone().map(|b| (v.clone(), b)))
            .collect();
        bounded.sort_by(|a, b| a.0.cmp(&b.0));
        bounded.into_iter().collect()
    }

    /// First line of the loop, shortened.
    pub fn header(&self) -> String {
        let line = self.code.lines().next().unwrap_or_default().trim();
        let short: String = line.chars().take(40).collect();
        format!("{}…", short)
    }
}

impl fmt::Display for LoopResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |vars: Vec<&str>| {
            if vars.is_empty() {
                "—".to_string()
            } else {
                vars.join(", ")
            }
        };
        write!(f, "{}", self.header())?;
        if self.variables.is_empty() {
            return write!(f, "\nvariables: 0");
        }
        write!(f, "\nlinear: {}", list(self.linear()))?;
        write!(f, "\nindependent: {}", list(self.weak()))?;
        write!(f, "\npolynomial: {}", list(self.poly()))?;
        write!(f, "\ninfinity: {}", list(self.unbounded()))?;
        write!(f, "\n{}", self.as_bound().show(true, true))
    }
}

/// Loop results of one function.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuncLoops {
    pub name: String,
    pub loops: Vec<LoopResult>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl fmt::Display for FuncLoops {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "function: {} • loops: {} • time: {} ms",
            self.name,
            self.loops.len(),
            self.duration_ms
        )?;
        for (i, lp) in self.loops.iter().enumerate() {
            write!(f, "\n{} ::: {}", i + 1, lp)?;
        }
        Ok(())
    }
}

// ============================================================================
// Program report
// ============================================================================

/// Everything an analysis run produces for one source file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub program: ProgramInfo,
    /// Function name to result, in source order
    #[serde(default)]
    pub relations: IndexMap<String, FuncResult>,
    /// Present in loop analysis mode
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub loops: IndexMap<String, FuncLoops>,
    #[serde(default)]
    pub duration_ms: u64,
}

impl AnalysisReport {
    pub fn add_relation(&mut self, result: FuncResult) {
        self.relations.insert(result.name.clone(), result);
    }

    pub fn add_loops(&mut self, result: FuncLoops) {
        self.loops.insert(result.name.clone(), result);
    }

    pub fn function(&self, name: &str) -> Option<&FuncResult> {
        self.relations.get(name)
    }

    /// Log every result at info level.
    pub fn log(&self) {
        for result in self.relations.values() {
            info!("\n{}", result);
        }
        for result in self.loops.values() {
            info!("\n{}", result);
        }
        info!(
            "total time: {:.1} s ({} ms)",
            self.duration_ms as f64 / 1000.0,
            self.duration_ms
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vresult_classes() {
        let mut r = VResult::unbounded("x");
        assert!(r.is_unbounded());
        r.growth = Some(Scalar::W);
        assert!(r.is_w() && r.is_p() && !r.is_m());
    }

    #[test]
    fn test_omits_absent_fields() {
        let mut result = FuncResult::new("f");
        result.infinite = true;
        let json = serde_json::to_value(&result).expect("serialize");
        assert_eq!(json["infinity"], serde_json::json!(true));
        assert!(json.get("relation").is_none());
        assert!(json.get("choices").is_none());
    }

    #[test]
    fn test_loop_header() {
        let lp = LoopResult {
            code: "while (x < y) {\n    x = x + 1;\n}".into(),
            ..LoopResult::default()
        };
        assert_eq!(lp.header(), "while (x < y) {…");
    }
}
