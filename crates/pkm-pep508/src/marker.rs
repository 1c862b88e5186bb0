use std::collections::HashMap;
use std::fmt;

/// The string-valued environment markers from PEP 508, e.g. `sys_platform == "linux"`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum MarkerVar {
    OsName,
    SysPlatform,
    PlatformMachine,
    PlatformPythonImplementation,
    PlatformRelease,
    PlatformSystem,
    PlatformVersion,
    PythonVersion,
    PythonFullVersion,
    ImplementationName,
    ImplementationVersion,
    Extra,
}

impl MarkerVar {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "os_name" => Self::OsName,
            "sys_platform" => Self::SysPlatform,
            "platform_machine" => Self::PlatformMachine,
            "platform_python_implementation" => Self::PlatformPythonImplementation,
            "platform_release" => Self::PlatformRelease,
            "platform_system" => Self::PlatformSystem,
            "platform_version" => Self::PlatformVersion,
            "python_version" => Self::PythonVersion,
            "python_full_version" => Self::PythonFullVersion,
            "implementation_name" => Self::ImplementationName,
            "implementation_version" => Self::ImplementationVersion,
            "extra" => Self::Extra,
            _ => return None,
        })
    }
}

impl fmt::Display for MarkerVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OsName => "os_name",
            Self::SysPlatform => "sys_platform",
            Self::PlatformMachine => "platform_machine",
            Self::PlatformPythonImplementation => "platform_python_implementation",
            Self::PlatformRelease => "platform_release",
            Self::PlatformSystem => "platform_system",
            Self::PlatformVersion => "platform_version",
            Self::PythonVersion => "python_version",
            Self::PythonFullVersion => "python_full_version",
            Self::ImplementationName => "implementation_name",
            Self::ImplementationVersion => "implementation_version",
            Self::Extra => "extra",
        })
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    NotIn,
}

/// A concrete set of marker variable values an [`Environment`](pkm's environment) exposes for
/// evaluation. Values are plain strings; `python_version`/`python_full_version` comparisons
/// fall back to lexicographic string comparison when the value isn't a parseable PEP 440
/// version, matching the grammar's actual (surprising) runtime behavior.
#[derive(Debug, Clone, Default)]
pub struct MarkerEnvironment(HashMap<MarkerVar, String>);

impl MarkerEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, var: MarkerVar, value: impl Into<String>) -> Self {
        self.0.insert(var, value.into());
        self
    }

    pub fn get(&self, var: MarkerVar) -> Option<&str> {
        self.0.get(&var).map(String::as_str)
    }
}

/// A boolean expression over environment markers. A dependency whose marker evaluates to
/// `false` in the target environment is inactive and skipped during resolution.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum MarkerTree {
    /// Always true; the dependency applies unconditionally.
    True,
    /// A single `var OP "literal"` comparison (or its reverse, `"literal" OP var`).
    Compare {
        var: MarkerVar,
        op: CompareOp,
        value: String,
    },
    And(Vec<MarkerTree>),
    Or(Vec<MarkerTree>),
    Not(Box<MarkerTree>),
}

impl MarkerTree {
    pub fn and(self, other: MarkerTree) -> Self {
        match (self, other) {
            (Self::True, other) => other,
            (me, Self::True) => me,
            (Self::And(mut lhs), Self::And(rhs)) => {
                lhs.extend(rhs);
                Self::And(lhs)
            }
            (Self::And(mut lhs), rhs) => {
                lhs.push(rhs);
                Self::And(lhs)
            }
            (lhs, rhs) => Self::And(vec![lhs, rhs]),
        }
    }

    pub fn or(self, other: MarkerTree) -> Self {
        Self::Or(vec![self, other])
    }

    pub fn evaluate(&self, env: &MarkerEnvironment) -> bool {
        match self {
            Self::True => true,
            Self::And(terms) => terms.iter().all(|t| t.evaluate(env)),
            Self::Or(terms) => terms.iter().any(|t| t.evaluate(env)),
            Self::Not(inner) => !inner.evaluate(env),
            Self::Compare { var, op, value } => {
                let Some(actual) = env.get(*var) else {
                    return false;
                };
                compare(actual, *op, value)
            }
        }
    }
}

fn compare(actual: &str, op: CompareOp, expected: &str) -> bool {
    use CompareOp::*;
    match op {
        Eq => version_or_string_cmp(actual, expected) == Some(std::cmp::Ordering::Equal)
            || actual == expected,
        NotEq => !(version_or_string_cmp(actual, expected) == Some(std::cmp::Ordering::Equal)
            || actual == expected),
        In => expected.contains(actual),
        NotIn => !expected.contains(actual),
        Lt | LtEq | Gt | GtEq => match version_or_string_cmp(actual, expected) {
            Some(ordering) => match op {
                Lt => ordering.is_lt(),
                LtEq => ordering.is_le(),
                Gt => ordering.is_gt(),
                GtEq => ordering.is_ge(),
                _ => unreachable!(),
            },
            None => false,
        },
    }
}

fn version_or_string_cmp(a: &str, b: &str) -> Option<std::cmp::Ordering> {
    match (pkm_version::Version::parse(a), pkm_version::Version::parse(b)) {
        (Ok(a), Ok(b)) => Some(a.cmp(&b)),
        _ => Some(a.cmp(b)),
    }
}

pub(crate) fn parse_var(name: &str) -> Option<MarkerVar> {
    MarkerVar::parse(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> MarkerEnvironment {
        MarkerEnvironment::new()
            .with(MarkerVar::SysPlatform, "linux")
            .with(MarkerVar::PythonVersion, "3.11")
    }

    #[test]
    fn true_marker_always_applies() {
        assert!(MarkerTree::True.evaluate(&env()));
    }

    #[test]
    fn equality_comparison() {
        let marker = MarkerTree::Compare {
            var: MarkerVar::SysPlatform,
            op: CompareOp::Eq,
            value: "linux".into(),
        };
        assert!(marker.evaluate(&env()));
        let marker = MarkerTree::Compare {
            var: MarkerVar::SysPlatform,
            op: CompareOp::Eq,
            value: "darwin".into(),
        };
        assert!(!marker.evaluate(&env()));
    }

    #[test]
    fn and_short_circuits_on_false() {
        let marker = MarkerTree::True.and(MarkerTree::Compare {
            var: MarkerVar::SysPlatform,
            op: CompareOp::Eq,
            value: "darwin".into(),
        });
        assert!(!marker.evaluate(&env()));
    }

    #[test]
    fn version_comparison_uses_pep440_order() {
        let marker = MarkerTree::Compare {
            var: MarkerVar::PythonVersion,
            op: CompareOp::GtEq,
            value: "3.8".into(),
        };
        assert!(marker.evaluate(&env()));
    }

    #[test]
    fn missing_variable_is_false() {
        let marker = MarkerTree::Compare {
            var: MarkerVar::ImplementationName,
            op: CompareOp::Eq,
            value: "cpython".into(),
        };
        assert!(!marker.evaluate(&env()));
    }
}
