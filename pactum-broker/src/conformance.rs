//! Startup conformance rules for registered policies.

use pactum_types::{PactumError, PactumResult, Policy, PolicySet};

/// A set of rules every registered policy must meet before the broker starts.
pub trait PolicyConformanceCheck: Send + Sync {
    fn check_policies_conform(&self, policies: &PolicySet) -> PactumResult<()>;
}

/// Requires a non-blank description on every policy and at least one
/// retention rule on every target.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPolicyConformanceCheck;

impl DefaultPolicyConformanceCheck {
    fn issues(policy: &Policy) -> impl Iterator<Item = String> + '_ {
        let description = policy
            .description
            .trim()
            .is_empty()
            .then(|| format!("Policy: \"{}\" has an empty description", policy.name));

        let retentions = policy
            .targets
            .iter()
            .filter(|target| target.retentions.is_empty())
            .map(move |target| {
                format!(
                    "Target \"{}\" from policy: \"{}\" does not specify any retention rules",
                    target.schema_name, policy.name
                )
            });

        description.into_iter().chain(retentions)
    }
}

impl PolicyConformanceCheck for DefaultPolicyConformanceCheck {
    fn check_policies_conform(&self, policies: &PolicySet) -> PactumResult<()> {
        let issues: Vec<String> = policies.iter().flat_map(|p| Self::issues(p)).collect();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(PactumError::MalformedPolicySet(issues))
        }
    }
}
