use {
    super::Stage,
    serde::{Deserialize, Serialize},
    std::{collections::HashMap, time::Duration},
};

/// Which hooks run at which stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ExecutionPlan {
    #[serde(default)]
    pub stages: HashMap<Stage, StagePlan>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct StagePlan {
    #[serde(default)]
    pub groups: Vec<Group>,
}

/// Hooks that run one after the other, each bounded by the group timeout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Group {
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub hook_sequence: Vec<HookId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct HookId {
    pub module_code: String,
    pub hook_impl_code: String,
}

impl HookId {
    pub fn new(module_code: impl Into<String>, hook_impl_code: impl Into<String>) -> Self {
        Self {
            module_code: module_code.into(),
            hook_impl_code: hook_impl_code.into(),
        }
    }
}

impl std::fmt::Display for HookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.module_code, self.hook_impl_code)
    }
}

impl ExecutionPlan {
    pub fn groups(&self, stage: Stage) -> &[Group] {
        self.stages
            .get(&stage)
            .map(|plan| plan.groups.as_slice())
            .unwrap_or_default()
    }

    /// Every hook the plan references, with the stage it is referenced at.
    pub fn hooks(&self) -> impl Iterator<Item = (Stage, &HookId)> {
        self.stages.iter().flat_map(|(stage, plan)| {
            plan.groups
                .iter()
                .flat_map(move |group| group.hook_sequence.iter().map(move |id| (*stage, id)))
        })
    }

    pub fn with_group(mut self, stage: Stage, group: Group) -> Self {
        self.stages.entry(stage).or_default().groups.push(group);
        self
    }
}

impl Group {
    pub fn new(timeout: Duration, hook_sequence: impl IntoIterator<Item = HookId>) -> Self {
        Self {
            timeout,
            hook_sequence: hook_sequence.into_iter().collect(),
        }
    }
}
