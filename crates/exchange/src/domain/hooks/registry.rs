use {
    super::{ExecutionPlan, Group, Hook, HookId, Payload, Stage, StageHook},
    crate::domain::ConfigurationError,
    std::{collections::HashMap, sync::Arc, time::Duration},
};

/// A set of hooks developed together, identified by its code.
pub trait Module: Send + Sync {
    fn code(&self) -> &str;

    /// The hooks of this module keyed by their implementation code.
    fn hooks(&self) -> Vec<(String, StageHook)>;
}

/// All hooks known to the process. Built once at startup and read-only
/// afterwards.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    hooks: HashMap<HookId, StageHook>,
}

/// The resolved hooks of one plan group.
pub struct Chain<P: Send + Sync> {
    pub timeout: Duration,
    pub hooks: Vec<(HookId, Arc<dyn Hook<P>>)>,
}

impl Registry {
    pub fn new(modules: &[Arc<dyn Module>]) -> Result<Self, ConfigurationError> {
        let mut hooks = HashMap::new();
        for module in modules {
            for (code, hook) in module.hooks() {
                let id = HookId::new(module.code(), code);
                if hooks.insert(id.clone(), hook).is_some() {
                    return Err(ConfigurationError(format!("hook {id} registered twice")));
                }
            }
        }
        Ok(Self { hooks })
    }

    pub fn hook<P: Payload>(&self, id: &HookId) -> Option<Arc<dyn Hook<P>>> {
        self.hooks.get(id).and_then(P::hook)
    }

    /// Checks that every hook the plan references exists and was registered
    /// for the stage it is planned at.
    pub fn validate(&self, plan: &ExecutionPlan) -> Result<(), ConfigurationError> {
        for (stage, id) in plan.hooks() {
            let hook = self
                .hooks
                .get(id)
                .ok_or_else(|| ConfigurationError(format!("unknown hook {id} planned for {stage}")))?;
            if hook.stage() != stage {
                return Err(ConfigurationError(format!(
                    "hook {id} is registered for {} but planned for {stage}",
                    hook.stage()
                )));
            }
        }
        for group in plan.stages.values().flat_map(|plan| &plan.groups) {
            if group.timeout.is_zero() {
                return Err(ConfigurationError::new("hook group timeout must be positive"));
            }
        }
        Ok(())
    }

    /// Resolves the planned groups of a stage into hook chains. Hooks that
    /// can't be resolved are left out.
    pub fn hooks_for<'a, P: Payload>(
        &self,
        stage: Stage,
        groups: impl IntoIterator<Item = &'a Group>,
    ) -> Vec<Chain<P>> {
        groups
            .into_iter()
            .map(|group| Chain {
                timeout: group.timeout,
                hooks: group
                    .hook_sequence
                    .iter()
                    .filter_map(|id| match self.hook::<P>(id) {
                        Some(hook) => Some((id.clone(), hook)),
                        None => {
                            crate::infra::observe::hook_missing(stage, id);
                            None
                        }
                    })
                    .collect(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}
