use {
    super::{
        Action,
        Entity,
        ExecutionContext,
        ExecutionPlan,
        Group,
        Hook,
        HookOutcome,
        Invocation,
        InvocationResult,
        InvocationStatus,
        Payload,
        Registry,
        Rejection,
        Stage,
        StageOutcome,
        StageResult,
        Status,
        outcome::{Effect, GroupOutcome},
    },
    crate::{
        domain::{Account, ConfigurationError, bidder},
        infra::observe,
    },
    arc_swap::ArcSwap,
    futures::FutureExt,
    serde_json::Value,
    std::{any::Any, collections::HashMap, panic::AssertUnwindSafe, sync::Arc},
    tokio::time::Instant,
};

/// Host level hook configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Runs for every account, before the account's own plan.
    pub host_plan: ExecutionPlan,
    /// Used for accounts that don't configure a plan.
    pub default_account_plan: ExecutionPlan,
    /// Enables or disables modules regardless of the account configuration.
    pub module_execution: HashMap<String, bool>,
    /// Only run modules the account configures or explicitly enables.
    pub require_config_to_invoke: bool,
}

#[derive(Debug)]
struct Hooks {
    registry: Registry,
    config: Config,
}

impl Hooks {
    fn new(registry: Registry, config: Config) -> Result<Self, ConfigurationError> {
        registry.validate(&config.host_plan)?;
        registry.validate(&config.default_account_plan)?;
        Ok(Self { registry, config })
    }

    /// Host groups followed by the account groups. Without an account only
    /// the host plan applies.
    fn groups<'a>(
        &'a self,
        stage: Stage,
        account: Option<&'a Account>,
    ) -> impl Iterator<Item = &'a Group> {
        let account_groups = account
            .map(|account| {
                account
                    .hooks
                    .execution_plan
                    .as_ref()
                    .unwrap_or(&self.config.default_account_plan)
                    .groups(stage)
            })
            .unwrap_or_default();
        self.config
            .host_plan
            .groups(stage)
            .iter()
            .chain(account_groups)
    }

    fn enabled(&self, module: &str, account: Option<&Account>) -> bool {
        if let Some(enabled) = self.config.module_execution.get(module) {
            return *enabled;
        }
        let Some(account) = account else {
            return true;
        };
        match account.hooks.module_execution.get(module) {
            Some(enabled) => *enabled,
            None => {
                !self.config.require_config_to_invoke || account.hooks.modules.contains_key(module)
            }
        }
    }
}

/// Runs the hook chains of a stage.
///
/// The registry and plans are only ever replaced as a whole, so a stage that
/// is already running keeps using the hooks it started with. Clones share the
/// hooks and see reloads.
#[derive(Debug, Clone)]
pub struct Executor {
    hooks: Arc<ArcSwap<Hooks>>,
}

impl Executor {
    pub fn new(registry: Registry, config: Config) -> Result<Self, ConfigurationError> {
        Ok(Self {
            hooks: Arc::new(ArcSwap::from_pointee(Hooks::new(registry, config)?)),
        })
    }

    /// An executor without any hooks.
    pub fn empty() -> Self {
        Self {
            hooks: Arc::new(ArcSwap::from_pointee(Hooks {
                registry: Registry::default(),
                config: Config::default(),
            })),
        }
    }

    /// Atomically replaces the registry and plans. Auctions in flight finish
    /// with the previous ones.
    pub fn reload(&self, registry: Registry, config: Config) -> Result<(), ConfigurationError> {
        let hooks = Hooks::new(registry, config)?;
        observe::hooks_reloaded(hooks.registry.len());
        self.hooks.store(Arc::new(hooks));
        Ok(())
    }

    /// Checks an account plan against the current registry.
    pub fn validate(&self, plan: &ExecutionPlan) -> Result<(), ConfigurationError> {
        self.hooks.load().registry.validate(plan)
    }

    /// Runs an auction scoped stage. Module contexts returned by hooks are
    /// kept for later stages and the outcome becomes part of the audit trail.
    pub async fn auction_stage<P: Payload>(
        &self,
        stage: Stage,
        payload: P,
        account: Option<&Account>,
        context: &mut ExecutionContext,
    ) -> (P, Option<Rejection>) {
        let debug = context.debug;
        let result = self
            .execute(
                stage,
                payload,
                account,
                None,
                &mut context.module_contexts,
                debug,
            )
            .await;
        context.stage_outcomes.push(result.outcome);
        (result.payload, result.rejection)
    }

    /// Runs a bidder scoped stage against the bidder's own copy of the module
    /// contexts. The caller owns the outcome.
    pub async fn bidder_stage<P: Payload>(
        &self,
        stage: Stage,
        payload: P,
        account: &Account,
        bidder: &bidder::Name,
        module_contexts: &mut HashMap<String, Value>,
        debug: bool,
    ) -> StageResult<P> {
        self.execute(
            stage,
            payload,
            Some(account),
            Some(bidder),
            module_contexts,
            debug,
        )
        .await
    }

    async fn execute<P: Payload>(
        &self,
        stage: Stage,
        mut payload: P,
        account: Option<&Account>,
        bidder: Option<&bidder::Name>,
        module_contexts: &mut HashMap<String, Value>,
        debug: bool,
    ) -> StageResult<P> {
        let hooks = self.hooks.load_full();
        let started = Instant::now();
        let chains = hooks
            .registry
            .hooks_for::<P>(stage, hooks.groups(stage, account));

        let mut rejection = None;
        let mut groups = Vec::with_capacity(chains.len());
        'chains: for chain in chains {
            let mut group = GroupOutcome::default();
            for (id, hook) in chain.hooks {
                if !hooks.enabled(&id.module_code, account) {
                    continue;
                }
                let invocation = Invocation {
                    stage,
                    hook: id.clone(),
                    timeout: chain.timeout,
                    bidder: bidder.cloned(),
                    account_config: account
                        .and_then(|account| account.hooks.modules.get(&id.module_code))
                        .cloned(),
                    module_context: module_contexts.get(&id.module_code).cloned(),
                    debug,
                };

                let start = Instant::now();
                let invoked = invoke(hook.as_ref(), &payload, &invocation).await;
                let elapsed = start.elapsed();

                let outcome = match invoked {
                    Invoked::TimedOut => HookOutcome::new(id, Status::Timeout, elapsed)
                        .with_message("Timed out while executing action"),
                    Invoked::Panicked(message) => {
                        HookOutcome::new(id, Status::InvocationFailure, elapsed)
                            .with_message(message)
                    }
                    Invoked::Failed(err) => HookOutcome::new(id, Status::ExecutionFailure, elapsed)
                        .with_message(format!("{err:#}")),
                    Invoked::Returned(result) => {
                        let InvocationResult {
                            status,
                            action,
                            message,
                            module_context,
                            debug_messages,
                            errors,
                            warnings,
                            analytics_tags,
                        } = result;
                        if let Some(module_context) = module_context {
                            module_contexts.insert(id.module_code.clone(), module_context);
                        }
                        let mut outcome = HookOutcome {
                            debug_messages,
                            errors,
                            warnings,
                            analytics_tags,
                            message: message.clone(),
                            ..HookOutcome::new(id.clone(), Status::Success, elapsed)
                        };
                        match (status, action) {
                            (InvocationStatus::Failure, _) => outcome.status = Status::Failure,
                            (InvocationStatus::Success, Action::NoAction) => {
                                outcome.action = Some(Effect::NoAction)
                            }
                            (InvocationStatus::Success, Action::Update(updated)) => {
                                payload = updated;
                                outcome.action = Some(Effect::Update);
                            }
                            (InvocationStatus::Success, Action::Reject) if stage.reject_allowed() => {
                                outcome.action = Some(Effect::Reject);
                                rejection = Some(Rejection {
                                    stage,
                                    hook_id: id,
                                    reason: message,
                                });
                            }
                            (InvocationStatus::Success, Action::Reject) => {
                                outcome.status = Status::ExecutionFailure;
                                outcome.message =
                                    Some("Rejection is not supported during this stage".into());
                            }
                        }
                        outcome
                    }
                };
                observe::hook_invoked(stage, bidder, &outcome);
                group.invocation_results.push(outcome);

                if rejection.is_some() {
                    groups.push(group);
                    break 'chains;
                }
            }
            groups.push(group);
        }

        StageResult {
            payload,
            rejection,
            outcome: StageOutcome {
                stage,
                entity: Entity::of(stage, bidder),
                groups,
                execution_time: started.elapsed(),
            },
        }
    }
}

enum Invoked<P> {
    Returned(InvocationResult<P>),
    TimedOut,
    Panicked(String),
    Failed(anyhow::Error),
}

/// Calls the hook, bounded by the invocation timeout. The call is dropped when
/// the timeout expires, so a late result can never be observed.
async fn invoke<P: Payload>(hook: &dyn Hook<P>, payload: &P, invocation: &Invocation) -> Invoked<P> {
    let call = AssertUnwindSafe(hook.call(payload, invocation)).catch_unwind();
    match tokio::time::timeout(invocation.timeout, call).await {
        Err(_) => Invoked::TimedOut,
        Ok(Err(panic)) => Invoked::Panicked(panic_message(panic.as_ref())),
        Ok(Ok(Err(err))) => Invoked::Failed(err),
        Ok(Ok(Ok(result))) => Invoked::Returned(result),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    let message = panic
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_owned());
    format!("hook panicked: {message}")
}
