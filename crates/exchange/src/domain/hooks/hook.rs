use {
    super::{HookId, Stage},
    crate::domain::bidder,
    serde_json::Value,
    std::time::Duration,
};

/// An interceptor registered by a module for one stage.
///
/// Hooks never mutate the payload they are given. A hook that wants to change
/// it returns the replacement in [`Action::Update`], which the next hook in the
/// chain then receives.
#[async_trait::async_trait]
pub trait Hook<P: Send + Sync>: Send + Sync {
    async fn call(
        &self,
        payload: &P,
        invocation: &Invocation,
    ) -> anyhow::Result<InvocationResult<P>>;
}

/// Everything a hook knows about the invocation besides the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub stage: Stage,
    pub hook: HookId,
    /// The time the hook has before its result is discarded.
    pub timeout: Duration,
    /// Set for bidder scoped stages.
    pub bidder: Option<bidder::Name>,
    /// The account's configuration for the hook's module.
    pub account_config: Option<Value>,
    /// The value the module returned last during this auction.
    pub module_context: Option<Value>,
    pub debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationStatus {
    Success,
    /// The hook could not do its job. The payload is left untouched.
    Failure,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action<P> {
    NoAction,
    Update(P),
    Reject,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvocationResult<P> {
    pub status: InvocationStatus,
    pub action: Action<P>,
    pub message: Option<String>,
    pub module_context: Option<Value>,
    pub debug_messages: Vec<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub analytics_tags: Option<Value>,
}

impl<P> InvocationResult<P> {
    fn new(status: InvocationStatus, action: Action<P>) -> Self {
        Self {
            status,
            action,
            message: None,
            module_context: None,
            debug_messages: Default::default(),
            errors: Default::default(),
            warnings: Default::default(),
            analytics_tags: None,
        }
    }

    pub fn no_action() -> Self {
        Self::new(InvocationStatus::Success, Action::NoAction)
    }

    pub fn update(payload: P) -> Self {
        Self::new(InvocationStatus::Success, Action::Update(payload))
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self::new(InvocationStatus::Success, Action::Reject).with_message(reason)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(InvocationStatus::Failure, Action::NoAction).with_message(message)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_module_context(mut self, context: Value) -> Self {
        self.module_context = Some(context);
        self
    }

    pub fn with_debug(mut self, message: impl Into<String>) -> Self {
        self.debug_messages.push(message.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_analytics_tags(mut self, tags: Value) -> Self {
        self.analytics_tags = Some(tags);
        self
    }
}
