//! The hook pipeline lets independently developed modules observe and rewrite
//! the auction at well-defined stages.
//!
//! Modules register hooks in the [`Registry`] at startup. Execution plans
//! decide which hooks run at which stage and in which order. The [`Executor`]
//! runs the resolved chains, bounding every invocation by its group timeout
//! and recording an outcome for every hook it calls.

pub mod executor;
pub mod hook;
pub mod outcome;
pub mod payload;
pub mod plan;
pub mod registry;
pub mod stage;

pub use {
    executor::{Config, Executor},
    hook::{Action, Hook, Invocation, InvocationResult, InvocationStatus},
    outcome::{Entity, ExecutionContext, HookOutcome, Rejection, StageOutcome, StageResult, Status},
    payload::{Payload, StageHook},
    plan::{ExecutionPlan, Group, HookId},
    registry::{Module, Registry},
    stage::Stage,
};
