// ABOUTME: Vendor negotiation scripts attached to the current plan
// ABOUTME: Appends new scripts in creation order or regenerates one index in place

use tracing::{info, warn};

use crate::error::{PlannerError, Result};
use crate::schema::{parse_contract, VendorScript, VendorScriptDraft};
use crate::session::SessionContext;

enum Placement {
    Append,
    Replace { index: usize, context: String },
}

pub(crate) struct ScriptWriter {
    ctx: SessionContext,
}

impl ScriptWriter {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// Generate a script for `context` and append it to `vendor_scripts`
    pub async fn generate(&self, context: &str, tone: Option<&str>) -> Result<VendorScript> {
        let context = context.trim();
        if context.is_empty() {
            return Err(PlannerError::EmptyInput);
        }
        self.run(context.to_string(), tone, Placement::Append).await
    }

    /// Regenerate `vendor_scripts[index]` (same context, optionally another tone)
    pub async fn regenerate(&self, index: usize, tone: Option<&str>) -> Result<VendorScript> {
        let context = {
            let state = self.ctx.state.read().await;
            let scripts = &state.plan()?.vendor_scripts;
            scripts
                .get(index)
                .map(|script| script.context.clone())
                .ok_or(PlannerError::IndexOutOfRange {
                    index,
                    len: scripts.len(),
                })?
        };
        self.run(
            context.clone(),
            tone,
            Placement::Replace { index, context },
        )
        .await
    }

    async fn run(
        &self,
        context: String,
        tone: Option<&str>,
        placement: Placement,
    ) -> Result<VendorScript> {
        let (generation, idea_summary, location) = {
            let mut state = self.ctx.state.write().await;
            let plan = state.plan()?;
            let idea_summary = plan.idea_summary.clone();
            let location = plan.target_location.clone();
            if state.scripting {
                warn!("Rejecting script request while another is in flight");
                return Err(PlannerError::Busy("script generation"));
            }
            state.scripting = true;
            (state.generation, idea_summary, location)
        };
        let mut guard = self.ctx.busy_guard(generation, "script", |state| state.scripting = false);

        let tone = tone.map(str::trim).filter(|t| !t.is_empty()).map(String::from);
        info!(session_generation = generation, context = %context, "Generating vendor script");

        let result = async {
            let raw = self
                .ctx
                .call(
                    "generate_script",
                    self.ctx
                        .backend
                        .generate_script(&context, tone.clone(), &idea_summary, &location),
                )
                .await?;
            parse_contract::<VendorScriptDraft>(raw)
        }
        .await;

        let applied = self
            .ctx
            .apply_if_current(generation, "script", |state| {
                state.scripting = false;
                let draft = result?;
                let script = VendorScript {
                    // The requested situation is authoritative over the echoed one
                    context: context.clone(),
                    script: draft.script,
                    tone,
                };
                let plan = state.plan.as_mut().ok_or(PlannerError::NoPlan)?;
                match placement {
                    Placement::Append => plan.vendor_scripts.push(script.clone()),
                    Placement::Replace { index, context } => {
                        let slot = plan
                            .vendor_scripts
                            .get_mut(index)
                            .filter(|slot| slot.context == context)
                            .ok_or(PlannerError::Stale)?;
                        *slot = script.clone();
                    }
                }
                Ok(script)
            })
            .await
            .unwrap_or(Err(PlannerError::Stale));
        guard.disarm();
        applied
    }
}
