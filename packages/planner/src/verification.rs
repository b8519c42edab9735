// ABOUTME: Re-queries the backend for one legal requirement and patches it in place
// ABOUTME: Shallow override merge, serialized per index, concurrent across indices

use tracing::{error, info, warn};

use crate::error::{PlannerError, Result};
use crate::schema::{parse_contract, RegulatoryDetail, RegulatoryPatch};
use crate::session::SessionContext;

pub(crate) struct FieldVerifier {
    ctx: SessionContext,
}

impl FieldVerifier {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// Verify `legal_requirements[index]` and return the patched entry.
    ///
    /// Only `estimated_cost`, `processing_time`, `documents_required` and
    /// `local_authority_details` can change; every other entry is left as is.
    pub async fn verify(&self, index: usize) -> Result<RegulatoryDetail> {
        let (generation, name, location) = {
            let mut state = self.ctx.state.write().await;
            let plan = state.plan()?;
            let len = plan.legal_requirements.len();
            let entry = plan
                .legal_requirements
                .get(index)
                .ok_or(PlannerError::IndexOutOfRange { index, len })?;
            let name = entry.name.clone();
            let location = plan.target_location.clone();

            if !state.verifying.insert(index) {
                warn!(index, "Verification already in flight for this entry");
                return Err(PlannerError::Busy("verification"));
            }
            (state.generation, name, location)
        };
        let mut guard = self.ctx.busy_guard(generation, "verify", move |state| {
            state.verifying.remove(&index);
        });

        info!(session_generation = generation, index, name = %name, "Verifying legal requirement");

        let result = async {
            let raw = self
                .ctx
                .call(
                    "verify_regulatory_detail",
                    self.ctx.backend.verify_regulatory_detail(&name, &location),
                )
                .await?;
            parse_contract::<RegulatoryPatch>(raw)
        }
        .await;

        let applied = self
            .ctx
            .apply_if_current(generation, "verify", |state| {
                state.verifying.remove(&index);
                let patch = result?;

                let entry = state
                    .plan
                    .as_mut()
                    .and_then(|plan| plan.legal_requirements.get_mut(index))
                    .filter(|entry| entry.name == name)
                    .ok_or_else(|| {
                        warn!(index, "Plan changed during verification; dropping patch");
                        PlannerError::Stale
                    })?;

                if patch.is_empty() {
                    info!(index, "Verification confirmed no changes");
                }
                entry.apply_patch(patch);
                Ok(entry.clone())
            })
            .await
            .unwrap_or(Err(PlannerError::Stale));
        guard.disarm();

        if let Err(e) = &applied {
            if !matches!(e, PlannerError::Stale) {
                error!(index, "Verification failed: {}", e);
            }
        }
        applied
    }
}
