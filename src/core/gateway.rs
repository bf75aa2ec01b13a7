use crate::core::synthesizer::GridSynthesizer;
use crate::domain::model::{
    BoundingBox, ContextFeatures, GridResult, GridSource, GridSpec, GridSummary, PredictionRequest,
};
use crate::domain::ports::PredictionModel;

/// 預測閘道：先問外部模型，任何失敗都退回合成格點
pub struct PredictionGateway<M: PredictionModel> {
    model: M,
}

impl<M: PredictionModel> PredictionGateway<M> {
    pub fn new(model: M) -> Self {
        Self { model }
    }

    /// Never fails; the result's `source` records which path produced it.
    pub async fn get_grid(
        &self,
        bbox: &BoundingBox,
        grid: &GridSpec,
        features: &ContextFeatures,
    ) -> GridResult {
        let request = PredictionRequest::new(bbox, grid, features);

        match self.model.predict_grid(&request).await {
            Ok(cells) => {
                tracing::debug!("📡 Prediction service returned {} cells", cells.len());
                GridResult {
                    summary: GridSummary::from_cells(&cells),
                    cells,
                    source: GridSource::Model,
                }
            }
            Err(e) => {
                tracing::warn!(
                    "⚠️ Prediction service unavailable, falling back to synthetic grid: {}",
                    e
                );
                GridSynthesizer::synthesize(bbox, grid)
            }
        }
    }
}
