//! Batched equation recognition and prediction validation.

use crate::error::{Error, Result};
use crate::model::Resource;
use crate::models::EquationModel;
use crate::options::FusionOptions;

/// Recognize `images` in sequential batches.
///
/// Each batch generates up to `min(longest input, token limit) + buffer`
/// tokens. A prediction that used the whole generation budget was cut off and
/// is returned as an empty string.
pub fn recognize_batched(
    model: &dyn EquationModel,
    images: &[Resource],
    token_counts: &[usize],
    token_limit: usize,
    options: &FusionOptions,
) -> Result<Vec<String>> {
    let batch_size = options.texify_batch_size();
    let mut predictions = Vec::with_capacity(images.len());

    for (batch, counts) in images.chunks(batch_size).zip(token_counts.chunks(batch_size)) {
        let longest = counts.iter().copied().max().unwrap_or(0);
        let max_length = longest.min(token_limit) + options.texify_token_buffer;

        let texts = model.recognize(batch, max_length)?;
        if texts.len() != batch.len() {
            return Err(Error::model(
                "equations",
                format!("expected {} predictions, got {}", batch.len(), texts.len()),
            ));
        }

        for text in texts {
            if model.count_tokens(&text) >= max_length {
                log::debug!("Equation prediction hit the generation limit, discarding");
                predictions.push(String::new());
            } else {
                predictions.push(text);
            }
        }
    }
    Ok(predictions)
}

/// Whether a prediction may replace the original text of an equation region.
///
/// It must fit under the token limit, keep at least 70% of the original
/// length and contain something besides whitespace.
pub fn is_valid_prediction(
    model: &dyn EquationModel,
    prediction: &str,
    original: &str,
    token_limit: usize,
) -> bool {
    if prediction.trim().is_empty() {
        return false;
    }
    if model.count_tokens(prediction) >= token_limit {
        return false;
    }
    let kept = prediction.chars().count() as f32;
    kept >= original.chars().count() as f32 * 0.7
}
