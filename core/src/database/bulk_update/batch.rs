use super::BulkUpdateError;

/// How many records fit into one statement given the backend's
/// bind-parameter ceiling. `per_record_params` already includes the id.
///
/// A single record that cannot fit alone is a fatal configuration error,
/// never a silent drop.
pub(crate) fn max_records_per_batch(
    per_record_params: usize,
    max_bind_params: usize,
) -> Result<usize, BulkUpdateError> {
    if per_record_params == 0 || per_record_params > max_bind_params {
        return Err(BulkUpdateError::BatchTooLarge {
            required: per_record_params,
            limit: max_bind_params,
        });
    }

    Ok(max_bind_params / per_record_params)
}
