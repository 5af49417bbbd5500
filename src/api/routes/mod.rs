//! Route handlers, grouped by resource.

pub mod health;
pub mod imagery;
pub mod ink;
pub mod poems;
pub mod poets;
pub mod stats;
pub mod wordcloud;

use crate::api::error::ApiError;
use crate::error::ServiceError;
use crate::utils::sanitize::clean_author_name;

/// Normalize a poet name taken from the URL. Empty after cleaning is a
/// client error.
pub(crate) fn poet_name(raw: &str) -> Result<String, ApiError> {
    let name = clean_author_name(raw);
    if name.is_empty() {
        return Err(ServiceError::Validation("invalid poet name".into()).into());
    }
    Ok(name)
}
