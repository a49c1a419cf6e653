use thiserror::Error;

use crate::catalog::CatalogError;
use crate::model::ParseIdError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    ParseId(#[from] ParseIdError),
}
