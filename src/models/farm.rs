use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{batch::Batch, not_blank};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Farm {
    pub id: Uuid,
    pub name: String,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct FarmDetail {
    #[serde(flatten)]
    pub farm: Farm,
    pub batches: Vec<Batch>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateFarmRequest {
    #[garde(custom(not_blank))]
    pub name: Option<String>,
    #[garde(skip)]
    pub location: Option<String>,
    #[garde(skip)]
    pub notes: Option<String>,
}
