use common::{IntegrityStatus, LocationKind, VerificationMethod};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Persisted integrity record of one archived file.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "integrity_record")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Archive entry this file belongs to. Not a foreign key.
    #[sea_orm(indexed)]
    pub owner_id: i32,

    #[sea_orm(column_type = "Text")]
    pub stored_path: String,

    pub original_name: String,

    pub size_bytes: i64,

    /// Lowercase hex, 32 characters.
    pub checksum_md5: Option<String>,

    /// Lowercase hex, 64 characters.
    #[sea_orm(indexed)]
    pub checksum_sha256: Option<String>,

    #[sea_orm(indexed)]
    pub location_kind: LocationKind,

    #[sea_orm(indexed)]
    pub status: IntegrityStatus,

    #[sea_orm(indexed)]
    pub last_verified_at: Option<DateTimeUtc>,

    #[sea_orm(column_type = "Text", nullable)]
    pub verification_error: Option<String>,

    pub last_verification_method: Option<VerificationMethod>,

    pub mime_type: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub notes: String,

    #[sea_orm(indexed)]
    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
