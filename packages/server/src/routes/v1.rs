use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers::record;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/records", record_routes())
        .nest("/owners", owner_routes())
}

fn record_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(record::list_records, record::register_record))
        .routes(routes!(record::record_stats))
        .routes(routes!(record::verify_batch))
        .routes(routes!(record::get_record))
        .routes(routes!(record::calculate_checksum))
        .routes(routes!(record::verify_record))
        .routes(routes!(record::mark_verified))
}

fn owner_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(record::delete_owner_records))
}
