//! TalentForge API Gateway
//!
//! HTTP surface of TalentForge. Handles:
//! - Authentication and tenant scoping
//! - Rate limiting
//! - Request routing to the per-resource services
//! - Observability (logging, metrics, tracing)

pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod response;
pub mod telemetry;

use axum::{
    extract::FromRef,
    http::StatusCode,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use talentforge_common::{auth::JwtManager, config::AppConfig, db::DbPool};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use handlers::{
    assignment, batch, course, discussion, enquiry, feedback, health, interview, notification,
    session, talent, waiting_list,
};
use middleware::rate_limit::{rate_limit, Throttle};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub jwt: Arc<JwtManager>,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool, jwt: JwtManager) -> Self {
        Self {
            config: Arc::new(config),
            db,
            jwt: Arc::new(jwt),
        }
    }
}

impl FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let config = state.config.clone();

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        // Health endpoints (no auth)
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .nest("/tenant/{tenant_id}", tenant_routes(&config))
        .route_layer(axum::middleware::from_fn(middleware::metrics::track_requests))
        .with_state(state);

    if config.rate_limit.enabled {
        let throttle = Throttle::new(config.rate_limit.requests_per_second, config.rate_limit.burst);
        app = app.layer(axum::middleware::from_fn_with_state(throttle, rate_limit));
    }

    app.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                config.request_timeout(),
            ))
            .layer(cors),
    )
}

/// Every resource route, relative to `/tenant/{tenant_id}`
fn tenant_routes(config: &AppConfig) -> Router<AppState> {
    let mut routes = Router::new()
        // Talents
        .route("/talent", post(talent::add_talent).get(talent::get_talent_list))
        .route("/talents", post(talent::add_talents))
        .route(
            "/talent/{talent_id}",
            get(talent::get_talent)
                .put(talent::update_talent)
                .delete(talent::delete_talent),
        )
        // Interviews
        .route(
            "/talent/{talent_id}/interview",
            post(interview::add_interview).get(interview::get_interview_list),
        )
        .route(
            "/talent/{talent_id}/interview/{interview_id}",
            get(interview::get_interview)
                .put(interview::update_interview)
                .delete(interview::delete_interview),
        )
        // Enquiries
        .route("/enquiry", post(enquiry::add_enquiry).get(enquiry::get_enquiry_list))
        .route("/enquiries", post(enquiry::add_enquiries))
        .route(
            "/enquiry/{enquiry_id}",
            get(enquiry::get_enquiry)
                .put(enquiry::update_enquiry)
                .delete(enquiry::delete_enquiry),
        )
        .route("/enquiry/{enquiry_id}/convert", post(enquiry::convert_enquiry))
        // Batches
        .route("/batch", post(batch::add_batch).get(batch::get_batch_list))
        .route(
            "/batch/{batch_id}",
            get(batch::get_batch)
                .put(batch::update_batch)
                .delete(batch::delete_batch),
        )
        .route(
            "/batch/{batch_id}/talent",
            post(batch::add_talents_to_batch).get(batch::get_batch_talent_list),
        )
        .route(
            "/batch/{batch_id}/talent/{talent_id}",
            axum::routing::delete(batch::remove_talent_from_batch),
        )
        .route(
            "/batch/{batch_id}/module",
            post(batch::assign_batch_modules).get(batch::get_batch_module_list),
        )
        // Session plan
        .route(
            "/batch/{batch_id}/session-plan",
            post(session::generate_session_plan)
                .get(session::get_session_plan)
                .delete(session::delete_session_plan),
        )
        .route(
            "/batch/{batch_id}/session/{session_id}",
            get(session::get_session).put(session::update_session),
        )
        // Feedback
        .route(
            "/batch/{batch_id}/session/{session_id}/feedback",
            post(feedback::add_feedback).get(feedback::get_feedback_list),
        )
        .route(
            "/batch/{batch_id}/session/{session_id}/feedback/{feedback_id}",
            put(feedback::update_feedback).delete(feedback::delete_feedback),
        )
        // Assignments
        .route(
            "/batch/{batch_id}/assignment",
            post(assignment::add_assignment).get(assignment::get_assignment_list),
        )
        .route(
            "/batch/{batch_id}/assignment/{assignment_id}",
            get(assignment::get_assignment)
                .put(assignment::update_assignment)
                .delete(assignment::delete_assignment),
        )
        // Course modules and topics
        .route("/module", post(course::add_module).get(course::get_module_list))
        .route(
            "/module/{module_id}",
            get(course::get_module)
                .put(course::update_module)
                .delete(course::delete_module),
        )
        .route(
            "/module/{module_id}/topic",
            post(course::add_topic).get(course::get_topic_list),
        )
        .route(
            "/module/{module_id}/topic/{topic_id}",
            put(course::update_topic).delete(course::delete_topic),
        )
        // Notifications
        .route(
            "/notification",
            post(notification::add_notification).get(notification::get_notification_list),
        )
        .route(
            "/notification/{notification_id}",
            axum::routing::delete(notification::delete_notification),
        )
        .route(
            "/notification/{notification_id}/seen",
            put(notification::mark_notification_seen),
        )
        // Community forum
        .route(
            "/discussion",
            post(discussion::add_discussion).get(discussion::get_discussion_list),
        )
        .route(
            "/discussion/{discussion_id}",
            get(discussion::get_discussion)
                .put(discussion::update_discussion)
                .delete(discussion::delete_discussion),
        )
        .route(
            "/discussion/{discussion_id}/reply",
            post(discussion::add_reply).get(discussion::get_reply_list),
        )
        .route(
            "/discussion/{discussion_id}/reply/{reply_id}",
            put(discussion::update_reply).delete(discussion::delete_reply),
        )
        // Waiting list
        .route(
            "/waiting-list",
            post(waiting_list::add_waiting_list).get(waiting_list::get_waiting_list_list),
        )
        .route(
            "/waiting-list/{waiting_list_id}",
            get(waiting_list::get_waiting_list)
                .put(waiting_list::update_waiting_list)
                .delete(waiting_list::delete_waiting_list),
        )
        .route(
            "/waiting-list/{waiting_list_id}/transfer",
            post(waiting_list::transfer_waiting_list),
        );

    if config.auth.legacy_credential_paths {
        routes = routes.route(
            "/talent/credential/{credential_id}",
            post(talent::add_talent_legacy),
        );
    }

    routes
}
