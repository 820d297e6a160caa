//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every trip, enrolment, boarding, waitlist,
//! availability and health endpoint from the inbound layer. Request and
//! response schemas are collected from the handlers' annotations.

use utoipa::OpenApi;

use crate::domain::{Error, ErrorCode};

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Ridepool trip service API",
        description = "Shared-vehicle trip scheduling, enrolment, waitlist and boarding."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::trips::create_trip,
        crate::inbound::http::trips::get_trip,
        crate::inbound::http::trips::reschedule_trip,
        crate::inbound::http::trips::resize_trip,
        crate::inbound::http::trips::confirm_trip,
        crate::inbound::http::trips::start_trip,
        crate::inbound::http::trips::complete_trip,
        crate::inbound::http::trips::cancel_trip,
        crate::inbound::http::enrolments::enroll_patient,
        crate::inbound::http::enrolments::remove_patient,
        crate::inbound::http::enrolments::list_waitlist,
        crate::inbound::http::enrolments::respond_to_call,
        crate::inbound::http::boarding::check_in,
        crate::inbound::http::boarding::check_out,
        crate::inbound::http::availability::check_availability,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(Error, ErrorCode)),
    tags(
        (name = "trips", description = "Trip scheduling and lifecycle"),
        (name = "enrolments", description = "Putting patients on and off trips"),
        (name = "waitlist", description = "Waitlist inspection and call responses"),
        (name = "boarding", description = "Passenger check-in and check-out"),
        (name = "availability", description = "Vehicle and driver availability"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    //! Tests verifying the generated OpenAPI document.

    use rstest::rstest;

    use super::*;
    use crate::test_support::openapi::{get_property, unwrap_object_schema};

    #[rstest]
    #[case("/api/v1/trips")]
    #[case("/api/v1/trips/{trip_id}/enrolments")]
    #[case("/api/v1/waitlist/{entry_id}/response")]
    #[case("/api/v1/availability")]
    #[case("/health/ready")]
    fn document_lists_path(#[case] path: &str) {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key(path), "missing path {path}");
    }

    #[rstest]
    fn error_schema_exposes_trace_id() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components registered");
        let schema = components.schemas.get("Error").expect("Error schema");
        let object = unwrap_object_schema(schema, "Error");
        get_property(object, "traceId");
        get_property(object, "details");
    }
}
