//! HTTP inbound adapter exposing REST endpoints.

pub mod availability;
pub mod boarding;
pub mod enrolments;
pub mod error;
pub mod health;
pub mod state;
pub mod trips;
pub mod validation;

use actix_web::web;

pub use error::ApiResult;

/// Register every `/api/v1` handler on a service config.
///
/// # Examples
/// ```
/// use actix_web::{App, web};
/// use ridepool::inbound::http::configure_api;
///
/// let app = App::new().service(web::scope("/api/v1").configure(configure_api));
/// ```
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(trips::create_trip)
        .service(trips::get_trip)
        .service(trips::reschedule_trip)
        .service(trips::resize_trip)
        .service(trips::confirm_trip)
        .service(trips::start_trip)
        .service(trips::complete_trip)
        .service(trips::cancel_trip)
        .service(enrolments::enroll_patient)
        .service(enrolments::remove_patient)
        .service(enrolments::list_waitlist)
        .service(enrolments::respond_to_call)
        .service(boarding::check_in)
        .service(boarding::check_out)
        .service(availability::check_availability);
}
