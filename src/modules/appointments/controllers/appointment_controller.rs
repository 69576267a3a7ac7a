use std::sync::Arc;

use actix_web::{get, post, web, HttpResponse};
use serde::Deserialize;

use crate::core::{Actor, Result};
use crate::modules::appointments::models::AppointmentStatus;
use crate::modules::appointments::services::{
    AppointmentService, BookAppointmentRequest, BookingService,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/appointments")
            .service(book_appointment)
            .service(list_appointments)
            .service(get_appointment)
            .service(confirm_appointment)
            .service(cancel_appointment)
            .service(complete_appointment)
            .service(mark_no_show)
            .service(mark_paid_offline),
    );
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<AppointmentStatus>,
}

/// Book a new appointment (patient).
/// POST /api/appointments
#[post("")]
async fn book_appointment(
    booking: web::Data<Arc<BookingService>>,
    actor: Actor,
    request: web::Json<BookAppointmentRequest>,
) -> Result<HttpResponse> {
    let appointment = booking.book_appointment(&actor, request.into_inner()).await?;
    Ok(HttpResponse::Created().json(appointment))
}

/// List the actor's appointments, optionally filtered by status.
/// GET /api/appointments?status=pending
#[get("")]
async fn list_appointments(
    service: web::Data<Arc<AppointmentService>>,
    actor: Actor,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse> {
    let appointments = service.list(&actor, query.status).await?;
    Ok(HttpResponse::Ok().json(appointments))
}

/// GET /api/appointments/{id}
#[get("/{id}")]
async fn get_appointment(
    service: web::Data<Arc<AppointmentService>>,
    actor: Actor,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let appointment = service.get(&actor, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(appointment))
}

/// Confirm a pending appointment (assigned doctor).
/// POST /api/appointments/{id}/confirm
#[post("/{id}/confirm")]
async fn confirm_appointment(
    service: web::Data<Arc<AppointmentService>>,
    actor: Actor,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let appointment = service.confirm(&actor, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(appointment))
}

/// Cancel an appointment; preconditions depend on the actor's role.
/// POST /api/appointments/{id}/cancel
#[post("/{id}/cancel")]
async fn cancel_appointment(
    service: web::Data<Arc<AppointmentService>>,
    actor: Actor,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let appointment = service.cancel(&actor, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(appointment))
}

/// Complete a confirmed appointment (assigned doctor); unlocks
/// prescription authoring downstream.
/// POST /api/appointments/{id}/complete
#[post("/{id}/complete")]
async fn complete_appointment(
    service: web::Data<Arc<AppointmentService>>,
    actor: Actor,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let appointment = service.complete(&actor, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(appointment))
}

/// POST /api/appointments/{id}/no-show
#[post("/{id}/no-show")]
async fn mark_no_show(
    service: web::Data<Arc<AppointmentService>>,
    actor: Actor,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let appointment = service.mark_no_show(&actor, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(appointment))
}

/// Record a cash/offline payment (assigned doctor).
/// POST /api/appointments/{id}/mark-paid
#[post("/{id}/mark-paid")]
async fn mark_paid_offline(
    service: web::Data<Arc<AppointmentService>>,
    actor: Actor,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let appointment = service.mark_paid_offline(&actor, &path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(appointment))
}
