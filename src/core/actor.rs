use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpRequest};

use crate::core::error::AppError;

/// Authenticated caller, as forwarded by the upstream identity layer.
///
/// Roles are a closed set; every state-machine operation takes the variant
/// so an illegal actor/action pair is rejected at a single guard point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Patient { profile_id: String },
    Doctor { profile_id: String },
    Admin,
}

impl Actor {
    /// Patient profile id, if this actor is a patient
    pub fn patient_id(&self) -> Option<&str> {
        match self {
            Actor::Patient { profile_id } => Some(profile_id),
            _ => None,
        }
    }

    /// Doctor profile id, if this actor is a doctor
    pub fn doctor_id(&self) -> Option<&str> {
        match self {
            Actor::Doctor { profile_id } => Some(profile_id),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Actor::Admin)
    }
}

/// Extracts the actor from the `X-Actor-Role` / `X-Actor-Id` headers set by
/// the authentication proxy in front of this service.
impl FromRequest for Actor {
    type Error = AppError;
    type Future = Ready<Result<Self, AppError>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract_actor(req))
    }
}

fn extract_actor(req: &HttpRequest) -> Result<Actor, AppError> {
    let role = header_value(req, "X-Actor-Role")?;

    match role.as_str() {
        "admin" => Ok(Actor::Admin),
        "patient" => Ok(Actor::Patient {
            profile_id: header_value(req, "X-Actor-Id")?,
        }),
        "doctor" => Ok(Actor::Doctor {
            profile_id: header_value(req, "X-Actor-Id")?,
        }),
        other => Err(AppError::forbidden(format!("Unknown actor role '{}'", other))),
    }
}

fn header_value(req: &HttpRequest, name: &str) -> Result<String, AppError> {
    req.headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .ok_or_else(|| AppError::forbidden(format!("Missing {} header", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;

    #[actix_web::test]
    async fn test_extract_patient_actor() {
        let req = test::TestRequest::default()
            .insert_header(("X-Actor-Role", "patient"))
            .insert_header(("X-Actor-Id", "patient-1"))
            .to_http_request();

        let actor = extract_actor(&req).unwrap();
        assert_eq!(
            actor,
            Actor::Patient {
                profile_id: "patient-1".to_string()
            }
        );
        assert_eq!(actor.patient_id(), Some("patient-1"));
        assert_eq!(actor.doctor_id(), None);
    }

    #[actix_web::test]
    async fn test_extract_admin_without_profile_id() {
        let req = test::TestRequest::default()
            .insert_header(("X-Actor-Role", "admin"))
            .to_http_request();

        let actor = extract_actor(&req).unwrap();
        assert!(actor.is_admin());
    }

    #[actix_web::test]
    async fn test_unknown_role_is_forbidden() {
        let req = test::TestRequest::default()
            .insert_header(("X-Actor-Role", "receptionist"))
            .to_http_request();

        let result = extract_actor(&req);
        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[actix_web::test]
    async fn test_missing_headers_rejected() {
        let req = test::TestRequest::default().to_http_request();
        assert!(extract_actor(&req).is_err());
    }
}
