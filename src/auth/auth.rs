use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::role::Role;
use crate::models::TokenType;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};
use serde::Serialize;
use utoipa::ToSchema;

/// The authenticated caller, resolved from the bearer token on every request.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl AuthUser {
    pub fn from_access_token(token: &str, secret: &str) -> Result<Self, ApiError> {
        let claims = verify_token(token, secret)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))?;

        if claims.token_type != TokenType::Access {
            return Err(ApiError::Unauthorized("Access token required".into()));
        }

        let role = Role::from_id(claims.role)
            .ok_or_else(|| ApiError::Unauthorized("Invalid role".into()))?;

        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
            employee_id: claims.employee_id,
        })
    }
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Already resolved by the auth middleware
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ApiError::Unauthorized("Missing token".into()))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(ApiError::Internal(anyhow::anyhow!("Config missing"))));
            }
        };

        ready(AuthUser::from_access_token(token, &config.jwt_secret))
    }
}

impl AuthUser {
    pub fn require_hr_or_admin(&self) -> Result<(), ApiError> {
        if self.role.manages_staff() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("HR/Admin only".into()))
        }
    }

    /// The caller's own employee id
    pub fn require_employee(&self) -> Result<u64, ApiError> {
        self.employee_id
            .ok_or_else(|| ApiError::Forbidden("No employee profile".into()))
    }

    /// Employees may only look at themselves; HR and admins at anyone.
    pub fn require_self_or_hr(&self, employee_id: u64) -> Result<(), ApiError> {
        if self.role.manages_staff() || self.employee_id == Some(employee_id) {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Not allowed to view this employee".into()))
        }
    }

    /// Same rule keyed on the user account rather than the employee.
    pub fn require_user_or_hr(&self, user_id: u64) -> Result<(), ApiError> {
        if self.role.manages_staff() || self.user_id == user_id {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Not allowed to view this user".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{generate_access_token, generate_refresh_token};
    use actix_web::{ResponseError, http::StatusCode, test::TestRequest};

    fn user(role: Role, employee_id: Option<u64>) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "jdoe".into(),
            role,
            employee_id,
        }
    }

    async fn extract(req: TestRequest) -> Result<AuthUser, ApiError> {
        let (req, mut payload) = req.to_http_parts();
        AuthUser::from_request(&req, &mut payload).await
    }

    #[actix_web::test]
    async fn bearer_access_token_is_extracted() {
        let config = Config::for_tests();
        let token = generate_access_token(5, "jdoe".into(), 3, Some(50), &config.jwt_secret, 60).unwrap();

        let user = extract(
            TestRequest::default()
                .app_data(Data::new(config))
                .insert_header(("Authorization", format!("Bearer {}", token))),
        )
        .await
        .unwrap();

        assert_eq!(user.user_id, 5);
        assert_eq!(user.role, Role::Employee);
        assert_eq!(user.employee_id, Some(50));
    }

    #[actix_web::test]
    async fn missing_token_is_unauthorized() {
        let err = extract(TestRequest::default().app_data(Data::new(Config::for_tests())))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn refresh_token_is_not_an_access_token() {
        let config = Config::for_tests();
        let (token, _) = generate_refresh_token(5, "jdoe".into(), 3, None, &config.jwt_secret, 60).unwrap();

        let err = extract(
            TestRequest::default()
                .app_data(Data::new(config))
                .insert_header(("Authorization", format!("Bearer {}", token))),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn employees_only_see_themselves() {
        let employee = user(Role::Employee, Some(10));
        assert!(employee.require_self_or_hr(10).is_ok());
        assert!(employee.require_self_or_hr(11).is_err());
        assert!(employee.require_hr_or_admin().is_err());

        let hr = user(Role::Hr, None);
        assert!(hr.require_self_or_hr(11).is_ok());
        assert!(hr.require_hr_or_admin().is_ok());
        assert!(hr.require_employee().is_err());
    }

    #[test]
    fn user_feeds_are_private_to_their_owner() {
        let employee = user(Role::Employee, Some(10));
        assert!(employee.require_user_or_hr(1).is_ok());
        assert!(employee.require_user_or_hr(2).is_err());

        assert!(user(Role::Admin, None).require_user_or_hr(2).is_ok());
    }
}
