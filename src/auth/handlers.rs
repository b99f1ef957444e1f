use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::{ApiError, ER_DUP_ENTRY, mysql_error_number},
    model::role::Role,
    models::{Claims, LoginReqDto, RegisterReq, TokenType, UserSql},
    payroll::clock::Clock,
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Issues a fresh access/refresh pair and records the refresh token.
async fn issue_tokens(
    pool: &MySqlPool,
    config: &Config,
    user_id: u64,
    username: &str,
    role: u8,
    employee_id: Option<u64>,
) -> Result<TokenPair, ApiError> {
    let access_token = generate_access_token(
        user_id,
        username.to_string(),
        role,
        employee_id,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|e| anyhow!("Failed to sign access token: {}", e))?;

    let (refresh_token, refresh_claims) = generate_refresh_token(
        user_id,
        username.to_string(),
        role,
        employee_id,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(|e| anyhow!("Failed to sign refresh token: {}", e))?;

    debug!(user_id, jti = %refresh_claims.jti, "Storing refresh token");

    store_refresh_token(pool, user_id, &refresh_claims).await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

async fn store_refresh_token(pool: &MySqlPool, user_id: u64, claims: &Claims) -> Result<(), ApiError> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(user_id)
    .bind(&claims.jti)
    .bind(claims.exp as i64)
    .execute(pool)
    .await?;

    Ok(())
}

/// A validated sign-up, ready to be stored.
#[derive(Debug, PartialEq)]
struct NewAccount {
    first_name: String,
    last_name: String,
    email: String,
}

impl NewAccount {
    fn from_request(req: &RegisterReq) -> Result<Self, ApiError> {
        let name = req.name.split_whitespace().collect::<Vec<_>>();
        let Some((first, rest)) = name.split_first() else {
            return Err(ApiError::BadRequest("Name must not be empty".into()));
        };

        let email = req.email.trim().to_lowercase();
        let well_formed = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.') && !email.contains(char::is_whitespace));
        if !well_formed {
            return Err(ApiError::BadRequest("A valid email is required".into()));
        }

        if req.password.is_empty() {
            return Err(ApiError::BadRequest("Password must not be empty".into()));
        }

        Ok(NewAccount {
            first_name: first.to_string(),
            last_name: rest.join(" "),
            email,
        })
    }
}

/// User registration handler
///
/// Creates the caller's employee profile (hired today) and an employee login
/// linked to it, in one transaction. HR and admin accounts are provisioned.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User registered", body = Object, example = json!({
            "message": "User registered successfully",
            "employee_id": 12
        })),
        (status = 400, description = "Missing name, email or password"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Auth"
)]
pub async fn register(
    req: web::Json<RegisterReq>,
    pool: web::Data<MySqlPool>,
    clock: web::Data<dyn Clock>,
) -> Result<HttpResponse, ApiError> {
    let account = NewAccount::from_request(&req)?;

    let taken = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE username = ?")
        .bind(&account.email)
        .fetch_one(pool.get_ref())
        .await?;

    if taken > 0 {
        return Err(ApiError::Conflict("Email already registered".into()));
    }

    let hashed = hash_password(&req.password).map_err(|e| anyhow!("Failed to hash password: {}", e))?;

    let mut tx = pool.begin().await?;

    let employee = sqlx::query(
        r#"
        INSERT INTO employees (first_name, last_name, email, hire_date, status)
        VALUES (?, ?, ?, ?, 'active')
        "#,
    )
    .bind(&account.first_name)
    .bind(&account.last_name)
    .bind(&account.email)
    .bind(clock.today())
    .execute(&mut *tx)
    .await
    .map_err(registration_error)?;

    let employee_id = employee.last_insert_id();

    sqlx::query(r#"INSERT INTO users (username, password, role_id, employee_id) VALUES (?, ?, ?, ?)"#)
        .bind(&account.email)
        .bind(hashed)
        .bind(Role::Employee.id())
        .bind(employee_id)
        .execute(&mut *tx)
        .await
        .map_err(registration_error)?;

    tx.commit().await?;

    info!(email = %account.email, employee_id, "User registered");

    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully",
        "employee_id": employee_id
    })))
}

/// Both inserts are guarded by unique keys; losing a race on them is a conflict.
fn registration_error(e: sqlx::Error) -> ApiError {
    if mysql_error_number(&e) == Some(ER_DUP_ENTRY) {
        ApiError::Conflict("Email already registered".into())
    } else {
        error!(error = %e, "Registration failed");
        e.into()
    }
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = TokenPair),
        (status = 400, description = "Missing username or password"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(ApiError::BadRequest("Username or password required".into()));
    }

    debug!("Fetching user from database");

    let db_user = sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, username, password, role_id, employee_id
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(user.username.trim().to_lowercase())
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Database error while fetching user");
        ApiError::from(e)
    })?;

    let Some(db_user) = db_user else {
        info!("Invalid credentials: user not found");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    debug!(user_id = db_user.id, "Password verified");

    let tokens = issue_tokens(
        pool.get_ref(),
        &config,
        db_user.id,
        &db_user.username,
        db_user.role_id,
        db_user.employee_id,
    )
    .await?;

    // Non-fatal
    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
    }

    info!("Login successful");

    Ok(HttpResponse::Ok().json(tokens))
}

/// The session behind the access token
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current session", body = AuthUser),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser) -> impl Responder {
    HttpResponse::Ok().json(auth)
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Rotated tokens", body = TokenPair),
        (status = 401, description = "Missing, invalid or revoked refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> Result<HttpResponse, ApiError> {
    let token = bearer(&req).ok_or_else(|| ApiError::Unauthorized("No token".into()))?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| ApiError::Unauthorized("Invalid token".into()))?;

    if claims.token_type != TokenType::Refresh {
        return Err(ApiError::Unauthorized("Refresh token required".into()));
    }

    let record = sqlx::query_as::<_, (u64, bool)>(
        r#"
        SELECT id, revoked
        FROM refresh_tokens
        WHERE jti = ?
        "#,
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await?;

    let token_id = match record {
        Some((id, false)) => id,
        _ => return Err(ApiError::Unauthorized("Refresh token revoked".into())),
    };

    sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = ?")
        .bind(token_id)
        .execute(pool.get_ref())
        .await?;

    let tokens = issue_tokens(
        pool.get_ref(),
        &config,
        claims.user_id,
        &claims.sub,
        claims.role,
        claims.employee_id,
    )
    .await?;

    Ok(HttpResponse::Ok().json(tokens))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Refresh token revoked, or nothing to revoke")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let Some(token) = bearer(&req) else {
        return HttpResponse::NoContent().finish();
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::NoContent().finish(),
    };

    // only refresh tokens can logout
    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
    }

    HttpResponse::NoContent().finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, email: &str, password: &str) -> RegisterReq {
        RegisterReq {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn sign_up_splits_the_name_and_normalises_the_email() {
        let account = NewAccount::from_request(&request("  Ada  King Lovelace ", " Ada@Example.COM ", "pw")).unwrap();

        assert_eq!(
            account,
            NewAccount {
                first_name: "Ada".into(),
                last_name: "King Lovelace".into(),
                email: "ada@example.com".into(),
            }
        );
    }

    #[test]
    fn single_word_names_have_no_last_name() {
        let account = NewAccount::from_request(&request("Cher", "cher@example.com", "pw")).unwrap();
        assert_eq!(account.first_name, "Cher");
        assert_eq!(account.last_name, "");
    }

    #[test]
    fn sign_up_rejects_incomplete_requests() {
        for req in [
            request("   ", "ada@example.com", "pw"),
            request("Ada", "not-an-email", "pw"),
            request("Ada", "@example.com", "pw"),
            request("Ada", "ada@localhost", "pw"),
            request("Ada", "ada@example.com", ""),
        ] {
            assert!(matches!(NewAccount::from_request(&req), Err(ApiError::BadRequest(_))));
        }
    }

    #[test]
    fn sign_up_body_carries_no_role_or_employee_link() {
        let req: RegisterReq = serde_json::from_value(json!({
            "name": "Ada",
            "email": "ada@example.com",
            "password": "pw",
            "role_id": 1,
            "employee_id": 1
        }))
        .unwrap();

        // Extra fields are ignored; the account is always a fresh employee
        let account = NewAccount::from_request(&req).unwrap();
        assert_eq!(account.email, "ada@example.com");
    }
}
