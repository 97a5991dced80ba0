use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

#[derive(ToSchema)]
pub struct HealthResponse { pub status: String }

#[derive(ToSchema)]
pub struct LoginRequest { pub email: String, pub password: String }

#[derive(ToSchema)]
pub struct ErrorResponse { pub error: String }

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health,
        crate::routes::auth::login,
        crate::routes::auth::user,
        crate::routes::auth::logout,
    ),
    components(
        schemas(
            HealthResponse,
            LoginRequest,
            ErrorResponse,
            crate::routes::auth::LoginOutput,
            crate::routes::auth::LoginSuccess,
            crate::routes::auth::UserOutput,
            crate::routes::auth::UserProfile,
            crate::routes::auth::MessageOutput,
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "health"),
        (name = "auth")
    )
)]
pub struct ApiDoc;
