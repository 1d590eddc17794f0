use actix_web::dev::Server;
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{AccessTokenIssuer, AccessTokenVerifier, AuthService, BcryptHasher, KeyValueStore, RefreshTokenStore};
use crate::configuration::Settings;
use crate::domain::ADMIN_ONLY;
use crate::error::json_error_handler;
use crate::logger::LoggerMiddleware;
use crate::middleware::AccessGate;
use crate::routes::{
    current_user, get_user, health_check, list_users, logout, refresh, signin, signup, update_user_role,
};
use crate::users::UserDirectory;

/// Shared state handed to every worker.
#[derive(Clone)]
pub struct AppContext {
    pub auth: web::Data<AuthService>,
    pub verifier: web::Data<AccessTokenVerifier>,
    pub users: web::Data<dyn UserDirectory>,
}

impl AppContext {
    pub fn new(
        settings: &Settings,
        users: Arc<dyn UserDirectory>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let refresh_tokens = RefreshTokenStore::from_settings(store, &settings.redis, &settings.refresh_tokens);
        let auth = AuthService::new(
            users.clone(),
            Arc::new(BcryptHasher::new(settings.password.bcrypt_cost)),
            AccessTokenIssuer::new(&settings.jwt),
            refresh_tokens,
        );

        Self {
            auth: web::Data::new(auth),
            verifier: web::Data::new(AccessTokenVerifier::new(&settings.jwt)),
            users: web::Data::from(users),
        }
    }
}

pub fn run(listener: TcpListener, context: AppContext) -> Result<Server, std::io::Error> {
    let server = HttpServer::new(move || {
        App::new()
            // Global middleware
            .wrap(Logger::default())
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(context.auth.clone())
            .app_data(context.verifier.clone())
            .app_data(context.users.clone())
            .app_data(web::JsonConfig::default().error_handler(json_error_handler))

            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/auth/signup", web::post().to(signup))
            .route("/auth/signin", web::post().to(signin))
            .route("/auth/refresh", web::post().to(refresh))

            // Any authenticated caller
            .service(
                web::resource("/auth/logout")
                    .wrap(AccessGate::authenticated())
                    .route(web::post().to(logout)),
            )
            .service(
                web::resource("/me")
                    .wrap(AccessGate::authenticated())
                    .route(web::get().to(current_user)),
            )

            // Admin only
            .service(
                web::scope("/users")
                    .wrap(AccessGate::require(ADMIN_ONLY))
                    .route("", web::get().to(list_users))
                    .route("/{id}", web::get().to(get_user))
                    .route("/{id}/role", web::patch().to(update_user_role)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
