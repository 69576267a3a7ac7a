use std::sync::Arc;

use actix_web::{web, App, HttpResponse, HttpServer};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use medicore::config::Config;
use medicore::core::{Clock, SystemClock};
use medicore::modules::appointments::controllers::appointment_controller;
use medicore::modules::appointments::repositories::AppointmentRepository;
use medicore::modules::appointments::services::{
    AppointmentService, AvailabilityChecker, BookingService,
};
use medicore::modules::billing::controllers::{payment_controller, webhook_controller};
use medicore::modules::billing::repositories::InvoiceRepository;
use medicore::modules::billing::services::BillingService;
use medicore::modules::gateways::{PaymentGateway, RazorpayClient};
use medicore::modules::pharmacy::PharmacyOrderRepository;
use medicore::modules::profiles::ProfileRepository;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "medicore=debug,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env().expect("Failed to load configuration");
    config.validate().expect("Configuration validation failed");

    tracing::info!("Starting Medicore Scheduling & Billing Core");
    tracing::info!("Environment: {}", config.app.env);
    tracing::info!("Server binding to: {}", config.server.bind_address());

    // Create database connection pool
    let db_pool = config
        .database
        .create_pool()
        .await
        .expect("Failed to create database pool");

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!(
        "Database pool initialized ({} connections)",
        config.database.pool_size
    );

    // Wire up services
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let gateway: Arc<dyn PaymentGateway> = Arc::new(
        RazorpayClient::new(&config.razorpay).expect("Failed to build gateway client"),
    );

    let appointment_repo = AppointmentRepository::new(db_pool.clone());
    let invoice_repo = InvoiceRepository::new(db_pool.clone());
    let profile_repo = ProfileRepository::new(db_pool.clone());
    let pharmacy_repo = PharmacyOrderRepository::new(db_pool.clone());

    let availability = AvailabilityChecker::new(appointment_repo.clone(), clock.clone());
    let booking = Arc::new(BookingService::new(
        appointment_repo.clone(),
        profile_repo.clone(),
        availability,
        clock.clone(),
    ));
    let appointments = Arc::new(AppointmentService::new(
        db_pool.clone(),
        appointment_repo.clone(),
        invoice_repo.clone(),
        profile_repo.clone(),
        clock.clone(),
    ));
    let billing = Arc::new(BillingService::new(
        db_pool.clone(),
        invoice_repo,
        appointment_repo,
        pharmacy_repo,
        profile_repo,
        gateway,
        clock,
    ));

    // Start HTTP server
    let bind_address = config.server.bind_address();
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(booking.clone()))
            .app_data(web::Data::new(appointments.clone()))
            .app_data(web::Data::new(billing.clone()))
            .route("/health", web::get().to(health_check))
            .service(
                web::scope("/api")
                    .configure(appointment_controller::configure)
                    .configure(payment_controller::configure)
                    .configure(webhook_controller::configure),
            )
    })
    .bind(&bind_address)?
    .run();

    tracing::info!("Server started at http://{}", bind_address);

    server.await
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "medicore"
    }))
}
